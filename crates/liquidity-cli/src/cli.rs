use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

#[derive(clap::Parser)]
#[command(name = "liquidity-cli", about = "Computes Balancer pool joins and exits")]
pub struct Args {
    /// JSON file with the state of the pool.
    #[clap(long, env)]
    pub pool: PathBuf,

    /// JSON file with the operation to compute.
    #[clap(long, env)]
    pub request: PathBuf,

    /// TOML file with the network's vault and wrapped native asset
    /// addresses. Defaults to Ethereum mainnet.
    #[clap(long, env)]
    pub network: Option<PathBuf>,

    #[clap(long, env, default_value = "warn,liquidity_cli=info,balancer_liquidity=info")]
    pub log_filter: String,
}

impl Display for Args {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            pool,
            request,
            network,
            log_filter,
        } = self;

        writeln!(f, "pool: {}", pool.display())?;
        writeln!(f, "request: {}", request.display())?;
        writeln!(
            f,
            "network: {}",
            network
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "mainnet".to_string())
        )?;
        writeln!(f, "log_filter: {log_filter}")?;
        Ok(())
    }
}
