//! Command line driver computing a single Balancer liquidity operation from
//! JSON inputs.

pub mod cli;
pub mod config;
pub mod dto;

use {
    anyhow::{Context, Result},
    balancer_liquidity::{LiquidityCalculator, PoolSnapshot},
    clap::Parser,
    std::{fs, path::Path},
};

pub fn start(args: impl IntoIterator<Item = String>) {
    let args = cli::Args::parse_from(args);
    // stdout only carries the result.
    observe::tracing::initialize(&args.log_filter, tracing::Level::TRACE);
    tracing::info!("running liquidity-cli with validated arguments:\n{}", args);

    match run(&args) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            tracing::error!("liquidity operation failed: {:?}", err);
            std::process::exit(1);
        }
    }
}

/// Computes the operation described by the input files and returns the
/// result as pretty printed JSON.
pub fn run(args: &cli::Args) -> Result<String> {
    let network = match &args.network {
        Some(path) => config::load(path)?,
        None => Default::default(),
    };
    let pool: dto::Pool = read_json(&args.pool)?;
    let request: dto::Request = read_json(&args.request)?;

    let snapshot = PoolSnapshot::new(pool.into_domain()?)?;
    let result = LiquidityCalculator::new(network).calculate(&snapshot, &request.into_domain()?)?;

    serde_json::to_string_pretty(&dto::OperationResult::from_domain(result))
        .context("serializing operation result")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use {super::*, maplit::hashmap, serde_json::json, std::io::Write};

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn computes_operation_from_files() {
        let pool = write(
            &json!({
                "id": "0x0b09dea16768f0799065c475be02919503cb2a3500020000000000000000001a",
                "kind": "Weighted",
                "tokens": [
                    {
                        "address": "0x6B175474E89094C44Da98b954EedeAC495271d0F",
                        "decimals": 18,
                        "balance": "5000000000000000000000",
                        "weight": "0.5"
                    },
                    {
                        "address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                        "decimals": 18,
                        "balance": "2500000000000000000",
                        "weight": "0.5"
                    }
                ],
                "swapFee": "0.003",
                "totalSupply": "200000000000000000000"
            })
            .to_string(),
        );
        let request = write(
            &json!({
                "sender": "0x9008D19f58AAbD9eD0D60971565AA8510560ab41",
                "recipient": "0x9008D19f58AAbD9eD0D60971565AA8510560ab41",
                "priceImpact": true,
                "operation": {
                    "kind": "exactBptIn",
                    "bptIn": "100000000000000000000",
                    "unwrapNative": true
                }
            })
            .to_string(),
        );
        let network = write(r#"vault = "0xBA12222222228d8Ba445958a75a0704d566BF2C8""#);

        let output = run(&cli::Args {
            pool: pool.path().to_path_buf(),
            request: request.path().to_path_buf(),
            network: Some(network.path().to_path_buf()),
            log_filter: "off".to_string(),
        })
        .unwrap();
        let output: serde_json::Value = serde_json::from_str(&output).unwrap();

        let expected = hashmap! {
            "target" => json!("0xBA12222222228d8Ba445958a75a0704d566BF2C8"),
            "value" => json!("0"),
            "assets" => json!([
                "0x6B175474E89094C44Da98b954EedeAC495271d0F",
                "0x0000000000000000000000000000000000000000"
            ]),
            "expected" => json!({ "tokens": ["2500000000000000000000", "1250000000000000000"] }),
            "priceImpact" => json!("0.000000000000000000"),
        };
        for (key, value) in expected {
            assert_eq!(output[key], value, "{key}");
        }
        assert!(output["callData"].as_str().unwrap().starts_with("0x8bdb3913"));
    }

    #[test]
    fn reports_missing_files() {
        let err = run(&cli::Args {
            pool: "does/not/exist.json".into(),
            request: "does/not/exist.json".into(),
            network: None,
            log_filter: "off".to_string(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
