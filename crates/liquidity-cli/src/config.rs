//! Network configuration file.

use {
    alloy::primitives::Address,
    anyhow::{Context, Result},
    balancer_liquidity::Network,
    serde::Deserialize,
    serde_with::{DisplayFromStr, serde_as},
    std::path::Path,
};

/// Overrides of the mainnet defaults, for example:
///
/// ```toml
/// vault = "0xBA12222222228d8Ba445958a75a0704d566BF2C8"
/// wrapped-native-asset = "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"
/// ```
#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub vault: Option<Address>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub wrapped_native_asset: Option<Address>,
}

impl NetworkConfig {
    pub fn into_network(self) -> Network {
        let mainnet = Network::mainnet();
        Network {
            vault: self.vault.unwrap_or(mainnet.vault),
            wrapped_native_asset: self
                .wrapped_native_asset
                .unwrap_or(mainnet.wrapped_native_asset),
        }
    }
}

pub fn load(path: &Path) -> Result<Network> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading network config {}", path.display()))?;
    let config: NetworkConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing network config {}", path.display()))?;
    Ok(config.into_network())
}
