use anyhow::{anyhow, Context, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use url::Url;

use crate::errors::DeployError;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Value used for API keys when the matching environment variable is unset.
pub const PLACEHOLDER_API_KEY: &str = "key";
pub const PLACEHOLDER_PRIVATE_KEY: &str = "0xkey";

const DEFAULT_POLL_INTERVAL_MS: u64 = 4000;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub default_network: String,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub solidity: SolidityConfig,
    pub etherscan: EtherscanConfig,
    pub gas_reporter: GasReporterConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NetworkConfig {
    pub url: String,
    #[serde(default)]
    pub fallback_urls: Vec<String>,
    /// Private keys. Empty means the node's unlocked accounts are used.
    #[serde(default)]
    pub accounts: Vec<String>,
    pub chain_id: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SolidityConfig {
    pub version: String,
    pub optimizer: OptimizerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub enabled: bool,
    pub runs: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EtherscanConfig {
    pub api_key: String,
    #[serde(default)]
    pub custom_chains: Vec<CustomChain>,
}

/// Explorer endpoints for a chain the built-in table does not know.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CustomChain {
    pub network: String,
    pub chain_id: u64,
    pub api_url: String,
    pub browser_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GasReporterConfig {
    pub enabled: bool,
    #[serde(default)]
    pub output_file: Option<String>,
    pub no_colors: bool,
    pub currency: String,
    pub coinmarketcap: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    pub artifacts: String,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts: "artifacts".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            "rinkeby".to_string(),
            NetworkConfig {
                url: "https://eth-rinkeby/example".to_string(),
                fallback_urls: Vec::new(),
                accounts: vec![PLACEHOLDER_PRIVATE_KEY.to_string()],
                chain_id: 4,
                poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            },
        );
        networks.insert(
            "polygonMumbai".to_string(),
            NetworkConfig {
                url: "https://eth-polygon-mumbai/example".to_string(),
                fallback_urls: Vec::new(),
                accounts: vec![PLACEHOLDER_PRIVATE_KEY.to_string()],
                chain_id: 80001,
                poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            },
        );
        networks.insert(
            "localhost".to_string(),
            NetworkConfig {
                url: "http://127.0.0.1:8545/".to_string(),
                fallback_urls: Vec::new(),
                accounts: Vec::new(),
                chain_id: 31337,
                poll_interval_ms: 1000,
            },
        );

        Self {
            default_network: "localhost".to_string(),
            networks,
            solidity: SolidityConfig {
                version: "0.8.9".to_string(),
                optimizer: OptimizerConfig {
                    enabled: true,
                    runs: 200,
                },
            },
            etherscan: EtherscanConfig {
                api_key: PLACEHOLDER_API_KEY.to_string(),
                custom_chains: Vec::new(),
            },
            gas_reporter: GasReporterConfig {
                enabled: true,
                output_file: Some("gas-report.txt".to_string()),
                no_colors: true,
                currency: "USD".to_string(),
                coinmarketcap: PLACEHOLDER_API_KEY.to_string(),
                token: "MATIC".to_string(),
            },
            paths: PathsConfig::default(),
        }
    }
}

impl NetworkConfig {
    /// Primary URL followed by fallbacks
    pub fn rpc_urls(&self) -> Vec<String> {
        let mut urls = vec![self.url.clone()];
        urls.extend(self.fallback_urls.iter().cloned());
        urls
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.url.is_empty() {
            return Err(anyhow!("Network {} has no RPC URL", name));
        }
        for url in self.rpc_urls() {
            Url::parse(&url).with_context(|| format!("Network {} has invalid URL {}", name, url))?;
        }
        Ok(())
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        info!("Loading config from {}", path.display());
        match Self::load_from_file(path) {
            Ok(mut config) => {
                info!("Config loaded from file");
                config.apply_overrides(|key| std::env::var(key).ok());
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load config from file: {}", e);
                info!("Falling back to environment variables or defaults");
                Ok(Self::from_env())
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Override endpoints and credentials from the given variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RINKEBY_RPC_URL") {
            if let Some(network) = self.networks.get_mut("rinkeby") {
                network.url = url;
            }
        }

        if let Some(url) = lookup("POLYGON_MUMBAI_RPC_URL") {
            if let Some(network) = self.networks.get_mut("polygonMumbai") {
                network.url = url;
            }
        }

        // Only networks that sign locally take the key
        if let Some(key) = lookup("PRIVATE_KEY") {
            for network in self.networks.values_mut() {
                if !network.accounts.is_empty() {
                    network.accounts = vec![key.clone()];
                }
            }
        }

        if let Some(api_key) = lookup("POLYGONSCAN_API_KEY") {
            self.etherscan.api_key = api_key;
        }

        if let Some(api_key) = lookup("COINMARKETCAP_API_KEY") {
            self.gas_reporter.coinmarketcap = api_key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.networks.contains_key(&self.default_network) {
            return Err(anyhow!(
                "Default network {} is not defined",
                self.default_network
            ));
        }

        let mut chain_ids = HashSet::new();
        for (name, network) in &self.networks {
            network.validate(name)?;
            if !chain_ids.insert(network.chain_id) {
                return Err(anyhow!(
                    "Chain id {} is used by more than one network",
                    network.chain_id
                ));
            }
        }

        if self.gas_reporter.currency.is_empty() {
            return Err(anyhow!("Gas reporter currency not configured"));
        }

        Ok(())
    }

    pub fn network(&self, name: &str) -> Result<&NetworkConfig, DeployError> {
        self.networks
            .get(name)
            .ok_or_else(|| DeployError::UnknownNetwork(name.to_string()))
    }

    /// Explorer key, unless it is missing or still the placeholder.
    pub fn explorer_api_key(&self) -> Option<&str> {
        real_key(&self.etherscan.api_key)
    }

    pub fn pricing_api_key(&self) -> Option<&str> {
        real_key(&self.gas_reporter.coinmarketcap)
    }
}

fn real_key(key: &str) -> Option<&str> {
    let key = key.trim();
    if key.is_empty() || key == PLACEHOLDER_API_KEY {
        None
    } else {
        Some(key)
    }
}
