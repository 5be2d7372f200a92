use crate::config::NetworkConfig;
use crate::errors::{DeployError, DeployResult};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::http::Http;
use alloy::transports::layers::FallbackLayer;
use log::{debug, info};
use std::num::NonZeroUsize;
use std::time::Duration;
use tower::ServiceBuilder;

/// Provider bound to one configured network together with the sending account
pub struct NetworkClient {
    pub name: String,
    pub config: NetworkConfig,
    pub provider: DynProvider,
    pub sender: Address,
}

impl NetworkClient {
    pub async fn connect(name: &str, config: &NetworkConfig) -> DeployResult<Self> {
        let (provider, signer_address) = create_provider(config)?;
        check_chain_id(&provider, name, config).await?;

        let sender = match signer_address {
            Some(address) => address,
            None => {
                let accounts = provider
                    .get_accounts()
                    .await
                    .map_err(|e| DeployError::Provider(e.to_string()))?;
                *accounts.first().ok_or_else(|| {
                    DeployError::Provider(format!(
                        "Network {} has no configured accounts and the node exposes none",
                        name
                    ))
                })?
            }
        };

        info!(
            "Connected to {} (chain id {}) as {}",
            name, config.chain_id, sender
        );

        Ok(Self {
            name: name.to_string(),
            config: config.clone(),
            provider,
            sender,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }
}

/// Builds an HTTP provider over the network's RPC URLs. When the network lists
/// a private key the provider signs locally and the signer address is returned.
pub fn create_provider(network: &NetworkConfig) -> DeployResult<(DynProvider, Option<Address>)> {
    let rpcs = network.rpc_urls();
    let active = NonZeroUsize::new(rpcs.len())
        .ok_or_else(|| DeployError::Config("Network has no RPC URL".to_string()))?;
    let fallback_layer = FallbackLayer::default().with_active_transport_count(active);

    let transports = rpcs
        .iter()
        .map(|url| {
            url.parse::<Url>()
                .map(Http::new)
                .map_err(|e| DeployError::Config(format!("Invalid RPC URL {}: {}", url, e)))
        })
        .collect::<DeployResult<Vec<_>>>()?;

    let transport = ServiceBuilder::new()
        .layer(fallback_layer)
        .service(transports);
    let client = RpcClient::builder().transport(transport, is_local(&network.url));

    match network.accounts.first() {
        Some(key) => {
            let signer = parse_signer(key)?;
            let address = signer.address();
            let provider = ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_client(client);
            Ok((provider.erased(), Some(address)))
        }
        None => {
            let provider = ProviderBuilder::new().connect_client(client);
            Ok((provider.erased(), None))
        }
    }
}

pub async fn check_chain_id(
    provider: &DynProvider,
    name: &str,
    network: &NetworkConfig,
) -> DeployResult<()> {
    let actual = provider
        .get_chain_id()
        .await
        .map_err(|e| DeployError::Provider(format!("{}: {}", network.url, e)))?;
    debug!("Node for {} reports chain id {}", name, actual);
    if actual != network.chain_id {
        return Err(DeployError::ChainIdMismatch {
            network: name.to_string(),
            expected: network.chain_id,
            actual,
        });
    }
    Ok(())
}

fn parse_signer(key: &str) -> DeployResult<PrivateKeySigner> {
    key.parse::<PrivateKeySigner>().map_err(|_| {
        DeployError::Config("Invalid private key, set PRIVATE_KEY to a hex-encoded key".to_string())
    })
}

fn is_local(url: &str) -> bool {
    url.contains("127.0.0.1") || url.contains("localhost")
}
