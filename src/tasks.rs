use crate::chain::NetworkClient;
use crate::errors::{DeployError, DeployResult};
use alloy::providers::Provider;
use log::debug;

pub async fn block_number(client: &NetworkClient) -> DeployResult<u64> {
    let block_number = client
        .provider
        .get_block_number()
        .await
        .map_err(|e| DeployError::Provider(e.to_string()))?;
    debug!("Block number {} on {}", block_number, client.name);
    Ok(block_number)
}
