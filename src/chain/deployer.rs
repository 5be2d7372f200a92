use super::NetworkClient;
use crate::artifacts::Artifact;
use crate::errors::{DeployError, DeployResult};
use alloy::dyn_abi::DynSolValue;
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, TxHash};
use alloy::providers::{PendingTransactionBuilder, Provider};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use log::{debug, info};
use tokio::time;

/// A contract that has been mined on chain
#[derive(Debug, Clone)]
pub struct Deployment {
    pub contract_name: String,
    pub address: Address,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub effective_gas_price: u128,
}

pub async fn deploy(
    client: &NetworkClient,
    artifact: &Artifact,
    args: &[DynSolValue],
) -> DeployResult<Deployment> {
    let code = artifact.deploy_code(args)?;
    let tx = TransactionRequest::default()
        .with_from(client.sender)
        .with_deploy_code(code);

    let pending = client
        .provider
        .send_transaction(tx)
        .await
        .map_err(|e| DeployError::Transaction(format!("{}: {}", artifact.contract_name, e)))?;
    debug!(
        "{} deployment sent in {}",
        artifact.contract_name,
        pending.tx_hash()
    );

    let receipt = confirm(pending, 1).await?;
    Deployment::from_receipt(&artifact.contract_name, &receipt)
}

impl Deployment {
    pub fn from_receipt(contract_name: &str, receipt: &TransactionReceipt) -> DeployResult<Self> {
        let address = receipt.contract_address.ok_or_else(|| {
            DeployError::Transaction(format!(
                "Receipt {} carries no contract address",
                receipt.transaction_hash
            ))
        })?;
        let block_number = receipt.block_number.ok_or_else(|| {
            DeployError::Transaction(format!(
                "Receipt {} carries no block number",
                receipt.transaction_hash
            ))
        })?;

        Ok(Self {
            contract_name: contract_name.to_string(),
            address,
            tx_hash: receipt.transaction_hash,
            block_number,
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
        })
    }
}

/// Wait for the receipt of a sent transaction and fail on revert.
pub async fn confirm(
    pending: PendingTransactionBuilder<Ethereum>,
    confirmations: u64,
) -> DeployResult<TransactionReceipt> {
    let tx_hash = *pending.tx_hash();
    let receipt = pending
        .with_required_confirmations(confirmations)
        .get_receipt()
        .await
        .map_err(|e| DeployError::Transaction(format!("{}: {}", tx_hash, e)))?;

    if !receipt.status() {
        return Err(DeployError::Transaction(format!(
            "Transaction {} reverted",
            tx_hash
        )));
    }
    Ok(receipt)
}

/// Blocks on top of (and including) the one that mined the transaction.
pub fn confirmations(mined_block: u64, current_block: u64) -> u64 {
    if current_block < mined_block {
        0
    } else {
        current_block - mined_block + 1
    }
}

pub async fn wait_for_confirmations(
    client: &NetworkClient,
    deployment: &Deployment,
    required: u64,
) -> DeployResult<()> {
    let mut interval = time::interval(client.poll_interval());
    loop {
        interval.tick().await;
        let current = client
            .provider
            .get_block_number()
            .await
            .map_err(|e| DeployError::Provider(e.to_string()))?;
        let reached = confirmations(deployment.block_number, current);
        if reached >= required {
            info!(
                "{} has {} confirmations",
                deployment.contract_name, reached
            );
            return Ok(());
        }
        debug!(
            "{}: {}/{} confirmations at block {}",
            deployment.contract_name, reached, required, current
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receipt(block_number: Option<&str>, contract_address: Option<&str>) -> TransactionReceipt {
        serde_json::from_value(json!({
            "type": "0x2",
            "status": "0x1",
            "cumulativeGasUsed": "0x5208",
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "transactionIndex": "0x0",
            "blockHash": format!("0x{}", "cd".repeat(32)),
            "blockNumber": block_number,
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": null,
            "contractAddress": contract_address
        }))
        .unwrap()
    }

    #[test]
    fn test_deployment_from_receipt() {
        let receipt = receipt(
            Some("0x1e8480"),
            Some("0x5fbdb2315678afecb367f032d93f642f64180aa3"),
        );
        let deployment = Deployment::from_receipt("MembershipToken", &receipt).unwrap();
        assert_eq!(deployment.block_number, 2_000_000);
        assert_eq!(deployment.gas_used, 21_000);
        assert_eq!(deployment.effective_gas_price, 1_000_000_000);
        assert_eq!(
            deployment.address,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_receipt_without_block_number_is_rejected() {
        let receipt = receipt(None, Some("0x5fbdb2315678afecb367f032d93f642f64180aa3"));
        let err = Deployment::from_receipt("MembershipToken", &receipt).unwrap_err();
        assert!(err.to_string().contains("no block number"));
    }

    #[test]
    fn test_receipt_without_contract_address_is_rejected() {
        let receipt = receipt(Some("0x10"), None);
        let err = Deployment::from_receipt("MembershipToken", &receipt).unwrap_err();
        assert!(err.to_string().contains("no contract address"));
    }

    #[test]
    fn test_confirmations() {
        assert_eq!(confirmations(100, 99), 0);
        assert_eq!(confirmations(100, 100), 1);
        assert_eq!(confirmations(100, 119), 20);
    }

    #[test]
    fn test_twenty_confirmations_threshold() {
        let mined = 31_000_000;
        assert!(confirmations(mined, mined + 18) < 20);
        assert!(confirmations(mined, mined + 19) >= 20);
    }
}
