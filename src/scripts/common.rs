use crate::artifacts::{Artifact, ArtifactStore};
use crate::chain::{self, Deployment, NetworkClient};
use crate::config::Config;
use crate::errors::{DeployError, DeployResult};
use crate::explorer::{
    self, explorer_for_chain, verify_contract, EtherscanClient, VerificationRequest,
    STATUS_POLL_ATTEMPTS, STATUS_POLL_INTERVAL,
};
use crate::gas_reporter::{CoinMarketCap, GasReporter, PriceFeed};
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use alloy::rpc::types::TransactionReceipt;
use anyhow::{Context, Result};
use log::{debug, info, warn};

/// Deployments on this chain are verified on the explorer
pub const VERIFY_CHAIN_ID: u64 = 80001;
pub const VERIFY_CONFIRMATIONS: u64 = 20;

pub fn should_verify(chain_id: u64, explorer_api_key: Option<&str>) -> bool {
    chain_id == VERIFY_CHAIN_ID && explorer_api_key.is_some()
}

/// State shared by a script run: the network connection, artifacts and gas records
pub struct ScriptContext {
    pub config: Config,
    pub client: NetworkClient,
    pub artifacts: ArtifactStore,
    pub gas: GasReporter,
}

impl ScriptContext {
    pub async fn connect(config: Config, network: &str) -> Result<Self> {
        let network_config = config.network(network)?.clone();
        let client = NetworkClient::connect(network, &network_config)
            .await
            .with_context(|| format!("Failed to connect to network {}", network))?;
        let artifacts = ArtifactStore::new(&config.paths.artifacts);
        let gas = GasReporter::new(config.gas_reporter.clone());
        Ok(Self {
            config,
            client,
            artifacts,
            gas,
        })
    }

    pub async fn deploy_contract(
        &mut self,
        contract_name: &str,
        args: &[DynSolValue],
    ) -> Result<(Artifact, Deployment)> {
        let artifact = self.artifacts.load(contract_name)?;
        info!("Deploying contract...");
        let deployment = chain::deploy(&self.client, &artifact, args).await?;
        info!("Deployed contract to: {}", deployment.address);
        self.gas.record(
            contract_name,
            "deployment",
            deployment.gas_used,
            deployment.effective_gas_price,
        );
        Ok((artifact, deployment))
    }

    /// Wait for confirmations and verify when the network and credentials allow it.
    pub async fn verify_if_supported(
        &self,
        artifact: &Artifact,
        deployment: &Deployment,
        args: &[DynSolValue],
    ) -> Result<()> {
        if !should_verify(self.client.chain_id(), self.config.explorer_api_key()) {
            debug!(
                "Skipping verification on chain {}",
                self.client.chain_id()
            );
            return Ok(());
        }

        info!("Waiting for block txes...");
        chain::wait_for_confirmations(&self.client, deployment, VERIFY_CONFIRMATIONS).await?;
        self.verify(artifact, deployment.address, args).await;
        Ok(())
    }

    pub async fn verify(&self, artifact: &Artifact, address: Address, args: &[DynSolValue]) {
        info!("Verifying contract...");
        let result = match self.prepare_verification(artifact, address, args) {
            Ok((verifier, request)) => {
                verify_contract(&verifier, &request, STATUS_POLL_INTERVAL, STATUS_POLL_ATTEMPTS)
                    .await
            }
            Err(e) => Err(e),
        };
        explorer::report(&artifact.contract_name, result);
    }

    fn prepare_verification(
        &self,
        artifact: &Artifact,
        address: Address,
        args: &[DynSolValue],
    ) -> DeployResult<(EtherscanClient, VerificationRequest)> {
        let api_key = self
            .config
            .explorer_api_key()
            .ok_or_else(|| DeployError::Verification("Explorer API key not set".to_string()))?;
        let endpoints = explorer_for_chain(self.client.chain_id(), &self.config.etherscan.custom_chains)
            .ok_or_else(|| {
                DeployError::Verification(format!(
                    "No explorer known for chain {}",
                    self.client.chain_id()
                ))
            })?;

        let build_info = self.artifacts.build_info(artifact)?;
        if build_info.solc_version != self.config.solidity.version {
            warn!(
                "{} was compiled with solc {} but config expects {}",
                artifact.contract_name, build_info.solc_version, self.config.solidity.version
            );
        }
        if let Some(optimizer) = build_info.optimizer() {
            if optimizer != self.config.solidity.optimizer {
                warn!(
                    "{} optimizer settings {:?} differ from config {:?}",
                    artifact.contract_name, optimizer, self.config.solidity.optimizer
                );
            }
        }

        let constructor_args = artifact.encode_constructor_args(args)?;
        let request =
            VerificationRequest::from_artifact(artifact, &build_info, address, &constructor_args)?;
        info!("Explorer page: {}", endpoints.address_url(address));
        Ok((EtherscanClient::new(api_key, endpoints), request))
    }

    pub fn log_receipt(&mut self, contract: &str, method: &str, receipt: &TransactionReceipt) {
        info!(
            "{}.{}: tx {} in block {} ({} gas)",
            contract,
            method,
            receipt.transaction_hash,
            receipt.block_number.unwrap_or_default(),
            receipt.gas_used
        );
        debug!("{:?}", receipt);
        self.gas.record_receipt(contract, method, receipt);
    }

    /// Emit the gas report for everything sent during the run
    pub async fn finish(&self) -> Result<()> {
        let feed = self.config.pricing_api_key().map(CoinMarketCap::new);
        self.gas
            .emit(feed.as_ref().map(|feed| feed as &dyn PriceFeed))
            .await?;
        Ok(())
    }
}
