use crate::artifacts::{Artifact, BuildInfo};
use crate::errors::{DeployError, DeployResult};
use alloy::primitives::Address;
use log::{debug, error, info};
use std::time::Duration;

pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const STATUS_POLL_ATTEMPTS: u32 = 20;

pub const ALREADY_VERIFIED: &str = "Contract source code already verified";

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationStatus {
    Pending,
    Verified,
    AlreadyVerified,
    Failed(String),
}

/// Everything an explorer needs to match deployed bytecode to source
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub address: Address,
    pub source_code: String,
    pub contract_name: String,
    pub compiler_version: String,
    /// Hex without `0x`
    pub constructor_args: String,
}

impl VerificationRequest {
    pub fn from_artifact(
        artifact: &Artifact,
        build_info: &BuildInfo,
        address: Address,
        constructor_args: &[u8],
    ) -> DeployResult<Self> {
        Ok(Self {
            address,
            source_code: serde_json::to_string(&build_info.input)?,
            contract_name: artifact.fully_qualified_name(),
            compiler_version: format!("v{}", build_info.solc_long_version),
            constructor_args: hex::encode(constructor_args),
        })
    }
}

#[async_trait::async_trait]
pub trait SourceVerifier: Send + Sync {
    async fn is_verified(&self, address: Address) -> DeployResult<bool>;
    /// Returns the explorer's job id
    async fn submit(&self, request: &VerificationRequest) -> DeployResult<String>;
    async fn check_status(&self, guid: &str) -> DeployResult<VerificationStatus>;
}

/// Submit and poll until the explorer settles. An already verified contract is an error
/// carrying [`ALREADY_VERIFIED`].
pub async fn verify_contract(
    verifier: &dyn SourceVerifier,
    request: &VerificationRequest,
    poll_interval: Duration,
    max_attempts: u32,
) -> DeployResult<()> {
    if verifier.is_verified(request.address).await? {
        return Err(DeployError::Verification(ALREADY_VERIFIED.to_string()));
    }

    let guid = verifier.submit(request).await?;
    for attempt in 1..=max_attempts {
        tokio::time::sleep(poll_interval).await;
        match verifier.check_status(&guid).await? {
            VerificationStatus::Pending => {
                debug!("Verification {} pending (attempt {})", guid, attempt);
            }
            VerificationStatus::Verified => return Ok(()),
            VerificationStatus::AlreadyVerified => {
                return Err(DeployError::Verification(ALREADY_VERIFIED.to_string()))
            }
            VerificationStatus::Failed(reason) => return Err(DeployError::Verification(reason)),
        }
    }

    Err(DeployError::Verification(format!(
        "Verification {} still pending after {} attempts",
        guid, max_attempts
    )))
}

/// Verification never aborts a deployment script: failures are only logged, and
/// "already verified" is not treated as a failure.
pub fn report(contract_name: &str, result: DeployResult<()>) {
    match result {
        Ok(()) => info!("Successfully verified {}", contract_name),
        Err(e) if e.is_already_verified() => info!("Already Verified!"),
        Err(e) => error!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FakeVerifier {
        verified: bool,
        submit_error: Option<String>,
        statuses: Mutex<Vec<VerificationStatus>>,
        submissions: AtomicU32,
    }

    impl FakeVerifier {
        fn new(statuses: Vec<VerificationStatus>) -> Self {
            Self {
                verified: false,
                submit_error: None,
                statuses: Mutex::new(statuses),
                submissions: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl SourceVerifier for FakeVerifier {
        async fn is_verified(&self, _address: Address) -> DeployResult<bool> {
            Ok(self.verified)
        }

        async fn submit(&self, _request: &VerificationRequest) -> DeployResult<String> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            match &self.submit_error {
                Some(message) => Err(DeployError::Verification(message.clone())),
                None => Ok("guid-1".to_string()),
            }
        }

        async fn check_status(&self, _guid: &str) -> DeployResult<VerificationStatus> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.is_empty() {
                Ok(VerificationStatus::Pending)
            } else {
                Ok(statuses.remove(0))
            }
        }
    }

    fn request() -> VerificationRequest {
        VerificationRequest {
            address: Address::ZERO,
            source_code: "{}".to_string(),
            contract_name: "contracts/MembershipToken.sol:MembershipToken".to_string(),
            compiler_version: "v0.8.9+commit.e5eed63a".to_string(),
            constructor_args: String::new(),
        }
    }

    #[tokio::test]
    async fn test_verified_after_pending() {
        let verifier = FakeVerifier::new(vec![
            VerificationStatus::Pending,
            VerificationStatus::Verified,
        ]);
        verify_contract(&verifier, &request(), Duration::ZERO, 5)
            .await
            .unwrap();
        assert_eq!(verifier.submissions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_already_published_source_skips_submission() {
        let mut verifier = FakeVerifier::new(vec![]);
        verifier.verified = true;
        let err = verify_contract(&verifier, &request(), Duration::ZERO, 5)
            .await
            .unwrap_err();
        assert!(err.is_already_verified());
        assert_eq!(verifier.submissions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submission_rejected_as_already_verified() {
        let mut verifier = FakeVerifier::new(vec![]);
        verifier.submit_error = Some("Contract source code already verified".to_string());
        let err = verify_contract(&verifier, &request(), Duration::ZERO, 5)
            .await
            .unwrap_err();
        assert!(err.is_already_verified());
    }

    #[tokio::test]
    async fn test_failure_and_timeout() {
        let verifier = FakeVerifier::new(vec![VerificationStatus::Failed(
            "Fail - Unable to verify".to_string(),
        )]);
        let err = verify_contract(&verifier, &request(), Duration::ZERO, 5)
            .await
            .unwrap_err();
        assert!(!err.is_already_verified());
        assert!(err.to_string().contains("Unable to verify"));

        let verifier = FakeVerifier::new(vec![]);
        let err = verify_contract(&verifier, &request(), Duration::ZERO, 3)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("still pending after 3 attempts"));
    }

    #[tokio::test]
    async fn test_report_swallows_errors() {
        let mut verifier = FakeVerifier::new(vec![]);
        verifier.submit_error = Some("Invalid API Key".to_string());
        let result = verify_contract(&verifier, &request(), Duration::ZERO, 1).await;
        assert!(result.is_err());
        report("MembershipToken", result);
        assert_eq!(verifier.submissions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_from_artifact() {
        let artifact: Artifact = serde_json::from_str(
            r#"{"contractName":"FactoryERC1155","sourceName":"contracts/FactoryERC1155.sol","abi":[],"bytecode":"0x6080"}"#,
        )
        .unwrap();
        let build_info: BuildInfo = serde_json::from_str(
            r#"{"solcVersion":"0.8.9","solcLongVersion":"0.8.9+commit.e5eed63a","input":{"language":"Solidity"}}"#,
        )
        .unwrap();

        let request =
            VerificationRequest::from_artifact(&artifact, &build_info, Address::ZERO, &[0xab, 0x01])
                .unwrap();
        assert_eq!(
            request.contract_name,
            "contracts/FactoryERC1155.sol:FactoryERC1155"
        );
        assert_eq!(request.compiler_version, "v0.8.9+commit.e5eed63a");
        assert_eq!(request.constructor_args, "ab01");
        assert_eq!(request.source_code, r#"{"language":"Solidity"}"#);
    }
}
