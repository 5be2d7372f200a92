use super::verify::{SourceVerifier, VerificationRequest, VerificationStatus};
use crate::config::CustomChain;
use crate::errors::{DeployError, DeployResult};
use alloy::primitives::Address;
use log::{debug, warn};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerEndpoints {
    pub network: String,
    pub chain_id: u64,
    pub api_url: String,
    pub browser_url: String,
}

const KNOWN_EXPLORERS: &[(&str, u64, &str, &str)] = &[
    ("mainnet", 1, "https://api.etherscan.io/api", "https://etherscan.io"),
    ("rinkeby", 4, "https://api-rinkeby.etherscan.io/api", "https://rinkeby.etherscan.io"),
    ("goerli", 5, "https://api-goerli.etherscan.io/api", "https://goerli.etherscan.io"),
    ("sepolia", 11155111, "https://api-sepolia.etherscan.io/api", "https://sepolia.etherscan.io"),
    ("polygon", 137, "https://api.polygonscan.com/api", "https://polygonscan.com"),
    ("polygonMumbai", 80001, "https://api-testnet.polygonscan.com/api", "https://mumbai.polygonscan.com"),
];

/// Custom chains take precedence over the built-in table
pub fn explorer_for_chain(chain_id: u64, custom_chains: &[CustomChain]) -> Option<ExplorerEndpoints> {
    if let Some(custom) = custom_chains.iter().find(|c| c.chain_id == chain_id) {
        return Some(ExplorerEndpoints {
            network: custom.network.clone(),
            chain_id,
            api_url: custom.api_url.clone(),
            browser_url: custom.browser_url.clone(),
        });
    }

    KNOWN_EXPLORERS
        .iter()
        .find(|(_, id, _, _)| *id == chain_id)
        .map(|(network, chain_id, api_url, browser_url)| ExplorerEndpoints {
            network: network.to_string(),
            chain_id: *chain_id,
            api_url: api_url.to_string(),
            browser_url: browser_url.to_string(),
        })
}

impl ExplorerEndpoints {
    pub fn address_url(&self, address: Address) -> String {
        format!("{}/address/{}#code", self.browser_url.trim_end_matches('/'), address)
    }
}

/// Envelope shared by every Etherscan-style API response
#[derive(Debug, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    pub message: String,
    pub result: serde_json::Value,
}

impl ExplorerResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "1"
    }

    pub fn result_text(&self) -> String {
        match &self.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn verification_status(&self) -> VerificationStatus {
        let text = self.result_text();
        let lower = text.to_lowercase();
        if lower.contains("pending") {
            VerificationStatus::Pending
        } else if lower.contains("already verified") {
            VerificationStatus::AlreadyVerified
        } else if self.is_ok() || lower.starts_with("pass") {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Failed(text)
        }
    }

    /// Whether a `getsourcecode` response carries published source
    pub fn has_source_code(&self) -> bool {
        self.result
            .as_array()
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get("SourceCode"))
            .and_then(|source| source.as_str())
            .map(|source| !source.is_empty())
            .unwrap_or(false)
    }
}

pub struct EtherscanClient {
    client: reqwest::Client,
    api_key: String,
    endpoints: ExplorerEndpoints,
}

impl EtherscanClient {
    pub fn new(api_key: &str, endpoints: ExplorerEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            endpoints,
        }
    }

    async fn get(&self, params: &[(&str, &str)]) -> DeployResult<ExplorerResponse> {
        let mut query = params.to_vec();
        query.push(("apikey", self.api_key.as_str()));
        let response = self
            .client
            .get(&self.endpoints.api_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<ExplorerResponse>().await?)
    }
}

#[async_trait::async_trait]
impl SourceVerifier for EtherscanClient {
    async fn is_verified(&self, address: Address) -> DeployResult<bool> {
        let address = address.to_string();
        let response = self
            .get(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address.as_str()),
            ])
            .await?;
        if !response.is_ok() {
            warn!(
                "Source lookup for {} failed: {} ({})",
                address,
                response.message,
                response.result_text()
            );
            return Ok(false);
        }
        Ok(response.has_source_code())
    }

    async fn submit(&self, request: &VerificationRequest) -> DeployResult<String> {
        let address = request.address.to_string();
        let form = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", request.source_code.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", request.contract_name.as_str()),
            ("compilerversion", request.compiler_version.as_str()),
            // Misspelling is part of the Etherscan API
            ("constructorArguements", request.constructor_args.as_str()),
        ];
        let response: ExplorerResponse = self
            .client
            .post(&self.endpoints.api_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.is_ok() {
            return Err(DeployError::Verification(response.result_text()));
        }
        let guid = response.result_text();
        debug!("Verification submitted with guid {}", guid);
        Ok(guid)
    }

    async fn check_status(&self, guid: &str) -> DeployResult<VerificationStatus> {
        let response = self
            .get(&[
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .await?;
        Ok(response.verification_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> ExplorerResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_known_explorers() {
        let mumbai = explorer_for_chain(80001, &[]).unwrap();
        assert_eq!(mumbai.api_url, "https://api-testnet.polygonscan.com/api");
        assert_eq!(explorer_for_chain(4, &[]).unwrap().network, "rinkeby");
        assert!(explorer_for_chain(31337, &[]).is_none());
    }

    #[test]
    fn test_custom_chain_overrides_table() {
        let custom = vec![CustomChain {
            network: "mumbai-mirror".to_string(),
            chain_id: 80001,
            api_url: "https://mirror.example/api".to_string(),
            browser_url: "https://mirror.example/".to_string(),
        }];
        let endpoints = explorer_for_chain(80001, &custom).unwrap();
        assert_eq!(endpoints.network, "mumbai-mirror");
        assert_eq!(
            endpoints.address_url(Address::ZERO),
            format!("https://mirror.example/address/{}#code", Address::ZERO)
        );
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            response(r#"{"status":"0","message":"NOTOK","result":"Pending in queue"}"#)
                .verification_status(),
            VerificationStatus::Pending
        );
        assert_eq!(
            response(r#"{"status":"1","message":"OK","result":"Pass - Verified"}"#)
                .verification_status(),
            VerificationStatus::Verified
        );
        assert_eq!(
            response(r#"{"status":"0","message":"NOTOK","result":"Already Verified"}"#)
                .verification_status(),
            VerificationStatus::AlreadyVerified
        );
        assert_eq!(
            response(r#"{"status":"0","message":"NOTOK","result":"Fail - Unable to verify"}"#)
                .verification_status(),
            VerificationStatus::Failed("Fail - Unable to verify".to_string())
        );
    }

    #[test]
    fn test_source_code_lookup() {
        let verified = response(
            r#"{"status":"1","message":"OK","result":[{"SourceCode":"pragma solidity 0.8.9;","ContractName":"MembershipToken"}]}"#,
        );
        assert!(verified.has_source_code());

        let unverified = response(
            r#"{"status":"1","message":"OK","result":[{"SourceCode":"","ABI":"Contract source code not verified"}]}"#,
        );
        assert!(!unverified.has_source_code());
    }
}
