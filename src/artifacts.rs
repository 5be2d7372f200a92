use crate::config::OptimizerConfig;
use crate::errors::{DeployError, DeployResult};
use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use log::{debug, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Compiled contract as written by the Hardhat compile step
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_version: String,
    pub solc_long_version: String,
    /// Standard-JSON compiler input
    pub input: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: String,
}

impl Artifact {
    /// `<sourceName>:<contractName>`, the form explorers expect.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    pub fn encode_constructor_args(&self, args: &[DynSolValue]) -> DeployResult<Vec<u8>> {
        match &self.abi.constructor {
            Some(constructor) => {
                if constructor.inputs.len() != args.len() {
                    return Err(DeployError::Artifact(format!(
                        "{} constructor takes {} arguments, got {}",
                        self.contract_name,
                        constructor.inputs.len(),
                        args.len()
                    )));
                }
                constructor
                    .abi_encode_input(args)
                    .map_err(|e| DeployError::Artifact(e.to_string()))
            }
            None if args.is_empty() => Ok(Vec::new()),
            None => Err(DeployError::Artifact(format!(
                "{} has no constructor but {} arguments were given",
                self.contract_name,
                args.len()
            ))),
        }
    }

    /// Creation bytecode followed by the encoded constructor arguments
    pub fn deploy_code(&self, args: &[DynSolValue]) -> DeployResult<Bytes> {
        let encoded = self.encode_constructor_args(args)?;
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&encoded);
        Ok(Bytes::from(code))
    }
}

impl BuildInfo {
    pub fn optimizer(&self) -> Option<OptimizerConfig> {
        let optimizer = self.input.get("settings")?.get("optimizer")?;
        Some(OptimizerConfig {
            enabled: optimizer.get("enabled")?.as_bool()?,
            runs: optimizer.get("runs")?.as_u64()? as u32,
        })
    }
}

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, contract_name: &str) -> DeployResult<Artifact> {
        let file_name = format!("{}.json", contract_name);
        let contracts_dir = self.root.join("contracts");
        if !contracts_dir.is_dir() {
            return Err(DeployError::Artifact(format!(
                "Artifacts directory {} not found, compile the contracts first",
                contracts_dir.display()
            )));
        }

        let mut candidates = Vec::new();
        find_files(&contracts_dir, &file_name, &mut candidates)?;

        for path in candidates {
            let contents = fs::read_to_string(&path)?;
            let mut artifact: Artifact = match serde_json::from_str(&contents) {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!("Skipping unreadable artifact {}: {}", path.display(), e);
                    continue;
                }
            };
            if artifact.contract_name != contract_name {
                continue;
            }
            if artifact.bytecode.is_empty() {
                return Err(DeployError::Artifact(format!(
                    "{} has no bytecode (abstract contract or interface?)",
                    contract_name
                )));
            }
            debug!("Loaded artifact {}", path.display());
            artifact.path = path;
            return Ok(artifact);
        }

        Err(DeployError::Artifact(format!(
            "No artifact for contract {} under {}",
            contract_name,
            contracts_dir.display()
        )))
    }

    /// Resolve the build-info file referenced by the artifact's debug file
    pub fn build_info(&self, artifact: &Artifact) -> DeployResult<BuildInfo> {
        let dir = artifact.path.parent().ok_or_else(|| {
            DeployError::Artifact(format!("{} has no parent directory", artifact.path.display()))
        })?;
        let dbg_path = dir.join(format!("{}.dbg.json", artifact.contract_name));
        let dbg: DebugFile = serde_json::from_str(&fs::read_to_string(&dbg_path).map_err(|e| {
            DeployError::Artifact(format!("Cannot read {}: {}", dbg_path.display(), e))
        })?)?;

        let build_info_path = dir.join(&dbg.build_info);
        let contents = fs::read_to_string(&build_info_path).map_err(|e| {
            DeployError::Artifact(format!(
                "Cannot read build info {}: {}",
                build_info_path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }
}

fn find_files(dir: &Path, file_name: &str, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            find_files(&path, file_name, found)?;
        } else if path.file_name().and_then(|n| n.to_str()) == Some(file_name) {
            found.push(path);
        }
    }
    Ok(())
}
