use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shelfscan_provider::RecognizerConfig;

fn default_call_timeout_secs() -> u64 {
    30
}

/// Top-level CLI configuration, read from
/// `<config_root>/config/shelfscan.yaml`. A missing file means a fully
/// offline setup: static recognizers and the builtin knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfscanConfig {
    #[serde(default)]
    pub recognizer: Option<RecognizerConfig>,
    #[serde(default)]
    pub extractor: Option<RecognizerConfig>,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Optional YAML overlay merged over the builtin knowledge base.
    #[serde(default)]
    pub knowledge_overlay: Option<PathBuf>,
}

impl Default for ShelfscanConfig {
    fn default() -> Self {
        Self {
            recognizer: None,
            extractor: None,
            call_timeout_secs: default_call_timeout_secs(),
            knowledge_overlay: None,
        }
    }
}

impl ShelfscanConfig {
    pub fn load(config_root: &Path) -> Result<Self> {
        let path = config_root.join("config").join("shelfscan.yaml");
        if !path.exists() {
            tracing::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}
