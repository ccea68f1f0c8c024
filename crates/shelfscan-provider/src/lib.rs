pub mod http;
pub mod stub;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shelfscan_schema::{ExtractedDate, RecognizedProduct};

pub use http::{HttpDateExtractor, HttpProductRecognizer, RecognizerErrorKind};
pub use stub::{StaticDateExtractor, StaticRecognizer};

/// What the product-recognition service reported for one image.
/// `success = false` means the service ran but found nothing usable;
/// a transport-level failure surfaces as `Err` from the trait call.
/// Either way the caller treats that side of the join as failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub success: bool,
    #[serde(default)]
    pub products: Vec<RecognizedProduct>,
    #[serde(default)]
    pub processing_time_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

impl RecognitionOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            products: vec![],
            processing_time_ms: 0,
            error: Some(error.into()),
        }
    }
}

/// What the label-date extraction service reported for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub success: bool,
    #[serde(default)]
    pub dates: Vec<ExtractedDate>,
    #[serde(default)]
    pub processing_time_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExtractionOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            dates: vec![],
            processing_time_ms: 0,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait ProductRecognizer: Send + Sync {
    async fn recognize(&self, image_ref: &str) -> Result<RecognitionOutcome>;
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait DateExtractor: Send + Sync {
    async fn extract(&self, image_ref: &str) -> Result<ExtractionOutcome>;
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Recognizer backend selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerKind {
    Http,
    /// Canned responses, used for offline runs and tests.
    Static,
}

/// Configuration for one recognizer or extractor instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecognizerKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl RecognizerConfig {
    pub fn new(id: impl Into<String>, kind: RecognizerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            api_key: None,
            base_url: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

/// Create a product recognizer from configuration.
pub fn create_recognizer(config: &RecognizerConfig) -> Result<Arc<dyn ProductRecognizer>> {
    let recognizer: Arc<dyn ProductRecognizer> = match config.kind {
        RecognizerKind::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow!("recognizer {} requires base_url", config.id))?;
            Arc::new(HttpProductRecognizer::new(
                config.api_key.clone().unwrap_or_default(),
                base_url,
            ))
        }
        RecognizerKind::Static => Arc::new(StaticRecognizer::sample()),
    };
    Ok(recognizer)
}

/// Create a label-date extractor from configuration.
pub fn create_extractor(config: &RecognizerConfig) -> Result<Arc<dyn DateExtractor>> {
    let extractor: Arc<dyn DateExtractor> = match config.kind {
        RecognizerKind::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow!("extractor {} requires base_url", config.id))?;
            Arc::new(HttpDateExtractor::new(
                config.api_key.clone().unwrap_or_default(),
                base_url,
            ))
        }
        RecognizerKind::Static => Arc::new(StaticDateExtractor::empty()),
    };
    Ok(extractor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_carries_error() {
        let outcome = RecognitionOutcome::failed("service unavailable");
        assert!(!outcome.success);
        assert!(outcome.products.is_empty());
        assert_eq!(outcome.error.as_deref(), Some("service unavailable"));
    }

    #[test]
    fn config_builder_chain() {
        let config = RecognizerConfig::new("vision", RecognizerKind::Http)
            .with_api_key("sk-test")
            .with_base_url("https://vision.example.com");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url.as_deref(), Some("https://vision.example.com"));
    }

    #[test]
    fn create_http_recognizer_requires_base_url() {
        let config = RecognizerConfig::new("vision", RecognizerKind::Http);
        assert!(create_recognizer(&config).is_err());
    }

    #[test]
    fn create_static_pair() {
        let config = RecognizerConfig::new("offline", RecognizerKind::Static);
        assert!(create_recognizer(&config).is_ok());
        assert!(create_extractor(&config).is_ok());
    }

    #[test]
    fn outcome_deserializes_with_defaults() {
        let outcome: ExtractionOutcome =
            serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(outcome.success);
        assert!(outcome.dates.is_empty());
        assert_eq!(outcome.processing_time_ms, 0);
    }
}
