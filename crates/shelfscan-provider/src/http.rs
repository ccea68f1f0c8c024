use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use shelfscan_schema::{ExtractedDate, RecognizedProduct};
use thiserror::Error;

use crate::{DateExtractor, ExtractionOutcome, ProductRecognizer, RecognitionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerErrorKind {
    RateLimit,
    ServerError,
    Timeout,
    AuthError,
    InvalidRequest,
    Unknown,
}

impl RecognizerErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthError,
            400 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError | Self::Timeout)
    }
}

#[derive(Debug, Error)]
#[error("{service} api error ({kind:?}){retryable}: status {status}: {message}")]
pub struct ApiStatusError {
    pub service: &'static str,
    pub kind: RecognizerErrorKind,
    retryable: &'static str,
    pub status: u16,
    pub message: String,
}

fn status_error(service: &'static str, status: StatusCode, body: &str) -> ApiStatusError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    let kind = RecognizerErrorKind::from_status(status);
    ApiStatusError {
        service,
        kind,
        retryable: if kind.is_retryable() { " [retryable]" } else { "" },
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Serialize)]
struct ApiScanRequest<'a> {
    image_ref: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiRecognizeResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    products: Vec<RecognizedProduct>,
    #[serde(default)]
    processing_time_ms: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiExtractResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    dates: Vec<ExtractedDate>,
    #[serde(default)]
    processing_time_ms: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .unwrap_or_default()
}

/// Product-recognition service over HTTP. Opaque to us: one JSON POST in,
/// a list of candidate products out.
#[derive(Debug, Clone)]
pub struct HttpProductRecognizer {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl HttpProductRecognizer {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProductRecognizer for HttpProductRecognizer {
    async fn recognize(&self, image_ref: &str) -> Result<RecognitionOutcome> {
        let url = format!("{}/v1/recognize", self.api_base);
        tracing::debug!(image_ref, "requesting product recognition");
        let started = Instant::now();

        let resp = match self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&ApiScanRequest { image_ref })
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(anyhow::anyhow!(
                    "recognizer api error (timeout) [retryable]: request timed out after 60s"
                ));
            }
            Err(e) if e.is_connect() => {
                return Err(anyhow::anyhow!(
                    "recognizer api error (connect) [retryable]: {e}"
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await?;
            return Err(status_error("recognizer", status, &text).into());
        }

        let body: ApiRecognizeResponse = resp.json().await?;
        let elapsed = started.elapsed().as_millis() as u64;
        Ok(RecognitionOutcome {
            success: body.success.unwrap_or(body.error.is_none()),
            products: body.products,
            processing_time_ms: body.processing_time_ms.unwrap_or(elapsed),
            error: body.error,
        })
    }
}

/// Label-date extraction (OCR) service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDateExtractor {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl HttpDateExtractor {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DateExtractor for HttpDateExtractor {
    async fn extract(&self, image_ref: &str) -> Result<ExtractionOutcome> {
        let url = format!("{}/v1/extract-dates", self.api_base);
        tracing::debug!(image_ref, "requesting label date extraction");
        let started = Instant::now();

        let resp = match self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&ApiScanRequest { image_ref })
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(anyhow::anyhow!(
                    "extractor api error (timeout) [retryable]: request timed out after 60s"
                ));
            }
            Err(e) if e.is_connect() => {
                return Err(anyhow::anyhow!(
                    "extractor api error (connect) [retryable]: {e}"
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await?;
            return Err(status_error("extractor", status, &text).into());
        }

        let body: ApiExtractResponse = resp.json().await?;
        let elapsed = started.elapsed().as_millis() as u64;
        Ok(ExtractionOutcome {
            success: body.success.unwrap_or(body.error.is_none()),
            dates: body.dates,
            processing_time_ms: body.processing_time_ms.unwrap_or(elapsed),
            error: body.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_from_status() {
        assert_eq!(
            RecognizerErrorKind::from_status(StatusCode::TOO_MANY_REQUESTS),
            RecognizerErrorKind::RateLimit
        );
        assert_eq!(
            RecognizerErrorKind::from_status(StatusCode::UNAUTHORIZED),
            RecognizerErrorKind::AuthError
        );
        assert_eq!(
            RecognizerErrorKind::from_status(StatusCode::BAD_GATEWAY),
            RecognizerErrorKind::ServerError
        );
        assert_eq!(
            RecognizerErrorKind::from_status(StatusCode::IM_A_TEAPOT),
            RecognizerErrorKind::Unknown
        );
    }

    #[test]
    fn retryable_kinds() {
        assert!(RecognizerErrorKind::RateLimit.is_retryable());
        assert!(RecognizerErrorKind::ServerError.is_retryable());
        assert!(RecognizerErrorKind::Timeout.is_retryable());
        assert!(!RecognizerErrorKind::AuthError.is_retryable());
        assert!(!RecognizerErrorKind::InvalidRequest.is_retryable());
    }

    #[test]
    fn status_error_prefers_structured_message() {
        let err = status_error(
            "recognizer",
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "slow down"}}"#,
        );
        assert_eq!(err.message, "slow down");
        assert!(err.to_string().contains("[retryable]"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let recognizer = HttpProductRecognizer::new("key", "https://vision.example.com/");
        assert_eq!(recognizer.api_base, "https://vision.example.com");
    }
}
