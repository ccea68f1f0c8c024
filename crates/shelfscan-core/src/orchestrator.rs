use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use shelfscan_memory::InventoryStore;
use shelfscan_provider::{
    DateExtractor, ExtractionOutcome, ProductRecognizer, RecognitionOutcome,
};
use shelfscan_schema::{
    ExpiryResolution, InventoryItem, ScanProgress, ScanResult, ScanStage, ValidationReport,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::resolver::ExpiryResolver;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Deadline per collaborator call. A call that outlives it counts
    /// as a failed side of the join, not a failed scan.
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of the full staged pipeline: the raw join plus whatever was
/// resolved and written.
#[derive(Debug, Clone)]
pub struct ScanPipelineOutcome {
    pub scan_result: ScanResult,
    pub resolved_items: Vec<ExpiryResolution>,
    pub stored_items: Vec<InventoryItem>,
    pub total_processing_time_ms: u64,
}

/// Fans a captured image out to the two recognizers, joins their
/// results, and optionally drives the resolve-and-persist pipeline.
///
/// The fan-out is a join, never a race: both sides always settle, and
/// a fast failure on one side neither cancels nor shortcuts the other.
pub struct ScanOrchestrator {
    recognizer: Arc<dyn ProductRecognizer>,
    extractor: Arc<dyn DateExtractor>,
    inventory: Arc<dyn InventoryStore>,
    resolver: Arc<ExpiryResolver>,
    config: OrchestratorConfig,
}

impl ScanOrchestrator {
    pub fn new(
        recognizer: Arc<dyn ProductRecognizer>,
        extractor: Arc<dyn DateExtractor>,
        inventory: Arc<dyn InventoryStore>,
        resolver: Arc<ExpiryResolver>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            recognizer,
            extractor,
            inventory,
            resolver,
            config,
        }
    }

    /// Run both recognizers concurrently and merge whatever they
    /// yielded. Absorbs single-side failures; never returns an error.
    /// Idempotent, so retrying is simply calling again.
    pub async fn scan(&self, image_ref: &str, cancel: &CancellationToken) -> ScanResult {
        let trace_id = Uuid::new_v4();
        let started = Instant::now();

        let (recognition, extraction) = tokio::join!(
            self.recognize_guarded(image_ref, cancel),
            self.extract_guarded(image_ref, cancel),
        );
        let processing_time_ms = started.elapsed().as_millis() as u64;

        if cancel.is_cancelled() {
            tracing::info!(%trace_id, "scan cancelled");
            return ScanResult {
                trace_id,
                success: false,
                products: vec![],
                dates: vec![],
                processing_time_ms,
                error: Some("scan cancelled".into()),
            };
        }

        let recognition_error = (!recognition.success).then(|| {
            recognition
                .error
                .clone()
                .unwrap_or_else(|| "product recognition failed".into())
        });
        let extraction_error = (!extraction.success).then(|| {
            extraction
                .error
                .clone()
                .unwrap_or_else(|| "date extraction failed".into())
        });

        match (recognition_error, extraction_error) {
            (Some(recognition_error), Some(extraction_error)) => {
                tracing::warn!(%trace_id, "both scan sources failed");
                ScanResult {
                    trace_id,
                    success: false,
                    products: vec![],
                    dates: vec![],
                    processing_time_ms,
                    error: Some(format!(
                        "both product recognition and date extraction failed: {recognition_error}; {extraction_error}"
                    )),
                }
            }
            _ => {
                tracing::info!(
                    %trace_id,
                    products = recognition.products.len(),
                    dates = extraction.dates.len(),
                    processing_time_ms,
                    "scan joined"
                );
                ScanResult {
                    trace_id,
                    success: true,
                    products: recognition.products,
                    dates: extraction.dates,
                    processing_time_ms,
                    error: None,
                }
            }
        }
    }

    /// Staged variant: emits advisory progress events in strictly
    /// increasing order, resolves every recognized product against the
    /// full extracted-date list, and writes each through the inventory
    /// collaborator. A failed write skips that item and the batch
    /// continues.
    pub async fn scan_with_progress<F>(
        &self,
        image_ref: &str,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<ScanPipelineOutcome>
    where
        F: FnMut(ScanProgress),
    {
        let started = Instant::now();

        if image_ref.trim().is_empty() {
            on_progress(ScanProgress::new(
                ScanStage::Error,
                0,
                "image reference is empty",
            ));
            bail!("image reference is empty");
        }

        on_progress(ScanProgress::new(
            ScanStage::Initializing,
            10,
            "preparing scan",
        ));
        on_progress(ScanProgress::new(
            ScanStage::Recognizing,
            25,
            "recognizing products",
        ));

        let scan_result = self.scan(image_ref, cancel).await;

        if cancel.is_cancelled() {
            on_progress(ScanProgress::new(ScanStage::Error, 0, "scan cancelled"));
            bail!("scan cancelled");
        }

        on_progress(ScanProgress::new(
            ScanStage::Recognizing,
            50,
            format!("recognized {} products", scan_result.products.len()),
        ));
        on_progress(ScanProgress::new(
            ScanStage::ExtractingDates,
            60,
            "reading label dates",
        ));
        on_progress(ScanProgress::new(
            ScanStage::ExtractingDates,
            80,
            format!("extracted {} candidate dates", scan_result.dates.len()),
        ));
        on_progress(ScanProgress::new(
            ScanStage::Saving,
            85,
            "resolving and saving items",
        ));

        let mut resolved_items = Vec::with_capacity(scan_result.products.len());
        let mut stored_items = Vec::new();
        for product in &scan_result.products {
            // Brand is deliberately not plumbed through from recognition.
            let resolution = self
                .resolver
                .resolve(&product.name, &scan_result.dates, None)
                .await;

            match self
                .inventory
                .add_item(product, &scan_result.dates, image_ref)
                .await
            {
                Ok(item) => stored_items.push(item),
                Err(e) => {
                    tracing::warn!("failed to store {}: {e}", product.name);
                }
            }
            resolved_items.push(resolution);
        }

        on_progress(ScanProgress::new(ScanStage::Complete, 100, "scan complete"));

        Ok(ScanPipelineOutcome {
            scan_result,
            resolved_items,
            stored_items,
            total_processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Guarded recognizer call: cancellation and the per-call deadline
    /// both collapse into "this side failed", keeping the join alive.
    async fn recognize_guarded(
        &self,
        image_ref: &str,
        cancel: &CancellationToken,
    ) -> RecognitionOutcome {
        let call = self.recognizer.recognize(image_ref);
        tokio::select! {
            _ = cancel.cancelled() => RecognitionOutcome::failed("cancelled"),
            result = tokio::time::timeout(self.config.call_timeout, call) => match result {
                Err(_) => {
                    tracing::warn!(
                        "product recognition timed out after {:?}",
                        self.config.call_timeout
                    );
                    RecognitionOutcome::failed(format!(
                        "product recognition timed out after {:?}",
                        self.config.call_timeout
                    ))
                }
                Ok(Err(e)) => {
                    tracing::warn!("product recognition failed: {e}");
                    RecognitionOutcome::failed(e.to_string())
                }
                Ok(Ok(outcome)) => outcome,
            },
        }
    }

    async fn extract_guarded(
        &self,
        image_ref: &str,
        cancel: &CancellationToken,
    ) -> ExtractionOutcome {
        let call = self.extractor.extract(image_ref);
        tokio::select! {
            _ = cancel.cancelled() => ExtractionOutcome::failed("cancelled"),
            result = tokio::time::timeout(self.config.call_timeout, call) => match result {
                Err(_) => {
                    tracing::warn!(
                        "date extraction timed out after {:?}",
                        self.config.call_timeout
                    );
                    ExtractionOutcome::failed(format!(
                        "date extraction timed out after {:?}",
                        self.config.call_timeout
                    ))
                }
                Ok(Err(e)) => {
                    tracing::warn!("date extraction failed: {e}");
                    ExtractionOutcome::failed(e.to_string())
                }
                Ok(Ok(outcome)) => outcome,
            },
        }
    }
}

const MIN_SIGNAL_CONFIDENCE: f32 = 0.3;

/// Flag weak or stale scan signals. Pure; never fails.
pub fn validate(scan: &ScanResult) -> ValidationReport {
    validate_at(scan, Utc::now().date_naive())
}

pub fn validate_at(scan: &ScanResult, today: NaiveDate) -> ValidationReport {
    let mut issues = Vec::new();

    if scan.products.is_empty() {
        issues.push("no products recognized".to_string());
    }
    for product in &scan.products {
        if product.confidence < MIN_SIGNAL_CONFIDENCE {
            issues.push(format!(
                "low confidence product: {} ({:.2})",
                product.name, product.confidence
            ));
        }
    }

    if scan.dates.is_empty() {
        issues.push("no expiration dates detected".to_string());
    }
    for date in &scan.dates {
        if date.confidence < MIN_SIGNAL_CONFIDENCE {
            issues.push(format!(
                "low confidence date: {} ({:.2})",
                date.date, date.confidence
            ));
        }
        if date.date <= today {
            issues.push(format!("date {} is not in the future", date.date));
        }
    }

    ValidationReport {
        is_valid: issues.is_empty(),
        issues,
    }
}
