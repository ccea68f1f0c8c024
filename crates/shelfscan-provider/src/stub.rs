//! Canned recognizers for offline runs and tests.

use anyhow::Result;
use async_trait::async_trait;
use shelfscan_schema::{ExtractedDate, ProductCategory, RecognizedProduct};

use crate::{DateExtractor, ExtractionOutcome, ProductRecognizer, RecognitionOutcome};

/// Returns a fixed product list for every image.
#[derive(Debug, Clone)]
pub struct StaticRecognizer {
    products: Vec<RecognizedProduct>,
}

impl StaticRecognizer {
    pub fn new(products: Vec<RecognizedProduct>) -> Self {
        Self { products }
    }

    /// A small representative basket.
    pub fn sample() -> Self {
        Self::new(vec![
            RecognizedProduct {
                name: "milk".into(),
                confidence: 0.92,
                category: ProductCategory::Dairy,
                suggested_expiration_days: 7,
                barcode: None,
            },
            RecognizedProduct {
                name: "carrot".into(),
                confidence: 0.85,
                category: ProductCategory::Vegetables,
                suggested_expiration_days: 21,
                barcode: None,
            },
        ])
    }
}

#[async_trait]
impl ProductRecognizer for StaticRecognizer {
    async fn recognize(&self, _image_ref: &str) -> Result<RecognitionOutcome> {
        Ok(RecognitionOutcome {
            success: true,
            products: self.products.clone(),
            processing_time_ms: 1,
            error: None,
        })
    }
}

/// Returns a fixed date list for every image.
#[derive(Debug, Clone)]
pub struct StaticDateExtractor {
    dates: Vec<ExtractedDate>,
}

impl StaticDateExtractor {
    pub fn new(dates: Vec<ExtractedDate>) -> Self {
        Self { dates }
    }

    /// No printed dates found; the common case for fresh produce.
    pub fn empty() -> Self {
        Self::new(vec![])
    }
}

#[async_trait]
impl DateExtractor for StaticDateExtractor {
    async fn extract(&self, _image_ref: &str) -> Result<ExtractionOutcome> {
        Ok(ExtractionOutcome {
            success: true,
            dates: self.dates.clone(),
            processing_time_ms: 1,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_recognizer_ignores_image_ref() {
        let recognizer = StaticRecognizer::sample();
        let outcome = recognizer.recognize("file:///any.jpg").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.products.len(), 2);
    }

    #[tokio::test]
    async fn empty_extractor_succeeds_with_no_dates() {
        let extractor = StaticDateExtractor::empty();
        let outcome = extractor.extract("file:///any.jpg").await.unwrap();
        assert!(outcome.success);
        assert!(outcome.dates.is_empty());
    }
}
