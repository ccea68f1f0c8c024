use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A single product identity proposed by the product recognizer.
/// Immutable once returned; the recognizer never reads label dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedProduct {
    pub name: String,
    /// Recognizer self-reported confidence in [0, 1].
    pub confidence: f32,
    pub category: ProductCategory,
    /// Recognizer's own shelf-life guess, in days. Always positive.
    pub suggested_expiration_days: u32,
    #[serde(default)]
    pub barcode: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Fruits,
    Vegetables,
    Dairy,
    Meat,
    Pantry,
    Beverages,
    Snacks,
    Frozen,
    Other,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fruits => "fruits",
            Self::Vegetables => "vegetables",
            Self::Dairy => "dairy",
            Self::Meat => "meat",
            Self::Pantry => "pantry",
            Self::Beverages => "beverages",
            Self::Snacks => "snacks",
            Self::Frozen => "frozen",
            Self::Other => "other",
        }
    }
}

/// A candidate calendar date read off the label by the date extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDate {
    pub date: NaiveDate,
    /// Extractor self-reported confidence in [0, 1].
    pub confidence: f32,
    pub format: DateLabelFormat,
    /// The label text the date was parsed from. Never empty.
    pub raw_text: String,
}

/// Label vocabulary the extractor distinguishes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DateLabelFormat {
    BestBefore,
    ExpiresOn,
    UseBy,
    SellBy,
}

/// Fan-in result of one scan: whatever each recognizer yielded.
/// `success` is true when at least one side of the join succeeded.
/// No further mutation after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub trace_id: Uuid,
    pub success: bool,
    pub products: Vec<RecognizedProduct>,
    pub dates: Vec<ExtractedDate>,
    /// Wall-clock time from invocation to join completion.
    pub processing_time_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Tri-level classification derived from the cascade step that produced
/// a resolution. Ordered: low < medium < high.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Ocr,
    Ai,
    Manual,
    None,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ocr => "ocr",
            Self::Ai => "ai",
            Self::Manual => "manual",
            Self::None => "none",
        }
    }
}

/// One expiry decision for one item. Value object: corrections are
/// recorded separately and never mutate an existing resolution.
///
/// `final_date`, when present, always equals `ocr_result` or
/// `ai_suggestion`. `requires_user_input` holds exactly when
/// `source == Manual`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryResolution {
    pub item_name: String,
    #[serde(default)]
    pub ocr_result: Option<NaiveDate>,
    #[serde(default)]
    pub ai_suggestion: Option<NaiveDate>,
    #[serde(default)]
    pub final_date: Option<NaiveDate>,
    pub confidence: ConfidenceLevel,
    pub source: ResolutionSource,
    pub requires_user_input: bool,
    #[serde(default)]
    pub storage_conditions: Option<Vec<String>>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Intermediate AI-cascade result before being wrapped into a resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirySuggestion {
    pub date: NaiveDate,
    pub confidence: f32,
    pub source: ResolutionSource,
    pub reasoning: String,
    pub storage_conditions: Vec<String>,
}

/// A user-supplied fix for a resolution we got wrong. Append-only;
/// entries are immutable once written to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCorrection {
    /// Lower-cased at record time so ledger lookups are exact.
    pub item_name: String,
    #[serde(default)]
    pub original_date: Option<NaiveDate>,
    pub corrected_date: NaiveDate,
    pub original_source: ResolutionSource,
    pub timestamp: DateTime<Utc>,
}

/// One entry of a batch resolve request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResolveItem {
    pub name: String,
    #[serde(default)]
    pub ocr_dates: Vec<ExtractedDate>,
    #[serde(default)]
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScanStage {
    Initializing,
    Recognizing,
    ExtractingDates,
    Saving,
    Complete,
    Error,
}

/// Advisory progress event emitted between pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    pub stage: ScanStage,
    pub percent_complete: u8,
    pub message: String,
}

impl ScanProgress {
    pub fn new(stage: ScanStage, percent_complete: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent_complete,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Northern-hemisphere meteorological seasons.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from_month(date.month())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }
}

/// Static shelf-life knowledge for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub name: String,
    pub category: ProductCategory,
    pub baseline_expiration_days: u32,
    #[serde(default)]
    pub storage_conditions: Vec<String>,
    /// Season-specific day-counts that replace the baseline when the
    /// resolution happens in that season.
    #[serde(default)]
    pub seasonal_variations: Option<HashMap<Season, u32>>,
    /// Brand-specific day-counts that replace the (possibly seasonal)
    /// day-count when the caller supplies a matching brand.
    #[serde(default)]
    pub brand_variations: Option<HashMap<String, u32>>,
}

/// Canonical item-name key used by the knowledge base and the
/// correction ledger. Lookups and ledger entries agree on this form.
pub fn normalize_item_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// An item as written through the inventory collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    pub image_ref: String,
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serde_is_snake_case() {
        let json = serde_json::to_value(ProductCategory::Vegetables).unwrap();
        assert_eq!(json, "vegetables");
        let back: ProductCategory = serde_json::from_value(json).unwrap();
        assert_eq!(back, ProductCategory::Vegetables);
    }

    #[test]
    fn date_label_format_is_kebab_case() {
        let json = serde_json::to_value(DateLabelFormat::BestBefore).unwrap();
        assert_eq!(json, "best-before");
        let back: DateLabelFormat = serde_json::from_value(json).unwrap();
        assert_eq!(back, DateLabelFormat::BestBefore);
    }

    #[test]
    fn confidence_levels_are_ordered() {
        assert!(ConfidenceLevel::Low < ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
    }

    #[test]
    fn season_from_month_covers_the_year() {
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(4), Season::Spring);
        assert_eq!(Season::from_month(7), Season::Summer);
        assert_eq!(Season::from_month(10), Season::Autumn);
        assert_eq!(Season::from_month(12), Season::Winter);
    }

    #[test]
    fn season_of_date() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        assert_eq!(Season::of(d), Season::Summer);
    }

    #[test]
    fn scan_result_roundtrip_keeps_optional_error() {
        let result = ScanResult {
            trace_id: Uuid::new_v4(),
            success: false,
            products: vec![],
            dates: vec![],
            processing_time_ms: 42,
            error: Some("both product recognition and date extraction failed".into()),
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: ScanResult = serde_json::from_str(&json).unwrap();
        assert!(!back.success);
        assert_eq!(back.processing_time_ms, 42);
        assert!(back.error.unwrap().contains("failed"));
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_item_name("  Whole Milk "), "whole milk");
        assert_eq!(normalize_item_name("CARROT"), "carrot");
    }

    #[test]
    fn knowledge_entry_deserializes_without_variations() {
        let entry: KnowledgeEntry = serde_json::from_value(serde_json::json!({
            "name": "bread",
            "category": "pantry",
            "baseline_expiration_days": 5
        }))
        .unwrap();
        assert!(entry.seasonal_variations.is_none());
        assert!(entry.brand_variations.is_none());
        assert!(entry.storage_conditions.is_empty());
    }
}
