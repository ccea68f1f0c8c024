use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use shelfscan_schema::{
    normalize_item_name, BatchResolveItem, ConfidenceLevel, ExpiryResolution, ExpirySuggestion,
    ExtractedDate, ProductCategory, ResolutionSource, Season, UserCorrection,
};
use shelfscan_memory::CorrectionLedger;

use crate::knowledge::ProductKnowledgeBase;

/// An AI suggestion must clear this score to be used without asking.
const AI_CONFIDENCE_GATE: f32 = 0.7;
const BASE_CONFIDENCE_KNOWN: f32 = 0.8;
const BASE_CONFIDENCE_FALLBACK: f32 = 0.5;
const CORRECTION_PENALTY: f32 = 0.1;
/// At most this many corrections count against one item.
const MAX_CORRECTIONS_COUNTED: usize = 3;
/// Entries listing more than two storage conditions are treated as
/// well-characterized.
const WELL_CHARACTERIZED_BONUS: f32 = 0.1;
const CONFIDENCE_FLOOR: f32 = 0.3;
const CONFIDENCE_CEILING: f32 = 0.9;

/// Priority-cascade decision engine: label date, then knowledge-based
/// suggestion, then hand the decision to the user. Degrades, never
/// fails: any internal fault during the first two steps lands on the
/// manual branch.
pub struct ExpiryResolver {
    knowledge: Arc<ProductKnowledgeBase>,
    ledger: Arc<CorrectionLedger>,
}

impl ExpiryResolver {
    pub fn new(knowledge: Arc<ProductKnowledgeBase>, ledger: Arc<CorrectionLedger>) -> Self {
        Self { knowledge, ledger }
    }

    /// Resolve one item against today's date.
    ///
    /// The full candidate list is accepted, but only the first date is
    /// consulted; disambiguating multiple label dates is a policy this
    /// interface leaves open.
    pub async fn resolve(
        &self,
        item_name: &str,
        ocr_dates: &[ExtractedDate],
        brand: Option<&str>,
    ) -> ExpiryResolution {
        self.resolve_at(item_name, ocr_dates, brand, Utc::now().date_naive())
            .await
    }

    pub async fn resolve_at(
        &self,
        item_name: &str,
        ocr_dates: &[ExtractedDate],
        brand: Option<&str>,
        today: NaiveDate,
    ) -> ExpiryResolution {
        // Step 1: a printed date strictly in the future wins outright.
        if let Some(first) = ocr_dates.first() {
            if first.date > today {
                tracing::debug!(item_name, date = %first.date, "label date accepted");
                return ExpiryResolution {
                    item_name: item_name.to_string(),
                    ocr_result: Some(first.date),
                    ai_suggestion: None,
                    final_date: Some(first.date),
                    confidence: ConfidenceLevel::High,
                    source: ResolutionSource::Ocr,
                    requires_user_input: false,
                    storage_conditions: None,
                    reasoning: Some(format!("date read from label text \"{}\"", first.raw_text)),
                };
            }
        }

        // Step 2: knowledge-based suggestion, gated on its score.
        match self.suggest_at(item_name, brand, today).await {
            Ok(suggestion) if suggestion.confidence > AI_CONFIDENCE_GATE => {
                tracing::debug!(
                    item_name,
                    confidence = %suggestion.confidence,
                    "suggestion accepted"
                );
                return ExpiryResolution {
                    item_name: item_name.to_string(),
                    ocr_result: None,
                    ai_suggestion: Some(suggestion.date),
                    final_date: Some(suggestion.date),
                    confidence: ConfidenceLevel::Medium,
                    source: ResolutionSource::Ai,
                    requires_user_input: false,
                    storage_conditions: Some(suggestion.storage_conditions),
                    reasoning: Some(suggestion.reasoning),
                };
            }
            Ok(suggestion) => {
                tracing::debug!(
                    item_name,
                    confidence = %suggestion.confidence,
                    "suggestion below gate"
                );
            }
            Err(e) => {
                tracing::warn!("expiry suggestion failed for {item_name}: {e}");
            }
        }

        // Step 3: ask the user.
        ExpiryResolution {
            item_name: item_name.to_string(),
            ocr_result: None,
            ai_suggestion: None,
            final_date: None,
            confidence: ConfidenceLevel::Low,
            source: ResolutionSource::Manual,
            requires_user_input: true,
            storage_conditions: None,
            reasoning: Some("no reliable date source; please enter the expiration date".into()),
        }
    }

    /// The AI step's engine: knowledge-base lookup with seasonal and
    /// brand day-count overrides, or a coarse keyword classifier when
    /// the item is unknown.
    pub async fn suggest(&self, item_name: &str, brand: Option<&str>) -> Result<ExpirySuggestion> {
        self.suggest_at(item_name, brand, Utc::now().date_naive())
            .await
    }

    pub async fn suggest_at(
        &self,
        item_name: &str,
        brand: Option<&str>,
        today: NaiveDate,
    ) -> Result<ExpirySuggestion> {
        let key = normalize_item_name(item_name);
        let corrections = self.ledger.correction_count(&key).await;

        if let Some(entry) = self.knowledge.get(&key) {
            let mut days = entry.baseline_expiration_days;
            let mut notes = vec![format!("baseline {days} days for {}", entry.name)];

            let season = Season::of(today);
            if let Some(seasonal_days) = entry
                .seasonal_variations
                .as_ref()
                .and_then(|m| m.get(&season))
            {
                days = *seasonal_days;
                notes.push(format!("adjusted to {days} days for {}", season.as_str()));
            }

            if let Some(brand) = brand {
                if let Some(brand_days) = entry
                    .brand_variations
                    .as_ref()
                    .and_then(|m| m.get(&normalize_item_name(brand)))
                {
                    days = *brand_days;
                    notes.push(format!("brand {brand} keeps {days} days"));
                }
            }

            let confidence = score_confidence(
                BASE_CONFIDENCE_KNOWN,
                corrections,
                entry.storage_conditions.len(),
            );
            return Ok(ExpirySuggestion {
                date: today + Duration::days(i64::from(days)),
                confidence,
                source: ResolutionSource::Ai,
                reasoning: notes.join("; "),
                storage_conditions: entry.storage_conditions.clone(),
            });
        }

        let category = classify_by_keywords(&key);
        let days = default_days_for(category);
        let confidence = score_confidence(BASE_CONFIDENCE_FALLBACK, corrections, 0);
        Ok(ExpirySuggestion {
            date: today + Duration::days(i64::from(days)),
            confidence,
            source: ResolutionSource::Ai,
            reasoning: format!("typical {} item storage guidelines", category.as_str()),
            storage_conditions: category_conditions(category),
        })
    }

    /// Record a user correction. Does not touch the knowledge base; it
    /// only damps future suggestion confidence for this item name.
    pub async fn record_correction(
        &self,
        item_name: &str,
        original_date: Option<NaiveDate>,
        corrected_date: NaiveDate,
        original_source: ResolutionSource,
    ) -> Result<()> {
        self.ledger
            .record(UserCorrection {
                item_name: item_name.to_string(),
                original_date,
                corrected_date,
                original_source,
                timestamp: Utc::now(),
            })
            .await
    }

    /// Storage advice: knowledge-base entry, category keyword table, or
    /// the room-temperature default. Pure lookup, no side effects.
    pub fn storage_recommendations(&self, item_name: &str) -> Vec<String> {
        let key = normalize_item_name(item_name);
        if let Some(entry) = self.knowledge.get(&key) {
            if !entry.storage_conditions.is_empty() {
                return entry.storage_conditions.clone();
            }
        }
        storage_by_keywords(&key)
    }

    /// Sequential, order-preserving resolution; items are independent.
    pub async fn batch_resolve(&self, items: &[BatchResolveItem]) -> Vec<ExpiryResolution> {
        let mut resolutions = Vec::with_capacity(items.len());
        for item in items {
            resolutions.push(
                self.resolve(&item.name, &item.ocr_dates, item.brand.as_deref())
                    .await,
            );
        }
        resolutions
    }
}

/// Confidence model: path base, minus 0.1 per recorded correction (at
/// most three counted), plus 0.1 for well-characterized entries,
/// clamped to [0.3, 0.9].
fn score_confidence(base: f32, corrections: usize, storage_conditions: usize) -> f32 {
    let penalty = CORRECTION_PENALTY * corrections.min(MAX_CORRECTIONS_COUNTED) as f32;
    let mut score = base - penalty;
    if storage_conditions > 2 {
        score += WELL_CHARACTERIZED_BONUS;
    }
    score.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
}

fn default_days_for(category: ProductCategory) -> u32 {
    match category {
        ProductCategory::Meat => 3,
        ProductCategory::Fruits => 14,
        _ => 7,
    }
}

const FRUIT_KEYWORDS: &[&str] = &[
    "apple", "banana", "orange", "berry", "grape", "pear", "peach", "mango", "melon", "lemon",
];
const VEGETABLE_KEYWORDS: &[&str] = &[
    "carrot", "tomato", "lettuce", "pepper", "broccoli", "cucumber", "spinach", "onion",
    "potato", "cabbage", "zucchini",
];
const DAIRY_KEYWORDS: &[&str] = &[
    "milk", "yogurt", "yoghurt", "cheese", "cream", "butter", "kefir",
];
const MEAT_KEYWORDS: &[&str] = &[
    "chicken", "beef", "pork", "fish", "meat", "turkey", "sausage", "ham", "salmon",
];

/// Coarse category guess from the item name. Pantry is the catch-all.
fn classify_by_keywords(normalized_name: &str) -> ProductCategory {
    let tables = [
        (ProductCategory::Fruits, FRUIT_KEYWORDS),
        (ProductCategory::Vegetables, VEGETABLE_KEYWORDS),
        (ProductCategory::Dairy, DAIRY_KEYWORDS),
        (ProductCategory::Meat, MEAT_KEYWORDS),
    ];
    for (category, keywords) in tables {
        if keywords.iter().any(|k| normalized_name.contains(k)) {
            return category;
        }
    }
    ProductCategory::Pantry
}

fn category_conditions(category: ProductCategory) -> Vec<String> {
    let conditions: &[&str] = match category {
        ProductCategory::Dairy => &["refrigerated"],
        ProductCategory::Meat => &["refrigerated", "sealed_packaging"],
        ProductCategory::Fruits => &["room_temperature", "away_from_sunlight"],
        ProductCategory::Vegetables => &["refrigerated", "high_humidity"],
        ProductCategory::Frozen => &["frozen"],
        ProductCategory::Beverages => &["cool_place"],
        _ => &["room_temperature"],
    };
    conditions.iter().map(|s| s.to_string()).collect()
}

/// Six category keyword buckets for storage advice on unknown items.
fn storage_by_keywords(normalized_name: &str) -> Vec<String> {
    let tables = [
        (ProductCategory::Dairy, DAIRY_KEYWORDS),
        (ProductCategory::Meat, MEAT_KEYWORDS),
        (ProductCategory::Fruits, FRUIT_KEYWORDS),
        (ProductCategory::Vegetables, VEGETABLE_KEYWORDS),
        (
            ProductCategory::Frozen,
            &["frozen", "ice"] as &[&str],
        ),
        (
            ProductCategory::Beverages,
            &["juice", "soda", "water", "drink"] as &[&str],
        ),
    ];
    for (category, keywords) in tables {
        if keywords.iter().any(|k| normalized_name.contains(k)) {
            return category_conditions(category);
        }
    }
    vec!["room_temperature".to_string()]
}
