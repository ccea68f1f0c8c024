use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use shelfscan_schema::{normalize_item_name, KnowledgeEntry, ProductCategory, Season};

/// Static per-item shelf-life knowledge: baseline day-counts, seasonal
/// and brand day-count variations, storage-condition tags.
///
/// Immutable at runtime; built once at startup, optionally merged with
/// a YAML overlay before the first scan.
pub struct ProductKnowledgeBase {
    entries: HashMap<String, KnowledgeEntry>,
}

fn entry(
    name: &str,
    category: ProductCategory,
    baseline_expiration_days: u32,
    storage_conditions: &[&str],
) -> KnowledgeEntry {
    KnowledgeEntry {
        name: name.to_string(),
        category,
        baseline_expiration_days,
        storage_conditions: storage_conditions.iter().map(|s| s.to_string()).collect(),
        seasonal_variations: None,
        brand_variations: None,
    }
}

fn with_seasons(mut e: KnowledgeEntry, seasons: &[(Season, u32)]) -> KnowledgeEntry {
    e.seasonal_variations = Some(seasons.iter().copied().collect());
    e
}

fn with_brands(mut e: KnowledgeEntry, brands: &[(&str, u32)]) -> KnowledgeEntry {
    e.brand_variations = Some(
        brands
            .iter()
            .map(|(brand, days)| (normalize_item_name(brand), *days))
            .collect(),
    );
    e
}

impl ProductKnowledgeBase {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Curated builtin table. Day-counts follow common food-safety
    /// guidance; seasonal values are stored as day-counts, not factors.
    pub fn builtin() -> Self {
        use ProductCategory::*;
        use Season::*;

        let mut kb = Self::empty();
        let entries = vec![
            with_brands(
                entry("milk", Dairy, 7, &["refrigerated"]),
                &[("organic valley", 10)],
            ),
            entry("yogurt", Dairy, 14, &["refrigerated"]),
            entry(
                "cheese",
                Dairy,
                21,
                &["refrigerated", "airtight_container", "low_humidity"],
            ),
            entry("eggs", Dairy, 28, &["refrigerated"]),
            entry("butter", Dairy, 30, &["refrigerated"]),
            entry("chicken", Meat, 2, &["refrigerated", "sealed_packaging"]),
            entry("beef", Meat, 3, &["refrigerated", "sealed_packaging"]),
            entry("fish", Meat, 2, &["refrigerated", "sealed_packaging"]),
            // Summer heat shortens vine produce noticeably.
            with_seasons(
                entry("tomato", Vegetables, 7, &["room_temperature", "away_from_sunlight"]),
                &[(Summer, 5)],
            ),
            entry(
                "carrot",
                Vegetables,
                21,
                &["refrigerated", "dark_place", "high_humidity"],
            ),
            entry(
                "potato",
                Vegetables,
                30,
                &["dark_place", "cool_place", "ventilated"],
            ),
            entry(
                "onion",
                Vegetables,
                30,
                &["dark_place", "ventilated", "room_temperature"],
            ),
            entry("lettuce", Vegetables, 7, &["refrigerated", "high_humidity"]),
            with_seasons(
                entry(
                    "apple",
                    Fruits,
                    28,
                    &["refrigerated", "separate_from_vegetables"],
                ),
                &[(Autumn, 35)],
            ),
            entry("banana", Fruits, 5, &["room_temperature", "away_from_sunlight"]),
            entry("bread", Pantry, 5, &["room_temperature", "airtight_container"]),
            entry("rice", Pantry, 365, &["airtight_container", "dry_place"]),
            entry("pasta", Pantry, 365, &["airtight_container", "dry_place"]),
        ];
        for e in entries {
            kb.insert(e);
        }
        kb
    }

    /// Insert or replace an entry, keyed by the normalized name.
    pub fn insert(&mut self, entry: KnowledgeEntry) {
        self.entries
            .insert(normalize_item_name(&entry.name), entry);
    }

    /// Merge a YAML overlay file (a list of entries). Overlay entries
    /// replace builtin ones with the same normalized name. Returns the
    /// number of entries merged.
    pub fn merge_overlay_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read knowledge overlay {}", path.display()))?;
        let overlay: Vec<KnowledgeEntry> = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse knowledge overlay {}", path.display()))?;
        let merged = overlay.len();
        for entry in overlay {
            self.insert(entry);
        }
        Ok(merged)
    }

    /// Lookup by any spelling of the name; the key is normalized.
    pub fn get(&self, name: &str) -> Option<&KnowledgeEntry> {
        self.entries.get(&normalize_item_name(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_curated_staples() {
        let kb = ProductKnowledgeBase::builtin();
        assert!(kb.len() >= 15);
        assert!(kb.get("milk").is_some());
        assert!(kb.get("carrot").is_some());
    }

    #[test]
    fn lookup_is_case_and_whitespace_insensitive() {
        let kb = ProductKnowledgeBase::builtin();
        assert!(kb.get("  Tomato ").is_some());
        assert!(kb.get("CHEESE").is_some());
    }

    #[test]
    fn carrot_is_well_characterized() {
        let kb = ProductKnowledgeBase::builtin();
        let carrot = kb.get("carrot").unwrap();
        for condition in ["refrigerated", "dark_place", "high_humidity"] {
            assert!(
                carrot.storage_conditions.iter().any(|c| c == condition),
                "missing {condition}"
            );
        }
    }

    #[test]
    fn tomato_has_a_summer_day_count() {
        let kb = ProductKnowledgeBase::builtin();
        let tomato = kb.get("tomato").unwrap();
        assert_eq!(tomato.baseline_expiration_days, 7);
        let seasonal = tomato.seasonal_variations.as_ref().unwrap();
        assert_eq!(seasonal.get(&Season::Summer), Some(&5));
    }

    #[test]
    fn overlay_replaces_matching_entries() {
        let tmp = tempfile::TempDir::new().unwrap();
        let overlay = tmp.path().join("overlay.yaml");
        std::fs::write(
            &overlay,
            r#"
- name: milk
  category: dairy
  baseline_expiration_days: 9
- name: kimchi
  category: vegetables
  baseline_expiration_days: 90
  storage_conditions: [refrigerated, airtight_container]
"#,
        )
        .unwrap();

        let mut kb = ProductKnowledgeBase::builtin();
        let before = kb.len();
        let merged = kb.merge_overlay_file(&overlay).unwrap();
        assert_eq!(merged, 2);
        assert_eq!(kb.get("milk").unwrap().baseline_expiration_days, 9);
        assert_eq!(kb.get("kimchi").unwrap().baseline_expiration_days, 90);
        assert_eq!(kb.len(), before + 1);
    }

    #[test]
    fn missing_overlay_is_an_error() {
        let mut kb = ProductKnowledgeBase::empty();
        assert!(kb.merge_overlay_file("/nonexistent/overlay.yaml").is_err());
    }
}
