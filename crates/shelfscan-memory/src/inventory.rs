use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use shelfscan_schema::{ExtractedDate, InventoryItem, RecognizedProduct};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Where resolved items land after a scan. External collaborator from
/// the orchestrator's point of view; writes are per-item and
/// independent, with no batch atomicity.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn add_item(
        &self,
        product: &RecognizedProduct,
        dates: &[ExtractedDate],
        image_ref: &str,
    ) -> Result<InventoryItem>;
}

/// Append-only JSONL inventory, one line per stored item.
pub struct JsonInventoryStore {
    items_path: PathBuf,
}

impl JsonInventoryStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            items_path: data_dir.as_ref().join("inventory").join("items.jsonl"),
        }
    }

    /// All items written so far, oldest first.
    pub async fn items(&self) -> Result<Vec<InventoryItem>> {
        let content = match tokio::fs::read_to_string(&self.items_path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut items = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("skipping malformed inventory line: {e}"),
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl InventoryStore for JsonInventoryStore {
    async fn add_item(
        &self,
        product: &RecognizedProduct,
        dates: &[ExtractedDate],
        image_ref: &str,
    ) -> Result<InventoryItem> {
        let now = Utc::now();
        // Label date wins when one was read; otherwise fall back to the
        // recognizer's shelf-life guess.
        let expiration_date = dates
            .first()
            .map(|d| d.date)
            .or_else(|| {
                Some(now.date_naive() + Duration::days(i64::from(product.suggested_expiration_days)))
            });

        let item = InventoryItem {
            id: Uuid::new_v4(),
            name: product.name.clone(),
            category: product.category,
            expiration_date,
            image_ref: image_ref.to_string(),
            added_at: now,
        };

        if let Some(parent) = self.items_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.items_path)
            .await?;
        let line = serde_json::to_string(&item)?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;

        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shelfscan_schema::{DateLabelFormat, ProductCategory};

    fn product(name: &str, days: u32) -> RecognizedProduct {
        RecognizedProduct {
            name: name.into(),
            confidence: 0.9,
            category: ProductCategory::Dairy,
            suggested_expiration_days: days,
            barcode: None,
        }
    }

    #[tokio::test]
    async fn add_item_appends_one_line_per_item() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = JsonInventoryStore::new(tmp.path());

        store.add_item(&product("milk", 7), &[], "img-1").await.unwrap();
        store.add_item(&product("yogurt", 14), &[], "img-1").await.unwrap();

        let items = store.items().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "milk");
        assert_eq!(items[1].name, "yogurt");
    }

    #[tokio::test]
    async fn label_date_wins_over_shelf_life_guess() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = JsonInventoryStore::new(tmp.path());
        let label = ExtractedDate {
            date: NaiveDate::from_ymd_opt(2027, 1, 31).unwrap(),
            confidence: 0.8,
            format: DateLabelFormat::UseBy,
            raw_text: "USE BY 31 JAN 2027".into(),
        };

        let item = store
            .add_item(&product("milk", 7), &[label], "img-2")
            .await
            .unwrap();
        assert_eq!(
            item.expiration_date,
            NaiveDate::from_ymd_opt(2027, 1, 31)
        );
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = JsonInventoryStore::new(tmp.path());
        assert!(store.items().await.unwrap().is_empty());
    }
}
