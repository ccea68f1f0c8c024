use std::path::PathBuf;

use anyhow::Result;
use shelfscan_schema::{normalize_item_name, UserCorrection};
use tokio::sync::Mutex;

/// Bounded window of corrections kept for confidence damping.
const MAX_ENTRIES: usize = 100;

/// Append-only history of user-supplied date corrections.
///
/// Injected into the resolver explicitly; there is no process-global
/// state. Appends are serialized behind a mutex, existing entries are
/// never rewritten, and the window is trimmed to the most recent
/// [`MAX_ENTRIES`] after each append (oldest dropped first). The whole
/// window persists as a single JSON document so insertion order
/// survives a restart.
pub struct CorrectionLedger {
    path: Option<PathBuf>,
    entries: Mutex<Vec<UserCorrection>>,
}

impl CorrectionLedger {
    /// Open a file-backed ledger, loading any existing history.
    /// A missing file is an empty ledger, not an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// Ledger with no persistence path. Used by tests and one-shot runs.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append one correction, normalizing the item name, then trim and
    /// persist the window.
    pub async fn record(&self, mut correction: UserCorrection) -> Result<()> {
        correction.item_name = normalize_item_name(&correction.item_name);
        let mut entries = self.entries.lock().await;
        entries.push(correction);
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }
        self.persist(&entries).await
    }

    /// Number of recorded corrections for this item name.
    pub async fn correction_count(&self, item_name: &str) -> usize {
        let key = normalize_item_name(item_name);
        let entries = self.entries.lock().await;
        entries.iter().filter(|c| c.item_name == key).count()
    }

    /// Snapshot of the current window, oldest first.
    pub async fn recent(&self) -> Vec<UserCorrection> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    async fn persist(&self, entries: &[UserCorrection]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}
