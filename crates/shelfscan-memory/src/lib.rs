pub mod inventory;
pub mod ledger;

pub use inventory::{InventoryStore, JsonInventoryStore};
pub use ledger::CorrectionLedger;
