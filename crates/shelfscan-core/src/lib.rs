pub mod knowledge;
pub mod orchestrator;
pub mod resolver;

pub use knowledge::ProductKnowledgeBase;
pub use orchestrator::{
    validate, validate_at, OrchestratorConfig, ScanOrchestrator, ScanPipelineOutcome,
};
pub use resolver::ExpiryResolver;
