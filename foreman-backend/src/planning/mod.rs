//! Plan-before-execute: reasoning text becomes a validated, single-use plan
//! that `execute_tool` must consume.

pub mod derive;
pub mod extractor;
pub mod intent;
pub mod store;
pub mod validation;

pub use derive::{DerivationRequest, LexicalPlanDeriver, LlmPlanDeriver, PlanDeriver};
pub use extractor::PlanExtractor;
pub use intent::{DetectedIntent, IntentClassifier, LexicalIntentClassifier};
pub use store::{ExecutionPlan, PlanStore};
pub use validation::{validate_arguments, ValidationReport};
