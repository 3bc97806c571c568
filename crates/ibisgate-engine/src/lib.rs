//! ibisgate engine - classification and validation logic
//!
//! This crate takes buffer model records through the checking pipeline:
//! - Model type registry (type -> group -> rule)
//! - Presence & default resolution
//! - Structural validation
//! - Test-load finalization

pub mod registry;
pub mod resolver;
pub mod validator;
pub mod finalizer;
pub mod pipeline;

pub use registry::{
    ClassificationRule, ModelGroup, RegistryError, RequiredData, RuleRegistry, ThresholdPolicy,
    MODEL_GROUPS,
};
pub use resolver::{resolve, Resolver};
pub use validator::validate;
pub use finalizer::finalize;
pub use pipeline::{Pipeline, ProcessedRecord};
