//! Workflow definition types, loading and validation

mod definition;
mod error;
mod graph;
mod loader;
mod validate;

pub use definition::{DEFAULT_PATH, Definition, Env, StepConfig};
pub use error::LoadError;
pub use loader::{load, load_unvalidated};
pub use validate::{ValidationError, validate};

#[cfg(test)]
pub use definition::WorkflowConfig;
#[cfg(test)]
pub use validate::ValidationCode;
