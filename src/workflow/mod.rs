//! Workflow execution engine
//!
//! This module handles:
//! - Environment layering and truthiness
//! - Parameter parsing for `KEY:VALUE` / `KEY=VALUE` tokens
//! - Shell resolution and command execution
//! - Nested workflow expansion bounded by a maximum call depth
//! - Lifecycle hooks around a run
//!
//! # Example
//!
//! ```ignore
//! use asc_workflow::config;
//! use asc_workflow::workflow::{RunOptions, ShellResolver, ShellRunner, WorkflowRunner};
//! use std::sync::Arc;
//!
//! let definition = Arc::new(config::load(path)?);
//! let shell = ShellRunner::new(Arc::new(ShellResolver::new()));
//! let runner = WorkflowRunner::new(definition, shell);
//!
//! let opts = RunOptions { workflow_name: "beta".into(), ..Default::default() };
//! let result = runner.run(&opts, &cancel, &*handler).await?;
//! ```

mod env;
mod executor;
mod params;
mod runner;
mod shell;
mod state;

pub use params::parse_params;
pub use runner::{RunOptions, WorkflowRunner};
pub use shell::{ShellResolver, ShellRunner};
pub use state::StepStatus;
