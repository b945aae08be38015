//! CLI module for asc-workflow
//!
//! This module provides:
//! - Command implementations (run, validate, list)
//! - Output handlers (console, quiet)
//! - Signal handling and run cancellation
//!
//! # Example
//!
//! ```ignore
//! use asc_workflow::cli::{commands, output, signals};
//!
//! let handler = output::create_handler(output::OutputMode::Console, false);
//! let code = commands::run_workflow(&args, shell, &cancel, &*handler, std::io::stdout().lock()).await?;
//! ```

pub mod commands;
pub mod output;
pub mod signals;

pub use commands::{RunArgs, list_workflows, run_workflow, validate_workflow};
pub use output::{OutputEvent, OutputHandler, OutputMode, create_handler};
pub use signals::{CancellationToken, setup_signal_handlers};
