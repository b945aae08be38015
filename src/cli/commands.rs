//! CLI command implementations
//!
//! Each command writes exactly one JSON document to `out` and returns the
//! process exit code. Load failures are returned as errors.

use super::output::{OutputHandler, write_json};
use super::signals::CancellationToken;
use crate::config::{self, Definition, ValidationError};
use crate::workflow::{RunOptions, ShellRunner, WorkflowRunner, parse_params};
use anyhow::Context;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Exit code for usage errors such as a malformed parameter
pub const EXIT_USAGE: i32 = 2;

/// Arguments for `run`
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub file: PathBuf,
    pub workflow: String,
    pub params: Vec<String>,
    pub dry_run: bool,
    pub pretty: bool,
}

/// Output of `validate`
#[derive(Debug, Serialize)]
pub struct ValidateReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

/// One entry of `list`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub private: bool,
    pub step_count: usize,
}

fn resolve_path(file: &Path) -> anyhow::Result<PathBuf> {
    let trimmed = file.to_string_lossy();
    std::path::absolute(trimmed.trim())
        .with_context(|| format!("resolve path {}", file.display()))
}

/// Run a workflow
pub async fn run_workflow<W: Write>(
    args: &RunArgs,
    shell: ShellRunner,
    cancel: &CancellationToken,
    handler: &dyn OutputHandler,
    out: W,
) -> anyhow::Result<i32> {
    let path = resolve_path(&args.file).context("workflow run")?;
    let definition = config::load(&path).context("workflow run")?;

    let params = match parse_params(&args.params) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_USAGE);
        }
    };

    let runner = WorkflowRunner::new(Arc::new(definition), shell);
    let opts = RunOptions {
        workflow_name: args.workflow.clone(),
        params,
        dry_run: args.dry_run,
    };
    let result = runner
        .run(&opts, cancel, handler)
        .await
        .context("workflow run")?;

    write_json(out, &result, args.pretty)?;

    Ok(if result.is_success() { 0 } else { 1 })
}

/// Validate a definition file, reporting every error found
pub fn validate_workflow<W: Write>(file: &Path, pretty: bool, out: W) -> anyhow::Result<i32> {
    let path = resolve_path(file).context("workflow validate")?;
    let definition = config::load_unvalidated(&path).context("workflow validate")?;

    let errors = config::validate(&definition);
    let report = ValidateReport {
        valid: errors.is_empty(),
        errors,
    };
    write_json(out, &report, pretty)?;

    Ok(if report.valid { 0 } else { 1 })
}

/// Workflow summaries sorted by name, private ones only with `all`
pub fn summarize(definition: &Definition, all: bool) -> Vec<WorkflowSummary> {
    definition
        .sorted_names()
        .into_iter()
        .filter_map(|name| {
            let wf = definition.get_workflow(name)?;
            (all || !wf.private).then(|| WorkflowSummary {
                name: name.to_string(),
                description: wf.description.clone(),
                private: wf.private,
                step_count: wf.steps.len(),
            })
        })
        .collect()
}

/// List workflows in a definition file
pub fn list_workflows<W: Write>(file: &Path, pretty: bool, all: bool, out: W) -> anyhow::Result<i32> {
    let path = resolve_path(file).context("workflow list")?;
    let definition = config::load_unvalidated(&path).context("workflow list")?;

    write_json(out, &summarize(&definition, all), pretty)?;
    Ok(0)
}
