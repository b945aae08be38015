//! Structural validation of workflow definitions
//!
//! Validation never stops at the first problem: every error found in one pass
//! is returned, each tagged with a stable code.

use super::Definition;
use super::graph::{find_cycle, reference_graph};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

static WORKFLOW_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("static regex is valid"));

/// Stable validation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    NoWorkflows,
    InvalidWorkflowName,
    EmptySteps,
    StepNoAction,
    StepEmptyRun,
    #[serde(rename = "step_run_and_workflow")]
    StepConflict,
    StepWithOnRun,
    WorkflowNotFound,
    CyclicReference,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoWorkflows => "no_workflows",
            Self::InvalidWorkflowName => "invalid_workflow_name",
            Self::EmptySteps => "empty_steps",
            Self::StepNoAction => "step_no_action",
            Self::StepEmptyRun => "step_empty_run",
            Self::StepConflict => "step_run_and_workflow",
            Self::StepWithOnRun => "step_with_on_run",
            Self::WorkflowNotFound => "workflow_not_found",
            Self::CyclicReference => "cyclic_reference",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structural problem in a definition
#[derive(Debug, Clone, PartialEq, Eq, Error, Deserialize, Serialize)]
#[error("{message}")]
pub struct ValidationError {
    pub code: ValidationCode,

    /// Offending workflow, if the error is scoped to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,

    /// 1-based step index, if the error is scoped to a step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,

    pub message: String,
}

impl ValidationError {
    fn new(code: ValidationCode, message: String) -> Self {
        Self {
            code,
            workflow: None,
            step: None,
            message,
        }
    }

    fn in_workflow(mut self, workflow: &str) -> Self {
        self.workflow = Some(workflow.to_string());
        self
    }

    fn at_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }
}

/// Check a definition for structural errors
pub fn validate(def: &Definition) -> Vec<ValidationError> {
    use ValidationCode as Code;

    if def.workflows.is_empty() {
        return vec![ValidationError::new(
            Code::NoWorkflows,
            "workflow file must define at least one workflow".into(),
        )];
    }

    let mut errors = Vec::new();
    let names = def.sorted_names();

    for &name in &names {
        if !WORKFLOW_NAME_RE.is_match(name) {
            errors.push(
                ValidationError::new(
                    Code::InvalidWorkflowName,
                    format!(
                        "workflow name '{}' must start with a letter and contain only letters, digits, hyphens, underscores",
                        name
                    ),
                )
                .in_workflow(name),
            );
        }
    }

    for &name in &names {
        let wf = &def.workflows[name];
        if wf.steps.is_empty() {
            errors.push(
                ValidationError::new(
                    Code::EmptySteps,
                    format!("workflow '{}' must have at least one step", name),
                )
                .in_workflow(name),
            );
            continue;
        }

        for (i, step) in wf.steps.iter().enumerate() {
            let idx = i + 1;
            let run = step.run_command();
            let reference = step.workflow_ref();

            if run.is_none() && reference.is_none() {
                let (code, message) = if step.run.is_some() {
                    (
                        Code::StepEmptyRun,
                        format!("workflow '{}' step {} has empty run command", name, idx),
                    )
                } else {
                    (
                        Code::StepNoAction,
                        format!("workflow '{}' step {} must have run or workflow", name, idx),
                    )
                };
                errors.push(ValidationError::new(code, message).in_workflow(name).at_step(idx));
            }

            if run.is_some() && reference.is_some() {
                errors.push(
                    ValidationError::new(
                        Code::StepConflict,
                        format!(
                            "workflow '{}' step {} has both run and workflow (only one allowed)",
                            name, idx
                        ),
                    )
                    .in_workflow(name)
                    .at_step(idx),
                );
            }

            if run.is_some() && step.has_with() {
                errors.push(
                    ValidationError::new(
                        Code::StepWithOnRun,
                        format!(
                            "workflow '{}' step {} has 'with' on a run step (only allowed on workflow steps)",
                            name, idx
                        ),
                    )
                    .in_workflow(name)
                    .at_step(idx),
                );
            }

            if let Some(reference) = reference {
                if !def.workflows.contains_key(reference) {
                    errors.push(
                        ValidationError::new(
                            Code::WorkflowNotFound,
                            format!(
                                "workflow '{}' step {} references unknown workflow '{}'",
                                name, idx, reference
                            ),
                        )
                        .in_workflow(name)
                        .at_step(idx),
                    );
                }
            }
        }
    }

    if let Some(cycle) = find_cycle(&reference_graph(def)) {
        let from = cycle[cycle.len().saturating_sub(2)].clone();
        errors.push(
            ValidationError::new(
                Code::CyclicReference,
                format!("cyclic workflow reference: {}", cycle.join(" -> ")),
            )
            .in_workflow(&from),
        );
    }

    tracing::debug!(errors = errors.len(), "Validated workflow definition");
    errors
}
