//! Run and step results

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Terminal status of a step or hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Ok,
    Error,
    Skipped,
    DryRun,
}

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    #[default]
    Error,
}

/// One recorded step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StepResult {
    /// 1-based position within its own step list
    pub index: usize,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,

    /// Set when the step belongs to a called workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_workflow: Option<String>,

    pub status: StepStatus,

    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One executed hook command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HookResult {
    pub command: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Hook outcomes for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HooksResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_all: Option<HookResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_all: Option<HookResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HookResult>,
}

/// Structured result of a workflow run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunResult {
    pub workflow: String,
    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<HooksResult>,

    pub steps: Vec<StepResult>,

    pub duration_ms: u64,
}

impl RunResult {
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            status: RunStatus::Error,
            error: None,
            hooks: None,
            steps: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Ok
    }

    /// Hooks record, created on first use
    pub fn hooks_mut(&mut self) -> &mut HooksResult {
        self.hooks.get_or_insert_with(HooksResult::default)
    }

    /// Append a step record; records are never modified afterwards
    pub fn record(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    /// Mark the run failed with `error`
    pub fn fail(&mut self, error: impl ToString) {
        self.status = RunStatus::Error;
        self.error = Some(error.to_string());
    }
}

/// Milliseconds elapsed since `start`
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
