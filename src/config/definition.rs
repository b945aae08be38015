//! Workflow definition file schema

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default location of the workflow definition file
pub const DEFAULT_PATH: &str = ".asc/workflow.json";

/// Key/value environment overrides
pub type Env = HashMap<String, String>;

/// Root of a workflow definition file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Definition {
    /// Environment shared by every workflow
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: Env,

    /// Hook run once before the entry workflow's steps
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub before_all: String,

    /// Hook run once after every step succeeded
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub after_all: String,

    /// Hook run when the run is known to have failed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,

    /// Workflows by name
    #[serde(default)]
    pub workflows: HashMap<String, WorkflowConfig>,
}

impl Definition {
    /// Get a workflow by name
    pub fn get_workflow(&self, name: &str) -> Option<&WorkflowConfig> {
        self.workflows.get(name)
    }

    /// Workflow names in sorted order
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// A named, ordered list of steps
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Private workflows can only be reached through a workflow step
    #[serde(default)]
    pub private: bool,

    /// Workflow-level environment
    #[serde(default)]
    pub env: Env,

    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// A single step: either a shell command or a call to another workflow
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Display name
    #[serde(default)]
    pub name: String,

    /// Shell command to run
    pub run: Option<String>,

    /// Workflow to call
    pub workflow: Option<String>,

    /// Environment passed to the called workflow
    pub with: Option<Env>,

    /// Environment variable that must be truthy for the step to run
    #[serde(rename = "if")]
    pub condition: Option<String>,
}

impl StepConfig {
    /// Shell command if set to something other than whitespace
    pub fn run_command(&self) -> Option<&str> {
        self.run.as_deref().filter(|r| !r.trim().is_empty())
    }

    /// Trimmed workflow reference if set to something other than whitespace
    pub fn workflow_ref(&self) -> Option<&str> {
        self.workflow
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
    }

    /// Trimmed condition variable name, if any
    pub fn condition_var(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Whether a non-empty `with` mapping is present
    pub fn has_with(&self) -> bool {
        self.with.as_ref().is_some_and(|w| !w.is_empty())
    }
}
