//! Step execution
//!
//! Nested workflow calls are expanded on an explicit stack of frames instead
//! of native recursion. The stack length bounds the call depth.

use super::env::{is_truthy, lookup_var, merge_env};
use super::shell::{ShellError, ShellRunner};
use super::state::{RunResult, StepResult, StepStatus, elapsed_ms};
use crate::cli::{CancellationToken, OutputEvent, OutputHandler};
use crate::config::{Definition, Env, StepConfig};
use std::time::Instant;
use thiserror::Error;

/// Maximum nesting depth for workflow calls
pub const MAX_CALL_DEPTH: usize = 16;

/// Errors that terminate a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("unknown workflow '{0}'")]
    UnknownWorkflow(String),

    #[error("workflow '{0}' is private and cannot be run directly")]
    PrivateWorkflow(String),

    #[error("before_all hook failed: {0}")]
    BeforeAllFailed(#[source] ShellError),

    #[error("after_all hook failed: {0}")]
    AfterAllFailed(#[source] ShellError),

    #[error("{workflow} step {index}: {source}")]
    StepFailed {
        workflow: String,
        index: usize,
        #[source]
        source: ShellError,
    },

    #[error("{workflow} step {index}: max call depth {max} exceeded")]
    MaxDepthExceeded {
        workflow: String,
        index: usize,
        max: usize,
    },

    #[error("{workflow} step {index}: unknown workflow '{reference}'")]
    UnknownReference {
        workflow: String,
        index: usize,
        reference: String,
    },

    #[error("{workflow} step {index}: step has neither run nor workflow")]
    NoAction { workflow: String, index: usize },
}

/// One active workflow on the call stack
#[derive(Debug)]
struct Frame<'d> {
    workflow: &'d str,
    steps: &'d [StepConfig],
    next: usize,
    env: Env,
}

/// Executes a workflow's steps, expanding workflow calls in place
pub(crate) struct StepExecutor<'a> {
    pub definition: &'a Definition,
    pub shell: &'a ShellRunner,
    pub root: &'a str,
    pub dry_run: bool,
    pub cancel: &'a CancellationToken,
    pub handler: &'a dyn OutputHandler,
}

impl<'a> StepExecutor<'a> {
    /// Run `workflow`'s steps in order with `env`
    ///
    /// Every step reaching a terminal status is appended to `result`. The
    /// first failure stops all remaining steps at every depth.
    pub async fn execute(
        &self,
        workflow: &'a str,
        env: Env,
        result: &mut RunResult,
    ) -> Result<(), RunError> {
        let wf = self
            .definition
            .get_workflow(workflow)
            .ok_or_else(|| RunError::UnknownWorkflow(workflow.to_string()))?;

        let mut stack = vec![Frame {
            workflow,
            steps: &wf.steps,
            next: 0,
            env,
        }];

        while let Some(depth) = stack.len().checked_sub(1) {
            let frame = &mut stack[depth];
            let steps: &'a [StepConfig] = frame.steps;
            let Some(step) = steps.get(frame.next) else {
                tracing::debug!(workflow = frame.workflow, depth, "Workflow steps finished");
                stack.pop();
                continue;
            };
            frame.next += 1;
            let index = frame.next;
            let current = frame.workflow;
            let env = &stack[depth].env;

            let started = Instant::now();
            let mut record = StepResult {
                index,
                name: step.name.clone(),
                command: step.run.clone().filter(|r| !r.is_empty()),
                workflow: step.workflow_ref().map(String::from),
                parent_workflow: (current != self.root).then(|| current.to_string()),
                status: StepStatus::Ok,
                duration_ms: 0,
                error: None,
            };

            if let Some(var) = step.condition_var() {
                if !is_truthy(&lookup_var(env, var)) {
                    tracing::debug!(workflow = current, step = index, condition = var, "Step skipped");
                    self.handler.emit(OutputEvent::StepSkipped {
                        workflow: current.to_string(),
                        index,
                        name: step.name.clone(),
                        condition: var.to_string(),
                    });
                    record.status = StepStatus::Skipped;
                    record.duration_ms = elapsed_ms(started);
                    result.record(record);
                    continue;
                }
            }

            if let Some(reference) = step.workflow_ref() {
                if depth + 1 > MAX_CALL_DEPTH {
                    let err = RunError::MaxDepthExceeded {
                        workflow: current.to_string(),
                        index,
                        max: MAX_CALL_DEPTH,
                    };
                    self.fail_step(record, started, format!("max call depth {} exceeded", MAX_CALL_DEPTH), result);
                    return Err(err);
                }

                let Some(sub) = self.definition.get_workflow(reference) else {
                    let err = RunError::UnknownReference {
                        workflow: current.to_string(),
                        index,
                        reference: reference.to_string(),
                    };
                    self.fail_step(record, started, format!("unknown workflow '{}'", reference), result);
                    return Err(err);
                };

                // Callee env provides defaults, caller env overrides, `with` wins
                let mut layers: Vec<&Env> = vec![&sub.env, env];
                if let Some(with) = step.with.as_ref() {
                    layers.push(with);
                }
                let sub_env = merge_env(&layers);

                if self.dry_run {
                    self.handler.emit(OutputEvent::DryRunWorkflow {
                        index,
                        workflow: reference.to_string(),
                    });
                }
                tracing::debug!(
                    workflow = current,
                    step = index,
                    callee = reference,
                    depth = depth + 1,
                    "Entering workflow"
                );

                stack.push(Frame {
                    workflow: reference,
                    steps: &sub.steps,
                    next: 0,
                    env: sub_env,
                });
                continue;
            }

            let Some(command) = step.run_command() else {
                self.fail_step(record, started, "step has neither run nor workflow".into(), result);
                return Err(RunError::NoAction {
                    workflow: current.to_string(),
                    index,
                });
            };

            if self.dry_run {
                self.handler.emit(OutputEvent::DryRunStep {
                    index,
                    command: command.to_string(),
                });
                record.status = StepStatus::DryRun;
                record.duration_ms = elapsed_ms(started);
                result.record(record);
                continue;
            }

            self.handler.emit(OutputEvent::StepStart {
                workflow: current.to_string(),
                index,
                name: step.name.clone(),
                depth,
            });

            match self.shell.run(command, env, self.cancel).await {
                Ok(()) => {
                    record.duration_ms = elapsed_ms(started);
                    self.handler.emit(OutputEvent::StepComplete {
                        workflow: current.to_string(),
                        index,
                        name: step.name.clone(),
                        status: StepStatus::Ok,
                        duration_ms: record.duration_ms,
                    });
                    result.record(record);
                }
                Err(e) => {
                    tracing::warn!(workflow = current, step = index, error = %e, "Step failed");
                    self.fail_step(record, started, e.to_string(), result);
                    return Err(RunError::StepFailed {
                        workflow: current.to_string(),
                        index,
                        source: e,
                    });
                }
            }
        }

        Ok(())
    }

    fn fail_step(&self, mut record: StepResult, started: Instant, error: String, result: &mut RunResult) {
        self.handler.emit(OutputEvent::StepError {
            workflow: record
                .parent_workflow
                .clone()
                .unwrap_or_else(|| self.root.to_string()),
            index: record.index,
            name: record.name.clone(),
            error: error.clone(),
        });
        record.status = StepStatus::Error;
        record.error = Some(error);
        record.duration_ms = elapsed_ms(started);
        result.record(record);
    }
}
