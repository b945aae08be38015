//! Workflow runner - orchestrates hooks and step execution

use super::env::merge_env;
use super::executor::{RunError, StepExecutor};
use super::shell::{ShellError, ShellRunner};
use super::state::{HookResult, RunResult, RunStatus, StepStatus, elapsed_ms};
use crate::cli::{CancellationToken, OutputEvent, OutputHandler};
use crate::config::{Definition, Env};
use std::sync::Arc;
use std::time::Instant;

/// Options for a single run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Entry workflow
    pub workflow_name: String,

    /// Caller parameters; override definition and workflow env
    pub params: Env,

    /// Record and trace steps without executing them
    pub dry_run: bool,
}

/// Lifecycle hook points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    BeforeAll,
    AfterAll,
    Error,
}

impl Hook {
    fn as_str(&self) -> &'static str {
        match self {
            Hook::BeforeAll => "before_all",
            Hook::AfterAll => "after_all",
            Hook::Error => "error",
        }
    }
}

struct HookOutcome {
    record: HookResult,
    error: Option<ShellError>,
}

/// Workflow runner
pub struct WorkflowRunner {
    definition: Arc<Definition>,
    shell: ShellRunner,
}

impl WorkflowRunner {
    /// Create a new workflow runner
    pub fn new(definition: Arc<Definition>, shell: ShellRunner) -> Self {
        Self { definition, shell }
    }

    /// Run a workflow
    ///
    /// Returns `Err` only when the entry workflow cannot be run at all; in that
    /// case nothing was executed. Failures after that point are reported in
    /// the returned [`RunResult`].
    pub async fn run(
        &self,
        opts: &RunOptions,
        cancel: &CancellationToken,
        handler: &dyn OutputHandler,
    ) -> Result<RunResult, RunError> {
        let name = opts.workflow_name.as_str();
        let wf = self
            .definition
            .get_workflow(name)
            .ok_or_else(|| RunError::UnknownWorkflow(name.to_string()))?;
        if wf.private {
            return Err(RunError::PrivateWorkflow(name.to_string()));
        }

        let env = merge_env(&[&self.definition.env, &wf.env, &opts.params]);

        tracing::info!(workflow = name, dry_run = opts.dry_run, "Starting workflow");
        handler.emit(OutputEvent::WorkflowStart {
            name: name.to_string(),
            steps: wf.steps.len(),
            dry_run: opts.dry_run,
        });

        let started = Instant::now();
        let mut result = RunResult::new(name);

        match self.run_inner(opts, &env, cancel, handler, &mut result).await {
            Ok(()) => {
                result.status = RunStatus::Ok;
            }
            Err(e) => {
                tracing::warn!(workflow = name, error = %e, "Workflow failed");
                result.fail(&e);
                self.run_error_hook(&env, opts.dry_run, cancel, handler, &mut result)
                    .await;
            }
        }

        result.duration_ms = elapsed_ms(started);
        handler.emit(OutputEvent::WorkflowComplete {
            success: result.is_success(),
            duration_ms: result.duration_ms,
            steps_recorded: result.steps.len(),
        });
        tracing::info!(
            workflow = name,
            status = ?result.status,
            steps = result.steps.len(),
            duration_ms = result.duration_ms,
            "Workflow finished"
        );

        Ok(result)
    }

    async fn run_inner(
        &self,
        opts: &RunOptions,
        env: &Env,
        cancel: &CancellationToken,
        handler: &dyn OutputHandler,
        result: &mut RunResult,
    ) -> Result<(), RunError> {
        let def = &*self.definition;

        if let Some(outcome) = self
            .run_hook(Hook::BeforeAll, &def.before_all, env, opts.dry_run, cancel, handler)
            .await
        {
            result.hooks_mut().before_all = Some(outcome.record);
            if let Some(e) = outcome.error {
                return Err(RunError::BeforeAllFailed(e));
            }
        }

        let executor = StepExecutor {
            definition: def,
            shell: &self.shell,
            root: &opts.workflow_name,
            dry_run: opts.dry_run,
            cancel,
            handler,
        };
        executor
            .execute(&opts.workflow_name, env.clone(), result)
            .await?;

        if let Some(outcome) = self
            .run_hook(Hook::AfterAll, &def.after_all, env, opts.dry_run, cancel, handler)
            .await
        {
            result.hooks_mut().after_all = Some(outcome.record);
            if let Some(e) = outcome.error {
                return Err(RunError::AfterAllFailed(e));
            }
        }

        Ok(())
    }

    /// Best-effort error hook; its own failure never replaces the run error
    async fn run_error_hook(
        &self,
        env: &Env,
        dry_run: bool,
        cancel: &CancellationToken,
        handler: &dyn OutputHandler,
        result: &mut RunResult,
    ) {
        if let Some(outcome) = self
            .run_hook(Hook::Error, &self.definition.error, env, dry_run, cancel, handler)
            .await
        {
            if let Some(e) = outcome.error {
                tracing::warn!(error = %e, "Error hook failed");
            }
            result.hooks_mut().error = Some(outcome.record);
        }
    }

    /// Run a hook command; `None` if the hook is not configured
    async fn run_hook(
        &self,
        hook: Hook,
        command: &str,
        env: &Env,
        dry_run: bool,
        cancel: &CancellationToken,
        handler: &dyn OutputHandler,
    ) -> Option<HookOutcome> {
        let command = command.trim();
        if command.is_empty() {
            return None;
        }

        let started = Instant::now();
        let mut record = HookResult {
            command: command.to_string(),
            status: StepStatus::Ok,
            duration_ms: 0,
            error: None,
        };

        if dry_run {
            handler.emit(OutputEvent::DryRunHook {
                hook: hook.as_str().to_string(),
                command: command.to_string(),
            });
            record.status = StepStatus::DryRun;
            record.duration_ms = elapsed_ms(started);
            return Some(HookOutcome {
                record,
                error: None,
            });
        }

        tracing::debug!(hook = hook.as_str(), command, "Running hook");
        let outcome = self.shell.run(command, env, cancel).await;
        record.duration_ms = elapsed_ms(started);

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                handler.emit(OutputEvent::HookError {
                    hook: hook.as_str().to_string(),
                    error: e.to_string(),
                });
                record.status = StepStatus::Error;
                record.error = Some(e.to_string());
                Some(e)
            }
        };

        Some(HookOutcome { record, error })
    }
}
