//! Output handlers for CLI commands
//!
//! Progress and dry-run trace lines go to stderr; the structured result is
//! the only thing written to stdout.

use crate::workflow::StepStatus;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Quiet,
}

/// Events emitted during workflow execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    WorkflowStart {
        name: String,
        steps: usize,
        dry_run: bool,
    },
    StepStart {
        workflow: String,
        index: usize,
        name: String,
        depth: usize,
    },
    StepComplete {
        workflow: String,
        index: usize,
        name: String,
        status: StepStatus,
        duration_ms: u64,
    },
    StepSkipped {
        workflow: String,
        index: usize,
        name: String,
        condition: String,
    },
    StepError {
        workflow: String,
        index: usize,
        name: String,
        error: String,
    },
    DryRunStep {
        index: usize,
        command: String,
    },
    DryRunWorkflow {
        index: usize,
        workflow: String,
    },
    DryRunHook {
        hook: String,
        command: String,
    },
    HookError {
        hook: String,
        error: String,
    },
    WorkflowComplete {
        success: bool,
        duration_ms: u64,
        steps_recorded: usize,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);
}

/// Human-readable trace lines on stderr
pub struct ConsoleHandler {
    debug: bool,
}

impl ConsoleHandler {
    /// Create a new console handler
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }

    fn step_label(name: &str, index: usize) -> String {
        if name.is_empty() {
            format!("step {}", index)
        } else {
            format!("step {} ({})", index, name)
        }
    }

    /// Render an event as a trace line, or `None` if it is not shown
    fn render(&self, event: &OutputEvent) -> Option<String> {
        match event {
            OutputEvent::WorkflowStart {
                name,
                steps,
                dry_run,
            } => Some(format!(
                "Running workflow '{}' ({} steps){}",
                name,
                steps,
                if *dry_run { " [dry-run]" } else { "" }
            )),
            OutputEvent::StepStart {
                workflow,
                index,
                name,
                depth,
            } => self.debug.then(|| {
                format!(
                    "{}{} {}",
                    "  ".repeat(*depth),
                    workflow,
                    Self::step_label(name, *index)
                )
            }),
            OutputEvent::StepComplete {
                workflow,
                index,
                name,
                status,
                duration_ms,
            } => (self.debug && *status == StepStatus::Ok).then(|| {
                format!(
                    "✓ {} {} ({})",
                    workflow,
                    Self::step_label(name, *index),
                    Self::format_duration(*duration_ms)
                )
            }),
            OutputEvent::StepSkipped {
                workflow,
                index,
                name,
                condition,
            } => Some(format!(
                "- {} {} skipped ({} is not truthy)",
                workflow,
                Self::step_label(name, *index),
                condition
            )),
            OutputEvent::StepError {
                workflow,
                index,
                name,
                error,
            } => Some(format!(
                "✗ {} {} failed: {}",
                workflow,
                Self::step_label(name, *index),
                error
            )),
            OutputEvent::DryRunStep { index, command } => {
                Some(format!("[dry-run] step {}: {}", index, command))
            }
            OutputEvent::DryRunWorkflow { index, workflow } => {
                Some(format!("[dry-run] step {}: workflow {}", index, workflow))
            }
            OutputEvent::DryRunHook { command, .. } => Some(format!("[dry-run] hook: {}", command)),
            OutputEvent::HookError { hook, error } => {
                Some(format!("✗ {} hook failed: {}", hook, error))
            }
            OutputEvent::WorkflowComplete {
                success,
                duration_ms,
                steps_recorded,
            } => Some(if *success {
                format!(
                    "✓ Workflow completed successfully ({} steps in {})",
                    steps_recorded,
                    Self::format_duration(*duration_ms)
                )
            } else {
                format!(
                    "✗ Workflow failed after {} steps ({})",
                    steps_recorded,
                    Self::format_duration(*duration_ms)
                )
            }),
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        if let Some(line) = self.render(&event) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
        }
    }
}

/// Handler that only keeps dry-run advisories
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        let line = match event {
            OutputEvent::DryRunStep { index, command } => {
                format!("[dry-run] step {}: {}", index, command)
            }
            OutputEvent::DryRunWorkflow { index, workflow } => {
                format!("[dry-run] step {}: workflow {}", index, workflow)
            }
            OutputEvent::DryRunHook { command, .. } => format!("[dry-run] hook: {}", command),
            _ => return,
        };
        eprintln!("{}", line);
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, debug: bool) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler::new(debug)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

/// Write `value` as one JSON document followed by a newline
pub fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Handler that records every event
    #[derive(Clone, Default)]
    pub(crate) struct MockHandler {
        events: Arc<Mutex<Vec<OutputEvent>>>,
    }

    impl MockHandler {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn events(&self) -> Vec<OutputEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl OutputHandler for MockHandler {
        fn emit(&self, event: OutputEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_mock_handler_captures_events() {
        let handler = MockHandler::new();
        handler.emit(OutputEvent::DryRunStep {
            index: 1,
            command: "echo hi".into(),
        });
        handler.emit(OutputEvent::DryRunHook {
            hook: "before_all".into(),
            command: "echo start".into(),
        });
        assert_eq!(handler.events().len(), 2);
    }

    #[test]
    fn test_console_format_duration() {
        assert_eq!(ConsoleHandler::format_duration(500), "500ms");
        assert_eq!(ConsoleHandler::format_duration(1000), "1.0s");
        assert_eq!(ConsoleHandler::format_duration(2500), "2.5s");
    }

    #[test]
    fn test_console_renders_dry_run_lines() {
        let handler = ConsoleHandler::new(false);
        assert_eq!(
            handler.render(&OutputEvent::DryRunStep {
                index: 2,
                command: "make build".into()
            }),
            Some("[dry-run] step 2: make build".into())
        );
        assert_eq!(
            handler.render(&OutputEvent::DryRunWorkflow {
                index: 1,
                workflow: "upload".into()
            }),
            Some("[dry-run] step 1: workflow upload".into())
        );
        assert_eq!(
            handler.render(&OutputEvent::DryRunHook {
                hook: "after_all".into(),
                command: "echo done".into()
            }),
            Some("[dry-run] hook: echo done".into())
        );
    }

    #[test]
    fn test_console_hides_progress_unless_debug() {
        let start = OutputEvent::StepStart {
            workflow: "beta".into(),
            index: 1,
            name: "build".into(),
            depth: 1,
        };
        assert_eq!(ConsoleHandler::new(false).render(&start), None);
        assert_eq!(
            ConsoleHandler::new(true).render(&start),
            Some("  beta step 1 (build)".into())
        );
    }

    #[test]
    fn test_write_json_compact_and_pretty() {
        #[derive(Serialize)]
        struct Sample {
            valid: bool,
        }

        let mut compact = Vec::new();
        write_json(&mut compact, &Sample { valid: true }, false).unwrap();
        assert_eq!(String::from_utf8(compact).unwrap(), "{\"valid\":true}\n");

        let mut pretty = Vec::new();
        write_json(&mut pretty, &Sample { valid: true }, true).unwrap();
        assert_eq!(
            String::from_utf8(pretty).unwrap(),
            "{\n  \"valid\": true\n}\n"
        );
    }

    #[test]
    fn test_create_handler() {
        let _ = create_handler(OutputMode::Console, false);
        let _ = create_handler(OutputMode::Quiet, false);
    }
}
