//! Shell resolution and command execution

use super::env::child_env;
use crate::cli::CancellationToken;
use crate::config::Env;
use crate::process::{OutputSink, OutputWaitError, exit_status_code, forward_child_output};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::process::Command;

/// Errors running a shell command
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("no supported shell found (need bash or sh)")]
    NoShell,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Output(#[from] OutputWaitError),

    #[error("{}", describe_exit(*code))]
    Exit { code: Option<i32> },

    #[error("canceled")]
    Cancelled,
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated without exit status".into(),
    }
}

/// An interpreter and the flags that precede the command string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShell {
    pub program: PathBuf,
    pub flags: Vec<&'static str>,
}

type LookupFn = dyn Fn(&str) -> Option<PathBuf> + Send + Sync;

/// Resolves the shell once and caches the answer
///
/// bash with `-o pipefail` is preferred so that `a | b` fails when `a` fails;
/// plain `sh` is the fallback.
pub struct ShellResolver {
    cached: RwLock<Option<ResolvedShell>>,
    lookup: Box<LookupFn>,
}

impl ShellResolver {
    /// Resolver that searches `PATH`
    pub fn new() -> Self {
        Self::with_lookup(find_in_path)
    }

    /// Resolver with a custom executable lookup
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<PathBuf> + Send + Sync + 'static,
    {
        Self {
            cached: RwLock::new(None),
            lookup: Box::new(lookup),
        }
    }

    /// Resolve the shell, computing it on first use
    pub fn resolve(&self) -> Result<ResolvedShell, ShellError> {
        if let Some(shell) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(shell.clone());
        }

        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(shell) = cached.as_ref() {
            return Ok(shell.clone());
        }

        let shell = if let Some(bash) = (self.lookup)("bash") {
            ResolvedShell {
                program: bash,
                flags: vec!["-o", "pipefail", "-c"],
            }
        } else if let Some(sh) = (self.lookup)("sh") {
            ResolvedShell {
                program: sh,
                flags: vec!["-c"],
            }
        } else {
            return Err(ShellError::NoShell);
        };

        tracing::debug!(shell = %shell.program.display(), "Resolved shell");
        *cached = Some(shell.clone());
        Ok(shell)
    }

    /// Forget the cached resolution
    #[cfg(test)]
    pub fn reset(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Default for ShellResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShellResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellResolver")
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

/// Find an executable in `PATH`
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// Runs command strings through the resolved shell
#[derive(Debug, Clone)]
pub struct ShellRunner {
    resolver: Arc<ShellResolver>,
    stdout: OutputSink,
    stderr: OutputSink,
}

impl ShellRunner {
    /// Runner that forwards both streams to stderr
    pub fn new(resolver: Arc<ShellResolver>) -> Self {
        Self {
            resolver,
            stdout: OutputSink::Stderr,
            stderr: OutputSink::Stderr,
        }
    }

    /// Set where command output goes
    #[cfg(test)]
    pub fn with_output(mut self, stdout: OutputSink, stderr: OutputSink) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    /// Run a command and wait for it to exit
    ///
    /// `env` is overlaid onto the inherited process environment. If `cancel`
    /// fires while the command runs, the child is killed.
    pub async fn run(
        &self,
        command: &str,
        env: &Env,
        cancel: &CancellationToken,
    ) -> Result<(), ShellError> {
        if cancel.is_cancelled() {
            return Err(ShellError::Cancelled);
        }

        let shell = self.resolver.resolve()?;

        let mut child = Command::new(&shell.program)
            .args(&shell.flags)
            .arg(command)
            .env_clear()
            .envs(child_env(env))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ShellError::Spawn {
                program: shell.program.display().to_string(),
                source,
            })?;

        let mut cancel = cancel.clone();
        tokio::select! {
            result = forward_child_output(&mut child, &self.stdout, &self.stderr) => {
                let status = result?;
                if status.success() {
                    Ok(())
                } else {
                    Err(ShellError::Exit {
                        code: exit_status_code(&status),
                    })
                }
            }
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                tracing::warn!(command, "Command canceled");
                Err(ShellError::Cancelled)
            }
        }
    }
}
