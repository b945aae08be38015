//! Process utilities for child process management.

use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

fn exit_status_code_parts(code: Option<i32>, _signal: Option<i32>) -> Option<i32> {
    if let Some(code) = code {
        return Some(code);
    }
    #[cfg(unix)]
    {
        if let Some(signal) = _signal {
            return Some(128 + signal);
        }
    }
    None
}

/// Extract exit code from ExitStatus, using 128+signal for signal-terminated processes on Unix.
pub(crate) fn exit_status_code(status: &std::process::ExitStatus) -> Option<i32> {
    let code = status.code();
    #[cfg(unix)]
    let signal = status.signal();
    #[cfg(not(unix))]
    let signal = None;
    exit_status_code_parts(code, signal)
}

/// Destination for a child's output stream.
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    /// Parent standard error.
    #[default]
    Stderr,
    /// Discard everything.
    #[cfg_attr(not(test), allow(dead_code))]
    Null,
    /// In-memory buffer.
    #[cfg_attr(not(test), allow(dead_code))]
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl OutputSink {
    /// Create a buffer sink and a handle to read it back.
    #[cfg(test)]
    pub fn buffer() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (Self::Buffer(buf.clone()), buf)
    }

    /// Write a chunk to the sink.
    pub fn write_all(&self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(bytes)?;
                err.flush()
            }
            Self::Null => Ok(()),
            Self::Buffer(buf) => {
                buf.lock()
                    .map_err(|_| std::io::Error::other("output buffer poisoned"))?
                    .extend_from_slice(bytes);
                Ok(())
            }
        }
    }
}

/// Stream types for child processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output stream.
    Stdout,
    /// Standard error stream.
    Stderr,
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Errors occurring while forwarding child process output.
#[derive(Debug, thiserror::Error)]
pub enum OutputWaitError {
    /// Error reading from a stream or writing to its sink.
    #[error("forwarding {stream}: {source}")]
    Forward {
        /// The stream where the error occurred.
        stream: OutputStream,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Error waiting for the process to exit.
    #[error("waiting for command: {source}")]
    Wait {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

async fn pump<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    sink: &OutputSink,
    stream: OutputStream,
) -> Result<(), OutputWaitError> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };

    let mut buf = [0u8; 8192];
    loop {
        let n = pipe
            .read(&mut buf)
            .await
            .map_err(|source| OutputWaitError::Forward { stream, source })?;
        if n == 0 {
            return Ok(());
        }
        sink.write_all(&buf[..n])
            .map_err(|source| OutputWaitError::Forward { stream, source })?;
    }
}

/// Forward child output to the sinks as it arrives, then wait for exit.
///
/// Both pipes are drained concurrently to avoid deadlock. On a forwarding
/// error the child is killed.
pub(crate) async fn forward_child_output(
    child: &mut Child,
    stdout: &OutputSink,
    stderr: &OutputSink,
) -> Result<std::process::ExitStatus, OutputWaitError> {
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let forwarded = tokio::try_join!(
        pump(stdout_pipe, stdout, OutputStream::Stdout),
        pump(stderr_pipe, stderr, OutputStream::Stderr),
    );

    if let Err(e) = forwarded {
        let _ = child.kill().await;
        return Err(e);
    }

    child
        .wait()
        .await
        .map_err(|source| OutputWaitError::Wait { source })
}
