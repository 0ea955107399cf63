//! Shared subprocess plumbing for the local voice engines.
//!
//! Both engines follow the same contract: bytes in on stdin, bytes out on
//! stdout, stderr reserved for diagnostics, bounded wall-clock time. The
//! services own their command lines; this module owns the lifecycle.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn engine: {0}")]
    Spawn(std::io::Error),

    #[error("failed to feed engine stdin: {0}")]
    Stdin(String),

    #[error("engine timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("failed to collect engine output: {0}")]
    Wait(std::io::Error),

    #[error("engine exited with failure: {0}")]
    Exited(String),
}

/// Runs `command` to completion, feeding `input` on stdin.
///
/// Stdin is written from a separate task so a full stdout pipe can never
/// deadlock the child, then closed to signal EOF. A non-zero exit surfaces
/// the child's stderr in the error.
pub(crate) async fn run(
    mut command: Command,
    input: Vec<u8>,
    timeout: Duration,
) -> Result<Vec<u8>, EngineError> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // A timed-out child must not outlive the call.
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(EngineError::Spawn)?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| EngineError::Stdin("stdin was not captured".to_string()))?;
    let writer = tokio::spawn(async move { stdin.write_all(&input).await });

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| EngineError::Timeout(timeout))?
        .map_err(EngineError::Wait)?;

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(EngineError::Stdin(e.to_string())),
        Err(e) => return Err(EngineError::Stdin(format!("writer task failed: {}", e))),
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(EngineError::Exited(stderr));
    }

    Ok(output.stdout)
}
