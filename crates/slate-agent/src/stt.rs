//! Speech-to-text via a whisper.cpp-compatible subprocess.

use crate::engine;
use crate::error::AgentError;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Maximum audio input size for STT (10 MiB). Prevents OOM from oversized payloads.
const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Timeout for STT process execution.
const STT_TIMEOUT: Duration = Duration::from_secs(120);

/// Transcribes audio buffers by piping them through a local STT binary.
#[derive(Debug, Clone)]
pub struct SttService {
    model_path: PathBuf,
    binary_path: PathBuf,
}

impl SttService {
    pub fn new(model_path: impl Into<PathBuf>, binary_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            binary_path: binary_path.into(),
        }
    }

    /// Runs the STT binary over `audio_data` and returns the transcript.
    ///
    /// The binary receives s16le audio on stdin (`-f -`) and is asked for
    /// plain text without timestamps (`-nt`); builds that emit bracketed
    /// segment spans anyway are normalized by [`clean_transcript`].
    pub async fn transcribe(&self, audio_data: &[u8]) -> Result<String, AgentError> {
        if audio_data.len() > MAX_STT_INPUT_BYTES {
            return Err(AgentError::Stt(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio_data.len(),
                MAX_STT_INPUT_BYTES
            )));
        }

        let mut command = Command::new(&self.binary_path);
        command
            .arg("-m")
            .arg(&self.model_path)
            .arg("-nt")
            .arg("-f")
            .arg("-");

        let stdout = engine::run(command, audio_data.to_vec(), STT_TIMEOUT)
            .await
            .map_err(|e| AgentError::Stt(e.to_string()))?;

        Ok(clean_transcript(&stdout))
    }
}

/// Collapses engine output into a single-line transcript: bracketed
/// `[00:00.000 --> 00:02.500]` prefixes are stripped, blank lines dropped,
/// remaining lines joined with single spaces.
fn clean_transcript(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .lines()
        .map(|line| {
            let line = line.trim();
            match (line.strip_prefix('['), line.find(']')) {
                (Some(_), Some(end)) if line[..end].contains("-->") => line[end + 1..].trim(),
                _ => line,
            }
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_oversized_input() {
        let service = SttService::new("model.bin", "whisper-cli");
        let oversized = vec![0u8; MAX_STT_INPUT_BYTES + 1];
        let err = service.transcribe(&oversized).await.unwrap_err();
        assert!(err.to_string().contains("exceeds maximum size"));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let service = SttService::new("model.bin", "/nonexistent/whisper-cli");
        assert!(service.transcribe(&[0u8; 16]).await.is_err());
    }

    #[test]
    fn plain_output_is_trimmed() {
        assert_eq!(clean_transcript(b"  hello there \n"), "hello there");
    }

    #[test]
    fn timestamped_segments_are_joined() {
        let raw = b"[00:00.000 --> 00:02.000]  what shape\n[00:02.000 --> 00:04.000]  is this\n";
        assert_eq!(clean_transcript(raw), "what shape is this");
    }

    #[test]
    fn bracketed_words_without_spans_are_kept() {
        assert_eq!(clean_transcript(b"[inaudible] maybe\n"), "[inaudible] maybe");
    }
}
