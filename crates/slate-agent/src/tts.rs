//! Text-to-speech via a piper-compatible subprocess.

use crate::engine;
use crate::error::AgentError;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion
/// from oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for TTS process execution.
const TTS_TIMEOUT: Duration = Duration::from_secs(60);

/// Renders agent replies to raw PCM audio (s16le, model-dependent rate).
#[derive(Debug, Clone)]
pub struct TtsService {
    binary_path: PathBuf,
    model_path: PathBuf,
}

impl TtsService {
    pub fn new(binary_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            model_path: model_path.into(),
        }
    }

    /// Synthesizes `text` and returns raw PCM bytes (`--output_raw`).
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AgentError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(AgentError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let mut command = Command::new(&self.binary_path);
        command
            .arg("--model")
            .arg(&self.model_path)
            .arg("--output_raw");

        engine::run(command, text.as_bytes().to_vec(), TTS_TIMEOUT)
            .await
            .map_err(|e| AgentError::Tts(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_oversized_input() {
        let service = TtsService::new("piper", "voice.onnx");
        let oversized = "a".repeat(MAX_TTS_INPUT_BYTES + 1);
        let err = service.synthesize(&oversized).await.unwrap_err();
        assert!(err.to_string().contains("exceeds maximum size"));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let service = TtsService::new("/nonexistent/piper", "voice.onnx");
        assert!(service.synthesize("hello").await.is_err());
    }
}
