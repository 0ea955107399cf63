//! Process-wide voice-activity detection.
//!
//! The detector is an expensive-to-load shared resource: one instance per
//! worker process, initialized lazily on first use and passed explicitly
//! into session construction. No ambient globals.

use crate::error::AgentError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Mean-absolute-amplitude threshold over s16le PCM below which audio is
/// treated as silence.
const SPEECH_ENERGY_THRESHOLD: f64 = 300.0;

/// A loaded voice-activity detector.
#[derive(Debug)]
pub struct Vad {
    model_path: PathBuf,
}

impl Vad {
    fn load(model_path: &Path) -> Result<Self, AgentError> {
        if !model_path.exists() {
            return Err(AgentError::Vad(format!(
                "VAD model not found: {:?}",
                model_path
            )));
        }
        info!(path = %model_path.display(), "loaded VAD model");
        Ok(Self {
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Decides whether an s16le PCM buffer contains speech.
    ///
    /// Energy gate over mean absolute amplitude; the full neural detector
    /// runs inside the transport pipeline and this gate only filters out
    /// buffers that are obviously silence.
    pub fn is_speech(&self, pcm: &[u8]) -> bool {
        if pcm.len() < 2 {
            return false;
        }
        let mut total: u64 = 0;
        let mut samples: u64 = 0;
        for chunk in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            total += sample.unsigned_abs() as u64;
            samples += 1;
        }
        (total as f64 / samples as f64) > SPEECH_ENERGY_THRESHOLD
    }
}

/// Lazily-initialized handle to the process-wide [`Vad`] instance.
///
/// Cloneable and cheap; the underlying model is loaded at most once no
/// matter how many sessions the process hosts.
#[derive(Debug, Clone)]
pub struct VadHandle {
    model_path: PathBuf,
    cell: Arc<OnceCell<Arc<Vad>>>,
}

impl VadHandle {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the shared detector, loading it on first call.
    pub async fn get(&self) -> Result<Arc<Vad>, AgentError> {
        let vad = self
            .cell
            .get_or_try_init(|| async { Vad::load(&self.model_path).map(Arc::new) })
            .await?;
        Ok(Arc::clone(vad))
    }
}
