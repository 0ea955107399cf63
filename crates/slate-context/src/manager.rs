//! The pre-inference hook: truncate the history, then inject the latest
//! video frame.

use crate::history::ChatHistory;
use slate_media::{FrameSampler, MediaSession};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default retention budget for non-system turns.
pub const DEFAULT_MAX_TURNS: usize = 15;

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_frame_timeout_ms() -> u64 {
    2_000
}

/// Tunables for the context manager.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Maximum non-system turns retained after a truncation pass.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Bound on waiting for the first frame during observation injection.
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            frame_timeout_ms: default_frame_timeout_ms(),
        }
    }
}

/// Applies the pre-inference policy to a session's history.
///
/// Invoked directly by the agent's turn loop, exactly once per inference
/// call. There is no callback registration or event dispatch: the turn loop
/// is the single consumer of this hook.
#[derive(Debug, Clone)]
pub struct ContextManager {
    max_turns: usize,
    sampler: FrameSampler,
}

impl ContextManager {
    pub fn new(max_turns: usize, sampler: FrameSampler) -> Self {
        Self { max_turns, sampler }
    }

    /// Builds the manager and its sampler from one config block.
    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(
            config.max_turns,
            FrameSampler::new(Duration::from_millis(config.frame_timeout_ms)),
        )
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Readies `history` for the next completion call.
    ///
    /// Step 1 truncates: the system prompt is preserved and at most
    /// `max_turns` of the most recent non-system turns survive, oldest
    /// evicted first. Step 2 injects: one fresh frame is requested from the
    /// sampler and, if available, appended as the final user turn. Step 1
    /// always completes before Step 2 begins, so the injected turn is never
    /// counted against the truncation budget on the same pass.
    ///
    /// A sampler miss (no video track, capture failure, timeout) is not an
    /// error; the turn simply proceeds without visual context.
    pub async fn prepare_for_inference(
        &self,
        history: &mut ChatHistory,
        session: &dyn MediaSession,
    ) {
        let before = history.non_system_len();
        history.truncate_to(self.max_turns);
        let evicted = before - history.non_system_len();
        if evicted > 0 {
            debug!(
                evicted,
                retained = history.non_system_len(),
                "truncated conversation history"
            );
        }

        match self.sampler.capture_latest_frame(session).await {
            Some(frame) => {
                history.push_frames(vec![frame]);
                debug!("added latest frame to conversation context");
            }
            None => {
                debug!("no visual context available this turn");
            }
        }
    }
}
