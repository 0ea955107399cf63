//! The per-conversation agent session and its turn loop.

use crate::completion::CompletionClient;
use crate::error::AgentError;
use crate::stt::SttService;
use crate::tts::TtsService;
use crate::vad::Vad;
use crate::{GREETING, SYSTEM_PROMPT};
use slate_context::{ChatHistory, ContextConfig, ContextManager};
use slate_media::{notify_whiteboard, MediaSession};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// One live conversation: exclusive owner of its history.
///
/// The turn loop is strictly sequential per session: transcribe, append the
/// user turn, run the pre-inference hook exactly once, call the completion
/// service, append and speak the reply. No two turns of the same session
/// ever run concurrently, which is what lets the history stay lock-free.
pub struct AgentSession {
    history: ChatHistory,
    context: ContextManager,
    media: Arc<dyn MediaSession>,
    stt: Arc<SttService>,
    tts: Arc<TtsService>,
    llm: Arc<dyn CompletionClient>,
    vad: Arc<Vad>,
}

impl AgentSession {
    pub fn new(
        context_config: &ContextConfig,
        media: Arc<dyn MediaSession>,
        stt: Arc<SttService>,
        tts: Arc<TtsService>,
        llm: Arc<dyn CompletionClient>,
        vad: Arc<Vad>,
    ) -> Self {
        Self {
            history: ChatHistory::with_system_prompt(SYSTEM_PROMPT),
            context: ContextManager::from_config(context_config),
            media,
            stt,
            tts,
            llm,
            vad,
        }
    }

    /// Greets the participant and pings the whiteboard that the agent is in.
    pub async fn start(&mut self) -> Result<(), AgentError> {
        notify_whiteboard(self.media.as_ref(), "hii im here").await?;
        self.say(GREETING).await?;
        info!("agent session started");
        Ok(())
    }

    /// Speaks `text` into the room and records it as an assistant turn.
    pub async fn say(&mut self, text: &str) -> Result<(), AgentError> {
        let audio = self.tts.synthesize(text).await?;
        self.media.publish_audio(&audio).await?;
        self.history.push_assistant_text(text);
        Ok(())
    }

    /// Handles one buffer of participant audio.
    ///
    /// Returns the assistant's spoken reply, or `None` when the audio did
    /// not trigger inference (silence, or an empty transcript). The
    /// pre-inference hook only fires on turns that reach the completion
    /// call, and fires exactly once for each.
    pub async fn handle_audio(&mut self, pcm: &[u8]) -> Result<Option<String>, AgentError> {
        if !self.vad.is_speech(pcm) {
            debug!(bytes = pcm.len(), "audio gated as silence");
            return Ok(None);
        }

        let transcript = self.stt.transcribe(pcm).await?;
        if transcript.is_empty() {
            debug!("empty transcript, no inference this turn");
            return Ok(None);
        }

        info!(transcript = %transcript, "user turn transcribed");
        self.history.push_user_text(transcript);

        // The single pre-inference extension point: truncate, then inject
        // the latest frame.
        self.context
            .prepare_for_inference(&mut self.history, self.media.as_ref())
            .await;

        let reply = self.llm.complete(&self.history).await?;
        self.history.push_assistant_text(reply.clone());

        let audio = self.tts.synthesize(&reply).await?;
        self.media.publish_audio(&audio).await?;

        Ok(Some(reply))
    }

    /// Read-only view of the session history, mainly for tests and
    /// diagnostics.
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }
}

/// Bytes of s16le PCM handed to the session per turn: one second at 16 kHz.
pub const AUDIO_CHUNK_BYTES: usize = 32_000;

/// Drives the turn loop from a raw PCM byte stream until EOF.
///
/// Each read chunk is treated as one candidate utterance. A failed turn is
/// logged and the loop keeps reading; only a read error on the stream
/// itself ends the loop early.
pub async fn run_audio_loop<R>(session: &mut AgentSession, mut audio: R) -> Result<(), AgentError>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; AUDIO_CHUNK_BYTES];
    loop {
        let read = audio.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }

        match session.handle_audio(&chunk[..read]).await {
            Ok(Some(reply)) => info!(reply = %reply, "spoke reply"),
            Ok(None) => {}
            Err(e) => warn!("turn failed: {}", e),
        }
    }
}
