//! The Slate voice agent: speech in, speech out, with a view of the room.
//!
//! Wires the conversational turn loop: VAD gates incoming audio, STT
//! transcribes it, the context manager truncates the history and injects
//! the latest video frame, the completion client produces the reply, and
//! TTS renders it back into the room. Each session owns its history
//! exclusively; nothing here is shared across conversations except the
//! process-wide VAD handle, which is passed in explicitly.

pub mod completion;
pub mod config;
mod engine;
pub mod error;
pub mod session;
pub mod stt;
pub mod tts;
pub mod vad;

pub use completion::{CompletionClient, OpenAiChatClient};
pub use config::{load_config, AgentConfig};
pub use error::AgentError;
pub use session::{run_audio_loop, AgentSession, AUDIO_CHUNK_BYTES};
pub use stt::SttService;
pub use tts::TtsService;
pub use vad::{Vad, VadHandle};

/// System prompt for the whiteboard tutor persona.
pub const SYSTEM_PROMPT: &str = "You are a collaborative brainstorming partner and \
voice assistant for a virtual whiteboard. You can both see and hear: you have access \
to live dialogue, uploaded files, webcam video, and a shared canvas with the user. \
Use short and concise responses, avoiding unpronounceable punctuation. When you see \
an image in the conversation, naturally incorporate what you see into your response \
and keep visual descriptions brief but informative. You are the best teacher: you can \
teach about anything, adapt to the student's learning style, and break problems down.";

/// Greeting spoken when the agent joins a session.
pub const GREETING: &str = "Hey! What are we working on today?";
