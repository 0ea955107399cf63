use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("media session error: {0}")]
    Media(#[from] slate_media::MediaError),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("VAD error: {0}")]
    Vad(String),

    #[error("completion error: {0}")]
    Completion(String),

    #[error("audio ingest error: {0}")]
    Ingest(#[from] std::io::Error),
}
