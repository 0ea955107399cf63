use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("LiveKit API error: {0}")]
    LiveKit(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Room service error: {0}")]
    RoomService(String),

    #[error("Video stream error: {0}")]
    Stream(String),

    #[error("Data publish error: {0}")]
    Publish(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
