//! Media-session boundary for the Slate agent.
//!
//! Wraps the real-time transport (LiveKit) behind a narrow interface: the
//! agent only needs to enumerate remote tracks, pull single frames from a
//! video track, broadcast small data payloads to peers, and play audio back
//! into the room. Everything else the transport does is out of scope here.
//!
//! The frame sampler and the whiteboard notification sink live in this
//! crate because both are thin users of that interface: the sampler grabs
//! exactly one frame per call on a best-effort basis, and the sink publishes
//! fire-and-forget JSON messages on a well-known topic.

pub mod config;
pub mod error;
pub mod notify;
pub mod sampler;
pub mod service;
pub mod session;

pub use config::LiveKitConfig;
pub use error::MediaError;
pub use notify::{notify_whiteboard, NotificationMessage, WHITEBOARD_TOPIC};
pub use sampler::FrameSampler;
pub use service::RoomService;
pub use session::{
    FrameStream, MediaSession, PublishedData, SimulatedRoom, TrackInfo, TrackKind,
    VisualObservation,
};
