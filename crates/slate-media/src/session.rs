//! The media-session interface and an in-process implementation.
//!
//! `MediaSession` is the seam between the agent and the real-time
//! transport. In a production environment with the `livekit` client crate
//! available, the implementor would wrap a `livekit::Room`; the
//! `SimulatedRoom` here serves local development and tests.

use crate::error::MediaError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One captured video frame, wrapped for inclusion in a conversation turn.
///
/// Created fresh on every capture; never cached or reused across turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualObservation {
    /// Raw frame bytes (encoded image data as delivered by the transport).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Kind of a published remote track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A remote participant's published track.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Identity of the publishing participant.
    pub participant: String,
    /// Transport-assigned track identifier.
    pub sid: String,
    pub kind: TrackKind,
}

/// A frame-by-frame subscription over a single video track.
///
/// Implementors must release the underlying subscription when the stream is
/// dropped, so that callers get scoped acquisition on every exit path.
#[async_trait]
pub trait FrameStream: Send {
    /// Yields the next frame, or `None` when the stream has ended.
    async fn next_frame(&mut self) -> Result<Option<VisualObservation>, MediaError>;
}

/// The transport surface the agent depends on.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Published tracks of currently connected remote participants, in
    /// participant join order. Callers relying on "first found" selection
    /// get a stable sequence rather than arbitrary map iteration order.
    async fn remote_tracks(&self) -> Vec<TrackInfo>;

    /// Opens a frame stream over the given video track.
    async fn open_video_stream(
        &self,
        track_sid: &str,
    ) -> Result<Box<dyn FrameStream>, MediaError>;

    /// Broadcasts an opaque payload to all connected peers on a topic.
    /// `reliable` requests non-lossy delivery from the transport.
    async fn publish_data(
        &self,
        payload: &[u8],
        topic: &str,
        reliable: bool,
    ) -> Result<(), MediaError>;

    /// Publishes PCM audio (the agent's synthesized voice) into the room.
    async fn publish_audio(&self, pcm: &[u8]) -> Result<(), MediaError>;
}

/// A broadcast captured by a [`SimulatedRoom`].
#[derive(Debug, Clone)]
pub struct PublishedData {
    pub topic: String,
    pub payload: Vec<u8>,
    pub reliable: bool,
}

#[derive(Default)]
struct SimulatedState {
    tracks: Vec<TrackInfo>,
    /// Pending frames per track sid, consumed front-first.
    frames: Vec<(String, VecDeque<VisualObservation>)>,
    published: Vec<PublishedData>,
    audio_bytes: usize,
}

/// An in-process [`MediaSession`] used by tests and by the agent binary when
/// no LiveKit URL is configured.
#[derive(Clone, Default)]
pub struct SimulatedRoom {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedRoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a remote participant track. Join order is insertion order.
    pub fn add_track(&self, participant: &str, sid: &str, kind: TrackKind) {
        let mut state = self.state.lock().expect("simulated room lock poisoned");
        state.tracks.push(TrackInfo {
            participant: participant.to_string(),
            sid: sid.to_string(),
            kind,
        });
        state.frames.push((sid.to_string(), VecDeque::new()));
    }

    /// Queues a frame for delivery on the given track.
    pub fn push_frame(&self, sid: &str, frame: VisualObservation) {
        let mut state = self.state.lock().expect("simulated room lock poisoned");
        if let Some((_, queue)) = state.frames.iter_mut().find(|(s, _)| s == sid) {
            queue.push_back(frame);
        }
    }

    /// Data broadcasts published so far, oldest first.
    pub fn published(&self) -> Vec<PublishedData> {
        self.state
            .lock()
            .expect("simulated room lock poisoned")
            .published
            .clone()
    }

    /// Total bytes of agent audio published into the room.
    pub fn audio_bytes_published(&self) -> usize {
        self.state
            .lock()
            .expect("simulated room lock poisoned")
            .audio_bytes
    }
}

struct SimulatedFrameStream {
    sid: String,
    state: Arc<Mutex<SimulatedState>>,
}

#[async_trait]
impl FrameStream for SimulatedFrameStream {
    async fn next_frame(&mut self) -> Result<Option<VisualObservation>, MediaError> {
        let mut state = self.state.lock().expect("simulated room lock poisoned");
        let frame = state
            .frames
            .iter_mut()
            .find(|(s, _)| s == &self.sid)
            .and_then(|(_, queue)| queue.pop_front());
        Ok(frame)
    }
}

#[async_trait]
impl MediaSession for SimulatedRoom {
    async fn remote_tracks(&self) -> Vec<TrackInfo> {
        self.state
            .lock()
            .expect("simulated room lock poisoned")
            .tracks
            .clone()
    }

    async fn open_video_stream(
        &self,
        track_sid: &str,
    ) -> Result<Box<dyn FrameStream>, MediaError> {
        let state = self.state.lock().expect("simulated room lock poisoned");
        let known = state
            .tracks
            .iter()
            .any(|t| t.sid == track_sid && t.kind == TrackKind::Video);
        if !known {
            return Err(MediaError::Stream(format!(
                "no video track with sid '{}'",
                track_sid
            )));
        }
        Ok(Box::new(SimulatedFrameStream {
            sid: track_sid.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    async fn publish_data(
        &self,
        payload: &[u8],
        topic: &str,
        reliable: bool,
    ) -> Result<(), MediaError> {
        let mut state = self.state.lock().expect("simulated room lock poisoned");
        state.published.push(PublishedData {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            reliable,
        });
        Ok(())
    }

    async fn publish_audio(&self, pcm: &[u8]) -> Result<(), MediaError> {
        let mut state = self.state.lock().expect("simulated room lock poisoned");
        state.audio_bytes += pcm.len();
        Ok(())
    }
}
