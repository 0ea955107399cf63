//! Best-effort single-frame capture from the first available video track.

use crate::session::{MediaSession, TrackKind, VisualObservation};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on waiting for the first frame of a freshly opened stream.
/// A track that never yields costs at most this long per conversational turn.
const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(2);

/// Captures one still frame per call from the active media session.
///
/// Stateless and best-effort: every failure mode (no video track, stream
/// error, empty stream, timeout) collapses to `None` so the caller can
/// proceed without visual context.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    capture_timeout: Duration,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self {
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
        }
    }
}

impl FrameSampler {
    pub fn new(capture_timeout: Duration) -> Self {
        Self { capture_timeout }
    }

    /// Grabs a single frame from the first published remote video track.
    ///
    /// Selection is first-found over [`MediaSession::remote_tracks`], which
    /// iterates in participant join order. The opened stream is consumed
    /// for exactly one frame and dropped on every exit path, releasing the
    /// underlying subscription.
    pub async fn capture_latest_frame(
        &self,
        session: &dyn MediaSession,
    ) -> Option<VisualObservation> {
        let track = session
            .remote_tracks()
            .await
            .into_iter()
            .find(|t| t.kind == TrackKind::Video);

        let track = match track {
            Some(t) => t,
            None => {
                debug!("no remote video track published, skipping frame capture");
                return None;
            }
        };

        info!(
            track_sid = %track.sid,
            participant = %track.participant,
            "found video track for frame capture"
        );

        let mut stream = match session.open_video_stream(&track.sid).await {
            Ok(s) => s,
            Err(e) => {
                warn!(track_sid = %track.sid, "failed to open video stream: {}", e);
                return None;
            }
        };

        match tokio::time::timeout(self.capture_timeout, stream.next_frame()).await {
            Ok(Ok(Some(frame))) => {
                debug!(
                    width = frame.width,
                    height = frame.height,
                    "captured latest video frame"
                );
                Some(frame)
            }
            Ok(Ok(None)) => {
                debug!(track_sid = %track.sid, "video stream ended before yielding a frame");
                None
            }
            Ok(Err(e)) => {
                warn!(track_sid = %track.sid, "failed to read video frame: {}", e);
                None
            }
            Err(_) => {
                debug!(
                    track_sid = %track.sid,
                    timeout_ms = self.capture_timeout.as_millis() as u64,
                    "timed out waiting for first video frame"
                );
                None
            }
        }
        // `stream` dropped here on all paths, closing the subscription.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use crate::session::{FrameStream, SimulatedRoom, TrackInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Media session that counts stream opens and closes, to verify scoped
    /// teardown on every exit path.
    #[derive(Default)]
    struct CountingSession {
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
        frames: Vec<VisualObservation>,
        fail_read: bool,
        hang: bool,
    }

    struct CountingStream {
        closed: Arc<AtomicUsize>,
        frames: std::collections::VecDeque<VisualObservation>,
        fail_read: bool,
        hang: bool,
    }

    impl Drop for CountingStream {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl FrameStream for CountingStream {
        async fn next_frame(&mut self) -> Result<Option<VisualObservation>, MediaError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail_read {
                return Err(MediaError::Stream("simulated transport failure".into()));
            }
            Ok(self.frames.pop_front())
        }
    }

    #[async_trait]
    impl MediaSession for CountingSession {
        async fn remote_tracks(&self) -> Vec<TrackInfo> {
            vec![TrackInfo {
                participant: "viewer".to_string(),
                sid: "TR_cam".to_string(),
                kind: TrackKind::Video,
            }]
        }

        async fn open_video_stream(
            &self,
            _track_sid: &str,
        ) -> Result<Box<dyn FrameStream>, MediaError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingStream {
                closed: Arc::clone(&self.closed),
                frames: self.frames.iter().cloned().collect(),
                fail_read: self.fail_read,
                hang: self.hang,
            }))
        }

        async fn publish_data(
            &self,
            _payload: &[u8],
            _topic: &str,
            _reliable: bool,
        ) -> Result<(), MediaError> {
            Ok(())
        }

        async fn publish_audio(&self, _pcm: &[u8]) -> Result<(), MediaError> {
            Ok(())
        }
    }

    fn frame() -> VisualObservation {
        VisualObservation {
            data: vec![0xFF, 0xD8, 0xFF],
            width: 640,
            height: 480,
        }
    }

    #[tokio::test]
    async fn captures_one_frame_and_closes_stream() {
        let session = CountingSession {
            frames: vec![frame(), frame()],
            ..Default::default()
        };
        let sampler = FrameSampler::default();

        let captured = sampler.capture_latest_frame(&session).await;
        assert!(captured.is_some());
        assert_eq!(session.opened.load(Ordering::SeqCst), 1);
        assert_eq!(session.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_stream_returns_none_and_closes() {
        let session = CountingSession::default();
        let sampler = FrameSampler::default();

        assert!(sampler.capture_latest_frame(&session).await.is_none());
        assert_eq!(session.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_error_returns_none_and_closes() {
        let session = CountingSession {
            fail_read: true,
            ..Default::default()
        };
        let sampler = FrameSampler::default();

        assert!(sampler.capture_latest_frame(&session).await.is_none());
        assert_eq!(session.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hung_stream_times_out_and_closes() {
        let session = CountingSession {
            hang: true,
            ..Default::default()
        };
        let sampler = FrameSampler::new(Duration::from_millis(20));

        assert!(sampler.capture_latest_frame(&session).await.is_none());
        assert_eq!(session.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_video_track_returns_none_without_opening() {
        let room = SimulatedRoom::new();
        room.add_track("alice", "TR_mic", TrackKind::Audio);
        let sampler = FrameSampler::default();

        assert!(sampler.capture_latest_frame(&room).await.is_none());
    }

    #[tokio::test]
    async fn first_video_track_wins() {
        let room = SimulatedRoom::new();
        room.add_track("alice", "TR_mic", TrackKind::Audio);
        room.add_track("bob", "TR_cam1", TrackKind::Video);
        room.add_track("carol", "TR_cam2", TrackKind::Video);
        room.push_frame("TR_cam1", frame());
        room.push_frame("TR_cam2", frame());

        let sampler = FrameSampler::default();
        let captured = sampler.capture_latest_frame(&room).await;
        assert!(captured.is_some());

        // Carol's frame is untouched: only bob's (first in join order) was read.
        let mut stream = room.open_video_stream("TR_cam2").await.unwrap();
        assert!(stream.next_frame().await.unwrap().is_some());
    }
}
