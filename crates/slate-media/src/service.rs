//! Server-side LiveKit room management: room provisioning, join tokens, and
//! participant removal.
//!
//! The service degrades to disabled when no LiveKit URL is configured; the
//! agent then runs against the in-process room only. Room calls on a
//! disabled service fail with a configuration error rather than reaching
//! for the network.

use crate::config::LiveKitConfig;
use crate::error::MediaError;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use livekit_protocol::Room;
use std::time::Duration;

#[derive(Debug)]
pub struct RoomService {
    config: LiveKitConfig,
    client: Option<RoomClient>,
}

impl RoomService {
    pub fn new(config: LiveKitConfig) -> Self {
        let client = (!config.url.is_empty())
            .then(|| RoomClient::with_api_key(&config.url, &config.api_key, &config.api_secret));
        Self { config, client }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&RoomClient, MediaError> {
        self.client
            .as_ref()
            .ok_or_else(|| MediaError::Config("no LiveKit URL configured".to_string()))
    }

    /// Provisions the named room. LiveKit treats creation as idempotent, so
    /// an already-running room is returned unchanged.
    pub async fn ensure_room(&self, name: &str) -> Result<Room, MediaError> {
        self.client()?
            .create_room(name, CreateRoomOptions::default())
            .await
            .map_err(|e| MediaError::RoomService(e.to_string()))
    }

    /// Issues a join token for one participant, agent or human.
    ///
    /// Everyone gets the same grants: publish and subscribe for audio and
    /// video, plus data publishing so the holder can carry whiteboard
    /// notifications over the data channel.
    pub fn join_token(
        &self,
        room_name: &str,
        identity: &str,
        display_name: &str,
    ) -> Result<String, MediaError> {
        if self.config.api_key.is_empty() || self.config.api_secret.is_empty() {
            return Err(MediaError::Config(
                "LiveKit API key and secret are required to mint join tokens".to_string(),
            ));
        }

        AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(identity)
            .with_name(display_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds))
            .to_jwt()
            .map_err(MediaError::LiveKit)
    }

    pub async fn remove_participant(&self, room: &str, identity: &str) -> Result<(), MediaError> {
        self.client()?
            .remove_participant(room, identity)
            .await
            .map_err(|e| MediaError::RoomService(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> LiveKitConfig {
        LiveKitConfig {
            url: "https://livekit.example".to_string(),
            api_key: "APIkey123".to_string(),
            api_secret: "secretsecretsecret".to_string(),
            token_ttl_seconds: 60,
        }
    }

    #[test]
    fn empty_url_disables_the_service() {
        let service = RoomService::new(LiveKitConfig::default());
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn room_calls_on_disabled_service_fail_with_config_error() {
        let service = RoomService::new(LiveKitConfig::default());
        let err = service.ensure_room("slate-whiteboard").await.unwrap_err();
        assert!(matches!(err, MediaError::Config(_)));
    }

    #[test]
    fn join_token_is_a_signed_jwt() {
        let service = RoomService::new(configured());
        let token = service
            .join_token("slate-whiteboard", "student-1", "Student")
            .unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn join_token_requires_credentials() {
        let mut config = configured();
        config.api_secret.clear();
        let service = RoomService::new(config);
        let err = service
            .join_token("slate-whiteboard", "student-1", "Student")
            .unwrap_err();
        assert!(matches!(err, MediaError::Config(_)));
    }
}
