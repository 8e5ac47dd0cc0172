use crate::error::{ForgeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DAILY_API_URL: &str = "https://api.daily.co/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the candidate (and a voice bot) can join a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub url: String,
    #[serde(default)]
    pub token: String,
}

impl RoomInfo {
    /// The room handed out when provisioning is unavailable.
    pub fn placeholder(session_id: &str) -> Self {
        Self {
            url: format!("https://demo.daily.co/interview-{session_id}"),
            token: String::new(),
        }
    }
}

/// Creates a media room for a session. Never fails; falls back to a placeholder.
#[async_trait]
pub trait RoomProvisioner: Send + Sync {
    async fn create_room(&self, session_id: &str) -> RoomInfo;
}

#[derive(Debug, Deserialize)]
struct RoomResponse {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

/// `RoomProvisioner` for the Daily REST API.
pub struct DailyRooms {
    client: Client,
    api_key: Option<SecretString>,
    api_url: String,
}

impl DailyRooms {
    pub fn new(api_key: Option<SecretString>, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn try_create_room(&self, api_key: &SecretString, session_id: &str) -> Result<RoomInfo> {
        let body = serde_json::json!({
            "name": format!("interview-{session_id}"),
            "privacy": "private",
            "properties": {
                "enable_chat": false,
                "enable_screenshare": false,
                "start_audio_off": false,
                "start_video_off": true,
                "max_participants": 2
            }
        });

        let room = self
            .client
            .post(format!("{}/rooms", self.api_url))
            .bearer_auth(api_key.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<RoomResponse>()
            .await?;
        tracing::info!("Created Daily room: {}", room.url);

        // A missing token only limits the bot; the room itself is still usable.
        let token = match self.create_owner_token(api_key, &room.name).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Failed to create meeting token for {}: {}", room.name, e);
                String::new()
            }
        };

        Ok(RoomInfo {
            url: room.url,
            token,
        })
    }

    async fn create_owner_token(&self, api_key: &SecretString, room_name: &str) -> Result<String> {
        let body = serde_json::json!({
            "properties": {
                "room_name": room_name,
                "is_owner": true
            }
        });

        let resp = self
            .client
            .post(format!("{}/meeting-tokens", self.api_url))
            .bearer_auth(api_key.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?;

        if resp.token.is_empty() {
            return Err(ForgeError::UpstreamUnavailable(
                "Daily returned an empty meeting token".to_string(),
            ));
        }
        Ok(resp.token)
    }
}

#[async_trait]
impl RoomProvisioner for DailyRooms {
    async fn create_room(&self, session_id: &str) -> RoomInfo {
        let Some(api_key) = &self.api_key else {
            tracing::warn!("No Daily API key - using demo URL");
            return RoomInfo::placeholder(session_id);
        };

        match self.try_create_room(api_key, session_id).await {
            Ok(room) => room,
            Err(e) => {
                tracing::error!("Error creating Daily room: {}", e);
                RoomInfo::placeholder(session_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_provisioner_returns_placeholder() {
        let rooms = DailyRooms::new(None, DEFAULT_DAILY_API_URL);
        let room = rooms.create_room("sess_1234abcd").await;
        assert_eq!(room.url, "https://demo.daily.co/interview-sess_1234abcd");
        assert!(room.token.is_empty());
    }

    #[tokio::test]
    async fn unreachable_api_returns_placeholder() {
        let rooms = DailyRooms::new(
            Some(SecretString::from("key".to_string())),
            "http://127.0.0.1:9/",
        );
        let room = rooms.create_room("sess_00000000").await;
        assert_eq!(room, RoomInfo::placeholder("sess_00000000"));
    }
}
