//! Thin client for the room service REST surface: who am I, which rooms
//! exist, and the chat history of a room. Everything live goes over the
//! signaling channel instead.

use crate::error::ApiError;
use palaver_core::{ChatMessage, RoomId};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct CreateRoomRequest<'a> {
    name: &'a str,
}

/// Stored message record. History rows carry the text under `value`, unlike
/// the live chat frames which use `message`.
#[derive(Debug, Deserialize)]
struct MessageRecord {
    username: String,
    value: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let url = format!("{}/auth/users/me/", self.base_url);
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(&resp)?;
        Ok(resp.json().await?)
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ApiError> {
        let url = format!("{}/chat/rooms/", self.base_url);
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(&resp)?;
        Ok(resp.json().await?)
    }

    pub async fn create_room(&self, name: &str) -> Result<RoomSummary, ApiError> {
        let url = format!("{}/chat/rooms/", self.base_url);
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&CreateRoomRequest { name })
            .send()
            .await?;
        Self::check(&resp)?;
        Ok(resp.json().await?)
    }

    /// Chat history of a room, oldest first, ready to seed a session log.
    pub async fn message_history(&self, room: RoomId) -> Result<Vec<ChatMessage>, ApiError> {
        let url = format!("{}/chat/rooms/{}/messages/", self.base_url, room);
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(&resp)?;
        let records: Vec<MessageRecord> = resp.json().await?;
        debug!("Fetched {} history messages for room {}", records.len(), room);
        Ok(records
            .into_iter()
            .map(|r| ChatMessage {
                username: r.username,
                message: r.value,
            })
            .collect())
    }

    fn check(resp: &reqwest::Response) -> Result<(), ApiError> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(status))
        }
    }
}
