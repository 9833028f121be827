//! Session persistence over an external key-value store.
//!
//! Records live under namespaced keys (`session:<id>`, `conversation:<id>`)
//! with a flat 24h TTL; the store service owns expiry, there is no delete
//! path. Conversation writes are wholesale overwrites, so two concurrent
//! turns on one session can lose an update (last writer wins).

mod memory;

pub use memory::MemoryKvStore;

use crate::llm::ChatMessage;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Retention for session and conversation records.
pub const SESSION_TTL: Duration = Duration::from_secs(86_400);

/// Store error
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("stored record is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raw key-value access. `None` from `get` means absent or expired.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value with a time-to-live. Expiry is enforced by the store.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;
}

/// Session record as persisted.
///
/// Timestamps are epoch milliseconds. `createdAt` is optional because
/// records written before the field existed lack it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub last_activity: i64,
    #[serde(default)]
    pub message_count: u32,
}

/// Full conversation transcript for a session, overwritten each turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub last_updated: i64,
}

/// Summary composed from the session and conversation records.
///
/// `lastActivity`/`createdAt` are null when unknown; the conversation
/// fields are omitted entirely when no conversation record exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_id: String,
    pub message_count: u32,
    pub last_activity: Option<String>,
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Typed layer over a [`KvStore`]: key namespacing, record shapes, TTL.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn session_key(session_id: &str) -> String {
        format!("session:{session_id}")
    }

    fn conversation_key(session_id: &str) -> String {
        format!("conversation:{session_id}")
    }

    /// Create and persist a fresh session record.
    pub async fn create_session(&self) -> StoreResult<Session> {
        let now = Utc::now().timestamp_millis();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Some(now),
            last_activity: now,
            message_count: 0,
        };
        self.save_session(&session).await?;
        Ok(session)
    }

    pub async fn load_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        match self.kv.get(&Self::session_key(session_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save_session(&self, session: &Session) -> StoreResult<()> {
        let raw = serde_json::to_string(session)?;
        self.kv
            .put(&Self::session_key(&session.id), &raw, SESSION_TTL)
            .await
    }

    /// Update session metadata after a turn: bump `lastActivity`, set the
    /// message count, keep `createdAt` from the stored record when there is
    /// one. A failed read counts as session-absent and the write proceeds.
    pub async fn record_turn(&self, session_id: &str, message_count: u32) -> StoreResult<()> {
        let existing = self.load_session(session_id).await.ok().flatten();
        let now = Utc::now().timestamp_millis();
        let session = Session {
            id: session_id.to_string(),
            created_at: existing.and_then(|s| s.created_at).or(Some(now)),
            last_activity: now,
            message_count,
        };
        self.save_session(&session).await
    }

    /// Overwrite the stored transcript for a session.
    pub async fn save_conversation(
        &self,
        session_id: &str,
        messages: &[ChatMessage],
    ) -> StoreResult<()> {
        let record = ConversationRecord {
            session_id: session_id.to_string(),
            messages: messages.to_vec(),
            last_updated: Utc::now().timestamp_millis(),
        };
        let raw = serde_json::to_string(&record)?;
        self.kv
            .put(&Self::conversation_key(session_id), &raw, SESSION_TTL)
            .await
    }

    pub async fn load_conversation(
        &self,
        session_id: &str,
    ) -> StoreResult<Option<ConversationRecord>> {
        match self.kv.get(&Self::conversation_key(session_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Compose both records into one summary. Absent records mean zeroed
    /// and null fields, not an error; transport failures still propagate.
    pub async fn stats(&self, session_id: &str) -> StoreResult<SessionStats> {
        let session = self.load_session(session_id).await?;
        let conversation = self.load_conversation(session_id).await?;

        let mut stats = SessionStats {
            session_id: session_id.to_string(),
            message_count: 0,
            last_activity: None,
            created_at: None,
            conversation_length: None,
            last_updated: None,
        };

        if let Some(session) = session {
            stats.message_count = session.message_count;
            stats.last_activity = (session.last_activity > 0)
                .then(|| iso_from_millis(session.last_activity))
                .flatten();
            stats.created_at = session.created_at.and_then(iso_from_millis);
        }

        if let Some(conversation) = conversation {
            stats.conversation_length = Some(conversation.messages.len());
            stats.last_updated = (conversation.last_updated > 0)
                .then(|| iso_from_millis(conversation.last_updated))
                .flatten();
        }

        Ok(stats)
    }
}

fn iso_from_millis(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Key-value access over the store service's REST interface.
///
/// `GET {base}/values/{key}` reads (404 means absent),
/// `PUT {base}/values/{key}?expiration_ttl={secs}` writes.
pub struct HttpKvStore {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

/// Store connection settings, read from the environment.
#[derive(Debug, Clone)]
pub struct KvConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl KvConfig {
    /// `None` when `KV_BASE_URL` is unset; persistence is optional.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("KV_BASE_URL").ok()?;
        Some(Self {
            base_url,
            api_token: std::env::var("KV_API_TOKEN").ok(),
        })
    }
}

impl HttpKvStore {
    pub fn new(config: &KvConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        }
    }

    fn value_url(&self, key: &str) -> String {
        format!("{}/values/{key}", self.base_url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl KvStore for HttpKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let response = self
            .authorize(self.client.get(self.value_url(key)))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(Some(response.text().await?))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let response = self
            .authorize(self.client.put(self.value_url(key)))
            .query(&[("expiration_ttl", ttl.as_secs())])
            .body(value.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, Role};

    fn memory_store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKvStore::new()))
    }

    fn user_message(text: &str) -> ChatMessage {
        ChatMessage::new(Role::User, text)
    }

    #[tokio::test]
    async fn test_create_and_load_session() {
        let store = memory_store();
        let session = store.create_session().await.unwrap();

        assert_eq!(session.message_count, 0);
        assert!(session.created_at.is_some());

        let loaded = store.load_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.created_at, session.created_at);
    }

    #[tokio::test]
    async fn test_load_missing_session() {
        let store = memory_store();
        assert!(store.load_session("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_turn_preserves_created_at() {
        let store = memory_store();
        let session = store.create_session().await.unwrap();

        store.record_turn(&session.id, 5).await.unwrap();

        let updated = store.load_session(&session.id).await.unwrap().unwrap();
        assert_eq!(updated.message_count, 5);
        assert_eq!(updated.created_at, session.created_at);
        assert!(updated.last_activity >= session.last_activity);
    }

    #[tokio::test]
    async fn test_record_turn_without_existing_session() {
        let store = memory_store();
        store.record_turn("fresh", 1).await.unwrap();

        let session = store.load_session("fresh").await.unwrap().unwrap();
        assert_eq!(session.message_count, 1);
        assert!(session.created_at.is_some());
    }

    #[tokio::test]
    async fn test_conversation_overwrite() {
        let store = memory_store();
        store
            .save_conversation("s1", &[user_message("one")])
            .await
            .unwrap();
        store
            .save_conversation("s1", &[user_message("one"), user_message("two")])
            .await
            .unwrap();

        let record = store.load_conversation("s1").await.unwrap().unwrap();
        assert_eq!(record.messages.len(), 2);
        assert_eq!(record.session_id, "s1");
    }

    #[tokio::test]
    async fn test_session_and_conversation_keys_do_not_collide() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = SessionStore::new(kv.clone());

        let session = store.create_session().await.unwrap();
        store
            .save_conversation(&session.id, &[user_message("hi")])
            .await
            .unwrap();

        assert!(kv
            .get(&format!("session:{}", session.id))
            .await
            .unwrap()
            .is_some());
        assert!(kv
            .get(&format!("conversation:{}", session.id))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_stats_for_unknown_session() {
        let store = memory_store();
        let stats = store.stats("ghost").await.unwrap();

        assert_eq!(stats.message_count, 0);
        assert!(stats.last_activity.is_none());
        assert!(stats.created_at.is_none());
        assert!(stats.conversation_length.is_none());
    }

    #[tokio::test]
    async fn test_stats_composes_both_records() {
        let store = memory_store();
        let session = store.create_session().await.unwrap();
        store.record_turn(&session.id, 3).await.unwrap();
        store
            .save_conversation(&session.id, &[user_message("a"), user_message("b")])
            .await
            .unwrap();

        let stats = store.stats(&session.id).await.unwrap();
        assert_eq!(stats.message_count, 3);
        assert_eq!(stats.conversation_length, Some(2));
        assert!(stats.created_at.is_some());
        assert!(stats.last_updated.is_some());
    }

    #[test]
    fn test_session_record_wire_format() {
        let session = Session {
            id: "abc".to_string(),
            created_at: Some(1_700_000_000_000),
            last_activity: 1_700_000_100_000,
            message_count: 4,
        };

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&session).unwrap()).unwrap();
        assert_eq!(json["createdAt"], 1_700_000_000_000_i64);
        assert_eq!(json["lastActivity"], 1_700_000_100_000_i64);
        assert_eq!(json["messageCount"], 4);
    }

    #[test]
    fn test_session_tolerates_missing_created_at() {
        let session: Session =
            serde_json::from_str(r#"{"id":"abc","lastActivity":12,"messageCount":1}"#).unwrap();
        assert!(session.created_at.is_none());
    }

    #[test]
    fn test_stats_serializes_nulls_but_omits_missing_conversation() {
        let stats = SessionStats {
            session_id: "abc".to_string(),
            message_count: 0,
            last_activity: None,
            created_at: None,
            conversation_length: None,
            last_updated: None,
        };

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"lastActivity\":null"));
        assert!(json.contains("\"createdAt\":null"));
        assert!(!json.contains("conversationLength"));
        assert!(!json.contains("lastUpdated"));
    }
}
