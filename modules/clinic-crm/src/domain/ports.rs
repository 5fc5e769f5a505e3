//! Outbound messaging and voice seams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::error::DomainError;
use crate::domain::model::CallStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub provider_message_id: String,
    pub status: String,
}

/// Inbound message normalised from a provider webhook body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub external_conversation_id: String,
    pub from_number: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedCall {
    pub provider_call_id: String,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
}

/// Call status update normalised from a provider webhook body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEvent {
    pub provider_call_id: Option<String>,
    pub status: String,
    pub recording_url: Option<String>,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ClientToken {
    pub token: String,
    pub provider: String,
}

#[async_trait]
pub trait WhatsAppProvider: Send + Sync {
    async fn send_text(&self, to_number: &str, body: &str) -> Result<SentMessage, DomainError>;

    fn parse_webhook(&self, payload: &serde_json::Value) -> InboundMessage;
}

#[async_trait]
pub trait VoiceProvider: Send + Sync {
    async fn initiate_call(&self, from_number: &str, to_number: &str) -> Result<StartedCall, DomainError>;

    fn parse_call_event(&self, payload: &serde_json::Value) -> CallEvent;

    /// Browser softphone credentials.
    fn client_token(&self) -> ClientToken;
}
