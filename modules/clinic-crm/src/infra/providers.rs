//! In-process provider stubs. They never leave the process.

use async_trait::async_trait;
use chrono::Utc;

use crate::config::ProviderKind;
use crate::domain::error::DomainError;
use crate::domain::model::CallStatus;
use crate::domain::ports::{
    CallEvent, ClientToken, InboundMessage, SentMessage, StartedCall, VoiceProvider, WhatsAppProvider,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct StubWhatsAppProvider;

#[async_trait]
impl WhatsAppProvider for StubWhatsAppProvider {
    async fn send_text(&self, to_number: &str, _body: &str) -> Result<SentMessage, DomainError> {
        tracing::debug!(to = to_number, "stub whatsapp send");
        Ok(SentMessage {
            provider_message_id: format!("stub-msg-{}", Utc::now().timestamp()),
            status: "queued".to_owned(),
        })
    }

    fn parse_webhook(&self, payload: &serde_json::Value) -> InboundMessage {
        InboundMessage {
            external_conversation_id: str_field(payload, "conversation_id")
                .unwrap_or_else(|| "stub-conv".to_owned()),
            from_number: str_field(payload, "from_number"),
            body: str_field(payload, "body").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StubVoiceProvider;

#[async_trait]
impl VoiceProvider for StubVoiceProvider {
    async fn initiate_call(&self, from_number: &str, to_number: &str) -> Result<StartedCall, DomainError> {
        tracing::debug!(from = from_number, to = to_number, "stub voice call");
        let now = Utc::now();
        Ok(StartedCall {
            provider_call_id: format!("stub-call-{}", now.timestamp()),
            status: CallStatus::Ringing,
            started_at: now,
        })
    }

    fn parse_call_event(&self, payload: &serde_json::Value) -> CallEvent {
        CallEvent {
            provider_call_id: str_field(payload, "provider_call_id"),
            status: str_field(payload, "status").unwrap_or_else(|| "completed".to_owned()),
            recording_url: str_field(payload, "recording_url"),
            duration_seconds: payload
                .get("duration_seconds")
                .and_then(serde_json::Value::as_i64)
                .and_then(|d| i32::try_from(d).ok()),
        }
    }

    fn client_token(&self) -> ClientToken {
        ClientToken {
            token: "stub-token".to_owned(),
            provider: "stub".to_owned(),
        }
    }
}

pub fn whatsapp_provider(kind: ProviderKind) -> std::sync::Arc<dyn WhatsAppProvider> {
    match kind {
        ProviderKind::Stub => std::sync::Arc::new(StubWhatsAppProvider),
    }
}

pub fn voice_provider(kind: ProviderKind) -> std::sync::Arc<dyn VoiceProvider> {
    match kind {
        ProviderKind::Stub => std::sync::Arc::new(StubVoiceProvider),
    }
}

fn str_field(payload: &serde_json::Value, key: &str) -> Option<String> {
    payload.get(key).and_then(serde_json::Value::as_str).map(str::to_owned)
}
