use serde::{Deserialize, Serialize};

/// `crm` section of the server config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CrmConfig {
    /// Page size of the lead timeline.
    pub timeline_page_size: usize,
    /// Required `X-API-Key` of the public lead endpoint. Empty disables the check.
    pub lead_api_key: String,
    pub api_rate_limit_count: usize,
    pub api_rate_limit_window_secs: u64,
    /// When on, public submissions must carry a non-empty `captcha_token`.
    pub enable_captcha: bool,
    pub whatsapp_provider: ProviderKind,
    pub voice_provider: ProviderKind,
    /// Caller id used for outbound calls.
    pub outbound_caller_id: String,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            timeline_page_size: 25,
            lead_api_key: "change-this-key".to_owned(),
            api_rate_limit_count: 30,
            api_rate_limit_window_secs: 60,
            enable_captcha: false,
            whatsapp_provider: ProviderKind::Stub,
            voice_provider: ProviderKind::Stub,
            outbound_caller_id: "+355690000001".to_owned(),
        }
    }
}

/// Messaging/voice backend. Only the in-process stub ships.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Stub,
}
