use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Shared HS256 secret. Must be overridden outside development.
    pub jwt_secret: String,
    /// Lifetime of tokens minted by `JwtCodec::issue`.
    pub token_ttl_secs: u64,
    /// Salt for the client IP hash stored on the security context.
    pub ip_hash_salt: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-key".to_owned(),
            token_ttl_secs: 8 * 60 * 60,
            ip_hash_salt: "dev-hash-salt".to_owned(),
        }
    }
}
