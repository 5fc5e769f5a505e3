use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use clinic_security::Actor;

use crate::{AuthConfig, AuthError, Claims};

/// Mints and validates HS256 tokens with one shared secret.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    #[must_use]
    pub fn new(cfg: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            validation,
            ttl_secs: cfg.token_ttl_secs,
        }
    }

    /// # Errors
    /// Returns `AuthError::Encoding` if signing fails.
    pub fn issue(&self, actor: &Actor) -> Result<String, AuthError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            sub: actor.id,
            clinic_id: actor.clinic_id,
            role: actor.role,
            iat: now,
            exp: now + self.ttl_secs,
        };
        self.encode(&claims)
    }

    /// # Errors
    /// Returns `AuthError::Encoding` if signing fails.
    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// # Errors
    /// `TokenExpired` past `exp`, `InvalidToken` for anything else that does
    /// not verify.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }
}
