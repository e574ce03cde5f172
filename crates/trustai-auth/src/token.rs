use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Map, Value};
use uuid::Uuid;

use trustai_types::api::{Claims, TokenPurpose};

use crate::error::TokenError;

/// Reset tokens always live for 15 minutes, independent of session lifetime.
pub const RESET_TOKEN_TTL: Duration = Duration::minutes(15);

const RESERVED_CLAIMS: &[&str] = &["sub", "iat", "exp", "purpose", "jti"];

/// Issues and validates HS256 tokens (`header.payload.signature`).
///
/// The secret is fixed at construction and never rotated for the lifetime of
/// the service. All methods take `&self` and are safe to share across tasks.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], session_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in `decode_at`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            session_ttl,
        }
    }

    pub fn issue(
        &self,
        subject: &str,
        ttl: Duration,
        purpose: TokenPurpose,
        extra: Map<String, Value>,
    ) -> Result<String, TokenError> {
        self.issue_at(subject, ttl, purpose, extra, Utc::now())
    }

    /// Reset tokens get a fresh nonce in `jti`; session tokens carry no
    /// `purpose` claim at all.
    pub fn issue_at(
        &self,
        subject: &str,
        ttl: Duration,
        purpose: TokenPurpose,
        mut extra: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        extra.retain(|key, _| !RESERVED_CLAIMS.contains(&key.as_str()));

        let (purpose, jti) = match purpose {
            TokenPurpose::Session => (None, None),
            TokenPurpose::Reset => (Some(TokenPurpose::Reset), Some(Uuid::new_v4().to_string())),
        };

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            purpose,
            jti,
            extra,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    pub fn issue_session(&self, subject: &str) -> Result<String, TokenError> {
        self.issue(subject, self.session_ttl, TokenPurpose::Session, Map::new())
    }

    pub fn issue_reset(&self, subject: &str) -> Result<String, TokenError> {
        self.issue(subject, RESET_TOKEN_TTL, TokenPurpose::Reset, Map::new())
    }

    pub fn decode(&self, token: &str, expected: TokenPurpose) -> Result<Claims, TokenError> {
        self.decode_at(token, expected, Utc::now())
    }

    /// Fails when the signature does not verify, when `now` is past `exp`,
    /// or when the token's purpose differs from `expected`.
    pub fn decode_at(
        &self,
        token: &str,
        expected: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Invalid)?
            .claims;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        let found = claims.purpose();
        if found != expected {
            return Err(TokenError::PurposeMismatch { expected, found });
        }

        Ok(claims)
    }
}
