//! HS256 token encode/decode on top of the claims model.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token encoding failed: {0}")]
    Encode(String),

    #[error("token decoding failed: {0}")]
    Decode(String),

    #[error("invalid subject claim: {0}")]
    InvalidSubject(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Wire representation of the claims (standard JWT field names).
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Symmetric HS256 codec for bearer tokens.
///
/// Time-window validation is done against a caller-supplied `now` so the
/// decode path stays deterministic under test.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn encode(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        let wire = WireClaims {
            sub: claims.sub.to_string(),
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &wire, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = decode::<WireClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Decode(e.to_string()))?;

        let sub = data
            .claims
            .sub
            .parse()
            .map_err(|e| TokenError::InvalidSubject(format!("{e}")))?;
        let issued_at = timestamp(data.claims.iat)
            .ok_or_else(|| TokenError::Decode("iat out of range".to_string()))?;
        let expires_at = timestamp(data.claims.exp)
            .ok_or_else(|| TokenError::Decode("exp out of range".to_string()))?;

        let claims = JwtClaims {
            sub,
            issued_at,
            expires_at,
        };
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_core::UserId;
    use chrono::Duration;

    fn codec() -> Hs256TokenCodec {
        Hs256TokenCodec::new(b"test-secret")
    }

    fn fresh_claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let now = Utc::now();
        let claims = fresh_claims(now);
        let token = codec().encode(&claims).unwrap();
        let decoded = codec().decode(&token, now).unwrap();
        assert_eq!(decoded.sub, claims.sub);
    }

    #[test]
    fn decode_rejects_wrong_secret() {
        let now = Utc::now();
        let token = codec().encode(&fresh_claims(now)).unwrap();
        let other = Hs256TokenCodec::new(b"another-secret");
        assert!(matches!(
            other.decode(&token, now),
            Err(TokenError::Decode(_))
        ));
    }

    #[test]
    fn decode_rejects_expired_token() {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: UserId::new(),
            issued_at: now - Duration::hours(2),
            expires_at: now - Duration::hours(1),
        };
        let token = codec().encode(&claims).unwrap();
        assert!(matches!(
            codec().decode(&token, now),
            Err(TokenError::Claims(TokenValidationError::Expired))
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            codec().decode("not.a.token", Utc::now()),
            Err(TokenError::Decode(_))
        ));
    }
}
