use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("token does not have three dot-separated segments")]
    Shape,
    #[error("token payload is not base64url")]
    Encoding,
    #[error("token payload is not a JSON claims object")]
    Claims,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    exp: Option<f64>,
    sub: Option<serde_json::Value>,
}

/// Bearer token with its claims decoded. The signature is never checked
/// here; only the backend can do that.
#[derive(Debug, Clone)]
pub struct Credential {
    token: String,
    claims: Claims,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Expired,
    MissingExpiry,
    Malformed,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
}

impl Credential {
    pub fn parse(token: &str) -> Result<Self, CredentialError> {
        let token = token.trim();
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments[0].is_empty() || segments[1].is_empty() {
            return Err(CredentialError::Shape);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(segments[1].trim_end_matches('='))
            .map_err(|_| CredentialError::Encoding)?;

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| CredentialError::Claims)?;

        Ok(Self {
            token: token.to_string(),
            claims,
        })
    }

    /// Classifies a raw token. Anything that cannot be decoded is
    /// `Malformed`, which callers treat exactly like `Expired`.
    pub fn check(token: &str, now: DateTime<Utc>) -> Validity {
        match Self::parse(token) {
            Ok(credential) => credential.validity_at(now),
            Err(_) => Validity::Malformed,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.claims.exp?;
        let millis = (exp * 1000.0) as i64;
        Utc.timestamp_millis_opt(millis).single()
    }

    pub fn subject(&self) -> Option<String> {
        self.claims.sub.as_ref().map(|sub| match sub {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn validity_at(&self, now: DateTime<Utc>) -> Validity {
        let Some(exp) = self.claims.exp else {
            return Validity::MissingExpiry;
        };

        if exp * 1000.0 < now.timestamp_millis() as f64 {
            Validity::Expired
        } else {
            Validity::Valid
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.validity_at(now).is_valid()
    }
}
