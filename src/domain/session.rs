use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried in the payload segment of a backend-issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Username.
    pub sub: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token is not a three-part bearer token")]
    Malformed,

    #[error("Token payload is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Token payload is not valid claims JSON: {0}")]
    Claims(#[from] serde_json::Error),

    #[error("Token expired at {0}")]
    Expired(DateTime<Utc>),
}

impl TokenClaims {
    /// Reads the claims without verifying the signature. The backend verifies
    /// every request, so the client only needs identity and expiry.
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(header), Some(payload), Some(_signature), None)
                if !header.is_empty() && !payload.is_empty() =>
            {
                payload
            }
            _ => return Err(TokenError::Malformed),
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=').as_bytes())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<i64>,
    pub username: String,
}

/// A live, unexpired authentication session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: Identity,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_token(token: &str, now: DateTime<Utc>) -> Result<Self, TokenError> {
        let claims = TokenClaims::decode(token)?;
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired(claims.expires_at()));
        }

        Ok(Self {
            token: token.to_string(),
            user: Identity {
                user_id: claims.user_id,
                username: claims.sub.clone(),
            },
            expires_at: claims.expires_at(),
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Short prefix that is safe to put in logs.
    pub fn token_hint(&self) -> String {
        token_hint(&self.token)
    }
}

pub fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(12).collect();
    format!("{}...", prefix)
}

/// Read-only view of the auth store handed to observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub hydrated: bool,
    pub token: Option<String>,
    pub user: Option<Identity>,
    pub is_logged_in: bool,
    pub active_sessions: u32,
}

/// What survives a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedSession {
    pub token: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active_sessions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn encode(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_decode_claims() {
        let token = encode(&serde_json::json!({"sub": "asha", "user_id": 4, "exp": 4_102_444_800i64}));
        let claims = TokenClaims::decode(&token).unwrap();

        assert_eq!(claims.sub, "asha");
        assert_eq!(claims.user_id, Some(4));
        assert_eq!(claims.exp, 4_102_444_800);
    }

    #[test]
    fn test_decode_without_user_id() {
        let token = encode(&serde_json::json!({"sub": "asha", "exp": 4_102_444_800i64}));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.user_id, None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(TokenClaims::decode("not-a-token"), Err(TokenError::Malformed)));
        assert!(matches!(TokenClaims::decode("a..c"), Err(TokenError::Malformed)));
        assert!(matches!(TokenClaims::decode("a.b.c.d"), Err(TokenError::Malformed)));
        assert!(matches!(TokenClaims::decode("a.@@@.c"), Err(TokenError::Encoding(_))));

        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode(b"hello"));
        assert!(matches!(TokenClaims::decode(&not_json), Err(TokenError::Claims(_))));
    }

    #[test]
    fn test_session_expiry_boundary() {
        let now = Utc::now();
        let exp = now.timestamp();
        let token = encode(&serde_json::json!({"sub": "asha", "exp": exp}));

        // exp == now counts as expired
        let at_boundary = Utc.timestamp_opt(exp, 0).unwrap();
        assert!(matches!(Session::from_token(&token, at_boundary), Err(TokenError::Expired(_))));

        let before = at_boundary - Duration::seconds(1);
        let session = Session::from_token(&token, before).unwrap();
        assert_eq!(session.user.username, "asha");
        assert!(session.is_expired_at(at_boundary));
    }

    #[test]
    fn test_token_hint_truncates() {
        assert_eq!(token_hint("abcdefghijklmnopqrstuvwxyz"), "abcdefghijkl...");
        assert_eq!(token_hint("abc"), "abc...");
    }
}
