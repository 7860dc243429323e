use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub type UserId = Uuid;
pub type ResetTokenId = Uuid;

/// Raw reset tokens carry 256 bits of entropy.
const RESET_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            created_at,
        }
    }
}

/// A single-use password reset grant. Only the SHA-256 of the raw token is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    pub id: ResetTokenId,
    pub user_id: UserId,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl ResetToken {
    /// Issue a token for `user_id`. Returns the stored record and the raw
    /// token, which is handed to the user and never persisted.
    pub fn issue(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> (Self, String) {
        let raw = generate_raw_token();
        let token = Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_token(&raw),
            issued_at: now,
            expires_at: now + ttl,
            consumed_at: None,
        };
        (token, raw)
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_consumed() && !self.is_expired(now)
    }
}

fn generate_raw_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Lookup key for a raw token.
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_stores_hash_not_raw() {
        let now = Utc::now();
        let (token, raw) = ResetToken::issue(Uuid::new_v4(), now, Duration::hours(1));
        assert_eq!(raw.len(), RESET_TOKEN_BYTES * 2);
        assert_ne!(token.token_hash, raw);
        assert_eq!(token.token_hash, hash_token(&raw));
        assert_eq!(token.expires_at, now + Duration::hours(1));
    }

    #[test]
    fn test_tokens_are_unique() {
        let now = Utc::now();
        let (_, a) = ResetToken::issue(Uuid::new_v4(), now, Duration::hours(1));
        let (_, b) = ResetToken::issue(Uuid::new_v4(), now, Duration::hours(1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_usability_window() {
        let now = Utc::now();
        let (mut token, _) = ResetToken::issue(Uuid::new_v4(), now, Duration::hours(1));
        assert!(token.is_usable(now));
        assert!(token.is_usable(now + Duration::minutes(59)));
        assert!(!token.is_usable(now + Duration::hours(1)));

        token.consumed_at = Some(now);
        assert!(!token.is_usable(now));
    }
}
