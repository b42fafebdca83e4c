//! Credentials and bearer tokens
//!
//! Passwords are stored as bcrypt hashes. Tokens are HS256 JWTs carrying the numeric
//! user id and whether they grant API access or only mint new access tokens.

use crate::error::{Result, ServerError};
use chrono::{Duration, Utc};
use clinic_core::UserId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: i64,
    token_type: TokenKind,
    iat: i64,
    exp: i64,
}

impl AuthService {
    pub fn new(secret: &str, access_expiration_hours: u64, refresh_expiration_days: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            access_ttl: ttl(access_expiration_hours, Duration::try_hours),
            refresh_ttl: ttl(refresh_expiration_days, Duration::try_days),
        }
    }

    /// Hash a password for storage in `users.password_hash`
    pub fn hash_password(&self, password: &str) -> Result<String> {
        Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
    }

    /// Check a login password; the cost is read from the stored hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }

    pub fn create_access_token(&self, user: UserId) -> Result<String> {
        self.issue(user, TokenKind::Access)
    }

    pub fn create_refresh_token(&self, user: UserId) -> Result<String> {
        self.issue(user, TokenKind::Refresh)
    }

    /// User id behind a bearer token presented to the API
    pub fn verify_access_token(&self, token: &str) -> Result<UserId> {
        self.redeem(token, TokenKind::Access)
    }

    /// User id behind a token presented to the refresh endpoint
    pub fn verify_refresh_token(&self, token: &str) -> Result<UserId> {
        self.redeem(token, TokenKind::Refresh)
    }

    fn issue(&self, user: UserId, kind: TokenKind) -> Result<String> {
        let issued_at = Utc::now();
        let lifetime = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            user_id: user.get(),
            token_type: kind,
            iat: issued_at.timestamp(),
            exp: issued_at
                .checked_add_signed(lifetime)
                .map_or(i64::MAX, |expires| expires.timestamp()),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims> {
        Ok(jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }

    fn redeem(&self, token: &str, expected: TokenKind) -> Result<UserId> {
        let claims = self.decode_claims(token)?;
        if claims.token_type != expected {
            return Err(ServerError::Auth("Invalid token type".to_string()));
        }
        Ok(UserId::new(claims.user_id))
    }
}

fn ttl(amount: u64, unit: fn(i64) -> Option<Duration>) -> Duration {
    i64::try_from(amount)
        .ok()
        .and_then(unit)
        .unwrap_or(Duration::MAX)
}
