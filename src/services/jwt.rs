//! JWT issuing and validation.
//!
//! Access and refresh tokens are HS256-signed with the configured secret. The
//! refresh token carries the same identity claims, so a new access token can be
//! minted from it without a database round trip.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtConfig;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token is invalid or expired")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Token has wrong type")]
    WrongType,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    pub is_staff: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl: Duration::minutes(config.access_expires_in_minutes),
            refresh_ttl: Duration::hours(config.refresh_expires_in_hours),
        }
    }

    pub fn issue_pair(&self, user_id: i64, email: &str, is_staff: bool) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue(user_id, email, is_staff, TokenType::Access, self.access_ttl)?,
            refresh: self.issue(user_id, email, is_staff, TokenType::Refresh, self.refresh_ttl)?,
        })
    }

    /// Mints a fresh access token from a valid refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, JwtError> {
        let claims = self.verify(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongType);
        }
        self.issue(claims.sub, &claims.email, claims.is_staff, TokenType::Access, self.access_ttl)
    }

    /// Checks signature and expiry of either token type.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.verify(token)?;
        if claims.token_type != TokenType::Access {
            return Err(JwtError::WrongType);
        }
        Ok(claims)
    }

    fn issue(
        &self,
        user_id: i64,
        email: &str,
        is_staff: bool,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            is_staff,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }
}
