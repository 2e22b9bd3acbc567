//! Signed, time-boxed access tokens for report sharing.
//!
//! Alert recipients get a link to the full report that works without a login
//! session. The link embeds an HS256 JWT scoped to a single report id;
//! verification distinguishes tampering from expiry so the gateway can audit
//! the two differently.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claim constant marking what the token grants.
pub const TOKEN_TYPE: &str = "test_result_access";
/// Claim constant naming the granted scope.
pub const TOKEN_SCOPE: &str = "read_reports";
/// Issuer recorded in minted tokens.
pub const TOKEN_ISSUER: &str = "watchtower";

/// Default token lifetime.
const DEFAULT_TTL_HOURS: i64 = 24;

const ENV_JWT_SECRET: &str = "JWT_SECRET";

/// Claims carried by a report-access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "type")]
    pub token_type: String,
    pub scope: String,
    #[serde(rename = "reportId")]
    pub report_id: String,
    /// Identity the token was minted for.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Cryptographic verification failed: tampering or a wrong secret.
    #[error("token signature verification failed")]
    Signature,

    /// Signature was valid but the token is past its expiry.
    #[error("token expired")]
    Expired,

    /// Not a parseable JWT at all.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Parsed and verified, but the claims are not a report-access grant.
    #[error("token claims rejected: {0}")]
    Claims(String),

    /// No signing secret available in the environment.
    #[error("JWT_SECRET is not configured")]
    MissingSecret,

    /// Token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Mints and verifies report-access tokens with a process-wide secret.
///
/// Constructed once at startup and shared read-only; the secret is loaded
/// from `JWT_SECRET` and never logged.
pub struct AccessTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    issuer: String,
}

impl std::fmt::Debug for AccessTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenService")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl AccessTokenService {
    /// Create a service from a raw secret with the default 24h lifetime.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
            issuer: TOKEN_ISSUER.to_string(),
        }
    }

    /// Create from the `JWT_SECRET` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingSecret`] when the variable is unset or
    /// empty, so callers can run with signed links disabled.
    pub fn from_env() -> Result<Self, AuthError> {
        match std::env::var(ENV_JWT_SECRET) {
            Ok(secret) if !secret.is_empty() => Ok(Self::new(&secret)),
            _ => Err(AuthError::MissingSecret),
        }
    }

    /// Override the token lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Mint a token granting read access to one report.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the claims cannot be signed.
    pub fn create(&self, report_id: &str, user_id: &str) -> Result<String, AuthError> {
        self.create_at(report_id, user_id, Utc::now())
    }

    /// Mint a token with an explicit issue time.
    ///
    /// Deterministic variant of [`create`](Self::create) for callers that
    /// manage their own clock.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the claims cannot be signed.
    pub fn create_at(
        &self,
        report_id: &str,
        user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = AccessClaims {
            token_type: TOKEN_TYPE.to_string(),
            scope: TOKEN_SCOPE.to_string(),
            report_id: report_id.to_string(),
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a token: signature first, then expiry, then grant claims.
    ///
    /// Synchronous and side-effect free. Expiry uses zero leeway: a token one
    /// second past `exp` is already stale.
    ///
    /// # Errors
    ///
    /// [`AuthError::Signature`] on tampering or a wrong secret,
    /// [`AuthError::Expired`] when only the lifetime has run out,
    /// [`AuthError::Malformed`] when the input is not a JWT, and
    /// [`AuthError::Claims`] when the grant is not a report read.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);

        let data =
            decode::<AccessClaims>(token, &self.decoding, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    ErrorKind::InvalidSignature => AuthError::Signature,
                    ErrorKind::InvalidIssuer => AuthError::Claims("issuer mismatch".to_string()),
                    _ => AuthError::Malformed(e.to_string()),
                }
            })?;

        let claims = data.claims;
        if claims.token_type != TOKEN_TYPE {
            return Err(AuthError::Claims(format!(
                "unexpected token type {:?}",
                claims.token_type
            )));
        }
        if claims.scope != TOKEN_SCOPE {
            return Err(AuthError::Claims(format!(
                "unexpected scope {:?}",
                claims.scope
            )));
        }
        Ok(claims)
    }

    /// Build the signed URL embedded in alert messages.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the token cannot be minted.
    pub fn signed_report_url(
        &self,
        base: &str,
        report_id: &str,
        user_id: &str,
    ) -> Result<String, AuthError> {
        let token = self.create(report_id, user_id)?;
        Ok(format!(
            "{}/api/test-results/secure/{report_id}?token={token}",
            base.trim_end_matches('/')
        ))
    }
}
