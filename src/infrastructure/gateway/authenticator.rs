//! Signature authenticator
//!
//! Verifies, in order: all four auth headers are present and well formed,
//! the timestamp lies within the tolerance window, the API key resolves to
//! a usable credential, the signature matches, and the nonce has not been
//! seen for this key. The nonce is recorded only once the signature has
//! verified, so forged requests cannot burn a legitimate caller's nonce.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::cache::{Cache, CacheKeys};
use crate::domain::clock::SharedClock;
use crate::domain::credential::{ApiKey, Credential, CredentialDirectory};
use crate::domain::gateway::{AuthErrorKind, GatewayError, SignedRequest};
use crate::domain::DomainError;

use super::signature::{self, SigningInput};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";
pub const NONCE_HEADER: &str = "X-Nonce";
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Authenticator settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Maximum accepted |now - timestamp|; also the nonce retention
    pub tolerance: Duration,
    pub nonce_max_length: usize,
    /// Bound on each directory or cache call
    pub operation_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tolerance: Duration::from_secs(300),
            nonce_max_length: 128,
            operation_timeout: Duration::from_secs(3),
        }
    }
}

/// Verifies signed requests and resolves the calling credential
#[derive(Debug, Clone)]
pub struct SignatureAuthenticator {
    directory: Arc<dyn CredentialDirectory>,
    cache: Arc<dyn Cache>,
    keys: CacheKeys,
    clock: SharedClock,
    config: AuthConfig,
}

impl SignatureAuthenticator {
    pub fn new(
        directory: Arc<dyn CredentialDirectory>,
        cache: Arc<dyn Cache>,
        keys: CacheKeys,
        clock: SharedClock,
        config: AuthConfig,
    ) -> Self {
        Self {
            directory,
            cache,
            keys,
            clock,
            config,
        }
    }

    /// Authenticate a request, returning the resolved credential
    pub async fn authenticate(&self, request: &SignedRequest) -> Result<Credential, GatewayError> {
        let api_key = required(&request.api_key, API_KEY_HEADER)?;
        let timestamp = required(&request.timestamp, TIMESTAMP_HEADER)?;
        let nonce = required(&request.nonce, NONCE_HEADER)?;
        let signature = required(&request.signature, SIGNATURE_HEADER)?;

        let api_key = ApiKey::new(api_key)
            .map_err(|_| AuthErrorKind::MalformedField(API_KEY_HEADER))?;
        self.validate_nonce(nonce)?;
        let issued_at = parse_timestamp(timestamp)?;

        self.check_freshness(issued_at)?;

        let credential = self
            .bounded("credential lookup", self.directory.get(&api_key))
            .await?
            .ok_or(AuthErrorKind::UnknownKey)?;

        if !credential.is_usable_at(self.clock.now()) {
            return Err(AuthErrorKind::CredentialInactive.into());
        }

        let input = SigningInput {
            method: &request.method,
            path: &request.path,
            timestamp,
            nonce,
            body: &request.body,
        };

        if !signature::verify(credential.secret(), &input, signature) {
            return Err(AuthErrorKind::BadSignature.into());
        }

        let nonce_key = self.keys.nonce(api_key.as_str(), nonce);
        let first_use = self
            .bounded(
                "nonce check",
                self.cache
                    .set_nx_raw(&nonce_key, timestamp, self.config.tolerance),
            )
            .await?;

        if !first_use {
            return Err(AuthErrorKind::ReplayedNonce.into());
        }

        Ok(credential)
    }

    fn validate_nonce(&self, nonce: &str) -> Result<(), GatewayError> {
        let well_formed = nonce.len() <= self.config.nonce_max_length
            && nonce
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));

        if well_formed {
            Ok(())
        } else {
            Err(AuthErrorKind::MalformedField(NONCE_HEADER).into())
        }
    }

    fn check_freshness(&self, issued_at: i64) -> Result<(), GatewayError> {
        let now = self.clock.now().timestamp();
        let skew = now.abs_diff(issued_at);

        if skew > self.config.tolerance.as_secs() {
            return Err(AuthErrorKind::StaleTimestamp.into());
        }

        Ok(())
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        future: impl std::future::Future<Output = Result<T, DomainError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.config.operation_timeout, future)
            .await
            .map_err(|_| DomainError::timeout(operation))?
            .map_err(GatewayError::from)
    }
}

fn required<'a>(value: &'a Option<String>, header: &'static str) -> Result<&'a str, GatewayError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthErrorKind::MissingField(header).into()),
    }
}

fn parse_timestamp(raw: &str) -> Result<i64, GatewayError> {
    raw.parse::<i64>()
        .map_err(|_| AuthErrorKind::MalformedField(TIMESTAMP_HEADER).into())
}
