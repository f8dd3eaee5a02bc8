//! Challenge/response session with the settlement service
//!
//! ```text
//! Unauthenticated ──request_challenge──► ChallengeIssued ──verify──► Authenticated
//!        ▲                                     │                         │
//!        └──────── rejected / expired ◄────────┘◄──── invalidate ────────┘
//! ```
//!
//! Concurrent callers of [`AuthSession::token`] share one login. A token is
//! only ever replaced, never patched, and stays usable while a new challenge
//! is outstanding.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::api::{AuthChallenge, SettlementApi};
use crate::classifier;
use crate::error::{Error, Result};
use crate::wallet::RawSigner;

/// Bearer credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub fn new(value: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value,
            issued_at: Utc::now(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Session state as seen by callers; a usable token takes precedence
#[derive(Debug, Clone)]
pub enum AuthState {
    Unauthenticated,
    ChallengeIssued(AuthChallenge),
    Authenticated(Arc<AuthToken>),
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<Arc<AuthToken>>,
    challenge: Option<AuthChallenge>,
}

impl SessionState {
    fn valid_token(&self) -> Option<Arc<AuthToken>> {
        self.token
            .as_ref()
            .filter(|token| !token.is_expired(Utc::now()))
            .cloned()
    }
}

/// Authenticated session bound to one signer
pub struct AuthSession {
    api: Arc<dyn SettlementApi>,
    signer: Arc<dyn RawSigner>,
    state: RwLock<SessionState>,
    login: Mutex<()>,
    logins: AtomicU64,
}

impl AuthSession {
    pub fn new(api: Arc<dyn SettlementApi>, signer: Arc<dyn RawSigner>) -> Self {
        Self {
            api,
            signer,
            state: RwLock::new(SessionState::default()),
            login: Mutex::new(()),
            logins: AtomicU64::new(0),
        }
    }

    pub fn public_key(&self) -> &str {
        self.signer.public_key()
    }

    pub async fn state(&self) -> AuthState {
        let state = self.state.read().await;
        match (state.valid_token(), &state.challenge) {
            (Some(token), _) => AuthState::Authenticated(token),
            (None, Some(challenge)) => AuthState::ChallengeIssued(challenge.clone()),
            (None, None) => AuthState::Unauthenticated,
        }
    }

    /// Number of completed logins
    pub fn login_count(&self) -> u64 {
        self.logins.load(Ordering::Relaxed)
    }

    /// Ask the service for a challenge for this signer
    pub async fn request_challenge(&self) -> Result<AuthChallenge> {
        let challenge = self.api.auth_challenge(self.signer.public_key()).await?;
        debug!(public_key = %self.signer.public_key(), "Challenge issued");
        self.state.write().await.challenge = Some(challenge.clone());
        Ok(challenge)
    }

    /// Sign the challenge text with the raw-signing primitive; returns hex
    pub async fn sign_challenge(&self, challenge: &AuthChallenge) -> Result<String> {
        let signature = self
            .signer
            .sign_raw_message(challenge.challenge.as_bytes())
            .await?;
        if signature.is_empty() {
            return Err(Error::Signing("signer returned an empty signature".to_string()));
        }
        Ok(hex::encode(signature))
    }

    /// Exchange a challenge signature for a token
    pub async fn verify(&self, signature_hex: &str) -> Result<Arc<AuthToken>> {
        let challenge = self.state.read().await.challenge.clone().ok_or_else(|| {
            Error::InvalidParameter("no authentication challenge outstanding".to_string())
        })?;

        if challenge.expires_at.map(|at| Utc::now() >= at).unwrap_or(false) {
            self.state.write().await.challenge = None;
            return Err(Error::ChallengeExpired);
        }

        let result = self
            .api
            .auth_verify(
                self.signer.public_key(),
                signature_hex,
                challenge.session_id.as_deref(),
            )
            .await;

        let grant = match result {
            Ok(grant) => grant,
            Err(e) => {
                self.state.write().await.challenge = None;
                return Err(match e {
                    Error::Remote(body) if body.error_code == classifier::CHALLENGE_EXPIRED_CODE => {
                        Error::ChallengeExpired
                    }
                    Error::Remote(body) => Error::SignatureRejected(body.message),
                    Error::AuthExpired => {
                        Error::SignatureRejected("challenge signature not accepted".to_string())
                    }
                    other => other,
                });
            }
        };

        let token = Arc::new(AuthToken::new(grant.access_token, grant.expires_at));
        {
            let mut state = self.state.write().await;
            state.token = Some(token.clone());
            state.challenge = None;
        }
        self.logins.fetch_add(1, Ordering::Relaxed);

        info!(
            public_key = %self.signer.public_key(),
            expires_at = ?token.expires_at(),
            "Authenticated with settlement service"
        );
        Ok(token)
    }

    /// Full challenge, sign, verify round
    pub async fn authenticate(&self) -> Result<Arc<AuthToken>> {
        let challenge = self.request_challenge().await?;
        let signature = match self.sign_challenge(&challenge).await {
            Ok(signature) => signature,
            Err(e) => {
                self.state.write().await.challenge = None;
                return Err(e);
            }
        };
        self.verify(&signature).await
    }

    /// Current token, logging in if there is none
    pub async fn token(&self) -> Result<Arc<AuthToken>> {
        if let Some(token) = self.state.read().await.valid_token() {
            return Ok(token);
        }

        let _guard = self.login.lock().await;
        // Another caller may have logged in while we waited
        if let Some(token) = self.state.read().await.valid_token() {
            return Ok(token);
        }
        self.authenticate().await
    }

    /// Drop `failed` if it is still the current token
    pub async fn invalidate(&self, failed: &AuthToken) {
        let mut state = self.state.write().await;
        if state.token.as_ref().map(|current| current.value() == failed.value()) == Some(true) {
            warn!(public_key = %self.signer.public_key(), "Auth token invalidated");
            state.token = None;
        }
    }

    /// Run `op` with a token; on `AuthExpired` log in again and retry once
    pub async fn with_reauth<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn(Arc<AuthToken>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.token().await?;
        match op(token.clone()).await {
            Err(Error::AuthExpired) => {
                info!("Auth expired, re-authenticating once");
                self.invalidate(&token).await;
                let fresh = self.token().await?;
                op(fresh).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSigner, MockApi};
    use std::sync::atomic::AtomicUsize;

    fn session(api: Arc<MockApi>) -> AuthSession {
        AuthSession::new(api, Arc::new(FakeSigner::new("02signer")))
    }

    #[tokio::test]
    async fn test_login_flow() {
        let api = Arc::new(MockApi::new());
        let session = session(api.clone());

        assert!(matches!(session.state().await, AuthState::Unauthenticated));
        let challenge = session.request_challenge().await.unwrap();
        assert!(matches!(session.state().await, AuthState::ChallengeIssued(_)));

        let signature = session.sign_challenge(&challenge).await.unwrap();
        assert_eq!(signature, hex::encode(FakeSigner::sign(challenge.challenge.as_bytes())));

        let token = session.verify(&signature).await.unwrap();
        assert!(matches!(session.state().await, AuthState::Authenticated(_)));
        assert_eq!(token.value(), "token-1");
    }

    #[tokio::test]
    async fn test_rejected_signature_resets_state() {
        let api = Arc::new(MockApi::new());
        let session = session(api.clone());
        session.request_challenge().await.unwrap();

        let err = session.verify("deadbeef").await.unwrap_err();
        assert!(matches!(err, Error::SignatureRejected(_)));
        assert!(matches!(session.state().await, AuthState::Unauthenticated));
    }

    #[tokio::test]
    async fn test_new_challenge_keeps_current_token() {
        let api = Arc::new(MockApi::new());
        let session = session(api.clone());
        let current = session.token().await.unwrap();

        session.request_challenge().await.unwrap();
        assert!(matches!(session.state().await, AuthState::Authenticated(_)));
        assert_eq!(session.token().await.unwrap().value(), current.value());

        // A failed re-login leaves the working token in place
        assert!(session.verify("deadbeef").await.is_err());
        assert_eq!(session.token().await.unwrap().value(), current.value());
        assert_eq!(session.login_count(), 1);

        let challenge = session.request_challenge().await.unwrap();
        let signature = session.sign_challenge(&challenge).await.unwrap();
        let fresh = session.verify(&signature).await.unwrap();
        assert_ne!(fresh.value(), current.value());
        assert_eq!(session.token().await.unwrap().value(), fresh.value());
    }

    #[tokio::test]
    async fn test_verify_without_challenge_fails() {
        let api = Arc::new(MockApi::new());
        let session = session(api);
        assert!(session.verify("00").await.is_err());
    }

    #[tokio::test]
    async fn test_expired_challenge() {
        let api = Arc::new(MockApi::new().with_expired_challenges());
        let session = session(api);
        let challenge = session.request_challenge().await.unwrap();
        let signature = session.sign_challenge(&challenge).await.unwrap();
        assert!(matches!(
            session.verify(&signature).await.unwrap_err(),
            Error::ChallengeExpired
        ));
        assert!(matches!(session.state().await, AuthState::Unauthenticated));
    }

    #[tokio::test]
    async fn test_concurrent_token_requests_share_one_login() {
        let api = Arc::new(MockApi::new());
        let session = Arc::new(session(api.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let session = session.clone();
                tokio::spawn(async move { session.token().await.unwrap() })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            assert_eq!(result.unwrap().value(), "token-1");
        }
        assert_eq!(api.challenge_calls(), 1);
        assert_eq!(session.login_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_absent() {
        let expired = AuthToken::new("t".to_string(), Some(Utc::now() - chrono::Duration::seconds(1)));
        assert!(expired.is_expired(Utc::now()));
        let state = SessionState {
            token: Some(Arc::new(expired)),
            challenge: None,
        };
        assert!(state.valid_token().is_none());
        let open = AuthToken::new("t".to_string(), None);
        assert!(!open.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_with_reauth_retries_exactly_once() {
        let api = Arc::new(MockApi::new());
        let session = session(api.clone());
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = session
            .with_reauth(|_token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::AuthExpired) }
            })
            .await;

        assert!(matches!(result, Err(Error::AuthExpired)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(session.login_count(), 2);
    }

    #[tokio::test]
    async fn test_with_reauth_uses_fresh_token() {
        let api = Arc::new(MockApi::new());
        let session = session(api.clone());

        let result = session
            .with_reauth(|token| async move {
                if token.value() == "token-1" {
                    Err(Error::AuthExpired)
                } else {
                    Ok(token.value().to_string())
                }
            })
            .await
            .unwrap();
        assert_eq!(result, "token-2");
    }

    #[tokio::test]
    async fn test_invalidate_ignores_stale_token() {
        let api = Arc::new(MockApi::new());
        let session = session(api);
        let current = session.token().await.unwrap();
        let stale = AuthToken::new("old".to_string(), None);

        session.invalidate(&stale).await;
        assert_eq!(session.token().await.unwrap().value(), current.value());

        session.invalidate(&current).await;
        assert!(matches!(session.state().await, AuthState::Unauthenticated));
    }
}
