//! HTTP implementation of the settlement API
//!
//! Read-only calls (pool/escrow lookups, simulations, config, ping) retry
//! transient transport failures with exponential backoff. Submissions are
//! sent exactly once.

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::*;
use super::SettlementApi;
use crate::amm::Pool;
use crate::error::{Error, Result};
use crate::intent::SignedIntent;

/// Path prefix of every versioned endpoint
pub const API_VERSION_PREFIX: &str = "v1";

/// Transport settings for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Total time budget for retrying a read-only call
    pub read_retry_max_elapsed: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            read_retry_max_elapsed: Duration::from_secs(5),
        }
    }
}

/// reqwest-backed settlement API client
pub struct HttpClient {
    client: Client,
    base_url: String,
    settings: HttpSettings,
}

impl HttpClient {
    pub fn new(base_url: &str, settings: HttpSettings) -> Result<Self> {
        if base_url.is_empty() {
            return Err(Error::Config("settlement API base URL is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!(base_url = %base_url, "Settlement API client ready");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_VERSION_PREFIX, path)
    }

    fn read_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(1_000),
            max_elapsed_time: Some(self.settings.read_retry_max_elapsed),
            ..Default::default()
        }
    }

    fn with_token(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Run a read-only request with retry on transient failures
    async fn read<T, F, Fut>(&self, path: &str, attempt: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let attempt = &attempt;
        retry(self.read_backoff(), || async move {
            match attempt().await {
                Ok(value) => Ok(value),
                Err(e @ Error::Transport(_)) | Err(e @ Error::ServiceUnavailable(_)) => {
                    warn!(path = %path, error = %e, "Retryable read failure");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    async fn get_once<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        let builder = Self::with_token(self.client.get(self.url(path)), token);
        let response = builder.send().await?;
        decode(path, response).await
    }

    async fn post_once<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T> {
        let builder = Self::with_token(self.client.post(self.url(path)).json(body), token);
        let response = builder.send().await?;
        decode(path, response).await
    }
}

/// Map an HTTP response to a typed body or a structured error
async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| {
            Error::Deserialization(format!("Failed to parse {} response: {}", path, e))
        });
    }

    Err(error_from_status(path, status, &text))
}

fn error_from_status(path: &str, status: StatusCode, text: &str) -> Error {
    if status == StatusCode::UNAUTHORIZED {
        return Error::AuthExpired;
    }
    if let Ok(body) = serde_json::from_str::<ErrorBody>(text) {
        if body.requires_reauth() {
            return Error::AuthExpired;
        }
        return Error::Remote(Box::new(body));
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Error::Transport(format!("{} returned HTTP {}", path, status));
    }
    Error::Protocol(format!("{} returned HTTP {}: {}", path, status, text))
}

#[async_trait]
impl SettlementApi for HttpClient {
    async fn auth_challenge(&self, public_key: &str) -> Result<AuthChallenge> {
        let request = ChallengeRequest { public_key };
        self.post_once("auth/challenge", &request, None).await
    }

    async fn auth_verify(
        &self,
        public_key: &str,
        signature_hex: &str,
        session_id: Option<&str>,
    ) -> Result<AuthGrant> {
        let request = VerifyRequest {
            public_key,
            signature: signature_hex,
            session_id,
        };
        self.post_once("auth/verify", &request, None).await
    }

    async fn get_pool(&self, pool_id: &str) -> Result<Pool> {
        let path = format!("pools/{}", pool_id);
        self.read(&path, || self.get_once(&path, None)).await
    }

    async fn list_pools(&self) -> Result<Vec<Pool>> {
        self.read("pools", || self.get_once("pools", None)).await
    }

    async fn get_escrow(&self, escrow_id: &str, token: &str) -> Result<Escrow> {
        let path = format!("escrow/{}", escrow_id);
        self.read(&path, || self.get_once(&path, Some(token))).await
    }

    async fn check_clawback_eligibility(
        &self,
        transfer_id: &str,
        token: &str,
    ) -> Result<ClawbackEligibility> {
        let request = ClawbackEligibilityRequest { transfer_id };
        let path = "clawback/check-eligibility";
        self.read(path, || self.post_once(path, &request, Some(token)))
            .await
    }

    async fn simulate_swap(&self, request: &SwapSimulationRequest) -> Result<SwapSimulation> {
        let path = "swap/simulate";
        self.read(path, || self.post_once(path, request, None)).await
    }

    async fn simulate_route_swap(
        &self,
        request: &RouteSimulationRequest,
    ) -> Result<RouteSimulation> {
        let path = "route-swap/simulate";
        self.read(path, || self.post_once(path, request, None)).await
    }

    async fn simulate_add_liquidity(
        &self,
        request: &AddLiquiditySimulationRequest,
    ) -> Result<AddLiquiditySimulation> {
        let path = "liquidity/add/simulate";
        self.read(path, || self.post_once(path, request, None)).await
    }

    async fn simulate_remove_liquidity(
        &self,
        request: &RemoveLiquiditySimulationRequest,
    ) -> Result<RemoveLiquiditySimulation> {
        let path = "liquidity/remove/simulate";
        self.read(path, || self.post_once(path, request, None)).await
    }

    async fn submit(&self, intent: &SignedIntent, token: &str) -> Result<SettlementResponse> {
        let path = intent.kind().endpoint();
        let body = intent.request_body()?;

        info!(kind = %intent.kind(), nonce = %intent.nonce(), "Submitting signed intent");

        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(path = %path, status = %status, "Settlement response");

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::AuthExpired);
        }
        // Rejections may arrive with a 4xx status but still carry `accepted`
        if let Ok(parsed) = serde_json::from_str::<SettlementResponse>(&text) {
            return Ok(parsed);
        }
        if status.is_success() {
            return Err(Error::Deserialization(format!(
                "{} response is missing the accepted flag",
                path
            )));
        }
        Err(error_from_status(path, status, &text))
    }

    async fn feature_status(&self) -> Result<FeatureFlags> {
        let path = "config/feature-status";
        self.read(path, || self.get_once(path, None)).await
    }

    async fn min_amounts(&self) -> Result<MinAmounts> {
        let path = "config/min-amounts";
        let entries: Vec<MinAmountEntry> =
            self.read(path, || self.get_once(path, None)).await?;
        Ok(MinAmounts::from_entries(entries))
    }

    async fn allowed_assets(&self) -> Result<AllowedAssets> {
        let path = "config/allowed-assets";
        self.read(path, || self.get_once(path, None)).await
    }

    async fn ping(&self) -> Result<()> {
        let path = "ping";
        let _: serde_json::Value = self.read(path, || self.get_once(path, None)).await?;
        Ok(())
    }
}
