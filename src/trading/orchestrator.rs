//! Transaction orchestrator
//!
//! Every state-changing operation runs the same pipeline:
//!
//! ```text
//! Validate ──► Transfer ──► Sign ──► Submit ──► Interpret
//!  (policy,     (wallet,     (fresh   (once,     (accepted / rejected,
//!   balances,    sequential)  nonce)   one        stranded transfers
//!   auth token)                        re-auth)   to the ledger)
//! ```
//!
//! Nothing moves until validation has passed and a token is held. Once a
//! transfer has completed, every failure path accounts for it.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, info};

use super::clawback::{ClawbackCandidate, ClawbackLedger};
use super::outcome::{self, Settlement};
use crate::amm::price::BPS_DENOMINATOR;
use crate::api::{SettlementApi, SettlementResponse};
use crate::auth::AuthSession;
use crate::classifier::RecoveryStrategy;
use crate::error::{Error, Result};
use crate::intent::{sign_intent, Intent, IntentKind, Nonce};
use crate::policy::{PolicyCache, PolicySettings};
use crate::wallet::{AddressCodec, CompletedTransfer, Network, RawSigner, TransferExecutor, Wallet};

/// Trading defaults applied when a request leaves them out
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub default_max_slippage_bps: u32,
    pub integrator_public_key: Option<String>,
    pub integrator_fee_bps: Option<u32>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            default_max_slippage_bps: 100,
            integrator_public_key: None,
            integrator_fee_bps: None,
        }
    }
}

/// One leg of a multi-transfer deposit
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransferLeg<'a> {
    pub asset: &'a str,
    pub amount: u128,
    pub custody_public_key: &'a str,
}

/// Client-side orchestrator for gateway operations
pub struct Orchestrator {
    api: Arc<dyn SettlementApi>,
    signer: Arc<dyn RawSigner>,
    auth: Arc<AuthSession>,
    policy: Arc<PolicyCache>,
    transfers: TransferExecutor,
    ledger: Arc<ClawbackLedger>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn SettlementApi>,
        wallet: Arc<dyn Wallet>,
        codec: Arc<dyn AddressCodec>,
        signer: Arc<dyn RawSigner>,
        network: Network,
        policy_settings: PolicySettings,
        settings: OrchestratorSettings,
    ) -> Result<Self> {
        if settings.default_max_slippage_bps as u128 > BPS_DENOMINATOR {
            return Err(Error::InvalidConfiguration(format!(
                "default slippage {} bps exceeds 100%",
                settings.default_max_slippage_bps
            )));
        }
        if settings.integrator_fee_bps.is_some() && settings.integrator_public_key.is_none() {
            return Err(Error::InvalidConfiguration(
                "integrator fee set without an integrator public key".to_string(),
            ));
        }

        let auth = Arc::new(AuthSession::new(api.clone(), signer.clone()));
        let policy = Arc::new(PolicyCache::new(api.clone(), policy_settings));

        info!(
            public_key = %signer.public_key(),
            network = %network,
            "Orchestrator initialized"
        );

        Ok(Self {
            transfers: TransferExecutor::new(wallet, codec, network),
            ledger: Arc::new(ClawbackLedger::new()),
            api,
            signer,
            auth,
            policy,
            settings,
        })
    }

    pub fn user_public_key(&self) -> &str {
        self.signer.public_key()
    }

    pub fn api(&self) -> &Arc<dyn SettlementApi> {
        &self.api
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    pub fn policy(&self) -> &Arc<PolicyCache> {
        &self.policy
    }

    pub fn ledger(&self) -> &Arc<ClawbackLedger> {
        &self.ledger
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub(crate) fn transfers(&self) -> &TransferExecutor {
        &self.transfers
    }

    pub(crate) fn slippage_bps(&self, requested: Option<u32>) -> Result<u32> {
        let bps = requested.unwrap_or(self.settings.default_max_slippage_bps);
        if bps as u128 > BPS_DENOMINATOR {
            return Err(Error::InvalidParameter(format!(
                "slippage {} bps exceeds 100%",
                bps
            )));
        }
        Ok(bps)
    }

    /// Hold a valid token before anything irreversible happens
    pub(crate) async fn ensure_authenticated(&self) -> Result<()> {
        self.auth.token().await.map(|_| ())
    }

    /// Run transfers in order; a failure after the first strands the earlier ones
    pub(crate) async fn transfer_all(
        &self,
        kind: IntentKind,
        legs: &[TransferLeg<'_>],
    ) -> Result<Vec<CompletedTransfer>> {
        let mut completed: Vec<CompletedTransfer> = Vec::with_capacity(legs.len());

        for leg in legs {
            match self
                .transfers
                .send(leg.asset, leg.amount, leg.custody_public_key)
                .await
            {
                Ok(transfer) => completed.push(transfer),
                Err(e) if completed.is_empty() => return Err(e),
                Err(e) => {
                    let stranded = self.strand(kind, &completed, RecoveryStrategy::ClawbackRequired);
                    error!(
                        kind = %kind,
                        stranded = stranded.len(),
                        error = %e,
                        "Transfer failed after earlier transfers completed"
                    );
                    return Err(Error::TransferFailed {
                        message: e.to_string(),
                        stranded,
                    });
                }
            }
        }

        Ok(completed)
    }

    fn strand(
        &self,
        kind: IntentKind,
        transfers: &[CompletedTransfer],
        strategy: RecoveryStrategy,
    ) -> Vec<ClawbackCandidate> {
        transfers
            .iter()
            .map(|t| {
                let candidate = ClawbackCandidate::from_transfer(t, kind, strategy);
                self.ledger.record(candidate.clone());
                candidate
            })
            .collect()
    }

    /// Build, sign and submit with a fresh nonce per attempt; re-authenticates once
    pub(crate) async fn sign_and_submit<F>(
        &self,
        kind: IntentKind,
        build: F,
    ) -> Result<SettlementResponse>
    where
        F: Fn(Nonce) -> Result<Intent>,
    {
        let build = &build;
        let api = &self.api;
        let signer = &self.signer;

        self.auth
            .with_reauth(move |token| async move {
                let intent = build(Nonce::generate())?;
                if intent.kind() != kind {
                    return Err(Error::Internal(format!(
                        "built {} intent for {} operation",
                        intent.kind(),
                        kind
                    )));
                }
                let signed = sign_intent(intent, signer.as_ref()).await?;
                let response = api.submit(&signed, token.value()).await?;
                if response.requires_reauth() {
                    return Err(Error::AuthExpired);
                }
                Ok(response)
            })
            .await
    }

    /// Sign, submit and interpret, accounting for `transfers` on every path
    pub(crate) async fn settle<T, F>(
        &self,
        kind: IntentKind,
        transfers: Vec<CompletedTransfer>,
        build: F,
    ) -> Result<Settlement<T>>
    where
        T: DeserializeOwned,
        F: Fn(Nonce) -> Result<Intent>,
    {
        match self.sign_and_submit(kind, build).await {
            Ok(response) => outcome::interpret(kind, response, transfers, &self.ledger),
            Err(Error::Remote(body)) => outcome::interpret(
                kind,
                SettlementResponse::rejected(*body, None),
                transfers,
                &self.ledger,
            ),
            Err(e) if transfers.is_empty() => Err(e),
            Err(e) => {
                let stranded = self.strand(kind, &transfers, RecoveryStrategy::ClawbackRecommended);
                error!(
                    kind = %kind,
                    stranded = stranded.len(),
                    error = %e,
                    "Submit failed after funds moved"
                );
                Err(Error::SubmitFailed {
                    message: e.to_string(),
                    stranded,
                })
            }
        }
    }
}
