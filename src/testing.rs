//! In-memory collaborators for unit tests
//!
//! `MockApi` answers every settlement endpoint from local state and a queue
//! of scripted submit outcomes. `MockWallet` records transfers instead of
//! moving funds. Both count calls so tests can assert single-flight and
//! fail-closed behavior.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::amm::Pool;
use crate::api::{
    AddLiquiditySimulation, AddLiquiditySimulationRequest, AllowedAssets, AuthChallenge,
    AuthGrant, ClawbackEligibility, ErrorBody, Escrow, FeatureFlags, MinAmounts,
    RefundDetails, RemoveLiquiditySimulation, RemoveLiquiditySimulationRequest, RouteSimulation,
    RouteSimulationRequest, SettlementApi, SettlementResponse, SwapSimulation,
    SwapSimulationRequest,
};
use crate::error::{Error, Result};
use crate::intent::{IntentKind, SignedIntent};
use crate::policy::PolicySettings;
use crate::trading::{Orchestrator, OrchestratorSettings};
use crate::wallet::{
    AddressCodec, DecodedId, Network, RawSigner, Wallet, WalletBalance, WalletIdentity,
    NATIVE_ASSET_ADDRESS,
};

pub(crate) const NATIVE: &str = NATIVE_ASSET_ADDRESS;

/// Balance the harness wallet holds of every asset it knows
pub(crate) const FUNDED: u128 = 1_000_000_000_000;

const FEATURE_FLAGS: &[&str] = &[
    "allow_swaps",
    "allow_route_swaps",
    "allow_add_liquidity",
    "allow_withdraw_liquidity",
    "allow_pool_creation",
    "allow_escrow",
    "allow_withdraw_fees",
];

pub(crate) fn error_body(code: &str) -> ErrorBody {
    ErrorBody {
        error_code: code.to_string(),
        error_category: None,
        message: format!("{} raised by mock", code),
        request_id: Some("req-mock".to_string()),
        timestamp: None,
        service: None,
        severity: None,
        remediation: None,
    }
}

// Signer / codec

pub(crate) struct FakeSigner {
    public_key: String,
    messages: Mutex<Vec<Vec<u8>>>,
}

impl FakeSigner {
    pub(crate) fn new(public_key: &str) -> Self {
        Self {
            public_key: public_key.to_string(),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Deterministic stand-in signature
    pub(crate) fn sign(message: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(b"fake-signature:");
        hasher.update(message);
        hasher.finalize().to_vec()
    }

    pub(crate) fn messages(&self) -> Vec<Vec<u8>> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl RawSigner for FakeSigner {
    fn public_key(&self) -> &str {
        &self.public_key
    }

    async fn sign_raw_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.messages.lock().unwrap().push(message.to_vec());
        Ok(Self::sign(message))
    }
}

/// Encodes as `<network>1:<raw>`
pub(crate) struct PrefixCodec;

impl AddressCodec for PrefixCodec {
    fn encode(&self, raw_id: &str, network: Network) -> Result<String> {
        Ok(format!("{}1:{}", network, raw_id))
    }

    fn decode(&self, human_readable_id: &str, network: Network) -> Result<DecodedId> {
        let prefix = format!("{}1:", network);
        human_readable_id
            .strip_prefix(&prefix)
            .map(|raw| DecodedId {
                raw_id: raw.to_string(),
                network,
            })
            .ok_or_else(|| Error::Codec(format!("{} is not a {} id", human_readable_id, network)))
    }
}

// Wallet

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransferCall {
    pub transfer_id: String,
    /// `None` for native transfers
    pub token_id: Option<String>,
    pub amount: u128,
    pub recipient: String,
}

pub(crate) struct MockWallet {
    public_key: String,
    balance: WalletBalance,
    transfers: Mutex<Vec<TransferCall>>,
    transfer_calls: AtomicUsize,
    fail_on: AtomicUsize,
    signed: AtomicUsize,
}

impl MockWallet {
    pub(crate) fn new(public_key: &str) -> Self {
        Self {
            public_key: public_key.to_string(),
            balance: WalletBalance::default(),
            transfers: Mutex::new(Vec::new()),
            transfer_calls: AtomicUsize::new(0),
            fail_on: AtomicUsize::new(0),
            signed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_native(mut self, amount: u128) -> Self {
        self.balance.native_balance = amount;
        self
    }

    pub(crate) fn with_token(mut self, token_id: &str, amount: u128) -> Self {
        self.balance.token_balances.insert(token_id.to_string(), amount);
        self
    }

    /// Make the `n`th transfer call (1-based) fail
    pub(crate) fn fail_transfer_number(&self, n: usize) {
        self.fail_on.store(n, Ordering::SeqCst);
    }

    /// Successful transfers, in call order
    pub(crate) fn transfers(&self) -> Vec<TransferCall> {
        self.transfers.lock().unwrap().clone()
    }

    pub(crate) fn signed_messages(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }

    fn record(&self, token_id: Option<&str>, amount: u128, recipient: &str) -> Result<String> {
        let call = self.transfer_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on.load(Ordering::SeqCst) {
            return Err(Error::Wallet(format!("transfer {} refused", call)));
        }
        let transfer_id = format!("tx-{}", call);
        self.transfers.lock().unwrap().push(TransferCall {
            transfer_id: transfer_id.clone(),
            token_id: token_id.map(str::to_string),
            amount,
            recipient: recipient.to_string(),
        });
        Ok(transfer_id)
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn get_balance(&self) -> Result<WalletBalance> {
        Ok(self.balance.clone())
    }

    async fn transfer(&self, amount: u128, recipient_address: &str) -> Result<String> {
        self.record(None, amount, recipient_address)
    }

    async fn transfer_token(
        &self,
        token_id: &str,
        amount: u128,
        recipient_address: &str,
    ) -> Result<String> {
        self.record(Some(token_id), amount, recipient_address)
    }

    async fn sign_raw_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSigner::sign(message))
    }

    async fn identity(&self) -> Result<WalletIdentity> {
        Ok(WalletIdentity {
            public_key: self.public_key.clone(),
            address: format!("regtest1:{}", self.public_key),
        })
    }
}

// Settlement API

/// Scripted outcome of the next submit call
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Accept(serde_json::Value),
    Reject {
        code: &'static str,
        refunded: Option<Vec<String>>,
    },
    /// Connection-level failure
    Transport,
    /// Structured error body on a non-2xx status
    Remote(&'static str),
}

impl Scripted {
    pub(crate) fn accept(payload: serde_json::Value) -> Self {
        Scripted::Accept(payload)
    }

    pub(crate) fn reject(code: &'static str, refunded: Option<&[&str]>) -> Self {
        Scripted::Reject {
            code,
            refunded: refunded.map(|ids| ids.iter().map(|id| id.to_string()).collect()),
        }
    }
}

/// One recorded submit call
#[derive(Debug, Clone)]
pub(crate) struct Submitted {
    pub kind: IntentKind,
    pub body: serde_json::Value,
    pub token: String,
}

#[derive(Default)]
struct ApiState {
    flags: HashMap<String, bool>,
    min_amounts: HashMap<String, u128>,
    allowed_assets: Vec<String>,
    pools: HashMap<String, Pool>,
    escrows: HashMap<String, Escrow>,
    eligibility: HashMap<String, bool>,
    challenges: HashMap<String, String>,
    script: VecDeque<Scripted>,
    submitted: Vec<Submitted>,
    swap_out: u128,
    route_out: u128,
    /// Flag change applied right after the next submit
    flag_after_submit: Option<(String, bool)>,
}

pub(crate) struct MockApi {
    state: Mutex<ApiState>,
    expired_challenges: bool,
    ping_failure: bool,
    slow_config: bool,
    challenge_calls: AtomicUsize,
    tokens_issued: AtomicUsize,
    ping_calls: AtomicUsize,
    feature_status_calls: AtomicUsize,
}

impl MockApi {
    /// Every feature enabled, master switch absent
    pub(crate) fn new() -> Self {
        let state = ApiState {
            flags: FEATURE_FLAGS.iter().map(|f| (f.to_string(), true)).collect(),
            swap_out: 10_000,
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            expired_challenges: false,
            ping_failure: false,
            slow_config: false,
            challenge_calls: AtomicUsize::new(0),
            tokens_issued: AtomicUsize::new(0),
            ping_calls: AtomicUsize::new(0),
            feature_status_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_flag(self, name: &str, enabled: bool) -> Self {
        self.state.lock().unwrap().flags.insert(name.to_string(), enabled);
        self
    }

    pub(crate) fn with_only_flags(self, flags: &[(&str, bool)]) -> Self {
        self.set_only_flags(flags);
        self
    }

    pub(crate) fn with_min_amount(self, asset: &str, amount: u128) -> Self {
        self.set_min_amount(asset, amount);
        self
    }

    pub(crate) fn with_allowed_assets(self, assets: &[&str]) -> Self {
        self.set_allowed_assets(assets);
        self
    }

    pub(crate) fn with_expired_challenges(mut self) -> Self {
        self.expired_challenges = true;
        self
    }

    pub(crate) fn with_ping_failure(mut self) -> Self {
        self.ping_failure = true;
        self
    }

    /// Feature-status responses take ~20ms
    pub(crate) fn with_slow_config(mut self) -> Self {
        self.slow_config = true;
        self
    }

    pub(crate) fn set_only_flags(&self, flags: &[(&str, bool)]) {
        self.state.lock().unwrap().flags =
            flags.iter().map(|(name, on)| (name.to_string(), *on)).collect();
    }

    pub(crate) fn set_min_amount(&self, asset: &str, amount: u128) {
        self.state.lock().unwrap().min_amounts.insert(asset.to_string(), amount);
    }

    pub(crate) fn set_allowed_assets(&self, assets: &[&str]) {
        self.state.lock().unwrap().allowed_assets = assets.iter().map(|a| a.to_string()).collect();
    }

    pub(crate) fn set_flag_after_next_submit(&self, name: &str, enabled: bool) {
        self.state.lock().unwrap().flag_after_submit = Some((name.to_string(), enabled));
    }

    pub(crate) fn set_eligibility(&self, transfer_id: &str, eligible: bool) {
        self.state
            .lock()
            .unwrap()
            .eligibility
            .insert(transfer_id.to_string(), eligible);
    }

    pub(crate) fn set_swap_simulation(&self, amount_out: u128) {
        self.state.lock().unwrap().swap_out = amount_out;
    }

    pub(crate) fn set_route_simulation(&self, amount_out: u128) {
        self.state.lock().unwrap().route_out = amount_out;
    }

    pub(crate) fn add_pool(&self, pool: Pool) {
        self.state.lock().unwrap().pools.insert(pool.pool_id.clone(), pool);
    }

    pub(crate) fn add_escrow(&self, escrow: Escrow) {
        self.state
            .lock()
            .unwrap()
            .escrows
            .insert(escrow.escrow_id.clone(), escrow);
    }

    /// Queue the outcome of the next submit; unscripted submits are accepted
    pub(crate) fn script(&self, outcome: Scripted) {
        self.state.lock().unwrap().script.push_back(outcome);
    }

    pub(crate) fn submitted(&self) -> Vec<Submitted> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub(crate) fn challenge_calls(&self) -> usize {
        self.challenge_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn ping_calls(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn feature_status_calls(&self) -> usize {
        self.feature_status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettlementApi for MockApi {
    async fn auth_challenge(&self, public_key: &str) -> Result<AuthChallenge> {
        let n = self.challenge_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let challenge = format!("sign-in {} #{}", public_key, n);
        let session_id = format!("session-{}", n);
        self.state
            .lock()
            .unwrap()
            .challenges
            .insert(session_id.clone(), challenge.clone());

        let expires_at = if self.expired_challenges {
            Utc::now() - ChronoDuration::seconds(1)
        } else {
            Utc::now() + ChronoDuration::seconds(60)
        };
        Ok(AuthChallenge {
            challenge,
            session_id: Some(session_id),
            expires_at: Some(expires_at),
        })
    }

    async fn auth_verify(
        &self,
        _public_key: &str,
        signature_hex: &str,
        session_id: Option<&str>,
    ) -> Result<AuthGrant> {
        let challenge = session_id
            .and_then(|id| self.state.lock().unwrap().challenges.get(id).cloned())
            .ok_or_else(|| Error::Remote(Box::new(error_body("AMM-2103"))))?;
        if signature_hex != hex::encode(FakeSigner::sign(challenge.as_bytes())) {
            return Err(Error::Remote(Box::new(error_body("AMM-2001"))));
        }
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AuthGrant {
            access_token: format!("token-{}", n),
            expires_at: Some(Utc::now() + ChronoDuration::minutes(15)),
        })
    }

    async fn get_pool(&self, pool_id: &str) -> Result<Pool> {
        self.state
            .lock()
            .unwrap()
            .pools
            .get(pool_id)
            .cloned()
            .ok_or_else(|| Error::Remote(Box::new(error_body("AMM-1004"))))
    }

    async fn list_pools(&self) -> Result<Vec<Pool>> {
        Ok(self.state.lock().unwrap().pools.values().cloned().collect())
    }

    async fn get_escrow(&self, escrow_id: &str, _token: &str) -> Result<Escrow> {
        self.state
            .lock()
            .unwrap()
            .escrows
            .get(escrow_id)
            .cloned()
            .ok_or_else(|| Error::Remote(Box::new(error_body("AMM-1001"))))
    }

    async fn check_clawback_eligibility(
        &self,
        transfer_id: &str,
        _token: &str,
    ) -> Result<ClawbackEligibility> {
        let eligible = self
            .state
            .lock()
            .unwrap()
            .eligibility
            .get(transfer_id)
            .copied()
            .unwrap_or(false);
        Ok(ClawbackEligibility {
            eligible,
            reason: (!eligible).then(|| "transfer unknown or already settled".to_string()),
        })
    }

    async fn simulate_swap(&self, _request: &SwapSimulationRequest) -> Result<SwapSimulation> {
        Ok(SwapSimulation {
            amount_out: self.state.lock().unwrap().swap_out,
            price_impact_bps: Some(12),
            execution_price: Some("0.05".to_string()),
        })
    }

    async fn simulate_route_swap(
        &self,
        _request: &RouteSimulationRequest,
    ) -> Result<RouteSimulation> {
        Ok(RouteSimulation {
            amount_out: self.state.lock().unwrap().route_out,
            price_impact_bps: None,
        })
    }

    async fn simulate_add_liquidity(
        &self,
        request: &AddLiquiditySimulationRequest,
    ) -> Result<AddLiquiditySimulation> {
        Ok(AddLiquiditySimulation {
            lp_tokens_minted: request.asset_a_amount.min(request.asset_b_amount),
            asset_a_used: request.asset_a_amount,
            asset_b_used: request.asset_b_amount,
        })
    }

    async fn simulate_remove_liquidity(
        &self,
        request: &RemoveLiquiditySimulationRequest,
    ) -> Result<RemoveLiquiditySimulation> {
        Ok(RemoveLiquiditySimulation {
            asset_a_amount: request.lp_tokens_to_remove,
            asset_b_amount: request.lp_tokens_to_remove / 2,
        })
    }

    async fn submit(&self, intent: &SignedIntent, token: &str) -> Result<SettlementResponse> {
        let body: serde_json::Value = serde_json::from_str(&intent.request_body()?)?;
        let next = {
            let mut state = self.state.lock().unwrap();
            state.submitted.push(Submitted {
                kind: intent.kind(),
                body,
                token: token.to_string(),
            });
            if let Some((name, enabled)) = state.flag_after_submit.take() {
                state.flags.insert(name, enabled);
            }
            state.script.pop_front()
        };

        match next.unwrap_or_else(|| Scripted::accept(serde_json::json!({}))) {
            Scripted::Accept(payload) => Ok(SettlementResponse::accepted(payload)),
            Scripted::Reject { code, refunded } => Ok(SettlementResponse::rejected(
                error_body(code),
                refunded.map(|ids| RefundDetails {
                    refunded_transfer_ids: ids,
                    ..Default::default()
                }),
            )),
            Scripted::Transport => Err(Error::Transport("connection reset by mock".to_string())),
            Scripted::Remote(code) => Err(Error::Remote(Box::new(error_body(code)))),
        }
    }

    async fn feature_status(&self) -> Result<FeatureFlags> {
        self.feature_status_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_config {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(FeatureFlags(self.state.lock().unwrap().flags.clone()))
    }

    async fn min_amounts(&self) -> Result<MinAmounts> {
        Ok(MinAmounts(self.state.lock().unwrap().min_amounts.clone()))
    }

    async fn allowed_assets(&self) -> Result<AllowedAssets> {
        Ok(AllowedAssets(self.state.lock().unwrap().allowed_assets.clone()))
    }

    async fn ping(&self) -> Result<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        if self.ping_failure {
            Err(Error::Transport("ping refused by mock".to_string()))
        } else {
            Ok(())
        }
    }
}

// Harness

pub(crate) struct Harness {
    pub api: Arc<MockApi>,
    pub wallet: Arc<MockWallet>,
    pub orchestrator: Orchestrator,
}

/// Orchestrator over mocks, signing as `02user` on regtest
pub(crate) fn harness() -> Harness {
    harness_with_policy(PolicySettings::default())
}

pub(crate) fn harness_with_policy(policy: PolicySettings) -> Harness {
    let api = Arc::new(MockApi::new());
    let wallet = Arc::new(
        MockWallet::new("02user")
            .with_native(FUNDED)
            .with_token("regtest1:token-a", FUNDED)
            .with_token("regtest1:token-b", FUNDED),
    );
    let orchestrator = Orchestrator::new(
        api.clone(),
        wallet.clone(),
        Arc::new(PrefixCodec),
        Arc::new(FakeSigner::new("02user")),
        Network::Regtest,
        policy,
        OrchestratorSettings::default(),
    )
    .unwrap();

    Harness {
        api,
        wallet,
        orchestrator,
    }
}
