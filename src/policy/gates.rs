//! Policy gates
//!
//! Preflight checks that must pass before any funds move. Every check reads
//! through a [`TtlCell`], so policy is at most one TTL old and concurrent
//! operations share refreshes.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::cache::TtlCell;
use crate::amm::price::apply_bps;
use crate::api::{AllowedAssets, FeatureFlags, MinAmounts, PingOutcome, SettlementApi};
use crate::error::{Error, Result};
use crate::intent::IntentKind;

/// Flag that, when on, disables every operation including clawback
pub const MASTER_KILL_SWITCH: &str = "master_kill_switch";

/// Cache TTLs and thresholds
#[derive(Debug, Clone)]
pub struct PolicySettings {
    pub feature_flags_ttl: Duration,
    pub min_amounts_ttl: Duration,
    pub allowed_assets_ttl: Duration,
    pub ping_ttl: Duration,
    /// Fraction of the input minimum enforced on outputs, in basis points
    pub output_min_relaxation_bps: u32,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            feature_flags_ttl: Duration::from_secs(5),
            min_amounts_ttl: Duration::from_secs(5),
            allowed_assets_ttl: Duration::from_secs(60),
            ping_ttl: Duration::from_secs(2),
            output_min_relaxation_bps: 5_000,
        }
    }
}

/// Which side of a trade an amount is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSide {
    Input,
    Output,
}

/// Live server policy
pub struct PolicyCache {
    api: Arc<dyn SettlementApi>,
    settings: PolicySettings,
    feature_flags: TtlCell<FeatureFlags>,
    min_amounts: TtlCell<MinAmounts>,
    allowed_assets: TtlCell<AllowedAssets>,
    ping: TtlCell<PingOutcome>,
}

impl PolicyCache {
    pub fn new(api: Arc<dyn SettlementApi>, settings: PolicySettings) -> Self {
        Self {
            feature_flags: TtlCell::new("feature_flags", settings.feature_flags_ttl),
            min_amounts: TtlCell::new("min_amounts", settings.min_amounts_ttl),
            allowed_assets: TtlCell::new("allowed_assets", settings.allowed_assets_ttl),
            ping: TtlCell::new("ping", settings.ping_ttl),
            api,
            settings,
        }
    }

    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    pub async fn feature_flags(&self) -> Result<Arc<FeatureFlags>> {
        self.feature_flags
            .get_or_refresh(|| self.api.feature_status())
            .await
    }

    pub async fn min_amounts(&self) -> Result<Arc<MinAmounts>> {
        self.min_amounts.get_or_refresh(|| self.api.min_amounts()).await
    }

    pub async fn allowed_assets(&self) -> Result<Arc<AllowedAssets>> {
        self.allowed_assets
            .get_or_refresh(|| self.api.allowed_assets())
            .await
    }

    /// Last liveness check; a failed check is cached like a successful one
    pub async fn ping(&self) -> Result<Arc<PingOutcome>> {
        self.ping
            .get_or_refresh(|| async {
                let outcome = match self.api.ping().await {
                    Ok(()) => PingOutcome {
                        live: true,
                        checked_at: Utc::now(),
                        error: None,
                    },
                    Err(e) => {
                        warn!(error = %e, "Settlement service ping failed");
                        PingOutcome {
                            live: false,
                            checked_at: Utc::now(),
                            error: Some(e.to_string()),
                        }
                    }
                };
                Ok(outcome)
            })
            .await
    }

    /// Fail unless the master switch is off and the operation's flag is on
    pub async fn ensure_operation_allowed(&self, kind: IntentKind) -> Result<()> {
        let flags = self.feature_flags().await?;
        if flags.is_enabled(MASTER_KILL_SWITCH) {
            warn!(kind = %kind, "Operation blocked by master kill-switch");
            return Err(Error::ServiceDisabled);
        }
        if let Some(feature) = kind.feature_flag() {
            if !flags.is_enabled(feature) {
                return Err(Error::FeatureDisabled {
                    feature: feature.to_string(),
                });
            }
        }
        debug!(kind = %kind, "Operation allowed");
        Ok(())
    }

    /// Fail if `amount` is below the asset's minimum for this side
    pub async fn assert_meets_min_amount(
        &self,
        asset: &str,
        amount: u128,
        side: AmountSide,
    ) -> Result<()> {
        let mins = self.min_amounts().await?;
        let Some(minimum) = mins.get(asset) else {
            return Ok(());
        };
        let minimum = match side {
            AmountSide::Input => minimum,
            AmountSide::Output => apply_bps(minimum, self.settings.output_min_relaxation_bps)?,
        };
        if amount < minimum {
            return Err(Error::BelowMinimum {
                asset: asset.to_string(),
                amount,
                minimum,
            });
        }
        Ok(())
    }

    /// Fail unless `asset` may be the Asset-B side of a new pool
    pub async fn assert_asset_allowed_for_pool_creation(&self, asset: &str) -> Result<()> {
        let allowed = self.allowed_assets().await?;
        if allowed.allows(asset) {
            Ok(())
        } else {
            Err(Error::AssetNotAllowed(asset.to_string()))
        }
    }

    pub async fn ensure_service_live(&self) -> Result<()> {
        let ping = self.ping().await?;
        if ping.live {
            Ok(())
        } else {
            Err(Error::ServiceUnavailable(
                ping.error.clone().unwrap_or_else(|| "ping failed".to_string()),
            ))
        }
    }

    /// Liveness plus operation gate
    pub async fn preflight(&self, kind: IntentKind) -> Result<()> {
        self.ensure_service_live().await?;
        self.ensure_operation_allowed(kind).await
    }
}
