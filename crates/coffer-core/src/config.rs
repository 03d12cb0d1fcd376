use crate::error::TreasuryError;
use coffer_types::{Address, RouteInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Length of the rolling allocation window. Reset is lazy: it happens inside
/// the next `allocate` call, never on a timer.
pub const DAILY_WINDOW_MS: u64 = 86_400_000;

/// Lifetime recorded on a pending approval at open time. The approval path
/// itself never reads it; only the explicit maintenance sweep does.
pub const APPROVAL_TTL_MS: u64 = 86_400_000;

/// Hot-route amount used when a config does not override it. Reporting data
/// only: routing never consults it.
pub const DEFAULT_HOT_AMOUNT: u64 = 10_000;

/// Construction-time policy for one treasury instance.
///
/// Validation runs once, at `Treasury::initialize`. None of these fields are
/// re-validated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreasuryConfig {
    pub admin: Address,
    pub cold_address: Address,
    pub hot_address: Address,
    /// Transfers at or above this amount require quorum instead of executing
    /// immediately. The only amount the routing decision looks at.
    pub approval_threshold: u64,
    /// Hot-route amount, surfaced via `RouteInfo` for reporting. Must stay
    /// strictly below `approval_threshold`; routing ignores it.
    pub hot_amount: u64,
    /// Cap on total allocation issuance per rolling 24h window.
    pub daily_limit: u64,
    /// Identities allowed to sign pending approvals.
    pub signers: BTreeSet<Address>,
    /// Distinct signatures required to execute a pending transfer.
    pub required_signatures: u8,
}

impl TreasuryConfig {
    pub fn new(
        admin: Address,
        cold_address: Address,
        hot_address: Address,
        approval_threshold: u64,
        daily_limit: u64,
        signers: impl IntoIterator<Item = Address>,
        required_signatures: u8,
    ) -> Self {
        Self {
            admin,
            cold_address,
            hot_address,
            approval_threshold,
            hot_amount: DEFAULT_HOT_AMOUNT,
            daily_limit,
            signers: signers.into_iter().collect(),
            required_signatures,
        }
    }

    pub fn with_hot_amount(mut self, hot_amount: u64) -> Self {
        self.hot_amount = hot_amount;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), TreasuryError> {
        if self.approval_threshold <= self.hot_amount {
            return Err(TreasuryError::InvalidThreshold(format!(
                "approval threshold {} must exceed hot amount {}",
                self.approval_threshold, self.hot_amount
            )));
        }
        if self.required_signatures == 0 {
            return Err(TreasuryError::InvalidThreshold(
                "required signatures must be at least 1".to_string(),
            ));
        }
        if usize::from(self.required_signatures) > self.signers.len() {
            return Err(TreasuryError::InvalidThreshold(format!(
                "required signatures {} exceeds signer set size {}",
                self.required_signatures,
                self.signers.len()
            )));
        }
        Ok(())
    }

    /// Routing decision for a transfer amount. Two tiers only: the hot amount
    /// plays no part here.
    pub(crate) fn route(&self, amount: u64) -> Route {
        if amount >= self.approval_threshold {
            Route::Quorum
        } else {
            Route::Immediate
        }
    }

    pub(crate) fn route_info(&self) -> RouteInfo {
        RouteInfo {
            cold_address: self.cold_address.clone(),
            hot_address: self.hot_address.clone(),
            hot_amount: self.hot_amount,
            approval_threshold: self.approval_threshold,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Route {
    Immediate,
    Quorum,
}
