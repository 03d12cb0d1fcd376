//! Unforgeable operation handles.
//!
//! Capabilities are minted exactly once, by the treasury that they bind to,
//! and are deliberately neither `Clone` nor serializable: holding the value
//! is the proof. Verification is treasury-id equality. If callers ever cross
//! a network boundary, a session-bound or signed representation has to be
//! layered on top; in-process, the type system is the fence.

use coffer_types::{AgentId, TreasuryId};

/// Handle proving the right to call admin-scoped operations (allocate,
/// freeze, unfreeze, sweep) on one treasury instance.
#[derive(Debug)]
pub struct AdminCapability {
    treasury: TreasuryId,
}

impl AdminCapability {
    pub(crate) fn mint(treasury: TreasuryId) -> Self {
        Self { treasury }
    }

    pub fn treasury(&self) -> TreasuryId {
        self.treasury
    }
}

/// Handle proving an agent's right to request transfers against its
/// allocation.
///
/// The capability's expiry and the allocation's expiry are separate
/// lifecycles. They are minted equal, but a transfer is checked against the
/// capability window.
#[derive(Debug)]
pub struct AgentCapability {
    treasury: TreasuryId,
    agent: AgentId,
    max_amount: u64,
    expires_at_ms: u64,
}

impl AgentCapability {
    pub(crate) fn mint(
        treasury: TreasuryId,
        agent: AgentId,
        max_amount: u64,
        expires_at_ms: u64,
    ) -> Self {
        Self {
            treasury,
            agent,
            max_amount,
            expires_at_ms,
        }
    }

    pub fn treasury(&self) -> TreasuryId {
        self.treasury
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn max_amount(&self) -> u64 {
        self.max_amount
    }

    pub fn expires_at_ms(&self) -> u64 {
        self.expires_at_ms
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at_ms
    }
}
