//! Coffer Types - shared data model for the treasury authorization engine
//!
//! Identity newtypes, the per-agent allocation record, the pending quorum
//! record, and the event surface consumed by external audit sinks.

#![deny(unsafe_code)]

pub mod event;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use event::{EventSink, MemoryEventSink, NullEventSink, TransferMode, TreasuryEvent};

/// Identity of one treasury instance.
///
/// Capability verification is equality on this id: a handle minted by one
/// treasury is worthless against every other instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreasuryId(pub uuid::Uuid);

impl TreasuryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for TreasuryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a spending agent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account-style identity: admin, signer, route, or transfer recipient.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a pending multi-party approval.
///
/// Strictly increasing per treasury; an id is never reused once its approval
/// executes or is swept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApprovalId(pub u64);

impl std::fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Security tier assigned to an allocation (levels 0 through 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityTier {
    Basic,
    Standard,
    Elevated,
    Critical,
}

impl SecurityTier {
    pub fn level(&self) -> u8 {
        match self {
            SecurityTier::Basic => 0,
            SecurityTier::Standard => 1,
            SecurityTier::Elevated => 2,
            SecurityTier::Critical => 3,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(SecurityTier::Basic),
            1 => Some(SecurityTier::Standard),
            2 => Some(SecurityTier::Elevated),
            3 => Some(SecurityTier::Critical),
            _ => None,
        }
    }
}

/// Per-agent budget record.
///
/// At most one live allocation exists per agent id; inserting a second fails
/// rather than replacing. On the immediate transfer path the engine maintains
/// `spent <= allocated`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Allocation {
    pub agent: AgentId,
    pub allocated: u64,
    pub spent: u64,
    pub tier: SecurityTier,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl Allocation {
    pub fn remaining(&self) -> u64 {
        self.allocated.saturating_sub(self.spent)
    }
}

/// A transfer waiting for quorum.
///
/// `required_signatures` is copied from the treasury at creation time and is
/// not affected by later signer-set changes. `expires_at_ms` is recorded at
/// open but is never consulted by the approval path itself; stale entries are
/// only removed by the explicit maintenance sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingApproval {
    pub id: ApprovalId,
    pub amount: u64,
    pub recipient: Address,
    pub memo: String,
    pub approvals: BTreeSet<Address>,
    pub required_signatures: u8,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl PendingApproval {
    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }
}

/// Read-model snapshot of one allocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationStatus {
    pub allocated: u64,
    pub spent: u64,
    pub tier: SecurityTier,
}

/// Read-model snapshot of the daily allocation window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySpending {
    pub spent: u64,
    pub limit: u64,
}

/// Read-model snapshot of one pending approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStatus {
    pub amount: u64,
    pub recipient: Address,
    pub approval_count: usize,
    pub required_signatures: u8,
}

/// Reporting view of the routing configuration.
///
/// The hot route amount is configuration data surfaced for reporting; the
/// transfer routing decision consults only the approval threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub cold_address: Address,
    pub hot_address: Address,
    pub hot_amount: u64,
    pub approval_threshold: u64,
}
