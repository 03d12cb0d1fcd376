use coffer_types::{Address, AgentId, ApprovalId};
use thiserror::Error;

/// Treasury engine errors.
///
/// Every failure is synchronous and all-or-nothing: a call that returns an
/// error has left no partial mutation behind. Nothing is retried internally;
/// retry policy belongs to the caller, and the specific variant tells it
/// whether a retry can ever succeed (`DailyLimitExceeded` may clear on the
/// next window; `InvalidThreshold` never will).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreasuryError {
    #[error("capability or identity does not match this treasury")]
    Unauthorized,

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("invalid threshold configuration: {0}")]
    InvalidThreshold(String),

    #[error("emergency mode is active")]
    EmergencyModeActive,

    #[error("daily allocation limit exceeded: requested {requested}, remaining {remaining}")]
    DailyLimitExceeded { requested: u64, remaining: u64 },

    #[error("no allocation exists for agent '{0}'")]
    UnknownAgent(AgentId),

    #[error("pending approval {0} not found")]
    NotFound(ApprovalId),

    #[error("capability expired at {expires_at_ms}, now is {now_ms}")]
    CapabilityExpired { expires_at_ms: u64, now_ms: u64 },

    #[error("approver '{0}' already signed this approval")]
    DuplicateApprover(Address),

    #[error("an allocation already exists for agent '{0}'")]
    DuplicateAgentAllocation(AgentId),

    /// A previous caller panicked inside the critical section. Unreachable as
    /// long as no operation panics while holding the state lock.
    #[error("treasury state lock poisoned")]
    StatePoisoned,
}
