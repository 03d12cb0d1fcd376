//! Coffer Core - tiered treasury authorization engine.
//!
//! A pooled balance is spent by semi-trusted agents under per-agent budgets.
//! Small transfers execute immediately; transfers at or above the approval
//! threshold wait for a quorum of independent signers; an emergency switch
//! freezes all movement instantly. Callers are assumed authenticated — this
//! engine enforces authorization: who may move how much, under what quorum.
//!
//! Time enters every operation as an injected millisecond argument, and
//! state transitions are published to an injected append-only event sink, so
//! the engine is deterministic and transport-free.

#![deny(unsafe_code)]

pub mod allocation;
pub mod approval;
pub mod capability;
pub mod config;
pub mod error;
pub mod ledger;
pub mod treasury;

pub use allocation::AllocationBook;
pub use approval::ApprovalQueue;
pub use capability::{AdminCapability, AgentCapability};
pub use config::{TreasuryConfig, APPROVAL_TTL_MS, DAILY_WINDOW_MS, DEFAULT_HOT_AMOUNT};
pub use error::TreasuryError;
pub use ledger::Ledger;
pub use treasury::{ApprovalOutcome, Treasury};
