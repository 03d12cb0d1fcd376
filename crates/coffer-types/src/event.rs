//! Event surface: the six state transitions the engine announces, and the
//! injected append-only sink that carries them to an external consumer.

use crate::{Address, AgentId, ApprovalId, SecurityTier, TreasuryId};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Execution mode carried by a `FundsTransferred` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Below the approval threshold: debited inside the requesting call.
    Immediate,
    /// At or above the threshold: debited when the final signature landed.
    Quorum,
}

/// State transitions emitted by the treasury engine.
///
/// Exactly these six kinds exist; deposits do not produce an event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreasuryEvent {
    TreasuryCreated {
        treasury: TreasuryId,
        admin: Address,
        at_ms: u64,
    },
    AgentAllocated {
        treasury: TreasuryId,
        agent: AgentId,
        amount: u64,
        tier: SecurityTier,
        expires_at_ms: u64,
        at_ms: u64,
    },
    FundsTransferred {
        treasury: TreasuryId,
        /// Present on the immediate path. Quorum executions do not carry the
        /// originating agent: the pending record does not retain it.
        agent: Option<AgentId>,
        recipient: Address,
        amount: u64,
        mode: TransferMode,
        memo: String,
        at_ms: u64,
    },
    EmergencyActivated {
        treasury: TreasuryId,
        reason: String,
        at_ms: u64,
    },
    ApprovalRequested {
        treasury: TreasuryId,
        approval: ApprovalId,
        amount: u64,
        recipient: Address,
        required_signatures: u8,
        at_ms: u64,
    },
    ApprovalProvided {
        treasury: TreasuryId,
        approval: ApprovalId,
        approver: Address,
        approval_count: usize,
        required_signatures: u8,
        at_ms: u64,
    },
}

/// Append-only destination for treasury events.
///
/// The sink is injected at construction so the engine never hardcodes a
/// transport. Implementations must not block: emission happens inside the
/// treasury's critical section.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TreasuryEvent);
}

/// In-memory sink for tests and local inspection.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<TreasuryEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in emission order.
    pub fn snapshot(&self) -> Vec<TreasuryEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Remove and return all recorded events.
    pub fn drain(&self) -> Vec<TreasuryEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: TreasuryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Sink that discards everything. Useful when no consumer is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: TreasuryEvent) {}
}
