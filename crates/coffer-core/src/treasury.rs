//! The treasury engine: one serialization point per instance.
//!
//! Every public operation runs as a single critical section against the
//! instance's state. The original environment guaranteed whole-call
//! atomicity; here an exclusive write lock reproduces it: validate, mutate,
//! emit, release, with no intermediate state ever observable. Queries share a
//! read lock and see snapshot-consistent state. Critical sections are
//! O(map lookup) with no I/O, so hold times stay short; instances never
//! block each other.

use crate::allocation::AllocationBook;
use crate::approval::{Admission, ApprovalQueue};
use crate::capability::{AdminCapability, AgentCapability};
use crate::config::{Route, TreasuryConfig};
use crate::error::TreasuryError;
use crate::ledger::Ledger;
use coffer_types::{
    Address, AgentId, Allocation, AllocationStatus, ApprovalId, ApprovalStatus, DailySpending,
    EventSink, RouteInfo, SecurityTier, TransferMode, TreasuryEvent, TreasuryId,
};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Result of an `approve` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// This signature met the quorum; the transfer executed and the pending
    /// entry is gone.
    Executed,
    /// Signature recorded; the entry is still waiting for quorum.
    Pending {
        approval_count: usize,
        required_signatures: u8,
    },
}

struct TreasuryState {
    config: TreasuryConfig,
    ledger: Ledger,
    allocations: AllocationBook,
    approvals: ApprovalQueue,
    emergency: bool,
}

/// A pooled treasury governed by the tiered authorization policy.
///
/// Owns its full mutable state exclusively; internal maps are never handed
/// out by reference. Capabilities minted here bind to this instance's id and
/// are worthless elsewhere.
pub struct Treasury {
    id: TreasuryId,
    state: RwLock<TreasuryState>,
    sink: Arc<dyn EventSink>,
}

impl Treasury {
    /// Create a treasury and mint its admin capability.
    ///
    /// Fails with `InvalidThreshold` unless the approval threshold strictly
    /// exceeds the hot-route amount and the signature requirement fits the
    /// signer set. These parameters are never re-validated afterwards.
    pub fn initialize(
        config: TreasuryConfig,
        sink: Arc<dyn EventSink>,
        now_ms: u64,
    ) -> Result<(Self, AdminCapability), TreasuryError> {
        config.validate()?;

        let id = TreasuryId::generate();
        let admin = config.admin.clone();
        let daily_limit = config.daily_limit;
        let treasury = Self {
            id,
            state: RwLock::new(TreasuryState {
                config,
                ledger: Ledger::new(daily_limit, now_ms),
                allocations: AllocationBook::new(),
                approvals: ApprovalQueue::new(),
                emergency: false,
            }),
            sink,
        };

        info!(treasury = %id, admin = %admin, "treasury created");
        treasury.sink.emit(TreasuryEvent::TreasuryCreated {
            treasury: id,
            admin,
            at_ms: now_ms,
        });

        Ok((treasury, AdminCapability::mint(id)))
    }

    pub fn id(&self) -> TreasuryId {
        self.id
    }

    /// Add funds to the pool. Always accepted; returns the new balance.
    pub fn deposit(&self, amount: u64) -> Result<u64, TreasuryError> {
        let mut state = self.write()?;
        Ok(state.ledger.deposit(amount))
    }

    /// Create a budget for `agent` and mint its spending capability.
    ///
    /// Counts `amount` against the rolling daily issuance window, rolling the
    /// window first if 24h have passed since the last reset.
    pub fn allocate(
        &self,
        cap: &AdminCapability,
        agent: AgentId,
        amount: u64,
        tier: SecurityTier,
        duration_ms: u64,
        now_ms: u64,
    ) -> Result<AgentCapability, TreasuryError> {
        self.check_admin(cap)?;
        let mut state = self.write()?;
        state.check_not_frozen()?;

        state.ledger.roll_daily_window(now_ms);
        state.ledger.check_daily_room(amount)?;

        let expires_at_ms = now_ms.saturating_add(duration_ms);
        state.allocations.insert(Allocation {
            agent: agent.clone(),
            allocated: amount,
            spent: 0,
            tier,
            created_at_ms: now_ms,
            expires_at_ms,
        })?;
        state.ledger.record_daily_spend(amount);

        info!(
            treasury = %self.id,
            agent = %agent,
            amount,
            tier = tier.level(),
            expires_at_ms,
            "agent allocated"
        );
        self.sink.emit(TreasuryEvent::AgentAllocated {
            treasury: self.id,
            agent: agent.clone(),
            amount,
            tier,
            expires_at_ms,
            at_ms: now_ms,
        });

        Ok(AgentCapability::mint(self.id, agent, amount, expires_at_ms))
    }

    /// Request a transfer from the pool.
    ///
    /// Amounts below the approval threshold execute inside this call and
    /// return `None`. Amounts at or above it open a pending approval and
    /// return its id; the agent's spent counter is not touched until — and,
    /// per the preserved accounting gap, not even when — quorum executes.
    pub fn transfer(
        &self,
        cap: &AgentCapability,
        recipient: Address,
        amount: u64,
        memo: impl Into<String>,
        now_ms: u64,
    ) -> Result<Option<ApprovalId>, TreasuryError> {
        if cap.treasury() != self.id {
            warn!(treasury = %self.id, "transfer refused: foreign agent capability");
            return Err(TreasuryError::Unauthorized);
        }

        let mut state = self.write()?;
        state.check_not_frozen()?;

        if amount > cap.max_amount() {
            warn!(
                agent = %cap.agent(),
                required = amount,
                available = cap.max_amount(),
                "transfer refused: above capability ceiling"
            );
            return Err(TreasuryError::InsufficientBalance {
                required: amount,
                available: cap.max_amount(),
            });
        }
        if cap.is_expired(now_ms) {
            warn!(agent = %cap.agent(), "transfer refused: capability expired");
            return Err(TreasuryError::CapabilityExpired {
                expires_at_ms: cap.expires_at_ms(),
                now_ms,
            });
        }
        state.allocations.check_budget(cap.agent(), amount)?;

        let memo = memo.into();
        match state.config.route(amount) {
            Route::Quorum => {
                let required_signatures = state.config.required_signatures;
                let id = state.approvals.open(
                    amount,
                    recipient.clone(),
                    required_signatures,
                    memo,
                    now_ms,
                );

                info!(
                    treasury = %self.id,
                    approval = %id,
                    amount,
                    "transfer routed to approval quorum"
                );
                self.sink.emit(TreasuryEvent::ApprovalRequested {
                    treasury: self.id,
                    approval: id,
                    amount,
                    recipient,
                    required_signatures,
                    at_ms: now_ms,
                });
                Ok(Some(id))
            }
            Route::Immediate => {
                state.ledger.debit(amount)?;
                state.allocations.record_spend(cap.agent(), amount)?;

                debug!(
                    treasury = %self.id,
                    agent = %cap.agent(),
                    amount,
                    balance = state.ledger.balance(),
                    "transfer executed immediately"
                );
                self.sink.emit(TreasuryEvent::FundsTransferred {
                    treasury: self.id,
                    agent: Some(cap.agent().clone()),
                    recipient,
                    amount,
                    mode: TransferMode::Immediate,
                    memo,
                    at_ms: now_ms,
                });
                Ok(None)
            }
        }
    }

    /// Sign a pending approval; execute the transfer when quorum is met.
    ///
    /// All-or-nothing: when this signature would complete the quorum but the
    /// pool cannot cover the amount, the call fails and the signature is not
    /// recorded.
    pub fn approve(
        &self,
        id: ApprovalId,
        approver: Address,
        now_ms: u64,
    ) -> Result<ApprovalOutcome, TreasuryError> {
        let mut state = self.write()?;
        state.check_not_frozen()?;

        let admission = state
            .approvals
            .check_admission(id, &approver, &state.config.signers)?;

        match admission {
            Admission::Quorum => {
                // Debit before recording anything, so a short pool leaves the
                // approval exactly as it was.
                let amount = state
                    .approvals
                    .get(id)
                    .ok_or(TreasuryError::NotFound(id))?
                    .amount;
                state.ledger.debit(amount)?;

                let entry = state.approvals.remove(id).ok_or(TreasuryError::NotFound(id))?;
                let approval_count = entry.approval_count() + 1;

                info!(
                    treasury = %self.id,
                    approval = %id,
                    approver = %approver,
                    amount = entry.amount,
                    "quorum met, transfer executed"
                );
                self.sink.emit(TreasuryEvent::ApprovalProvided {
                    treasury: self.id,
                    approval: id,
                    approver,
                    approval_count,
                    required_signatures: entry.required_signatures,
                    at_ms: now_ms,
                });
                self.sink.emit(TreasuryEvent::FundsTransferred {
                    treasury: self.id,
                    agent: None,
                    recipient: entry.recipient,
                    amount: entry.amount,
                    mode: TransferMode::Quorum,
                    memo: entry.memo,
                    at_ms: now_ms,
                });
                Ok(ApprovalOutcome::Executed)
            }
            Admission::Pending => {
                let approval_count = state.approvals.record_signature(id, approver.clone())?;
                let required_signatures = state
                    .approvals
                    .get(id)
                    .ok_or(TreasuryError::NotFound(id))?
                    .required_signatures;

                debug!(
                    treasury = %self.id,
                    approval = %id,
                    approver = %approver,
                    approval_count,
                    required_signatures,
                    "approval signature recorded"
                );
                self.sink.emit(TreasuryEvent::ApprovalProvided {
                    treasury: self.id,
                    approval: id,
                    approver,
                    approval_count,
                    required_signatures,
                    at_ms: now_ms,
                });
                Ok(ApprovalOutcome::Pending {
                    approval_count,
                    required_signatures,
                })
            }
        }
    }

    /// Halt all mutating operations. Read-only queries stay available.
    pub fn freeze(
        &self,
        cap: &AdminCapability,
        reason: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), TreasuryError> {
        self.check_admin(cap)?;
        let mut state = self.write()?;
        state.emergency = true;

        let reason = reason.into();
        warn!(treasury = %self.id, reason = %reason, "emergency mode activated");
        self.sink.emit(TreasuryEvent::EmergencyActivated {
            treasury: self.id,
            reason,
            at_ms: now_ms,
        });
        Ok(())
    }

    /// Clear the emergency flag. No other side effects: counters, allocations
    /// and pending approvals come back exactly as they were.
    pub fn unfreeze(&self, cap: &AdminCapability) -> Result<(), TreasuryError> {
        self.check_admin(cap)?;
        let mut state = self.write()?;
        state.emergency = false;
        info!(treasury = %self.id, "emergency mode cleared");
        Ok(())
    }

    /// Remove pending approvals whose recorded lifetime has passed.
    ///
    /// The engine never runs this on its own: there is no background timer,
    /// and `approve` deliberately ignores expiry. Operators schedule this as
    /// a separate maintenance task. It stays available while frozen, since it
    /// only discards stale state.
    pub fn sweep_expired_approvals(
        &self,
        cap: &AdminCapability,
        now_ms: u64,
    ) -> Result<Vec<ApprovalId>, TreasuryError> {
        self.check_admin(cap)?;
        let mut state = self.write()?;
        let swept = state.approvals.sweep_expired(now_ms);
        if !swept.is_empty() {
            info!(treasury = %self.id, count = swept.len(), "expired approvals swept");
        }
        Ok(swept)
    }

    // ── Read-only queries (shared lock, snapshot-consistent) ──────────

    pub fn balance(&self) -> Result<u64, TreasuryError> {
        Ok(self.read()?.ledger.balance())
    }

    pub fn allocation_of(&self, agent: &AgentId) -> Result<AllocationStatus, TreasuryError> {
        let state = self.read()?;
        let allocation = state
            .allocations
            .get(agent)
            .ok_or_else(|| TreasuryError::UnknownAgent(agent.clone()))?;
        Ok(AllocationStatus {
            allocated: allocation.allocated,
            spent: allocation.spent,
            tier: allocation.tier,
        })
    }

    pub fn daily_spending(&self) -> Result<DailySpending, TreasuryError> {
        let state = self.read()?;
        Ok(DailySpending {
            spent: state.ledger.daily_spent(),
            limit: state.ledger.daily_limit(),
        })
    }

    pub fn is_frozen(&self) -> Result<bool, TreasuryError> {
        Ok(self.read()?.emergency)
    }

    pub fn pending_approval(&self, id: ApprovalId) -> Result<ApprovalStatus, TreasuryError> {
        let state = self.read()?;
        let entry = state.approvals.get(id).ok_or(TreasuryError::NotFound(id))?;
        Ok(ApprovalStatus {
            amount: entry.amount,
            recipient: entry.recipient.clone(),
            approval_count: entry.approval_count(),
            required_signatures: entry.required_signatures,
        })
    }

    pub fn pending_approval_count(&self) -> Result<usize, TreasuryError> {
        Ok(self.read()?.approvals.len())
    }

    /// Routing configuration, surfaced for reporting. The hot amount shown
    /// here is never consulted by the transfer routing decision.
    pub fn routes(&self) -> Result<RouteInfo, TreasuryError> {
        Ok(self.read()?.config.route_info())
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn check_admin(&self, cap: &AdminCapability) -> Result<(), TreasuryError> {
        if cap.treasury() != self.id {
            warn!(treasury = %self.id, "refused: foreign admin capability");
            return Err(TreasuryError::Unauthorized);
        }
        Ok(())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TreasuryState>, TreasuryError> {
        self.state.write().map_err(|_| TreasuryError::StatePoisoned)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TreasuryState>, TreasuryError> {
        self.state.read().map_err(|_| TreasuryError::StatePoisoned)
    }
}

impl TreasuryState {
    fn check_not_frozen(&self) -> Result<(), TreasuryError> {
        if self.emergency {
            return Err(TreasuryError::EmergencyModeActive);
        }
        Ok(())
    }
}
