//! Pending multi-party approvals and quorum tracking.

use crate::config::APPROVAL_TTL_MS;
use crate::error::TreasuryError;
use coffer_types::{Address, ApprovalId, PendingApproval};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Result of checking whether one more signature completes an approval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    /// This signature would meet the quorum; the transfer must execute now.
    Quorum,
    /// Still short of quorum after this signature.
    Pending,
}

/// Queue of transfers waiting for quorum.
///
/// Ids come from a monotonic counter and are never reused. Entries carry a
/// recorded expiry that no approval operation consults; only the explicit
/// sweep removes stale entries.
#[derive(Clone, Debug, Default)]
pub struct ApprovalQueue {
    pending: HashMap<ApprovalId, PendingApproval>,
    next_id: u64,
}

impl ApprovalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ApprovalId) -> Option<&PendingApproval> {
        self.pending.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Open a pending approval and return its id.
    ///
    /// `required_signatures` is copied from the treasury policy at this
    /// moment and stays fixed for the life of the entry.
    pub fn open(
        &mut self,
        amount: u64,
        recipient: Address,
        required_signatures: u8,
        memo: String,
        now_ms: u64,
    ) -> ApprovalId {
        let id = ApprovalId(self.next_id);
        self.next_id += 1;
        self.pending.insert(
            id,
            PendingApproval {
                id,
                amount,
                recipient,
                memo,
                approvals: BTreeSet::new(),
                required_signatures,
                created_at_ms: now_ms,
                expires_at_ms: now_ms.saturating_add(APPROVAL_TTL_MS),
            },
        );
        id
    }

    /// Validate a would-be signature without mutating anything.
    ///
    /// The caller uses the returned admission to decide whether to execute
    /// the transfer before recording the signature, keeping the whole
    /// approve call all-or-nothing.
    pub(crate) fn check_admission(
        &self,
        id: ApprovalId,
        approver: &Address,
        signers: &BTreeSet<Address>,
    ) -> Result<Admission, TreasuryError> {
        let entry = self.pending.get(&id).ok_or(TreasuryError::NotFound(id))?;

        if !signers.contains(approver) {
            warn!(approval = %id, approver = %approver, "approval refused: not a signer");
            return Err(TreasuryError::Unauthorized);
        }
        if entry.approvals.contains(approver) {
            warn!(approval = %id, approver = %approver, "approval refused: duplicate signature");
            return Err(TreasuryError::DuplicateApprover(approver.clone()));
        }

        let count_with_this = entry.approvals.len() + 1;
        if count_with_this >= usize::from(entry.required_signatures) {
            Ok(Admission::Quorum)
        } else {
            Ok(Admission::Pending)
        }
    }

    /// Record a validated signature. Returns the new signature count.
    pub(crate) fn record_signature(
        &mut self,
        id: ApprovalId,
        approver: Address,
    ) -> Result<usize, TreasuryError> {
        let entry = self.pending.get_mut(&id).ok_or(TreasuryError::NotFound(id))?;
        entry.approvals.insert(approver);
        Ok(entry.approvals.len())
    }

    /// Delete an entry, returning it. Used the instant quorum executes.
    pub(crate) fn remove(&mut self, id: ApprovalId) -> Option<PendingApproval> {
        self.pending.remove(&id)
    }

    /// Remove every entry whose recorded lifetime has passed.
    pub fn sweep_expired(&mut self, now_ms: u64) -> Vec<ApprovalId> {
        let mut expired: Vec<ApprovalId> = self
            .pending
            .values()
            .filter(|entry| now_ms > entry.expires_at_ms)
            .map(|entry| entry.id)
            .collect();
        expired.sort();
        for id in &expired {
            self.pending.remove(id);
        }
        expired
    }
}
