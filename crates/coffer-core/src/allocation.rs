//! Per-agent budget registry.

use crate::error::TreasuryError;
use coffer_types::{AgentId, Allocation};
use std::collections::HashMap;
use tracing::warn;

/// Registry of live allocations, one per agent id.
///
/// Insert-or-abort semantics: a second allocation for the same agent fails
/// instead of replacing the first, even when the first has expired.
#[derive(Clone, Debug, Default)]
pub struct AllocationBook {
    entries: HashMap<AgentId, Allocation>,
}

impl AllocationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agent: &AgentId) -> Option<&Allocation> {
        self.entries.get(agent)
    }

    pub fn insert(&mut self, allocation: Allocation) -> Result<(), TreasuryError> {
        if self.entries.contains_key(&allocation.agent) {
            warn!(agent = %allocation.agent, "allocation refused: agent already allocated");
            return Err(TreasuryError::DuplicateAgentAllocation(
                allocation.agent.clone(),
            ));
        }
        self.entries.insert(allocation.agent.clone(), allocation);
        Ok(())
    }

    /// Verify the agent exists and `amount` fits in its remaining budget.
    pub fn check_budget(&self, agent: &AgentId, amount: u64) -> Result<(), TreasuryError> {
        let allocation = self
            .entries
            .get(agent)
            .ok_or_else(|| TreasuryError::UnknownAgent(agent.clone()))?;

        if allocation.spent.saturating_add(amount) > allocation.allocated {
            warn!(
                agent = %agent,
                required = amount,
                available = allocation.remaining(),
                "transfer refused: allocation budget insufficient"
            );
            return Err(TreasuryError::InsufficientBalance {
                required: amount,
                available: allocation.remaining(),
            });
        }
        Ok(())
    }

    /// Add an executed immediate transfer to the agent's spent counter.
    pub fn record_spend(&mut self, agent: &AgentId, amount: u64) -> Result<(), TreasuryError> {
        let allocation = self
            .entries
            .get_mut(agent)
            .ok_or_else(|| TreasuryError::UnknownAgent(agent.clone()))?;
        allocation.spent = allocation.spent.saturating_add(amount);
        Ok(())
    }
}
