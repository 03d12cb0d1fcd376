//! Pooled balance and the rolling daily allocation window.

use crate::config::DAILY_WINDOW_MS;
use crate::error::TreasuryError;
use tracing::{debug, warn};

/// The pooled treasury balance plus the daily issuance counter.
///
/// Funds leave the pool only through `debit`; a successful debit conceptually
/// releases the amount to the recipient, with the actual movement handled by
/// an external custody component. The daily counter tracks allocation
/// issuance, not transfers, and resets lazily.
#[derive(Clone, Debug)]
pub struct Ledger {
    balance: u64,
    daily_limit: u64,
    daily_spent: u64,
    last_reset_ms: u64,
}

impl Ledger {
    pub fn new(daily_limit: u64, now_ms: u64) -> Self {
        Self {
            balance: 0,
            daily_limit,
            daily_spent: 0,
            last_reset_ms: now_ms,
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn daily_spent(&self) -> u64 {
        self.daily_spent
    }

    pub fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    /// Deposits are always accepted; the pool saturates at `u64::MAX`.
    pub fn deposit(&mut self, amount: u64) -> u64 {
        self.balance = self.balance.saturating_add(amount);
        debug!(amount, balance = self.balance, "deposit accepted");
        self.balance
    }

    /// Remove `amount` from the pool, or fail without touching it.
    pub fn debit(&mut self, amount: u64) -> Result<(), TreasuryError> {
        if amount > self.balance {
            warn!(
                required = amount,
                available = self.balance,
                "debit refused: pool balance insufficient"
            );
            return Err(TreasuryError::InsufficientBalance {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Lazily roll the 24h window. Returns true when a reset happened.
    pub fn roll_daily_window(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_reset_ms) >= DAILY_WINDOW_MS {
            debug!(
                previous_spent = self.daily_spent,
                last_reset_ms = self.last_reset_ms,
                now_ms,
                "daily window rolled"
            );
            self.daily_spent = 0;
            self.last_reset_ms = now_ms;
            return true;
        }
        false
    }

    /// Verify `amount` fits in the remainder of the current window.
    pub fn check_daily_room(&self, amount: u64) -> Result<(), TreasuryError> {
        let projected = self.daily_spent.saturating_add(amount);
        if projected > self.daily_limit {
            warn!(
                requested = amount,
                spent = self.daily_spent,
                limit = self.daily_limit,
                "allocation refused: daily limit exceeded"
            );
            return Err(TreasuryError::DailyLimitExceeded {
                requested: amount,
                remaining: self.daily_limit.saturating_sub(self.daily_spent),
            });
        }
        Ok(())
    }

    /// Count issued allocation volume against the current window.
    pub fn record_daily_spend(&mut self, amount: u64) {
        self.daily_spent = self.daily_spent.saturating_add(amount);
    }
}
