//! Cached system debt with a circuit breaker.
//!
//! The cache holds the pUSD value of every registered pynth's supply. Keepers
//! refresh it with a snapshot; issue and burn move it by the amount they mint
//! or burn. The last value that passed the breaker is kept as `last_good_debt`.
//!
//! When the cached debt deviates from the last good value by more than the
//! threshold, the breaker latches. While latched, debt mutations are accepted but
//! move no value and readers see the frozen last good debt. The owner resets the
//! breaker once the deviation has been explained.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::math::{deviation, unit};

/// The cached debt was refreshed
#[odra::event]
pub struct DebtCacheUpdated {
    pub cached_debt: U256,
}

/// The cached debt jumped past the threshold
#[odra::event]
pub struct CircuitBroken {
    pub cached_debt: U256,
    pub last_good_debt: U256,
}

/// The breaker was reset by the owner
#[odra::event]
pub struct CircuitReset {
    pub debt: U256,
}

/// Debt cache
#[odra::module(events = [DebtCacheUpdated, CircuitBroken, CircuitReset])]
pub struct DebtCache {
    cached_debt: Var<U256>,
    last_good_debt: Var<U256>,
    /// Block time of the last snapshot
    cache_timestamp: Var<u64>,
    /// Maximum fractional deviation (1e18 = 100%); zero disables the breaker
    deviation_threshold: Var<U256>,
    broken: Var<bool>,
}

#[odra::module]
impl DebtCache {
    pub fn cached_debt(&self) -> U256 {
        self.cached_debt.get().unwrap_or(U256::zero())
    }

    pub fn last_good_debt(&self) -> U256 {
        self.last_good_debt.get().unwrap_or(U256::zero())
    }

    pub fn cache_timestamp(&self) -> u64 {
        self.cache_timestamp.get().unwrap_or(0)
    }

    pub fn deviation_threshold(&self) -> U256 {
        self.deviation_threshold.get().unwrap_or(unit())
    }

    pub fn is_broken(&self) -> bool {
        self.broken.get().unwrap_or(false)
    }

    /// Debt readers should use: frozen at the last good value while broken
    pub fn current_debt(&self) -> U256 {
        if self.is_broken() {
            self.last_good_debt()
        } else {
            self.cached_debt()
        }
    }
}

impl DebtCache {
    pub fn set_deviation_threshold(&mut self, threshold: U256) {
        self.deviation_threshold.set(threshold);
    }

    /// Record a freshly computed system debt
    pub fn record_snapshot(&mut self, debt: U256) {
        self.cached_debt.set(debt);
        self.cache_timestamp.set(self.env().get_block_time_secs());
        self.env().emit_event(DebtCacheUpdated { cached_debt: debt });
    }

    /// Check the breaker before a mutation. Returns false, latching the breaker on
    /// first detection, if the mutation must not move value.
    pub fn check_circuit(&mut self) -> bool {
        if self.is_broken() {
            return false;
        }
        let threshold = self.deviation_threshold();
        let cached = self.cached_debt();
        let last_good = self.last_good_debt();
        if threshold.is_zero() || last_good.is_zero() {
            return true;
        }
        if deviation(cached, last_good) <= threshold {
            return true;
        }

        self.broken.set(true);
        self.env().emit_event(CircuitBroken { cached_debt: cached, last_good_debt: last_good });
        false
    }

    /// Move the cache by a debt change that passed the breaker
    pub fn apply_increase(&mut self, amount: U256) {
        let debt = self.cached_debt() + amount;
        self.accept(debt);
    }

    pub fn apply_decrease(&mut self, amount: U256) {
        let debt = self.cached_debt().saturating_sub(amount);
        self.accept(debt);
    }

    /// Unlatch the breaker, accepting the cached debt as good
    pub fn reset(&mut self) {
        let debt = self.cached_debt();
        self.broken.set(false);
        self.last_good_debt.set(debt);
        self.env().emit_event(CircuitReset { debt });
    }

    fn accept(&mut self, debt: U256) {
        self.cached_debt.set(debt);
        self.last_good_debt.set(debt);
    }
}
