//! Interest model for collateralised loans.
//!
//! Interest accrues through a global, monotonically increasing index instead of
//! per-loan timers:
//! - The borrow rate per second is a base rate plus the pool utilisation spread
//!   over a year
//! - Each touch advances the index by `rate * elapsed`
//! - A loan owes `principal * (index_now - index_at_last_touch)`

use odra::casper_types::U256;
use crate::math::{divide_decimal, multiply_decimal};

/// Seconds in a year (365 days)
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Interest accrual result for a single loan
#[odra::odra_type]
#[derive(Copy, Default)]
pub struct AccrualResult {
    /// Interest owed since the loan's last touch
    pub interest_accrued: U256,
    /// Index the loan should store after the touch
    pub index: U256,
}

/// Share of the pynth supply that is out on loan (1e18 = 100%)
pub fn utilisation(loans_value: U256, total_supply_value: U256) -> U256 {
    divide_decimal(loans_value, total_supply_value)
}

/// Per-second borrow rate: base rate plus utilisation spread over a year
pub fn borrow_rate_per_second(base_rate_per_second: U256, utilisation: U256) -> U256 {
    base_rate_per_second + utilisation / U256::from(SECONDS_PER_YEAR)
}

/// Advance the global index by `elapsed` seconds at `rate_per_second`
pub fn accumulate_index(index: U256, rate_per_second: U256, elapsed: u64) -> U256 {
    if elapsed == 0 {
        return index;
    }
    index + rate_per_second * U256::from(elapsed)
}

/// Interest a loan owes between its stored index and the current one
pub fn accrue_loan(principal: U256, loan_index: U256, current_index: U256) -> AccrualResult {
    if principal.is_zero() || current_index <= loan_index {
        return AccrualResult {
            interest_accrued: U256::zero(),
            index: current_index.max(loan_index),
        };
    }
    AccrualResult {
        interest_accrued: multiply_decimal(principal, current_index - loan_index),
        index: current_index,
    }
}
