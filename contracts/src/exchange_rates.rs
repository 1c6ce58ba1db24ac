//! Exchange Rates Contract
//!
//! Price feed for pynths and the native collateral token, plus the debt ratio
//! of the multi-chain debt pool. Implements:
//! - Per-currency rates pushed by the oracle role
//! - Freshness checks against a configurable stale period
//! - pUSD pinned at 1.0 and never stale
//! - Debt ratio with its own timestamp, reading 1.0 until first published

use odra::prelude::*;
use odra::casper_types::U256;
use crate::access_control::{AccessControl, ROLE_ORACLE};
use crate::errors::IssuanceError;
use crate::math::{divide_decimal, multiply_decimal, unit};
use crate::types::{DebtRatioData, RateData, PUSD};

/// Default maximum rate age (25 hours)
pub const DEFAULT_RATE_STALE_PERIOD: u64 = 90_000;

/// Rates were pushed by the oracle
#[odra::event]
pub struct RatesUpdated {
    pub currency_keys: Vec<String>,
    pub rates: Vec<U256>,
}

/// The debt ratio was pushed by the oracle
#[odra::event]
pub struct DebtRatioUpdated {
    pub ratio: U256,
}

/// Exchange Rates Contract
#[odra::module(events = [RatesUpdated, DebtRatioUpdated])]
pub struct ExchangeRates {
    access: SubModule<AccessControl>,
    /// Latest rate per currency key
    rates: Mapping<String, RateData>,
    /// Latest published debt ratio
    debt_ratio: Var<Option<DebtRatioData>>,
    /// Maximum rate age before it is considered stale
    rate_stale_period: Var<u64>,
}

#[odra::module]
impl ExchangeRates {
    pub fn init(&mut self, owner: Address, oracle: Address, rate_stale_period: u64) {
        self.access.init(owner);
        self.access.assign_role(ROLE_ORACLE, oracle);
        self.rate_stale_period.set(rate_stale_period);
        self.debt_ratio.set(None);
    }

    // ========== Oracle Functions ==========

    /// Push rates for several currencies at the current block time
    pub fn update_rates(&mut self, currency_keys: Vec<String>, rates: Vec<U256>) {
        self.access.require_role(ROLE_ORACLE, IssuanceError::Unauthorized);
        if currency_keys.len() != rates.len() {
            self.env().revert(IssuanceError::LengthMismatch);
        }
        if rates.iter().any(|rate| rate.is_zero()) {
            self.env().revert(IssuanceError::InvalidRate);
        }

        let now = self.env().get_block_time_secs();
        for (key, rate) in currency_keys.iter().zip(rates.iter()) {
            // pUSD is pinned
            if key == PUSD {
                continue;
            }
            self.rates.set(key, RateData { rate: *rate, updated_at: now });
        }

        self.env().emit_event(RatesUpdated { currency_keys, rates });
    }

    /// Push the debt ratio of the network debt pool
    pub fn set_debt_ratio(&mut self, ratio: U256) {
        self.access.require_role(ROLE_ORACLE, IssuanceError::Unauthorized);
        if ratio.is_zero() {
            self.env().revert(IssuanceError::InvalidRate);
        }
        self.debt_ratio.set(Some(DebtRatioData {
            ratio,
            updated_at: self.env().get_block_time_secs(),
        }));
        self.env().emit_event(DebtRatioUpdated { ratio });
    }

    // ========== Rate Queries ==========

    /// Rate and staleness flag for a currency. Unknown currencies read as (0, stale).
    pub fn get_rate(&self, currency_key: String) -> (U256, bool) {
        if currency_key == PUSD {
            return (unit(), false);
        }
        match self.rates.get(&currency_key) {
            Some(data) => (data.rate, self.is_stale_at(data.updated_at)),
            None => (U256::zero(), true),
        }
    }

    pub fn rate_for_currency(&self, currency_key: String) -> U256 {
        self.get_rate(currency_key).0
    }

    pub fn rate_is_stale(&self, currency_key: String) -> bool {
        self.get_rate(currency_key).1
    }

    /// Rates for several currencies and whether any of them is stale
    pub fn rates_and_any_invalid(&self, currency_keys: Vec<String>) -> (Vec<U256>, bool) {
        let mut any_invalid = false;
        let mut rates = Vec::with_capacity(currency_keys.len());
        for key in currency_keys {
            let (rate, stale) = self.get_rate(key);
            any_invalid = any_invalid || stale;
            rates.push(rate);
        }
        (rates, any_invalid)
    }

    pub fn any_rate_is_invalid(&self, currency_keys: Vec<String>) -> bool {
        self.rates_and_any_invalid(currency_keys).1
    }

    /// Value of `amount` of `source_key` expressed in `dest_key`
    pub fn effective_value(&self, source_key: String, amount: U256, dest_key: String) -> U256 {
        if source_key == dest_key {
            return amount;
        }
        let source_rate = self.rate_for_currency(source_key);
        let dest_rate = self.rate_for_currency(dest_key);
        divide_decimal(multiply_decimal(amount, source_rate), dest_rate)
    }

    /// Debt ratio, staleness flag and update time. Reads (1.0, fresh, 0) until published.
    pub fn get_debt_ratio(&self) -> (U256, bool, u64) {
        match self.debt_ratio.get().flatten() {
            Some(data) => (data.ratio, self.is_stale_at(data.updated_at), data.updated_at),
            None => (unit(), false, 0),
        }
    }

    // ========== Admin Functions ==========

    pub fn set_rate_stale_period(&mut self, period: u64) {
        self.access.require_owner();
        if period == 0 {
            self.env().revert(IssuanceError::InvalidConfig);
        }
        self.rate_stale_period.set(period);
    }

    pub fn get_rate_stale_period(&self) -> u64 {
        self.rate_stale_period.get().unwrap_or(DEFAULT_RATE_STALE_PERIOD)
    }

    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.access.grant_role(role_id, account);
    }

    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.access.revoke_role(role_id, account);
    }

    pub fn has_role(&self, role_id: u8, account: Address) -> bool {
        self.access.has_role(role_id, account)
    }

    // ========== Internal ==========

    fn is_stale_at(&self, updated_at: u64) -> bool {
        let age = self.env().get_block_time_secs().saturating_sub(updated_at);
        age > self.get_rate_stale_period()
    }
}
