//! Debt share ledger.
//!
//! Each account's claim on the network debt pool is held as debt shares. The
//! debt ratio (total network debt per share) converts shares to debt value:
//!
//! ```text
//! debt(account) = shares(account) * debt_ratio
//! ```
//!
//! Shares are only created and destroyed here, so the sum of all balances always
//! equals the total supply. Before the first share exists the ratio is 1.0 and
//! shares are minted one for one with debt.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::IssuanceError;
use crate::math::{divide_decimal, divide_decimal_ceil, multiply_decimal};

/// Shares minted against newly issued debt
#[odra::event]
pub struct DebtShareMinted {
    pub account: Address,
    pub shares: U256,
    pub value: U256,
}

/// Shares burned against repaid debt
#[odra::event]
pub struct DebtShareBurned {
    pub account: Address,
    pub shares: U256,
    pub value: U256,
}

/// Result of a burn against the ledger
#[odra::odra_type]
#[derive(Copy, Default)]
pub struct ShareBurn {
    /// Shares removed from the account
    pub shares: U256,
    /// Debt value those shares represented
    pub value: U256,
}

/// Debt share balances
#[odra::module(events = [DebtShareMinted, DebtShareBurned])]
pub struct DebtLedger {
    shares: Mapping<Address, U256>,
    total_shares: Var<U256>,
}

#[odra::module]
impl DebtLedger {
    pub fn share_balance_of(&self, account: Address) -> U256 {
        self.shares.get(&account).unwrap_or(U256::zero())
    }

    pub fn total_shares(&self) -> U256 {
        self.total_shares.get().unwrap_or(U256::zero())
    }
}

impl DebtLedger {
    /// Debt value of an account's shares at `debt_ratio`
    pub fn debt_value_of(&self, account: Address, debt_ratio: U256) -> U256 {
        multiply_decimal(self.share_balance_of(account), debt_ratio)
    }

    /// Mint shares for `value` of new debt. Returns the shares minted.
    pub fn issue_shares(&mut self, account: Address, value: U256, debt_ratio: U256) -> U256 {
        let minted = shares_for_issue(value, debt_ratio, self.total_shares());
        self.credit(account, minted);
        self.env().emit_event(DebtShareMinted { account, shares: minted, value });
        minted
    }

    /// Burn shares for up to `value` of debt. A request above the account's debt is
    /// capped at the debt rather than rejected.
    pub fn burn_shares(&mut self, account: Address, value: U256, debt_ratio: U256) -> ShareBurn {
        let balance = self.share_balance_of(account);
        let burn = match shares_for_burn(value, debt_ratio, balance) {
            Ok(burn) => burn,
            Err(error) => self.env().revert(error),
        };
        self.debit(account, burn.shares);
        self.env().emit_event(DebtShareBurned {
            account,
            shares: burn.shares,
            value: burn.value,
        });
        burn
    }

    /// Credit raw shares, bypassing the debt ratio (debt migration)
    pub fn mint_raw_shares(&mut self, account: Address, shares: U256) {
        self.credit(account, shares);
        self.env().emit_event(DebtShareMinted { account, shares, value: U256::zero() });
    }

    /// Debit raw shares, bypassing the debt ratio (debt migration)
    pub fn burn_raw_shares(&mut self, account: Address, shares: U256) {
        let balance = self.share_balance_of(account);
        if balance.is_zero() || shares > balance {
            self.env().revert(IssuanceError::InsufficientShares);
        }
        self.debit(account, shares);
        self.env().emit_event(DebtShareBurned { account, shares, value: U256::zero() });
    }

    fn credit(&mut self, account: Address, shares: U256) {
        self.shares.set(&account, self.share_balance_of(account) + shares);
        self.total_shares.set(self.total_shares() + shares);
    }

    fn debit(&mut self, account: Address, shares: U256) {
        self.shares.set(&account, self.share_balance_of(account) - shares);
        self.total_shares.set(self.total_shares() - shares);
    }
}

/// Shares to mint for `value` of debt; one for one while no shares exist
pub fn shares_for_issue(value: U256, debt_ratio: U256, total_shares: U256) -> U256 {
    if total_shares.is_zero() || debt_ratio.is_zero() {
        return value;
    }
    divide_decimal(value, debt_ratio)
}

/// Shares to burn for a request of `value` against a balance of `balance` shares.
///
/// Burning the whole debt removes the whole balance so no dust shares survive
/// a full repayment. Partial burns round the share count up.
pub fn shares_for_burn(
    value: U256,
    debt_ratio: U256,
    balance: U256,
) -> Result<ShareBurn, IssuanceError> {
    if balance.is_zero() {
        return Err(IssuanceError::InsufficientShares);
    }
    let debt = multiply_decimal(balance, debt_ratio);
    if value >= debt {
        return Ok(ShareBurn { shares: balance, value: debt });
    }
    let shares = divide_decimal_ceil(value, debt_ratio).min(balance);
    Ok(ShareBurn { shares, value })
}
