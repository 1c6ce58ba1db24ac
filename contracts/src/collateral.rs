//! Collateral valuation.
//!
//! Collateral of a staker is the PERI they hold plus PERI sitting in escrow and
//! reward escrow. Debt locks collateral at the issuance ratio:
//!
//! ```text
//! max_issuable = collateral * peri_rate * issuance_ratio
//! locked       = debt / issuance_ratio / peri_rate
//! ```
//!
//! Escrowed PERI cannot move anyway, so it absorbs the lock first and only the
//! remainder is taken from the wallet.

use odra::casper_types::U256;
use crate::math::{divide_decimal, divide_decimal_round, multiply_decimal};

/// PERI balances backing an account's debt
#[odra::odra_type]
#[derive(Copy, Default)]
pub struct CollateralBalances {
    /// PERI held in the wallet
    pub wallet: U256,
    /// PERI in the vesting escrow
    pub escrowed: U256,
    /// PERI in the reward escrow
    pub reward_escrowed: U256,
}

impl CollateralBalances {
    pub fn total(&self) -> U256 {
        self.wallet + self.escrowed + self.reward_escrowed
    }

    pub fn non_transferable(&self) -> U256 {
        self.escrowed + self.reward_escrowed
    }
}

/// Value of `collateral` PERI in pUSD
pub fn collateral_value(collateral: U256, peri_rate: U256) -> U256 {
    multiply_decimal(collateral, peri_rate)
}

/// Debt `collateral` PERI can back at the issuance ratio
pub fn max_issuable(collateral: U256, peri_rate: U256, issuance_ratio: U256) -> U256 {
    multiply_decimal(collateral_value(collateral, peri_rate), issuance_ratio)
}

/// Debt still issuable on top of `debt`
pub fn remaining_issuable(max_issuable: U256, debt: U256) -> U256 {
    max_issuable.saturating_sub(debt)
}

/// PERI locked behind `debt`
pub fn locked_collateral(debt: U256, peri_rate: U256, issuance_ratio: U256) -> U256 {
    if debt.is_zero() {
        return U256::zero();
    }
    if issuance_ratio.is_zero() || peri_rate.is_zero() {
        return U256::MAX;
    }
    divide_decimal_round(divide_decimal_round(debt, issuance_ratio), peri_rate)
}

/// Wallet PERI free to leave the account
pub fn transferable(
    balances: &CollateralBalances,
    debt: U256,
    peri_rate: U256,
    issuance_ratio: U256,
) -> U256 {
    let locked = locked_collateral(debt, peri_rate, issuance_ratio);
    let locked_in_wallet = locked.saturating_sub(balances.non_transferable());
    balances.wallet.saturating_sub(locked_in_wallet)
}

/// Debt to collateral value; comparable to the issuance ratio, lower is safer
pub fn collateralisation_ratio(debt: U256, collateral: U256, peri_rate: U256) -> U256 {
    let value = collateral_value(collateral, peri_rate);
    if value.is_zero() {
        return U256::zero();
    }
    divide_decimal(debt, value)
}

/// Debt to burn so the account is back at the issuance ratio; `None` if it already is.
///
/// If the collateral is worth nothing the target is unreachable and the whole
/// debt is returned.
pub fn burn_to_target_amount(debt: U256, max_issuable: U256) -> Option<U256> {
    if debt <= max_issuable {
        return None;
    }
    Some(debt - max_issuable)
}
