//! CollateralEth Contract
//!
//! Collateralised loans against native token collateral. Borrowers lock native
//! tokens and borrow any registered pynth:
//!
//! ```text
//! collateral_ratio = collateral * collateral_rate / ((principal + interest) * currency_rate)
//! max_loan         = collateral * collateral_rate / min_cratio / currency_rate
//! ```
//!
//! Collateral is held in 18 decimal units (motes * 1e9). Withdrawals, closes and
//! liquidation payouts are credited to a pending balance first; `claim` performs
//! the native transfer afterwards.

use odra::prelude::*;
use odra::casper_types::{U256, U512, RuntimeArgs, runtime_args};
use odra::CallDef;
use crate::access_control::AccessControl;
use crate::errors::IssuanceError;
use crate::interest::{accrue_loan, accumulate_index, borrow_rate_per_second, utilisation};
use crate::math::{
    divide_decimal, motes_to_units, multiply_decimal, unit, units_to_motes, whole_motes,
};
use crate::types::{AccountLoanIndex, Loan, LoanStatus, PUSD, SECTION_ISSUANCE, SECTION_SYSTEM};

/// Default minimum collateral ratio (1.3)
pub const DEFAULT_MIN_CRATIO: u128 = 1_300_000_000_000_000_000;

/// Default minimum collateral per loan (2 units)
pub const DEFAULT_MIN_COLLATERAL: u128 = 2_000_000_000_000_000_000;

/// Default issue fee (0.1%)
pub const DEFAULT_ISSUE_FEE_RATE: u128 = 1_000_000_000_000_000;

/// Default liquidation penalty (10%)
pub const DEFAULT_LIQUIDATION_PENALTY: u128 = 100_000_000_000_000_000;

#[odra::event]
pub struct LoanCreated {
    pub account: Address,
    pub id: u64,
    pub amount: U256,
    pub collateral: U256,
    pub currency: String,
    pub issuance_fee: U256,
}

#[odra::event]
pub struct LoanRepaymentMade {
    pub account: Address,
    pub repayer: Address,
    pub id: u64,
    pub amount_repaid: U256,
    pub amount_after: U256,
}

#[odra::event]
pub struct LoanPartiallyLiquidated {
    pub account: Address,
    pub id: u64,
    pub liquidator: Address,
    pub amount_liquidated: U256,
    pub collateral_liquidated: U256,
}

#[odra::event]
pub struct LoanClosedByLiquidation {
    pub account: Address,
    pub id: u64,
    pub liquidator: Address,
    pub amount_liquidated: U256,
    pub collateral_liquidated: U256,
}

#[odra::event]
pub struct LoanClosed {
    pub account: Address,
    pub id: u64,
}

#[odra::event]
pub struct CollateralDeposited {
    pub account: Address,
    pub id: u64,
    pub amount: U256,
    pub collateral_after: U256,
}

#[odra::event]
pub struct CollateralWithdrawn {
    pub account: Address,
    pub id: u64,
    pub amount: U256,
    pub collateral_after: U256,
}

#[odra::event]
pub struct LoanDrawnDown {
    pub account: Address,
    pub id: u64,
    pub amount: U256,
}

#[odra::event]
pub struct PendingWithdrawalClaimed {
    pub account: Address,
    pub amount: U256,
}

/// Native token collateralised loan manager
#[odra::module(events = [
    LoanCreated,
    LoanRepaymentMade,
    LoanPartiallyLiquidated,
    LoanClosedByLiquidation,
    LoanClosed,
    CollateralDeposited,
    CollateralWithdrawn,
    LoanDrawnDown,
    PendingWithdrawalClaimed
])]
pub struct CollateralEth {
    access: SubModule<AccessControl>,
    exchange_rates: Var<Address>,
    system_status: Var<Address>,
    /// Receives issue fees and interest, in pUSD
    fee_pool: Var<Address>,
    /// Rate key pricing the collateral, e.g. "pETH"
    collateral_key: Var<String>,
    loans: Mapping<u64, Loan>,
    next_loan_id: Var<u64>,
    /// Loan count per borrower
    account_loan_count: Mapping<Address, u64>,
    /// (borrower, index) -> loan id
    account_loan_ids: Mapping<AccountLoanIndex, u64>,
    /// Borrowable currencies
    currency_keys: Var<Vec<String>>,
    pynths: Mapping<String, Address>,
    /// Outstanding principal per currency
    total_loans: Mapping<String, U256>,
    total_collateral: Var<U256>,
    pending_withdrawals: Mapping<Address, U256>,
    interest_index: Var<U256>,
    index_updated_at: Var<u64>,
    min_cratio: Var<U256>,
    /// Unset means the minimum collateral ratio
    liquidation_ratio: Var<Option<U256>>,
    min_collateral: Var<U256>,
    issue_fee_rate: Var<U256>,
    liquidation_penalty: Var<U256>,
    /// Per-second base borrow rate
    base_borrow_rate: Var<U256>,
}

#[odra::module]
impl CollateralEth {
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        owner: Address,
        exchange_rates: Address,
        system_status: Address,
        fee_pool: Address,
        collateral_key: String,
        min_cratio: U256,
        min_collateral: U256,
        issue_fee_rate: U256,
        base_borrow_rate: U256,
    ) {
        self.access.init(owner);
        self.exchange_rates.set(exchange_rates);
        self.system_status.set(system_status);
        self.fee_pool.set(fee_pool);
        self.collateral_key.set(collateral_key);
        self.liquidation_penalty.set(U256::from(DEFAULT_LIQUIDATION_PENALTY));
        self.validate_ratios(min_cratio, None);
        self.min_cratio.set(min_cratio);
        self.liquidation_ratio.set(None);
        self.min_collateral.set(min_collateral);
        self.issue_fee_rate.set(issue_fee_rate);
        self.base_borrow_rate.set(base_borrow_rate);
        self.currency_keys.set(Vec::new());
        self.next_loan_id.set(1);
        self.total_collateral.set(U256::zero());
        self.interest_index.set(U256::zero());
        self.index_updated_at.set(self.env().get_block_time_secs());
    }

    // ========== Loan Lifecycle ==========

    /// Open a loan of `loan_amount` in `currency` against the attached native tokens.
    /// Returns the loan id.
    #[odra(payable)]
    pub fn open(&mut self, loan_amount: U256, currency: String) -> u64 {
        self.require_active();
        let borrower = self.env().caller();
        let pynth = self.require_currency(&currency);
        self.require_fresh_rates(&currency);

        let collateral = self.attached_collateral();
        if collateral < self.min_collateral() {
            self.env().revert(IssuanceError::NotEnoughCollateral);
        }
        if loan_amount.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }
        if loan_amount > self.max_loan(collateral, currency.clone()) {
            self.env().revert(IssuanceError::ExceedsMaxBorrowPower);
        }

        let index = self.accrue_index();
        let id = self.next_loan_id.get().unwrap_or(1);
        self.next_loan_id.set(id + 1);
        let loan = Loan {
            id,
            account: borrower,
            collateral,
            currency: currency.clone(),
            principal: loan_amount,
            accrued_interest: U256::zero(),
            interest_index: index,
            status: LoanStatus::Open,
        };
        self.loans.set(&id, loan);
        self.push_account_loan(borrower, id);
        self.total_loans.set(&currency, self.total_loans(currency.clone()) + loan_amount);
        self.total_collateral.set(self.total_collateral() + collateral);

        let fee = multiply_decimal(loan_amount, self.issue_fee_rate());
        self.pynth_issue(pynth, borrower, loan_amount - fee);
        self.pay_fee_pool(&currency, fee);

        self.env().emit_event(LoanCreated {
            account: borrower,
            id,
            amount: loan_amount,
            collateral,
            currency,
            issuance_fee: fee,
        });
        id
    }

    /// Add the attached native tokens to a loan's collateral
    #[odra(payable)]
    pub fn deposit(&mut self, borrower: Address, id: u64) {
        self.require_active();
        let amount = self.attached_collateral();
        if amount.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }
        let mut loan = self.open_loan_of(borrower, id);
        self.accrue_loan_interest(&mut loan);

        loan.collateral += amount;
        self.total_collateral.set(self.total_collateral() + amount);
        let collateral_after = loan.collateral;
        self.loans.set(&id, loan);

        self.env().emit_event(CollateralDeposited { account: borrower, id, amount, collateral_after });
    }

    /// Move collateral to the caller's pending withdrawals
    pub fn withdraw(&mut self, id: u64, amount: U256) {
        self.require_active();
        let borrower = self.env().caller();
        let mut loan = self.borrower_loan(borrower, id);
        if amount.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }
        self.require_fresh_rates(&loan.currency);
        self.accrue_loan_interest(&mut loan);

        if amount >= loan.collateral {
            self.env().revert(IssuanceError::CratioTooLow);
        }
        loan.collateral -= amount;
        if self.ratio_of(&loan) < self.min_cratio() {
            self.env().revert(IssuanceError::CratioTooLow);
        }

        self.total_collateral.set(self.total_collateral() - amount);
        self.credit_pending(borrower, amount);
        let collateral_after = loan.collateral;
        self.loans.set(&id, loan);

        self.env().emit_event(CollateralWithdrawn { account: borrower, id, amount, collateral_after });
    }

    /// Borrow more against an open loan; charges the issue fee
    pub fn draw(&mut self, id: u64, amount: U256) {
        self.require_active();
        let borrower = self.env().caller();
        let mut loan = self.borrower_loan(borrower, id);
        if amount.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }
        let pynth = self.require_currency(&loan.currency);
        self.require_fresh_rates(&loan.currency);
        self.accrue_loan_interest(&mut loan);

        loan.principal += amount;
        if self.ratio_of(&loan) < self.min_cratio() {
            self.env().revert(IssuanceError::CratioTooLow);
        }

        let currency = loan.currency.clone();
        self.total_loans.set(&currency, self.total_loans(currency.clone()) + amount);
        self.loans.set(&id, loan);

        let fee = multiply_decimal(amount, self.issue_fee_rate());
        self.pynth_issue(pynth, borrower, amount - fee);
        self.pay_fee_pool(&currency, fee);

        self.env().emit_event(LoanDrawnDown { account: borrower, id, amount });
    }

    /// Pay down a loan with the caller's pynths; interest is settled before principal
    pub fn repay(&mut self, borrower: Address, id: u64, amount: U256) {
        self.require_active();
        let repayer = self.env().caller();
        if amount.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }
        let mut loan = self.open_loan_of(borrower, id);
        let pynth = self.require_currency(&loan.currency);
        if self.pynth_balance_of(pynth, repayer) < amount {
            self.env().revert(IssuanceError::NotEnoughBalance);
        }
        self.accrue_loan_interest(&mut loan);
        if amount > loan.owing() {
            self.env().revert(IssuanceError::PaymentExceedsOwing);
        }

        let (interest_paid, principal_paid) = split_payment(&mut loan, amount);
        let currency = loan.currency.clone();
        self.reduce_total_loans(&currency, principal_paid);
        let amount_after = loan.principal;
        self.loans.set(&id, loan);

        self.pynth_burn(pynth, repayer, amount);
        self.pay_fee_pool(&currency, interest_paid);

        self.env().emit_event(LoanRepaymentMade {
            account: borrower,
            repayer,
            id,
            amount_repaid: amount,
            amount_after,
        });
    }

    /// Liquidate an undercollateralised loan.
    ///
    /// The caller pays at most the amount that restores the liquidation ratio and
    /// receives the matching collateral plus the penalty. When that covers the whole
    /// debt, or would take all the collateral, the loan is closed: `amount` must then
    /// cover everything owed, the liquidator pays exactly that and any collateral left
    /// over goes back to the borrower.
    pub fn liquidate(&mut self, borrower: Address, id: u64, amount: U256) {
        self.require_active();
        let liquidator = self.env().caller();
        if amount.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }
        let mut loan = self.open_loan_of(borrower, id);
        let pynth = self.require_currency(&loan.currency);
        let balance = self.pynth_balance_of(pynth, liquidator);
        if balance < amount {
            self.env().revert(IssuanceError::NotEnoughBalance);
        }
        self.require_fresh_rates(&loan.currency);
        self.accrue_loan_interest(&mut loan);
        if self.ratio_of(&loan) >= self.liquidation_ratio() {
            self.env().revert(IssuanceError::CratioAboveLiqRatio);
        }

        let currency = loan.currency.clone();
        let owing = loan.owing();
        let to_liquidate = self.liquidation_amount_of(&loan).min(amount);
        // rounding can leave a ratio a hair under target with nothing to repay
        if to_liquidate.is_zero() {
            self.env().revert(IssuanceError::CratioAboveLiqRatio);
        }
        let redeemed = self.collateral_redeemed(currency.clone(), to_liquidate);

        if to_liquidate >= owing || redeemed >= loan.collateral {
            if amount < owing {
                self.env().revert(IssuanceError::LiquidationBelowOwing);
            }
            let seized = self.collateral_redeemed(currency.clone(), owing).min(loan.collateral);
            let residual = loan.collateral - seized;
            let interest = loan.accrued_interest;

            self.reduce_total_loans(&currency, loan.principal);
            self.total_collateral.set(self.total_collateral() - loan.collateral);
            self.credit_pending(liquidator, seized);
            if !residual.is_zero() {
                self.credit_pending(borrower, residual);
            }
            close_loan(&mut loan);
            self.loans.set(&id, loan);

            self.pynth_burn(pynth, liquidator, owing);
            self.pay_fee_pool(&currency, interest);

            self.env().emit_event(LoanClosedByLiquidation {
                account: borrower,
                id,
                liquidator,
                amount_liquidated: owing,
                collateral_liquidated: seized,
            });
            return;
        }

        let (interest_paid, principal_paid) = split_payment(&mut loan, to_liquidate);
        loan.collateral -= redeemed;
        self.reduce_total_loans(&currency, principal_paid);
        self.total_collateral.set(self.total_collateral() - redeemed);
        self.credit_pending(liquidator, redeemed);
        self.loans.set(&id, loan);

        self.pynth_burn(pynth, liquidator, to_liquidate);
        self.pay_fee_pool(&currency, interest_paid);

        self.env().emit_event(LoanPartiallyLiquidated {
            account: borrower,
            id,
            liquidator,
            amount_liquidated: to_liquidate,
            collateral_liquidated: redeemed,
        });
    }

    /// Repay everything owed and release the collateral to pending withdrawals
    pub fn close(&mut self, id: u64) {
        self.require_active();
        let borrower = self.env().caller();
        let mut loan = self.borrower_loan(borrower, id);
        let pynth = self.require_currency(&loan.currency);
        self.accrue_loan_interest(&mut loan);

        let owing = loan.owing();
        if self.pynth_balance_of(pynth, borrower) < owing {
            self.env().revert(IssuanceError::NotEnoughBalance);
        }

        let currency = loan.currency.clone();
        let interest = loan.accrued_interest;
        self.reduce_total_loans(&currency, loan.principal);
        self.total_collateral.set(self.total_collateral() - loan.collateral);
        self.credit_pending(borrower, loan.collateral);
        close_loan(&mut loan);
        self.loans.set(&id, loan);

        self.pynth_burn(pynth, borrower, owing);
        self.pay_fee_pool(&currency, interest);

        self.env().emit_event(LoanClosed { account: borrower, id });
    }

    /// Send up to the caller's pending withdrawal as native tokens. Only whole
    /// motes leave; the sub-mote remainder of `amount` stays pending.
    pub fn claim(&mut self, amount: U256) {
        let account = self.env().caller();
        let pending = self.pending_withdrawals(account);
        if amount > pending {
            self.env().revert(IssuanceError::ClaimExceedsPending);
        }
        let paid = whole_motes(amount);
        if paid.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }

        self.pending_withdrawals.set(&account, pending - paid);
        self.env().transfer_tokens(&account, &units_to_motes(paid));

        self.env().emit_event(PendingWithdrawalClaimed { account, amount: paid });
    }

    // ========== Views ==========

    pub fn get_loan(&self, id: u64) -> Option<Loan> {
        self.loans.get(&id)
    }

    /// Every loan id the account ever opened, in opening order
    pub fn loans_of(&self, account: Address) -> Vec<u64> {
        let count = self.account_loan_count.get(&account).unwrap_or(0);
        let mut ids = Vec::new();
        for index in 0..count {
            if let Some(id) = self.account_loan_ids.get(&AccountLoanIndex { account, index }) {
                ids.push(id);
            }
        }
        ids
    }

    /// Collateral value over debt value, including interest not yet accrued
    pub fn collateral_ratio(&self, id: u64) -> U256 {
        let Some(mut loan) = self.loans.get(&id) else {
            self.env().revert(IssuanceError::LoanNotFound)
        };
        let pending = accrue_loan(loan.principal, loan.interest_index, self.current_index());
        loan.accrued_interest += pending.interest_accrued;
        self.ratio_of(&loan)
    }

    /// Largest loan in `currency` that `collateral` supports at the minimum ratio
    pub fn max_loan(&self, collateral: U256, currency: String) -> U256 {
        let collateral_value = self.to_pusd(&self.collateral_key(), collateral);
        let max_value = divide_decimal(collateral_value, self.min_cratio());
        self.from_pusd(&currency, max_value)
    }

    /// Amount of the loan's currency that restores the liquidation ratio
    pub fn liquidation_amount(&self, id: u64) -> U256 {
        let Some(mut loan) = self.loans.get(&id) else {
            self.env().revert(IssuanceError::LoanNotFound)
        };
        let pending = accrue_loan(loan.principal, loan.interest_index, self.current_index());
        loan.accrued_interest += pending.interest_accrued;
        self.liquidation_amount_of(&loan)
    }

    /// Collateral paid out, penalty included, for `amount` of `currency`
    pub fn collateral_redeemed(&self, currency: String, amount: U256) -> U256 {
        let value = self.to_pusd(&currency, amount);
        let collateral = self.from_pusd(&self.collateral_key(), value);
        multiply_decimal(collateral, unit() + self.liquidation_penalty())
    }

    pub fn pending_withdrawals(&self, account: Address) -> U256 {
        self.pending_withdrawals.get(&account).unwrap_or(U256::zero())
    }

    pub fn total_loans(&self, currency: String) -> U256 {
        self.total_loans.get(&currency).unwrap_or(U256::zero())
    }

    pub fn total_collateral(&self) -> U256 {
        self.total_collateral.get().unwrap_or(U256::zero())
    }

    pub fn interest_index(&self) -> U256 {
        self.current_index()
    }

    /// Current per-second borrow rate
    pub fn borrow_rate(&self) -> U256 {
        borrow_rate_per_second(self.base_borrow_rate(), self.utilisation())
    }

    pub fn currencies(&self) -> Vec<String> {
        self.currency_keys.get().unwrap_or_default()
    }

    pub fn collateral_key(&self) -> String {
        self.collateral_key.get().unwrap_or_default()
    }

    pub fn min_cratio(&self) -> U256 {
        self.min_cratio.get().unwrap_or(U256::from(DEFAULT_MIN_CRATIO))
    }

    pub fn liquidation_ratio(&self) -> U256 {
        self.liquidation_ratio.get().flatten().unwrap_or(self.min_cratio())
    }

    pub fn min_collateral(&self) -> U256 {
        self.min_collateral.get().unwrap_or(U256::from(DEFAULT_MIN_COLLATERAL))
    }

    pub fn issue_fee_rate(&self) -> U256 {
        self.issue_fee_rate.get().unwrap_or(U256::from(DEFAULT_ISSUE_FEE_RATE))
    }

    pub fn liquidation_penalty(&self) -> U256 {
        self.liquidation_penalty.get().unwrap_or(U256::from(DEFAULT_LIQUIDATION_PENALTY))
    }

    pub fn base_borrow_rate(&self) -> U256 {
        self.base_borrow_rate.get().unwrap_or(U256::zero())
    }

    pub fn fee_pool(&self) -> Option<Address> {
        self.fee_pool.get()
    }

    // ========== Admin Functions ==========

    /// Register a borrowable pynth (owner only)
    pub fn add_pynth(&mut self, pynth: Address) {
        self.access.require_owner();
        let call_def = CallDef::new("currency_key", false, RuntimeArgs::new());
        let currency_key: String = self.env().call_contract(pynth, call_def);
        if self.pynths.get(&currency_key).is_some() {
            self.env().revert(IssuanceError::PynthExists);
        }
        let mut keys = self.currencies();
        keys.push(currency_key.clone());
        self.currency_keys.set(keys);
        self.pynths.set(&currency_key, pynth);
    }

    pub fn set_min_cratio(&mut self, ratio: U256) {
        self.access.require_owner();
        self.validate_ratios(ratio, self.liquidation_ratio.get().flatten());
        self.min_cratio.set(ratio);
    }

    pub fn set_liquidation_ratio(&mut self, ratio: U256) {
        self.access.require_owner();
        self.validate_ratios(self.min_cratio(), Some(ratio));
        self.liquidation_ratio.set(Some(ratio));
    }

    pub fn set_min_collateral(&mut self, amount: U256) {
        self.access.require_owner();
        self.min_collateral.set(amount);
    }

    pub fn set_issue_fee_rate(&mut self, rate: U256) {
        self.access.require_owner();
        if rate >= unit() {
            self.env().revert(IssuanceError::InvalidConfig);
        }
        self.issue_fee_rate.set(rate);
    }

    pub fn set_liquidation_penalty(&mut self, penalty: U256) {
        self.access.require_owner();
        self.liquidation_penalty.set(penalty);
        self.validate_ratios(self.min_cratio(), self.liquidation_ratio.get().flatten());
    }

    pub fn set_base_borrow_rate(&mut self, rate: U256) {
        self.access.require_owner();
        self.accrue_index();
        self.base_borrow_rate.set(rate);
    }

    pub fn set_fee_pool(&mut self, fee_pool: Address) {
        self.access.require_owner();
        self.fee_pool.set(fee_pool);
    }

    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.access.grant_role(role_id, account);
    }

    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.access.revoke_role(role_id, account);
    }
}

impl CollateralEth {
    // ========== Loans ==========

    fn open_loan_of(&self, borrower: Address, id: u64) -> Loan {
        let Some(loan) = self.loans.get(&id) else {
            self.env().revert(IssuanceError::LoanNotFound)
        };
        if loan.account != borrower {
            self.env().revert(IssuanceError::LoanNotFound);
        }
        if !loan.is_open() {
            self.env().revert(IssuanceError::LoanClosed);
        }
        loan
    }

    /// Like `open_loan_of`, but a loan owned by someone else is an authorization error
    fn borrower_loan(&self, caller: Address, id: u64) -> Loan {
        let Some(loan) = self.loans.get(&id) else {
            self.env().revert(IssuanceError::LoanNotFound)
        };
        if loan.account != caller {
            self.env().revert(IssuanceError::MustBeBorrower);
        }
        if !loan.is_open() {
            self.env().revert(IssuanceError::LoanClosed);
        }
        loan
    }

    fn push_account_loan(&mut self, account: Address, id: u64) {
        let index = self.account_loan_count.get(&account).unwrap_or(0);
        self.account_loan_ids.set(&AccountLoanIndex { account, index }, id);
        self.account_loan_count.set(&account, index + 1);
    }

    fn credit_pending(&mut self, account: Address, amount: U256) {
        self.pending_withdrawals.set(&account, self.pending_withdrawals(account) + amount);
    }

    fn reduce_total_loans(&mut self, currency: &String, principal: U256) {
        let total = self.total_loans(currency.clone()).saturating_sub(principal);
        self.total_loans.set(currency, total);
    }

    fn ratio_of(&self, loan: &Loan) -> U256 {
        let debt_value = self.to_pusd(&loan.currency, loan.owing());
        if debt_value.is_zero() {
            return U256::MAX;
        }
        let collateral_value = self.to_pusd(&self.collateral_key(), loan.collateral);
        divide_decimal(collateral_value, debt_value)
    }

    fn liquidation_amount_of(&self, loan: &Loan) -> U256 {
        let debt_value = self.to_pusd(&loan.currency, loan.owing());
        let collateral_value = self.to_pusd(&self.collateral_key(), loan.collateral);
        let value = liquidation_value(
            debt_value,
            collateral_value,
            self.liquidation_ratio(),
            self.liquidation_penalty(),
        );
        self.from_pusd(&loan.currency, value).min(loan.owing())
    }

    // ========== Interest ==========

    fn utilisation(&self) -> U256 {
        let mut loans_value = U256::zero();
        let mut supply_value = U256::zero();
        for currency in self.currencies() {
            let Some(pynth) = self.pynths.get(&currency) else {
                continue;
            };
            loans_value += self.to_pusd(&currency, self.total_loans(currency.clone()));
            supply_value += self.to_pusd(&currency, self.pynth_total_supply(pynth));
        }
        utilisation(loans_value, supply_value)
    }

    fn current_index(&self) -> U256 {
        let index = self.interest_index.get().unwrap_or(U256::zero());
        let updated_at = self.index_updated_at.get().unwrap_or(0);
        let elapsed = self.env().get_block_time_secs().saturating_sub(updated_at);
        accumulate_index(index, self.borrow_rate(), elapsed)
    }

    /// Bring the global index up to now and return it
    fn accrue_index(&mut self) -> U256 {
        let index = self.current_index();
        self.interest_index.set(index);
        self.index_updated_at.set(self.env().get_block_time_secs());
        index
    }

    fn accrue_loan_interest(&mut self, loan: &mut Loan) {
        let index = self.accrue_index();
        let accrual = accrue_loan(loan.principal, loan.interest_index, index);
        loan.accrued_interest += accrual.interest_accrued;
        loan.interest_index = accrual.index;
    }

    // ========== Gates and Configuration ==========

    fn require_active(&self) {
        let Some(status) = self.system_status.get() else {
            self.env().revert(IssuanceError::InvalidConfig)
        };
        let mut sections = Vec::new();
        sections.push(String::from(SECTION_SYSTEM));
        sections.push(String::from(SECTION_ISSUANCE));
        let args = runtime_args! {
            "sections" => sections
        };
        let suspended: bool = self
            .env()
            .call_contract(status, CallDef::new("any_suspended", false, args));
        if suspended {
            self.env().revert(IssuanceError::OperationSuspended);
        }
    }

    fn require_currency(&self, currency: &String) -> Address {
        let Some(pynth) = self.pynths.get(currency) else {
            self.env().revert(IssuanceError::UnsupportedCurrency)
        };
        pynth
    }

    fn require_fresh_rates(&self, currency: &String) {
        let mut keys = Vec::new();
        keys.push(self.collateral_key());
        keys.push(currency.clone());
        let args = runtime_args! {
            "currency_keys" => keys
        };
        let invalid: bool = self
            .env()
            .call_contract(self.rates_addr(), CallDef::new("any_rate_is_invalid", false, args));
        if invalid {
            self.env().revert(IssuanceError::InvalidRate);
        }
    }

    /// The liquidation ratio must sit above 1 + penalty, or liquidating could never
    /// restore it
    fn validate_ratios(&self, min_cratio: U256, liquidation_ratio: Option<U256>) {
        let floor = unit() + self.liquidation_penalty();
        if min_cratio <= floor || liquidation_ratio.unwrap_or(min_cratio) <= floor {
            self.env().revert(IssuanceError::InvalidConfig);
        }
    }

    // ========== Rates ==========

    fn rates_addr(&self) -> Address {
        let Some(rates) = self.exchange_rates.get() else {
            self.env().revert(IssuanceError::InvalidConfig)
        };
        rates
    }

    fn rate_of(&self, currency_key: &String) -> U256 {
        let args = runtime_args! {
            "currency_key" => currency_key.clone()
        };
        self.env()
            .call_contract(self.rates_addr(), CallDef::new("rate_for_currency", false, args))
    }

    fn to_pusd(&self, currency_key: &String, amount: U256) -> U256 {
        if currency_key == PUSD || amount.is_zero() {
            return amount;
        }
        multiply_decimal(amount, self.rate_of(currency_key))
    }

    fn from_pusd(&self, currency_key: &String, value: U256) -> U256 {
        if currency_key == PUSD || value.is_zero() {
            return value;
        }
        divide_decimal(value, self.rate_of(currency_key))
    }

    // ========== Collateral and Pynths ==========

    fn attached_collateral(&self) -> U256 {
        let attached: U512 = self.env().attached_value();
        match motes_to_units(attached) {
            Some(units) => units,
            None => self.env().revert(IssuanceError::AmountTooLarge),
        }
    }

    /// Mint the pUSD value of `amount` of `currency` to the fee pool
    fn pay_fee_pool(&self, currency: &String, amount: U256) {
        if amount.is_zero() {
            return;
        }
        let Some(fee_pool) = self.fee_pool.get() else {
            return;
        };
        let value = self.to_pusd(currency, amount);
        let pusd = self.require_currency(&String::from(PUSD));
        self.pynth_issue(pusd, fee_pool, value);
    }

    fn pynth_total_supply(&self, pynth: Address) -> U256 {
        self.env()
            .call_contract(pynth, CallDef::new("total_supply", false, RuntimeArgs::new()))
    }

    fn pynth_balance_of(&self, pynth: Address, account: Address) -> U256 {
        let args = runtime_args! {
            "account" => account
        };
        self.env()
            .call_contract(pynth, CallDef::new("balance_of", false, args))
    }

    fn pynth_issue(&self, pynth: Address, account: Address, amount: U256) {
        let args = runtime_args! {
            "account" => account,
            "amount" => amount
        };
        self.env()
            .call_contract::<()>(pynth, CallDef::new("issue", true, args));
    }

    fn pynth_burn(&self, pynth: Address, account: Address, amount: U256) {
        let args = runtime_args! {
            "account" => account,
            "amount" => amount
        };
        self.env()
            .call_contract::<()>(pynth, CallDef::new("burn", true, args));
    }
}

/// Apply a payment to a loan, interest first. Returns (interest paid, principal paid).
pub fn split_payment(loan: &mut Loan, amount: U256) -> (U256, U256) {
    let interest_paid = amount.min(loan.accrued_interest);
    let principal_paid = (amount - interest_paid).min(loan.principal);
    loan.accrued_interest -= interest_paid;
    loan.principal -= principal_paid;
    (interest_paid, principal_paid)
}

/// pUSD value to repay so that `collateral_value / debt_value` returns to `target`,
/// given the liquidator takes `1 + penalty` of what they repay in collateral:
///
/// ```text
/// (debt * target - collateral) / (target - (1 + penalty))
/// ```
pub fn liquidation_value(
    debt_value: U256,
    collateral_value: U256,
    target: U256,
    penalty: U256,
) -> U256 {
    let floor = unit() + penalty;
    if target <= floor {
        return debt_value;
    }
    let dividend = multiply_decimal(debt_value, target).saturating_sub(collateral_value);
    divide_decimal(dividend, target - floor)
}

fn close_loan(loan: &mut Loan) {
    loan.collateral = U256::zero();
    loan.principal = U256::zero();
    loan.accrued_interest = U256::zero();
    loan.interest_index = U256::zero();
    loan.status = LoanStatus::Closed;
}
