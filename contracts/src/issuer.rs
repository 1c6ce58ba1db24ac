//! Issuer Contract
//!
//! Issues and burns pUSD against PERI collateral and keeps the debt pool
//! consistent. Every mutating entry point follows the same sequence:
//!
//! 1. gate: system and issuance sections must be active, rates fresh
//! 2. compute: amounts checked against the account's capacity or debt
//! 3. circuit breaker: a tripped breaker accepts the call but moves nothing
//! 4. mutate: debt shares, pUSD supply, cross-chain issued debt, debt cache
//!
//! Collaborators (rates, status gate, PERI, escrows, pynths) are injected as
//! addresses at construction or through owner setters.

use odra::prelude::*;
use odra::casper_types::{U256, RuntimeArgs, runtime_args};
use odra::CallDef;
use crate::access_control::{
    AccessControl, ROLE_BRIDGE, ROLE_DEBT_MANAGER, ROLE_TRUSTED_MINTER,
};
use crate::collateral::{
    burn_to_target_amount, collateralisation_ratio, max_issuable,
    remaining_issuable, transferable, CollateralBalances,
};
use crate::cross_chain::{CrossChainDebtReconciler, CrossNetworkDebtsUpdated, NetworkIssuedDebtChanged};
use crate::debt_cache::{CircuitBroken, CircuitReset, DebtCache, DebtCacheUpdated};
use crate::debt_ledger::{DebtLedger, DebtShareBurned, DebtShareMinted};
use crate::errors::IssuanceError;
use crate::math::{multiply_decimal, unit};
use crate::types::{IssuanceCapacity, MigrationDirection, PERI, PUSD, SECTION_ISSUANCE, SECTION_SYSTEM};

/// Default issuance ratio (0.2, i.e. 500% collateralisation)
pub const DEFAULT_ISSUANCE_RATIO: u128 = 200_000_000_000_000_000;

/// Default minimum time between issuing and burning (1 day)
pub const DEFAULT_MINIMUM_STAKE_TIME: u64 = 86_400;

/// Debt issued against collateral
#[odra::event]
pub struct DebtIssued {
    pub account: Address,
    pub amount: U256,
    pub debt_balance: U256,
    pub total_shares: U256,
}

/// Debt burned
#[odra::event]
pub struct DebtBurned {
    pub account: Address,
    pub amount: U256,
    pub debt_balance: U256,
    pub total_shares: U256,
}

#[odra::event]
pub struct PynthAdded {
    pub currency_key: String,
    pub pynth: Address,
}

#[odra::event]
pub struct PynthRemoved {
    pub currency_key: String,
    pub pynth: Address,
}

/// A delegate was allowed or disallowed to issue or burn for an account
#[odra::event]
pub struct DelegateApprovalChanged {
    pub authoriser: Address,
    pub delegate: Address,
    pub power: String,
    pub approved: bool,
}

/// Issuer contract
#[odra::module(events = [
    DebtIssued,
    DebtBurned,
    PynthAdded,
    PynthRemoved,
    DelegateApprovalChanged,
    DebtShareMinted,
    DebtShareBurned,
    DebtCacheUpdated,
    CircuitBroken,
    CircuitReset,
    CrossNetworkDebtsUpdated,
    NetworkIssuedDebtChanged
])]
pub struct Issuer {
    access: SubModule<AccessControl>,
    ledger: SubModule<DebtLedger>,
    cache: SubModule<DebtCache>,
    cross_chain: SubModule<CrossChainDebtReconciler>,
    exchange_rates: Var<Address>,
    system_status: Var<Address>,
    peri_token: Var<Address>,
    escrow: Var<Option<Address>>,
    reward_escrow: Var<Option<Address>>,
    /// Registered currency keys, pUSD first once added
    pynth_keys: Var<Vec<String>>,
    pynths: Mapping<String, Option<Address>>,
    /// Maximum debt per unit of collateral value
    issuance_ratio: Var<U256>,
    /// Seconds an account must wait after issuing before it may burn
    minimum_stake_time: Var<u64>,
    last_issue_event: Mapping<Address, u64>,
    /// (authoriser, delegate) -> may issue
    issue_approvals: Mapping<(Address, Address), bool>,
    /// (authoriser, delegate) -> may burn
    burn_approvals: Mapping<(Address, Address), bool>,
    debt_migrator: Var<Option<Address>>,
    migration_direction: Var<MigrationDirection>,
    /// Block time (seconds) the pool last went from no shares to some. Debt
    /// ratios published at or before it describe an older pool and are ignored.
    debt_ratio_reset_at: Var<u64>,
}

#[odra::module]
impl Issuer {
    pub fn init(
        &mut self,
        owner: Address,
        exchange_rates: Address,
        system_status: Address,
        peri_token: Address,
        issuance_ratio: U256,
        minimum_stake_time: u64,
    ) {
        if issuance_ratio.is_zero() || issuance_ratio > unit() {
            self.env().revert(IssuanceError::InvalidConfig);
        }
        self.access.init(owner);
        self.exchange_rates.set(exchange_rates);
        self.system_status.set(system_status);
        self.peri_token.set(peri_token);
        self.escrow.set(None);
        self.reward_escrow.set(None);
        self.pynth_keys.set(Vec::new());
        self.issuance_ratio.set(issuance_ratio);
        self.minimum_stake_time.set(minimum_stake_time);
        self.debt_migrator.set(None);
    }

    // ========== Issuance ==========

    pub fn issue_pynths(&mut self, amount: U256) {
        let caller = self.env().caller();
        self.issue_for(caller, Some(amount));
    }

    pub fn issue_max_pynths(&mut self) {
        let caller = self.env().caller();
        self.issue_for(caller, None);
    }

    pub fn issue_pynths_on_behalf(&mut self, issue_for: Address, amount: U256) {
        self.require_issue_approval(issue_for);
        self.issue_for(issue_for, Some(amount));
    }

    pub fn issue_max_pynths_on_behalf(&mut self, issue_for: Address) {
        self.require_issue_approval(issue_for);
        self.issue_for(issue_for, None);
    }

    // ========== Burning ==========

    /// Burn up to `amount` of the caller's debt; larger requests are capped at the debt
    pub fn burn_pynths(&mut self, amount: U256) {
        let caller = self.env().caller();
        self.burn_for(caller, Some(amount));
    }

    /// Burn just enough debt to restore the issuance ratio
    pub fn burn_pynths_to_target(&mut self) {
        let caller = self.env().caller();
        self.burn_for(caller, None);
    }

    pub fn burn_pynths_on_behalf(&mut self, burn_for: Address, amount: U256) {
        self.require_burn_approval(burn_for);
        self.burn_for(burn_for, Some(amount));
    }

    pub fn burn_pynths_to_target_on_behalf(&mut self, burn_for: Address) {
        self.require_burn_approval(burn_for);
        self.burn_for(burn_for, None);
    }

    /// Burn the caller's whole debt
    pub fn exit(&mut self) {
        let caller = self.env().caller();
        self.burn_for(caller, Some(U256::MAX));
    }

    // ========== Delegation ==========

    pub fn approve_issue_on_behalf(&mut self, delegate: Address) {
        self.set_approval(delegate, "issue", true);
    }

    pub fn approve_burn_on_behalf(&mut self, delegate: Address) {
        self.set_approval(delegate, "burn", true);
    }

    pub fn remove_issue_on_behalf(&mut self, delegate: Address) {
        self.set_approval(delegate, "issue", false);
    }

    pub fn remove_burn_on_behalf(&mut self, delegate: Address) {
        self.set_approval(delegate, "burn", false);
    }

    pub fn can_issue_for(&self, authoriser: Address, delegate: Address) -> bool {
        self.issue_approvals.get(&(authoriser, delegate)).unwrap_or(false)
    }

    pub fn can_burn_for(&self, authoriser: Address, delegate: Address) -> bool {
        self.burn_approvals.get(&(authoriser, delegate)).unwrap_or(false)
    }

    // ========== Account Views ==========

    pub fn debt_balance_of(&self, account: Address) -> U256 {
        self.ledger.debt_value_of(account, self.effective_debt_ratio())
    }

    pub fn debt_share_balance_of(&self, account: Address) -> U256 {
        self.ledger.share_balance_of(account)
    }

    pub fn total_debt_shares(&self) -> U256 {
        self.ledger.total_shares()
    }

    /// Debt value per share; 1.0 until the first share exists
    pub fn debt_ratio(&self) -> U256 {
        self.effective_debt_ratio()
    }

    /// PERI backing the account: wallet plus both escrows
    pub fn collateral(&self, account: Address) -> U256 {
        self.collateral_balances(account).total()
    }

    pub fn max_issuable_pynths(&self, account: Address) -> U256 {
        let (peri_rate, _) = self.rate_of(PERI);
        max_issuable(self.collateral(account), peri_rate, self.issuance_ratio())
    }

    pub fn remaining_issuable_pynths(&self, account: Address) -> IssuanceCapacity {
        let max = self.max_issuable_pynths(account);
        let issued = self.debt_balance_of(account);
        IssuanceCapacity {
            max_issuable: max,
            already_issued: issued,
            remaining: remaining_issuable(max, issued),
        }
    }

    /// Debt over collateral value, comparable to the issuance ratio
    pub fn collateralisation_ratio(&self, account: Address) -> U256 {
        let (peri_rate, _) = self.rate_of(PERI);
        collateralisation_ratio(self.debt_balance_of(account), self.collateral(account), peri_rate)
    }

    /// Part of `balance` PERI the account may transfer out of its wallet.
    ///
    /// Accounts without debt can move everything. Otherwise the PERI rate and the
    /// debt ratio must be fresh.
    pub fn transferable_peri(&self, account: Address, balance: U256) -> U256 {
        if self.ledger.share_balance_of(account).is_zero() {
            return balance;
        }
        let (peri_rate, peri_stale) = self.rate_of(PERI);
        let (_, ratio_stale, _) = self.oracle_debt_ratio();
        if peri_stale || ratio_stale {
            self.env().revert(IssuanceError::InvalidRate);
        }
        let (escrowed, reward_escrowed) = self.escrowed_balances(account);
        let balances = CollateralBalances { wallet: balance, escrowed, reward_escrowed };
        transferable(&balances, self.debt_balance_of(account), peri_rate, self.issuance_ratio())
    }

    pub fn last_issue_event(&self, account: Address) -> u64 {
        self.last_issue_event.get(&account).unwrap_or(0)
    }

    /// False while the minimum stake time since the account's last issue is running
    pub fn can_burn_pynths(&self, account: Address) -> bool {
        let Some(issued_at) = self.last_issue_event.get(&account) else {
            return true;
        };
        self.env().get_block_time_secs() >= issued_at.saturating_add(self.minimum_stake_time())
    }

    // ========== System Views ==========

    /// pUSD value of all registered pynths, frozen while the breaker is tripped
    pub fn total_issued_pynths(&self) -> U256 {
        self.cache.current_debt()
    }

    pub fn cached_debt(&self) -> U256 {
        self.cache.cached_debt()
    }

    pub fn last_good_debt(&self) -> U256 {
        self.cache.last_good_debt()
    }

    pub fn is_circuit_broken(&self) -> bool {
        self.cache.is_broken()
    }

    pub fn debt_deviation_threshold(&self) -> U256 {
        self.cache.deviation_threshold()
    }

    pub fn any_rate_is_invalid(&self) -> bool {
        let (_, stale) = self.rates_of(self.collateral_keys());
        let (_, ratio_stale, _) = self.oracle_debt_ratio();
        stale || ratio_stale
    }

    pub fn issuance_ratio(&self) -> U256 {
        self.issuance_ratio.get().unwrap_or(U256::from(DEFAULT_ISSUANCE_RATIO))
    }

    pub fn minimum_stake_time(&self) -> u64 {
        self.minimum_stake_time.get().unwrap_or(DEFAULT_MINIMUM_STAKE_TIME)
    }

    pub fn available_currency_keys(&self) -> Vec<String> {
        self.pynth_keys.get().unwrap_or_default()
    }

    pub fn pynth(&self, currency_key: String) -> Option<Address> {
        self.pynths.get(&currency_key).flatten()
    }

    // ========== Debt Cache ==========

    /// Revalue every registered pynth supply at current rates (anyone may call)
    pub fn take_debt_snapshot(&mut self) {
        let keys = self.available_currency_keys();
        let (rates, any_stale) = self.rates_of(keys.clone());
        if any_stale {
            self.env().revert(IssuanceError::InvalidRate);
        }
        let mut total = U256::zero();
        for (key, rate) in keys.into_iter().zip(rates) {
            let supply = self.pynth_total_supply(self.require_pynth(&key));
            total += multiply_decimal(supply, rate);
        }
        self.cache.record_snapshot(total);
    }

    pub fn reset_circuit_breaker(&mut self) {
        self.access.require_owner();
        self.cache.reset();
    }

    pub fn set_debt_deviation_threshold(&mut self, threshold: U256) {
        self.access.require_owner();
        self.cache.set_deviation_threshold(threshold);
    }

    // ========== Pynth Registry ==========

    pub fn add_pynth(&mut self, pynth: Address) {
        self.access.require_owner();
        let call_def = CallDef::new("currency_key", false, RuntimeArgs::new());
        let currency_key: String = self.env().call_contract(pynth, call_def);
        if self.pynth(currency_key.clone()).is_some() {
            self.env().revert(IssuanceError::PynthExists);
        }

        let mut keys = self.available_currency_keys();
        keys.push(currency_key.clone());
        self.pynth_keys.set(keys);
        self.pynths.set(&currency_key, Some(pynth));

        self.env().emit_event(PynthAdded { currency_key, pynth });
    }

    /// Deregister a pynth. pUSD and pynths with supply outstanding stay.
    pub fn remove_pynth(&mut self, currency_key: String) {
        self.access.require_owner();
        let Some(pynth) = self.pynth(currency_key.clone()) else {
            self.env().revert(IssuanceError::PynthDoesNotExist)
        };
        if currency_key == PUSD || !self.pynth_total_supply(pynth).is_zero() {
            self.env().revert(IssuanceError::CannotRemovePynth);
        }

        let keys: Vec<String> = self
            .available_currency_keys()
            .into_iter()
            .filter(|key| *key != currency_key)
            .collect();
        self.pynth_keys.set(keys);
        self.pynths.set(&currency_key, None);

        self.env().emit_event(PynthRemoved { currency_key, pynth });
    }

    // ========== Trusted Minters ==========

    /// Mint pynths that carry no debt shares (exchanger, bridge). Returns false if
    /// the circuit breaker swallowed the call.
    pub fn issue_pynths_without_debt(
        &mut self,
        currency_key: String,
        to: Address,
        amount: U256,
    ) -> bool {
        self.access.require_role(ROLE_TRUSTED_MINTER, IssuanceError::OnlyTrustedMinters);
        let pynth = self.require_pynth(&currency_key);
        let value = self.fresh_value_of(&currency_key, amount);
        if !self.cache.check_circuit() {
            return false;
        }
        self.pynth_issue(pynth, to, amount);
        self.cache.apply_increase(value);
        true
    }

    pub fn burn_pynths_without_debt(
        &mut self,
        currency_key: String,
        from: Address,
        amount: U256,
    ) -> bool {
        self.access.require_role(ROLE_TRUSTED_MINTER, IssuanceError::OnlyTrustedMinters);
        let pynth = self.require_pynth(&currency_key);
        let value = self.fresh_value_of(&currency_key, amount);
        if !self.cache.check_circuit() {
            return false;
        }
        self.pynth_burn(pynth, from, amount);
        self.cache.apply_decrease(value);
        true
    }

    // ========== Debt Migration ==========

    pub fn set_debt_migrator(&mut self, migrator: Address, direction: MigrationDirection) {
        self.access.require_owner();
        self.debt_migrator.set(Some(migrator));
        self.migration_direction.set(direction);
    }

    /// Move raw debt shares in or out for an account migrating between networks
    pub fn modify_debt_shares_for_migration(&mut self, account: Address, amount: U256) {
        let caller = self.env().caller();
        if self.debt_migrator.get().flatten() != Some(caller) {
            self.env().revert(IssuanceError::OnlyTrustedMigrators);
        }
        match self.migration_direction.get() {
            Some(MigrationDirection::Outbound) => self.ledger.burn_raw_shares(account, amount),
            Some(MigrationDirection::Inbound) => {
                self.note_pool_restart();
                self.ledger.mint_raw_shares(account, amount)
            }
            None => self.env().revert(IssuanceError::InvalidConfig),
        }
    }

    // ========== Cross-Chain Debt ==========

    pub fn add_network_ids(&mut self, chain_ids: Vec<u64>) {
        self.access.require_owner();
        self.cross_chain.add_network_ids(chain_ids);
    }

    pub fn set_initial_current_issued_debt(&mut self, amount: U256) {
        self.access.require_owner();
        self.cross_chain.set_initial_issued_debt(amount);
    }

    pub fn set_cross_chain_stale_period(&mut self, period: u64) {
        self.access.require_owner();
        self.cross_chain.set_stale_period(period);
    }

    pub fn set_cross_chain_sync_tolerance(&mut self, tolerance: U256) {
        self.access.require_owner();
        self.cross_chain.set_sync_tolerance(tolerance);
    }

    /// Replace every sibling network snapshot (debt manager only)
    pub fn set_cross_network_debts_all(
        &mut self,
        chain_ids: Vec<u64>,
        issued_debts: Vec<U256>,
        active_debts: Vec<U256>,
        net_flow: U256,
    ) {
        self.access.require_role(ROLE_DEBT_MANAGER, IssuanceError::Unauthorized);
        if chain_ids.len() != issued_debts.len() || chain_ids.len() != active_debts.len() {
            self.env().revert(IssuanceError::LengthMismatch);
        }
        self.cross_chain.set_cross_network_debts_all(chain_ids, issued_debts, active_debts, net_flow);
    }

    pub fn record_bridge_outbound(&mut self, amount: U256) {
        self.access.require_role(ROLE_BRIDGE, IssuanceError::Unauthorized);
        self.cross_chain.record_outbound(amount);
    }

    pub fn record_bridge_inbound(&mut self, amount: U256) {
        self.access.require_role(ROLE_BRIDGE, IssuanceError::Unauthorized);
        self.cross_chain.record_inbound(amount);
    }

    pub fn current_network_debt_percentage(&self) -> U256 {
        self.cross_chain.current_network_debt_percentage()
    }

    pub fn current_network_issued_debt(&self) -> U256 {
        self.cross_chain.self_issued_debt()
    }

    pub fn current_network_active_debt(&self) -> U256 {
        self.cross_chain.current_network_active_debt(self.cache.current_debt())
    }

    pub fn cross_network_issued_debt_all(&self) -> Vec<U256> {
        self.cross_chain.cross_network_issued_debt_all()
    }

    pub fn cross_network_active_debt_all(&self) -> Vec<U256> {
        self.cross_chain.cross_network_active_debt_all()
    }

    pub fn network_ids(&self) -> Vec<u64> {
        self.cross_chain.network_ids()
    }

    pub fn is_cross_chain_debt_stale(&self) -> bool {
        self.cross_chain.is_stale()
    }

    // ========== Admin Functions ==========

    pub fn set_issuance_ratio(&mut self, ratio: U256) {
        self.access.require_owner();
        if ratio.is_zero() || ratio > unit() {
            self.env().revert(IssuanceError::InvalidConfig);
        }
        self.issuance_ratio.set(ratio);
    }

    pub fn set_minimum_stake_time(&mut self, seconds: u64) {
        self.access.require_owner();
        self.minimum_stake_time.set(seconds);
    }

    pub fn set_escrows(&mut self, escrow: Option<Address>, reward_escrow: Option<Address>) {
        self.access.require_owner();
        self.escrow.set(escrow);
        self.reward_escrow.set(reward_escrow);
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
}

impl Issuer {
    // ========== Mutation Paths ==========

    /// Issue `requested` (or everything issuable when `None`) for `from`
    fn issue_for(&mut self, from: Address, requested: Option<U256>) {
        self.require_issuance_active();
        self.require_rates_valid();

        let ratio = self.effective_debt_ratio();
        let debt = self.ledger.debt_value_of(from, ratio);
        let remaining = remaining_issuable(self.max_issuable_pynths(from), debt);
        let amount = match requested {
            Some(amount) if amount.is_zero() => self.env().revert(IssuanceError::ZeroAmount),
            Some(amount) if amount > remaining => self.env().revert(IssuanceError::AmountTooLarge),
            Some(amount) => amount,
            None if remaining.is_zero() => self.env().revert(IssuanceError::ZeroAmount),
            None => remaining,
        };

        if !self.cache.check_circuit() {
            return;
        }

        self.note_pool_restart();
        self.ledger.issue_shares(from, amount, ratio);
        let pusd = self.require_pynth(PUSD);
        self.pynth_issue(pusd, from, amount);
        self.last_issue_event.set(&from, self.env().get_block_time_secs());
        self.cross_chain.record_issue(amount);
        self.cache.apply_increase(amount);

        self.env().emit_event(DebtIssued {
            account: from,
            amount,
            debt_balance: self.ledger.debt_value_of(from, self.effective_debt_ratio()),
            total_shares: self.ledger.total_shares(),
        });
    }

    /// Burn `requested` (capped at the debt) or, when `None`, the amount that
    /// restores the issuance ratio
    fn burn_for(&mut self, from: Address, requested: Option<U256>) {
        self.require_issuance_active();
        self.require_rates_valid();
        if !self.can_burn_pynths(from) {
            self.env().revert(IssuanceError::MinimumStakeTimeNotReached);
        }
        if self.cross_chain.is_stale() {
            self.env().revert(IssuanceError::CrossChainDebtStale);
        }

        let pusd = self.require_pynth(PUSD);
        self.pynth_settle(pusd, from);

        let ratio = self.effective_debt_ratio();
        let debt = self.ledger.debt_value_of(from, ratio);
        if debt.is_zero() {
            self.env().revert(IssuanceError::NoDebtToForgive);
        }
        let amount = match requested {
            Some(amount) => amount.min(debt),
            None => match burn_to_target_amount(debt, self.max_issuable_pynths(from)) {
                Some(amount) => amount,
                None => self.env().revert(IssuanceError::AlreadyAtTargetRatio),
            },
        };
        if amount.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }
        if self.pynth_balance_of(pusd, from) < amount {
            self.env().revert(IssuanceError::NotEnoughBalance);
        }

        if !self.cache.check_circuit() {
            return;
        }

        let burned = self.ledger.burn_shares(from, amount, ratio);
        self.pynth_burn(pusd, from, burned.value);
        self.cross_chain.record_burn(burned.value);
        self.cache.apply_decrease(burned.value);

        self.env().emit_event(DebtBurned {
            account: from,
            amount: burned.value,
            debt_balance: self.ledger.debt_value_of(from, ratio),
            total_shares: self.ledger.total_shares(),
        });
    }

    fn set_approval(&mut self, delegate: Address, power: &str, approved: bool) {
        let authoriser = self.env().caller();
        if power == "issue" {
            self.issue_approvals.set(&(authoriser, delegate), approved);
        } else {
            self.burn_approvals.set(&(authoriser, delegate), approved);
        }
        self.env().emit_event(DelegateApprovalChanged {
            authoriser,
            delegate,
            power: String::from(power),
            approved,
        });
    }

    fn require_issue_approval(&self, authoriser: Address) {
        if !self.can_issue_for(authoriser, self.env().caller()) {
            self.env().revert(IssuanceError::NotApprovedToActOnBehalf);
        }
    }

    fn require_burn_approval(&self, authoriser: Address) {
        if !self.can_burn_for(authoriser, self.env().caller()) {
            self.env().revert(IssuanceError::NotApprovedToActOnBehalf);
        }
    }

    // ========== Gates ==========

    fn require_issuance_active(&self) {
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

    fn require_rates_valid(&self) {
        if self.any_rate_is_invalid() {
            self.env().revert(IssuanceError::InvalidRate);
        }
    }

    // ========== Rates ==========

    fn rates_addr(&self) -> Address {
        let Some(rates) = self.exchange_rates.get() else {
            self.env().revert(IssuanceError::InvalidConfig)
        };
        rates
    }

    fn rate_of(&self, currency_key: &str) -> (U256, bool) {
        let args = runtime_args! {
            "currency_key" => String::from(currency_key)
        };
        self.env()
            .call_contract(self.rates_addr(), CallDef::new("get_rate", false, args))
    }

    fn rates_of(&self, currency_keys: Vec<String>) -> (Vec<U256>, bool) {
        let args = runtime_args! {
            "currency_keys" => currency_keys
        };
        self.env()
            .call_contract(self.rates_addr(), CallDef::new("rates_and_any_invalid", false, args))
    }

    fn oracle_debt_ratio(&self) -> (U256, bool, u64) {
        self.env().call_contract(
            self.rates_addr(),
            CallDef::new("get_debt_ratio", false, RuntimeArgs::new()),
        )
    }

    /// PERI plus every registered pynth
    fn collateral_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        keys.push(String::from(PERI));
        keys.extend(self.available_currency_keys());
        keys
    }

    /// One while the pool is empty or the oracle has not published since the
    /// pool restarted, otherwise the oracle's ratio
    fn effective_debt_ratio(&self) -> U256 {
        if self.ledger.total_shares().is_zero() {
            return unit();
        }
        let (ratio, _, updated_at) = self.oracle_debt_ratio();
        match self.debt_ratio_reset_at.get() {
            Some(reset_at) if updated_at <= reset_at => unit(),
            _ => ratio,
        }
    }

    /// Record the restart time when the first shares enter an empty pool
    fn note_pool_restart(&mut self) {
        if self.ledger.total_shares().is_zero() {
            self.debt_ratio_reset_at.set(self.env().get_block_time_secs());
        }
    }

    /// pUSD value of `amount` of a pynth at a fresh rate
    fn fresh_value_of(&self, currency_key: &str, amount: U256) -> U256 {
        let (rate, stale) = self.rate_of(currency_key);
        if stale {
            self.env().revert(IssuanceError::InvalidRate);
        }
        multiply_decimal(amount, rate)
    }

    // ========== Collateral ==========

    fn collateral_balances(&self, account: Address) -> CollateralBalances {
        let Some(peri) = self.peri_token.get() else {
            self.env().revert(IssuanceError::InvalidConfig)
        };
        let (escrowed, reward_escrowed) = self.escrowed_balances(account);
        CollateralBalances {
            wallet: self.balance_at(peri, account),
            escrowed,
            reward_escrowed,
        }
    }

    /// Escrow and reward escrow balances; the token itself is not consulted so the
    /// transfer lock can run inside a PERI transfer
    fn escrowed_balances(&self, account: Address) -> (U256, U256) {
        let escrowed = self
            .escrow
            .get()
            .flatten()
            .map(|escrow| self.balance_at(escrow, account))
            .unwrap_or_default();
        let reward_escrowed = self
            .reward_escrow
            .get()
            .flatten()
            .map(|escrow| self.balance_at(escrow, account))
            .unwrap_or_default();
        (escrowed, reward_escrowed)
    }

    fn balance_at(&self, contract: Address, account: Address) -> U256 {
        let args = runtime_args! {
            "account" => account
        };
        self.env()
            .call_contract(contract, CallDef::new("balance_of", false, args))
    }

    // ========== Pynths ==========

    fn require_pynth(&self, currency_key: &str) -> Address {
        let Some(pynth) = self.pynth(String::from(currency_key)) else {
            self.env().revert(IssuanceError::PynthDoesNotExist)
        };
        pynth
    }

    fn pynth_total_supply(&self, pynth: Address) -> U256 {
        self.env()
            .call_contract(pynth, CallDef::new("total_supply", false, RuntimeArgs::new()))
    }

    fn pynth_balance_of(&self, pynth: Address, account: Address) -> U256 {
        self.balance_at(pynth, account)
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

    fn pynth_settle(&self, pynth: Address, account: Address) -> U256 {
        let args = runtime_args! {
            "account" => account
        };
        self.env()
            .call_contract(pynth, CallDef::new("settle", true, args))
    }
}
