//! PERI Token Contract
//!
//! CEP-18 compatible native collateral token. Balances staked behind debt are
//! transfer-locked: every transfer asks the issuer how much of the sender's
//! wallet balance is free and reverts above that amount.

use odra::prelude::*;
use odra::casper_types::{U256, runtime_args};
use odra::CallDef;
use crate::access_control::AccessControl;
use crate::errors::IssuanceError;
use crate::token::{Approval, TokenLedger, Transfer};
use crate::types::SECTION_SYSTEM;

/// Native collateral token
#[odra::module(events = [Transfer, Approval])]
pub struct PeriToken {
    access: SubModule<AccessControl>,
    token: SubModule<TokenLedger>,
    /// Issuer consulted for the transfer lock
    issuer: Var<Option<Address>>,
    /// System status gate
    system_status: Var<Address>,
}

#[odra::module]
impl PeriToken {
    pub fn init(&mut self, owner: Address, initial_supply: U256, system_status: Address) {
        self.access.init(owner);
        self.token.init(String::from("Peri Finance Token"), String::from("PERI"));
        self.token.mint_internal(owner, initial_supply);
        self.system_status.set(system_status);
        self.issuer.set(None);
    }

    // ========== CEP-18 Standard Functions ==========

    pub fn name(&self) -> String {
        self.token.name()
    }

    pub fn symbol(&self) -> String {
        self.token.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.token.decimals()
    }

    pub fn total_supply(&self) -> U256 {
        self.token.total_supply()
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.token.balance_of(account)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.token.allowance(owner, spender)
    }

    pub fn transfer(&mut self, recipient: Address, amount: U256) -> bool {
        self.require_system_active();
        let sender = self.env().caller();
        self.require_unlocked(sender, amount);
        self.token.transfer_internal(sender, recipient, amount);
        true
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        let owner = self.env().caller();
        self.token.approve_internal(owner, spender, amount);
        true
    }

    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool {
        self.require_system_active();
        let spender = self.env().caller();
        self.require_unlocked(owner, amount);
        self.token.spend_allowance(owner, spender, amount);
        self.token.transfer_internal(owner, recipient, amount);
        true
    }

    // ========== Admin Functions ==========

    /// Point the transfer lock at an issuer (owner only)
    pub fn set_issuer(&mut self, issuer: Address) {
        self.access.require_owner();
        self.issuer.set(Some(issuer));
    }

    pub fn get_issuer(&self) -> Option<Address> {
        self.issuer.get().flatten()
    }

    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.access.grant_role(role_id, account);
    }

    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.access.revoke_role(role_id, account);
    }

    // ========== Internal Functions ==========

    fn require_unlocked(&self, account: Address, amount: U256) {
        let Some(issuer) = self.get_issuer() else {
            return;
        };
        let args = runtime_args! {
            "account" => account,
            "balance" => self.token.balance_of(account)
        };
        let call_def = CallDef::new("transferable_peri", false, args);
        let transferable: U256 = self.env().call_contract(issuer, call_def);
        if amount > transferable {
            self.env().revert(IssuanceError::TransferExceedsUnlocked);
        }
    }

    fn require_system_active(&self) {
        let Some(status_addr) = self.system_status.get() else {
            self.env().revert(IssuanceError::InvalidConfig)
        };
        let args = runtime_args! {
            "section" => String::from(SECTION_SYSTEM)
        };
        let call_def = CallDef::new("is_suspended", false, args);
        let suspended: bool = self.env().call_contract(status_addr, call_def);
        if suspended {
            self.env().revert(IssuanceError::OperationSuspended);
        }
    }
}
