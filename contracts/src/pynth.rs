//! Pynth Contract
//!
//! CEP-18 compatible synthetic asset. Only pynth issuers (the issuer, the loan
//! managers) can mint and burn. Transfers honour the settlement owing recorded by
//! the exchanger: the owed part of a balance cannot leave the account until it has
//! been settled.

use odra::prelude::*;
use odra::casper_types::{U256, runtime_args};
use odra::CallDef;
use crate::access_control::{AccessControl, ROLE_PYNTH_ISSUER, ROLE_TRUSTED_MINTER};
use crate::errors::IssuanceError;
use crate::token::{Approval, TokenLedger, Transfer};
use crate::types::SECTION_SYSTEM;

/// Supply minted to an account
#[odra::event]
pub struct PynthIssued {
    pub account: Address,
    pub value: U256,
}

/// Supply burned from an account
#[odra::event]
pub struct PynthBurned {
    pub account: Address,
    pub value: U256,
}

/// Settlement owing recorded for, or settled by, an account
#[odra::event]
pub struct SettlementOwingChanged {
    pub account: Address,
    pub owing: U256,
}

/// Synthetic asset token
#[odra::module(events = [Transfer, Approval, PynthIssued, PynthBurned, SettlementOwingChanged])]
pub struct Pynth {
    access: SubModule<AccessControl>,
    token: SubModule<TokenLedger>,
    /// Currency key, e.g. "pUSD"
    currency_key: Var<String>,
    /// System status gate
    system_status: Var<Address>,
    /// Amount each account owes back from unsettled exchanges
    settlement_owing: Mapping<Address, U256>,
}

#[odra::module]
impl Pynth {
    pub fn init(
        &mut self,
        owner: Address,
        name: String,
        symbol: String,
        currency_key: String,
        system_status: Address,
    ) {
        self.access.init(owner);
        self.token.init(name, symbol);
        self.currency_key.set(currency_key);
        self.system_status.set(system_status);
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

    /// Transfer up to the transferable balance
    pub fn transfer(&mut self, recipient: Address, amount: U256) -> bool {
        self.require_transfers_active();
        let sender = self.env().caller();
        self.require_transferable(sender, amount);
        self.token.transfer_internal(sender, recipient, amount);
        true
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        let owner = self.env().caller();
        self.token.approve_internal(owner, spender, amount);
        true
    }

    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool {
        self.require_transfers_active();
        let spender = self.env().caller();
        self.require_transferable(owner, amount);
        self.token.spend_allowance(owner, spender, amount);
        self.token.transfer_internal(owner, recipient, amount);
        true
    }

    /// Settle first, then transfer at most what is left of the balance.
    ///
    /// Returns the amount actually transferred.
    pub fn transfer_and_settle(&mut self, recipient: Address, amount: U256) -> U256 {
        self.require_transfers_active();
        let sender = self.env().caller();
        self.settle_internal(sender);

        let sent = amount.min(self.token.balance_of(sender));
        if !sent.is_zero() {
            self.token.transfer_internal(sender, recipient, sent);
        }
        sent
    }

    // ========== Settlement Hook ==========

    /// Record what an account owes back from an exchange (exchanger only)
    pub fn record_settlement_owing(&mut self, account: Address, amount: U256) {
        self.access.require_role(ROLE_TRUSTED_MINTER, IssuanceError::OnlyTrustedMinters);
        self.settlement_owing.set(&account, amount);
        self.env().emit_event(SettlementOwingChanged { account, owing: amount });
    }

    pub fn settlement_owing(&self, account: Address) -> U256 {
        self.settlement_owing.get(&account).unwrap_or(U256::zero())
    }

    /// Balance minus the settlement owing
    pub fn transferable_pynths(&self, account: Address) -> U256 {
        self.balance_of(account).saturating_sub(self.settlement_owing(account))
    }

    /// Burn the settlement owing from an account's balance. Returns the amount burned.
    pub fn settle(&mut self, account: Address) -> U256 {
        self.settle_internal(account)
    }

    // ========== Protocol Functions (Restricted) ==========

    pub fn issue(&mut self, account: Address, amount: U256) {
        self.access.require_role(ROLE_PYNTH_ISSUER, IssuanceError::Unauthorized);
        self.token.mint_internal(account, amount);
        self.env().emit_event(PynthIssued { account, value: amount });
    }

    pub fn burn(&mut self, account: Address, amount: U256) {
        self.access.require_role(ROLE_PYNTH_ISSUER, IssuanceError::Unauthorized);
        self.token.burn_internal(account, amount);
        self.env().emit_event(PynthBurned { account, value: amount });
    }

    // ========== Admin Functions ==========

    pub fn currency_key(&self) -> String {
        self.currency_key.get().unwrap_or_default()
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

    // ========== Internal Functions ==========

    fn settle_internal(&mut self, account: Address) -> U256 {
        let owing = self.settlement_owing(account);
        if owing.is_zero() {
            return U256::zero();
        }
        let burned = owing.min(self.token.balance_of(account));
        self.token.burn_internal(account, burned);
        self.settlement_owing.set(&account, U256::zero());
        self.env().emit_event(SettlementOwingChanged { account, owing: U256::zero() });
        burned
    }

    fn require_transferable(&self, account: Address, amount: U256) {
        if amount > self.transferable_pynths(account) {
            self.env().revert(IssuanceError::NotEnoughBalance);
        }
    }

    fn require_transfers_active(&self) {
        let Some(status_addr) = self.system_status.get() else {
            self.env().revert(IssuanceError::InvalidConfig)
        };
        let mut sections = Vec::new();
        sections.push(String::from(SECTION_SYSTEM));
        sections.push(self.currency_key());
        let args = runtime_args! {
            "sections" => sections
        };
        let call_def = CallDef::new("any_suspended", false, args);
        let suspended: bool = self.env().call_contract(status_addr, call_def);
        if suspended {
            self.env().revert(IssuanceError::OperationSuspended);
        }
    }
}
