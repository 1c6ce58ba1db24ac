//! Reward Escrow Contract
//!
//! Non-circulating balances that vest to an account over time. The issuer counts
//! them as collateral; the vesting schedule itself is managed off the core by the
//! escrow manager role, which appends and releases entries.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::access_control::{AccessControl, ROLE_ESCROW_MANAGER};
use crate::errors::IssuanceError;

/// An escrow entry was appended
#[odra::event]
pub struct VestingEntryCreated {
    pub account: Address,
    pub value: U256,
}

/// Escrowed balance was released to the account
#[odra::event]
pub struct Vested {
    pub account: Address,
    pub value: U256,
}

/// Escrowed balances per account
#[odra::module(events = [VestingEntryCreated, Vested])]
pub struct RewardEscrow {
    access: SubModule<AccessControl>,
    balances: Mapping<Address, U256>,
    /// Number of entries per account
    entry_count: Mapping<Address, u32>,
    total_escrowed: Var<U256>,
}

#[odra::module]
impl RewardEscrow {
    pub fn init(&mut self, owner: Address) {
        self.access.init(owner);
        self.access.assign_role(ROLE_ESCROW_MANAGER, owner);
        self.total_escrowed.set(U256::zero());
    }

    /// Append an escrow entry (escrow manager only)
    pub fn append_vesting_entry(&mut self, account: Address, amount: U256) {
        self.access.require_role(ROLE_ESCROW_MANAGER, IssuanceError::Unauthorized);
        if amount.is_zero() {
            self.env().revert(IssuanceError::ZeroAmount);
        }

        self.balances.set(&account, self.balance_of(account) + amount);
        let entries = self.entry_count.get(&account).unwrap_or(0);
        self.entry_count.set(&account, entries.saturating_add(1));
        self.total_escrowed.set(self.total_escrowed() + amount);

        self.env().emit_event(VestingEntryCreated { account, value: amount });
    }

    /// Release vested balance (escrow manager only)
    pub fn vest(&mut self, account: Address, amount: U256) {
        self.access.require_role(ROLE_ESCROW_MANAGER, IssuanceError::Unauthorized);
        let balance = self.balance_of(account);
        if amount > balance {
            self.env().revert(IssuanceError::NotEnoughBalance);
        }

        self.balances.set(&account, balance - amount);
        self.total_escrowed.set(self.total_escrowed() - amount);

        self.env().emit_event(Vested { account, value: amount });
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).unwrap_or(U256::zero())
    }

    pub fn num_vesting_entries(&self, account: Address) -> u32 {
        self.entry_count.get(&account).unwrap_or(0)
    }

    pub fn total_escrowed(&self) -> U256 {
        self.total_escrowed.get().unwrap_or(U256::zero())
    }

    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.access.grant_role(role_id, account);
    }

    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.access.revoke_role(role_id, account);
    }
}
