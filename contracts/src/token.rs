//! CEP-18 token ledger.
//!
//! Balance bookkeeping shared by the pynths and the native collateral token.
//! Every write is mirrored into the CEP-18 named keys and dictionaries so
//! wallets and explorers can read balances without calling the contract.

use odra::prelude::*;
use odra::casper_types::{U256, Key};
use odra::casper_types::bytesrepr::ToBytes;
use crate::errors::IssuanceError;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

const CEP18_NAME_KEY: &str = "name";
const CEP18_SYMBOL_KEY: &str = "symbol";
const CEP18_DECIMALS_KEY: &str = "decimals";
const CEP18_TOTAL_SUPPLY_KEY: &str = "total_supply";
const CEP18_BALANCES_DICT: &str = "balances";
const CEP18_ALLOWANCES_DICT: &str = "allowances";

/// Token decimals shared by every protocol token
pub const TOKEN_DECIMALS: u8 = 18;

/// Transfer of tokens between two accounts
#[odra::event]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Allowance granted to a spender
#[odra::event]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
}

/// Token balances and allowances
#[odra::module]
pub struct TokenLedger {
    name: Var<String>,
    symbol: Var<String>,
    total_supply: Var<U256>,
    balances: Mapping<Address, U256>,
    /// Allowance mapping (owner, spender) -> amount
    allowances: Mapping<(Address, Address), U256>,
}

#[odra::module]
impl TokenLedger {
    pub fn init(&mut self, name: String, symbol: String) {
        self.name.set(name.clone());
        self.symbol.set(symbol.clone());
        self.total_supply.set(U256::zero());
        self.env().init_dictionary(CEP18_BALANCES_DICT);
        self.env().init_dictionary(CEP18_ALLOWANCES_DICT);
        self.env().set_named_value(CEP18_NAME_KEY, name);
        self.env().set_named_value(CEP18_SYMBOL_KEY, symbol);
        self.env().set_named_value(CEP18_DECIMALS_KEY, TOKEN_DECIMALS);
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, U256::zero());
    }

    pub fn name(&self) -> String {
        self.name.get().unwrap_or_default()
    }

    pub fn symbol(&self) -> String {
        self.symbol.get().unwrap_or_default()
    }

    pub fn decimals(&self) -> u8 {
        TOKEN_DECIMALS
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply.get().unwrap_or(U256::zero())
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).unwrap_or(U256::zero())
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or(U256::zero())
    }
}

impl TokenLedger {
    pub fn transfer_internal(&mut self, from: Address, to: Address, amount: U256) {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            self.env().revert(IssuanceError::NotEnoughBalance);
        }
        self.write_balance(from, from_balance - amount);

        let to_balance = self.balance_of(to);
        self.write_balance(to, to_balance + amount);

        self.env().emit_event(Transfer { from, to, value: amount });
    }

    pub fn approve_internal(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.set(&(owner, spender), amount);
        let key = Self::cep18_allowance_key(owner, spender);
        self.env().set_dictionary_value(CEP18_ALLOWANCES_DICT, key.as_bytes(), amount);

        self.env().emit_event(Approval { owner, spender, value: amount });
    }

    /// Reduce the caller's allowance on `owner`, reverting if it is too small
    pub fn spend_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        let current_allowance = self.allowance(owner, spender);
        if current_allowance < amount {
            self.env().revert(IssuanceError::InsufficientAllowance);
        }
        self.approve_internal(owner, spender, current_allowance - amount);
    }

    pub fn mint_internal(&mut self, to: Address, amount: U256) {
        let balance = self.balance_of(to);
        self.write_balance(to, balance + amount);
        self.write_total_supply(self.total_supply() + amount);
    }

    pub fn burn_internal(&mut self, from: Address, amount: U256) {
        let balance = self.balance_of(from);
        if balance < amount {
            self.env().revert(IssuanceError::NotEnoughBalance);
        }
        self.write_balance(from, balance - amount);
        self.write_total_supply(self.total_supply() - amount);
    }

    fn write_balance(&mut self, owner: Address, amount: U256) {
        self.balances.set(&owner, amount);
        let key = Self::cep18_balance_key(owner);
        self.env().set_dictionary_value(CEP18_BALANCES_DICT, key.as_bytes(), amount);
    }

    fn write_total_supply(&mut self, amount: U256) {
        self.total_supply.set(amount);
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, amount);
    }

    fn cep18_balance_key(owner: Address) -> String {
        let key = Key::from(owner);
        let bytes = key.to_bytes().unwrap_or_default();
        BASE64_STANDARD.encode(bytes)
    }

    fn cep18_allowance_key(owner: Address, spender: Address) -> String {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Key::from(owner).to_bytes().unwrap_or_default());
        bytes.extend_from_slice(&Key::from(spender).to_bytes().unwrap_or_default());
        BASE64_STANDARD.encode(bytes)
    }
}
