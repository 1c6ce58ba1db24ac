//! Role based access control.
//!
//! Embedded as a submodule in every protocol contract. Roles:
//! - OWNER: configuration, role management
//! - ORACLE: price and debt ratio feeds
//! - DEBT_MANAGER: cross network debt snapshots
//! - TRUSTED_MINTER: debt-free pynth issuance (wrappers, exchanger)
//! - PYNTH_ISSUER: mint and burn pynth supply
//! - BRIDGE: bridge flow counters
//! - ESCROW_MANAGER: escrow entries

use odra::prelude::*;
use crate::errors::IssuanceError;

/// Role constants (u8 for efficient storage)
pub const ROLE_OWNER: u8 = 0;
pub const ROLE_ORACLE: u8 = 1;
pub const ROLE_DEBT_MANAGER: u8 = 2;
pub const ROLE_TRUSTED_MINTER: u8 = 3;
pub const ROLE_PYNTH_ISSUER: u8 = 4;
pub const ROLE_BRIDGE: u8 = 5;
pub const ROLE_ESCROW_MANAGER: u8 = 6;

const ROLE_COUNT: u8 = 7;

/// Role registry
#[odra::module]
pub struct AccessControl {
    /// Role assignments: (role, account) -> bool
    roles: Mapping<(u8, Address), bool>,
    /// Number of accounts with each role
    role_count: Mapping<u8, u32>,
    /// Whether the registry is initialized
    initialized: Var<bool>,
}

#[odra::module]
impl AccessControl {
    /// Initialize with the first owner
    pub fn init(&mut self, owner: Address) {
        if self.initialized.get().unwrap_or(false) {
            self.env().revert(IssuanceError::InvalidConfig);
        }
        self.set_role_internal(ROLE_OWNER, owner, true);
        self.initialized.set(true);
    }

    /// Check if account has a specific role
    pub fn has_role(&self, role_id: u8, account: Address) -> bool {
        self.roles.get(&(role_id, account)).unwrap_or(false)
    }

    /// Get the number of accounts with a role
    pub fn get_role_member_count(&self, role_id: u8) -> u32 {
        self.role_count.get(&role_id).unwrap_or(0)
    }

    /// Grant a role to an account (owner only)
    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.require_owner();
        if role_id >= ROLE_COUNT {
            self.env().revert(IssuanceError::InvalidConfig);
        }
        if self.has_role(role_id, account) {
            return;
        }
        self.set_role_internal(role_id, account, true);
    }

    /// Revoke a role from an account (owner only)
    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.require_owner();
        if !self.has_role(role_id, account) {
            return;
        }

        // Prevent revoking the last owner
        if role_id == ROLE_OWNER && self.get_role_member_count(ROLE_OWNER) <= 1 {
            self.env().revert(IssuanceError::InvalidConfig);
        }

        self.set_role_internal(role_id, account, false);
    }

    fn set_role_internal(&mut self, role_id: u8, account: Address, value: bool) {
        let had_role = self.roles.get(&(role_id, account)).unwrap_or(false);
        self.roles.set(&(role_id, account), value);

        let current_count = self.role_count.get(&role_id).unwrap_or(0);
        if value && !had_role {
            self.role_count.set(&role_id, current_count + 1);
        } else if !value && had_role && current_count > 0 {
            self.role_count.set(&role_id, current_count - 1);
        }
    }
}

impl AccessControl {
    /// Grant a role without an owner check; for use from constructors only
    pub fn assign_role(&mut self, role_id: u8, account: Address) {
        self.set_role_internal(role_id, account, true);
    }

    /// Check if the current caller holds a role
    pub fn caller_has_role(&self, role_id: u8) -> bool {
        self.has_role(role_id, self.env().caller())
    }

    /// Revert with `error` unless the caller holds the role
    pub fn require_role(&self, role_id: u8, error: IssuanceError) {
        if !self.caller_has_role(role_id) {
            self.env().revert(error);
        }
    }

    /// Revert unless the caller is an owner
    pub fn require_owner(&self) {
        self.require_role(ROLE_OWNER, IssuanceError::Unauthorized);
    }
}
