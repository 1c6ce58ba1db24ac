//! System Status Contract
//!
//! Suspension flags per named section. The protocol checks `System` for every
//! operation, `Issuance` for debt issue/burn and loans, `Exchange` for pynth
//! exchanges, and a pynth's currency key for transfers of that pynth.

use odra::prelude::*;
use crate::access_control::AccessControl;

/// A section was suspended
#[odra::event]
pub struct SectionSuspended {
    pub section: String,
}

/// A section was resumed
#[odra::event]
pub struct SectionResumed {
    pub section: String,
}

/// System status gate
#[odra::module(events = [SectionSuspended, SectionResumed])]
pub struct SystemStatus {
    access: SubModule<AccessControl>,
    /// Suspension flag per section
    suspended: Mapping<String, bool>,
}

#[odra::module]
impl SystemStatus {
    pub fn init(&mut self, owner: Address) {
        self.access.init(owner);
    }

    /// Suspend a section (owner only)
    pub fn suspend(&mut self, section: String) {
        self.access.require_owner();
        self.suspended.set(&section, true);
        self.env().emit_event(SectionSuspended { section });
    }

    /// Resume a section (owner only)
    pub fn resume(&mut self, section: String) {
        self.access.require_owner();
        self.suspended.set(&section, false);
        self.env().emit_event(SectionResumed { section });
    }

    pub fn is_suspended(&self, section: String) -> bool {
        self.suspended.get(&section).unwrap_or(false)
    }

    /// True if any of the given sections is suspended
    pub fn any_suspended(&self, sections: Vec<String>) -> bool {
        sections.into_iter().any(|section| self.is_suspended(section))
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
