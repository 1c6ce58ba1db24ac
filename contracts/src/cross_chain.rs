//! Cross-chain debt reconciliation.
//!
//! Several networks share one debt pool. Each network records its own issued
//! debt (net minting, unaffected by prices and bridging); a trusted debt manager
//! pushes the sibling networks' issued and active debt. From these:
//!
//! ```text
//! percentage  = self_issued / (self_issued + sum(foreign_issued))
//! self_active = local_issued_value + outbound - max(inbound, outbound_to_here)
//! active_debt = percentage * (self_active + sum(foreign_active))
//! ```
//!
//! The percentage is kept in 27 decimal precision. The figures are stale when
//! the last sync is older than the stale period or when this network's issued
//! debt has drifted past the sync tolerance since that sync.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::math::{deviation, divide_decimal_round_precise, multiply_decimal_round_precise};
use crate::types::NetworkDebt;

/// Default maximum sync age (1 day)
pub const DEFAULT_CROSS_CHAIN_STALE_PERIOD: u64 = 86_400;

/// Default tolerated drift of self issued debt since the last sync (1%)
pub const DEFAULT_SYNC_TOLERANCE: u128 = 10_000_000_000_000_000;

/// Sibling network figures were replaced
#[odra::event]
pub struct CrossNetworkDebtsUpdated {
    pub networks: u32,
    pub outbound_to_current_network: U256,
}

/// This network's issued debt changed
#[odra::event]
pub struct NetworkIssuedDebtChanged {
    pub issued_debt: U256,
}

/// Cross-chain debt reconciler
#[odra::module(events = [CrossNetworkDebtsUpdated, NetworkIssuedDebtChanged])]
pub struct CrossChainDebtReconciler {
    self_issued_debt: Var<U256>,
    /// Registered sibling chain ids
    network_ids: Var<Vec<u64>>,
    /// Latest snapshot per sibling chain
    networks: Mapping<u64, NetworkDebt>,
    /// Debt bridged out of this network
    outbound: Var<U256>,
    /// Debt bridged into this network
    inbound: Var<U256>,
    /// Debt bridged towards this network as seen by the debt manager
    outbound_to_current_network: Var<U256>,
    last_sync: Var<u64>,
    /// `self_issued_debt` at the last sync
    issued_at_sync: Var<U256>,
    stale_period: Var<u64>,
    sync_tolerance: Var<U256>,
}

#[odra::module]
impl CrossChainDebtReconciler {
    pub fn self_issued_debt(&self) -> U256 {
        self.self_issued_debt.get().unwrap_or(U256::zero())
    }

    pub fn network_ids(&self) -> Vec<u64> {
        self.network_ids.get().unwrap_or_default()
    }

    pub fn network_debt(&self, chain_id: u64) -> NetworkDebt {
        self.networks.get(&chain_id).unwrap_or(NetworkDebt {
            chain_id,
            issued_debt: U256::zero(),
            active_debt: U256::zero(),
        })
    }

    pub fn outbound(&self) -> U256 {
        self.outbound.get().unwrap_or(U256::zero())
    }

    pub fn inbound(&self) -> U256 {
        self.inbound.get().unwrap_or(U256::zero())
    }

    pub fn outbound_to_current_network(&self) -> U256 {
        self.outbound_to_current_network.get().unwrap_or(U256::zero())
    }

    pub fn last_sync(&self) -> u64 {
        self.last_sync.get().unwrap_or(0)
    }

    pub fn stale_period(&self) -> u64 {
        self.stale_period.get().unwrap_or(DEFAULT_CROSS_CHAIN_STALE_PERIOD)
    }

    pub fn sync_tolerance(&self) -> U256 {
        self.sync_tolerance.get().unwrap_or(U256::from(DEFAULT_SYNC_TOLERANCE))
    }

    /// Issued debt of every sibling network, in registration order
    pub fn cross_network_issued_debt_all(&self) -> Vec<U256> {
        self.network_ids()
            .into_iter()
            .map(|id| self.network_debt(id).issued_debt)
            .collect()
    }

    /// Active debt of every sibling network, in registration order
    pub fn cross_network_active_debt_all(&self) -> Vec<U256> {
        self.network_ids()
            .into_iter()
            .map(|id| self.network_debt(id).active_debt)
            .collect()
    }

    /// Share of the network issued debt minted on this network (1e27 = 100%)
    pub fn current_network_debt_percentage(&self) -> U256 {
        let own = self.self_issued_debt();
        let foreign = sum(self.cross_network_issued_debt_all());
        debt_percentage(own, foreign)
    }
}

impl CrossChainDebtReconciler {
    pub fn set_stale_period(&mut self, period: u64) {
        self.stale_period.set(period);
    }

    pub fn set_sync_tolerance(&mut self, tolerance: U256) {
        self.sync_tolerance.set(tolerance);
    }

    /// Register sibling networks with empty snapshots; known ids are skipped
    pub fn add_network_ids(&mut self, chain_ids: Vec<u64>) {
        let mut ids = self.network_ids();
        for chain_id in chain_ids {
            if !ids.contains(&chain_id) {
                ids.push(chain_id);
                self.networks.set(&chain_id, NetworkDebt {
                    chain_id,
                    issued_debt: U256::zero(),
                    active_debt: U256::zero(),
                });
            }
        }
        self.network_ids.set(ids);
    }

    /// Replace every sibling snapshot. Lengths are checked by the caller.
    pub fn set_cross_network_debts_all(
        &mut self,
        chain_ids: Vec<u64>,
        issued: Vec<U256>,
        active: Vec<U256>,
        outbound_to_current_network: U256,
    ) {
        for ((chain_id, issued_debt), active_debt) in chain_ids.iter().zip(issued).zip(active) {
            self.networks.set(chain_id, NetworkDebt {
                chain_id: *chain_id,
                issued_debt,
                active_debt,
            });
        }
        let networks = chain_ids.len() as u32;
        self.network_ids.set(chain_ids);
        self.outbound_to_current_network.set(outbound_to_current_network);
        self.last_sync.set(self.env().get_block_time_secs());
        self.issued_at_sync.set(self.self_issued_debt());

        self.env().emit_event(CrossNetworkDebtsUpdated {
            networks,
            outbound_to_current_network,
        });
    }

    pub fn set_initial_issued_debt(&mut self, amount: U256) {
        self.self_issued_debt.set(amount);
        self.issued_at_sync.set(amount);
        self.env().emit_event(NetworkIssuedDebtChanged { issued_debt: amount });
    }

    pub fn record_issue(&mut self, delta: U256) {
        let issued = self.self_issued_debt() + delta;
        self.self_issued_debt.set(issued);
        self.env().emit_event(NetworkIssuedDebtChanged { issued_debt: issued });
    }

    pub fn record_burn(&mut self, delta: U256) {
        let issued = self.self_issued_debt().saturating_sub(delta);
        self.self_issued_debt.set(issued);
        self.env().emit_event(NetworkIssuedDebtChanged { issued_debt: issued });
    }

    pub fn record_outbound(&mut self, amount: U256) {
        self.outbound.set(self.outbound() + amount);
    }

    pub fn record_inbound(&mut self, amount: U256) {
        self.inbound.set(self.inbound() + amount);
    }

    /// This network's raw active debt given the live value of its pynth supply
    pub fn self_active_debt(&self, local_issued_value: U256) -> U256 {
        let inflow = self.inbound().max(self.outbound_to_current_network());
        (local_issued_value + self.outbound()).saturating_sub(inflow)
    }

    /// This network's share of the total active debt of all networks
    pub fn current_network_active_debt(&self, local_issued_value: U256) -> U256 {
        let total_active =
            self.self_active_debt(local_issued_value) + sum(self.cross_network_active_debt_all());
        multiply_decimal_round_precise(total_active, self.current_network_debt_percentage())
    }

    /// True if a burn must wait for the debt manager's next sync
    pub fn is_stale(&self) -> bool {
        if self.network_ids().is_empty() {
            return false;
        }
        let age = self.env().get_block_time_secs().saturating_sub(self.last_sync());
        if age > self.stale_period() {
            return true;
        }
        issued_drifted(
            self.self_issued_debt(),
            self.issued_at_sync.get().unwrap_or(U256::zero()),
            self.sync_tolerance(),
        )
    }
}

fn sum(values: Vec<U256>) -> U256 {
    values.into_iter().fold(U256::zero(), |acc, value| acc + value)
}

/// `own / (own + foreign)` in precise units; zero if nothing is issued anywhere
pub fn debt_percentage(own: U256, foreign: U256) -> U256 {
    let total = own + foreign;
    if total.is_zero() {
        return U256::zero();
    }
    divide_decimal_round_precise(own, total)
}

/// Whether `current` moved away from `at_sync` by more than `tolerance`
pub fn issued_drifted(current: U256, at_sync: U256, tolerance: U256) -> bool {
    if at_sync.is_zero() {
        return !current.is_zero();
    }
    deviation(current, at_sync) > tolerance
}
