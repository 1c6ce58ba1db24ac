//! This network's share of the multi-chain debt pool.

use odra::casper_types::U256;
use odra::prelude::*;
use pretty_assertions::assert_eq;

use pynth_debt_contracts::access_control::{ROLE_BRIDGE, ROLE_DEBT_MANAGER};
use pynth_debt_contracts::errors::IssuanceError;

use crate::fixtures::{units, System, DAY};

fn ids(values: &[u64]) -> Vec<u64> {
    values.to_vec()
}

fn amounts(values: &[u64]) -> Vec<U256> {
    values.iter().map(|v| units(*v)).collect()
}

/// Owner grants the debt manager role to account 6 and returns it
fn debt_manager(sys: &mut System) -> Address {
    let manager = sys.account(6);
    sys.env.set_caller(sys.owner);
    sys.issuer.grant_role(ROLE_DEBT_MANAGER, manager);
    manager
}

#[test]
fn test_debt_percentage_across_four_networks() {
    let mut sys = System::setup();
    let manager = debt_manager(&mut sys);

    sys.env.set_caller(sys.owner);
    sys.issuer.add_network_ids(ids(&[10, 20, 30]));
    sys.issuer.set_initial_current_issued_debt(units(4_000));

    sys.env.set_caller(manager);
    sys.issuer.set_cross_network_debts_all(
        ids(&[10, 20, 30]),
        amounts(&[1_000, 2_000, 3_000]),
        amounts(&[1_000, 2_000, 3_000]),
        U256::zero(),
    );

    // 0.4 at 27 decimals
    assert_eq!(
        sys.issuer.current_network_debt_percentage(),
        U256::from(4u8) * U256::exp10(26)
    );
    assert_eq!(sys.issuer.current_network_issued_debt(), units(4_000));
    assert_eq!(sys.issuer.network_ids(), ids(&[10, 20, 30]));
    assert_eq!(
        sys.issuer.cross_network_issued_debt_all(),
        amounts(&[1_000, 2_000, 3_000])
    );
    assert!(!sys.issuer.is_cross_chain_debt_stale());
}

#[test]
fn test_lone_network_owns_everything() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.stake_and_issue(alice, units(1_000), units(100));

    assert_eq!(sys.issuer.current_network_debt_percentage(), U256::exp10(27));
    assert_eq!(sys.issuer.current_network_issued_debt(), units(100));
    assert_eq!(sys.issuer.current_network_active_debt(), units(100));
}

#[test]
fn test_bridge_flows_adjust_active_debt() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    let bridge = sys.account(7);
    sys.stake_and_issue(alice, units(1_000), units(100));

    sys.env.set_caller(bridge);
    assert_eq!(
        sys.issuer.try_record_bridge_outbound(units(20)),
        Err(IssuanceError::Unauthorized.into())
    );

    sys.env.set_caller(sys.owner);
    sys.issuer.grant_role(ROLE_BRIDGE, bridge);

    sys.env.set_caller(bridge);
    sys.issuer.record_bridge_outbound(units(20));
    assert_eq!(sys.issuer.current_network_active_debt(), units(120));

    sys.issuer.record_bridge_inbound(units(50));
    assert_eq!(sys.issuer.current_network_active_debt(), units(70));
}

#[test]
fn test_sync_requires_matching_lengths() {
    let mut sys = System::setup();
    let manager = debt_manager(&mut sys);

    sys.env.set_caller(manager);
    assert_eq!(
        sys.issuer.try_set_cross_network_debts_all(
            ids(&[10, 20]),
            amounts(&[1_000]),
            amounts(&[1_000, 2_000]),
            U256::zero(),
        ),
        Err(IssuanceError::LengthMismatch.into())
    );
}

#[test]
fn test_sync_requires_debt_manager() {
    let mut sys = System::setup();
    let stranger = sys.account(2);

    sys.env.set_caller(stranger);
    assert_eq!(
        sys.issuer.try_set_cross_network_debts_all(
            ids(&[10]),
            amounts(&[1_000]),
            amounts(&[1_000]),
            U256::zero(),
        ),
        Err(IssuanceError::Unauthorized.into())
    );
}

#[test]
fn test_stale_sync_blocks_burning() {
    let mut sys = System::setup();
    let manager = debt_manager(&mut sys);
    let alice = sys.account(1);
    sys.stake_and_issue(alice, units(1_000), units(100));

    sys.env.set_caller(sys.owner);
    sys.issuer.add_network_ids(ids(&[10]));
    sys.env.set_caller(manager);
    sys.issuer.set_cross_network_debts_all(ids(&[10]), amounts(&[500]), amounts(&[500]), U256::zero());

    sys.advance(DAY + 1);
    assert!(sys.issuer.is_cross_chain_debt_stale());
    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_burn_pynths(units(10)),
        Err(IssuanceError::CrossChainDebtStale.into())
    );

    // only burning waits for a fresh sync
    sys.issuer.issue_pynths(units(10));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(110));

    sys.env.set_caller(manager);
    sys.issuer.set_cross_network_debts_all(ids(&[10]), amounts(&[500]), amounts(&[500]), U256::zero());
    assert!(!sys.issuer.is_cross_chain_debt_stale());

    sys.advance(DAY);
    sys.env.set_caller(manager);
    sys.issuer.set_cross_network_debts_all(ids(&[10]), amounts(&[500]), amounts(&[500]), U256::zero());
    sys.env.set_caller(alice);
    sys.issuer.burn_pynths(units(10));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(100));
}

#[test]
fn test_issuance_drift_marks_sync_stale() {
    let mut sys = System::setup();
    let manager = debt_manager(&mut sys);
    let alice = sys.account(1);
    sys.stake_and_issue(alice, units(1_000), units(100));

    sys.env.set_caller(sys.owner);
    sys.issuer.add_network_ids(ids(&[10]));
    sys.env.set_caller(manager);
    sys.issuer.set_cross_network_debts_all(ids(&[10]), amounts(&[100]), amounts(&[100]), U256::zero());
    assert!(!sys.issuer.is_cross_chain_debt_stale());

    // more than 1% on top of the synced issuance
    sys.env.set_caller(alice);
    sys.issuer.issue_pynths(units(2));
    assert!(sys.issuer.is_cross_chain_debt_stale());
}
