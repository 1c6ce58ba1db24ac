//! Staking issuance against PERI: issue, burn, delegation, locks and the debt cache.

use odra::casper_types::U256;
use odra::prelude::*;
use pretty_assertions::assert_eq;

use pynth_debt_contracts::access_control::{ROLE_PYNTH_ISSUER, ROLE_TRUSTED_MINTER};
use pynth_debt_contracts::errors::IssuanceError;
use pynth_debt_contracts::types::{MigrationDirection, PUSD, SECTION_ISSUANCE};

use crate::fixtures::{fraction, units, System, DAY, PETH};

#[test]
fn test_issue_up_to_max_then_reject() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.fund_peri(alice, units(1_000));

    assert_eq!(sys.issuer.max_issuable_pynths(alice), units(200));

    sys.env.set_caller(alice);
    sys.issuer.issue_pynths(units(200));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(200));
    assert_eq!(sys.pusd.balance_of(alice), units(200));

    assert_eq!(
        sys.issuer.try_issue_pynths(units(1)),
        Err(IssuanceError::AmountTooLarge.into())
    );
    assert_eq!(sys.issuer.debt_balance_of(alice), units(200));

    let capacity = sys.issuer.remaining_issuable_pynths(alice);
    assert_eq!(capacity.max_issuable, units(200));
    assert_eq!(capacity.already_issued, units(200));
    assert_eq!(capacity.remaining, U256::zero());
}

#[test]
fn test_zero_amount_is_rejected() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.fund_peri(alice, units(1_000));

    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_issue_pynths(U256::zero()),
        Err(IssuanceError::ZeroAmount.into())
    );

    // nothing left to issue
    sys.issuer.issue_max_pynths();
    assert_eq!(
        sys.issuer.try_issue_max_pynths(),
        Err(IssuanceError::ZeroAmount.into())
    );
}

#[test]
fn test_debt_follows_the_network_debt_ratio() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    let bob = sys.account(2);
    sys.stake_and_issue(alice, units(10_000), units(2_000));
    sys.stake_and_issue(bob, units(10_000), units(2_000));

    assert_eq!(sys.issuer.debt_share_balance_of(alice), units(2_000));
    assert_eq!(sys.issuer.debt_share_balance_of(bob), units(2_000));

    sys.advance(1);
    sys.rates.set_debt_ratio(fraction(1, 2));

    assert_eq!(sys.issuer.debt_ratio(), fraction(1, 2));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(1_000));
    assert_eq!(sys.issuer.debt_balance_of(bob), units(1_000));
}

#[test]
fn test_ratio_published_before_the_first_issue_is_ignored() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.rates.set_debt_ratio(fraction(1, 2));
    sys.advance(1);

    sys.stake_and_issue(alice, units(1_000), units(100));
    assert_eq!(sys.issuer.debt_ratio(), units(1));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(100));
    assert_eq!(sys.issuer.debt_share_balance_of(alice), units(100));

    // 200 is the cap, so 150 more must not fit
    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_issue_pynths(units(150)),
        Err(IssuanceError::AmountTooLarge.into())
    );
    sys.issuer.issue_pynths(units(100));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(200));

    // a ratio published after the pool filled applies
    sys.advance(1);
    sys.rates.set_debt_ratio(fraction(1, 2));
    assert_eq!(sys.issuer.debt_ratio(), fraction(1, 2));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(100));
}

#[test]
fn test_shares_sum_to_total() {
    let mut sys = System::setup();
    let accounts = [sys.account(1), sys.account(2), sys.account(3)];
    sys.stake_and_issue(accounts[0], units(5_000), units(300));
    sys.stake_and_issue(accounts[1], units(5_000), units(700));

    sys.advance(1);
    sys.rates.set_debt_ratio(fraction(3, 2));
    sys.stake_and_issue(accounts[2], units(5_000), units(450));

    sys.advance(DAY);
    sys.env.set_caller(accounts[1]);
    sys.issuer.burn_pynths(units(150));

    let sum = accounts
        .iter()
        .fold(U256::zero(), |acc, a| acc + sys.issuer.debt_share_balance_of(*a));
    assert_eq!(sum, sys.issuer.total_debt_shares());
}

#[test]
fn test_issue_on_behalf_requires_approval() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    let delegate = sys.account(2);
    sys.fund_peri(alice, units(1_000));

    sys.env.set_caller(delegate);
    assert_eq!(
        sys.issuer.try_issue_pynths_on_behalf(alice, units(100)),
        Err(IssuanceError::NotApprovedToActOnBehalf.into())
    );

    sys.env.set_caller(alice);
    sys.issuer.approve_issue_on_behalf(delegate);
    assert!(sys.issuer.can_issue_for(alice, delegate));
    assert!(!sys.issuer.can_burn_for(alice, delegate));

    sys.env.set_caller(delegate);
    sys.issuer.issue_pynths_on_behalf(alice, units(100));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(100));
    assert_eq!(sys.pusd.balance_of(alice), units(100));
    assert_eq!(sys.issuer.debt_balance_of(delegate), U256::zero());

    sys.advance(DAY);
    assert_eq!(
        sys.issuer.try_burn_pynths_on_behalf(alice, units(10)),
        Err(IssuanceError::NotApprovedToActOnBehalf.into())
    );

    sys.env.set_caller(alice);
    sys.issuer.approve_burn_on_behalf(delegate);
    sys.issuer.remove_issue_on_behalf(delegate);

    sys.env.set_caller(delegate);
    sys.issuer.burn_pynths_on_behalf(alice, units(10));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(90));
    assert_eq!(
        sys.issuer.try_issue_max_pynths_on_behalf(alice),
        Err(IssuanceError::NotApprovedToActOnBehalf.into())
    );
}

#[test]
fn test_burn_waits_for_minimum_stake_time() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.stake_and_issue(alice, units(1_000), units(100));

    assert!(!sys.issuer.can_burn_pynths(alice));
    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_burn_pynths(units(10)),
        Err(IssuanceError::MinimumStakeTimeNotReached.into())
    );

    sys.advance(DAY);
    assert!(sys.issuer.can_burn_pynths(alice));
    sys.env.set_caller(alice);
    sys.issuer.burn_pynths(units(10));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(90));
}

#[test]
fn test_suspended_issuance_reverts() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.fund_peri(alice, units(1_000));

    sys.env.set_caller(sys.owner);
    sys.status.suspend(SECTION_ISSUANCE.to_string());

    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_issue_pynths(units(10)),
        Err(IssuanceError::OperationSuspended.into())
    );

    sys.env.set_caller(sys.owner);
    sys.status.resume(SECTION_ISSUANCE.to_string());

    sys.env.set_caller(alice);
    sys.issuer.issue_pynths(units(10));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(10));
}

#[test]
fn test_stale_rates_block_issuance() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.fund_peri(alice, units(1_000));

    sys.wait(90_001);
    assert!(sys.issuer.any_rate_is_invalid());

    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_issue_pynths(units(10)),
        Err(IssuanceError::InvalidRate.into())
    );

    sys.refresh_rates();
    assert!(!sys.issuer.any_rate_is_invalid());
    sys.env.set_caller(alice);
    sys.issuer.issue_pynths(units(10));
}

#[test]
fn test_burn_is_clamped_to_debt() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.stake_and_issue(alice, units(1_000), units(200));
    sys.advance(DAY);

    sys.env.set_caller(alice);
    sys.issuer.burn_pynths(units(50));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(150));
    assert_eq!(sys.pusd.balance_of(alice), units(150));

    sys.issuer.burn_pynths(units(1_000));
    assert_eq!(sys.issuer.debt_balance_of(alice), U256::zero());
    assert_eq!(sys.issuer.debt_share_balance_of(alice), U256::zero());
    assert_eq!(sys.pusd.balance_of(alice), U256::zero());

    assert_eq!(
        sys.issuer.try_burn_pynths(units(1)),
        Err(IssuanceError::NoDebtToForgive.into())
    );
}

#[test]
fn test_burn_needs_the_pynths() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    let bob = sys.account(2);
    sys.stake_and_issue(alice, units(1_000), units(200));
    sys.advance(DAY);

    sys.env.set_caller(alice);
    sys.pusd.transfer(bob, units(100));
    assert_eq!(
        sys.issuer.try_exit(),
        Err(IssuanceError::NotEnoughBalance.into())
    );

    sys.env.set_caller(bob);
    sys.pusd.transfer(alice, units(100));
    sys.env.set_caller(alice);
    sys.issuer.exit();
    assert_eq!(sys.issuer.debt_balance_of(alice), U256::zero());
    assert_eq!(sys.issuer.total_debt_shares(), U256::zero());
}

#[test]
fn test_burn_to_target_after_price_drop() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.stake_and_issue(alice, units(40_000), units(8_000));
    sys.advance(DAY);

    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_burn_pynths_to_target(),
        Err(IssuanceError::AlreadyAtTargetRatio.into())
    );

    sys.set_peri_rate(fraction(1, 2));
    assert_eq!(sys.issuer.collateralisation_ratio(alice), fraction(2, 5));

    sys.env.set_caller(alice);
    sys.issuer.burn_pynths_to_target();
    assert_eq!(sys.issuer.debt_balance_of(alice), units(4_000));
    assert_eq!(sys.issuer.collateralisation_ratio(alice), fraction(1, 5));
}

#[test]
fn test_staked_peri_is_locked() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    let bob = sys.account(2);
    sys.stake_and_issue(alice, units(1_000), units(100));

    sys.env.set_caller(alice);
    assert_eq!(
        sys.peri.try_transfer(bob, units(600)),
        Err(IssuanceError::TransferExceedsUnlocked.into())
    );
    sys.peri.transfer(bob, units(500));
    assert_eq!(sys.peri.balance_of(bob), units(500));
}

#[test]
fn test_escrow_absorbs_the_lock_first() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    let bob = sys.account(2);
    sys.fund_peri(alice, units(1_000));

    sys.env.set_caller(sys.owner);
    sys.escrow.append_vesting_entry(alice, units(300));
    assert_eq!(sys.issuer.collateral(alice), units(1_300));

    sys.env.set_caller(alice);
    sys.issuer.issue_pynths(units(100));
    assert_eq!(sys.issuer.transferable_peri(alice, units(1_000)), units(800));
    assert_eq!(
        sys.peri.try_transfer(bob, units(801)),
        Err(IssuanceError::TransferExceedsUnlocked.into())
    );
    sys.peri.transfer(bob, units(800));
}

#[test]
fn test_tripped_breaker_swallows_issuance() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.stake_and_issue(alice, units(1_000), units(100));
    assert_eq!(sys.issuer.total_issued_pynths(), units(100));

    // supply minted outside the issuer
    sys.mint_pusd(sys.owner, units(10_000_000));
    sys.issuer.take_debt_snapshot();
    assert_eq!(sys.issuer.cached_debt(), units(10_000_100));

    sys.env.set_caller(alice);
    sys.issuer.issue_pynths(units(1));
    assert!(sys.issuer.is_circuit_broken());
    assert_eq!(sys.issuer.debt_balance_of(alice), units(100));
    assert_eq!(sys.pusd.balance_of(alice), units(100));
    assert_eq!(sys.issuer.total_issued_pynths(), units(100));

    sys.env.set_caller(sys.owner);
    sys.issuer.reset_circuit_breaker();
    assert!(!sys.issuer.is_circuit_broken());
    assert_eq!(sys.issuer.total_issued_pynths(), units(10_000_100));

    sys.env.set_caller(alice);
    sys.issuer.issue_pynths(units(1));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(101));
}

#[test]
fn test_tripped_breaker_swallows_burns() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.stake_and_issue(alice, units(1_000), units(100));
    sys.advance(DAY);

    sys.mint_pusd(sys.owner, units(10_000_000));
    sys.issuer.take_debt_snapshot();
    let supply = sys.pusd.total_supply();
    let shares = sys.issuer.total_debt_shares();

    // neither direction moves value while tripped
    sys.env.set_caller(alice);
    sys.issuer.burn_pynths(units(40));
    assert!(sys.issuer.is_circuit_broken());
    sys.issuer.issue_pynths(units(50));
    sys.issuer.burn_pynths(units(10));

    assert_eq!(sys.issuer.debt_balance_of(alice), units(100));
    assert_eq!(sys.pusd.balance_of(alice), units(100));
    assert_eq!(sys.pusd.total_supply(), supply);
    assert_eq!(sys.issuer.total_debt_shares(), shares);
    assert_eq!(sys.issuer.cached_debt(), units(10_000_100));
    assert_eq!(sys.issuer.total_issued_pynths(), units(100));

    sys.env.set_caller(sys.owner);
    sys.issuer.reset_circuit_breaker();
    sys.env.set_caller(alice);
    sys.issuer.burn_pynths(units(40));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(60));
    assert_eq!(sys.pusd.total_supply(), supply - units(40));
    assert_eq!(sys.issuer.cached_debt(), units(10_000_060));
}

#[test]
fn test_stale_debt_ratio_blocks_issuance() {
    let mut sys = System::setup();
    let alice = sys.account(1);
    sys.fund_peri(alice, units(1_000));
    sys.rates.set_debt_ratio(units(1));

    // the pynth rates are republished, the debt ratio is not
    sys.advance(90_001);
    assert!(sys.issuer.any_rate_is_invalid());
    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_issue_pynths(units(10)),
        Err(IssuanceError::InvalidRate.into())
    );

    sys.env.set_caller(sys.owner);
    sys.rates.set_debt_ratio(units(1));
    sys.env.set_caller(alice);
    sys.issuer.issue_pynths(units(10));
    assert_eq!(sys.issuer.debt_balance_of(alice), units(10));
}

#[test]
fn test_burn_to_target_without_collateral_clears_the_debt() {
    let mut sys = System::setup();
    let migrator = sys.account(3);
    let carol = sys.account(5);

    // debt arrives by migration, with no PERI behind it
    sys.issuer.set_debt_migrator(migrator, MigrationDirection::Inbound);
    sys.env.set_caller(migrator);
    sys.issuer.modify_debt_shares_for_migration(carol, units(50));
    assert_eq!(sys.issuer.collateral(carol), U256::zero());
    assert_eq!(sys.issuer.max_issuable_pynths(carol), U256::zero());
    assert_eq!(sys.issuer.debt_balance_of(carol), units(50));

    sys.mint_pusd(carol, units(50));
    sys.env.set_caller(carol);
    sys.issuer.burn_pynths_to_target();
    assert_eq!(sys.issuer.debt_balance_of(carol), U256::zero());
    assert_eq!(sys.issuer.debt_share_balance_of(carol), U256::zero());
    assert_eq!(sys.pusd.balance_of(carol), U256::zero());
}

#[test]
fn test_snapshot_needs_fresh_rates() {
    let mut sys = System::setup();
    sys.wait(90_001);
    assert_eq!(
        sys.issuer.try_take_debt_snapshot(),
        Err(IssuanceError::InvalidRate.into())
    );
}

#[test]
fn test_trusted_minter_moves_cache_without_shares() {
    let mut sys = System::setup();
    let minter = sys.account(3);
    let receiver = sys.account(4);

    sys.env.set_caller(minter);
    assert_eq!(
        sys.issuer.try_issue_pynths_without_debt(PETH.to_string(), receiver, units(50)),
        Err(IssuanceError::OnlyTrustedMinters.into())
    );

    sys.env.set_caller(sys.owner);
    sys.issuer.grant_role(ROLE_TRUSTED_MINTER, minter);

    sys.env.set_caller(minter);
    assert!(sys.issuer.issue_pynths_without_debt(PETH.to_string(), receiver, units(50)));
    assert_eq!(sys.peth.balance_of(receiver), units(50));
    assert_eq!(sys.issuer.cached_debt(), units(5_000));
    assert_eq!(sys.issuer.total_debt_shares(), U256::zero());

    assert!(sys.issuer.burn_pynths_without_debt(PETH.to_string(), receiver, units(20)));
    assert_eq!(sys.peth.balance_of(receiver), units(30));
    assert_eq!(sys.issuer.cached_debt(), units(3_000));
}

#[test]
fn test_migration_moves_raw_shares() {
    let mut sys = System::setup();
    let migrator = sys.account(3);
    let alice = sys.account(5);

    sys.env.set_caller(migrator);
    assert_eq!(
        sys.issuer.try_modify_debt_shares_for_migration(alice, units(10)),
        Err(IssuanceError::OnlyTrustedMigrators.into())
    );

    sys.env.set_caller(sys.owner);
    sys.issuer.set_debt_migrator(migrator, MigrationDirection::Inbound);
    sys.env.set_caller(migrator);
    sys.issuer.modify_debt_shares_for_migration(alice, units(10));
    assert_eq!(sys.issuer.debt_share_balance_of(alice), units(10));
    assert_eq!(sys.issuer.total_debt_shares(), units(10));

    sys.env.set_caller(sys.owner);
    sys.issuer.set_debt_migrator(migrator, MigrationDirection::Outbound);
    sys.env.set_caller(migrator);
    sys.issuer.modify_debt_shares_for_migration(alice, units(4));
    assert_eq!(sys.issuer.debt_share_balance_of(alice), units(6));
    assert_eq!(sys.issuer.total_debt_shares(), units(6));

    assert_eq!(
        sys.issuer.try_modify_debt_shares_for_migration(alice, units(7)),
        Err(IssuanceError::InsufficientShares.into())
    );
    let bob = sys.account(6);
    assert_eq!(
        sys.issuer.try_modify_debt_shares_for_migration(bob, units(1)),
        Err(IssuanceError::InsufficientShares.into())
    );
    assert_eq!(sys.issuer.total_debt_shares(), units(6));
}

#[test]
fn test_pynth_registry() {
    let mut sys = System::setup();
    assert_eq!(
        sys.issuer.available_currency_keys(),
        vec![PUSD.to_string(), PETH.to_string()]
    );

    let peth = sys.peth.address().clone();
    assert_eq!(sys.issuer.try_add_pynth(peth), Err(IssuanceError::PynthExists.into()));
    assert_eq!(
        sys.issuer.try_remove_pynth(PUSD.to_string()),
        Err(IssuanceError::CannotRemovePynth.into())
    );
    assert_eq!(
        sys.issuer.try_remove_pynth("pBTC".to_string()),
        Err(IssuanceError::PynthDoesNotExist.into())
    );

    // no pETH supply yet
    sys.issuer.remove_pynth(PETH.to_string());
    assert_eq!(sys.issuer.pynth(PETH.to_string()), None);
    assert_eq!(sys.issuer.available_currency_keys(), vec![PUSD.to_string()]);

    sys.issuer.add_pynth(peth);
    assert_eq!(sys.issuer.pynth(PETH.to_string()), Some(peth));
    assert_eq!(
        sys.issuer.available_currency_keys(),
        vec![PUSD.to_string(), PETH.to_string()]
    );

    // pETH with supply outstanding stays registered
    sys.peth.issue(sys.owner, units(1));
    assert_eq!(
        sys.issuer.try_remove_pynth(PETH.to_string()),
        Err(IssuanceError::CannotRemovePynth.into())
    );
    assert_eq!(sys.issuer.pynth(PETH.to_string()), Some(peth));
}

#[test]
fn test_only_owner_changes_parameters() {
    let mut sys = System::setup();
    let alice = sys.account(1);

    sys.env.set_caller(alice);
    assert_eq!(
        sys.issuer.try_set_issuance_ratio(fraction(1, 4)),
        Err(IssuanceError::Unauthorized.into())
    );
    assert_eq!(
        sys.issuer.try_grant_role(ROLE_PYNTH_ISSUER, alice),
        Err(IssuanceError::Unauthorized.into())
    );

    sys.env.set_caller(sys.owner);
    assert_eq!(
        sys.issuer.try_set_issuance_ratio(units(2)),
        Err(IssuanceError::InvalidConfig.into())
    );
    sys.issuer.set_issuance_ratio(fraction(1, 4));
    assert_eq!(sys.issuer.issuance_ratio(), fraction(1, 4));
}
