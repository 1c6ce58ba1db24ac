//! Pynth Debt Contracts
//!
//! Debt pool accounting and collateral issuance for a multi-chain synthetic
//! asset protocol.
//!
//! ## Architecture
//!
//! - **Issuer**: Issues and burns pUSD against PERI collateral through debt shares
//! - **DebtLedger**: Per-account debt shares converted to debt by the debt ratio
//! - **DebtCache**: Cached system debt with a latching circuit breaker
//! - **CrossChainDebtReconciler**: This network's share of the multi-chain debt pool
//! - **CollateralEth**: Native token collateralised loans with lazy interest accrual
//! - **ExchangeRates**: Oracle-fed rates and debt ratio with staleness
//! - **SystemStatus**: Section suspension gate
//! - **Pynth**: Synthetic asset token with a settlement hook
//! - **PeriToken**: Collateral token with a debt transfer lock
//! - **RewardEscrow**: Escrowed PERI counted as collateral
//!
//! ## Circuit Breaker
//!
//! When the cached system debt deviates from the last good value past the
//! threshold, debt mutations are accepted but move nothing and readers see the
//! last good debt until the owner resets the breaker.

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod math;
pub mod interest;
pub mod collateral;
pub mod access_control;
pub mod token;

// Debt pool building blocks
pub mod debt_ledger;
pub mod debt_cache;
pub mod cross_chain;

// Contract modules
pub mod issuer;
pub mod collateral_eth;
pub mod exchange_rates;
pub mod system_status;
pub mod pynth;
pub mod peri_token;
pub mod escrow;
