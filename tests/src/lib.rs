//! Pynth Debt Pool Integration Tests
//!
//! Host tests that deploy the full system on the Odra test VM.
//!
//! - `issuance`: staking, burning, delegation, transfer locks and the debt cache
//! - `cross_chain`: debt percentage, bridge flows and sync staleness
//! - `loans`: collateralised loans, interest and liquidation


#[cfg(test)]
mod issuance;

#[cfg(test)]
mod cross_chain;
