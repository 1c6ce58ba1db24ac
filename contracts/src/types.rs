//! Common types used across the debt pool and loan contracts.

use odra::prelude::*;
use odra::casper_types::U256;

/// Currency key of the debt denomination
pub const PUSD: &str = "pUSD";

/// Currency key of the native collateral token
pub const PERI: &str = "PERI";

/// System status section that gates every protocol operation
pub const SECTION_SYSTEM: &str = "System";

/// System status section that gates issuing and burning debt
pub const SECTION_ISSUANCE: &str = "Issuance";

/// Rate reported by the exchange rates contract
#[odra::odra_type]
pub struct RateData {
    /// Price in pUSD (scaled by 1e18)
    pub rate: U256,
    /// Block time of the last update
    pub updated_at: u64,
}

/// Debt ratio published for the multi-chain debt pool
#[odra::odra_type]
pub struct DebtRatioData {
    /// Total network debt per debt share (scaled by 1e18)
    pub ratio: U256,
    /// Block time of the last update
    pub updated_at: u64,
}

/// Debt figures reported for one sibling network
#[odra::odra_type]
#[derive(Copy)]
pub struct NetworkDebt {
    /// Chain id of the sibling network
    pub chain_id: u64,
    /// Net minted debt on that network
    pub issued_debt: U256,
    /// Live backing obligation on that network
    pub active_debt: U256,
}

/// Direction a debt migrator moves shares in
#[odra::odra_type]
#[derive(Copy)]
pub enum MigrationDirection {
    /// Shares leave this network: the migrator burns them here
    Outbound,
    /// Shares arrive on this network: the migrator mints them here
    Inbound,
}

/// Loan lifecycle status
#[odra::odra_type]
#[derive(Copy)]
pub enum LoanStatus {
    /// Loan is open and accrues interest
    Open,
    /// Loan was repaid or liquidated; the id is never reused
    Closed,
}

/// Collateralized loan record
#[odra::odra_type]
pub struct Loan {
    /// Loan id (unique per loan manager)
    pub id: u64,
    /// Borrower
    pub account: Address,
    /// Collateral held (18 decimals)
    pub collateral: U256,
    /// Borrowed pynth currency key
    pub currency: String,
    /// Outstanding principal in the borrowed currency
    pub principal: U256,
    /// Interest accrued but not yet paid, in the borrowed currency
    pub accrued_interest: U256,
    /// Interest index at the last accrual
    pub interest_index: U256,
    /// Current status
    pub status: LoanStatus,
}

impl Loan {
    /// Principal plus accrued interest
    pub fn owing(&self) -> U256 {
        self.principal + self.accrued_interest
    }

    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Open
    }
}

/// Index key for the per-borrower loan id list.
#[odra::odra_type]
#[derive(Copy)]
pub struct AccountLoanIndex {
    /// Borrower
    pub account: Address,
    /// Position in the borrower's list
    pub index: u64,
}

/// Issuance capacity of an account
#[odra::odra_type]
#[derive(Default)]
pub struct IssuanceCapacity {
    /// Debt the account's collateral can back
    pub max_issuable: U256,
    /// Debt the account currently holds
    pub already_issued: U256,
    /// Debt the account may still issue
    pub remaining: U256,
}
