//! Protocol error definitions.

use odra::prelude::*;

/// Debt pool and loan errors
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IssuanceError {
    // Gate errors (1xx)
    OperationSuspended = 100,
    InvalidRate = 101,
    CrossChainDebtStale = 102,
    MinimumStakeTimeNotReached = 103,

    // Issuance and ledger errors (2xx)
    ZeroAmount = 200,
    AmountTooLarge = 201,
    NoDebtToForgive = 202,
    InsufficientShares = 203,
    AlreadyAtTargetRatio = 204,
    TransferExceedsUnlocked = 205,

    // Loan errors (3xx)
    NotEnoughCollateral = 300,
    ExceedsMaxBorrowPower = 301,
    CratioTooLow = 302,
    CratioAboveLiqRatio = 303,
    UnsupportedCurrency = 304,
    LoanNotFound = 305,
    LoanClosed = 306,
    PaymentExceedsOwing = 307,
    ClaimExceedsPending = 308,
    LiquidationBelowOwing = 309,

    // Authorization errors (4xx)
    Unauthorized = 400,
    NotApprovedToActOnBehalf = 401,
    MustBeBorrower = 402,
    OnlyTrustedMinters = 403,
    OnlyTrustedMigrators = 404,

    // Configuration and registry errors (5xx)
    InvalidConfig = 500,
    LengthMismatch = 501,
    PynthExists = 502,
    PynthDoesNotExist = 503,
    CannotRemovePynth = 504,

    // Token errors (6xx)
    NotEnoughBalance = 600,
    InsufficientAllowance = 601,
}

impl IssuanceError {
    pub const fn message(&self) -> &'static str {
        match self {
            // Gate
            IssuanceError::OperationSuspended => "Operation prohibited",
            IssuanceError::InvalidRate => "A pynth or PERI rate is invalid",
            IssuanceError::CrossChainDebtStale => "Cross chain debt is stale",
            IssuanceError::MinimumStakeTimeNotReached => "Minimum stake time not reached",

            // Issuance
            IssuanceError::ZeroAmount => "Amount must be greater than zero",
            IssuanceError::AmountTooLarge => "Amount too large",
            IssuanceError::NoDebtToForgive => "No debt to forgive",
            IssuanceError::InsufficientShares => "No debt shares to burn",
            IssuanceError::AlreadyAtTargetRatio => "Collateralisation already at target",
            IssuanceError::TransferExceedsUnlocked => "Cannot transfer staked or escrowed PERI",

            // Loans
            IssuanceError::NotEnoughCollateral => "Not enough collateral to open",
            IssuanceError::ExceedsMaxBorrowPower => "Exceeds max borrowing power",
            IssuanceError::CratioTooLow => "Cratio too low",
            IssuanceError::CratioAboveLiqRatio => "Cratio above liq ratio",
            IssuanceError::UnsupportedCurrency => "Not allowed to issue this pynth",
            IssuanceError::LoanNotFound => "Loan does not exist",
            IssuanceError::LoanClosed => "Loan is closed",
            IssuanceError::PaymentExceedsOwing => "Payment exceeds amount owing",
            IssuanceError::ClaimExceedsPending => "Claim exceeds pending withdrawal",
            IssuanceError::LiquidationBelowOwing => "Closing liquidation must cover the amount owing",

            // Authorization
            IssuanceError::Unauthorized => "Unauthorized: caller lacks the required role",
            IssuanceError::NotApprovedToActOnBehalf => "Not approved to act on behalf",
            IssuanceError::MustBeBorrower => "Must be borrower",
            IssuanceError::OnlyTrustedMinters => "Only trusted minters",
            IssuanceError::OnlyTrustedMigrators => "Only trusted debt migrators",

            // Config
            IssuanceError::InvalidConfig => "Invalid configuration parameter",
            IssuanceError::LengthMismatch => "Input array lengths do not match",
            IssuanceError::PynthExists => "Pynth exists",
            IssuanceError::PynthDoesNotExist => "Pynth does not exist",
            IssuanceError::CannotRemovePynth => "Cannot remove pynth",

            // Token
            IssuanceError::NotEnoughBalance => "Not enough balance",
            IssuanceError::InsufficientAllowance => "Insufficient allowance",
        }
    }
}

impl core::fmt::Display for IssuanceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<IssuanceError> for OdraError {
    fn from(error: IssuanceError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}
