//! Error Types for ctez Protocol
//!
//! Typed errors carrying the values that made an operation fail. Every
//! error is raised before the failing operation writes any state, and
//! aborts the enclosing batch.

use core::fmt;

use crate::types::{Address, OvenKey};

/// Result type alias for ctez operations
pub type CtezResult<T> = Result<T, CtezError>;

/// Main error enum for all ctez protocol errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtezError {
    // ============ Authorization Errors ============
    /// Caller is not the oven owner
    NotOwner { expected: Address, actual: Address },

    /// Caller may not deposit into this oven
    DepositorNotAllowed { oven: OvenKey, depositor: Address },

    /// Only the token administrator may mint or burn
    UnauthorizedMinter { caller: Address },

    // ============ Temporal Errors ============
    /// Operation submitted after its deadline
    DeadlineHasPassed { deadline: u64, now: u64 },

    // ============ Collateral Errors ============
    /// Oven would fall below the minimum collateral ratio
    Undercollateralized { collateral: u64, debt: u64, target: u128 },

    /// Withdrawal exceeds locked collateral
    InsufficientCollateral { available: u64, requested: u64 },

    /// Burn exceeds outstanding debt
    ExcessiveBurn { debt: u64, requested: u64 },

    /// Oven is healthy and cannot be liquidated
    NotUndercollateralized { oven: OvenKey },

    /// Liquidation exceeds the per-call maximum
    ExcessiveLiquidation { requested: u64, maximum: u64 },

    /// No oven registered under this key
    OvenNotFound { oven: OvenKey },

    /// An oven with this key is already registered
    OvenAlreadyExists { oven: OvenKey },

    // ============ Liquidity Errors ============
    /// Fewer shares minted than the caller's minimum
    InsufficientLiquidityCreated { minted: u64, minimum: u64 },

    /// Burning more shares than the account holds
    InsufficientLiquidityOwned { owned: u64, requested: u64 },

    /// Destination pool cannot fill the swap
    InsufficientTokensLiquidity { available: u64, requested: u64 },

    /// Swap output below the caller's minimum
    InsufficientTokensBought { bought: u64, minimum: u64 },

    /// Pool share withdrawn below the caller's minimum
    InsufficientSelfReceived { received: u64, minimum: u64 },

    /// Proceeds paid below the caller's minimum
    InsufficientProceedsReceived { received: u64, minimum: u64 },

    /// Subsidy paid below the caller's minimum
    InsufficientSubsidyReceived { received: u64, minimum: u64 },

    // ============ Input Errors ============
    /// Native tez attached to an entrypoint that does not accept it
    TezInTransactionDisallowed { amount: u64 },

    /// Invalid input parameter
    InvalidInput { param: &'static str, reason: &'static str },

    /// A batch must contain at least one step
    EmptyBatch,

    // ============ Token Errors ============
    /// Account balance too low for a transfer
    InsufficientBalance { available: u64, requested: u64 },

    /// Spender allowance too low for a transfer
    NotEnoughAllowance { available: u64, requested: u64 },

    /// Allowance changed from non-zero to non-zero
    UnsafeAllowanceChange { current: u64 },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    ArithmeticOverflow,

    /// Division by zero
    DivisionByZero,
}

/// Error taxonomy for callers that only need to know what went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks permission
    Authorization,
    /// Deadline expired
    Temporal,
    /// Oven collateral or debt bound violated
    Collateral,
    /// Pool liquidity or slippage bound violated
    Liquidity,
    /// Malformed call
    Input,
    /// External token collaborator refused a transfer
    Token,
    /// Fixed-point arithmetic failure
    Arithmetic,
}

impl CtezError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotOwner { .. } => "E001_NOT_OWNER",
            Self::DepositorNotAllowed { .. } => "E002_DEPOSITOR_NOT_ALLOWED",
            Self::UnauthorizedMinter { .. } => "E003_UNAUTHORIZED_MINTER",
            Self::DeadlineHasPassed { .. } => "E010_DEADLINE_HAS_PASSED",
            Self::Undercollateralized { .. } => "E020_UNDERCOLLATERALIZED",
            Self::InsufficientCollateral { .. } => "E021_INSUFFICIENT_COLLATERAL",
            Self::ExcessiveBurn { .. } => "E022_EXCESSIVE_BURN",
            Self::NotUndercollateralized { .. } => "E023_NOT_UNDERCOLLATERALIZED",
            Self::ExcessiveLiquidation { .. } => "E024_EXCESSIVE_LIQUIDATION",
            Self::OvenNotFound { .. } => "E025_OVEN_NOT_FOUND",
            Self::OvenAlreadyExists { .. } => "E026_OVEN_ALREADY_EXISTS",
            Self::InsufficientLiquidityCreated { .. } => "E030_INSUFFICIENT_LIQUIDITY_CREATED",
            Self::InsufficientLiquidityOwned { .. } => "E031_INSUFFICIENT_LIQUIDITY_OWNED",
            Self::InsufficientTokensLiquidity { .. } => "E032_INSUFFICIENT_TOKENS_LIQUIDITY",
            Self::InsufficientTokensBought { .. } => "E033_INSUFFICIENT_TOKENS_BOUGHT",
            Self::InsufficientSelfReceived { .. } => "E034_INSUFFICIENT_SELF_RECEIVED",
            Self::InsufficientProceedsReceived { .. } => "E035_INSUFFICIENT_PROCEEDS_RECEIVED",
            Self::InsufficientSubsidyReceived { .. } => "E036_INSUFFICIENT_SUBSIDY_RECEIVED",
            Self::TezInTransactionDisallowed { .. } => "E040_TEZ_IN_TRANSACTION_DISALLOWED",
            Self::InvalidInput { .. } => "E041_INVALID_INPUT",
            Self::EmptyBatch => "E042_EMPTY_BATCH",
            Self::InsufficientBalance { .. } => "E050_INSUFFICIENT_BALANCE",
            Self::NotEnoughAllowance { .. } => "E051_NOT_ENOUGH_ALLOWANCE",
            Self::UnsafeAllowanceChange { .. } => "E052_UNSAFE_ALLOWANCE_CHANGE",
            Self::ArithmeticOverflow => "E060_ARITHMETIC_OVERFLOW",
            Self::DivisionByZero => "E061_DIV_ZERO",
        }
    }

    /// Returns the taxonomy bucket of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOwner { .. }
            | Self::DepositorNotAllowed { .. }
            | Self::UnauthorizedMinter { .. } => ErrorKind::Authorization,
            Self::DeadlineHasPassed { .. } => ErrorKind::Temporal,
            Self::Undercollateralized { .. }
            | Self::InsufficientCollateral { .. }
            | Self::ExcessiveBurn { .. }
            | Self::NotUndercollateralized { .. }
            | Self::ExcessiveLiquidation { .. }
            | Self::OvenNotFound { .. } => ErrorKind::Collateral,
            Self::InsufficientLiquidityCreated { .. }
            | Self::InsufficientLiquidityOwned { .. }
            | Self::InsufficientTokensLiquidity { .. }
            | Self::InsufficientTokensBought { .. }
            | Self::InsufficientSelfReceived { .. }
            | Self::InsufficientProceedsReceived { .. }
            | Self::InsufficientSubsidyReceived { .. } => ErrorKind::Liquidity,
            Self::TezInTransactionDisallowed { .. }
            | Self::OvenAlreadyExists { .. }
            | Self::InvalidInput { .. }
            | Self::EmptyBatch => ErrorKind::Input,
            Self::InsufficientBalance { .. }
            | Self::NotEnoughAllowance { .. }
            | Self::UnsafeAllowanceChange { .. } => ErrorKind::Token,
            Self::ArithmeticOverflow | Self::DivisionByZero => ErrorKind::Arithmetic,
        }
    }

    /// Returns true if resubmitting with different parameters can succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::DeadlineHasPassed { .. } => true,      // Pick a later deadline
            Self::Undercollateralized { .. } => true,    // Deposit more tez
            Self::InsufficientTokensBought { .. } => true, // Loosen slippage
            Self::InsufficientLiquidityCreated { .. } => true,
            Self::ExcessiveLiquidation { .. } => true,   // Liquidate less
            Self::NotEnoughAllowance { .. } => true,     // Approve first
            _ => false,
        }
    }
}

impl fmt::Display for CtezError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadlineHasPassed { deadline, now } => {
                write!(f, "{}: deadline {} < now {}", self.code(), deadline, now)
            }
            Self::Undercollateralized { collateral, debt, target } => write!(
                f,
                "{}: collateral {} debt {} target {}",
                self.code(),
                collateral,
                debt,
                target
            ),
            Self::InsufficientTokensBought { bought, minimum }
            | Self::InsufficientSelfReceived { received: bought, minimum }
            | Self::InsufficientProceedsReceived { received: bought, minimum }
            | Self::InsufficientSubsidyReceived { received: bought, minimum } => {
                write!(f, "{}: got {} < minimum {}", self.code(), bought, minimum)
            }
            Self::InvalidInput { param, reason } => {
                write!(f, "{}: {} {}", self.code(), param, reason)
            }
            _ => f.write_str(self.code()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CtezError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let oven = OvenKey::new(1, [1u8; 32]);
        let errors = [
            CtezError::NotOwner { expected: [1u8; 32], actual: [2u8; 32] },
            CtezError::DepositorNotAllowed { oven, depositor: [3u8; 32] },
            CtezError::DeadlineHasPassed { deadline: 1, now: 2 },
            CtezError::OvenAlreadyExists { oven },
            CtezError::OvenNotFound { oven },
            CtezError::InsufficientTokensBought { bought: 1, minimum: 2 },
            CtezError::InsufficientTokensLiquidity { available: 1, requested: 2 },
            CtezError::TezInTransactionDisallowed { amount: 1 },
            CtezError::ArithmeticOverflow,
            CtezError::DivisionByZero,
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CtezError::DeadlineHasPassed { deadline: 0, now: 1 }.kind(),
            ErrorKind::Temporal
        );
        assert_eq!(
            CtezError::OvenAlreadyExists { oven: OvenKey::new(0, [0u8; 32]) }.kind(),
            ErrorKind::Input
        );
        assert_eq!(CtezError::ArithmeticOverflow.kind(), ErrorKind::Arithmetic);
        assert_eq!(
            CtezError::ExcessiveBurn { debt: 1, requested: 2 }.kind(),
            ErrorKind::Collateral
        );
    }

    #[test]
    fn test_display_includes_code() {
        let err = CtezError::InsufficientTokensBought { bought: 5, minimum: 8 };
        let text = format!("{}", err);
        assert!(text.starts_with("E033_INSUFFICIENT_TOKENS_BOUGHT"));
        assert!(text.contains("5"));
    }
}
