//! Errors surfaced to callers of the liquidity operations.

use {
    crate::{math, pool::PoolKind},
    alloy::primitives::{Address, B256},
};

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("arithmetic overflow: {0}")]
    ArithmeticOverflow(math::error::Error),
    #[error("division by zero")]
    DivisionByZero,
    #[error("invariant did not converge: {0}")]
    InvariantDidNotConverge(math::error::Error),
    #[error("expected {expected} token amounts but got {actual}")]
    InputLengthMismatch { expected: usize, actual: usize },
    #[error("pool {pool} is missing {field}{}", for_token(.token))]
    MissingPoolField {
        pool: B256,
        field: PoolField,
        token: Option<Address>,
    },
    #[error("pool {pool} has an invalid {field}: {reason}")]
    InvalidPoolField {
        pool: B256,
        field: PoolField,
        reason: String,
    },
    #[error("token {token} is not part of pool {pool}")]
    TokenNotInPool { pool: B256, token: Address },
    #[error("token {0} is specified more than once")]
    DuplicateToken(Address),
    #[error("operation not supported by {kind} pool {pool} version {version}")]
    UnsupportedPoolVersion {
        pool: B256,
        kind: PoolKind,
        version: u32,
    },
    #[error("single token out {token_out} conflicts with unwrap native asset {unwrap_native}")]
    ConflictingParameters {
        token_out: Address,
        unwrap_native: bool,
    },
    #[error("amount out of bounds: {0}")]
    AmountOutOfBounds(OutOfBounds),
}

/// Pool fields that can be missing or malformed in a pool snapshot.
#[derive(Debug, Clone, Copy, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PoolField {
    Decimals,
    Amplification,
    PriceRate,
    Weight,
    SwapFee,
    TotalSupply,
}

/// Why an amount was rejected.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum OutOfBounds {
    #[error("slippage of {0} bps exceeds 10000 bps")]
    Slippage(u32),
    #[error("amount must be greater than zero")]
    Zero,
    #[error("amount of {token} exceeds its pool balance")]
    ExceedsBalance { token: Address },
    #[error("bpt amount exceeds the total supply")]
    ExceedsSupply,
    #[error(transparent)]
    Math(math::error::Error),
}

fn for_token(token: &Option<Address>) -> String {
    token
        .map(|token| format!(" for token {token}"))
        .unwrap_or_default()
}

impl From<math::error::Error> for Error {
    fn from(err: math::error::Error) -> Self {
        use math::error::Error as Math;
        match err {
            Math::ZeroDivision => Self::DivisionByZero,
            Math::AddOverflow | Math::SubOverflow | Math::MulOverflow | Math::DivInternal => {
                Self::ArithmeticOverflow(err)
            }
            Math::StableInvariantDidntConverge | Math::StableGetBalanceDidntConverge => {
                Self::InvariantDidNotConverge(err)
            }
            Math::XOutOfBounds
            | Math::YOutOfBounds
            | Math::ProductOutOfBounds
            | Math::InvalidExponent
            | Math::MinBptInForTokenOut
            | Math::ZeroInvariant => Self::AmountOutOfBounds(OutOfBounds::Math(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address};

    #[test]
    fn math_errors_map_to_kinds() {
        use math::error::Error as Math;
        assert_eq!(Error::from(Math::ZeroDivision), Error::DivisionByZero);
        assert_eq!(
            Error::from(Math::MulOverflow),
            Error::ArithmeticOverflow(Math::MulOverflow)
        );
        assert_eq!(
            Error::from(Math::StableGetBalanceDidntConverge),
            Error::InvariantDidNotConverge(Math::StableGetBalanceDidntConverge)
        );
        assert_eq!(
            Error::from(Math::MinBptInForTokenOut),
            Error::AmountOutOfBounds(OutOfBounds::Math(Math::MinBptInForTokenOut))
        );
    }

    #[test]
    fn messages_carry_context() {
        let token = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
        let err = Error::MissingPoolField {
            pool: B256::ZERO,
            field: PoolField::PriceRate,
            token: Some(token),
        };
        assert!(err.to_string().ends_with(&format!("is missing price_rate for token {token}")));

        let err = Error::MissingPoolField {
            pool: B256::ZERO,
            field: PoolField::Amplification,
            token: None,
        };
        assert!(err.to_string().ends_with("is missing amplification"));
    }
}
