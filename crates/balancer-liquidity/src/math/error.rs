//! Error codes raised by the Balancer V2 math libraries. The `BAL#` numbers
//! match the ones the contracts revert with, which makes it possible to line
//! up an off-chain failure with the on-chain revert reason.

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("BAL#000: addition overflow")]
    AddOverflow,
    #[error("BAL#001: subtraction overflow")]
    SubOverflow,
    #[error("BAL#003: multiplication overflow")]
    MulOverflow,
    #[error("BAL#004: division by zero")]
    ZeroDivision,
    #[error("BAL#005: internal division overflow")]
    DivInternal,
    #[error("BAL#006: x out of bounds")]
    XOutOfBounds,
    #[error("BAL#007: y out of bounds")]
    YOutOfBounds,
    #[error("BAL#008: product out of bounds")]
    ProductOutOfBounds,
    #[error("BAL#009: invalid exponent")]
    InvalidExponent,
    #[error("BAL#306: bpt in too large for single token out")]
    MinBptInForTokenOut,
    #[error("BAL#311: zero invariant")]
    ZeroInvariant,
    #[error("BAL#321: stable invariant did not converge")]
    StableInvariantDidntConverge,
    #[error("BAL#322: stable get balance did not converge")]
    StableGetBalanceDidntConverge,
}
