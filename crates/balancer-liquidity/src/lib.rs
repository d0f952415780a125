//! Off-chain Balancer V2 liquidity math: predicts the exact amounts of pool
//! joins and exits and encodes the corresponding vault calls.

pub mod calculator;
pub mod encoding;
pub mod error;
pub mod invariant;
pub mod math;
pub mod network;
pub mod operation;
pub mod pool;
pub mod price_impact;
pub mod slippage;

pub use {
    calculator::LiquidityCalculator,
    error::Error,
    math::fixed_point::Bfp,
    network::Network,
    operation::{Amounts, OperationKind, OperationRequest, OperationResult},
    pool::{AmplificationParameter, PoolKind, PoolSnapshot, PoolState, PoolToken},
    price_impact::PriceImpact,
    slippage::Slippage,
};
