//! Requests for liquidity operations and the results computed for them.

use {
    crate::{error::Error, price_impact::PriceImpact, slippage::Slippage},
    alloy::primitives::{Address, Bytes, U256},
};

/// A join or exit to compute against a pool snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperationRequest {
    pub sender: Address,
    pub recipient: Address,
    pub slippage: Slippage,
    /// Whether the vault should use the sender's (or credit the recipient's)
    /// internal balance instead of ERC20 transfers.
    pub internal_balance: bool,
    /// Whether to estimate the price impact of the operation.
    pub price_impact: bool,
    pub kind: OperationKind,
}

/// The operation to perform. Token lists may contain the zero address to
/// refer to the chain's native asset and may be in any order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OperationKind {
    /// Deposit exact token amounts and receive at least a minimum of BPT.
    ExactTokensInForBptOut {
        tokens: Vec<Address>,
        amounts: Vec<U256>,
    },
    /// Burn an exact amount of BPT and receive all tokens proportionally.
    ExactBptInForTokensOut { bpt_in: U256, unwrap_native: bool },
    /// Burn an exact amount of BPT and receive a single token.
    ExactBptInForOneTokenOut { bpt_in: U256, token_out: Address },
    /// Withdraw exact token amounts burning at most a maximum of BPT.
    BptInForExactTokensOut {
        tokens: Vec<Address>,
        amounts: Vec<U256>,
    },
}

impl OperationKind {
    /// Exit burning an exact amount of BPT, either for a single token or
    /// proportionally for all of them.
    ///
    /// A native asset single token exit is requested with the zero address
    /// together with `unwrap_native`. Any other combination of a single token
    /// with the flag is conflicting.
    pub fn exit_exact_bpt_in(
        bpt_in: U256,
        single_token_out: Option<Address>,
        unwrap_native: bool,
    ) -> Result<Self, Error> {
        match single_token_out {
            None => Ok(Self::ExactBptInForTokensOut {
                bpt_in,
                unwrap_native,
            }),
            Some(token_out) if token_out.is_zero() == unwrap_native => {
                Ok(Self::ExactBptInForOneTokenOut { bpt_in, token_out })
            }
            Some(token_out) => Err(Error::ConflictingParameters {
                token_out,
                unwrap_native,
            }),
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self, Self::ExactTokensInForBptOut { .. })
    }
}

/// Amounts computed for an operation. Token amounts are in the order of
/// [`OperationResult::assets`], with a zero entry for the pool's own BPT.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Amounts {
    Bpt(U256),
    Tokens(Vec<U256>),
}

/// A computed operation ready to be signed and submitted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperationResult {
    pub target: Address,
    pub call_data: Bytes,
    /// Native asset to send along with the call.
    pub value: U256,
    /// Pool assets in the order the vault expects them, with the native asset
    /// as the zero address.
    pub assets: Vec<Address>,
    /// Amount the pool math predicts.
    pub expected: Amounts,
    /// Slippage adjusted bound encoded into the call.
    pub limit: Amounts,
    pub price_impact: Option<PriceImpact>,
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address};

    #[test]
    fn exit_dispatch() {
        let bpt_in = U256::from(1);
        let dai = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");

        assert_eq!(
            OperationKind::exit_exact_bpt_in(bpt_in, None, true).unwrap(),
            OperationKind::ExactBptInForTokensOut {
                bpt_in,
                unwrap_native: true
            }
        );
        assert_eq!(
            OperationKind::exit_exact_bpt_in(bpt_in, Some(dai), false).unwrap(),
            OperationKind::ExactBptInForOneTokenOut {
                bpt_in,
                token_out: dai
            }
        );
        assert_eq!(
            OperationKind::exit_exact_bpt_in(bpt_in, Some(Address::ZERO), true).unwrap(),
            OperationKind::ExactBptInForOneTokenOut {
                bpt_in,
                token_out: Address::ZERO
            }
        );
    }

    #[test]
    fn conflicting_exit_parameters() {
        let dai = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
        assert_eq!(
            OperationKind::exit_exact_bpt_in(U256::from(1), Some(dai), true),
            Err(Error::ConflictingParameters {
                token_out: dai,
                unwrap_native: true
            })
        );
        assert_eq!(
            OperationKind::exit_exact_bpt_in(U256::from(1), Some(Address::ZERO), false),
            Err(Error::ConflictingParameters {
                token_out: Address::ZERO,
                unwrap_native: false
            })
        );
    }
}
