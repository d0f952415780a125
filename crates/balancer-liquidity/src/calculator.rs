//! Computes the exact amounts of a join or exit against a pool snapshot and
//! assembles the vault call for it.

use {
    crate::{
        encoding::{PoolCall, UserData, UserDataKind},
        error::{Error, OutOfBounds},
        invariant::Invariant,
        math::fixed_point::Bfp,
        network::Network,
        operation::{Amounts, OperationKind, OperationRequest, OperationResult},
        pool::{PoolSnapshot, TokenState},
        price_impact::{self, PriceImpact},
        slippage::Slippage,
    },
    alloy::primitives::{Address, U256},
    tracing::instrument,
};

/// Calculates liquidity operations for all supported pool families.
#[derive(Clone, Debug, Default)]
pub struct LiquidityCalculator {
    network: Network,
}

/// Amounts of an operation before they are encoded.
struct Computed {
    user_data: UserData,
    /// Pool assets as sent to the vault.
    assets: Vec<Address>,
    /// Vault level limits, one per asset.
    limits: Vec<U256>,
    value: U256,
    expected: Amounts,
    limit: Amounts,
    /// Token amounts entering or leaving the pool, in snapshot order.
    token_amounts: Vec<U256>,
    /// BPT minted or burned.
    bpt: U256,
}

/// Caller supplied token amounts mapped to the snapshot's token order.
struct Sorted {
    amounts: Vec<U256>,
    /// Position of the wrapped native asset if the caller used the native
    /// asset in its place.
    native: Option<usize>,
}

impl LiquidityCalculator {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    #[instrument(skip_all, fields(pool = %snapshot.id(), kind = %snapshot.kind()))]
    pub fn calculate(
        &self,
        snapshot: &PoolSnapshot,
        request: &OperationRequest,
    ) -> Result<OperationResult, Error> {
        let user_data_kind = match &request.kind {
            OperationKind::ExactTokensInForBptOut { .. } => UserDataKind::ExactTokensInForBptOut,
            OperationKind::ExactBptInForTokensOut { .. } => UserDataKind::ExactBptInForTokensOut,
            OperationKind::ExactBptInForOneTokenOut { .. } => {
                UserDataKind::ExactBptInForOneTokenOut
            }
            OperationKind::BptInForExactTokensOut { .. } => UserDataKind::BptInForExactTokensOut,
        };
        let discriminant = user_data_kind
            .discriminant(snapshot.kind(), snapshot.version())
            .ok_or(Error::UnsupportedPoolVersion {
                pool: snapshot.id(),
                kind: snapshot.kind(),
                version: snapshot.version(),
            })?;

        let invariant = Invariant::new(snapshot)?;
        let computed = match &request.kind {
            OperationKind::ExactTokensInForBptOut { tokens, amounts } => self
                .exact_tokens_in_for_bpt_out(
                    snapshot,
                    &invariant,
                    request.slippage,
                    tokens,
                    amounts,
                )?,
            OperationKind::ExactBptInForTokensOut {
                bpt_in,
                unwrap_native,
            } => self.exact_bpt_in_for_tokens_out(
                snapshot,
                &invariant,
                request.slippage,
                *bpt_in,
                *unwrap_native,
            )?,
            OperationKind::ExactBptInForOneTokenOut { bpt_in, token_out } => self
                .exact_bpt_in_for_one_token_out(
                    snapshot,
                    &invariant,
                    request.slippage,
                    *bpt_in,
                    *token_out,
                )?,
            OperationKind::BptInForExactTokensOut { tokens, amounts } => self
                .bpt_in_for_exact_tokens_out(
                    snapshot,
                    &invariant,
                    request.slippage,
                    tokens,
                    amounts,
                )?,
        };

        let is_join = request.kind.is_join();
        let price_impact = if request.price_impact {
            estimate_price_impact(snapshot, &computed, is_join)?
        } else {
            None
        };

        let call = PoolCall {
            pool_id: snapshot.id(),
            sender: request.sender,
            recipient: request.recipient,
            assets: computed.assets.clone(),
            limits: computed.limits,
            user_data: computed.user_data.encode(discriminant),
            internal_balance: request.internal_balance,
        };
        let call_data = if is_join {
            call.encode_join()
        } else {
            call.encode_exit()
        };

        tracing::debug!(
            operation = %user_data_kind,
            slippage_bps = request.slippage.bps(),
            expected = ?computed.expected,
            limit = ?computed.limit,
            ?price_impact,
            "computed liquidity operation"
        );

        Ok(OperationResult {
            target: self.network.vault,
            call_data,
            value: computed.value,
            assets: computed.assets,
            expected: computed.expected,
            limit: computed.limit,
            price_impact,
        })
    }

    fn exact_tokens_in_for_bpt_out(
        &self,
        snapshot: &PoolSnapshot,
        invariant: &Invariant,
        slippage: Slippage,
        tokens: &[Address],
        amounts: &[U256],
    ) -> Result<Computed, Error> {
        let sorted = self.sort_amounts(snapshot, tokens, amounts)?;
        if sorted.amounts.iter().all(U256::is_zero) {
            return Err(Error::AmountOutOfBounds(OutOfBounds::Zero));
        }

        let math_amounts = snapshot.bpt_index().remove(&sorted.amounts);
        let bpt_out = invariant
            .bpt_out_given_exact_tokens_in(
                &snapshot.upscaled_balances()?,
                &upscale(&snapshot.math_tokens(), &math_amounts)?,
                snapshot.total_supply(),
                snapshot.swap_fee(),
            )?
            .as_uint256();
        let min_bpt_out = slippage.sub_slippage(bpt_out)?;

        Ok(Computed {
            user_data: UserData::ExactTokensInForBptOut {
                amounts_in: math_amounts,
                min_bpt_out,
            },
            assets: assets(snapshot, sorted.native),
            limits: sorted.amounts.clone(),
            value: sorted
                .native
                .map(|index| sorted.amounts[index])
                .unwrap_or_default(),
            expected: Amounts::Bpt(bpt_out),
            limit: Amounts::Bpt(min_bpt_out),
            token_amounts: sorted.amounts,
            bpt: bpt_out,
        })
    }

    fn exact_bpt_in_for_tokens_out(
        &self,
        snapshot: &PoolSnapshot,
        invariant: &Invariant,
        slippage: Slippage,
        bpt_in: U256,
        unwrap_native: bool,
    ) -> Result<Computed, Error> {
        check_bpt_in(snapshot, bpt_in)?;
        let native = if unwrap_native {
            Some(snapshot.index_of(self.network.wrapped_native_asset)?)
        } else {
            None
        };

        let amounts_out = invariant.tokens_out_given_exact_bpt_in(
            &snapshot.upscaled_balances()?,
            Bfp::from_wei(bpt_in),
            snapshot.total_supply(),
        )?;
        let amounts_out = snapshot
            .math_tokens()
            .iter()
            .zip(amounts_out)
            .map(|(token, amount)| token.downscale_down(amount))
            .collect::<Result<Vec<_>, _>>()?;
        let amounts_out = snapshot.bpt_index().insert(amounts_out, U256::ZERO);
        let min_amounts_out = amounts_out
            .iter()
            .map(|amount| slippage.sub_slippage(*amount))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Computed {
            user_data: UserData::ExactBptInForTokensOut { bpt_in },
            assets: assets(snapshot, native),
            limits: min_amounts_out.clone(),
            value: U256::ZERO,
            expected: Amounts::Tokens(amounts_out.clone()),
            limit: Amounts::Tokens(min_amounts_out),
            token_amounts: amounts_out,
            bpt: bpt_in,
        })
    }

    fn exact_bpt_in_for_one_token_out(
        &self,
        snapshot: &PoolSnapshot,
        invariant: &Invariant,
        slippage: Slippage,
        bpt_in: U256,
        token_out: Address,
    ) -> Result<Computed, Error> {
        check_bpt_in(snapshot, bpt_in)?;
        let token = self.network.resolve(token_out);
        let index = snapshot.index_of(token)?;
        let token_index = snapshot
            .bpt_index()
            .math_index(index)
            .ok_or(Error::TokenNotInPool {
                pool: snapshot.id(),
                token,
            })?;

        let amount_out = invariant.token_out_given_exact_bpt_in(
            &snapshot.upscaled_balances()?,
            token_index,
            Bfp::from_wei(bpt_in),
            snapshot.total_supply(),
            snapshot.swap_fee(),
        )?;
        let amount_out = snapshot.tokens()[index].downscale_down(amount_out)?;

        let mut amounts_out = vec![U256::ZERO; snapshot.tokens().len()];
        amounts_out[index] = amount_out;
        let mut min_amounts_out = amounts_out.clone();
        min_amounts_out[index] = slippage.sub_slippage(amount_out)?;

        Ok(Computed {
            user_data: UserData::ExactBptInForOneTokenOut {
                bpt_in,
                token_index,
            },
            assets: assets(snapshot, token_out.is_zero().then_some(index)),
            limits: min_amounts_out.clone(),
            value: U256::ZERO,
            expected: Amounts::Tokens(amounts_out.clone()),
            limit: Amounts::Tokens(min_amounts_out),
            token_amounts: amounts_out,
            bpt: bpt_in,
        })
    }

    fn bpt_in_for_exact_tokens_out(
        &self,
        snapshot: &PoolSnapshot,
        invariant: &Invariant,
        slippage: Slippage,
        tokens: &[Address],
        amounts: &[U256],
    ) -> Result<Computed, Error> {
        let sorted = self.sort_amounts(snapshot, tokens, amounts)?;
        if sorted.amounts.iter().all(U256::is_zero) {
            return Err(Error::AmountOutOfBounds(OutOfBounds::Zero));
        }
        if let Some(token) = snapshot
            .tokens()
            .iter()
            .zip(&sorted.amounts)
            .find(|(token, amount)| **amount > token.balance)
            .map(|(token, _)| token.address)
        {
            return Err(Error::AmountOutOfBounds(OutOfBounds::ExceedsBalance {
                token,
            }));
        }

        let math_amounts = snapshot.bpt_index().remove(&sorted.amounts);
        let bpt_in = invariant
            .bpt_in_given_exact_tokens_out(
                &snapshot.upscaled_balances()?,
                &upscale(&snapshot.math_tokens(), &math_amounts)?,
                snapshot.total_supply(),
                snapshot.swap_fee(),
            )?
            .as_uint256();
        if bpt_in > snapshot.total_supply().as_uint256() {
            return Err(Error::AmountOutOfBounds(OutOfBounds::ExceedsSupply));
        }
        let max_bpt_in = slippage.add_slippage(bpt_in)?;

        Ok(Computed {
            user_data: UserData::BptInForExactTokensOut {
                amounts_out: math_amounts,
                max_bpt_in,
            },
            assets: assets(snapshot, sorted.native),
            limits: sorted.amounts.clone(),
            value: U256::ZERO,
            expected: Amounts::Bpt(bpt_in),
            limit: Amounts::Bpt(max_bpt_in),
            token_amounts: sorted.amounts,
            bpt: bpt_in,
        })
    }

    /// Maps caller supplied token amounts onto the snapshot's token order.
    /// Every token except the pool's own BPT must be given exactly once.
    fn sort_amounts(
        &self,
        snapshot: &PoolSnapshot,
        tokens: &[Address],
        amounts: &[U256],
    ) -> Result<Sorted, Error> {
        if tokens.len() != amounts.len() {
            return Err(Error::InputLengthMismatch {
                expected: tokens.len(),
                actual: amounts.len(),
            });
        }
        let expected = snapshot.math_tokens().len();
        if tokens.len() != expected {
            return Err(Error::InputLengthMismatch {
                expected,
                actual: tokens.len(),
            });
        }

        let mut sorted = vec![None; snapshot.tokens().len()];
        let mut native = None;
        for (token, amount) in tokens.iter().zip(amounts) {
            let resolved = self.network.resolve(*token);
            let index = snapshot.index_of(resolved)?;
            if snapshot.bpt_index().is_bpt(index) {
                return Err(Error::TokenNotInPool {
                    pool: snapshot.id(),
                    token: resolved,
                });
            }
            if sorted[index].replace(*amount).is_some() {
                return Err(Error::DuplicateToken(resolved));
            }
            if token.is_zero() {
                native = Some(index);
            }
        }

        Ok(Sorted {
            amounts: sorted.into_iter().map(Option::unwrap_or_default).collect(),
            native,
        })
    }
}

/// Price impact of the computed amounts, or `None` when they are worth less
/// than one wei of BPT at spot prices.
fn estimate_price_impact(
    snapshot: &PoolSnapshot,
    computed: &Computed,
    is_join: bool,
) -> Result<Option<PriceImpact>, Error> {
    let zero_impact = price_impact::bpt_zero_price_impact(snapshot, &computed.token_amounts)?;
    if zero_impact.is_zero() {
        tracing::debug!("amounts too small to estimate price impact");
        return Ok(None);
    }
    let bpt = Bfp::from_wei(computed.bpt);
    Ok(Some(if is_join {
        PriceImpact::join(bpt, zero_impact)?
    } else {
        PriceImpact::exit(bpt, zero_impact)?
    }))
}

fn check_bpt_in(snapshot: &PoolSnapshot, bpt_in: U256) -> Result<(), Error> {
    if bpt_in.is_zero() {
        return Err(Error::AmountOutOfBounds(OutOfBounds::Zero));
    }
    if bpt_in > snapshot.total_supply().as_uint256() {
        return Err(Error::AmountOutOfBounds(OutOfBounds::ExceedsSupply));
    }
    Ok(())
}

fn upscale(tokens: &[TokenState], amounts: &[U256]) -> Result<Vec<Bfp>, Error> {
    Ok(tokens
        .iter()
        .zip(amounts)
        .map(|(token, amount)| token.upscale(*amount))
        .collect::<Result<_, _>>()?)
}

/// Snapshot tokens with the native asset placeholder at `native`.
fn assets(snapshot: &PoolSnapshot, native: Option<usize>) -> Vec<Address> {
    snapshot
        .tokens()
        .iter()
        .enumerate()
        .map(|(i, token)| {
            if native == Some(i) {
                Address::ZERO
            } else {
                token.address
            }
        })
        .collect()
}
