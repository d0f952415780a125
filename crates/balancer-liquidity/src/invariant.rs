//! Dispatch from a pool family to the invariant math it uses.

use {
    crate::{
        error::{Error, PoolField},
        math::{self, fixed_point::Bfp, stable_math, weighted_math},
        pool::{self, PoolKind, PoolSnapshot},
    },
    alloy::primitives::U256,
};

/// Invariant of a pool along with its parameters. All balance arrays passed
/// in are upscaled and exclude the pool's own BPT.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Invariant {
    Weighted { weights: Vec<Bfp> },
    Stable { amplification: U256 },
}

impl Invariant {
    pub fn new(snapshot: &PoolSnapshot) -> Result<Self, Error> {
        match snapshot.kind() {
            PoolKind::Weighted => {
                let weights = snapshot
                    .math_tokens()
                    .iter()
                    .map(|token| {
                        token.weight.ok_or(Error::MissingPoolField {
                            pool: snapshot.id(),
                            field: PoolField::Weight,
                            token: Some(token.address),
                        })
                    })
                    .collect::<Result<_, _>>()?;
                Ok(Self::Weighted { weights })
            }
            PoolKind::Stable | PoolKind::ComposableStable | PoolKind::MetaStable => {
                Ok(Self::Stable {
                    amplification: pool::amplification(snapshot)?,
                })
            }
        }
    }

    pub fn bpt_out_given_exact_tokens_in(
        &self,
        balances: &[Bfp],
        amounts_in: &[Bfp],
        bpt_total_supply: Bfp,
        swap_fee: Bfp,
    ) -> Result<Bfp, math::error::Error> {
        match self {
            Self::Weighted { weights } => weighted_math::calc_bpt_out_given_exact_tokens_in(
                balances,
                weights,
                amounts_in,
                bpt_total_supply,
                swap_fee,
            ),
            Self::Stable { amplification } => stable_math::calc_bpt_out_given_exact_tokens_in(
                *amplification,
                balances,
                amounts_in,
                bpt_total_supply,
                swap_fee,
            ),
        }
    }

    pub fn bpt_in_given_exact_tokens_out(
        &self,
        balances: &[Bfp],
        amounts_out: &[Bfp],
        bpt_total_supply: Bfp,
        swap_fee: Bfp,
    ) -> Result<Bfp, math::error::Error> {
        match self {
            Self::Weighted { weights } => weighted_math::calc_bpt_in_given_exact_tokens_out(
                balances,
                weights,
                amounts_out,
                bpt_total_supply,
                swap_fee,
            ),
            Self::Stable { amplification } => stable_math::calc_bpt_in_given_exact_tokens_out(
                *amplification,
                balances,
                amounts_out,
                bpt_total_supply,
                swap_fee,
            ),
        }
    }

    pub fn token_out_given_exact_bpt_in(
        &self,
        balances: &[Bfp],
        token_index: usize,
        bpt_amount_in: Bfp,
        bpt_total_supply: Bfp,
        swap_fee: Bfp,
    ) -> Result<Bfp, math::error::Error> {
        match self {
            Self::Weighted { weights } => weighted_math::calc_token_out_given_exact_bpt_in(
                balances[token_index],
                weights[token_index],
                bpt_amount_in,
                bpt_total_supply,
                swap_fee,
            ),
            Self::Stable { amplification } => stable_math::calc_token_out_given_exact_bpt_in(
                *amplification,
                balances,
                token_index,
                bpt_amount_in,
                bpt_total_supply,
                swap_fee,
            ),
        }
    }

    /// Proportional exits do not depend on the invariant.
    pub fn tokens_out_given_exact_bpt_in(
        &self,
        balances: &[Bfp],
        bpt_amount_in: Bfp,
        bpt_total_supply: Bfp,
    ) -> Result<Vec<Bfp>, math::error::Error> {
        math::calc_tokens_out_given_exact_bpt_in(balances, bpt_amount_in, bpt_total_supply)
    }

    /// Marginal BPT per unit of the token at `token_index`.
    pub fn bpt_per_token(
        &self,
        balances: &[Bfp],
        token_index: usize,
        bpt_total_supply: Bfp,
    ) -> Result<Bfp, math::error::Error> {
        match self {
            Self::Weighted { weights } => weighted_math::calc_bpt_per_token(
                balances[token_index],
                weights[token_index],
                bpt_total_supply,
            ),
            Self::Stable { amplification } => stable_math::calc_bpt_per_token(
                *amplification,
                balances,
                token_index,
                bpt_total_supply,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            math::fixed_point::bfp,
            pool::tests::{stable_state, weighted_state},
        },
    };

    #[test]
    fn picks_invariant_by_family() {
        let weighted = PoolSnapshot::new(weighted_state()).unwrap();
        assert_eq!(
            Invariant::new(&weighted).unwrap(),
            Invariant::Weighted {
                weights: vec![bfp!("0.5"), bfp!("0.5")]
            }
        );

        for kind in [PoolKind::Stable, PoolKind::MetaStable] {
            let mut state = stable_state(kind);
            for token in &mut state.tokens {
                token.price_rate = Some(Bfp::one());
            }
            let stable = PoolSnapshot::new(state).unwrap();
            assert_eq!(
                Invariant::new(&stable).unwrap(),
                Invariant::Stable {
                    amplification: U256::from(100_000)
                }
            );
        }
    }

    #[test]
    fn weighted_single_token_exit_uses_its_own_weight() {
        let invariant = Invariant::Weighted {
            weights: vec![bfp!("0.5"), bfp!("0.5")],
        };
        let amount_out = invariant
            .token_out_given_exact_bpt_in(
                &[bfp!("2.5"), bfp!("5000")],
                1,
                bfp!("2.236067977499789696"),
                bfp!("223.606797749978969640"),
                bfp!("0.003"),
            )
            .unwrap();
        assert_eq!(
            amount_out,
            Bfp::from_wei(U256::from(99_350_749_999_999_990_015_u128))
        );
    }
}
