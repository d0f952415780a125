//! Price impact of an operation relative to the linear approximation given by
//! the pool's spot prices.

use {
    crate::{
        error::Error,
        invariant::Invariant,
        math::{self, fixed_point::Bfp},
        pool::PoolSnapshot,
    },
    alloy::primitives::{I256, U256},
    std::fmt::{self, Display, Formatter},
};

/// Signed 18 decimal fraction. Negative values mean the operation is worse
/// than what the spot prices suggest.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct PriceImpact(I256);

impl PriceImpact {
    /// `bpt_out / zero_impact - 1`
    pub fn join(bpt_out: Bfp, zero_impact: Bfp) -> Result<Self, Error> {
        Self::ratio_minus_one(bpt_out, zero_impact)
    }

    /// `zero_impact / bpt_in - 1`
    pub fn exit(bpt_in: Bfp, zero_impact: Bfp) -> Result<Self, Error> {
        Self::ratio_minus_one(zero_impact, bpt_in)
    }

    fn ratio_minus_one(numerator: Bfp, denominator: Bfp) -> Result<Self, Error> {
        let ratio = signed(numerator.div_down(denominator)?)?;
        Ok(Self(ratio - signed(Bfp::one())?))
    }

    pub fn as_i256(&self) -> I256 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
}

fn signed(value: Bfp) -> Result<I256, Error> {
    Ok(I256::try_from(value.as_uint256()).map_err(|_| math::error::Error::MulOverflow)?)
}

impl Display for PriceImpact {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{sign}{}", Bfp::from_wei(self.0.unsigned_abs()))
    }
}

/// BPT amount the token amounts would be worth at the pool's spot prices.
///
/// `amounts` are raw token amounts in the snapshot's token order, including
/// the slot of the pool's own BPT (which is ignored).
pub fn bpt_zero_price_impact(snapshot: &PoolSnapshot, amounts: &[U256]) -> Result<Bfp, Error> {
    if amounts.len() != snapshot.tokens().len() {
        return Err(Error::InputLengthMismatch {
            expected: snapshot.tokens().len(),
            actual: amounts.len(),
        });
    }

    let invariant = Invariant::new(snapshot)?;
    let balances = snapshot.upscaled_balances()?;
    let amounts = snapshot.bpt_index().remove(amounts);

    let mut bpt = Bfp::zero();
    for (i, (token, amount)) in snapshot.math_tokens().iter().zip(amounts).enumerate() {
        if amount.is_zero() {
            continue;
        }
        let price = invariant.bpt_per_token(&balances, i, snapshot.total_supply())?;
        bpt = bpt.add(token.upscale(amount)?.mul_down(price)?)?;
    }
    Ok(bpt)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            math::fixed_point::bfp,
            pool::tests::{DAI, WETH, e18, weighted_state},
        },
    };

    #[test]
    fn sign_convention() {
        let better = PriceImpact::join(bfp!("1.01"), bfp!("1")).unwrap();
        assert!(!better.is_negative());
        assert_eq!(better.to_string(), "0.010000000000000000");

        let worse = PriceImpact::join(bfp!("0.99"), bfp!("1")).unwrap();
        assert!(worse.is_negative());
        assert_eq!(worse.to_string(), "-0.010000000000000000");

        let worse = PriceImpact::exit(bfp!("1.25"), bfp!("1")).unwrap();
        assert_eq!(worse.to_string(), "-0.200000000000000000");

        assert_eq!(
            PriceImpact::join(bfp!("1"), Bfp::zero()),
            Err(Error::DivisionByZero)
        );
    }

    #[test]
    fn weighted_zero_price_impact() {
        let snapshot = PoolSnapshot::new(weighted_state()).unwrap();
        // 200 BPT for 5000 DAI and 2.5 WETH at 50/50 weights.
        let (dai, weth) = (snapshot.index_of(DAI).unwrap(), snapshot.index_of(WETH).unwrap());
        let mut amounts = vec![U256::ZERO; 2];
        amounts[dai] = e18(50);
        assert_eq!(bpt_zero_price_impact(&snapshot, &amounts).unwrap(), bfp!("1"));

        amounts[weth] = U256::from(25_000_000_000_000_000_u64);
        assert_eq!(bpt_zero_price_impact(&snapshot, &amounts).unwrap(), bfp!("2"));
    }

    #[test]
    fn zero_price_impact_checks_lengths() {
        let snapshot = PoolSnapshot::new(weighted_state()).unwrap();
        assert_eq!(
            bpt_zero_price_impact(&snapshot, &[U256::ZERO]),
            Err(Error::InputLengthMismatch {
                expected: 2,
                actual: 1
            })
        );
    }
}
