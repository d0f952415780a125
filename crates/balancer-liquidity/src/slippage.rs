//! Slippage tolerance in basis points.

use {
    crate::{
        error::{Error, OutOfBounds},
        math,
    },
    alloy::primitives::U256,
};

const MAX_BPS: u32 = 10_000;

/// A validated slippage tolerance between 0 and 10000 basis points.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Slippage(u32);

impl Slippage {
    pub const ZERO: Self = Self(0);

    pub fn from_bps(bps: u32) -> Result<Self, Error> {
        if bps > MAX_BPS {
            return Err(Error::AmountOutOfBounds(OutOfBounds::Slippage(bps)));
        }
        Ok(Self(bps))
    }

    pub fn bps(self) -> u32 {
        self.0
    }

    /// Minimum amount to accept for an expected output, rounded down.
    pub fn sub_slippage(self, amount: U256) -> Result<U256, Error> {
        let factor = U256::from(MAX_BPS - self.0);
        let product = amount
            .checked_mul(factor)
            .ok_or(math::error::Error::MulOverflow)?;
        Ok(product / U256::from(MAX_BPS))
    }

    /// Maximum amount to pay for an expected input, rounded up.
    pub fn add_slippage(self, amount: U256) -> Result<U256, Error> {
        let factor = U256::from(MAX_BPS + self.0);
        let product = amount
            .checked_mul(factor)
            .ok_or(math::error::Error::MulOverflow)?;
        let (quotient, remainder) = product.div_rem(U256::from(MAX_BPS));
        Ok(if remainder.is_zero() {
            quotient
        } else {
            quotient + U256::ONE
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_more_than_everything() {
        assert!(Slippage::from_bps(10_000).is_ok());
        assert_eq!(
            Slippage::from_bps(10_001),
            Err(Error::AmountOutOfBounds(OutOfBounds::Slippage(10_001)))
        );
    }

    #[test]
    fn rounds_against_the_caller() {
        let slippage = Slippage::from_bps(50).unwrap();
        assert_eq!(slippage.sub_slippage(U256::from(999)).unwrap(), U256::from(994));
        assert_eq!(slippage.add_slippage(U256::from(999)).unwrap(), U256::from(1004));
        assert_eq!(slippage.add_slippage(U256::from(1000)).unwrap(), U256::from(1005));
        assert_eq!(slippage.add_slippage(U256::ZERO).unwrap(), U256::ZERO);

        assert_eq!(
            Slippage::ZERO.sub_slippage(U256::from(7)).unwrap(),
            U256::from(7)
        );
        assert_eq!(
            Slippage::from_bps(10_000)
                .unwrap()
                .sub_slippage(U256::from(7))
                .unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn monotonic_in_bps() {
        let amount = U256::from(123_456_789_u64);
        let mut last_min = amount;
        let mut last_max = amount;
        for bps in (0..=10_000).step_by(37) {
            let slippage = Slippage::from_bps(bps).unwrap();
            let min = slippage.sub_slippage(amount).unwrap();
            let max = slippage.add_slippage(amount).unwrap();
            assert!(min <= last_min && min <= amount);
            assert!(max >= last_max && max >= amount);
            last_min = min;
            last_max = max;
        }
    }

    #[test]
    fn overflow() {
        assert!(matches!(
            Slippage::from_bps(1).unwrap().add_slippage(U256::MAX),
            Err(Error::ArithmeticOverflow(_))
        ));
    }
}
