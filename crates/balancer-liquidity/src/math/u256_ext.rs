//! Checked integer operations on raw `U256` values, reverting with the same
//! codes as the `Math` library of the Balancer contracts.

use {super::error::Error, alloy::primitives::U256};

pub trait BalU256: Sized {
    fn badd(self, other: Self) -> Result<Self, Error>;
    fn bsub(self, other: Self) -> Result<Self, Error>;
    fn bmul(self, other: Self) -> Result<Self, Error>;
    fn bdiv_down(self, other: Self) -> Result<Self, Error>;
    fn bdiv_up(self, other: Self) -> Result<Self, Error>;
}

impl BalU256 for U256 {
    fn badd(self, other: Self) -> Result<Self, Error> {
        self.checked_add(other).ok_or(Error::AddOverflow)
    }

    fn bsub(self, other: Self) -> Result<Self, Error> {
        self.checked_sub(other).ok_or(Error::SubOverflow)
    }

    fn bmul(self, other: Self) -> Result<Self, Error> {
        self.checked_mul(other).ok_or(Error::MulOverflow)
    }

    fn bdiv_down(self, other: Self) -> Result<Self, Error> {
        self.checked_div(other).ok_or(Error::ZeroDivision)
    }

    fn bdiv_up(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(U256::ZERO);
        }
        Ok(U256::ONE + (self - U256::ONE) / other)
    }
}
