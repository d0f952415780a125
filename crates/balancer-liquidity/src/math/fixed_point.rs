//! Module emulating the operations on fixed points with exactly 18 decimals as
//! used in the Balancer smart contracts. The Solidity contract can be
//! found at:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/6c9e24e22d0c46cca6dd15861d3d33da61a60b98/pkg/solidity-utils/contracts/math/FixedPoint.sol

use {
    super::{error::Error, u256_ext::BalU256},
    alloy::primitives::U256,
    anyhow::{Context, ensure},
    std::{
        fmt::{self, Debug, Display, Formatter},
        str::FromStr,
    },
};

mod logexpmath;

/// Number of decimals used by every fixed point value.
pub const DECIMALS: usize = 18;

const ONE_18: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);
const TWO_18: U256 = U256::from_limbs([2_000_000_000_000_000_000, 0, 0, 0]);
const FOUR_18: U256 = U256::from_limbs([4_000_000_000_000_000_000, 0, 0, 0]);
/// Upper bound on the relative error of `LogExpMath::pow`, as a fixed point
/// (10^-14).
const MAX_POW_RELATIVE_ERROR: U256 = U256::from_limbs([10_000, 0, 0, 0]);

/// Fixed point number with 18 decimals. Every balance, weight, fee, rate and
/// invariant the pool contracts work with is represented this way.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bfp(U256);

impl Bfp {
    pub const fn zero() -> Self {
        Self(U256::ZERO)
    }

    pub const fn one() -> Self {
        Self(ONE_18)
    }

    /// Returns `10^exp` as a fixed point value.
    pub fn exp10(exp: u8) -> Self {
        Self(U256::from(10).pow(U256::from(u32::from(exp) + 18)))
    }

    /// Interprets a raw integer as a fixed point number, i.e. `1` is
    /// `0.000000000000000001`.
    pub const fn from_wei(num: U256) -> Self {
        Self(num)
    }

    pub const fn as_uint256(self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(self, other: Self) -> Result<Self, Error> {
        Ok(Self(self.0.badd(other.0)?))
    }

    pub fn sub(self, other: Self) -> Result<Self, Error> {
        Ok(Self(self.0.bsub(other.0)?))
    }

    pub fn mul_down(self, other: Self) -> Result<Self, Error> {
        Ok(Self(self.0.bmul(other.0)? / ONE_18))
    }

    pub fn mul_up(self, other: Self) -> Result<Self, Error> {
        let product = self.0.bmul(other.0)?;
        if product.is_zero() {
            return Ok(Self::zero());
        }
        Ok(Self((product - U256::ONE) / ONE_18 + U256::ONE))
    }

    pub fn div_down(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let a_inflated = self.0.checked_mul(ONE_18).ok_or(Error::DivInternal)?;
        Ok(Self(a_inflated / other.0))
    }

    pub fn div_up(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let a_inflated = self.0.checked_mul(ONE_18).ok_or(Error::DivInternal)?;
        Ok(Self((a_inflated - U256::ONE) / other.0 + U256::ONE))
    }

    /// Returns `1 - self`, saturating at zero.
    pub fn complement(self) -> Self {
        if self.0 < ONE_18 {
            Self(ONE_18 - self.0)
        } else {
            Self::zero()
        }
    }

    /// Power rounded up, guaranteed to be at least the exact result.
    pub fn pow_up(self, exp: Self) -> Result<Self, Error> {
        match exp.0 {
            e if e == ONE_18 => Ok(self),
            e if e == TWO_18 => self.mul_up(self),
            e if e == FOUR_18 => {
                let square = self.mul_up(self)?;
                square.mul_up(square)
            }
            _ => {
                let raw = Self(logexpmath::pow(self.0, exp.0)?);
                let max_error = raw
                    .mul_up(Self(MAX_POW_RELATIVE_ERROR))?
                    .add(Self(U256::ONE))?;
                raw.add(max_error)
            }
        }
    }

    /// Power rounded down, guaranteed to be at most the exact result.
    pub fn pow_down(self, exp: Self) -> Result<Self, Error> {
        match exp.0 {
            e if e == ONE_18 => Ok(self),
            e if e == TWO_18 => self.mul_down(self),
            e if e == FOUR_18 => {
                let square = self.mul_down(self)?;
                square.mul_down(square)
            }
            _ => {
                let raw = Self(logexpmath::pow(self.0, exp.0)?);
                let max_error = raw
                    .mul_up(Self(MAX_POW_RELATIVE_ERROR))?
                    .add(Self(U256::ONE))?;
                if raw < max_error {
                    Ok(Self::zero())
                } else {
                    raw.sub(max_error)
                }
            }
        }
    }
}

impl FromStr for Bfp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (units, decimals) = s.split_once('.').unwrap_or((s, "0"));
        ensure!(
            !units.is_empty()
                && !decimals.is_empty()
                && decimals.len() <= DECIMALS
                && units.bytes().chain(decimals.bytes()).all(|b| b.is_ascii_digit()),
            "invalid decimal representation {s:?}"
        );
        let units = U256::from_str_radix(units, 10)?;
        let decimals = U256::from_str_radix(&format!("{decimals:0<DECIMALS$}"), 10)?;
        let value = units
            .checked_mul(ONE_18)
            .and_then(|units| units.checked_add(decimals))
            .context("number too large")?;
        Ok(Self(value))
    }
}

impl Display for Bfp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let (units, decimals) = self.0.div_rem(ONE_18);
        write!(f, "{units}.{:0>DECIMALS$}", decimals.to_string())
    }
}

impl Debug for Bfp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Scaling factor that converts an amount of a token with `decimals` into an
/// 18 decimal fixed point value, adjusted by the token's price rate.
pub fn scaling_factor(decimals: u8, price_rate: Bfp) -> Result<Bfp, Error> {
    let exp = 18_u8.checked_sub(decimals).ok_or(Error::SubOverflow)?;
    Bfp::exp10(exp).mul_down(price_rate)
}

/// Scales a raw token amount to the value the pool contract does its math
/// with.
pub fn upscale(amount: U256, scaling_factor: Bfp) -> Result<Bfp, Error> {
    Bfp::from_wei(amount).mul_down(scaling_factor)
}

/// Inverse of [`upscale`], rounding down. Used for amounts paid out by the
/// pool.
pub fn downscale_down(amount: Bfp, scaling_factor: Bfp) -> Result<U256, Error> {
    Ok(amount.div_down(scaling_factor)?.as_uint256())
}

/// Inverse of [`upscale`], rounding up. Used for amounts paid into the pool.
pub fn downscale_up(amount: Bfp, scaling_factor: Bfp) -> Result<U256, Error> {
    Ok(amount.div_up(scaling_factor)?.as_uint256())
}

#[cfg(test)]
macro_rules! bfp {
    ($value:literal) => {
        $value
            .parse::<$crate::math::fixed_point::Bfp>()
            .unwrap()
    };
}
#[cfg(test)]
pub(crate) use bfp;
