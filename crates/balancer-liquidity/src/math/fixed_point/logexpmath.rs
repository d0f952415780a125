//! Exponentiation and logarithm with 18 decimals fixed point numbers, as
//! computed by the Balancer contracts:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/6c9e24e22d0c46cca6dd15861d3d33da61a60b98/pkg/solidity-utils/contracts/math/LogExpMath.sol
//!
//! All intermediate values are signed and use truncating division, like
//! Solidity's `int256`.

use {
    super::super::error::Error,
    alloy::primitives::{I256, U256},
    std::sync::LazyLock,
};

const fn int(value: u128) -> I256 {
    I256::from_raw(U256::from_limbs([value as u64, (value >> 64) as u64, 0, 0]))
}

const ONE_18: I256 = int(1_000_000_000_000_000_000);
const ONE_20: I256 = int(100_000_000_000_000_000_000);
const ONE_36: I256 = int(1_000_000_000_000_000_000_000_000_000_000_000_000);

const MAX_NATURAL_EXPONENT: I256 = int(130_000_000_000_000_000_000);
static MIN_NATURAL_EXPONENT: LazyLock<I256> = LazyLock::new(|| -int(41_000_000_000_000_000_000));

const LN_36_LOWER_BOUND: I256 = int(900_000_000_000_000_000);
const LN_36_UPPER_BOUND: I256 = int(1_100_000_000_000_000_000);

static MILD_EXPONENT_BOUND: LazyLock<U256> =
    LazyLock::new(|| (U256::ONE << 254) / U256::from(100_000_000_000_000_000_000_u128));

// 18 decimal constants
const X0: I256 = int(128_000_000_000_000_000_000); // 2^7
static A0: LazyLock<I256> = LazyLock::new(|| {
    I256::from_dec_str("38877084059945950922200000000000000000000000000000000000")
        .expect("constant fits in 256 bits")
}); // e^(x0) (no decimals)
const X1: I256 = int(64_000_000_000_000_000_000); // 2^6
const A1: I256 = int(6_235_149_080_811_616_882_910_000_000); // e^(x1) (no decimals)

// 20 decimal constants
const X2: I256 = int(3_200_000_000_000_000_000_000); // 2^5
const A2: I256 = int(7_896_296_018_268_069_516_100_000_000_000_000); // e^(x2)
const X3: I256 = int(1_600_000_000_000_000_000_000); // 2^4
const A3: I256 = int(888_611_052_050_787_263_676_000_000); // e^(x3)
const X4: I256 = int(800_000_000_000_000_000_000); // 2^3
const A4: I256 = int(298_095_798_704_172_827_474_000); // e^(x4)
const X5: I256 = int(400_000_000_000_000_000_000); // 2^2
const A5: I256 = int(5_459_815_003_314_423_907_810); // e^(x5)
const X6: I256 = int(200_000_000_000_000_000_000); // 2^1
const A6: I256 = int(738_905_609_893_065_022_723); // e^(x6)
const X7: I256 = int(100_000_000_000_000_000_000); // 2^0
const A7: I256 = int(271_828_182_845_904_523_536); // e^(x7)
const X8: I256 = int(50_000_000_000_000_000_000); // 2^-1
const A8: I256 = int(164_872_127_070_012_814_685); // e^(x8)
const X9: I256 = int(25_000_000_000_000_000_000); // 2^-2
const A9: I256 = int(128_402_541_668_774_148_407); // e^(x9)
const X10: I256 = int(12_500_000_000_000_000_000); // 2^-3
const A10: I256 = int(113_314_845_306_682_631_683); // e^(x10)
const X11: I256 = int(6_250_000_000_000_000_000); // 2^-4
const A11: I256 = int(106_449_445_891_785_942_956); // e^(x11)

/// Computes `x^y` for 18 decimal fixed point `x` and `y`.
pub(super) fn pow(x: U256, y: U256) -> Result<U256, Error> {
    if y.is_zero() {
        return Ok(ONE_18.into_raw());
    }
    if x.is_zero() {
        return Ok(U256::ZERO);
    }

    if x.bit(255) {
        return Err(Error::XOutOfBounds);
    }
    let x = I256::from_raw(x);

    if y >= *MILD_EXPONENT_BOUND {
        return Err(Error::YOutOfBounds);
    }
    let y = I256::from_raw(y);

    let logx_times_y = if LN_36_LOWER_BOUND < x && x < LN_36_UPPER_BOUND {
        let ln_36_x = ln_36(x);
        // `ln_36_x` has 36 decimals, split it to keep the product in range
        (ln_36_x / ONE_18) * y + ((ln_36_x % ONE_18) * y) / ONE_18
    } else {
        ln(x) * y
    };
    let logx_times_y = logx_times_y / ONE_18;

    if logx_times_y < *MIN_NATURAL_EXPONENT || logx_times_y > MAX_NATURAL_EXPONENT {
        return Err(Error::ProductOutOfBounds);
    }

    Ok(exp(logx_times_y)?.into_raw())
}

fn exp(x: I256) -> Result<I256, Error> {
    if x < *MIN_NATURAL_EXPONENT || x > MAX_NATURAL_EXPONENT {
        return Err(Error::InvalidExponent);
    }

    if x.is_negative() {
        // e^(-x) = 1 / e^x
        return Ok((ONE_18 * ONE_18) / exp(-x)?);
    }

    let (mut x, first_an) = if x >= X0 {
        (x - X0, *A0)
    } else if x >= X1 {
        (x - X1, A1)
    } else {
        (x, I256::ONE)
    };

    x *= int(100);

    let mut product = ONE_20;
    for (x_n, a_n) in [
        (X2, A2),
        (X3, A3),
        (X4, A4),
        (X5, A5),
        (X6, A6),
        (X7, A7),
        (X8, A8),
        (X9, A9),
    ] {
        if x >= x_n {
            x -= x_n;
            product = (product * a_n) / ONE_20;
        }
    }

    // Taylor series for the remainder, which is now smaller than x9.
    let mut series_sum = ONE_20;
    let mut term = x;
    series_sum += term;
    for k in 2..=12_u128 {
        term = ((term * x) / ONE_20) / int(k);
        series_sum += term;
    }

    Ok((((product * series_sum) / ONE_20) * first_an) / int(100))
}

fn ln(a: I256) -> I256 {
    if a < ONE_18 {
        // ln(a) = -ln(1/a)
        return -ln((ONE_18 * ONE_18) / a);
    }

    let mut a = a;
    let mut sum = I256::ZERO;
    if a >= *A0 * ONE_18 {
        a /= *A0;
        sum += X0;
    }
    if a >= A1 * ONE_18 {
        a /= A1;
        sum += X1;
    }

    sum *= int(100);
    a *= int(100);

    for (x_n, a_n) in [
        (X2, A2),
        (X3, A3),
        (X4, A4),
        (X5, A5),
        (X6, A6),
        (X7, A7),
        (X8, A8),
        (X9, A9),
        (X10, A10),
        (X11, A11),
    ] {
        if a >= a_n {
            a = (a * ONE_20) / a_n;
            sum += x_n;
        }
    }

    // ln(a) = 2 * artanh((a - 1) / (a + 1)), expanded as an odd series.
    let z = ((a - ONE_20) * ONE_20) / (a + ONE_20);
    let z_squared = (z * z) / ONE_20;

    let mut num = z;
    let mut series_sum = num;
    for k in [3_u128, 5, 7, 9, 11] {
        num = (num * z_squared) / ONE_20;
        series_sum += num / int(k);
    }
    series_sum *= int(2);

    (sum + series_sum) / int(100)
}

/// Natural logarithm with 36 decimals of precision, only valid for `x`
/// close to one.
fn ln_36(x: I256) -> I256 {
    let x = x * ONE_18;

    let z = ((x - ONE_36) * ONE_36) / (x + ONE_36);
    let z_squared = (z * z) / ONE_36;

    let mut num = z;
    let mut series_sum = num;
    for k in [3_u128, 5, 7, 9, 11, 13, 15] {
        num = (num * z_squared) / ONE_36;
        series_sum += num / int(k);
    }

    series_sum * int(2)
}
