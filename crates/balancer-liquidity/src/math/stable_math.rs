//! StableSwap join and exit math, mirroring `StableMath.sol`:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/master/pkg/pool-stable/contracts/StableMath.sol
//!
//! Amplification parameters are expected to already be multiplied by
//! [`AMP_PRECISION`].

use {
    super::{error::Error, fixed_point::Bfp, u256_ext::BalU256},
    alloy::primitives::U256,
    itertools::izip,
};

pub const AMP_PRECISION: U256 = U256::from_limbs([1_000, 0, 0, 0]);

const MAX_ITERATIONS: usize = 255;

/// Computes the StableSwap invariant `D` with Newton's method. Rounds down.
pub fn calculate_invariant(amplification_parameter: U256, balances: &[Bfp]) -> Result<Bfp, Error> {
    Ok(Bfp::from_wei(
        invariant_with_product(amplification_parameter, balances)?.0,
    ))
}

/// Returns the invariant together with `D_P = D^(n+1) / (n^n * ∏ x_i)` from
/// the last Newton step.
fn invariant_with_product(
    amplification_parameter: U256,
    balances: &[Bfp],
) -> Result<(U256, U256), Error> {
    let mut sum = U256::ZERO;
    for balance in balances {
        sum = sum.badd(balance.as_uint256())?;
    }
    if sum.is_zero() {
        return Ok((U256::ZERO, U256::ZERO));
    }

    let num_tokens = U256::from(balances.len());
    let amp_times_total = amplification_parameter.bmul(num_tokens)?;
    let mut invariant = sum;

    for iteration in 0..MAX_ITERATIONS {
        let mut d_p = invariant;
        for balance in balances {
            d_p = d_p
                .bmul(invariant)?
                .bdiv_down(balance.as_uint256().bmul(num_tokens)?)?;
        }

        let prev_invariant = invariant;
        let numerator = amp_times_total
            .bmul(sum)?
            .bdiv_down(AMP_PRECISION)?
            .badd(d_p.bmul(num_tokens)?)?
            .bmul(invariant)?;
        let denominator = amp_times_total
            .bsub(AMP_PRECISION)?
            .bmul(invariant)?
            .bdiv_down(AMP_PRECISION)?
            .badd(num_tokens.badd(U256::ONE)?.bmul(d_p)?)?;
        invariant = numerator.bdiv_down(denominator)?;

        if invariant.abs_diff(prev_invariant) <= U256::ONE {
            tracing::trace!(iteration, "stable invariant converged");
            return Ok((invariant, d_p));
        }
    }

    Err(Error::StableInvariantDidntConverge)
}

fn sum_balances(balances: &[Bfp]) -> Result<Bfp, Error> {
    balances
        .iter()
        .try_fold(Bfp::zero(), |sum, balance| sum.add(*balance))
}

pub fn calc_bpt_out_given_exact_tokens_in(
    amplification_parameter: U256,
    balances: &[Bfp],
    amounts_in: &[Bfp],
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let current_invariant = calculate_invariant(amplification_parameter, balances)?;
    let sum_balances = sum_balances(balances)?;

    let mut balance_ratios_with_fee = Vec::with_capacity(amounts_in.len());
    let mut invariant_ratio_with_fees = Bfp::zero();
    for (balance, amount_in) in balances.iter().zip(amounts_in) {
        let current_weight = balance.div_down(sum_balances)?;
        let ratio = balance.add(*amount_in)?.div_down(*balance)?;
        invariant_ratio_with_fees = invariant_ratio_with_fees.add(ratio.mul_down(current_weight)?)?;
        balance_ratios_with_fee.push(ratio);
    }

    let mut new_balances = Vec::with_capacity(balances.len());
    for (balance, amount_in, ratio_with_fee) in
        izip!(balances, amounts_in, &balance_ratios_with_fee)
    {
        let amount_in_without_fee = if *ratio_with_fee > invariant_ratio_with_fees {
            let non_taxable_amount = balance.mul_down(invariant_ratio_with_fees.sub(Bfp::one())?)?;
            let taxable_amount = amount_in.sub(non_taxable_amount)?;
            non_taxable_amount.add(taxable_amount.mul_down(swap_fee_percentage.complement())?)?
        } else {
            *amount_in
        };
        new_balances.push(balance.add(amount_in_without_fee)?);
    }

    let new_invariant = calculate_invariant(amplification_parameter, &new_balances)?;
    let invariant_ratio = new_invariant.div_down(current_invariant)?;
    if invariant_ratio > Bfp::one() {
        bpt_total_supply.mul_down(invariant_ratio.sub(Bfp::one())?)
    } else {
        Ok(Bfp::zero())
    }
}

pub fn calc_bpt_in_given_exact_tokens_out(
    amplification_parameter: U256,
    balances: &[Bfp],
    amounts_out: &[Bfp],
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let current_invariant = calculate_invariant(amplification_parameter, balances)?;
    let sum_balances = sum_balances(balances)?;

    let mut balance_ratios_without_fee = Vec::with_capacity(amounts_out.len());
    let mut invariant_ratio_without_fees = Bfp::zero();
    for (balance, amount_out) in balances.iter().zip(amounts_out) {
        let current_weight = balance.div_up(sum_balances)?;
        let ratio = balance.sub(*amount_out)?.div_up(*balance)?;
        invariant_ratio_without_fees =
            invariant_ratio_without_fees.add(ratio.mul_up(current_weight)?)?;
        balance_ratios_without_fee.push(ratio);
    }

    let mut new_balances = Vec::with_capacity(balances.len());
    for (balance, amount_out, ratio_without_fee) in
        izip!(balances, amounts_out, &balance_ratios_without_fee)
    {
        let amount_out_with_fee = if invariant_ratio_without_fees > *ratio_without_fee {
            let non_taxable_amount = balance.mul_down(invariant_ratio_without_fees.complement())?;
            let taxable_amount = amount_out.sub(non_taxable_amount)?;
            non_taxable_amount.add(taxable_amount.div_up(swap_fee_percentage.complement())?)?
        } else {
            *amount_out
        };
        new_balances.push(balance.sub(amount_out_with_fee)?);
    }

    let new_invariant = calculate_invariant(amplification_parameter, &new_balances)?;
    let invariant_ratio = new_invariant.div_down(current_invariant)?;
    bpt_total_supply.mul_up(invariant_ratio.complement())
}

pub fn calc_token_out_given_exact_bpt_in(
    amplification_parameter: U256,
    balances: &[Bfp],
    token_index: usize,
    bpt_amount_in: Bfp,
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let current_invariant = calculate_invariant(amplification_parameter, balances)?;
    let new_invariant = bpt_total_supply
        .sub(bpt_amount_in)?
        .div_up(bpt_total_supply)?
        .mul_up(current_invariant)?;

    let new_balance = get_token_balance_given_invariant_and_all_other_balances(
        amplification_parameter,
        balances,
        new_invariant,
        token_index,
    )?;
    let amount_out_without_fee = balances[token_index].sub(new_balance)?;

    // Only the part exceeding the token's share of the pool pays the fee.
    let current_weight = balances[token_index].div_down(sum_balances(balances)?)?;
    let taxable_amount = amount_out_without_fee.mul_up(current_weight.complement())?;
    let non_taxable_amount = amount_out_without_fee.sub(taxable_amount)?;

    non_taxable_amount.add(taxable_amount.mul_down(swap_fee_percentage.complement())?)
}

/// Solves the invariant for the balance at `token_index`, keeping the others
/// fixed. Rounds up.
fn get_token_balance_given_invariant_and_all_other_balances(
    amplification_parameter: U256,
    balances: &[Bfp],
    invariant: Bfp,
    token_index: usize,
) -> Result<Bfp, Error> {
    let num_tokens = U256::from(balances.len());
    let amp_times_total = amplification_parameter.bmul(num_tokens)?;
    let invariant = invariant.as_uint256();
    let balances = balances.iter().map(|b| b.as_uint256()).collect::<Vec<_>>();

    let mut sum = balances[0];
    let mut p_d = balances[0].bmul(num_tokens)?;
    for balance in &balances[1..] {
        p_d = p_d
            .bmul(*balance)?
            .bmul(num_tokens)?
            .bdiv_down(invariant)?;
        sum = sum.badd(*balance)?;
    }
    let sum = sum.bsub(balances[token_index])?;

    let inv2 = invariant.bmul(invariant)?;
    let c = inv2
        .bdiv_up(amp_times_total.bmul(p_d)?)?
        .bmul(AMP_PRECISION)?
        .bmul(balances[token_index])?;
    let b = sum.badd(invariant.bdiv_down(amp_times_total)?.bmul(AMP_PRECISION)?)?;

    let mut token_balance = inv2.badd(c)?.bdiv_up(invariant.badd(b)?)?;
    for _ in 0..MAX_ITERATIONS {
        let prev_token_balance = token_balance;
        token_balance = token_balance
            .bmul(token_balance)?
            .badd(c)?
            .bdiv_up(
                token_balance
                    .bmul(U256::from(2))?
                    .badd(b)?
                    .bsub(invariant)?,
            )?;

        if token_balance.abs_diff(prev_token_balance) <= U256::ONE {
            return Ok(Bfp::from_wei(token_balance));
        }
    }

    Err(Error::StableGetBalanceDidntConverge)
}

/// Marginal amount of BPT minted per unit of the token at `token_index`,
/// i.e. `supply / D * ∂D/∂x_i`. With `a = A * n` and `D_P = D^(n+1) / (n^n *
/// ∏ x)` the derivative is:
///
/// ```text
/// ∂D/∂x_i = D * (a * x_i + P * D_P) / (x_i * ((a - P) * D + P * (n + 1) * D_P))
/// ```
///
/// where `P` is the amplification precision.
pub fn calc_bpt_per_token(
    amplification_parameter: U256,
    balances: &[Bfp],
    token_index: usize,
    bpt_total_supply: Bfp,
) -> Result<Bfp, Error> {
    let (invariant, d_p) = invariant_with_product(amplification_parameter, balances)?;
    let num_tokens = U256::from(balances.len());
    let amp_times_total = amplification_parameter.bmul(num_tokens)?;
    let balance = balances[token_index];

    let numerator = amp_times_total
        .bmul(balance.as_uint256())?
        .badd(AMP_PRECISION.bmul(d_p)?)?;
    let denominator = amp_times_total
        .bsub(AMP_PRECISION)?
        .bmul(invariant)?
        .badd(AMP_PRECISION.bmul(num_tokens.badd(U256::ONE)?)?.bmul(d_p)?)?;

    let share = Bfp::from_wei(numerator).div_down(Bfp::from_wei(denominator))?;
    bpt_total_supply.mul_down(share)?.div_down(balance)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::math::{calc_tokens_out_given_exact_bpt_in, fixed_point::bfp},
    };

    fn wei(value: u128) -> Bfp {
        Bfp::from_wei(U256::from(value))
    }

    fn amp(value: u64) -> U256 {
        U256::from(value) * AMP_PRECISION
    }

    #[test]
    fn invariant_of_balanced_pool_is_sum() {
        let balances = [bfp!("1000000"), bfp!("1000000")];
        assert_eq!(
            calculate_invariant(amp(100), &balances).unwrap(),
            bfp!("2000000")
        );
        assert_eq!(
            calculate_invariant(amp(100), &[Bfp::zero(), Bfp::zero()]).unwrap(),
            Bfp::zero()
        );
    }

    #[test]
    fn invariant_of_imbalanced_pool() {
        assert_eq!(
            calculate_invariant(amp(200), &[bfp!("1000"), bfp!("3000"), bfp!("500")]).unwrap(),
            wei(4_490_747_933_469_747_676_901)
        );
    }

    #[test]
    fn invariant_with_empty_balance_fails() {
        assert_eq!(
            calculate_invariant(amp(100), &[bfp!("1"), Bfp::zero()]),
            Err(Error::ZeroDivision)
        );
    }

    #[test]
    fn invariant_converges_over_parameter_space() {
        let scales = [
            U256::ONE,
            U256::from(1_000_000),
            U256::from(10).pow(U256::from(18)),
            U256::from(10).pow(U256::from(24)),
            U256::from(10).pow(U256::from(30)),
        ];
        for amplification in [1, 10, 100, 1_000, 5_000] {
            for num_tokens in 2..=5_u64 {
                for scale in scales {
                    let balances = (1..=num_tokens)
                        .map(|i| Bfp::from_wei(scale * U256::from(i)))
                        .collect::<Vec<_>>();
                    let invariant = calculate_invariant(amp(amplification), &balances);
                    assert!(
                        invariant.is_ok(),
                        "amp {amplification} tokens {num_tokens} scale {scale}: {invariant:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn bpt_out_given_exact_tokens_in_single_sided() {
        let bpt_out = calc_bpt_out_given_exact_tokens_in(
            amp(100),
            &[bfp!("1000000"), bfp!("1000000")],
            &[bfp!("1000"), Bfp::zero()],
            bfp!("2000000"),
            Bfp::zero(),
        )
        .unwrap();
        assert!(bpt_out < bfp!("1000") && bpt_out > bfp!("999"), "{bpt_out}");
        assert_eq!(bpt_out, wei(999_997_525_988_870_000_000));
    }

    #[test]
    fn bpt_out_given_exact_tokens_in_with_fee() {
        let bpt_out = calc_bpt_out_given_exact_tokens_in(
            amp(100),
            &[bfp!("1000000"), bfp!("1000000")],
            &[bfp!("1000"), Bfp::zero()],
            bfp!("2000000"),
            bfp!("0.01"),
        )
        .unwrap();
        assert_eq!(bpt_out, wei(994_997_550_661_018_000_000));
    }

    #[test]
    fn bpt_in_given_exact_tokens_out() {
        let bpt_in = calc_bpt_in_given_exact_tokens_out(
            amp(100),
            &[bfp!("1000000"), bfp!("1000000")],
            &[bfp!("1000"), Bfp::zero()],
            bfp!("2000000"),
            bfp!("0.01"),
        )
        .unwrap();
        assert_eq!(bpt_in, wei(1_005_053_006_621_394_000_000));
    }

    #[test]
    fn token_out_given_exact_bpt_in() {
        let amount_out = calc_token_out_given_exact_bpt_in(
            amp(100),
            &[bfp!("1000000"), bfp!("1000000")],
            0,
            bfp!("1000"),
            bfp!("2000000"),
            bfp!("0.01"),
        )
        .unwrap();
        assert_eq!(amount_out, wei(994_997_535_908_261_290_951));
    }

    #[test]
    fn full_proportional_exit_returns_balances() {
        let balances = [bfp!("1000000"), bfp!("250000.5"), wei(17)];
        let supply = bfp!("1250000");
        assert_eq!(
            calc_tokens_out_given_exact_bpt_in(&balances, supply, supply).unwrap(),
            balances.to_vec()
        );
    }

    #[test]
    fn bpt_per_token_of_balanced_pool() {
        // In a balanced pool every token is worth `supply / D` BPT, here 0.9.
        let balances = [bfp!("1000000"), bfp!("1000000"), bfp!("1000000")];
        let spot = calc_bpt_per_token(amp(50), &balances, 1, bfp!("2700000")).unwrap();
        assert_eq!(spot, wei(899_999_999_999_999_999));
    }

    #[test]
    fn bpt_per_token_favours_scarce_token() {
        let balances = [bfp!("500000"), bfp!("1500000")];
        let scarce = calc_bpt_per_token(amp(100), &balances, 0, bfp!("2000000")).unwrap();
        let abundant = calc_bpt_per_token(amp(100), &balances, 1, bfp!("2000000")).unwrap();
        assert!(scarce > abundant);
        assert_eq!(scarce, wei(1_013_094_029_159_050_972));
        assert_eq!(abundant, wei(995_635_323_613_649_674));
    }
}
