//! Weighted pool join and exit math, mirroring `WeightedMath.sol`:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/master/pkg/pool-weighted/contracts/WeightedMath.sol

use {
    super::{error::Error, fixed_point::Bfp},
    alloy::primitives::U256,
    itertools::izip,
};

// Invariant shrink limit for single token exits, 0.7
const MIN_INVARIANT_RATIO: Bfp =
    Bfp::from_wei(U256::from_limbs([700_000_000_000_000_000, 0, 0, 0]));

/// Computes `∏ balance_i ^ weight_i`, rounded down.
pub fn calculate_invariant(normalized_weights: &[Bfp], balances: &[Bfp]) -> Result<Bfp, Error> {
    let mut invariant = Bfp::one();
    for (weight, balance) in normalized_weights.iter().zip(balances) {
        invariant = invariant.mul_down(balance.pow_down(*weight)?)?;
    }
    if invariant.is_zero() {
        return Err(Error::ZeroInvariant);
    }
    Ok(invariant)
}

pub fn calc_bpt_out_given_exact_tokens_in(
    balances: &[Bfp],
    normalized_weights: &[Bfp],
    amounts_in: &[Bfp],
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let mut balance_ratios_with_fee = Vec::with_capacity(amounts_in.len());
    let mut invariant_ratio_with_fees = Bfp::zero();
    for (balance, weight, amount_in) in izip!(balances, normalized_weights, amounts_in) {
        let ratio = balance.add(*amount_in)?.div_down(*balance)?;
        invariant_ratio_with_fees = invariant_ratio_with_fees.add(ratio.mul_down(*weight)?)?;
        balance_ratios_with_fee.push(ratio);
    }

    let mut invariant_ratio = Bfp::one();
    for (balance, weight, amount_in, ratio_with_fee) in izip!(
        balances,
        normalized_weights,
        amounts_in,
        &balance_ratios_with_fee
    ) {
        // Only the part of the amount above a proportional join is charged
        // the swap fee.
        let amount_in_without_fee = if *ratio_with_fee > invariant_ratio_with_fees {
            let non_taxable_amount = if invariant_ratio_with_fees > Bfp::one() {
                balance.mul_down(invariant_ratio_with_fees.sub(Bfp::one())?)?
            } else {
                Bfp::zero()
            };
            let swap_fee = amount_in
                .sub(non_taxable_amount)?
                .mul_up(swap_fee_percentage)?;
            amount_in.sub(swap_fee)?
        } else {
            // A zero amount leaves the balance ratio at exactly one.
            if amount_in.is_zero() {
                continue;
            }
            *amount_in
        };

        let balance_ratio = balance.add(amount_in_without_fee)?.div_down(*balance)?;
        invariant_ratio = invariant_ratio.mul_down(balance_ratio.pow_down(*weight)?)?;
    }

    if invariant_ratio > Bfp::one() {
        bpt_total_supply.mul_down(invariant_ratio.sub(Bfp::one())?)
    } else {
        Ok(Bfp::zero())
    }
}

pub fn calc_bpt_in_given_exact_tokens_out(
    balances: &[Bfp],
    normalized_weights: &[Bfp],
    amounts_out: &[Bfp],
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let mut balance_ratios_without_fee = Vec::with_capacity(amounts_out.len());
    let mut invariant_ratio_without_fees = Bfp::zero();
    for (balance, weight, amount_out) in izip!(balances, normalized_weights, amounts_out) {
        let ratio = balance.sub(*amount_out)?.div_up(*balance)?;
        invariant_ratio_without_fees =
            invariant_ratio_without_fees.add(ratio.mul_up(*weight)?)?;
        balance_ratios_without_fee.push(ratio);
    }

    let mut invariant_ratio = Bfp::one();
    for (balance, weight, amount_out, ratio_without_fee) in izip!(
        balances,
        normalized_weights,
        amounts_out,
        &balance_ratios_without_fee
    ) {
        let amount_out_with_fee = if invariant_ratio_without_fees > *ratio_without_fee {
            let non_taxable_amount = balance.mul_down(invariant_ratio_without_fees.complement())?;
            let taxable_amount = amount_out.sub(non_taxable_amount)?;
            let taxable_amount_plus_fees =
                taxable_amount.div_up(swap_fee_percentage.complement())?;
            non_taxable_amount.add(taxable_amount_plus_fees)?
        } else {
            if amount_out.is_zero() {
                continue;
            }
            *amount_out
        };

        let balance_ratio = balance.sub(amount_out_with_fee)?.div_down(*balance)?;
        invariant_ratio = invariant_ratio.mul_down(balance_ratio.pow_down(*weight)?)?;
    }

    bpt_total_supply.mul_up(invariant_ratio.complement())
}

pub fn calc_token_out_given_exact_bpt_in(
    balance: Bfp,
    normalized_weight: Bfp,
    bpt_amount_in: Bfp,
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let invariant_ratio = bpt_total_supply
        .sub(bpt_amount_in)?
        .div_up(bpt_total_supply)?;
    if invariant_ratio < MIN_INVARIANT_RATIO {
        return Err(Error::MinBptInForTokenOut);
    }

    let balance_ratio = invariant_ratio.pow_up(Bfp::one().div_down(normalized_weight)?)?;
    let amount_out_without_fee = balance.mul_down(balance_ratio.complement())?;

    // The proportional share of the amount is not charged any fee.
    let taxable_amount = amount_out_without_fee.mul_up(normalized_weight.complement())?;
    let non_taxable_amount = amount_out_without_fee.sub(taxable_amount)?;
    let taxable_amount_minus_fees = taxable_amount.mul_up(swap_fee_percentage.complement())?;

    non_taxable_amount.add(taxable_amount_minus_fees)
}

/// Marginal amount of BPT minted per unit of token, `supply * weight /
/// balance`.
pub fn calc_bpt_per_token(
    balance: Bfp,
    normalized_weight: Bfp,
    bpt_total_supply: Bfp,
) -> Result<Bfp, Error> {
    bpt_total_supply
        .mul_down(normalized_weight)?
        .div_down(balance)
}
