//! Off-chain replica of the Balancer V2 pool math. Everything in here works on
//! upscaled 18 decimal amounts and rounds exactly like the contracts do.

pub mod error;
pub mod fixed_point;
pub mod stable_math;
pub mod u256_ext;
pub mod weighted_math;

use self::{error::Error, fixed_point::Bfp};

/// Proportional exit shared by all pool families: every balance is reduced by
/// the share of the supply being burned, rounded down.
pub fn calc_tokens_out_given_exact_bpt_in(
    balances: &[Bfp],
    bpt_amount_in: Bfp,
    bpt_total_supply: Bfp,
) -> Result<Vec<Bfp>, Error> {
    let bpt_ratio = bpt_amount_in.div_down(bpt_total_supply)?;
    balances
        .iter()
        .map(|balance| balance.mul_down(bpt_ratio))
        .collect()
}

#[cfg(test)]
mod tests {
    use {super::*, crate::math::fixed_point::bfp, alloy::primitives::U256};

    #[test]
    fn proportional_exit_rounds_down() {
        let amounts = calc_tokens_out_given_exact_bpt_in(
            &[bfp!("10"), Bfp::from_wei(U256::from(10))],
            bfp!("1"),
            bfp!("3"),
        )
        .unwrap();
        assert_eq!(
            amounts,
            vec![bfp!("3.333333333333333330"), Bfp::from_wei(U256::from(3))]
        );
    }

    #[test]
    fn proportional_exit_with_zero_supply() {
        assert_eq!(
            calc_tokens_out_given_exact_bpt_in(&[bfp!("1")], bfp!("1"), Bfp::zero()),
            Err(Error::ZeroDivision)
        );
    }
}
