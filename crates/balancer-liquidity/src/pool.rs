//! Pool state as supplied by a pool-state provider and the validated,
//! canonically ordered snapshot the calculator works on.

use {
    crate::{
        error::{Error, PoolField},
        math::{
            self,
            fixed_point::{self, Bfp},
            stable_math::AMP_PRECISION,
        },
    },
    alloy::primitives::{Address, B256, U256},
    anyhow::ensure,
    itertools::Itertools,
};

/// Tolerance on the sum of the normalized weights of a weighted pool.
const WEIGHT_SUM_TOLERANCE: U256 = U256::from_limbs([1_000_000_000, 0, 0, 0]);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, strum::Display, strum::EnumString)]
pub enum PoolKind {
    Weighted,
    Stable,
    ComposableStable,
    MetaStable,
}

impl PoolKind {
    pub fn is_stable(self) -> bool {
        !matches!(self, Self::Weighted)
    }

    /// Whether tokens of this family may carry a price rate that is required
    /// to be present.
    fn requires_price_rates(self) -> bool {
        matches!(self, Self::ComposableStable | Self::MetaStable)
    }

    /// Whether the pool may hold its own BPT within its token list.
    fn may_hold_bpt(self) -> bool {
        matches!(self, Self::ComposableStable | Self::MetaStable)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AmplificationParameter {
    factor: U256,
    precision: U256,
}

impl AmplificationParameter {
    pub fn try_new(factor: U256, precision: U256) -> anyhow::Result<Self> {
        ensure!(!precision.is_zero(), "Zero precision not allowed");
        Ok(Self { factor, precision })
    }

    /// Amplification parameter expressed with a precision of `base`.
    pub fn with_base(&self, base: U256) -> Result<U256, math::error::Error> {
        Ok(self
            .factor
            .checked_mul(base)
            .ok_or(math::error::Error::MulOverflow)?
            / self.precision)
    }
}

/// A token of a pool as reported by a pool-state provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolToken {
    pub address: Address,
    pub decimals: Option<u8>,
    /// Raw balance in the token's native decimals.
    pub balance: U256,
    pub weight: Option<Bfp>,
    pub price_rate: Option<Bfp>,
}

/// Unvalidated pool state. Tokens may be in any order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolState {
    pub id: B256,
    pub kind: PoolKind,
    pub version: u32,
    pub tokens: Vec<PoolToken>,
    pub amplification: Option<AmplificationParameter>,
    pub swap_fee: Bfp,
    /// Circulating supply of the pool's BPT, with 18 decimals.
    pub total_supply: U256,
}

/// Validated token of a snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TokenState {
    pub address: Address,
    pub balance: U256,
    pub scaling_factor: Bfp,
    pub weight: Option<Bfp>,
}

impl TokenState {
    /// Converts the stored balance into its internal representation as a
    /// Balancer fixed point number.
    pub fn upscaled_balance(&self) -> Result<Bfp, math::error::Error> {
        self.upscale(self.balance)
    }

    /// Scales the input token amount to the value that is used by the Balancer
    /// contract to execute math operations.
    pub fn upscale(&self, amount: U256) -> Result<Bfp, math::error::Error> {
        fixed_point::upscale(amount, self.scaling_factor)
    }

    /// Returns the token amount corresponding to the internal Balancer
    /// representation for the same amount, rounded up.
    pub fn downscale_up(&self, amount: Bfp) -> Result<U256, math::error::Error> {
        fixed_point::downscale_up(amount, self.scaling_factor)
    }

    /// Similar to downscale up above, but rounded down.
    pub fn downscale_down(&self, amount: Bfp) -> Result<U256, math::error::Error> {
        fixed_point::downscale_down(amount, self.scaling_factor)
    }
}

/// Position of the pool's own BPT within its sorted token list, if the pool
/// holds it. Converts between snapshot arrays, which include the BPT, and
/// the arrays the invariant math works with, which never do.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BptIndex(Option<usize>);

impl BptIndex {
    pub const NONE: Self = Self(None);

    pub fn new(index: Option<usize>) -> Self {
        Self(index)
    }

    pub fn is_bpt(self, index: usize) -> bool {
        self.0 == Some(index)
    }

    /// Builds a new array without the BPT entry.
    pub fn remove<T: Clone>(self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_bpt(*i))
            .map(|(_, item)| item.clone())
            .collect()
    }

    /// Builds a new array with `filler` placed at the BPT position.
    pub fn insert<T>(self, items: Vec<T>, filler: T) -> Vec<T> {
        let mut items = items;
        if let Some(index) = self.0 {
            items.insert(index.min(items.len()), filler);
        }
        items
    }

    /// Maps an index into the snapshot token list to an index into the
    /// BPT-less math arrays. Returns `None` for the BPT itself.
    pub fn math_index(self, index: usize) -> Option<usize> {
        match self.0 {
            Some(bpt) if bpt == index => None,
            Some(bpt) if bpt < index => Some(index - 1),
            _ => Some(index),
        }
    }
}

/// Immutable, validated view of a pool. Tokens are sorted ascending by
/// address, which is the order the Vault expects them in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolSnapshot {
    id: B256,
    kind: PoolKind,
    version: u32,
    tokens: Vec<TokenState>,
    bpt_index: BptIndex,
    amplification: Option<AmplificationParameter>,
    swap_fee: Bfp,
    total_supply: Bfp,
}

impl PoolSnapshot {
    pub fn new(state: PoolState) -> Result<Self, Error> {
        let pool = state.id;
        let address = pool_address(pool);

        let mut tokens = state.tokens;
        tokens.sort_by_key(|token| token.address);
        if let Some(token) = tokens.iter().map(|token| token.address).duplicates().next() {
            return Err(Error::DuplicateToken(token));
        }

        let bpt_index = BptIndex::new(if state.kind.may_hold_bpt() {
            tokens.iter().position(|token| token.address == address)
        } else {
            None
        });

        if state.kind.is_stable() && state.amplification.is_none() {
            return Err(Error::MissingPoolField {
                pool,
                field: PoolField::Amplification,
                token: None,
            });
        }
        if state.swap_fee >= Bfp::one() {
            return Err(Error::InvalidPoolField {
                pool,
                field: PoolField::SwapFee,
                reason: format!("{} is not below 1", state.swap_fee),
            });
        }
        if state.total_supply.is_zero() {
            return Err(Error::InvalidPoolField {
                pool,
                field: PoolField::TotalSupply,
                reason: "supply is zero".to_string(),
            });
        }

        let tokens = tokens
            .into_iter()
            .enumerate()
            .map(|(i, token)| validate_token(pool, state.kind, bpt_index.is_bpt(i), token))
            .collect::<Result<Vec<_>, _>>()?;

        if state.kind == PoolKind::Weighted {
            validate_weights(pool, &tokens)?;
        }

        Ok(Self {
            id: pool,
            kind: state.kind,
            version: state.version,
            tokens,
            bpt_index,
            amplification: state.amplification,
            swap_fee: state.swap_fee,
            total_supply: Bfp::from_wei(state.total_supply),
        })
    }

    pub fn id(&self) -> B256 {
        self.id
    }

    /// Address of the pool contract, which is also its BPT.
    pub fn address(&self) -> Address {
        pool_address(self.id)
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// All tokens in canonical order, including the BPT if the pool holds it.
    pub fn tokens(&self) -> &[TokenState] {
        &self.tokens
    }

    pub fn bpt_index(&self) -> BptIndex {
        self.bpt_index
    }

    pub fn amplification(&self) -> Option<AmplificationParameter> {
        self.amplification
    }

    pub fn swap_fee(&self) -> Bfp {
        self.swap_fee
    }

    pub fn total_supply(&self) -> Bfp {
        self.total_supply
    }

    /// Tokens that take part in the invariant.
    pub fn math_tokens(&self) -> Vec<TokenState> {
        self.bpt_index.remove(&self.tokens)
    }

    /// Upscaled balances of the tokens that take part in the invariant.
    pub fn upscaled_balances(&self) -> Result<Vec<Bfp>, Error> {
        Ok(self
            .math_tokens()
            .iter()
            .map(TokenState::upscaled_balance)
            .collect::<Result<_, _>>()?)
    }

    /// Index of `token` in the canonical token list.
    pub fn index_of(&self, token: Address) -> Result<usize, Error> {
        self.tokens
            .iter()
            .position(|state| state.address == token)
            .ok_or(Error::TokenNotInPool {
                pool: self.id,
                token,
            })
    }
}

/// Balancer V2 pool ids start with the address of the pool.
fn pool_address(id: B256) -> Address {
    Address::from_slice(&id[..20])
}

fn validate_token(
    pool: B256,
    kind: PoolKind,
    is_bpt: bool,
    token: PoolToken,
) -> Result<TokenState, Error> {
    let missing = |field| Error::MissingPoolField {
        pool,
        field,
        token: Some(token.address),
    };

    let decimals = token.decimals.ok_or_else(|| missing(PoolField::Decimals))?;
    if decimals > 18 {
        return Err(Error::InvalidPoolField {
            pool,
            field: PoolField::Decimals,
            reason: format!("token {} has {decimals} decimals", token.address),
        });
    }

    let price_rate = match token.price_rate {
        Some(rate) => rate,
        None if kind.requires_price_rates() && !is_bpt => {
            return Err(missing(PoolField::PriceRate));
        }
        None => Bfp::one(),
    };

    let weight = match kind {
        PoolKind::Weighted => {
            let weight = token.weight.ok_or_else(|| missing(PoolField::Weight))?;
            if weight.is_zero() {
                return Err(Error::InvalidPoolField {
                    pool,
                    field: PoolField::Weight,
                    reason: format!("token {} has zero weight", token.address),
                });
            }
            Some(weight)
        }
        _ => None,
    };

    Ok(TokenState {
        address: token.address,
        balance: token.balance,
        scaling_factor: fixed_point::scaling_factor(decimals, price_rate)?,
        weight,
    })
}

fn validate_weights(pool: B256, tokens: &[TokenState]) -> Result<(), Error> {
    let sum = tokens
        .iter()
        .filter_map(|token| token.weight)
        .try_fold(Bfp::zero(), |sum, weight| sum.add(weight))?;
    if sum.as_uint256().abs_diff(Bfp::one().as_uint256()) > WEIGHT_SUM_TOLERANCE {
        return Err(Error::InvalidPoolField {
            pool,
            field: PoolField::Weight,
            reason: format!("weights sum up to {sum}"),
        });
    }
    Ok(())
}

/// Amplification parameter of a stable pool with the precision the math
/// expects.
pub(crate) fn amplification(snapshot: &PoolSnapshot) -> Result<U256, Error> {
    let amplification = snapshot.amplification().ok_or(Error::MissingPoolField {
        pool: snapshot.id(),
        field: PoolField::Amplification,
        token: None,
    })?;
    Ok(amplification.with_base(AMP_PRECISION)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        crate::math::fixed_point::bfp,
        alloy::primitives::{address, b256},
    };

    pub const DAI: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
    pub const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    pub const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
    /// Pool id whose address sorts between USDC and WETH.
    pub const POOL_ID: B256 =
        b256!("0xb08885e6026bab4333a80024ec25a1a3e1ff2b8a000200000000000000000445");

    pub fn token(address: Address, decimals: u8, balance: U256) -> PoolToken {
        PoolToken {
            address,
            decimals: Some(decimals),
            balance,
            weight: None,
            price_rate: None,
        }
    }

    pub fn e18(value: u64) -> U256 {
        U256::from(value) * U256::from(10).pow(U256::from(18))
    }

    pub fn stable_state(kind: PoolKind) -> PoolState {
        PoolState {
            id: POOL_ID,
            kind,
            version: 1,
            tokens: vec![
                token(USDC, 6, U256::from(1_000_000_000_000_u64)),
                token(DAI, 18, e18(1_000_000)),
            ],
            amplification: Some(
                AmplificationParameter::try_new(U256::from(100_000), U256::from(1_000)).unwrap(),
            ),
            swap_fee: bfp!("0.0004"),
            total_supply: e18(2_000_000),
        }
    }

    pub fn weighted_state() -> PoolState {
        PoolState {
            id: POOL_ID,
            kind: PoolKind::Weighted,
            version: 4,
            tokens: vec![
                PoolToken {
                    weight: Some(bfp!("0.5")),
                    ..token(WETH, 18, U256::from(2_500_000_000_000_000_000_u64))
                },
                PoolToken {
                    weight: Some(bfp!("0.5")),
                    ..token(DAI, 18, e18(5_000))
                },
            ],
            amplification: None,
            swap_fee: bfp!("0.003"),
            total_supply: e18(200),
        }
    }

    #[test]
    fn amplification_parameter() {
        let amp = AmplificationParameter::try_new(U256::from(200_000), U256::from(1_000)).unwrap();
        assert_eq!(amp.with_base(U256::from(1_000)).unwrap(), U256::from(200_000));
        assert_eq!(amp.with_base(U256::ONE).unwrap(), U256::from(200));
        assert!(AmplificationParameter::try_new(U256::ONE, U256::ZERO).is_err());
    }

    #[test]
    fn sorts_tokens_by_address() {
        let snapshot = PoolSnapshot::new(weighted_state()).unwrap();
        let addresses = snapshot
            .tokens()
            .iter()
            .map(|token| token.address)
            .collect::<Vec<_>>();
        assert_eq!(addresses, vec![DAI, WETH]);
        assert_eq!(snapshot.bpt_index(), BptIndex::NONE);
        assert_eq!(snapshot.index_of(WETH).unwrap(), 1);
        assert_eq!(
            snapshot.index_of(USDC),
            Err(Error::TokenNotInPool {
                pool: POOL_ID,
                token: USDC
            })
        );
    }

    #[test]
    fn upscales_balances() {
        let snapshot = PoolSnapshot::new(stable_state(PoolKind::Stable)).unwrap();
        assert_eq!(
            snapshot.upscaled_balances().unwrap(),
            vec![bfp!("1000000"), bfp!("1000000")]
        );
        assert_eq!(snapshot.tokens()[1].scaling_factor, Bfp::exp10(12));
    }

    #[test]
    fn finds_bpt_of_composable_pools() {
        let mut state = stable_state(PoolKind::ComposableStable);
        state.tokens.push(token(pool_address(POOL_ID), 18, e18(1_000_000_000)));
        for token in &mut state.tokens {
            token.price_rate = Some(Bfp::one());
        }
        // The BPT needs no rate.
        state.tokens[2].price_rate = None;
        let snapshot = PoolSnapshot::new(state).unwrap();

        // DAI < USDC < BPT
        assert_eq!(snapshot.bpt_index(), BptIndex::new(Some(2)));
        assert_eq!(snapshot.math_tokens().len(), 2);
        assert_eq!(snapshot.upscaled_balances().unwrap().len(), 2);
    }

    #[test]
    fn plain_stable_pools_never_exclude_tokens() {
        let mut state = stable_state(PoolKind::Stable);
        state.tokens.push(token(pool_address(POOL_ID), 18, e18(1)));
        let snapshot = PoolSnapshot::new(state).unwrap();
        assert_eq!(snapshot.bpt_index(), BptIndex::NONE);
        assert_eq!(snapshot.math_tokens().len(), 3);
    }

    #[test]
    fn rejects_missing_fields() {
        let mut state = stable_state(PoolKind::Stable);
        state.amplification = None;
        assert_eq!(
            PoolSnapshot::new(state),
            Err(Error::MissingPoolField {
                pool: POOL_ID,
                field: PoolField::Amplification,
                token: None,
            })
        );

        let mut state = stable_state(PoolKind::Stable);
        state.tokens[0].decimals = None;
        assert_eq!(
            PoolSnapshot::new(state),
            Err(Error::MissingPoolField {
                pool: POOL_ID,
                field: PoolField::Decimals,
                token: Some(USDC),
            })
        );

        let state = stable_state(PoolKind::MetaStable);
        assert_eq!(
            PoolSnapshot::new(state),
            Err(Error::MissingPoolField {
                pool: POOL_ID,
                field: PoolField::PriceRate,
                token: Some(DAI),
            })
        );

        let mut state = weighted_state();
        state.tokens[1].weight = None;
        assert_eq!(
            PoolSnapshot::new(state),
            Err(Error::MissingPoolField {
                pool: POOL_ID,
                field: PoolField::Weight,
                token: Some(DAI),
            })
        );
    }

    #[test]
    fn rejects_invalid_fields() {
        let mut state = weighted_state();
        state.tokens[0].weight = Some(bfp!("0.6"));
        assert!(matches!(
            PoolSnapshot::new(state),
            Err(Error::InvalidPoolField {
                field: PoolField::Weight,
                ..
            })
        ));

        let mut state = weighted_state();
        state.tokens[0].decimals = Some(19);
        assert!(matches!(
            PoolSnapshot::new(state),
            Err(Error::InvalidPoolField {
                field: PoolField::Decimals,
                ..
            })
        ));

        let mut state = stable_state(PoolKind::Stable);
        state.tokens[1].address = DAI;
        assert_eq!(PoolSnapshot::new(state), Err(Error::DuplicateToken(DAI)));
    }

    #[test]
    fn weights_within_tolerance_are_accepted() {
        let mut state = weighted_state();
        state.tokens[0].weight = Some(bfp!("0.333333333333333333"));
        state.tokens[1].weight = Some(bfp!("0.666666666666666666"));
        assert!(PoolSnapshot::new(state).is_ok());
    }

    #[test]
    fn bpt_index_builders() {
        let bpt = BptIndex::new(Some(1));
        assert_eq!(bpt.remove(&[10, 11, 12]), vec![10, 12]);
        assert_eq!(bpt.insert(vec![10, 12], 0), vec![10, 0, 12]);
        assert_eq!(bpt.math_index(0), Some(0));
        assert_eq!(bpt.math_index(1), None);
        assert_eq!(bpt.math_index(2), Some(1));

        assert_eq!(BptIndex::NONE.remove(&[1, 2]), vec![1, 2]);
        assert_eq!(BptIndex::NONE.insert(vec![1, 2], 0), vec![1, 2]);
        assert_eq!(BptIndex::NONE.math_index(1), Some(1));
    }
}
