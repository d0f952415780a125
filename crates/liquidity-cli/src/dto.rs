//! JSON representations of the driver's inputs and output. Numbers are
//! decimal strings so that 256-bit values survive JSON parsers.

use {
    alloy::primitives::{Address, B256, Bytes, U256},
    anyhow::Result,
    balancer_liquidity::{
        self as liquidity,
        AmplificationParameter,
        Bfp,
        OperationKind,
        PoolKind,
        PoolState,
        PoolToken,
        PriceImpact,
        Slippage,
    },
    serde::{Deserialize, Serialize},
    serde_with::{DisplayFromStr, serde_as},
};

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    #[serde_as(as = "DisplayFromStr")]
    pub id: B256,
    #[serde_as(as = "DisplayFromStr")]
    pub kind: PoolKind,
    #[serde(default = "default_version")]
    pub version: u32,
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub amplification: Option<Amplification>,
    #[serde_as(as = "DisplayFromStr")]
    pub swap_fee: Bfp,
    /// Circulating BPT supply.
    #[serde_as(as = "DisplayFromStr")]
    pub total_supply: U256,
}

fn default_version() -> u32 {
    1
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    #[serde_as(as = "DisplayFromStr")]
    pub address: Address,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde_as(as = "DisplayFromStr")]
    pub balance: U256,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub weight: Option<Bfp>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub price_rate: Option<Bfp>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct Amplification {
    #[serde_as(as = "DisplayFromStr")]
    pub factor: U256,
    #[serde_as(as = "DisplayFromStr")]
    pub precision: U256,
}

impl Pool {
    pub fn into_domain(self) -> Result<PoolState> {
        Ok(PoolState {
            id: self.id,
            kind: self.kind,
            version: self.version,
            tokens: self
                .tokens
                .into_iter()
                .map(|token| PoolToken {
                    address: token.address,
                    decimals: token.decimals,
                    balance: token.balance,
                    weight: token.weight,
                    price_rate: token.price_rate,
                })
                .collect(),
            amplification: self
                .amplification
                .map(|amp| AmplificationParameter::try_new(amp.factor, amp.precision))
                .transpose()?,
            swap_fee: self.swap_fee,
            total_supply: self.total_supply,
        })
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde_as(as = "DisplayFromStr")]
    pub sender: Address,
    #[serde_as(as = "DisplayFromStr")]
    pub recipient: Address,
    #[serde(default)]
    pub slippage_bps: u32,
    #[serde(default)]
    pub internal_balance: bool,
    #[serde(default)]
    pub price_impact: bool,
    pub operation: Operation,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Operation {
    ExactTokensIn {
        #[serde_as(as = "Vec<DisplayFromStr>")]
        tokens: Vec<Address>,
        #[serde_as(as = "Vec<DisplayFromStr>")]
        amounts: Vec<U256>,
    },
    ExactBptIn {
        #[serde_as(as = "DisplayFromStr")]
        bpt_in: U256,
        #[serde_as(as = "Option<DisplayFromStr>")]
        #[serde(default)]
        single_token_out: Option<Address>,
        #[serde(default)]
        unwrap_native: bool,
    },
    ExactTokensOut {
        #[serde_as(as = "Vec<DisplayFromStr>")]
        tokens: Vec<Address>,
        #[serde_as(as = "Vec<DisplayFromStr>")]
        amounts: Vec<U256>,
    },
}

impl Request {
    pub fn into_domain(self) -> Result<liquidity::OperationRequest> {
        let kind = match self.operation {
            Operation::ExactTokensIn { tokens, amounts } => {
                OperationKind::ExactTokensInForBptOut { tokens, amounts }
            }
            Operation::ExactBptIn {
                bpt_in,
                single_token_out,
                unwrap_native,
            } => OperationKind::exit_exact_bpt_in(bpt_in, single_token_out, unwrap_native)?,
            Operation::ExactTokensOut { tokens, amounts } => {
                OperationKind::BptInForExactTokensOut { tokens, amounts }
            }
        };
        Ok(liquidity::OperationRequest {
            sender: self.sender,
            recipient: self.recipient,
            slippage: Slippage::from_bps(self.slippage_bps)?,
            internal_balance: self.internal_balance,
            price_impact: self.price_impact,
            kind,
        })
    }
}

#[serde_as]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    #[serde_as(as = "DisplayFromStr")]
    pub target: Address,
    #[serde_as(as = "DisplayFromStr")]
    pub call_data: Bytes,
    #[serde_as(as = "DisplayFromStr")]
    pub value: U256,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub assets: Vec<Address>,
    pub expected: Amounts,
    pub limit: Amounts,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_impact: Option<PriceImpact>,
}

#[serde_as]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Amounts {
    Bpt(#[serde_as(as = "DisplayFromStr")] U256),
    Tokens(#[serde_as(as = "Vec<DisplayFromStr>")] Vec<U256>),
}

impl OperationResult {
    pub fn from_domain(result: liquidity::OperationResult) -> Self {
        Self {
            target: result.target,
            call_data: result.call_data,
            value: result.value,
            assets: result.assets,
            expected: Amounts::from_domain(result.expected),
            limit: Amounts::from_domain(result.limit),
            price_impact: result.price_impact,
        }
    }
}

impl Amounts {
    fn from_domain(amounts: liquidity::Amounts) -> Self {
        match amounts {
            liquidity::Amounts::Bpt(amount) => Self::Bpt(amount),
            liquidity::Amounts::Tokens(amounts) => Self::Tokens(amounts),
        }
    }
}
