//! ABI encoding of Balancer V2 vault joins and exits.

use {
    crate::pool::PoolKind,
    alloy::{
        primitives::{Address, B256, Bytes, U256},
        sol_types::{SolCall, SolValue},
    },
};

alloy::sol! {
    interface IVault {
        struct JoinPoolRequest {
            address[] assets;
            uint256[] maxAmountsIn;
            bytes userData;
            bool fromInternalBalance;
        }

        struct ExitPoolRequest {
            address[] assets;
            uint256[] minAmountsOut;
            bytes userData;
            bool toInternalBalance;
        }

        function joinPool(
            bytes32 poolId,
            address sender,
            address recipient,
            JoinPoolRequest memory request
        ) external payable;

        function exitPool(
            bytes32 poolId,
            address sender,
            address payable recipient,
            ExitPoolRequest memory request
        ) external;
    }
}

/// The kinds of pool user data the calculator produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum UserDataKind {
    ExactTokensInForBptOut,
    ExactBptInForOneTokenOut,
    ExactBptInForTokensOut,
    BptInForExactTokensOut,
}

impl UserDataKind {
    /// The enum value the pool contract expects as the first user data word,
    /// or `None` if the pool version does not support the operation.
    pub fn discriminant(self, pool: PoolKind, version: u32) -> Option<u8> {
        match (pool, self) {
            (_, Self::ExactTokensInForBptOut) => Some(1),
            (_, Self::ExactBptInForOneTokenOut) => Some(0),
            (PoolKind::ComposableStable, Self::ExactBptInForTokensOut) => {
                (version >= 2).then_some(2)
            }
            (PoolKind::ComposableStable, Self::BptInForExactTokensOut) => Some(1),
            (
                PoolKind::Weighted | PoolKind::Stable | PoolKind::MetaStable,
                Self::ExactBptInForTokensOut,
            ) => Some(1),
            (
                PoolKind::Weighted | PoolKind::Stable | PoolKind::MetaStable,
                Self::BptInForExactTokensOut,
            ) => Some(2),
        }
    }
}

/// Pool specific payload of a join or exit. Token amounts and indices refer
/// to the pool tokens without the pool's own BPT.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UserData {
    ExactTokensInForBptOut {
        amounts_in: Vec<U256>,
        min_bpt_out: U256,
    },
    ExactBptInForOneTokenOut {
        bpt_in: U256,
        token_index: usize,
    },
    ExactBptInForTokensOut {
        bpt_in: U256,
    },
    BptInForExactTokensOut {
        amounts_out: Vec<U256>,
        max_bpt_in: U256,
    },
}

impl UserData {
    /// `abi.encode` of the discriminant followed by the operation's
    /// parameters.
    pub fn encode(&self, discriminant: u8) -> Bytes {
        let discriminant = U256::from(discriminant);
        let encoded = match self {
            Self::ExactTokensInForBptOut {
                amounts_in,
                min_bpt_out,
            } => (discriminant, amounts_in.clone(), *min_bpt_out).abi_encode_params(),
            Self::ExactBptInForOneTokenOut {
                bpt_in,
                token_index,
            } => (discriminant, *bpt_in, U256::from(*token_index)).abi_encode_params(),
            Self::ExactBptInForTokensOut { bpt_in } => {
                (discriminant, *bpt_in).abi_encode_params()
            }
            Self::BptInForExactTokensOut {
                amounts_out,
                max_bpt_in,
            } => (discriminant, amounts_out.clone(), *max_bpt_in).abi_encode_params(),
        };
        encoded.into()
    }
}

/// Arguments shared by vault joins and exits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolCall {
    pub pool_id: B256,
    pub sender: Address,
    pub recipient: Address,
    pub assets: Vec<Address>,
    /// Maximum amounts in for joins, minimum amounts out for exits.
    pub limits: Vec<U256>,
    pub user_data: Bytes,
    pub internal_balance: bool,
}

impl PoolCall {
    pub fn encode_join(self) -> Bytes {
        IVault::joinPoolCall {
            poolId: self.pool_id,
            sender: self.sender,
            recipient: self.recipient,
            request: IVault::JoinPoolRequest {
                assets: self.assets,
                maxAmountsIn: self.limits,
                userData: self.user_data,
                fromInternalBalance: self.internal_balance,
            },
        }
        .abi_encode()
        .into()
    }

    pub fn encode_exit(self) -> Bytes {
        IVault::exitPoolCall {
            poolId: self.pool_id,
            sender: self.sender,
            recipient: self.recipient,
            request: IVault::ExitPoolRequest {
                assets: self.assets,
                minAmountsOut: self.limits,
                userData: self.user_data,
                toInternalBalance: self.internal_balance,
            },
        }
        .abi_encode()
        .into()
    }
}
