//! Chain specific addresses the encoder needs.

use alloy::primitives::{Address, address};

/// Addresses of the contracts operations are encoded against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Network {
    /// The Balancer V2 vault, target of every join and exit.
    pub vault: Address,
    /// Wrapped version of the chain's native asset. The zero address in a
    /// request stands for the native asset and is resolved to this token.
    pub wrapped_native_asset: Address,
}

impl Network {
    pub fn mainnet() -> Self {
        Self {
            vault: address!("0xBA12222222228d8Ba445958a75a0704d566BF2C8"),
            wrapped_native_asset: address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
        }
    }

    /// Maps the native asset placeholder to the wrapped native asset.
    pub fn resolve(&self, token: Address) -> Address {
        if token.is_zero() {
            self.wrapped_native_asset
        } else {
            token
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::mainnet()
    }
}
