use alloy::primitives::{Address, Bytes, B256, U256};
use bigdecimal::BigDecimal;

use crate::amount::wei_to_eth;

/// A resolved pending transaction: the fields the monitor acts on.
#[derive(Debug, Clone)]
pub struct PendingTx {
    pub hash: B256,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

impl PendingTx {
    pub fn value_eth(&self) -> BigDecimal {
        wei_to_eth(self.value)
    }

    /// Transaction data as lowercase `0x`-prefixed hex.
    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.input))
    }
}
