//! Bindings for the `Token` contract.
//!
//! Generated from the contract ABI. Regenerate instead of editing.

#![allow(clippy::too_many_arguments)]

use abi_wrapper_sdk::prelude::*;

pub const CONTRACT_ADDRESS: Option<&str> = Some("0x0000000000000000000000000000000000000abc");

pub const ABI: &str = r#"[
    {"inputs":[{"name":"account","type":"address"}],"name":"balanceOf","outputs":[{"name":"","type":"uint256"}],"stateMutability":"view","type":"function"},
    {"inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"name":"transfer","outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable","type":"function"},
    {"inputs":[],"name":"deposit","outputs":[],"stateMutability":"payable","type":"function"},
    {"anonymous":false,"inputs":[{"indexed":true,"name":"from","type":"address"},{"indexed":true,"name":"to","type":"address"},{"indexed":false,"name":"value","type":"uint256"}],"name":"Transfer","type":"event"}
]"#;

/// Event names, usable as a `parse_events` filter.
pub const EVENTS: &[&str] = &["Transfer"];

pub struct Token {
    contract: WrapperContract,
}

impl Token {
    pub fn new(runtime: Arc<ContractRuntime>) -> Result<Self, ConfigurationError> {
        Ok(Self {
            contract: WrapperContract::new("Token", runtime, ABI, CONTRACT_ADDRESS)?,
        })
    }

    /// Underlying handle: event parsing, receipts, raw calls.
    pub fn contract(&self) -> &WrapperContract {
        &self.contract
    }

    /// `balanceOf(address)`, read-only.
    pub async fn balance_of(&self, account: Address) -> Result<U256, CallError> {
        self.contract.bound()?.call([0x70, 0xa0, 0x82, 0x31], vec![account.into_token()]).await
    }

    /// `transfer(address,uint256)`, transaction.
    pub async fn transfer(&self, cred: &Credentials, to: Address, amount: U256) -> Result<TxOutcome, TxError> {
        self.contract.bound()?.send(cred, [0xa9, 0x05, 0x9c, 0xbb], vec![to.into_token(), amount.into_token()], U256::zero()).await
    }

    /// `deposit()`, payable transaction.
    pub async fn deposit(&self, cred: &Credentials, value: U256) -> Result<TxOutcome, TxError> {
        self.contract.bound()?.send(cred, [0xd0, 0xe3, 0x0d, 0xb0], vec![], value).await
    }
}
