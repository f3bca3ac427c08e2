//! Bindings for the `Pool` contract.
//!
//! Generated from the contract ABI. Regenerate instead of editing.

#![allow(clippy::too_many_arguments)]

use abi_wrapper_sdk::prelude::*;

pub const CONTRACT_ADDRESS: Option<&str> = Some("0x0000000000000000000000000000000000000def");

pub const ABI: &str = r#"[
    {"inputs":[{"name":"amounts","type":"uint256[2]"},{"name":"min_mint_amount","type":"uint256"}],"name":"add_liquidity","outputs":[{"name":"","type":"uint256"}],"stateMutability":"nonpayable","type":"function"},
    {"inputs":[{"name":"amounts","type":"uint256[2]"},{"name":"min_mint_amount","type":"uint256"},{"name":"use_eth","type":"bool"}],"name":"add_liquidity","outputs":[{"name":"","type":"uint256"}],"stateMutability":"nonpayable","type":"function"},
    {"inputs":[],"name":"get_balances","outputs":[{"name":"","type":"uint256[2]"}],"stateMutability":"view","type":"function"},
    {"inputs":[],"name":"contract","outputs":[{"name":"","type":"address"}],"stateMutability":"view","type":"function"}
]"#;

/// Event names, usable as a `parse_events` filter.
pub const EVENTS: &[&str] = &[];

pub struct Pool {
    contract: WrapperContract,
}

impl Pool {
    pub fn new(runtime: Arc<ContractRuntime>) -> Result<Self, ConfigurationError> {
        Ok(Self {
            contract: WrapperContract::new("Pool", runtime, ABI, CONTRACT_ADDRESS)?,
        })
    }

    /// Underlying handle: event parsing, receipts, raw calls.
    pub fn contract(&self) -> &WrapperContract {
        &self.contract
    }

    /// `add_liquidity(uint256[2],uint256)`, transaction.
    pub async fn add_liquidity(&self, cred: &Credentials, amounts: Vec<U256>, min_mint_amount: U256) -> Result<TxOutcome, TxError> {
        self.contract.bound()?.send(cred, [0x0b, 0x4c, 0x7e, 0x4d], vec![amounts.into_token(), min_mint_amount.into_token()], U256::zero()).await
    }

    /// `add_liquidity(uint256[2],uint256,bool)`, transaction.
    pub async fn add_liquidity_1(&self, cred: &Credentials, amounts: Vec<U256>, min_mint_amount: U256, use_eth: bool) -> Result<TxOutcome, TxError> {
        self.contract.bound()?.send(cred, [0xee, 0x22, 0xbe, 0x23], vec![amounts.into_token(), min_mint_amount.into_token(), use_eth.into_token()], U256::zero()).await
    }

    /// `get_balances()`, read-only.
    pub async fn get_balances(&self) -> Result<Vec<U256>, CallError> {
        self.contract.bound()?.call([0x14, 0xf0, 0x59, 0x79], vec![]).await
    }

    /// `contract()`, read-only.
    pub async fn _contract(&self) -> Result<Address, CallError> {
        self.contract.bound()?.call([0x2c, 0x01, 0xe0, 0x53], vec![]).await
    }
}
