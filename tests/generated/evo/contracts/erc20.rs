//! Bindings for the `ERC20` contract.
//!
//! Generated from the contract ABI. Regenerate instead of editing.

#![allow(clippy::too_many_arguments)]

use abi_wrapper_sdk::prelude::*;

pub const CONTRACT_ADDRESS: Option<&str> = None;

pub const ABI: &str = r#"[
    {"inputs":[{"name":"account","type":"address"}],"name":"balanceOf","outputs":[{"name":"","type":"uint256"}],"stateMutability":"view","type":"function"},
    {"inputs":[],"name":"decimals","outputs":[{"name":"","type":"uint8"}],"stateMutability":"view","type":"function"}
]"#;

/// Event names, usable as a `parse_events` filter.
pub const EVENTS: &[&str] = &[];

pub struct ERC20 {
    contract: WrapperContract,
}

impl ERC20 {
    pub fn new(runtime: Arc<ContractRuntime>) -> Result<Self, ConfigurationError> {
        Ok(Self {
            contract: WrapperContract::new("ERC20", runtime, ABI, CONTRACT_ADDRESS)?,
        })
    }

    /// Underlying handle: event parsing, receipts, raw calls.
    pub fn contract(&self) -> &WrapperContract {
        &self.contract
    }

    /// `balanceOf(address)`, read-only.
    pub async fn balance_of(&self, contract_address: Address, account: Address) -> Result<U256, CallError> {
        let contract = self.contract.at(contract_address);
        contract.call([0x70, 0xa0, 0x82, 0x31], vec![account.into_token()]).await
    }

    /// `decimals()`, read-only.
    pub async fn decimals(&self, contract_address: Address) -> Result<U256, CallError> {
        let contract = self.contract.at(contract_address);
        contract.call([0x31, 0x3c, 0xe5, 0x67], vec![]).await
    }
}
