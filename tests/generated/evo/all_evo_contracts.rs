//! Every `Evo` contract against one shared endpoint.
//!
//! Generated. Regenerate instead of editing.

use abi_wrapper_sdk::prelude::*;

use super::contracts::token::Token;
use super::contracts::erc20::ERC20;
use super::contracts::pool::Pool;

pub struct AllEvoContracts {
    pub endpoint: String,
    pub token: Token,
    pub erc20: ERC20,
    pub pool: Pool,
}

impl AllEvoContracts {
    pub fn new(endpoint: &str) -> Result<Self, ConfigurationError> {
        Self::with_context(&RuntimeContext::default(), endpoint)
    }

    /// Connects to `rpc.endpoint` with the fee policy and transaction settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        Self::with_context(&RuntimeContext::from_settings(settings), &settings.rpc.endpoint)
    }

    /// Shares the context's connection pool, nonce cache and fee policy.
    pub fn with_context(context: &RuntimeContext, endpoint: &str) -> Result<Self, ConfigurationError> {
        let runtime = context.runtime(endpoint)?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            token: Token::new(Arc::clone(&runtime))?,
            erc20: ERC20::new(Arc::clone(&runtime))?,
            pool: Pool::new(Arc::clone(&runtime))?,
        })
    }
}
