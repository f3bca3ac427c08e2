// src/fee_strategy.rs
//
// Fee policies. Selected once when a runtime is built; every transaction of
// that runtime is quoted with the same policy.

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Eip1559TransactionRequest, TransactionRequest, U256};
use log::debug;
use serde::Deserialize;

use crate::errors::ClientError;
use crate::ledger_client::LedgerClient;
use crate::settings::FeeSettings;

const WEI_PER_GWEI: u64 = 1_000_000_000;

pub fn gwei(amount: u64) -> U256 {
    U256::from(amount) * U256::from(WEI_PER_GWEI)
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeePolicyKind {
    #[default]
    Dynamic,
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    /// EIP-1559 fees from configuration, attached unchanged; gas limit estimated.
    Dynamic {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
    /// `gas_price = pending.gas_used + margin`, `gas_limit = pending.gas_limit`.
    Legacy { margin: U256 },
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::from_settings(&FeeSettings::default())
    }
}

impl FeePolicy {
    pub fn dynamic_gwei(max_fee_gwei: u64, max_priority_fee_gwei: u64) -> Self {
        Self::Dynamic {
            max_fee_per_gas: gwei(max_fee_gwei),
            max_priority_fee_per_gas: gwei(max_priority_fee_gwei),
        }
    }

    pub fn legacy_gwei(margin_gwei: u64) -> Self {
        Self::Legacy {
            margin: gwei(margin_gwei),
        }
    }

    pub fn from_settings(fees: &FeeSettings) -> Self {
        match fees.policy {
            FeePolicyKind::Dynamic => Self::dynamic_gwei(fees.max_fee_gwei, fees.max_priority_fee_gwei),
            FeePolicyKind::Legacy => Self::legacy_gwei(fees.legacy_margin_gwei),
        }
    }

    /// Quotes fees for `draft`. Dynamic estimates gas against the draft;
    /// legacy reads the pending block.
    pub async fn quote(&self, client: &dyn LedgerClient, draft: &TransactionRequest) -> Result<FeeQuote, ClientError> {
        let quote = match *self {
            Self::Dynamic {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let typed: TypedTransaction = draft.clone().into();
                FeeQuote::Dynamic {
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                    gas_limit: client.estimate_gas(&typed).await?,
                }
            }
            Self::Legacy { margin } => {
                let pending = client.pending_block_gas().await?;
                FeeQuote::Legacy {
                    gas_price: pending.gas_used + margin,
                    gas_limit: pending.gas_limit,
                }
            }
        };
        debug!("[FEES] {:?}", quote);
        Ok(quote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeQuote {
    Dynamic {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
        gas_limit: U256,
    },
    Legacy {
        gas_price: U256,
        gas_limit: U256,
    },
}

impl FeeQuote {
    pub fn gas_limit(&self) -> U256 {
        match *self {
            Self::Dynamic { gas_limit, .. } | Self::Legacy { gas_limit, .. } => gas_limit,
        }
    }

    /// Turns a fee-less draft into the final unsigned transaction.
    pub fn apply(&self, draft: TransactionRequest) -> TypedTransaction {
        match *self {
            Self::Dynamic {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                gas_limit,
            } => Eip1559TransactionRequest {
                from: draft.from,
                to: draft.to,
                gas: Some(gas_limit),
                value: draft.value,
                data: draft.data,
                nonce: draft.nonce,
                chain_id: draft.chain_id,
                max_fee_per_gas: Some(max_fee_per_gas),
                max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
                ..Default::default()
            }
            .into(),
            Self::Legacy { gas_price, gas_limit } => draft.gas(gas_limit).gas_price(gas_price).into(),
        }
    }
}
