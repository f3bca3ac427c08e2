//! # ABI Wrapper SDK
//!
//! Generates typed Rust bindings from Solidity JSON ABIs and runs the
//! transactions those bindings produce.
//!
//! ## Overview
//!
//! The SDK has two halves that meet at the generated code:
//!
//! - **Generation**: interface files are normalized, turned into a binding
//!   description, and emitted as one Rust module per contract plus an
//!   aggregate struct per project.
//! - **Runtime**: generated methods dispatch by selector into a shared
//!   runtime that pools connections, allocates nonces, quotes fees, signs,
//!   submits, retries stale nonces and waits for receipts.
//!
//! ## Architecture
//!
//! ### Generation Layer
//! `interface` loads `{ "Contract": { "ADDRESS", "ABI" } }` project files,
//! `normalizer` filters entries and canonicalizes names, `type_mapping` maps
//! Solidity types, `binding` derives the description and `emitter` renders it.
//!
//! ### Connection & Fee Layer
//! `connection_pool` shares one client per endpoint, `nonce_manager` keeps the
//! per-address nonce cache and `fee_strategy` quotes dynamic or legacy fees.
//!
//! ### Transaction Layer
//! `transaction` drives build, sign, submit and confirm; `events` decodes
//! receipt logs; `runtime` ties it together for generated code.

// Generation
/// Interface file loading and raw entries
pub mod interface;
/// Entry filtering and name canonicalization
pub mod normalizer;
/// Solidity type to Rust type mapping
pub mod type_mapping;
/// Language-neutral binding description
pub mod binding;
/// Rust source emission
pub mod emitter;
/// End-to-end generation for one project
pub mod generator;

// Connection & Fees
/// Node operations used by the runtime
pub mod ledger_client;
/// Endpoint to client pool
pub mod connection_pool;
/// Per-address nonce cache
pub mod nonce_manager;
/// Dynamic and legacy fee policies
pub mod fee_strategy;

// Transactions
/// Signing credentials
pub mod credentials;
/// Transaction lifecycle manager
pub mod transaction;
/// Receipt event decoding
pub mod events;
/// Runtime context and contract handles used by generated code
pub mod runtime;

// Infrastructure
/// Error types
pub mod errors;
/// Metrics and observability
pub mod metrics;
/// Configuration management
pub mod settings;
/// Scripted in-memory ledger client
pub mod testing;

/// Everything generated bindings import.
pub mod prelude {
    pub use crate::credentials::Credentials;
    pub use crate::errors::{CallError, ConfigurationError, TxError};
    pub use crate::events::{DecodedEvent, EventRecords};
    pub use crate::runtime::{ContractHandle, ContractRuntime, RuntimeContext, WrapperContract};
    pub use crate::settings::Settings;
    pub use crate::transaction::{CancelHandle, CancelToken, TxOutcome};
    pub use ethers::abi::{Token, Tokenizable};
    pub use ethers::types::{Address, Bytes, I256, U256};
    pub use std::sync::Arc;
}

// Re-exports for convenience
pub use credentials::Credentials;
pub use runtime::{ContractRuntime, RuntimeContext, WrapperContract};
pub use settings::Settings;
pub use transaction::{TxConfig, TxOutcome};
