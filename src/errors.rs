// src/errors.rs
//
// Error taxonomy for generation and runtime.

use ethers::types::{Address, U256};
use std::path::PathBuf;

/// The interface source could not be loaded or is unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("No ABI file present for project {project} at expected path {path:?}")]
    MissingSource { project: String, path: PathBuf },
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid interface JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Invalid address {value:?} for contract {contract}")]
    InvalidAddress { contract: String, value: String },
    #[error("Invalid ABI for contract {contract}: {reason}")]
    InvalidAbi { contract: String, reason: String },
    #[error("Cannot connect to endpoint {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

/// A single interface entry is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("{contract}: entry #{index} is missing required field `{field}`")]
    MissingField {
        contract: String,
        index: usize,
        field: &'static str,
    },
    #[error("{contract}: entry #{index} is malformed: {reason}")]
    Malformed {
        contract: String,
        index: usize,
        reason: String,
    },
    #[error("{contract}: entry #{index} has unknown kind `{kind}`")]
    UnknownKind {
        contract: String,
        index: usize,
        kind: String,
    },
    #[error("{contract}: entry #{index} has unknown state mutability `{mutability}`")]
    UnknownMutability {
        contract: String,
        index: usize,
        mutability: String,
    },
    #[error("{contract}: unsupported ABI type `{abi_type}` in `{function}`")]
    UnsupportedType {
        contract: String,
        function: String,
        abi_type: String,
    },
}

/// Failure reported by the ledger node or its transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{method} failed: {message}")]
pub struct ClientError {
    pub method: &'static str,
    pub message: String,
}

impl ClientError {
    pub fn new(method: &'static str, message: impl ToString) -> Self {
        Self {
            method,
            message: message.to_string(),
        }
    }
}

/// Read-only call or call-data failures.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Contract has no fixed address; use the custom-contract binding")]
    NoAddress,
    #[error("No function with selector 0x{} in ABI", hex::encode(.0))]
    UnknownSelector([u8; 4]),
    #[error("ABI error: {0}")]
    Abi(#[from] ethers::abi::Error),
    #[error("Output decode failed: {0}")]
    Decode(#[from] ethers::abi::InvalidOutputType),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Credential construction failures.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    #[error("Private key controls {derived:?}, not the declared address {declared:?}")]
    AddressMismatch { declared: Address, derived: Address },
}

/// Hard transaction failures. Node rejections and confirmation timeouts are
/// not errors; they are reported through `TxOutcome`.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Nonce still stale after {attempts} attempts for {address:?} (last nonce {last_nonce})")]
    RetriesExhausted {
        address: Address,
        attempts: u32,
        last_nonce: U256,
    },
    #[error("Confirmation wait cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::new("eth_sendRawTransaction", "nonce too low");
        assert_eq!(err.to_string(), "eth_sendRawTransaction failed: nonce too low");
    }

    #[test]
    fn test_unknown_selector_display() {
        let err = CallError::UnknownSelector([0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(err.to_string(), "No function with selector 0xa9059cbb in ABI");
    }
}
