// src/credentials.rs

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};
use std::fmt;
use std::str::FromStr;

use crate::errors::{CredentialsError, TxError};

/// Signing capability for one account. Supplied by the caller, never
/// generated or persisted by this crate.
#[derive(Clone)]
pub struct Credentials {
    address: Address,
    wallet: LocalWallet,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("address", &self.address).finish_non_exhaustive()
    }
}

fn parse_key(private_key: &str) -> Result<LocalWallet, CredentialsError> {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    LocalWallet::from_str(key).map_err(|e| CredentialsError::InvalidKey(e.to_string()))
}

impl Credentials {
    /// Checks that `private_key` actually controls `address`.
    pub fn new(address: Address, private_key: &str) -> Result<Self, CredentialsError> {
        let wallet = parse_key(private_key)?;
        if wallet.address() != address {
            return Err(CredentialsError::AddressMismatch {
                declared: address,
                derived: wallet.address(),
            });
        }
        Ok(Self { address, wallet })
    }

    pub fn from_private_key(private_key: &str) -> Result<Self, CredentialsError> {
        let wallet = parse_key(private_key)?;
        Ok(Self {
            address: wallet.address(),
            wallet,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// RLP-encoded signed payload, ready for `eth_sendRawTransaction`.
    pub async fn sign(&self, tx: &TypedTransaction, chain_id: u64) -> Result<Bytes, TxError> {
        let signer = self.wallet.clone().with_chain_id(chain_id);
        let signature = signer
            .sign_transaction(tx)
            .await
            .map_err(|e| TxError::Signing(e.to_string()))?;
        Ok(tx.rlp_signed(&signature))
    }
}
