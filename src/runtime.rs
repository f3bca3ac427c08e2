//! # Runtime
//!
//! What generated bindings call into.
//!
//! - [`RuntimeContext`] owns the connection pool and hands out one
//!   [`ContractRuntime`] per endpoint. Every contract built from the same
//!   context and endpoint shares that runtime's client, nonce cache and fee
//!   policy.
//! - [`WrapperContract`] is the parsed ABI of one contract plus its fixed
//!   handle, if the contract has a known address.
//! - [`ContractHandle`] is a contract at one address. Calls are dispatched by
//!   4-byte selector; no function is ever looked up by name.

use dashmap::DashMap;
use ethers::abi::{Abi, Detokenize, Function, ParamType, Token};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U256};
use log::{debug, info};
use std::str::FromStr;
use std::sync::Arc;

use crate::connection_pool::ConnectionPool;
use crate::credentials::Credentials;
use crate::errors::{CallError, ClientError, ConfigurationError, TxError};
use crate::events::{decode_receipt_events, EventRecords};
use crate::fee_strategy::FeePolicy;
use crate::ledger_client::LedgerClient;
use crate::settings::Settings;
use crate::transaction::{CancelToken, ContractCall, TxConfig, TxManager, TxOutcome};

/// One endpoint: its client and its lifecycle manager.
pub struct ContractRuntime {
    client: Arc<dyn LedgerClient>,
    transactions: TxManager,
}

impl ContractRuntime {
    pub fn new(client: Arc<dyn LedgerClient>, fees: FeePolicy, config: TxConfig) -> Self {
        Self {
            client,
            transactions: TxManager::new(fees, config),
        }
    }

    pub fn client(&self) -> &dyn LedgerClient {
        self.client.as_ref()
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    pub fn transactions(&self) -> &TxManager {
        &self.transactions
    }

    /// Receipt of any transaction, `None` while it is pending or unknown.
    pub async fn receipt_for_hash(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, ClientError> {
        self.client.transaction_receipt(tx_hash).await
    }
}

/// Owns connections and per-endpoint runtimes. Nothing here is global: two
/// contexts never share a connection or a nonce cache.
pub struct RuntimeContext {
    pool: ConnectionPool,
    runtimes: DashMap<String, Arc<ContractRuntime>>,
    fees: FeePolicy,
    config: TxConfig,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(ConnectionPool::new())
    }
}

impl RuntimeContext {
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            runtimes: DashMap::new(),
            fees: FeePolicy::default(),
            config: TxConfig::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(ConnectionPool::new())
            .with_fee_policy(FeePolicy::from_settings(&settings.fees))
            .with_tx_config(TxConfig::from_settings(&settings.transactions))
    }

    /// Applies to runtimes created after this call.
    pub fn with_fee_policy(mut self, fees: FeePolicy) -> Self {
        self.fees = fees;
        self
    }

    /// Applies to runtimes created after this call.
    pub fn with_tx_config(mut self, config: TxConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// The shared runtime for `endpoint`, created on first use.
    pub fn runtime(&self, endpoint: &str) -> Result<Arc<ContractRuntime>, ConfigurationError> {
        let endpoint = endpoint.trim();
        if let Some(runtime) = self.runtimes.get(endpoint) {
            return Ok(Arc::clone(runtime.value()));
        }
        let client = self.pool.get(endpoint)?;
        let runtime = self
            .runtimes
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                debug!("[RUNTIME] New runtime for {} with {:?}", endpoint, self.fees);
                Arc::new(ContractRuntime::new(client, self.fees, self.config.clone()))
            })
            .value()
            .clone();
        Ok(runtime)
    }
}

/// A contract's ABI and, when its address is known, its fixed handle.
pub struct WrapperContract {
    name: String,
    runtime: Arc<ContractRuntime>,
    abi: Arc<Abi>,
    fixed: Option<ContractHandle>,
}

impl WrapperContract {
    /// `address` is `None` for custom-contract mode: every call then goes
    /// through [`WrapperContract::at`].
    pub fn new(
        name: &str,
        runtime: Arc<ContractRuntime>,
        abi_json: &str,
        address: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        let abi: Abi = serde_json::from_str(abi_json).map_err(|e| ConfigurationError::InvalidAbi {
            contract: name.to_string(),
            reason: e.to_string(),
        })?;
        let abi = Arc::new(abi);

        let fixed = match address.map(str::trim).filter(|a| !a.is_empty()) {
            Some(raw) => {
                let address = Address::from_str(raw).map_err(|_| ConfigurationError::InvalidAddress {
                    contract: name.to_string(),
                    value: raw.to_string(),
                })?;
                Some(ContractHandle {
                    address,
                    abi: Arc::clone(&abi),
                    runtime: Arc::clone(&runtime),
                })
            }
            None => None,
        };
        info!(
            "[RUNTIME] {} on {} ({})",
            name,
            runtime.endpoint(),
            fixed
                .as_ref()
                .map(|h| format!("{:?}", h.address))
                .unwrap_or_else(|| "custom contract".to_string())
        );

        Ok(Self {
            name: name.to_string(),
            runtime,
            abi,
            fixed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn runtime(&self) -> &Arc<ContractRuntime> {
        &self.runtime
    }

    pub fn address(&self) -> Option<Address> {
        self.fixed.as_ref().map(|h| h.address)
    }

    /// The handle at the contract's fixed address.
    pub fn bound(&self) -> Result<&ContractHandle, CallError> {
        self.fixed.as_ref().ok_or(CallError::NoAddress)
    }

    /// A transient handle at `address`, sharing this contract's ABI.
    pub fn at(&self, address: Address) -> ContractHandle {
        ContractHandle {
            address,
            abi: Arc::clone(&self.abi),
            runtime: Arc::clone(&self.runtime),
        }
    }

    /// Decodes the receipt's logs against this contract's events, optionally
    /// only the events named in `names`.
    pub fn parse_events(&self, receipt: &TransactionReceipt, names: Option<&[&str]>) -> EventRecords {
        decode_receipt_events(&self.abi, receipt, names)
    }

    pub async fn receipt_for_hash(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, ClientError> {
        self.runtime.receipt_for_hash(tx_hash).await
    }
}

/// Reshapes a token to the declared parameter type. Generated code passes
/// `T[N]` values as `Vec<T>`, which tokenizes as `Array`; the encoder only
/// accepts `FixedArray` for fixed-size parameters.
fn conform_token(token: Token, kind: &ParamType) -> Token {
    match (token, kind) {
        (Token::Array(items), ParamType::FixedArray(inner, _))
        | (Token::FixedArray(items), ParamType::FixedArray(inner, _)) => {
            Token::FixedArray(items.into_iter().map(|t| conform_token(t, inner)).collect())
        }
        (Token::Array(items), ParamType::Array(inner)) => {
            Token::Array(items.into_iter().map(|t| conform_token(t, inner)).collect())
        }
        (Token::Tuple(items), ParamType::Tuple(kinds)) if items.len() == kinds.len() => Token::Tuple(
            items
                .into_iter()
                .zip(kinds.iter())
                .map(|(t, k)| conform_token(t, k))
                .collect(),
        ),
        (token, _) => token,
    }
}

fn conform_args(function: &Function, args: &[Token]) -> Vec<Token> {
    if args.len() != function.inputs.len() {
        // Let the encoder report the arity mismatch.
        return args.to_vec();
    }
    args.iter()
        .cloned()
        .zip(function.inputs.iter())
        .map(|(token, param)| conform_token(token, &param.kind))
        .collect()
}

/// A contract at one address.
#[derive(Clone)]
pub struct ContractHandle {
    address: Address,
    abi: Arc<Abi>,
    runtime: Arc<ContractRuntime>,
}

impl ContractHandle {
    pub fn address(&self) -> Address {
        self.address
    }

    fn function(&self, selector: [u8; 4]) -> Result<&Function, CallError> {
        self.abi
            .functions()
            .find(|f| f.short_signature() == selector)
            .ok_or(CallError::UnknownSelector(selector))
    }

    /// Selector plus ABI-encoded arguments.
    pub fn encode(&self, selector: [u8; 4], args: &[Token]) -> Result<Bytes, CallError> {
        let function = self.function(selector)?;
        Ok(function.encode_input(&conform_args(function, args))?.into())
    }

    /// Executes a read-only call and returns the raw output tokens.
    pub async fn call_tokens(&self, selector: [u8; 4], args: Vec<Token>) -> Result<Vec<Token>, CallError> {
        let function = self.function(selector)?;
        let data = function.encode_input(&conform_args(function, &args))?;
        let tx: TypedTransaction = TransactionRequest::new().to(self.address).data(data).into();
        let output = self.runtime.client().call(&tx).await?;
        Ok(function.decode_output(&output)?)
    }

    /// Executes a read-only call and decodes the output into `D`.
    pub async fn call<D: Detokenize>(&self, selector: [u8; 4], args: Vec<Token>) -> Result<D, CallError> {
        let tokens = self.call_tokens(selector, args).await?;
        Ok(D::from_tokens(tokens)?)
    }

    /// Signs, submits and confirms a state-changing call.
    pub async fn send(
        &self,
        cred: &Credentials,
        selector: [u8; 4],
        args: Vec<Token>,
        value: U256,
    ) -> Result<TxOutcome, TxError> {
        self.submit(cred, selector, args, value, None).await
    }

    /// Like [`ContractHandle::send`], but the confirmation wait stops with
    /// `TxError::Cancelled` once `cancel` fires.
    pub async fn send_cancellable(
        &self,
        cred: &Credentials,
        selector: [u8; 4],
        args: Vec<Token>,
        value: U256,
        cancel: &CancelToken,
    ) -> Result<TxOutcome, TxError> {
        self.submit(cred, selector, args, value, Some(cancel)).await
    }

    async fn submit(
        &self,
        cred: &Credentials,
        selector: [u8; 4],
        args: Vec<Token>,
        value: U256,
        cancel: Option<&CancelToken>,
    ) -> Result<TxOutcome, TxError> {
        let call = ContractCall {
            to: self.address,
            data: self.encode(selector, &args)?,
            value,
        };
        self.runtime
            .transactions()
            .send(self.runtime.client(), cred, &call, cancel)
            .await
    }
}
