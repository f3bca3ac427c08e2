//! In-memory [`LedgerClient`] with scripted responses.
//!
//! Used by the test suites and for dry runs of generated bindings without a
//! node. Every submission is recorded and gets a receipt (after an optional
//! number of empty polls) unless an error was queued for it.

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256, U64};
use ethers::utils::keccak256;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::errors::ClientError;
use crate::ledger_client::{BlockGas, LedgerClient};

/// How many times each node operation was hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub chain_id: usize,
    pub nonce_fetches: usize,
    pub block_fetches: usize,
    pub gas_estimates: usize,
    pub calls: usize,
    pub submissions: usize,
    pub receipt_polls: usize,
}

#[derive(Default)]
struct Script {
    nonces: HashMap<Address, U256>,
    block_gas: Option<BlockGas>,
    gas_estimate: U256,
    call_responses: HashMap<[u8; 4], Bytes>,
    submission_errors: VecDeque<String>,
    receipt_logs: Vec<Log>,
    receipt_delay: usize,
    receipt_errors: usize,
    confirm: bool,
    pending: HashMap<H256, usize>,
    receipts: HashMap<H256, TransactionReceipt>,
    submitted: Vec<Bytes>,
    executed_calls: Vec<TypedTransaction>,
    counts: CallCounts,
}

pub struct ScriptedClient {
    endpoint: String,
    chain_id: U256,
    script: Mutex<Script>,
}

impl ScriptedClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            chain_id: U256::from(1337u64),
            script: Mutex::new(Script {
                gas_estimate: U256::from(21_000u64),
                confirm: true,
                ..Script::default()
            }),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = U256::from(chain_id);
        self
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_transaction_count(&self, address: Address, count: u64) {
        self.script().nonces.insert(address, U256::from(count));
    }

    pub fn set_block_gas(&self, gas_used: U256, gas_limit: U256) {
        self.script().block_gas = Some(BlockGas { gas_used, gas_limit });
    }

    pub fn set_gas_estimate(&self, gas: U256) {
        self.script().gas_estimate = gas;
    }

    /// ABI-encoded return data for calls to `selector`.
    pub fn respond_to_call(&self, selector: [u8; 4], output: impl Into<Bytes>) {
        self.script().call_responses.insert(selector, output.into());
    }

    /// The next submission fails with `message`. Queued errors are consumed in order.
    pub fn fail_next_submission(&self, message: impl Into<String>) {
        self.script().submission_errors.push_back(message.into());
    }

    /// Logs attached to every receipt produced from now on.
    pub fn set_receipt_logs(&self, logs: Vec<Log>) {
        self.script().receipt_logs = logs;
    }

    /// Number of empty polls before a receipt shows up.
    pub fn set_receipt_delay(&self, polls: usize) {
        self.script().receipt_delay = polls;
    }

    /// The next `polls` receipt lookups fail as if the node were unreachable.
    pub fn fail_receipt_polls(&self, polls: usize) {
        self.script().receipt_errors = polls;
    }

    /// When false, submitted transactions never get a receipt.
    pub fn set_confirm(&self, confirm: bool) {
        self.script().confirm = confirm;
    }

    pub fn insert_receipt(&self, receipt: TransactionReceipt) {
        self.script().receipts.insert(receipt.transaction_hash, receipt);
    }

    pub fn submitted(&self) -> Vec<Bytes> {
        self.script().submitted.clone()
    }

    pub fn executed_calls(&self) -> Vec<TypedTransaction> {
        self.script().executed_calls.clone()
    }

    pub fn counts(&self) -> CallCounts {
        self.script().counts
    }
}

#[async_trait]
impl LedgerClient for ScriptedClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn chain_id(&self) -> Result<U256, ClientError> {
        self.script().counts.chain_id += 1;
        Ok(self.chain_id)
    }

    async fn pending_transaction_count(&self, address: Address) -> Result<U256, ClientError> {
        let mut script = self.script();
        script.counts.nonce_fetches += 1;
        Ok(script.nonces.get(&address).copied().unwrap_or_default())
    }

    async fn pending_block_gas(&self) -> Result<BlockGas, ClientError> {
        let mut script = self.script();
        script.counts.block_fetches += 1;
        script
            .block_gas
            .ok_or_else(|| ClientError::new("eth_getBlockByNumber", "pending block unavailable"))
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256, ClientError> {
        let mut script = self.script();
        script.counts.gas_estimates += 1;
        Ok(script.gas_estimate)
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, ClientError> {
        let mut script = self.script();
        script.counts.calls += 1;
        script.executed_calls.push(tx.clone());
        let selector = tx
            .data()
            .filter(|data| data.len() >= 4)
            .map(|data| [data[0], data[1], data[2], data[3]])
            .ok_or_else(|| ClientError::new("eth_call", "missing call data"))?;
        script
            .call_responses
            .get(&selector)
            .cloned()
            .ok_or_else(|| ClientError::new("eth_call", "execution reverted"))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ClientError> {
        let mut script = self.script();
        script.counts.submissions += 1;
        if let Some(message) = script.submission_errors.pop_front() {
            return Err(ClientError::new("eth_sendRawTransaction", message));
        }
        let tx_hash = H256::from(keccak256(&raw));
        script.submitted.push(raw);
        if script.confirm {
            let receipt = TransactionReceipt {
                transaction_hash: tx_hash,
                status: Some(U64::from(1u64)),
                logs: script.receipt_logs.clone(),
                ..Default::default()
            };
            let delay = script.receipt_delay;
            script.pending.insert(tx_hash, delay);
            script.receipts.insert(tx_hash, receipt);
        }
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, ClientError> {
        let mut script = self.script();
        script.counts.receipt_polls += 1;
        if script.receipt_errors > 0 {
            script.receipt_errors -= 1;
            return Err(ClientError::new("eth_getTransactionReceipt", "connection reset by peer"));
        }
        if let Some(remaining) = script.pending.get_mut(&tx_hash) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        Ok(script.receipts.get(&tx_hash).cloned())
    }
}
