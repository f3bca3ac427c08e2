// src/ledger_client.rs
//
// The node operations the runtime needs, behind one trait so the connection
// pool, nonce cache and lifecycle manager can run against any transport.

use async_trait::async_trait;
use ethers::middleware::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, Bytes, TransactionReceipt, H256, U256};
use log::debug;
use std::time::Instant;

use crate::errors::ClientError;
use crate::metrics;

/// Gas figures of the pending block, used by the legacy fee policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGas {
    pub gas_used: U256,
    pub gas_limit: U256,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Endpoint this client talks to, for logs and pool keys.
    fn endpoint(&self) -> &str;

    async fn chain_id(&self) -> Result<U256, ClientError>;

    /// Transaction count including the pending block.
    async fn pending_transaction_count(&self, address: Address) -> Result<U256, ClientError>;

    async fn pending_block_gas(&self) -> Result<BlockGas, ClientError>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, ClientError>;

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, ClientError>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ClientError>;

    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, ClientError>;
}

/// Adapts any ethers middleware (usually `Provider<Http>`).
#[derive(Debug)]
pub struct MiddlewareClient<M> {
    inner: M,
    endpoint: String,
}

impl<M: Middleware> MiddlewareClient<M> {
    pub fn new(inner: M, endpoint: impl Into<String>) -> Self {
        Self {
            inner,
            endpoint: endpoint.into(),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    fn traced<T, E: std::fmt::Display>(
        &self,
        method: &'static str,
        start: Instant,
        result: Result<T, E>,
    ) -> Result<T, ClientError> {
        let duration = start.elapsed();
        metrics::increment_rpc_call(method);
        metrics::record_rpc_call_latency(method, duration);
        debug!(
            "[RPC_TRACE] {} -> {}: duration={:?}, ok={}",
            self.endpoint,
            method,
            duration,
            result.is_ok()
        );
        result.map_err(|e| ClientError::new(method, e))
    }
}

#[async_trait]
impl<M> LedgerClient for MiddlewareClient<M>
where
    M: Middleware + 'static,
{
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn chain_id(&self) -> Result<U256, ClientError> {
        let start = Instant::now();
        let result = self.inner.get_chainid().await;
        self.traced("eth_chainId", start, result)
    }

    async fn pending_transaction_count(&self, address: Address) -> Result<U256, ClientError> {
        let start = Instant::now();
        let result = self
            .inner
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await;
        self.traced("eth_getTransactionCount", start, result)
    }

    async fn pending_block_gas(&self) -> Result<BlockGas, ClientError> {
        let start = Instant::now();
        let result = self.inner.get_block(BlockNumber::Pending).await;
        let block = self
            .traced("eth_getBlockByNumber", start, result)?
            .ok_or_else(|| ClientError::new("eth_getBlockByNumber", "pending block unavailable"))?;
        Ok(BlockGas {
            gas_used: block.gas_used,
            gas_limit: block.gas_limit,
        })
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, ClientError> {
        let start = Instant::now();
        let result = self.inner.estimate_gas(tx, None).await;
        self.traced("eth_estimateGas", start, result)
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, ClientError> {
        let start = Instant::now();
        let result = self.inner.call(tx, None).await;
        self.traced("eth_call", start, result)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ClientError> {
        let start = Instant::now();
        let result = self
            .inner
            .send_raw_transaction(raw)
            .await
            .map(|pending| pending.tx_hash());
        self.traced("eth_sendRawTransaction", start, result)
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, ClientError> {
        let start = Instant::now();
        let result = self.inner.get_transaction_receipt(tx_hash).await;
        self.traced("eth_getTransactionReceipt", start, result)
    }
}
