//! # Transaction Lifecycle Manager
//!
//! Drives one mutating call from call data to a terminal [`TxOutcome`]:
//!
//! ```text
//! Built -> Signed -> Submitted -> Confirmed
//!                             \-> Failed      (node rejected the payload)
//!                             \-> StaleNonce  (refresh nonce, rebuild, resubmit)
//! ```
//!
//! Nonce allocation, fee quoting, signing and submission happen while the
//! sender's nonce slot is held, so two transactions from one address can
//! never race for a nonce. Confirmation polling runs after the slot is
//! released.

use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U256};
use log::{debug, error, info, warn};
use rand::Rng;
use std::fmt;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tokio::time::{sleep, Instant};

use crate::credentials::Credentials;
use crate::errors::{ClientError, TxError};
use crate::fee_strategy::FeePolicy;
use crate::ledger_client::LedgerClient;
use crate::metrics;
use crate::nonce_manager::{NonceGuard, NonceManager};
use crate::settings::TransactionSettings;

/// Submission error fragments that mean "this nonce is already taken".
const STALE_NONCE_INDICATORS: &[&str] = &["nonce too low", "nonce is too low", "nonce has already been used"];

pub fn is_stale_nonce_error(message: &str) -> bool {
    let message = message.to_lowercase();
    STALE_NONCE_INDICATORS.iter().any(|indicator| message.contains(indicator))
}

/// Lifecycle knobs. Defaults match `TransactionSettings::default()`.
#[derive(Debug, Clone, PartialEq)]
pub struct TxConfig {
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub force_nonce_refresh: bool,
    pub max_stale_nonce_retries: u32,
    pub retry_backoff_base: Duration,
    pub retry_backoff_max: Duration,
    /// Fraction of the backoff added as random jitter (0.0 to 1.0).
    pub retry_jitter: f64,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self::from_settings(&TransactionSettings::default())
    }
}

impl TxConfig {
    pub fn from_settings(settings: &TransactionSettings) -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(settings.confirmation_timeout_seconds),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            force_nonce_refresh: settings.force_nonce_refresh,
            max_stale_nonce_retries: settings.max_stale_nonce_retries,
            retry_backoff_base: Duration::from_millis(settings.retry_backoff_base_ms),
            retry_backoff_max: Duration::from_millis(settings.retry_backoff_max_ms),
            retry_jitter: settings.retry_jitter,
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_force_nonce_refresh(mut self, force: bool) -> Self {
        self.force_nonce_refresh = force;
        self
    }

    pub fn with_max_stale_nonce_retries(mut self, retries: u32) -> Self {
        self.max_stale_nonce_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.retry_backoff_base = base;
        self.retry_backoff_max = max;
        self
    }

    /// `base * 2^attempt`, capped, plus up to `retry_jitter` of random slack.
    fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_backoff_base.as_millis() as f64;
        let capped = (base_ms * 2_f64.powi(attempt as i32)).min(self.retry_backoff_max.as_millis() as f64);
        let jitter_range = capped * self.retry_jitter.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(0.0..=jitter_range)
        } else {
            0.0
        };
        Duration::from_millis((capped + jitter) as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Built,
    Signed,
    Submitted,
    Confirmed,
    Failed,
    StaleNonce,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Built => "BUILT",
            Self::Signed => "SIGNED",
            Self::Submitted => "SUBMITTED",
            Self::Confirmed => "CONFIRMED",
            Self::Failed => "FAILED",
            Self::StaleNonce => "STALE_NONCE",
        };
        f.write_str(name)
    }
}

/// Terminal result of a submitted transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    /// Mined. The receipt may still carry a reverted status.
    Confirmed(TransactionReceipt),
    /// The node refused the signed payload.
    Rejected { reason: String },
    /// Accepted by the node but no receipt within the confirmation timeout.
    TimedOut { tx_hash: H256 },
}

impl TxOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            Self::Confirmed(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            Self::Confirmed(receipt) => Some(receipt.transaction_hash),
            Self::TimedOut { tx_hash } => Some(*tx_hash),
            Self::Rejected { .. } => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::Rejected { .. } => "rejected",
            Self::TimedOut { .. } => "timed_out",
        }
    }
}

/// Stops confirmation waits that were given the matching [`CancelToken`].
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    receiver: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelToken) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancelToken { receiver })
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            receiver: self.sender.subscribe(),
        }
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancelled; never resolves if the handle is dropped first.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// A contract call that mutates state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// One endpoint's lifecycle manager: nonce cache, fee policy and config.
pub struct TxManager {
    nonces: NonceManager,
    fees: FeePolicy,
    config: TxConfig,
    chain_id: OnceCell<U256>,
}

impl TxManager {
    pub fn new(fees: FeePolicy, config: TxConfig) -> Self {
        Self {
            nonces: NonceManager::new(),
            fees,
            config,
            chain_id: OnceCell::new(),
        }
    }

    pub fn nonces(&self) -> &NonceManager {
        &self.nonces
    }

    pub fn fees(&self) -> &FeePolicy {
        &self.fees
    }

    pub fn config(&self) -> &TxConfig {
        &self.config
    }

    async fn chain_id(&self, client: &dyn LedgerClient) -> Result<U256, ClientError> {
        self.chain_id.get_or_try_init(|| client.chain_id()).await.copied()
    }

    /// Builds, signs, submits and confirms `call`.
    pub async fn send(
        &self,
        client: &dyn LedgerClient,
        cred: &Credentials,
        call: &ContractCall,
        cancel: Option<&CancelToken>,
    ) -> Result<TxOutcome, TxError> {
        let chain_id = self.chain_id(client).await?;
        let from = cred.address();

        let submitted = {
            let mut guard = self.nonces.lock(from).await;
            let result = self.submit_locked(client, cred, call, chain_id, &mut guard).await;
            if !matches!(result, Ok(Submission::Accepted(_))) {
                guard.invalidate();
            }
            result?
        };

        let outcome = match submitted {
            Submission::Accepted(tx_hash) => self.wait_for_receipt(client, tx_hash, cancel).await?,
            Submission::Rejected(reason) => TxOutcome::Rejected { reason },
        };
        metrics::increment_tx_outcome(client.endpoint(), outcome.label());
        Ok(outcome)
    }

    async fn submit_locked(
        &self,
        client: &dyn LedgerClient,
        cred: &Credentials,
        call: &ContractCall,
        chain_id: U256,
        guard: &mut NonceGuard<'_>,
    ) -> Result<Submission, TxError> {
        let from = guard.address();
        let mut force_refresh = self.config.force_nonce_refresh;
        let mut retries = 0u32;

        loop {
            let nonce = guard.next(client, force_refresh).await?;
            let draft = TransactionRequest::new()
                .from(from)
                .to(call.to)
                .data(call.data.clone())
                .value(call.value)
                .nonce(nonce)
                .chain_id(chain_id.low_u64());
            let quote = self.fees.quote(client, &draft).await?;
            let tx = quote.apply(draft);
            debug!("[TX] {} nonce={} from={:?} to={:?}", TxState::Built, nonce, from, call.to);

            let raw = cred.sign(&tx, chain_id.low_u64()).await?;
            debug!("[TX] {} nonce={} from={:?}", TxState::Signed, nonce, from);

            match client.send_raw_transaction(raw).await {
                Ok(tx_hash) => {
                    info!("[TX] {} {:?} nonce={} from={:?}", TxState::Submitted, tx_hash, nonce, from);
                    metrics::increment_tx_submitted(client.endpoint());
                    return Ok(Submission::Accepted(tx_hash));
                }
                Err(err) if is_stale_nonce_error(&err.message) => {
                    warn!(
                        "[TX] {} nonce={} from={:?}: {} (retry {}/{})",
                        TxState::StaleNonce,
                        nonce,
                        from,
                        err.message,
                        retries + 1,
                        self.config.max_stale_nonce_retries
                    );
                    if retries >= self.config.max_stale_nonce_retries {
                        return Err(TxError::RetriesExhausted {
                            address: from,
                            attempts: retries + 1,
                            last_nonce: nonce,
                        });
                    }
                    metrics::increment_stale_nonce_retry(client.endpoint());
                    sleep(self.config.backoff(retries)).await;
                    retries += 1;
                    force_refresh = true;
                }
                Err(err) => {
                    error!("[TX] {} nonce={} from={:?}: {}", TxState::Failed, nonce, from, err.message);
                    return Ok(Submission::Rejected(err.message));
                }
            }
        }
    }

    /// Polls for the receipt every `poll_interval` until `confirmation_timeout`.
    /// Failed lookups are retried until the deadline; the transaction is already
    /// on the node, so they end in `TimedOut { tx_hash }` rather than an error.
    pub async fn wait_for_receipt(
        &self,
        client: &dyn LedgerClient,
        tx_hash: H256,
        cancel: Option<&CancelToken>,
    ) -> Result<TxOutcome, TxError> {
        let started = Instant::now();
        let deadline = started + self.config.confirmation_timeout;
        loop {
            match client.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    metrics::record_confirmation_latency(client.endpoint(), started.elapsed());
                    if receipt.status == Some(0u64.into()) {
                        warn!("[TX] {} {:?} reverted in block {:?}", TxState::Confirmed, tx_hash, receipt.block_number);
                    } else {
                        info!("[TX] {} {:?} in block {:?}", TxState::Confirmed, tx_hash, receipt.block_number);
                    }
                    return Ok(TxOutcome::Confirmed(receipt));
                }
                Ok(None) => {}
                Err(err) => warn!("[TX] Receipt lookup for {:?} failed, polling again: {}", tx_hash, err),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "[TX] No receipt for {:?} after {:?}",
                    tx_hash, self.config.confirmation_timeout
                );
                return Ok(TxOutcome::TimedOut { tx_hash });
            }

            let pause = self.config.poll_interval.min(deadline - now);
            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = sleep(pause) => {}
                        _ = token.cancelled() => {
                            info!("[TX] Stopped waiting for {:?}", tx_hash);
                            return Err(TxError::Cancelled);
                        }
                    }
                }
                None => sleep(pause).await,
            }
        }
    }
}

enum Submission {
    Accepted(H256),
    Rejected(String),
}
