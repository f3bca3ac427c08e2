//! Integration tests for the transaction lifecycle through contract handles.
//!
//! Tests cover:
//! - Nonce serialization for concurrent sends from one address
//! - Stale-nonce retry versus plain rejection
//! - Confirmation timeout and cancellation
//! - Settings-driven fee policy selection

use abi_wrapper_sdk::connection_pool::ConnectionPool;
use abi_wrapper_sdk::errors::TxError;
use abi_wrapper_sdk::ledger_client::LedgerClient;
use abi_wrapper_sdk::runtime::{ContractHandle, WrapperContract};
use abi_wrapper_sdk::settings::Settings;
use abi_wrapper_sdk::testing::ScriptedClient;
use abi_wrapper_sdk::transaction::{CancelHandle, TxConfig};
use abi_wrapper_sdk::{Credentials, RuntimeContext, TxOutcome};
use ethers::abi::Tokenizable;
use ethers::types::{Address, U256};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const ABI: &str = r#"[{"type": "function", "name": "transfer", "stateMutability": "nonpayable",
    "inputs": [{"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}],
    "outputs": [{"name": "", "type": "bool"}]}]"#;
const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn fast_config() -> TxConfig {
    TxConfig::default()
        .with_confirmation_timeout(Duration::from_millis(150))
        .with_poll_interval(Duration::from_millis(5))
        .with_retry_backoff(Duration::from_millis(1), Duration::from_millis(4))
}

fn handle(client: &Arc<ScriptedClient>, context: RuntimeContext) -> (RuntimeContext, ContractHandle) {
    context
        .pool()
        .insert("mock", Arc::clone(client) as Arc<dyn LedgerClient>);
    let contract = WrapperContract::new(
        "Token",
        context.runtime("mock").unwrap(),
        ABI,
        Some("0x0000000000000000000000000000000000000abc"),
    )
    .unwrap();
    let handle = contract.bound().unwrap().clone();
    (context, handle)
}

fn transfer_args() -> Vec<ethers::abi::Token> {
    vec![Address::from_low_u64_be(0xb0b).into_token(), U256::from(1u64).into_token()]
}

#[tokio::test]
async fn test_concurrent_sends_get_distinct_nonces() {
    let client = Arc::new(ScriptedClient::new("mock"));
    let cred = Credentials::from_private_key(DEV_KEY).unwrap();
    client.set_transaction_count(cred.address(), 40);
    let (_context, token) = handle(&client, RuntimeContext::new(ConnectionPool::new()).with_tx_config(fast_config()));

    let sends = (0..8).map(|_| token.send(&cred, TRANSFER, transfer_args(), U256::zero()));
    let outcomes = join_all(sends).await;

    assert!(outcomes.iter().all(|o| matches!(o, Ok(TxOutcome::Confirmed(_)))));
    let hashes: HashSet<_> = outcomes
        .iter()
        .filter_map(|o| o.as_ref().ok().and_then(TxOutcome::tx_hash))
        .collect();
    assert_eq!(hashes.len(), 8);
    assert_eq!(client.counts().nonce_fetches, 1);
}

#[tokio::test]
async fn test_stale_nonce_then_success() {
    let client = Arc::new(ScriptedClient::new("mock"));
    let cred = Credentials::from_private_key(DEV_KEY).unwrap();
    client.fail_next_submission("err: nonce too low: next nonce 3, tx nonce 2");
    let (_context, token) = handle(&client, RuntimeContext::new(ConnectionPool::new()).with_tx_config(fast_config()));

    let outcome = token.send(&cred, TRANSFER, transfer_args(), U256::zero()).await.unwrap();
    assert!(outcome.is_confirmed());
    assert_eq!(client.counts().nonce_fetches, 2);
    assert_eq!(client.counts().submissions, 2);
}

#[tokio::test]
async fn test_rejection_then_next_send_refetches() {
    let client = Arc::new(ScriptedClient::new("mock"));
    let cred = Credentials::from_private_key(DEV_KEY).unwrap();
    client.fail_next_submission("insufficient funds for gas * price + value");
    let (_context, token) = handle(&client, RuntimeContext::new(ConnectionPool::new()).with_tx_config(fast_config()));

    let rejected = token.send(&cred, TRANSFER, transfer_args(), U256::zero()).await.unwrap();
    assert!(matches!(rejected, TxOutcome::Rejected { .. }));
    assert_eq!(client.counts().nonce_fetches, 1);

    let confirmed = token.send(&cred, TRANSFER, transfer_args(), U256::zero()).await.unwrap();
    assert!(confirmed.is_confirmed());
    assert_eq!(client.counts().nonce_fetches, 2);
}

#[tokio::test]
async fn test_unconfirmed_times_out() {
    let client = Arc::new(ScriptedClient::new("mock"));
    client.set_confirm(false);
    let cred = Credentials::from_private_key(DEV_KEY).unwrap();
    let (_context, token) = handle(&client, RuntimeContext::new(ConnectionPool::new()).with_tx_config(fast_config()));

    let outcome = token.send(&cred, TRANSFER, transfer_args(), U256::zero()).await.unwrap();
    match outcome {
        TxOutcome::TimedOut { tx_hash } => {
            assert_eq!(client.submitted().len(), 1);
            assert_ne!(tx_hash, Default::default());
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_while_waiting() {
    let client = Arc::new(ScriptedClient::new("mock"));
    client.set_confirm(false);
    let cred = Credentials::from_private_key(DEV_KEY).unwrap();
    let config = fast_config().with_confirmation_timeout(Duration::from_secs(30));
    let (_context, token) = handle(&client, RuntimeContext::new(ConnectionPool::new()).with_tx_config(config));

    let (cancel, token_rx) = CancelHandle::new();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
    });
    let result = token
        .send_cancellable(&cred, TRANSFER, transfer_args(), U256::zero(), &token_rx)
        .await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(TxError::Cancelled)));
    assert_eq!(client.submitted().len(), 1);
}

#[tokio::test]
async fn test_legacy_policy_from_settings() {
    let client = Arc::new(ScriptedClient::new("mock"));
    client.set_block_gas(U256::from(2_000_000u64), U256::from(15_000_000u64));
    let cred = Credentials::from_private_key(DEV_KEY).unwrap();

    let mut settings = Settings::default();
    settings.fees.policy = abi_wrapper_sdk::fee_strategy::FeePolicyKind::Legacy;
    let context = RuntimeContext::from_settings(&settings).with_tx_config(fast_config());
    let (_context, token) = handle(&client, context);

    token.send(&cred, TRANSFER, transfer_args(), U256::zero()).await.unwrap();
    assert_eq!(client.counts().block_fetches, 1);
    assert_eq!(client.counts().gas_estimates, 0);
}
