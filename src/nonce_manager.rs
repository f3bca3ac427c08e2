// src/nonce_manager.rs
//
// Per-address nonce cache. Allocation, fee computation and submission for one
// sender happen while that sender's slot is locked; different senders never
// wait on each other.

use dashmap::DashMap;
use ethers::types::{Address, U256};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::ClientError;
use crate::ledger_client::LedgerClient;
use crate::metrics;

/// Next nonce to hand out, `None` until fetched from the node.
type Slot = Arc<Mutex<Option<U256>>>;

#[derive(Default)]
pub struct NonceManager {
    slots: DashMap<Address, Slot>,
    fetches: AtomicU64,
}

/// Exclusive access to one sender's nonce. Dropping it releases the sender.
pub struct NonceGuard<'a> {
    manager: &'a NonceManager,
    address: Address,
    next: OwnedMutexGuard<Option<U256>>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `address`.
    pub async fn lock(&self, address: Address) -> NonceGuard<'_> {
        let slot = Arc::clone(self.slots.entry(address).or_default().value());
        NonceGuard {
            manager: self,
            address,
            next: slot.lock_owned().await,
        }
    }

    /// Returns the next nonce for `address` and advances the cache by one.
    /// Fetches the pending transaction count when nothing is cached or
    /// `force_refresh` is set.
    pub async fn get_and_increment(
        &self,
        client: &dyn LedgerClient,
        address: Address,
        force_refresh: bool,
    ) -> Result<U256, ClientError> {
        self.lock(address).await.next(client, force_refresh).await
    }

    /// Node fetches so far, across all addresses.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Drops every cached nonce.
    pub async fn clear(&self) {
        let slots: Vec<Slot> = self.slots.iter().map(|e| Arc::clone(e.value())).collect();
        for slot in slots {
            *slot.lock().await = None;
        }
    }
}

impl NonceGuard<'_> {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Cached next nonce, without touching the node.
    pub fn peek(&self) -> Option<U256> {
        *self.next
    }

    pub async fn next(&mut self, client: &dyn LedgerClient, force_refresh: bool) -> Result<U256, ClientError> {
        let nonce = match *self.next {
            Some(cached) if !force_refresh => cached,
            _ => {
                let fetched = client.pending_transaction_count(self.address).await?;
                self.manager.fetches.fetch_add(1, Ordering::Relaxed);
                metrics::increment_nonce_fetch(client.endpoint());
                debug!("[NONCE] Fetched baseline {} for {:?}", fetched, self.address);
                fetched
            }
        };
        *self.next = Some(nonce + U256::one());
        Ok(nonce)
    }

    /// Forgets the cached nonce so the next allocation refetches it. Used
    /// when an allocated nonce never reached the node.
    pub fn invalidate(&mut self) {
        if self.next.take().is_some() {
            warn!("[NONCE] Invalidated cached nonce for {:?}", self.address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use std::time::Duration;

    fn sender() -> Address {
        Address::from_low_u64_be(0xa11ce)
    }

    #[tokio::test]
    async fn test_first_call_fetches_once() {
        let client = ScriptedClient::new("mock");
        client.set_transaction_count(sender(), 7);
        let nonces = NonceManager::new();

        assert_eq!(nonces.get_and_increment(&client, sender(), false).await.unwrap(), U256::from(7));
        assert_eq!(client.counts().nonce_fetches, 1);

        assert_eq!(nonces.get_and_increment(&client, sender(), false).await.unwrap(), U256::from(8));
        assert_eq!(client.counts().nonce_fetches, 1);
        assert_eq!(nonces.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_refetches() {
        let client = ScriptedClient::new("mock");
        client.set_transaction_count(sender(), 3);
        let nonces = NonceManager::new();

        nonces.get_and_increment(&client, sender(), false).await.unwrap();
        nonces.get_and_increment(&client, sender(), false).await.unwrap();
        client.set_transaction_count(sender(), 10);

        let forced = nonces.get_and_increment(&client, sender(), true).await.unwrap();
        assert_eq!(forced, U256::from(10));
        assert_eq!(client.counts().nonce_fetches, 2);
    }

    #[tokio::test]
    async fn test_invalidate_triggers_refetch() {
        let client = ScriptedClient::new("mock");
        let nonces = NonceManager::new();
        {
            let mut guard = nonces.lock(sender()).await;
            guard.next(&client, false).await.unwrap();
            assert_eq!(guard.peek(), Some(U256::one()));
            guard.invalidate();
        }
        nonces.get_and_increment(&client, sender(), false).await.unwrap();
        assert_eq!(client.counts().nonce_fetches, 2);
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_unique() {
        let client = Arc::new(ScriptedClient::new("mock"));
        let nonces = Arc::new(NonceManager::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let client = Arc::clone(&client);
            let nonces = Arc::clone(&nonces);
            handles.push(tokio::spawn(async move {
                nonces.get_and_increment(client.as_ref(), sender(), false).await.unwrap()
            }));
        }
        let mut allocated = Vec::new();
        for handle in handles {
            allocated.push(handle.await.unwrap().as_u64());
        }
        allocated.sort_unstable();
        assert_eq!(allocated, (0..16).collect::<Vec<u64>>());
        assert_eq!(client.counts().nonce_fetches, 1);
    }

    #[tokio::test]
    async fn test_other_sender_not_blocked() {
        let nonces = NonceManager::new();
        let _held = nonces.lock(sender()).await;
        let other = tokio::time::timeout(Duration::from_millis(100), nonces.lock(Address::from_low_u64_be(0xb0b))).await;
        assert!(other.is_ok());
    }
}
