// src/connection_pool.rs
//
// Endpoint -> shared client. Owned by a `RuntimeContext`; there is no global
// pool, so two contexts never share connections by accident.

use dashmap::DashMap;
use ethers::prelude::{Http, Provider};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ConfigurationError;
use crate::ledger_client::{LedgerClient, MiddlewareClient};

/// Builds a client for an endpoint that is not pooled yet.
pub type Connector = Arc<dyn Fn(&str) -> Result<Arc<dyn LedgerClient>, ConfigurationError> + Send + Sync>;

const HTTP_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Connects over HTTP with an ethers `Provider`.
pub fn http_connector() -> Connector {
    Arc::new(|endpoint: &str| {
        let provider = Provider::<Http>::try_from(endpoint).map_err(|e| ConfigurationError::Connection {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client: Arc<dyn LedgerClient> =
            Arc::new(MiddlewareClient::new(provider.interval(HTTP_POLL_INTERVAL), endpoint));
        Ok(client)
    })
}

pub struct ConnectionPool {
    clients: DashMap<String, Arc<dyn LedgerClient>>,
    connector: Connector,
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::with_connector(http_connector())
    }

    pub fn with_connector(connector: Connector) -> Self {
        Self {
            clients: DashMap::new(),
            connector,
        }
    }

    /// Returns the pooled client for `endpoint`, connecting on first use.
    pub fn get(&self, endpoint: &str) -> Result<Arc<dyn LedgerClient>, ConfigurationError> {
        let endpoint = endpoint.trim();
        if let Some(client) = self.clients.get(endpoint) {
            debug!("[POOL] Reusing client for {}", endpoint);
            return Ok(Arc::clone(client.value()));
        }

        let client = (self.connector)(endpoint)?;
        let pooled = self
            .clients
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                info!("[POOL] Connected to {}", endpoint);
                client
            })
            .value()
            .clone();
        Ok(pooled)
    }

    /// Registers an already built client, replacing any pooled one.
    pub fn insert(&self, endpoint: &str, client: Arc<dyn LedgerClient>) {
        self.clients.insert(endpoint.trim().to_string(), client);
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
