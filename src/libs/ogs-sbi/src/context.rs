//! SBI Client Cache
//!
//! Process-lifetime cache of [`SbiClient`] handles keyed by peer base URI.
//! Entries are created lazily and never evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::client::{SbiClient, SbiClientConfig};
use crate::error::SbiResult;

/// Cache of SBI clients for one peer API family
#[derive(Default)]
pub struct SbiClientCache {
    clients: RwLock<HashMap<String, Arc<SbiClient>>>,
    request_timeout: Option<Duration>,
    ca_cert: Option<String>,
    insecure_skip_verify: bool,
}

impl SbiClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request timeout applied to every client created by this cache
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// TLS trust settings applied to every client created by this cache
    pub fn with_tls(mut self, ca_cert: Option<String>, insecure_skip_verify: bool) -> Self {
        self.ca_cert = ca_cert;
        self.insecure_skip_verify = insecure_skip_verify;
        self
    }

    /// Get the client for `base_uri`, constructing it on first use.
    ///
    /// The write path re-checks the map so that two racing callers end up
    /// sharing a single handle.
    pub async fn get_client(&self, base_uri: &str) -> SbiResult<Arc<SbiClient>> {
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(base_uri) {
                return Ok(client.clone());
            }
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(base_uri) {
            return Ok(client.clone());
        }

        let mut config = SbiClientConfig::from_uri(base_uri)?
            .with_insecure_skip_verify(self.insecure_skip_verify);
        if let Some(timeout) = self.request_timeout {
            config = config.with_request_timeout(timeout);
        }
        if let Some(ca) = &self.ca_cert {
            config = config.with_ca_cert(ca.clone());
        }

        log::debug!("SBI client created for [{}]", base_uri);
        let client = Arc::new(SbiClient::new(config));
        clients.insert(base_uri.to_string(), client.clone());
        Ok(client)
    }

    /// Number of cached clients
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
