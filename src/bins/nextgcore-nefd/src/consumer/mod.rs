//! NEF Peer Consumers
//!
//! Clients for the NRF (registration and discovery), the PCF (policy
//! authorization) and the UDR (application data). Each peer family is a
//! trait so processors can be driven by in-memory peers in tests.

mod nrf;
mod pcf;
mod udr;

use std::sync::Arc;
use std::time::Duration;

use ogs_sbi::{ProblemDetails, SbiClient, SbiClientCache, SbiError, SbiRequest, SbiResponse};
use tokio::sync::OnceCell;

use crate::config::NefConfig;
use crate::context::NefContext;

pub use nrf::{HttpNrfService, NrfService, RETRY_REGISTER_NRF_DURATION};
pub use pcf::{HttpPcfService, PcfService};
pub use udr::{HttpUdrService, UdrService};

/// Per-call bound on peer requests
pub const PEER_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Non-success outcome of a peer call
#[derive(Debug, Clone, PartialEq)]
pub struct PeerError {
    pub status: u16,
    pub problem: ProblemDetails,
}

impl PeerError {
    pub fn new(status: u16, problem: ProblemDetails) -> Self {
        Self { status, problem }
    }

    /// Non-2xx answer; a body that is not a problem object is replaced by
    /// a synthetic one carrying the status
    pub fn from_response(response: &SbiResponse) -> Self {
        let problem = response
            .json_body::<ProblemDetails>()
            .ok()
            .filter(|p| p.status.is_some() || p.detail.is_some() || p.cause.is_some())
            .unwrap_or_else(|| {
                ProblemDetails::with_status(i32::from(response.status))
                    .with_detail(format!("Peer answered with status {}", response.status))
            });
        Self::new(response.status, problem)
    }

    /// No usable answer at all
    pub fn system_failure(detail: impl Into<String>) -> Self {
        Self::new(500, ProblemDetails::system_failure(detail))
    }

    /// 2xx answer whose body could not be decoded
    pub fn invalid_body(err: serde_json::Error) -> Self {
        Self::system_failure(format!("Invalid peer response body: {}", err))
    }
}

impl From<SbiError> for PeerError {
    fn from(err: SbiError) -> Self {
        log::warn!("Peer request failed: {}", err);
        Self::system_failure(err.to_string())
    }
}

impl std::fmt::Display for PeerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "status {} ({})",
            self.status,
            self.problem.detail.as_deref().unwrap_or("no detail")
        )
    }
}

impl std::error::Error for PeerError {}

pub type PeerResult<T> = Result<T, PeerError>;

/// Decode a 2xx answer, or turn the answer into a [`PeerError`]
fn decode_body<T: for<'de> serde::Deserialize<'de>>(response: &SbiResponse) -> PeerResult<T> {
    if !response.is_success() {
        return Err(PeerError::from_response(response));
    }
    response.json_body().map_err(PeerError::invalid_body)
}

/// Accept only the listed statuses
fn expect_status(response: &SbiResponse, accepted: &[u16]) -> PeerResult<()> {
    if accepted.contains(&response.status) {
        Ok(())
    } else {
        Err(PeerError::from_response(response))
    }
}

/// Base URI of one peer family, resolved once on first use
pub struct PeerUri {
    cell: OnceCell<String>,
    clients: SbiClientCache,
}

impl PeerUri {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            clients: SbiClientCache::new().with_request_timeout(PEER_REQUEST_TIMEOUT),
        }
    }

    /// Already known base URI, e.g. from configuration
    pub fn with_uri(uri: impl Into<String>) -> Self {
        let peer = Self::new();
        // Fresh cell, cannot be initialised yet
        let _ = peer.cell.set(uri.into());
        peer
    }

    /// Resolve with `discover` unless resolved before; concurrent callers
    /// share a single discovery
    pub async fn get_or_discover<F, Fut>(&self, discover: F) -> PeerResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = PeerResult<String>>,
    {
        self.cell.get_or_try_init(discover).await.cloned()
    }

    pub fn get(&self) -> Option<&str> {
        self.cell.get().map(String::as_str)
    }

    /// Cached client for `base_uri`
    pub async fn client(&self, base_uri: &str) -> PeerResult<Arc<SbiClient>> {
        Ok(self.clients.get_client(base_uri).await?)
    }

    /// Send `request`, whose URI is a path below the base URI
    pub async fn send(&self, base_uri: &str, mut request: SbiRequest) -> PeerResult<SbiResponse> {
        let client = self.client(base_uri).await?;
        let uri = format!("{}{}", base_uri, request.header.uri);
        request.header.uri = uri;
        Ok(client.send_request(request).await?)
    }
}

impl Default for PeerUri {
    fn default() -> Self {
        Self::new()
    }
}

/// All peer consumers, shared by the processor
#[derive(Clone)]
pub struct Consumer {
    pub nrf: Arc<dyn NrfService>,
    pub pcf: Arc<dyn PcfService>,
    pub udr: Arc<dyn UdrService>,
}

impl Consumer {
    pub fn new(nrf: Arc<dyn NrfService>, pcf: Arc<dyn PcfService>, udr: Arc<dyn UdrService>) -> Self {
        Self { nrf, pcf, udr }
    }

    /// HTTP consumers; PCF and UDR discover their URIs through the NRF
    pub fn from_config(config: Arc<NefConfig>, context: Arc<NefContext>) -> Self {
        let nrf: Arc<dyn NrfService> = Arc::new(HttpNrfService::new(config, context));
        let pcf = Arc::new(HttpPcfService::new(nrf.clone()));
        let udr = Arc::new(HttpUdrService::new(nrf.clone()));
        Self::new(nrf, pcf, udr)
    }
}
