//! NextGCore SBI (Service Based Interface) Library
//!
//! HTTP/2 client and server plumbing shared by the NEF daemon.
//!
//! # Features
//!
//! - HTTP/2 client and server using hyper (h2c or TLS via rustls)
//! - Transport neutral request/response values and RFC 7807 problems
//! - NRF profile/search models and service URI derivation
//! - Per-peer client cache keyed by base URI
//!
//! # Example
//!
//! ```rust,no_run
//! use ogs_sbi::{SbiClient, SbiClientConfig};
//!
//! async fn example() {
//!     let client = SbiClient::new(SbiClientConfig::new("127.0.0.10", 8000));
//!     let response = client.get("/nnrf-disc/v1/nf-instances").await;
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`] - Service names, NF types, URI schemes
//! - [`message`] - SBI message structures (request, response, problem)
//! - [`client`] - HTTP/2 client implementation
//! - [`server`] - HTTP/2 server implementation
//! - [`context`] - Client cache keyed by peer base URI
//! - [`nnrf`] - NRF management/discovery models
//! - [`tls`] - Certificate loading and rustls configs
//! - [`error`] - Error types

pub mod context;
pub mod error;
pub mod message;
pub mod nnrf;
pub mod tls;
pub mod types;

pub mod client;
pub mod server;

// Re-export commonly used types
pub use client::{base_uri_of, SbiClient, SbiClientConfig};
pub use context::SbiClientCache;
pub use error::{SbiError, SbiResult};
pub use message::{
    decode_path_segment, encode_path_segment, InvalidParam, ProblemDetails, SbiHeader,
    SbiHttpMessage, SbiRequest, SbiResponse, CONTENT_TYPE_JSON, CONTENT_TYPE_MERGE_PATCH,
    CONTENT_TYPE_PROBLEM,
};
pub use nnrf::{
    search_nf_service_uri, select_service_uri, IpEndPoint, NfProfile, NfService,
    NfServiceStatus, NfServiceVersion, NfStatus, SearchResult,
};
pub use server::{
    send_bad_request, send_error, send_method_not_allowed, send_not_found, send_problem,
    SbiRequestHandler, SbiServer, SbiServerConfig,
};
pub use types::{NfType, SbiServiceType, UriScheme};
