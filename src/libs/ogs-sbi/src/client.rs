//! SBI HTTP/2 Client
//!
//! HTTP/2 client implementation using hyper for SBI communication.
//! One client talks to one peer base URI (`scheme://host:port`) over a
//! single lazily established connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http2::SendRequest;
use hyper::{Method, Request, Uri};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::TlsConnector;

use crate::error::{SbiError, SbiResult};
use crate::message::{SbiRequest, SbiResponse, CONTENT_TYPE_MERGE_PATCH};
use crate::tls;
use crate::types::UriScheme;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT: u64 = 5;
/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 10;

/// SBI Client configuration
#[derive(Debug, Clone)]
pub struct SbiClientConfig {
    /// URI scheme (http or https)
    pub scheme: UriScheme,
    /// Target host (FQDN or IP)
    pub host: String,
    /// Target port
    pub port: u16,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
    /// Skip TLS verification (for testing)
    pub insecure_skip_verify: bool,
    /// CA certificate path
    pub ca_cert: Option<String>,
}

impl Default for SbiClientConfig {
    fn default() -> Self {
        Self {
            scheme: UriScheme::Http,
            host: "localhost".to_string(),
            port: 80,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            insecure_skip_verify: false,
            ca_cert: None,
        }
    }
}

impl SbiClientConfig {
    /// Create a new client configuration
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Build a configuration from a base URI such as `https://10.0.0.4:443`.
    /// A missing port falls back to the scheme default.
    pub fn from_uri(uri: &str) -> SbiResult<Self> {
        let parsed =
            url::Url::parse(uri).map_err(|e| SbiError::InvalidUri(format!("{uri}: {e}")))?;
        let scheme = UriScheme::from_str_opt(parsed.scheme())
            .ok_or_else(|| SbiError::InvalidUri(format!("{uri}: unsupported scheme")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| SbiError::InvalidUri(format!("{uri}: missing host")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = parsed.port().unwrap_or_else(|| scheme.default_port());

        Ok(Self::new(host, port).with_scheme(scheme))
    }

    /// Set the URI scheme
    pub fn with_scheme(mut self, scheme: UriScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Trust the given CA file instead of the webpki roots
    pub fn with_ca_cert(mut self, ca_cert: impl Into<String>) -> Self {
        self.ca_cert = Some(ca_cert.into());
        self
    }

    /// Disable server certificate verification
    pub fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Build the base URI
    pub fn base_uri(&self) -> String {
        if self.host.contains(':') {
            format!("{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

/// SBI Client - HTTP/2 client for SBI communication
pub struct SbiClient {
    config: SbiClientConfig,
    /// Lazily initialized connection
    connection: Arc<Mutex<Option<SendRequest<Full<Bytes>>>>>,
}

impl SbiClient {
    /// Create a new SBI client
    pub fn new(config: SbiClientConfig) -> Self {
        Self {
            config,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a client for a base URI
    pub fn from_uri(uri: &str) -> SbiResult<Self> {
        Ok(Self::new(SbiClientConfig::from_uri(uri)?))
    }

    /// Get the client configuration
    pub fn config(&self) -> &SbiClientConfig {
        &self.config
    }

    fn build_tls_connector(&self) -> SbiResult<TlsConnector> {
        let client_config = tls::build_client_config(
            self.config.ca_cert.as_deref(),
            self.config.insecure_skip_verify,
        )?;
        Ok(TlsConnector::from(Arc::new(client_config)))
    }

    async fn connect(&self) -> SbiResult<SendRequest<Full<Bytes>>> {
        let addr = if self.config.host.contains(':') {
            format!("[{}]:{}", self.config.host, self.config.port)
        } else {
            format!("{}:{}", self.config.host, self.config.port)
        };

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SbiError::Timeout)?
            .map_err(|e| SbiError::ConnectionError(format!("{addr}: {e}")))?;

        log::debug!("SBI client connected to {} ({})", addr, self.config.scheme);

        if self.config.scheme == UriScheme::Https {
            let connector = self.build_tls_connector()?;
            let server_name = ServerName::try_from(self.config.host.clone())
                .map_err(|e| SbiError::TlsError(format!("Invalid server name: {e}")))?;

            let tls_stream = tokio::time::timeout(
                self.config.connect_timeout,
                connector.connect(server_name, stream),
            )
            .await
            .map_err(|_| SbiError::Timeout)?
            .map_err(|e| SbiError::TlsError(format!("TLS handshake failed: {e}")))?;

            let (sender, conn) = hyper::client::conn::http2::handshake(
                hyper_util::rt::TokioExecutor::new(),
                TokioIo::new(tls_stream),
            )
            .await
            .map_err(|e| SbiError::ConnectionError(e.to_string()))?;

            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    log::warn!("HTTP/2 TLS connection error: {e}");
                }
            });

            Ok(sender)
        } else {
            let (sender, conn) = hyper::client::conn::http2::handshake(
                hyper_util::rt::TokioExecutor::new(),
                TokioIo::new(stream),
            )
            .await
            .map_err(|e| SbiError::ConnectionError(e.to_string()))?;

            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    log::warn!("HTTP/2 connection error: {e}");
                }
            });

            Ok(sender)
        }
    }

    /// Get the live connection or establish a new one
    async fn get_connection(&self) -> SbiResult<SendRequest<Full<Bytes>>> {
        let mut conn_guard = self.connection.lock().await;

        if let Some(sender) = conn_guard.as_ref() {
            if sender.is_ready() {
                return Ok(sender.clone());
            }
        }

        let sender = self.connect().await?;
        *conn_guard = Some(sender.clone());
        Ok(sender)
    }

    /// Send an SBI request and receive a response
    pub async fn send_request(&self, request: SbiRequest) -> SbiResult<SbiResponse> {
        let uri_str = if request.header.uri.starts_with("http") {
            request.header.uri.clone()
        } else {
            format!("{}{}", self.config.base_uri(), request.header.uri)
        };

        let uri_with_params = if request.http.params.is_empty() {
            uri_str
        } else {
            let mut params: Vec<(&String, &String)> = request.http.params.iter().collect();
            params.sort();
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            format!("{uri_str}?{query}")
        };

        let uri: Uri = uri_with_params
            .parse()
            .map_err(|e| SbiError::InvalidUri(format!("{uri_with_params}: {e}")))?;

        let method = match request.header.method.to_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "OPTIONS" => Method::OPTIONS,
            other => return Err(SbiError::InvalidMethod(other.to_string())),
        };

        let body = request
            .http
            .content
            .map(|c| Full::new(Bytes::from(c)))
            .unwrap_or_else(|| Full::new(Bytes::new()));

        let mut req_builder = Request::builder().method(method.clone()).uri(uri);
        for (key, value) in &request.http.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        let http_request = req_builder
            .body(body)
            .map_err(|e| SbiError::ClientError(e.to_string()))?;

        log::debug!("SBI client {} {}", method, uri_with_params);

        let mut sender = self.get_connection().await?;
        let response = tokio::time::timeout(
            self.config.request_timeout,
            sender.send_request(http_request),
        )
        .await
        .map_err(|_| SbiError::Timeout)?
        .map_err(|e| SbiError::HyperError(e.to_string()))?;

        self.convert_response(response).await
    }

    async fn convert_response(&self, response: hyper::Response<Incoming>) -> SbiResult<SbiResponse> {
        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string(), v.to_string());
            }
        }

        let body_bytes = tokio::time::timeout(self.config.request_timeout, response.into_body().collect())
            .await
            .map_err(|_| SbiError::Timeout)?
            .map_err(|e| SbiError::InvalidResponse(e.to_string()))?
            .to_bytes();

        let mut sbi_response = SbiResponse::with_status(status);
        sbi_response.http.headers = headers;
        if !body_bytes.is_empty() {
            sbi_response.http.content = Some(String::from_utf8_lossy(&body_bytes).to_string());
        }

        Ok(sbi_response)
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> SbiResult<SbiResponse> {
        self.send_request(SbiRequest::get(path)).await
    }

    /// Send a POST request with JSON body
    pub async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> SbiResult<SbiResponse> {
        self.send_request(SbiRequest::post(path).with_json_body(body)?).await
    }

    /// Send a PUT request with JSON body
    pub async fn put_json<T: serde::Serialize>(&self, path: &str, body: &T) -> SbiResult<SbiResponse> {
        self.send_request(SbiRequest::put(path).with_json_body(body)?).await
    }

    /// Send a PATCH request with a JSON merge-patch body
    pub async fn patch_json<T: serde::Serialize>(&self, path: &str, body: &T) -> SbiResult<SbiResponse> {
        let request = SbiRequest::patch(path).with_typed_json_body(body, CONTENT_TYPE_MERGE_PATCH)?;
        self.send_request(request).await
    }

    /// Send a DELETE request
    pub async fn delete(&self, path: &str) -> SbiResult<SbiResponse> {
        self.send_request(SbiRequest::delete(path)).await
    }

    /// Drop the cached connection
    pub async fn close(&self) {
        *self.connection.lock().await = None;
    }
}

/// Split an absolute URI into its base (`scheme://host:port`) so that a
/// client can be cached per peer while requests keep the full URI.
pub fn base_uri_of(uri: &str) -> SbiResult<String> {
    Ok(SbiClientConfig::from_uri(uri)?.base_uri())
}
