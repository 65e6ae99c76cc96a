//! SBI HTTP/2 Server
//!
//! HTTP/2 listener (h2c, or TLS when a certificate and key are configured)
//! that hands every request to an async [`SbiRequestHandler`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http2;
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio_rustls::TlsAcceptor;

use crate::error::{SbiError, SbiResult};
use crate::message::{ProblemDetails, SbiHeader, SbiHttpMessage, SbiRequest, SbiResponse, CONTENT_TYPE_PROBLEM};
use crate::tls;
use crate::types::UriScheme;

/// Server configuration
#[derive(Debug, Clone)]
pub struct SbiServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// URI scheme
    pub scheme: UriScheme,
    /// TLS private key path
    pub private_key: Option<String>,
    /// TLS certificate path
    pub cert: Option<String>,
}

impl Default for SbiServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 5], 8000)),
            scheme: UriScheme::Http,
            private_key: None,
            cert: None,
        }
    }
}

impl SbiServerConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Default::default()
        }
    }

    /// Create configuration with host and port
    pub fn with_host_port(host: impl AsRef<str>, port: u16) -> SbiResult<Self> {
        let host = host.as_ref();
        let addr: SocketAddr = if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        }
        .parse()
        .map_err(|e| SbiError::InvalidUri(format!("Invalid address: {}", e)))?;
        Ok(Self::new(addr))
    }

    /// Enable HTTPS with certificates
    pub fn with_tls(mut self, private_key: impl Into<String>, cert: impl Into<String>) -> Self {
        self.scheme = UriScheme::Https;
        self.private_key = Some(private_key.into());
        self.cert = Some(cert.into());
        self
    }
}

/// Request handler trait
pub trait SbiRequestHandler: Send + Sync + 'static {
    /// Handle an incoming SBI request
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>>;
}

/// Function-based request handler
impl<F, Fut> SbiRequestHandler for F
where
    F: Fn(SbiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SbiResponse> + Send + 'static,
{
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>> {
        Box::pin(self(request))
    }
}

/// Hyper service wrapper
struct SbiService<H: SbiRequestHandler> {
    handler: Arc<H>,
}

impl<H: SbiRequestHandler> Clone for SbiService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<H: SbiRequestHandler> Service<Request<Incoming>> for SbiService<H> {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let handler = self.handler.clone();

        Box::pin(async move {
            let response = match convert_request(req).await {
                Ok(sbi_request) => handler.handle(sbi_request).await,
                Err(e) => send_bad_request(&e.to_string(), None),
            };
            Ok(convert_response(response))
        })
    }
}

/// Convert hyper request to SbiRequest
async fn convert_request(req: Request<Incoming>) -> SbiResult<SbiRequest> {
    let method = req.method().to_string();
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut http = SbiHttpMessage::new();
    for (key, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            http.set_header(key.to_string(), v.to_string());
        }
    }

    if let Some(query) = req.uri().query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            http.set_param(key.into_owned(), value.into_owned());
        }
    }

    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| SbiError::HyperError(format!("Failed to read body: {}", e)))?
        .to_bytes();
    if !body.is_empty() {
        let content = String::from_utf8(body.to_vec())
            .map_err(|_| SbiError::InvalidResponse("Request body is not UTF-8".to_string()))?;
        http.set_content(content);
    }

    log::debug!("[{}] {}", method, uri);

    Ok(SbiRequest {
        header: SbiHeader::with_method_uri(method, uri),
        http,
    })
}

/// Convert SbiResponse to hyper response
fn convert_response(sbi_response: SbiResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(sbi_response.status);

    for (key, value) in &sbi_response.http.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    let body = sbi_response
        .http
        .content
        .map(|c| Full::new(Bytes::from(c)))
        .unwrap_or_else(|| Full::new(Bytes::new()));

    builder.body(body).unwrap_or_else(|e| {
        log::error!("Invalid response dropped: {}", e);
        let mut response = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

async fn serve_connection<S, H>(io: S, service: SbiService<H>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    H: SbiRequestHandler,
{
    if let Err(e) = http2::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(io), service)
        .await
    {
        log::debug!("HTTP/2 connection error: {}", e);
    }
}

/// Server state
enum ServerState {
    Stopped,
    Running(oneshot::Sender<()>, SocketAddr),
}

/// SBI Server - HTTP/2 server for SBI communication
pub struct SbiServer {
    config: SbiServerConfig,
    state: Arc<Mutex<ServerState>>,
}

impl SbiServer {
    pub fn new(config: SbiServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(ServerState::Stopped)),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &SbiServerConfig {
        &self.config
    }

    /// Start the server with a request handler
    pub async fn start<H: SbiRequestHandler>(&self, handler: H) -> SbiResult<()> {
        let mut state = self.state.lock().await;

        if matches!(*state, ServerState::Running(..)) {
            return Err(SbiError::ServerError("Server already running".to_string()));
        }

        let acceptor = match self.config.scheme {
            UriScheme::Https => {
                let (Some(cert), Some(key)) = (&self.config.cert, &self.config.private_key) else {
                    return Err(SbiError::TlsError(
                        "https requires a certificate and a private key".to_string(),
                    ));
                };
                Some(TlsAcceptor::from(Arc::new(tls::build_server_config(cert, key)?)))
            }
            UriScheme::Http => None,
        };

        let listener = TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| SbiError::ServerError(format!("Failed to bind: {}", e)))?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        *state = ServerState::Running(shutdown_tx, local_addr);
        drop(state);

        log::info!("SBI server listening on {}://{}", self.config.scheme, local_addr);

        let handler = Arc::new(handler);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let (stream, peer) = match result {
                            Ok(accepted) => accepted,
                            Err(e) => {
                                log::warn!("Accept error: {}", e);
                                continue;
                            }
                        };
                        let service = SbiService {
                            handler: handler.clone(),
                        };

                        match &acceptor {
                            Some(acceptor) => {
                                let acceptor = acceptor.clone();
                                tokio::spawn(async move {
                                    match acceptor.accept(stream).await {
                                        Ok(tls_stream) => serve_connection(tls_stream, service).await,
                                        Err(e) => log::warn!("TLS handshake with {} failed: {}", peer, e),
                                    }
                                });
                            }
                            None => {
                                tokio::spawn(serve_connection(stream, service));
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        log::info!("SBI server on {} stopped", local_addr);
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop the server
    pub async fn stop(&self) -> SbiResult<()> {
        let mut state = self.state.lock().await;

        if let ServerState::Running(shutdown_tx, _) =
            std::mem::replace(&mut *state, ServerState::Stopped)
        {
            let _ = shutdown_tx.send(());
        }

        Ok(())
    }

    /// Check if the server is running
    pub async fn is_running(&self) -> bool {
        let state = self.state.lock().await;
        matches!(*state, ServerState::Running(..))
    }

    /// Address actually bound, useful when the configured port is 0
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state.lock().await {
            ServerState::Running(_, addr) => Some(*addr),
            ServerState::Stopped => None,
        }
    }
}

/// Build a problem response from an existing problem object
pub fn send_problem(problem: &ProblemDetails) -> SbiResponse {
    let status = problem.status_code();
    match serde_json::to_string(problem) {
        Ok(json) => SbiResponse::with_status(status).with_body(json, CONTENT_TYPE_PROBLEM),
        Err(_) => SbiResponse::with_status(status),
    }
}

/// Helper function to send an error response
pub fn send_error(status: u16, title: &str, detail: &str, cause: Option<&str>) -> SbiResponse {
    let problem = ProblemDetails::with_status(status as i32)
        .with_title(title)
        .with_detail(detail);

    let problem = match cause {
        Some(c) => problem.with_cause(c),
        None => problem,
    };

    send_problem(&problem)
}

/// Send a 400 Bad Request error response
pub fn send_bad_request(detail: &str, cause: Option<&str>) -> SbiResponse {
    send_error(400, "Bad Request", detail, cause)
}

/// Send a 404 Not Found error response
pub fn send_not_found(detail: &str, cause: Option<&str>) -> SbiResponse {
    send_error(404, "Not Found", detail, cause)
}

/// Send a 405 Method Not Allowed error response
pub fn send_method_not_allowed(method: &str, resource: &str) -> SbiResponse {
    send_error(
        405,
        "Method Not Allowed",
        &format!("Method {} not allowed for resource {}", method, resource),
        Some("METHOD_NOT_ALLOWED"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SbiClient, SbiClientConfig};

    #[test]
    fn test_server_config() {
        let config = SbiServerConfig::with_host_port("::1", 8080).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert!(config.addr.is_ipv6());

        let config = config.with_tls("nef.key", "nef.pem");
        assert_eq!(config.scheme, UriScheme::Https);
        assert!(SbiServerConfig::with_host_port("not an ip", 80).is_err());
    }

    #[test]
    fn test_send_error() {
        let response = send_not_found("Given AF is not existed", Some("DATA_NOT_FOUND"));
        assert_eq!(response.status, 404);
        assert_eq!(
            response.http.get_header("content-type").map(String::as_str),
            Some(CONTENT_TYPE_PROBLEM)
        );
        let problem: ProblemDetails = response.json_body().unwrap();
        assert_eq!(problem.detail.as_deref(), Some("Given AF is not existed"));
    }

    #[tokio::test]
    async fn test_https_without_cert_rejected() {
        let mut config = SbiServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.scheme = UriScheme::Https;
        let server = SbiServer::new(config);

        let result = server
            .start(|_req: SbiRequest| async { SbiResponse::with_status(204) })
            .await;
        assert!(matches!(result, Err(SbiError::TlsError(_))));
        assert!(!server.is_running().await);
    }

    #[tokio::test]
    async fn test_server_round_trip() {
        let server = SbiServer::new(SbiServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0))));
        server
            .start(|req: SbiRequest| async move {
                let ids = req.http.get_param("application-ids").cloned().unwrap_or_default();
                SbiResponse::with_status(200)
                    .with_json_body(&serde_json::json!({
                        "method": req.header.method,
                        "resource": req.header.resource,
                        "ids": ids,
                    }))
                    .unwrap_or_else(|_| SbiResponse::with_status(500))
            })
            .await
            .unwrap();
        assert!(server.is_running().await);

        let addr = server.local_addr().await.unwrap();
        let client = SbiClient::new(SbiClientConfig::new("127.0.0.1", addr.port()));
        let request = SbiRequest::get("/nnef-pfdmanagement/v1/applications")
            .with_param("application-ids", "app1,app 2");
        let response = client.send_request(request).await.unwrap();

        assert_eq!(response.status, 200);
        let body: serde_json::Value = response.json_body().unwrap();
        assert_eq!(body["method"], "GET");
        assert_eq!(body["resource"], serde_json::json!(["applications"]));
        assert_eq!(body["ids"], "app1,app 2");

        server.stop().await.unwrap();
        assert!(!server.is_running().await);
        assert!(server.local_addr().await.is_none());
    }
}
