//! SBI Message Structures
//!
//! Transport neutral request/response values exchanged between the
//! hyper glue in [`crate::client`]/[`crate::server`] and NF handlers,
//! plus the RFC 7807 problem object used for every non-2xx answer.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Characters escaped inside a single path segment (RFC 3986 pchar)
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode an identifier for use as one URI path segment
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Decode one URI path segment; invalid UTF-8 is replaced lossily
pub fn decode_path_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Content type for JSON bodies
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type for RFC 7807 problem bodies
pub const CONTENT_TYPE_PROBLEM: &str = "application/problem+json";
/// Content type for JSON merge-patch bodies
pub const CONTENT_TYPE_MERGE_PATCH: &str = "application/merge-patch+json";

/// SBI Header - method, URI and the decoded path components
#[derive(Debug, Clone, Default)]
pub struct SbiHeader {
    /// HTTP method (GET, POST, PUT, DELETE, PATCH, OPTIONS)
    pub method: String,
    /// Full URI (path and query)
    pub uri: String,
    /// Service name, first path component
    pub service_name: Option<String>,
    /// API version, second path component
    pub api_version: Option<String>,
    /// Remaining resource path components
    pub resource: Vec<String>,
}

impl SbiHeader {
    /// Create a new header with method and URI, splitting the path into
    /// `/{service}/{version}/{resource...}`
    pub fn with_method_uri(method: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let path = uri.split('?').next().unwrap_or_default();
        let mut parts = path
            .trim_start_matches('/')
            .split('/')
            .filter(|p| !p.is_empty())
            .map(decode_path_segment);

        let service_name = parts.next();
        let api_version = parts.next();
        let resource = parts.collect();

        Self {
            method: method.into(),
            uri,
            service_name,
            api_version,
            resource,
        }
    }

    /// Build the resource path from components
    pub fn resource_path(&self) -> String {
        self.resource.join("/")
    }
}

/// SBI HTTP Message - query params, headers and body
#[derive(Debug, Clone, Default)]
pub struct SbiHttpMessage {
    /// Query parameters
    pub params: HashMap<String, String>,
    /// HTTP headers
    pub headers: HashMap<String, String>,
    /// Body content
    pub content: Option<String>,
}

impl SbiHttpMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a query parameter
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Get a query parameter
    pub fn get_param(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Set a header
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Get a header; names are compared case-insensitively since hyper
    /// lowercases them on the wire
    pub fn get_header(&self, key: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Set the body content
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }
}

/// SBI Request
#[derive(Debug, Clone, Default)]
pub struct SbiRequest {
    /// Request header
    pub header: SbiHeader,
    /// HTTP message (params, headers, body)
    pub http: SbiHttpMessage,
}

impl SbiRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            header: SbiHeader::with_method_uri(method, uri),
            http: SbiHttpMessage::new(),
        }
    }

    /// Create a GET request
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }

    /// Create a POST request
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new("POST", uri)
    }

    /// Create a PUT request
    pub fn put(uri: impl Into<String>) -> Self {
        Self::new("PUT", uri)
    }

    /// Create a DELETE request
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new("DELETE", uri)
    }

    /// Create a PATCH request
    pub fn patch(uri: impl Into<String>) -> Self {
        Self::new("PATCH", uri)
    }

    /// Set JSON body content
    pub fn with_json_body<T: Serialize>(self, body: &T) -> Result<Self, serde_json::Error> {
        self.with_typed_json_body(body, CONTENT_TYPE_JSON)
    }

    /// Set JSON body content with an explicit content type
    pub fn with_typed_json_body<T: Serialize>(
        mut self,
        body: &T,
        content_type: &str,
    ) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http.set_header("Content-Type", content_type);
        Ok(self)
    }

    /// Add a query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_param(key, value);
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }

    /// Parse the JSON body; a missing body is an error
    pub fn json_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        match self.http.content.as_deref() {
            Some(content) => serde_json::from_str(content),
            None => Err(serde::de::Error::custom("missing request body")),
        }
    }
}

/// SBI Response
#[derive(Debug, Clone, Default)]
pub struct SbiResponse {
    /// HTTP message (params, headers, body)
    pub http: SbiHttpMessage,
    /// HTTP status code
    pub status: u16,
}

impl SbiResponse {
    /// Create a response with status code
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Set JSON body content
    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http.set_header("Content-Type", CONTENT_TYPE_JSON);
        Ok(self)
    }

    /// Set raw body content
    pub fn with_body(mut self, content: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.http.set_content(content);
        self.http.set_header("Content-Type", content_type);
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of the `Location` header, if any
    pub fn location(&self) -> Option<&str> {
        self.http.get_header("Location").map(String::as_str)
    }

    /// Parse JSON body
    pub fn json_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        let content = self.http.content.as_deref().unwrap_or("{}");
        serde_json::from_str(content)
    }
}

/// Problem Details - RFC 7807 compliant error response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    /// A short, human-readable summary of the problem type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A URI reference that identifies the specific occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Application-specific error cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Invalid parameters
    #[serde(rename = "invalidParams", skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<InvalidParam>>,
}

impl ProblemDetails {
    pub fn with_status(status: i32) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// 404 for a referenced resource that does not exist
    pub fn data_not_found(detail: impl Into<String>) -> Self {
        Self::with_status(404)
            .with_title("Data not found")
            .with_detail(detail)
            .with_cause("DATA_NOT_FOUND")
    }

    /// 400 for structurally invalid input
    pub fn malformed_request(detail: impl Into<String>) -> Self {
        Self::with_status(400)
            .with_title("Malformed request syntax")
            .with_detail(detail)
            .with_cause("MANDATORY_IE_INCORRECT")
    }

    /// 500 for local failures and peers that never answered
    pub fn system_failure(detail: impl Into<String>) -> Self {
        Self::with_status(500)
            .with_title("System failure")
            .with_detail(detail)
            .with_cause("SYSTEM_FAILURE")
    }

    /// Status as an HTTP code, defaulting to 500 when absent or invalid
    pub fn status_code(&self) -> u16 {
        self.status
            .and_then(|s| u16::try_from(s).ok())
            .filter(|s| (100..600).contains(s))
            .unwrap_or(500)
    }
}

/// Invalid Parameter for ProblemDetails
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvalidParam {
    /// Parameter name
    pub param: String,
    /// Reason why the parameter is invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sbi_header_path_split() {
        let header = SbiHeader::with_method_uri(
            "GET",
            "/3gpp-pfd-management/v1/af1/transactions/1?x=y",
        );

        assert_eq!(header.service_name.as_deref(), Some("3gpp-pfd-management"));
        assert_eq!(header.api_version.as_deref(), Some("v1"));
        assert_eq!(header.resource, vec!["af1", "transactions", "1"]);
        assert_eq!(header.resource_path(), "af1/transactions/1");
    }

    #[test]
    fn test_sbi_header_decodes_segments() {
        let header = SbiHeader::with_method_uri(
            "GET",
            "/3gpp-pfd-management/v1/af1/transactions/1/applications/app%201",
        );

        assert_eq!(header.resource, vec!["af1", "transactions", "1", "applications", "app 1"]);
        assert_eq!(header.uri, "/3gpp-pfd-management/v1/af1/transactions/1/applications/app%201");
    }

    #[test]
    fn test_path_segment_encoding() {
        assert_eq!(encode_path_segment("app 1"), "app%201");
        assert_eq!(encode_path_segment("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(encode_path_segment("app-1.x~y"), "app-1.x~y");
        assert_eq!(decode_path_segment(&encode_path_segment("100% app/ü")), "100% app/ü");
    }

    #[test]
    fn test_sbi_request() {
        let request = SbiRequest::get("/test")
            .with_param("key", "value")
            .with_header("Accept", "application/json");

        assert_eq!(request.header.method, "GET");
        assert_eq!(request.http.get_param("key"), Some(&"value".to_string()));
        assert!(request.json_body::<serde_json::Value>().is_err());
    }

    #[test]
    fn test_location_header_case_insensitive() {
        let response = SbiResponse::with_status(201)
            .with_header("location", "http://pcf/app-sessions/42");

        assert!(response.is_success());
        assert_eq!(response.location(), Some("http://pcf/app-sessions/42"));
    }

    #[test]
    fn test_problem_details_constructors() {
        let problem = ProblemDetails::data_not_found("Given AF is not existed");
        assert_eq!(problem.status_code(), 404);
        assert_eq!(problem.cause.as_deref(), Some("DATA_NOT_FOUND"));

        let json = serde_json::to_string(&ProblemDetails::system_failure("boom")).unwrap();
        assert!(json.contains("\"status\":500"));
        assert!(json.contains("SYSTEM_FAILURE"));
        assert!(!json.contains("invalidParams"));
    }

    #[test]
    fn test_problem_status_fallback() {
        assert_eq!(ProblemDetails::default().status_code(), 500);
        assert_eq!(ProblemDetails::with_status(42).status_code(), 500);
    }
}
