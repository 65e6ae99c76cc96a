//! TLS utilities for the SBI client
//!
//! Certificate/key loading and the rustls client configuration used when
//! a peer base URI uses the `https` scheme.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};

use crate::error::{SbiError, SbiResult};

fn provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Load PEM-encoded certificates from a file path.
pub fn load_certs(path: &str) -> SbiResult<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| SbiError::TlsError(format!("Failed to open cert file {path}: {e}")))?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SbiError::TlsError(format!("Failed to parse certs from {path}: {e}")))?;

    if certs.is_empty() {
        return Err(SbiError::TlsError(format!("No certificates found in {path}")));
    }

    Ok(certs)
}

/// Load a PEM-encoded private key from a file path.
pub fn load_private_key(path: &str) -> SbiResult<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| SbiError::TlsError(format!("Failed to open key file {path}: {e}")))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| SbiError::TlsError(format!("Failed to parse key from {path}: {e}")))?
        .ok_or_else(|| SbiError::TlsError(format!("No private key found in {path}")))
}

/// Build a client-side TLS config (server auth only, no client cert).
///
/// Without a CA file the webpki roots are trusted. ALPN is pinned to h2.
pub fn build_client_config(
    ca_path: Option<&str>,
    insecure_skip_verify: bool,
) -> SbiResult<ClientConfig> {
    let mut root_store = RootCertStore::empty();

    match ca_path {
        Some(ca) => {
            for cert in load_certs(ca)? {
                root_store
                    .add(cert)
                    .map_err(|e| SbiError::TlsError(format!("Failed to add CA cert: {e}")))?;
            }
        }
        None => root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }

    let mut config = ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| SbiError::TlsError(format!("Failed to set protocol versions: {e}")))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    config.alpn_protocols = vec![b"h2".to_vec()];

    if insecure_skip_verify {
        log::warn!("TLS server certificate verification disabled");
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoCertificateVerification));
    }

    Ok(config)
}

/// Build a server-side TLS config from a PEM certificate chain and key.
///
/// ALPN advertises h2 only; the listener speaks HTTP/2 exclusively.
pub fn build_server_config(cert_path: &str, key_path: &str) -> SbiResult<rustls::ServerConfig> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let mut config = rustls::ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| SbiError::TlsError(format!("Failed to set protocol versions: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| SbiError::TlsError(format!("Invalid server certificate/key: {e}")))?;

    config.alpn_protocols = vec![b"h2".to_vec()];
    Ok(config)
}

/// Skips server certificate verification; lab deployments only.
#[derive(Debug)]
struct NoCertificateVerification;

impl rustls::client::danger::ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_certs_nonexistent_file() {
        let err = load_certs("/nonexistent/path.pem").unwrap_err();
        assert!(matches!(err, SbiError::TlsError(_)));
    }

    #[test]
    fn test_load_key_nonexistent_file() {
        assert!(load_private_key("/nonexistent/path.pem").is_err());
    }

    #[test]
    fn test_build_client_config_with_webpki_roots() {
        let cfg = build_client_config(None, false).unwrap();
        assert_eq!(cfg.alpn_protocols, vec![b"h2".to_vec()]);
    }

    #[test]
    fn test_build_server_config_missing_files() {
        let err = build_server_config("/nonexistent/nef.pem", "/nonexistent/nef.key").unwrap_err();
        assert!(matches!(err, SbiError::TlsError(_)));
    }

    #[test]
    fn test_build_client_config_insecure() {
        assert!(build_client_config(None, true).is_ok());
    }
}
