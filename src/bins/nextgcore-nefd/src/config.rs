//! NEF Configuration
//!
//! YAML configuration file (`info`, `configuration`, `logger`) with the
//! defaults and derived URIs the NEF needs at runtime.

use std::path::Path;

use ogs_sbi::{IpEndPoint, NfService, NfServiceStatus, NfServiceVersion, UriScheme};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NEF_DEFAULT_CONFIG_PATH: &str = "/etc/nextgcore/nef.yaml";
pub const NEF_DEFAULT_TLS_PEM_PATH: &str = "/etc/nextgcore/tls/nef.pem";
pub const NEF_DEFAULT_TLS_KEY_PATH: &str = "/etc/nextgcore/tls/nef.key";
pub const NEF_EXPECTED_CONFIG_VERSION: &str = "1.0.0";
pub const NEF_SBI_DEFAULT_IPV4: &str = "127.0.0.5";
pub const NEF_SBI_DEFAULT_BINDING_IPV4: &str = "0.0.0.0";
pub const NEF_SBI_DEFAULT_PORT: u16 = 8000;
pub const NEF_SBI_DEFAULT_SCHEME: UriScheme = UriScheme::Https;
pub const NEF_DEFAULT_NRF_URI: &str = "https://127.0.0.10:8000";

pub const TRAFF_INFLU_RES_URI_PREFIX: &str = "/3gpp-traffic-influence/v1";
pub const PFD_MNG_RES_URI_PREFIX: &str = "/3gpp-pfd-management/v1";
pub const NEF_PFD_MNG_RES_URI_PREFIX: &str = "/nnef-pfdmanagement/v1";
pub const NEF_OAM_RES_URI_PREFIX: &str = "/nnef-oam/v1";
pub const NEF_CALLBACK_RES_URI_PREFIX: &str = "/nnef-callback/v1";

pub const SERVICE_TRAFF_INFLU: &str = "3gpp-traffic-influence";
pub const SERVICE_PFD_MNG: &str = "3gpp-pfd-management";
pub const SERVICE_NEF_PFD: &str = "nnef-pfdmanagement";
pub const SERVICE_NEF_OAM: &str = "nnef-oam";
pub const SERVICE_NEF_CALLBACK: &str = "nnef-callback";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConf {
    #[serde(default)]
    pub pem: String,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SbiConf {
    #[serde(default)]
    pub scheme: Option<String>,
    /// Address advertised to the NRF
    #[serde(rename = "registerIPv4", default)]
    pub register_ipv4: Option<String>,
    /// Address the listener binds to, or the name of an environment
    /// variable holding it
    #[serde(rename = "bindingIPv4", default)]
    pub binding_ipv4: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub tls: Option<TlsConf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConf {
    pub service_name: String,
    #[serde(default)]
    pub supp_feat: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub sbi: Option<SbiConf>,
    #[serde(default)]
    pub nrf_uri: Option<String>,
    #[serde(default)]
    pub service_list: Vec<ServiceConf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConf {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub report_caller: bool,
}

/// NEF configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NefConfig {
    #[serde(default)]
    pub info: Option<Info>,
    #[serde(default)]
    pub configuration: Option<Configuration>,
    #[serde(default)]
    pub logger: Option<LoggerConf>,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl NefConfig {
    /// Read, parse and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration text
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NefConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.info.is_none() {
            return Err(ConfigError::ValidationError("info is required".to_string()));
        }
        let configuration = self
            .configuration
            .as_ref()
            .ok_or_else(|| ConfigError::ValidationError("configuration is required".to_string()))?;

        if let Some(sbi) = &configuration.sbi {
            if let Some(scheme) = &sbi.scheme {
                if UriScheme::from_str_opt(scheme).is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid sbi.scheme: {}, should be http or https",
                        scheme
                    )));
                }
            }
            if let Some(tls) = &sbi.tls {
                if tls.pem.is_empty() || tls.key.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "sbi.tls requires both pem and key".to_string(),
                    ));
                }
            }
        }

        if matches!(configuration.nrf_uri.as_deref(), Some("")) {
            return Err(ConfigError::ValidationError("nrfUri is empty".to_string()));
        }

        for (i, s) in configuration.service_list.iter().enumerate() {
            if s.service_name != SERVICE_NEF_PFD && s.service_name != SERVICE_NEF_OAM {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid serviceList[{}]: {}, should be {} or {}",
                    i, s.service_name, SERVICE_NEF_PFD, SERVICE_NEF_OAM
                )));
            }
        }

        if let Some(level) = self.logger.as_ref().and_then(|l| l.level.as_deref()) {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid logger.level: {}",
                    level
                )));
            }
        }

        Ok(())
    }

    fn sbi(&self) -> Option<&SbiConf> {
        self.configuration.as_ref().and_then(|c| c.sbi.as_ref())
    }

    pub fn version(&self) -> &str {
        self.info.as_ref().map(|i| i.version.as_str()).unwrap_or("")
    }

    pub fn sbi_scheme(&self) -> UriScheme {
        self.sbi()
            .and_then(|s| s.scheme.as_deref())
            .and_then(UriScheme::from_str_opt)
            .unwrap_or(NEF_SBI_DEFAULT_SCHEME)
    }

    pub fn sbi_port(&self) -> u16 {
        self.sbi()
            .and_then(|s| s.port)
            .filter(|p| *p != 0)
            .unwrap_or(NEF_SBI_DEFAULT_PORT)
    }

    /// Binding IP; an environment variable named after the configured
    /// value takes precedence over the literal
    pub fn sbi_binding_ip(&self) -> String {
        match self.sbi().and_then(|s| s.binding_ipv4.as_deref()) {
            Some(binding) if !binding.is_empty() => match std::env::var(binding) {
                Ok(ip) if !ip.is_empty() => {
                    log::info!("Parsing ServerIPv4 [{}] from ENV Variable", ip);
                    ip
                }
                _ => binding.to_string(),
            },
            _ => NEF_SBI_DEFAULT_BINDING_IPV4.to_string(),
        }
    }

    /// `bindingIPv4:port` of the SBI listener
    pub fn binding_addr(&self) -> String {
        format!("{}:{}", self.sbi_binding_ip(), self.sbi_port())
    }

    pub fn sbi_register_ip(&self) -> String {
        self.sbi()
            .and_then(|s| s.register_ipv4.clone())
            .filter(|ip| !ip.is_empty())
            .unwrap_or_else(|| NEF_SBI_DEFAULT_IPV4.to_string())
    }

    /// `scheme://registerIPv4:port`
    pub fn sbi_uri(&self) -> String {
        format!(
            "{}://{}:{}",
            self.sbi_scheme(),
            self.sbi_register_ip(),
            self.sbi_port()
        )
    }

    pub fn nrf_uri(&self) -> String {
        self.configuration
            .as_ref()
            .and_then(|c| c.nrf_uri.clone())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| NEF_DEFAULT_NRF_URI.to_string())
    }

    pub fn service_list(&self) -> &[ServiceConf] {
        self.configuration
            .as_ref()
            .map(|c| c.service_list.as_slice())
            .unwrap_or(&[])
    }

    pub fn tls_pem_path(&self) -> String {
        self.sbi()
            .and_then(|s| s.tls.as_ref())
            .map(|t| t.pem.clone())
            .unwrap_or_else(|| NEF_DEFAULT_TLS_PEM_PATH.to_string())
    }

    pub fn tls_key_path(&self) -> String {
        self.sbi()
            .and_then(|s| s.tls.as_ref())
            .map(|t| t.key.clone())
            .unwrap_or_else(|| NEF_DEFAULT_TLS_KEY_PATH.to_string())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logger.as_ref().and_then(|l| l.level.as_deref())
    }

    /// Base URI of one of the NEF's own API families, or `None` for an
    /// unknown name
    pub fn service_uri(&self, name: &str) -> Option<String> {
        let prefix = match name {
            SERVICE_TRAFF_INFLU => TRAFF_INFLU_RES_URI_PREFIX,
            SERVICE_PFD_MNG => PFD_MNG_RES_URI_PREFIX,
            SERVICE_NEF_PFD => NEF_PFD_MNG_RES_URI_PREFIX,
            SERVICE_NEF_OAM => NEF_OAM_RES_URI_PREFIX,
            SERVICE_NEF_CALLBACK => NEF_CALLBACK_RES_URI_PREFIX,
            _ => return None,
        };
        Some(format!("{}{}", self.sbi_uri(), prefix))
    }

    /// Services advertised in the NRF profile
    pub fn nf_services(&self) -> Vec<NfService> {
        let version = self.version();
        let major = version.split('.').next().unwrap_or_default();
        let scheme = self.sbi_scheme();

        self.service_list()
            .iter()
            .enumerate()
            .map(|(i, s)| NfService {
                service_instance_id: i.to_string(),
                service_name: s.service_name.clone(),
                versions: vec![NfServiceVersion {
                    api_version_in_uri: format!("v{}", major),
                    api_full_version: version.to_string(),
                }],
                scheme,
                nf_service_status: NfServiceStatus::Registered,
                fqdn: None,
                api_prefix: Some(self.sbi_uri()),
                ip_end_points: vec![IpEndPoint {
                    ipv4_address: Some(self.sbi_register_ip()),
                    ipv6_address: None,
                    transport: Some("TCP".to_string()),
                    port: Some(self.sbi_port()),
                }],
                supported_features: s.supp_feat.clone(),
            })
            .collect()
    }
}
