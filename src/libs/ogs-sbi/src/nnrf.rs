//! NRF Management/Discovery Models
//!
//! NF profile and search-result shapes exchanged with the NRF, and the
//! rules for turning a discovered service entry into a connectable base
//! URI.

use serde::{Deserialize, Serialize};

use crate::types::{NfType, UriScheme};

/// NF instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfStatus {
    #[default]
    Registered,
    Suspended,
    Undiscoverable,
}

/// NF service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfServiceStatus {
    #[default]
    Registered,
    Suspended,
    Undiscoverable,
}

/// NF Profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfProfile {
    pub nf_instance_id: String,
    pub nf_type: NfType,
    #[serde(default)]
    pub nf_status: NfStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_beat_timer: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv6_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nf_services: Vec<NfService>,
}

impl NfProfile {
    pub fn new(nf_instance_id: impl Into<String>, nf_type: NfType) -> Self {
        Self {
            nf_instance_id: nf_instance_id.into(),
            nf_type,
            nf_status: NfStatus::Registered,
            heart_beat_timer: None,
            fqdn: None,
            ipv4_addresses: Vec::new(),
            ipv6_addresses: Vec::new(),
            nf_services: Vec::new(),
        }
    }
}

/// NF Service version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfServiceVersion {
    pub api_version_in_uri: String,
    pub api_full_version: String,
}

/// NF Service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfService {
    pub service_instance_id: String,
    pub service_name: String,
    #[serde(default)]
    pub versions: Vec<NfServiceVersion>,
    #[serde(default)]
    pub scheme: UriScheme,
    #[serde(default)]
    pub nf_service_status: NfServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_end_points: Vec<IpEndPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
}

/// IP end point of a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpEndPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Search result for NF discovery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_period: Option<u32>,
    #[serde(default)]
    pub nf_instances: Vec<NfProfile>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

fn uri_from_ip_end_point(scheme: UriScheme, addr: &str, port: Option<u16>) -> String {
    let port = port.filter(|p| *p != 0).unwrap_or_else(|| scheme.default_port());
    format!("{}://{}:{}", scheme, addr, port)
}

/// Derive the base URI of `service_name` from one NF profile.
///
/// Only services in REGISTERED state are considered. Precedence per
/// service: service FQDN, profile FQDN, scheme+host of the API prefix,
/// then the first IP end point (its own IPv4 address, else the profile's
/// first IPv4 address) with a scheme default port when the port is 0 or
/// absent. Returns `None` when nothing usable is found.
pub fn search_nf_service_uri(profile: &NfProfile, service_name: &str) -> Option<String> {
    for service in &profile.nf_services {
        if service.service_name != service_name
            || service.nf_service_status != NfServiceStatus::Registered
        {
            continue;
        }

        let uri = if let Some(fqdn) = non_empty(&service.fqdn) {
            Some(format!("{}://{}", service.scheme, fqdn))
        } else if let Some(fqdn) = non_empty(&profile.fqdn) {
            Some(format!("{}://{}", service.scheme, fqdn))
        } else if let Some(prefix) = non_empty(&service.api_prefix) {
            url::Url::parse(prefix).ok().and_then(|u| {
                let host = u.host_str()?;
                Some(match u.port() {
                    Some(port) => format!("{}://{}:{}", u.scheme(), host, port),
                    None => format!("{}://{}", u.scheme(), host),
                })
            })
        } else if let Some(point) = service.ip_end_points.first() {
            non_empty(&point.ipv4_address)
                .or_else(|| profile.ipv4_addresses.first().map(String::as_str))
                .map(|addr| uri_from_ip_end_point(service.scheme, addr, point.port))
        } else {
            None
        };

        if let Some(uri) = uri.filter(|u| !u.is_empty()) {
            return Some(uri);
        }
    }

    None
}

/// Pick the first instance in a search result that yields a base URI for
/// `service_name`.
pub fn select_service_uri(instances: &[NfProfile], service_name: &str) -> Option<String> {
    instances
        .iter()
        .find_map(|profile| search_nf_service_uri(profile, service_name))
}
