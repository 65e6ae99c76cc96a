//! SBI Types
//!
//! Service names, NF types and URI schemes used on the NEF's
//! service based interfaces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SBI service types the NEF produces or consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SbiServiceType {
    NnrfNfm,
    NnrfDisc,
    NnefPfdmanagement,
    NnefOam,
    NpcfPolicyauthorization,
    NudrDr,
    NsmfEventExposure,
}

impl SbiServiceType {
    /// Convert service type to service name string
    pub fn to_name(&self) -> &'static str {
        match self {
            Self::NnrfNfm => "nnrf-nfm",
            Self::NnrfDisc => "nnrf-disc",
            Self::NnefPfdmanagement => "nnef-pfdmanagement",
            Self::NnefOam => "nnef-oam",
            Self::NpcfPolicyauthorization => "npcf-policyauthorization",
            Self::NudrDr => "nudr-dr",
            Self::NsmfEventExposure => "nsmf-event-exposure",
        }
    }

    /// Convert service name string to service type
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nnrf-nfm" => Some(Self::NnrfNfm),
            "nnrf-disc" => Some(Self::NnrfDisc),
            "nnef-pfdmanagement" => Some(Self::NnefPfdmanagement),
            "nnef-oam" => Some(Self::NnefOam),
            "npcf-policyauthorization" => Some(Self::NpcfPolicyauthorization),
            "nudr-dr" => Some(Self::NudrDr),
            "nsmf-event-exposure" => Some(Self::NsmfEventExposure),
            _ => None,
        }
    }
}

impl fmt::Display for SbiServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_name())
    }
}

/// NF Type enumeration - matches OpenAPI_nf_type_e
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfType {
    Nrf,
    Udm,
    Amf,
    Smf,
    Nef,
    Pcf,
    Udr,
    Af,
    Scp,
}

impl NfType {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Nrf => "NRF",
            Self::Udm => "UDM",
            Self::Amf => "AMF",
            Self::Smf => "SMF",
            Self::Nef => "NEF",
            Self::Pcf => "PCF",
            Self::Udr => "UDR",
            Self::Af => "AF",
            Self::Scp => "SCP",
        }
    }
}

impl fmt::Display for NfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// URI Scheme - matches OpenAPI_uri_scheme_e
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UriScheme {
    #[default]
    Http,
    Https,
}

impl UriScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

impl fmt::Display for UriScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
