//! NEF Message Models
//!
//! JSON shapes exchanged with AFs (TS 29.122/29.522), the PFD consumers
//! (TS 29.551), the PCF (TS 29.514), the UDR (TS 29.519) and the SMF
//! event exposure callback (TS 29.508), plus the conversions between them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// PFD management (3gpp-pfd-management)
// ============================================================================

/// Individual PFD
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pfd {
    #[serde(default)]
    pub pfd_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flow_descriptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_names: Vec<String>,
}

impl Pfd {
    /// No flow description, URL or domain name
    pub fn is_empty(&self) -> bool {
        self.flow_descriptions.is_empty() && self.urls.is_empty() && self.domain_names.is_empty()
    }
}

/// PFDs of one external application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PfdData {
    #[serde(default)]
    pub external_app_id: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_uri: Option<String>,
    #[serde(default)]
    pub pfds: BTreeMap<String, Pfd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_delay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching_time: Option<u32>,
}

/// PFD operation failure code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    Malfunction,
    ResourceLimitation,
    ShortDelay,
    AppIdDuplicated,
    PartialFailure,
    OtherReason,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malfunction => "MALFUNCTION",
            Self::ResourceLimitation => "RESOURCE_LIMITATION",
            Self::ShortDelay => "SHORT_DELAY",
            Self::AppIdDuplicated => "APP_ID_DUPLICATED",
            Self::PartialFailure => "PARTIAL_FAILURE",
            Self::OtherReason => "OTHER_REASON",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Applications whose PFDs could not be provisioned, grouped by cause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PfdReport {
    pub external_app_ids: Vec<String>,
    pub failure_code: FailureCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching_time: Option<u32>,
}

impl PfdReport {
    pub fn new(app_id: impl Into<String>, failure_code: FailureCode) -> Self {
        Self {
            external_app_ids: vec![app_id.into()],
            failure_code,
            caching_time: None,
        }
    }
}

/// Failure reports keyed by failure code
pub type PfdReports = BTreeMap<String, PfdReport>;

/// Merge `report` into `reports`; reports sharing a failure code collapse
/// into one entry listing every affected application.
pub fn add_pfd_report(reports: &mut PfdReports, report: PfdReport) {
    match reports.get_mut(report.failure_code.as_str()) {
        Some(existing) => {
            for app_id in report.external_app_ids {
                if !existing.external_app_ids.contains(&app_id) {
                    existing.external_app_ids.push(app_id);
                }
            }
        }
        None => {
            reports.insert(report.failure_code.to_string(), report);
        }
    }
}

/// One PFD management transaction as seen by the AF
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PfdManagement {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_uri: Option<String>,
    #[serde(default)]
    pub pfd_datas: BTreeMap<String, PfdData>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pfd_reports: PfdReports,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
}

// ============================================================================
// PFD data as stored in the UDR and exposed on nnef-pfdmanagement
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PfdContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfd_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flow_descriptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PfdDataForApp {
    pub application_id: String,
    #[serde(default)]
    pub pfds: Vec<PfdContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching_time: Option<String>,
}

impl From<&PfdData> for PfdDataForApp {
    fn from(data: &PfdData) -> Self {
        Self {
            application_id: data.external_app_id.clone(),
            pfds: data
                .pfds
                .values()
                .map(|pfd| PfdContent {
                    pfd_id: Some(pfd.pfd_id.clone()),
                    flow_descriptions: pfd.flow_descriptions.clone(),
                    urls: pfd.urls.clone(),
                    domain_names: pfd.domain_names.clone(),
                })
                .collect(),
            caching_time: None,
        }
    }
}

impl From<&PfdDataForApp> for PfdData {
    fn from(data: &PfdDataForApp) -> Self {
        Self {
            external_app_id: data.application_id.clone(),
            self_uri: None,
            pfds: data
                .pfds
                .iter()
                .map(|content| {
                    let pfd_id = content.pfd_id.clone().unwrap_or_default();
                    let pfd = Pfd {
                        pfd_id: pfd_id.clone(),
                        flow_descriptions: content.flow_descriptions.clone(),
                        urls: content.urls.clone(),
                        domain_names: content.domain_names.clone(),
                    };
                    (pfd_id, pfd)
                })
                .collect(),
            allowed_delay: None,
            caching_time: None,
        }
    }
}

/// Change-notification subscription on nnef-pfdmanagement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PfdSubscription {
    /// Empty means every application
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub application_ids: Vec<String>,
    #[serde(default)]
    pub notify_uri: String,
    #[serde(default)]
    pub supported_features: String,
}

/// One changed application in a PFD notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PfdChangeNotification {
    pub application_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removal_flag: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial_flag: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pfds: Vec<PfdContent>,
}

impl PfdChangeNotification {
    pub fn updated(app_id: impl Into<String>, pfds: Vec<PfdContent>) -> Self {
        Self {
            application_id: app_id.into(),
            pfds,
            ..Default::default()
        }
    }

    pub fn removed(app_id: impl Into<String>) -> Self {
        Self {
            application_id: app_id.into(),
            removal_flag: true,
            ..Default::default()
        }
    }
}

// ============================================================================
// Traffic influence (3gpp-traffic-influence)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snssai {
    pub sst: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowInfo {
    pub flow_id: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flow_descriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthFlowDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_mac_addr: Option<String>,
    #[serde(default)]
    pub eth_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_mac_addr: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vlan_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_addr: Option<String>,
    pub port_number: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteToLocation {
    pub dnai: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_info: Option<RouteInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_prof_id: Option<String>,
}

/// Traffic influence subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInfluSub {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub af_service_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub af_app_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub af_trans_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub app_relo_ind: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dnn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snssai: Option<Snssai>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_group_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub any_ue_ind: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gpsi: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ipv4_addr: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ipv6_addr: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dnai_chg_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notification_destination: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic_filters: Vec<FlowInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eth_traffic_filters: Vec<EthFlowDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic_routes: Vec<RouteToLocation>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub supp_feat: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_uri: Option<String>,
}

impl TrafficInfluSub {
    /// Targets one UE (GPSI or UE address), i.e. backed by a PCF session
    pub fn is_individual_ue(&self) -> bool {
        !self.gpsi.is_empty() || !self.ipv4_addr.is_empty() || !self.ipv6_addr.is_empty()
    }

    /// Targets a UE group or any UE, i.e. backed by UDR influence data
    pub fn is_group_or_any_ue(&self) -> bool {
        !self.external_group_id.is_empty() || self.any_ue_ind
    }
}

/// Partial update of a traffic influence subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInfluSubPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_relo_ind: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_filters: Option<Vec<FlowInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_traffic_filters: Option<Vec<EthFlowDescription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_routes: Option<Vec<RouteToLocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_destination: Option<String>,
}

// ============================================================================
// PCF policy authorization (npcf-policyauthorization)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpPathChgEvent {
    #[serde(default)]
    pub notification_uri: String,
    #[serde(default)]
    pub notif_corre_id: String,
    #[serde(default)]
    pub dnai_chg_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfRoutingRequirement {
    #[serde(default)]
    pub app_reloc: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_to_locs: Vec<RouteToLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_path_chg_sub: Option<UpPathChgEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSessionContextReqData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub af_app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub af_rout_req: Option<AfRoutingRequirement>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dnn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_info: Option<Snssai>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gpsi: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ue_ipv4: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ue_ipv6: String,
    #[serde(default)]
    pub notif_uri: String,
    #[serde(default)]
    pub supp_feat: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asc_req_data: Option<AppSessionContextReqData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfRoutingRequirementRm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_reloc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_to_locs: Option<Vec<RouteToLocation>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSessionContextUpdateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub af_rout_req: Option<AfRoutingRequirementRm>,
}

// ============================================================================
// UDR application data (nudr-dr influenceData)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInfluData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub af_app_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub app_relo_ind: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dnn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snssai: Option<Snssai>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub inter_group_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic_filters: Vec<FlowInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eth_traffic_filters: Vec<EthFlowDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic_routes: Vec<RouteToLocation>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub up_path_chg_notif_corre_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub up_path_chg_notif_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInfluDataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_relo_ind: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_filters: Option<Vec<FlowInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_traffic_filters: Option<Vec<EthFlowDescription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_routes: Option<Vec<RouteToLocation>>,
}

// ============================================================================
// SMF event exposure callback (nsmf-event-exposure)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNotification {
    pub event: String,
    #[serde(default)]
    pub time_stamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpsi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dnai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_dnai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dnai_chg_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NsmfEventExposureNotification {
    pub notif_id: String,
    #[serde(default)]
    pub event_notifs: Vec<EventNotification>,
}

// ============================================================================
// OAM
// ============================================================================

/// Registry counters reported on nnef-oam
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NefStatus {
    pub nf_instance_id: String,
    pub num_af_contexts: usize,
    pub num_subscriptions: usize,
    pub num_pfd_transactions: usize,
    pub num_pfd_subscriptions: usize,
}

// ============================================================================
// Conversions
// ============================================================================

impl TrafficInfluSub {
    /// UDR influence data for a group/any-UE subscription
    pub fn to_influence_data(&self, notif_corre_id: &str, notif_uri: &str) -> TrafficInfluData {
        TrafficInfluData {
            af_app_id: self.af_app_id.clone(),
            app_relo_ind: self.app_relo_ind,
            dnn: self.dnn.clone(),
            snssai: self.snssai.clone(),
            inter_group_id: self.external_group_id.clone(),
            traffic_filters: self.traffic_filters.clone(),
            eth_traffic_filters: self.eth_traffic_filters.clone(),
            traffic_routes: self.traffic_routes.clone(),
            up_path_chg_notif_corre_id: notif_corre_id.to_string(),
            up_path_chg_notif_uri: notif_uri.to_string(),
        }
    }

    /// PCF application session for an individual-UE subscription
    pub fn to_app_session_context(&self, notif_corre_id: &str, notif_uri: &str) -> AppSessionContext {
        AppSessionContext {
            asc_req_data: Some(AppSessionContextReqData {
                af_app_id: self.af_app_id.clone(),
                af_rout_req: Some(AfRoutingRequirement {
                    app_reloc: self.app_relo_ind,
                    route_to_locs: self.traffic_routes.clone(),
                    up_path_chg_sub: Some(UpPathChgEvent {
                        notification_uri: notif_uri.to_string(),
                        notif_corre_id: notif_corre_id.to_string(),
                        dnai_chg_type: self.dnai_chg_type.clone(),
                    }),
                }),
                dnn: self.dnn.clone(),
                slice_info: self.snssai.clone(),
                gpsi: self.gpsi.clone(),
                ue_ipv4: self.ipv4_addr.clone(),
                ue_ipv6: self.ipv6_addr.clone(),
                notif_uri: notif_uri.to_string(),
                supp_feat: self.supp_feat.clone(),
            }),
        }
    }
}

impl From<&TrafficInfluData> for TrafficInfluSub {
    fn from(data: &TrafficInfluData) -> Self {
        Self {
            af_app_id: data.af_app_id.clone(),
            app_relo_ind: data.app_relo_ind,
            dnn: data.dnn.clone(),
            snssai: data.snssai.clone(),
            external_group_id: data.inter_group_id.clone(),
            any_ue_ind: data.inter_group_id.is_empty(),
            traffic_filters: data.traffic_filters.clone(),
            eth_traffic_filters: data.eth_traffic_filters.clone(),
            traffic_routes: data.traffic_routes.clone(),
            ..Default::default()
        }
    }
}

impl From<&AppSessionContext> for TrafficInfluSub {
    fn from(asc: &AppSessionContext) -> Self {
        let Some(req) = &asc.asc_req_data else {
            return Self::default();
        };
        let rout_req = req.af_rout_req.as_ref();
        Self {
            af_app_id: req.af_app_id.clone(),
            app_relo_ind: rout_req.map(|r| r.app_reloc).unwrap_or_default(),
            dnai_chg_type: rout_req
                .and_then(|r| r.up_path_chg_sub.as_ref())
                .map(|s| s.dnai_chg_type.clone())
                .unwrap_or_default(),
            traffic_routes: rout_req.map(|r| r.route_to_locs.clone()).unwrap_or_default(),
            dnn: req.dnn.clone(),
            snssai: req.slice_info.clone(),
            gpsi: req.gpsi.clone(),
            ipv4_addr: req.ue_ipv4.clone(),
            ipv6_addr: req.ue_ipv6.clone(),
            supp_feat: req.supp_feat.clone(),
            ..Default::default()
        }
    }
}

impl From<&TrafficInfluSubPatch> for AppSessionContextUpdateData {
    fn from(patch: &TrafficInfluSubPatch) -> Self {
        let af_rout_req = (patch.app_relo_ind.is_some() || patch.traffic_routes.is_some()).then(|| {
            AfRoutingRequirementRm {
                app_reloc: patch.app_relo_ind,
                route_to_locs: patch.traffic_routes.clone(),
            }
        });
        Self { af_rout_req }
    }
}

impl From<&TrafficInfluSubPatch> for TrafficInfluDataPatch {
    fn from(patch: &TrafficInfluSubPatch) -> Self {
        Self {
            app_relo_ind: patch.app_relo_ind,
            traffic_filters: patch.traffic_filters.clone(),
            eth_traffic_filters: patch.eth_traffic_filters.clone(),
            traffic_routes: patch.traffic_routes.clone(),
        }
    }
}
