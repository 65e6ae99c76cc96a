//! Common test utilities for NEF integration tests
//!
//! In-memory NRF, PCF and UDR peers implementing the consumer traits, and
//! a [`NefEnv`] wiring them into a [`Processor`].

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nextgcore_nefd::consumer::{NrfService, PcfService, PeerError, PeerResult, UdrService};
use nextgcore_nefd::models::{
    AppSessionContext, AppSessionContextUpdateData, PfdDataForApp, TrafficInfluData,
    TrafficInfluDataPatch,
};
use nextgcore_nefd::notifier::NotifyBatch;
use nextgcore_nefd::{Consumer, NefConfig, NefContext, PfdChangeNotifier, Processor};
use ogs_sbi::{NfType, ProblemDetails, SbiRequest};
use parking_lot::Mutex;
use tokio::sync::mpsc;

pub const NEF_CONFIG: &str = r#"
info:
  version: 1.0.1
  description: NEF test configuration
configuration:
  sbi:
    scheme: http
    registerIPv4: 127.0.0.5
    bindingIPv4: 127.0.0.5
    port: 8000
  nrfUri: http://127.0.0.10:8000
  serviceList:
    - serviceName: nnef-pfdmanagement
    - serviceName: nnef-oam
logger:
  level: debug
"#;

pub const SBI_URI: &str = "http://127.0.0.5:8000";

fn not_found(detail: &str) -> PeerError {
    PeerError::new(404, ProblemDetails::data_not_found(detail))
}

/// Ordered log of peer calls, shared by every mock of one environment
#[derive(Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

pub struct MockNrf;

#[async_trait]
impl NrfService for MockNrf {
    async fn register_nf_instance(&self) -> PeerResult<()> {
        Ok(())
    }

    async fn deregister_nf_instance(&self) -> PeerResult<()> {
        Ok(())
    }

    async fn search_service_uri(&self, target: NfType, _service_name: &str) -> PeerResult<String> {
        Ok(format!("http://{}.example:8000", target.to_str().to_lowercase()))
    }
}

pub struct MockPcf {
    pub log: Arc<CallLog>,
    pub sessions: Mutex<HashMap<String, AppSessionContext>>,
    /// Every session create is rejected with 500 while set
    pub reject_posts: Mutex<bool>,
    next_id: Mutex<u64>,
}

impl MockPcf {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            sessions: Mutex::new(HashMap::new()),
            reject_posts: Mutex::new(false),
            next_id: Mutex::new(1),
        }
    }

    pub fn reject_new_sessions(&self) {
        *self.reject_posts.lock() = true;
    }
}

#[async_trait]
impl PcfService for MockPcf {
    async fn post_app_session(&self, asc: &AppSessionContext) -> PeerResult<(String, AppSessionContext)> {
        if *self.reject_posts.lock() {
            self.log.push("pcf post rejected");
            return Err(PeerError::new(500, ProblemDetails::system_failure("Policy failure")));
        }
        let id = {
            let mut next_id = self.next_id.lock();
            let id = format!("pcf-sess-{}", *next_id);
            *next_id += 1;
            id
        };
        self.log.push(format!("pcf post {}", id));
        self.sessions.lock().insert(id.clone(), asc.clone());
        Ok((id, asc.clone()))
    }

    async fn get_app_session(&self, app_session_id: &str) -> PeerResult<AppSessionContext> {
        self.log.push(format!("pcf get {}", app_session_id));
        self.sessions
            .lock()
            .get(app_session_id)
            .cloned()
            .ok_or_else(|| not_found("Application session not found"))
    }

    async fn patch_app_session(
        &self,
        app_session_id: &str,
        update: &AppSessionContextUpdateData,
    ) -> PeerResult<AppSessionContext> {
        self.log.push(format!("pcf patch {}", app_session_id));
        let mut sessions = self.sessions.lock();
        let asc = sessions
            .get_mut(app_session_id)
            .ok_or_else(|| not_found("Application session not found"))?;
        if let (Some(req), Some(rm)) = (asc.asc_req_data.as_mut(), &update.af_rout_req) {
            let rout_req = req.af_rout_req.get_or_insert_with(Default::default);
            if let Some(app_reloc) = rm.app_reloc {
                rout_req.app_reloc = app_reloc;
            }
            if let Some(routes) = &rm.route_to_locs {
                rout_req.route_to_locs = routes.clone();
            }
        }
        Ok(asc.clone())
    }

    async fn delete_app_session(&self, app_session_id: &str) -> PeerResult<()> {
        self.log.push(format!("pcf delete {}", app_session_id));
        self.sessions
            .lock()
            .remove(app_session_id)
            .map(|_| ())
            .ok_or_else(|| not_found("Application session not found"))
    }
}

pub struct MockUdr {
    pub log: Arc<CallLog>,
    pub pfds: Mutex<HashMap<String, PfdDataForApp>>,
    pub influence: Mutex<HashMap<String, TrafficInfluData>>,
    /// Applications whose PFD store is rejected with 500
    pub failing_apps: Mutex<Vec<String>>,
}

impl MockUdr {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            pfds: Mutex::new(HashMap::new()),
            influence: Mutex::new(HashMap::new()),
            failing_apps: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_store_of(&self, app_id: &str) {
        self.failing_apps.lock().push(app_id.to_string());
    }
}

#[async_trait]
impl UdrService for MockUdr {
    async fn get_pfd_datas(&self, app_ids: &[String]) -> PeerResult<Vec<PfdDataForApp>> {
        self.log.push(format!("udr get pfds {}", app_ids.join(",")));
        let pfds = self.pfds.lock();
        if app_ids.is_empty() {
            return Ok(pfds.values().cloned().collect());
        }
        Ok(app_ids.iter().filter_map(|id| pfds.get(id).cloned()).collect())
    }

    async fn get_pfd_data(&self, app_id: &str) -> PeerResult<PfdDataForApp> {
        self.log.push(format!("udr get pfd {}", app_id));
        self.pfds
            .lock()
            .get(app_id)
            .cloned()
            .ok_or_else(|| not_found("PFD data not found"))
    }

    async fn put_pfd_data(&self, app_id: &str, data: &PfdDataForApp) -> PeerResult<()> {
        self.log.push(format!("udr put pfd {}", app_id));
        if self.failing_apps.lock().iter().any(|a| a == app_id) {
            return Err(PeerError::new(500, ProblemDetails::system_failure("Storage failure")));
        }
        self.pfds.lock().insert(app_id.to_string(), data.clone());
        Ok(())
    }

    async fn delete_pfd_data(&self, app_id: &str) -> PeerResult<()> {
        self.log.push(format!("udr delete pfd {}", app_id));
        self.pfds.lock().remove(app_id);
        Ok(())
    }

    async fn get_influence_data(&self, influence_id: &str) -> PeerResult<TrafficInfluData> {
        self.log.push(format!("udr get influence {}", influence_id));
        self.influence
            .lock()
            .get(influence_id)
            .cloned()
            .ok_or_else(|| not_found("Influence data not found"))
    }

    async fn put_influence_data(&self, influence_id: &str, data: &TrafficInfluData) -> PeerResult<()> {
        self.log.push(format!("udr put influence {}", influence_id));
        self.influence
            .lock()
            .insert(influence_id.to_string(), data.clone());
        Ok(())
    }

    async fn patch_influence_data(
        &self,
        influence_id: &str,
        patch: &TrafficInfluDataPatch,
    ) -> PeerResult<Option<TrafficInfluData>> {
        self.log.push(format!("udr patch influence {}", influence_id));
        let mut influence = self.influence.lock();
        let data = influence
            .get_mut(influence_id)
            .ok_or_else(|| not_found("Influence data not found"))?;
        if let Some(app_relo_ind) = patch.app_relo_ind {
            data.app_relo_ind = app_relo_ind;
        }
        if let Some(routes) = &patch.traffic_routes {
            data.traffic_routes = routes.clone();
        }
        // Answer 204 like a UDR that does not echo the resource
        Ok(None)
    }

    async fn delete_influence_data(&self, influence_id: &str) -> PeerResult<()> {
        self.log.push(format!("udr delete influence {}", influence_id));
        self.influence
            .lock()
            .remove(influence_id)
            .map(|_| ())
            .ok_or_else(|| not_found("Influence data not found"))
    }
}

/// Processor over in-memory peers
pub struct NefEnv {
    pub processor: Arc<Processor>,
    pub log: Arc<CallLog>,
    pub pcf: Arc<MockPcf>,
    pub udr: Arc<MockUdr>,
    pub notifications: mpsc::Receiver<NotifyBatch>,
}

impl NefEnv {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let config = Arc::new(NefConfig::from_yaml_str(NEF_CONFIG).expect("test config"));
        let log = Arc::new(CallLog::default());
        let pcf = Arc::new(MockPcf::new(log.clone()));
        let udr = Arc::new(MockUdr::new(log.clone()));
        let consumer = Consumer::new(Arc::new(MockNrf), pcf.clone(), udr.clone());
        let (notifier, notifications) = PfdChangeNotifier::new();
        let processor = Arc::new(Processor::new(
            config,
            Arc::new(NefContext::new()),
            consumer,
            Arc::new(notifier),
        ));

        Self {
            processor,
            log,
            pcf,
            udr,
            notifications,
        }
    }

    /// Every batch queued so far
    pub fn drain_notifications(&mut self) -> Vec<NotifyBatch> {
        let mut batches = Vec::new();
        while let Ok(batch) = self.notifications.try_recv() {
            batches.push(batch);
        }
        batches
    }
}

/// Request carrying a JSON body
pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> SbiRequest {
    let mut request = SbiRequest::new(method, uri);
    request.http.set_content(body.to_string());
    request.http.set_header("Content-Type", "application/json");
    request
}
