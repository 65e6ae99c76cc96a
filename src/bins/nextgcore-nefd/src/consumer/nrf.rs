//! NRF Consumer
//!
//! NF registration (nnrf-nfm) and peer discovery (nnrf-disc).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ogs_sbi::{NfProfile, NfStatus, NfType, SbiRequest, SearchResult};

use super::{expect_status, PeerError, PeerResult, PeerUri};
use crate::config::NefConfig;
use crate::context::NefContext;

/// Fixed back-off between registration attempts
pub const RETRY_REGISTER_NRF_DURATION: Duration = Duration::from_secs(2);

const NNRF_NFM_NF_INSTANCES: &str = "/nnrf-nfm/v1/nf-instances";
const NNRF_DISC_NF_INSTANCES: &str = "/nnrf-disc/v1/nf-instances";

#[async_trait]
pub trait NrfService: Send + Sync {
    /// Register the NEF profile, retrying until the NRF accepts it
    async fn register_nf_instance(&self) -> PeerResult<()>;

    /// Remove the NEF profile; best effort
    async fn deregister_nf_instance(&self) -> PeerResult<()>;

    /// Base URI of a `target` instance exposing `service_name`
    async fn search_service_uri(&self, target: NfType, service_name: &str) -> PeerResult<String>;
}

/// NRF consumer over HTTP/2
pub struct HttpNrfService {
    config: Arc<NefConfig>,
    context: Arc<NefContext>,
    nrf: PeerUri,
    retry_interval: Duration,
}

impl HttpNrfService {
    pub fn new(config: Arc<NefConfig>, context: Arc<NefContext>) -> Self {
        let nrf = PeerUri::with_uri(config.nrf_uri());
        Self {
            config,
            context,
            nrf,
            retry_interval: RETRY_REGISTER_NRF_DURATION,
        }
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    fn nrf_uri(&self) -> &str {
        self.nrf.get().unwrap_or_default()
    }

    /// Profile advertised to the NRF
    pub fn build_nf_profile(&self) -> NfProfile {
        let mut profile = NfProfile::new(self.context.nf_instance_id(), NfType::Nef);
        profile.nf_status = NfStatus::Registered;
        profile.ipv4_addresses = vec![self.config.sbi_register_ip()];
        profile.nf_services = self.config.nf_services();
        profile
    }

    async fn try_register(&self, profile: &NfProfile) -> PeerResult<()> {
        let path = format!("{}/{}", NNRF_NFM_NF_INSTANCES, profile.nf_instance_id);
        let request = SbiRequest::put(path)
            .with_json_body(profile)
            .map_err(|e| PeerError::system_failure(e.to_string()))?;
        let response = self.nrf.send(self.nrf_uri(), request).await?;

        match response.status {
            200 => {
                log::info!("NFRegister Update");
                Ok(())
            }
            201 => {
                if let Some(id) = response
                    .location()
                    .and_then(|loc| loc.rsplit('/').next())
                    .filter(|id| !id.is_empty())
                {
                    self.context.set_nf_instance_id(id);
                }
                log::info!("NFRegister Created");
                Ok(())
            }
            _ => Err(PeerError::from_response(&response)),
        }
    }
}

#[async_trait]
impl NrfService for HttpNrfService {
    async fn register_nf_instance(&self) -> PeerResult<()> {
        loop {
            let profile = self.build_nf_profile();
            match self.try_register(&profile).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::info!(
                        "NEF register to NRF failed [{}], sleep {}s and retry",
                        e,
                        self.retry_interval.as_secs()
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }

    async fn deregister_nf_instance(&self) -> PeerResult<()> {
        let path = format!("{}/{}", NNRF_NFM_NF_INSTANCES, self.context.nf_instance_id());
        let response = self.nrf.send(self.nrf_uri(), SbiRequest::delete(path)).await?;
        expect_status(&response, &[204])?;
        log::info!("NFDeregister done");
        Ok(())
    }

    async fn search_service_uri(&self, target: NfType, service_name: &str) -> PeerResult<String> {
        let request = SbiRequest::get(NNRF_DISC_NF_INSTANCES)
            .with_param("target-nf-type", target.to_str())
            .with_param("requester-nf-type", NfType::Nef.to_str())
            .with_param("service-names", service_name);
        let response = self.nrf.send(self.nrf_uri(), request).await?;

        if response.status == 307 {
            return Err(PeerError::system_failure("SearchNFInstances: Temporary Redirect"));
        }
        let result: SearchResult = super::decode_body(&response)?;

        let uri = ogs_sbi::select_service_uri(&result.nf_instances, service_name)
            .ok_or_else(|| PeerError::system_failure(format!("no uri for {} found", service_name)))?;
        log::info!("Search {} uri [{}]", service_name, uri);
        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
info:
  version: 1.0.1
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
"#;

    #[test]
    fn test_build_nf_profile() {
        let config = Arc::new(NefConfig::from_yaml_str(CONFIG).unwrap());
        let context = Arc::new(NefContext::new());
        let nrf = HttpNrfService::new(config, context.clone());

        let profile = nrf.build_nf_profile();
        assert_eq!(profile.nf_instance_id, context.nf_instance_id());
        assert_eq!(profile.nf_type, NfType::Nef);
        assert_eq!(profile.ipv4_addresses, vec!["127.0.0.5"]);
        assert_eq!(profile.nf_services.len(), 2);
        assert_eq!(nrf.nrf_uri(), "http://127.0.0.10:8000");
    }
}
