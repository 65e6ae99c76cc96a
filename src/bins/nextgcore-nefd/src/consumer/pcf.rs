//! PCF Consumer
//!
//! Application sessions on npcf-policyauthorization.

use std::sync::Arc;

use async_trait::async_trait;
use ogs_sbi::{
    decode_path_segment, encode_path_segment, NfType, SbiRequest, SbiServiceType,
    CONTENT_TYPE_MERGE_PATCH,
};

use super::{decode_body, expect_status, NrfService, PeerError, PeerResult, PeerUri};
use crate::models::{AppSessionContext, AppSessionContextUpdateData};

const APP_SESSIONS: &str = "/npcf-policyauthorization/v1/app-sessions";

fn app_session_path(app_session_id: &str) -> String {
    format!("{}/{}", APP_SESSIONS, encode_path_segment(app_session_id))
}

#[async_trait]
pub trait PcfService: Send + Sync {
    /// Create a session; returns its ID (last segment of `Location`) and
    /// the context echoed by the PCF
    async fn post_app_session(&self, asc: &AppSessionContext) -> PeerResult<(String, AppSessionContext)>;

    async fn get_app_session(&self, app_session_id: &str) -> PeerResult<AppSessionContext>;

    async fn patch_app_session(
        &self,
        app_session_id: &str,
        update: &AppSessionContextUpdateData,
    ) -> PeerResult<AppSessionContext>;

    async fn delete_app_session(&self, app_session_id: &str) -> PeerResult<()>;
}

/// PCF consumer over HTTP/2; the PCF is discovered on first use
pub struct HttpPcfService {
    nrf: Arc<dyn NrfService>,
    pcf: PeerUri,
}

impl HttpPcfService {
    pub fn new(nrf: Arc<dyn NrfService>) -> Self {
        Self {
            nrf,
            pcf: PeerUri::new(),
        }
    }

    async fn send(&self, request: SbiRequest) -> PeerResult<ogs_sbi::SbiResponse> {
        let base = self
            .pcf
            .get_or_discover(|| {
                self.nrf
                    .search_service_uri(NfType::Pcf, SbiServiceType::NpcfPolicyauthorization.to_name())
            })
            .await?;
        self.pcf.send(&base, request).await
    }
}

fn json_error(err: serde_json::Error) -> PeerError {
    PeerError::system_failure(err.to_string())
}

#[async_trait]
impl PcfService for HttpPcfService {
    async fn post_app_session(&self, asc: &AppSessionContext) -> PeerResult<(String, AppSessionContext)> {
        let request = SbiRequest::post(APP_SESSIONS)
            .with_json_body(asc)
            .map_err(json_error)?;
        let response = self.send(request).await?;
        expect_status(&response, &[201])?;

        let app_session_id = response
            .location()
            .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(decode_path_segment)
            .ok_or_else(|| PeerError::system_failure("PCF answered without Location"))?;
        let created = match response.http.content {
            Some(_) => response.json_body().map_err(PeerError::invalid_body)?,
            None => asc.clone(),
        };
        log::debug!("PCF app session [{}] created", app_session_id);
        Ok((app_session_id, created))
    }

    async fn get_app_session(&self, app_session_id: &str) -> PeerResult<AppSessionContext> {
        let response = self
            .send(SbiRequest::get(app_session_path(app_session_id)))
            .await?;
        decode_body(&response)
    }

    async fn patch_app_session(
        &self,
        app_session_id: &str,
        update: &AppSessionContextUpdateData,
    ) -> PeerResult<AppSessionContext> {
        let request = SbiRequest::patch(app_session_path(app_session_id))
            .with_typed_json_body(update, CONTENT_TYPE_MERGE_PATCH)
            .map_err(json_error)?;
        let response = self.send(request).await?;
        decode_body(&response)
    }

    async fn delete_app_session(&self, app_session_id: &str) -> PeerResult<()> {
        let request = SbiRequest::post(format!("{}/delete", app_session_path(app_session_id)));
        let response = self.send(request).await?;
        expect_status(&response, &[200, 204])?;
        log::debug!("PCF app session [{}] deleted", app_session_id);
        Ok(())
    }
}
