//! UDR Consumer
//!
//! Application data on nudr-dr: traffic influence data and PFD data.

use std::sync::Arc;

use async_trait::async_trait;
use ogs_sbi::{
    encode_path_segment, NfType, SbiRequest, SbiResponse, SbiServiceType, CONTENT_TYPE_MERGE_PATCH,
};

use super::{decode_body, expect_status, NrfService, PeerError, PeerResult, PeerUri};
use crate::models::{PfdDataForApp, TrafficInfluData, TrafficInfluDataPatch};

const APP_DATA_PFDS: &str = "/nudr-dr/v1/application-data/pfds";
const APP_DATA_INFLUENCE_DATA: &str = "/nudr-dr/v1/application-data/influenceData";

fn pfd_data_path(app_id: &str) -> String {
    format!("{}/{}", APP_DATA_PFDS, encode_path_segment(app_id))
}

fn influence_data_path(influence_id: &str) -> String {
    format!("{}/{}", APP_DATA_INFLUENCE_DATA, encode_path_segment(influence_id))
}

#[async_trait]
pub trait UdrService: Send + Sync {
    /// PFD data of `app_ids`; every application when empty
    async fn get_pfd_datas(&self, app_ids: &[String]) -> PeerResult<Vec<PfdDataForApp>>;

    async fn get_pfd_data(&self, app_id: &str) -> PeerResult<PfdDataForApp>;

    async fn put_pfd_data(&self, app_id: &str, data: &PfdDataForApp) -> PeerResult<()>;

    async fn delete_pfd_data(&self, app_id: &str) -> PeerResult<()>;

    async fn get_influence_data(&self, influence_id: &str) -> PeerResult<TrafficInfluData>;

    async fn put_influence_data(&self, influence_id: &str, data: &TrafficInfluData) -> PeerResult<()>;

    /// Returns the updated data when the UDR sends it back
    async fn patch_influence_data(
        &self,
        influence_id: &str,
        patch: &TrafficInfluDataPatch,
    ) -> PeerResult<Option<TrafficInfluData>>;

    async fn delete_influence_data(&self, influence_id: &str) -> PeerResult<()>;
}

/// UDR consumer over HTTP/2; the UDR is discovered on first use
pub struct HttpUdrService {
    nrf: Arc<dyn NrfService>,
    udr: PeerUri,
}

impl HttpUdrService {
    pub fn new(nrf: Arc<dyn NrfService>) -> Self {
        Self {
            nrf,
            udr: PeerUri::new(),
        }
    }

    async fn send(&self, request: SbiRequest) -> PeerResult<SbiResponse> {
        let base = self
            .udr
            .get_or_discover(|| self.nrf.search_service_uri(NfType::Udr, SbiServiceType::NudrDr.to_name()))
            .await?;
        self.udr.send(&base, request).await
    }
}

fn json_error(err: serde_json::Error) -> PeerError {
    PeerError::system_failure(err.to_string())
}

#[async_trait]
impl UdrService for HttpUdrService {
    async fn get_pfd_datas(&self, app_ids: &[String]) -> PeerResult<Vec<PfdDataForApp>> {
        let mut request = SbiRequest::get(APP_DATA_PFDS);
        if !app_ids.is_empty() {
            request = request.with_param("appId", app_ids.join(","));
        }
        let response = self.send(request).await?;
        decode_body(&response)
    }

    async fn get_pfd_data(&self, app_id: &str) -> PeerResult<PfdDataForApp> {
        let response = self
            .send(SbiRequest::get(pfd_data_path(app_id)))
            .await?;
        decode_body(&response)
    }

    async fn put_pfd_data(&self, app_id: &str, data: &PfdDataForApp) -> PeerResult<()> {
        let request = SbiRequest::put(pfd_data_path(app_id))
            .with_json_body(data)
            .map_err(json_error)?;
        let response = self.send(request).await?;
        expect_status(&response, &[200, 201])
    }

    async fn delete_pfd_data(&self, app_id: &str) -> PeerResult<()> {
        let response = self
            .send(SbiRequest::delete(pfd_data_path(app_id)))
            .await?;
        expect_status(&response, &[204])
    }

    async fn get_influence_data(&self, influence_id: &str) -> PeerResult<TrafficInfluData> {
        let response = self
            .send(SbiRequest::get(influence_data_path(influence_id)))
            .await?;
        decode_body(&response)
    }

    async fn put_influence_data(&self, influence_id: &str, data: &TrafficInfluData) -> PeerResult<()> {
        let request = SbiRequest::put(influence_data_path(influence_id))
            .with_json_body(data)
            .map_err(json_error)?;
        let response = self.send(request).await?;
        expect_status(&response, &[200, 201, 204])
    }

    async fn patch_influence_data(
        &self,
        influence_id: &str,
        patch: &TrafficInfluDataPatch,
    ) -> PeerResult<Option<TrafficInfluData>> {
        let request = SbiRequest::patch(influence_data_path(influence_id))
            .with_typed_json_body(patch, CONTENT_TYPE_MERGE_PATCH)
            .map_err(json_error)?;
        let response = self.send(request).await?;
        match response.status {
            204 => Ok(None),
            _ => decode_body(&response).map(Some),
        }
    }

    async fn delete_influence_data(&self, influence_id: &str) -> PeerResult<()> {
        let response = self
            .send(SbiRequest::delete(influence_data_path(influence_id)))
            .await?;
        expect_status(&response, &[204])
    }
}
