//! NEF Processor
//!
//! One method per exposed operation. Methods take decoded path, query and
//! body values and answer with a [`HandlerResponse`]; encoding is left to
//! [`crate::sbi_path`].

mod callback;
mod pfd;
mod pfdf;
mod ti;

use std::sync::Arc;

use ogs_sbi::{encode_path_segment, ProblemDetails};
use serde::Serialize;

use crate::config::{
    NefConfig, SERVICE_NEF_CALLBACK, SERVICE_NEF_PFD, SERVICE_PFD_MNG, SERVICE_TRAFF_INFLU,
};
use crate::consumer::Consumer;
use crate::context::NefContext;
use crate::error::{NefError, NefResult};
use crate::models::NefStatus;
use crate::notifier::PfdChangeNotifier;

/// Status, headers and JSON body of one answer
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HandlerResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn no_content() -> Self {
        Self::new(204)
    }

    pub fn with_body<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Self {
                body: Some(value),
                ..Self::new(status)
            },
            Err(e) => {
                log::error!("Response body encoding failed: {}", e);
                Self::problem(&ProblemDetails::system_failure(e.to_string()))
            }
        }
    }

    pub fn problem(problem: &ProblemDetails) -> Self {
        Self::with_body(problem.status_code(), problem)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded into `T`
    pub fn body_as<T: for<'de> serde::Deserialize<'de>>(&self) -> Option<T> {
        self.body
            .clone()
            .and_then(|body| serde_json::from_value(body).ok())
    }
}

impl From<NefError> for HandlerResponse {
    fn from(err: NefError) -> Self {
        match err {
            NefError::PfdsNotCreated(reports) => HandlerResponse::with_body(500, &reports),
            err => HandlerResponse::problem(&err.to_problem()),
        }
    }
}

fn respond(result: NefResult<HandlerResponse>) -> HandlerResponse {
    result.unwrap_or_else(|err| {
        log::warn!("{}", err);
        err.into()
    })
}

/// Business logic shared by every API family
pub struct Processor {
    config: Arc<NefConfig>,
    context: Arc<NefContext>,
    consumer: Consumer,
    notifier: Arc<PfdChangeNotifier>,
}

impl Processor {
    pub fn new(
        config: Arc<NefConfig>,
        context: Arc<NefContext>,
        consumer: Consumer,
        notifier: Arc<PfdChangeNotifier>,
    ) -> Self {
        Self {
            config,
            context,
            consumer,
            notifier,
        }
    }

    pub fn config(&self) -> &NefConfig {
        &self.config
    }

    pub fn context(&self) -> &NefContext {
        &self.context
    }

    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    pub fn notifier(&self) -> &PfdChangeNotifier {
        &self.notifier
    }

    fn service_uri(&self, service: &str) -> String {
        self.config.service_uri(service).unwrap_or_default()
    }

    /// `{sbi}/3gpp-pfd-management/v1/{afId}/transactions/{transId}`
    fn gen_pfd_management_uri(&self, af_id: &str, trans_id: &str) -> String {
        format!(
            "{}/{}/transactions/{}",
            self.service_uri(SERVICE_PFD_MNG),
            encode_path_segment(af_id),
            encode_path_segment(trans_id)
        )
    }

    fn gen_pfd_data_uri(&self, af_id: &str, trans_id: &str, app_id: &str) -> String {
        format!(
            "{}/applications/{}",
            self.gen_pfd_management_uri(af_id, trans_id),
            encode_path_segment(app_id)
        )
    }

    fn gen_pfd_subscription_uri(&self, sub_id: &str) -> String {
        format!(
            "{}/subscriptions/{}",
            self.service_uri(SERVICE_NEF_PFD),
            encode_path_segment(sub_id)
        )
    }

    fn gen_traffic_influ_sub_uri(&self, af_id: &str, sub_id: &str) -> String {
        format!(
            "{}/{}/subscriptions/{}",
            self.service_uri(SERVICE_TRAFF_INFLU),
            encode_path_segment(af_id),
            encode_path_segment(sub_id)
        )
    }

    /// Where the SMF posts UP path change events
    fn smf_notification_uri(&self) -> String {
        format!("{}/notification/smf", self.service_uri(SERVICE_NEF_CALLBACK))
    }

    /// Registry counters for nnef-oam
    pub fn get_oam_status(&self) -> HandlerResponse {
        let stats = self.context.stats();
        let status = NefStatus {
            nf_instance_id: self.context.nf_instance_id(),
            num_af_contexts: stats.af_contexts,
            num_subscriptions: stats.subscriptions,
            num_pfd_transactions: stats.pfd_transactions,
            num_pfd_subscriptions: self.notifier.num_of_subs(),
        };
        HandlerResponse::with_body(200, &status)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::harness;
    use super::*;
    use crate::models::{FailureCode, PfdReport, PfdReports};

    #[test]
    fn test_uris() {
        let h = harness();
        let p = &h.processor;
        assert_eq!(
            p.gen_pfd_data_uri("af1", "1", "app1"),
            "http://127.0.0.5:8000/3gpp-pfd-management/v1/af1/transactions/1/applications/app1"
        );
        assert_eq!(
            p.gen_pfd_subscription_uri("3"),
            "http://127.0.0.5:8000/nnef-pfdmanagement/v1/subscriptions/3"
        );
        assert_eq!(
            p.gen_traffic_influ_sub_uri("af1", "2"),
            "http://127.0.0.5:8000/3gpp-traffic-influence/v1/af1/subscriptions/2"
        );
        assert_eq!(
            p.smf_notification_uri(),
            "http://127.0.0.5:8000/nnef-callback/v1/notification/smf"
        );
    }

    #[test]
    fn test_error_responses() {
        let rsp = HandlerResponse::from(NefError::Malformed("Absent of Pfd.PfdID".to_string()));
        assert_eq!(rsp.status, 400);
        let problem: ProblemDetails = rsp.body_as().unwrap();
        assert_eq!(problem.detail.as_deref(), Some("Absent of Pfd.PfdID"));

        let mut reports = PfdReports::new();
        reports.insert(
            "MALFUNCTION".to_string(),
            PfdReport::new("app1", FailureCode::Malfunction),
        );
        let rsp = HandlerResponse::from(NefError::PfdsNotCreated(reports.clone()));
        assert_eq!(rsp.status, 500);
        assert_eq!(rsp.body_as::<PfdReports>().unwrap(), reports);
    }

    #[test]
    fn test_oam_status() {
        let h = harness();
        let ctx = h.processor.context();
        ctx.add_af_context(ctx.new_af_context("af1"));
        let rsp = h.processor.get_oam_status();
        let status: NefStatus = rsp.body_as().unwrap();
        assert_eq!(status.num_af_contexts, 1);
        assert_eq!(status.nf_instance_id, h.processor.context().nf_instance_id());
    }
}
