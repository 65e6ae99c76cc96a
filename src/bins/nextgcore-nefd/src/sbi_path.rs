//! NEF SBI Path Functions
//!
//! Routes inbound SBI requests onto [`Processor`] operations and encodes
//! the answers. Paths are `/{service}/{version}/{resource...}`:
//!
//! - `/3gpp-pfd-management/v1/{afId}/transactions[/{transId}[/applications/{appId}]]`
//! - `/nnef-pfdmanagement/v1/applications[/{appId}]`, `/subscriptions[/{subId}]`
//! - `/3gpp-traffic-influence/v1/{afId}/subscriptions[/{subId}]`
//! - `/nnef-callback/v1/notification/smf`
//! - `/nnef-oam/v1/`

use std::sync::Arc;

use ogs_sbi::{
    send_bad_request, send_method_not_allowed, send_not_found, SbiRequest, SbiResponse,
    CONTENT_TYPE_JSON, CONTENT_TYPE_PROBLEM,
};
use serde::de::DeserializeOwned;

use crate::config::{
    SERVICE_NEF_CALLBACK, SERVICE_NEF_OAM, SERVICE_NEF_PFD, SERVICE_PFD_MNG, SERVICE_TRAFF_INFLU,
};
use crate::processor::{HandlerResponse, Processor};

/// Query parameter of `GET /nnef-pfdmanagement/v1/applications`
pub const PARAM_APPLICATION_IDS: &str = "application-ids";

/// SBI request handler for NEF
pub async fn nef_sbi_request_handler(processor: Arc<Processor>, request: SbiRequest) -> SbiResponse {
    let method = request.header.method.as_str();
    let uri = request.header.uri.as_str();
    log::debug!("NEF SBI request: {} {}", method, uri);

    let Some(service) = request.header.service_name.as_deref() else {
        return send_not_found("Invalid path", None);
    };
    let resource: Vec<&str> = request.header.resource.iter().map(String::as_str).collect();

    let routed = match service {
        SERVICE_PFD_MNG => pfd_management(&processor, method, &resource, &request).await,
        SERVICE_NEF_PFD => pfdf(&processor, method, &resource, &request).await,
        SERVICE_TRAFF_INFLU => traffic_influence(&processor, method, &resource, &request).await,
        SERVICE_NEF_CALLBACK => callback(&processor, method, &resource, &request),
        SERVICE_NEF_OAM => oam(&processor, method, &resource),
        _ => {
            log::warn!("Unknown NEF service: {} {}", method, uri);
            return send_not_found(&format!("Unknown service {}", service), None);
        }
    };

    match routed {
        Some(Ok(response)) => build_response(response),
        Some(Err(response)) => response,
        None => {
            log::warn!("Unknown NEF request: {} {}", method, uri);
            send_method_not_allowed(method, uri)
        }
    }
}

/// `None` when no route matches; `Err` carries an already encoded 400
type Routed = Option<Result<HandlerResponse, SbiResponse>>;

async fn pfd_management(
    p: &Processor,
    method: &str,
    resource: &[&str],
    request: &SbiRequest,
) -> Routed {
    let response = match (method, resource) {
        ("GET", [af_id, "transactions"]) => p.get_pfd_management_transactions(af_id).await,
        ("POST", [af_id, "transactions"]) => match decode_body(request) {
            Ok(body) => p.post_pfd_management_transactions(af_id, body).await,
            Err(e) => return Some(Err(e)),
        },
        ("DELETE", [af_id, "transactions"]) => p.delete_pfd_management_transactions(af_id).await,
        ("GET", [af_id, "transactions", trans_id]) => {
            p.get_individual_pfd_management_transaction(af_id, trans_id).await
        }
        ("PUT", [af_id, "transactions", trans_id]) => match decode_body(request) {
            Ok(body) => {
                p.put_individual_pfd_management_transaction(af_id, trans_id, body)
                    .await
            }
            Err(e) => return Some(Err(e)),
        },
        ("DELETE", [af_id, "transactions", trans_id]) => {
            p.delete_individual_pfd_management_transaction(af_id, trans_id)
                .await
        }
        ("GET", [af_id, "transactions", trans_id, "applications", app_id]) => {
            p.get_individual_application_pfd_management(af_id, trans_id, app_id)
                .await
        }
        ("PUT", [af_id, "transactions", trans_id, "applications", app_id]) => {
            match decode_body(request) {
                Ok(body) => {
                    p.put_individual_application_pfd_management(af_id, trans_id, app_id, body)
                        .await
                }
                Err(e) => return Some(Err(e)),
            }
        }
        ("PATCH", [af_id, "transactions", trans_id, "applications", app_id]) => {
            match decode_body(request) {
                Ok(body) => {
                    p.patch_individual_application_pfd_management(af_id, trans_id, app_id, body)
                        .await
                }
                Err(e) => return Some(Err(e)),
            }
        }
        ("DELETE", [af_id, "transactions", trans_id, "applications", app_id]) => {
            p.delete_individual_application_pfd_management(af_id, trans_id, app_id)
                .await
        }
        _ => return None,
    };
    Some(Ok(response))
}

async fn pfdf(p: &Processor, method: &str, resource: &[&str], request: &SbiRequest) -> Routed {
    let response = match (method, resource) {
        ("GET", ["applications"]) => {
            let app_ids = application_ids(request);
            p.get_applications_pfd(&app_ids).await
        }
        ("GET", ["applications", app_id]) => p.get_individual_application_pfd(app_id).await,
        ("POST", ["subscriptions"]) => match decode_body(request) {
            Ok(body) => p.post_pfd_subscriptions(body),
            Err(e) => return Some(Err(e)),
        },
        ("DELETE", ["subscriptions", sub_id]) => p.delete_individual_pfd_subscription(sub_id),
        _ => return None,
    };
    Some(Ok(response))
}

async fn traffic_influence(
    p: &Processor,
    method: &str,
    resource: &[&str],
    request: &SbiRequest,
) -> Routed {
    let response = match (method, resource) {
        ("GET", [af_id, "subscriptions"]) => p.get_traffic_influence_subscriptions(af_id).await,
        ("POST", [af_id, "subscriptions"]) => match decode_body(request) {
            Ok(body) => p.post_traffic_influence_subscription(af_id, body).await,
            Err(e) => return Some(Err(e)),
        },
        ("GET", [af_id, "subscriptions", sub_id]) => {
            p.get_individual_traffic_influence_subscription(af_id, sub_id)
                .await
        }
        ("PUT", [af_id, "subscriptions", sub_id]) => match decode_body(request) {
            Ok(body) => {
                p.put_individual_traffic_influence_subscription(af_id, sub_id, body)
                    .await
            }
            Err(e) => return Some(Err(e)),
        },
        ("PATCH", [af_id, "subscriptions", sub_id]) => match decode_body(request) {
            Ok(body) => {
                p.patch_individual_traffic_influence_subscription(af_id, sub_id, body)
                    .await
            }
            Err(e) => return Some(Err(e)),
        },
        ("DELETE", [af_id, "subscriptions", sub_id]) => {
            p.delete_individual_traffic_influence_subscription(af_id, sub_id)
                .await
        }
        _ => return None,
    };
    Some(Ok(response))
}

fn callback(p: &Processor, method: &str, resource: &[&str], request: &SbiRequest) -> Routed {
    match (method, resource) {
        ("POST", ["notification", "smf"]) => Some(
            decode_body(request).map(|body| p.smf_notification(body)),
        ),
        _ => None,
    }
}

fn oam(p: &Processor, method: &str, resource: &[&str]) -> Routed {
    match (method, resource) {
        ("GET", []) => Some(Ok(p.get_oam_status())),
        _ => None,
    }
}

fn decode_body<T: DeserializeOwned>(request: &SbiRequest) -> Result<T, SbiResponse> {
    let Some(content) = request.http.content.as_deref() else {
        return Err(send_bad_request("Missing request body", Some("MISSING_BODY")));
    };
    serde_json::from_str(content)
        .map_err(|e| send_bad_request(&format!("Invalid JSON: {}", e), Some("INVALID_JSON")))
}

/// `application-ids` as a comma separated list; absent means every application
fn application_ids(request: &SbiRequest) -> Vec<String> {
    request
        .http
        .get_param(PARAM_APPLICATION_IDS)
        .map(|ids| {
            ids.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Encode a processor answer; problem bodies get `application/problem+json`
pub fn build_response(response: HandlerResponse) -> SbiResponse {
    let mut sbi_response = SbiResponse::with_status(response.status);
    if let Some(body) = &response.body {
        let content_type = if response.status >= 400 && body.get("status").is_some() {
            CONTENT_TYPE_PROBLEM
        } else {
            CONTENT_TYPE_JSON
        };
        sbi_response = sbi_response.with_body(body.to_string(), content_type);
    }
    for (key, value) in response.headers {
        sbi_response = sbi_response.with_header(key, value);
    }
    sbi_response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PfdManagement, TrafficInfluSub};
    use crate::processor::test_support::harness;
    use ogs_sbi::ProblemDetails;

    fn post(uri: &str, body: &str) -> SbiRequest {
        let mut request = SbiRequest::post(uri);
        request.http.set_content(body);
        request
    }

    #[tokio::test]
    async fn test_pfd_transaction_routes() {
        let h = harness();
        let processor = Arc::new(h.processor);

        let body = r#"{"pfdDatas": {"app1": {"externalAppId": "app1",
            "pfds": {"pfd1": {"pfdId": "pfd1", "domainNames": ["www.example.com"]}}}}}"#;
        let rsp = nef_sbi_request_handler(
            processor.clone(),
            post("/3gpp-pfd-management/v1/af1/transactions", body),
        )
        .await;
        assert_eq!(rsp.status, 201);
        assert_eq!(
            rsp.http.get_header("content-type").map(String::as_str),
            Some(CONTENT_TYPE_JSON)
        );
        let pfd_mng: PfdManagement = rsp.json_body().unwrap();
        assert!(pfd_mng.pfd_datas.contains_key("app1"));

        let rsp = nef_sbi_request_handler(
            processor.clone(),
            SbiRequest::get("/3gpp-pfd-management/v1/af1/transactions/1/applications/app1"),
        )
        .await;
        assert_eq!(rsp.status, 200);

        let rsp = nef_sbi_request_handler(
            processor.clone(),
            SbiRequest::get("/nnef-pfdmanagement/v1/applications").with_param("application-ids", "app1,app2"),
        )
        .await;
        assert_eq!(rsp.status, 200);
        let datas: Vec<serde_json::Value> = rsp.json_body().unwrap();
        assert_eq!(datas.len(), 1);
    }

    #[tokio::test]
    async fn test_body_errors() {
        let processor = Arc::new(harness().processor);

        let rsp = nef_sbi_request_handler(
            processor.clone(),
            SbiRequest::post("/3gpp-traffic-influence/v1/af1/subscriptions"),
        )
        .await;
        assert_eq!(rsp.status, 400);
        assert_eq!(
            rsp.json_body::<ProblemDetails>().unwrap().cause.as_deref(),
            Some("MISSING_BODY")
        );

        let rsp = nef_sbi_request_handler(
            processor,
            post("/3gpp-traffic-influence/v1/af1/subscriptions", "{not json"),
        )
        .await;
        assert_eq!(rsp.status, 400);
        assert_eq!(
            rsp.json_body::<ProblemDetails>().unwrap().cause.as_deref(),
            Some("INVALID_JSON")
        );
    }

    #[tokio::test]
    async fn test_traffic_influence_location_header() {
        let processor = Arc::new(harness().processor);
        let ti_sub = TrafficInfluSub {
            dnn: "internet".to_string(),
            af_app_id: "app1".to_string(),
            any_ue_ind: true,
            ..Default::default()
        };
        let body = serde_json::to_string(&ti_sub).unwrap();
        let rsp = nef_sbi_request_handler(
            processor,
            post("/3gpp-traffic-influence/v1/af1/subscriptions", &body),
        )
        .await;
        assert_eq!(rsp.status, 201);
        assert_eq!(
            rsp.location(),
            Some("http://127.0.0.5:8000/3gpp-traffic-influence/v1/af1/subscriptions/1")
        );
    }

    #[tokio::test]
    async fn test_problem_content_type() {
        let processor = Arc::new(harness().processor);
        let rsp = nef_sbi_request_handler(
            processor,
            SbiRequest::get("/3gpp-traffic-influence/v1/af9/subscriptions"),
        )
        .await;
        assert_eq!(rsp.status, 404);
        assert_eq!(
            rsp.http.get_header("Content-Type").map(String::as_str),
            Some(CONTENT_TYPE_PROBLEM)
        );
    }

    #[tokio::test]
    async fn test_unknown_routes() {
        let processor = Arc::new(harness().processor);
        let rsp = nef_sbi_request_handler(processor.clone(), SbiRequest::get("/nudm-sdm/v2/x")).await;
        assert_eq!(rsp.status, 404);

        let rsp = nef_sbi_request_handler(
            processor.clone(),
            SbiRequest::put("/nnef-pfdmanagement/v1/subscriptions"),
        )
        .await;
        assert_eq!(rsp.status, 405);

        let rsp = nef_sbi_request_handler(processor, SbiRequest::get("/nnef-oam/v1/")).await;
        assert_eq!(rsp.status, 200);
    }

    #[test]
    fn test_application_ids_param() {
        let request = SbiRequest::get("/nnef-pfdmanagement/v1/applications")
            .with_param(PARAM_APPLICATION_IDS, "app1, app2,,app3");
        assert_eq!(application_ids(&request), vec!["app1", "app2", "app3"]);
        assert!(application_ids(&SbiRequest::get("/")).is_empty());
    }
}
