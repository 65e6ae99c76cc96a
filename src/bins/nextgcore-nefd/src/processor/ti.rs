//! Traffic Influence (3gpp-traffic-influence)
//!
//! A subscription is routed once, at creation: individual UEs become PCF
//! application sessions, UE groups and "any UE" become UDR influence data.
//! Every later operation follows the stored backend.

use std::sync::Arc;

use super::{respond, HandlerResponse, Processor};
use crate::context::{AfContext, AfSubscription, SubscriptionBackend};
use crate::error::{NefError, NefResult};
use crate::models::{
    AfRoutingRequirementRm, AppSessionContextUpdateData, TrafficInfluDataPatch, TrafficInfluSub,
    TrafficInfluSubPatch,
};

pub const DETAIL_NO_AF_SERVICE_ID_OR_DNN: &str = "Missing AfServiceId or Dnn";
pub const DETAIL_NO_APP_OR_FILTERS: &str = "Missing one of afAppId, trafficFilters or ethTrafficFilters";
pub const DETAIL_NO_UE_TARGET: &str = "Missing one of Gpsi, Ipv4Addr, Ipv6Addr, ExternalGroupId, AnyUeInd";
pub const DETAIL_NO_ROUTING: &str = "Not individual UE case, nor group case";
pub const DETAIL_AF_NOT_FOUND: &str = "AF is not found";
pub const DETAIL_SUB_NOT_FOUND: &str = "Subscription is not found";

/// Peer chosen for a new subscription
enum Route {
    Pcf,
    Udr,
}

impl Processor {
    pub async fn get_traffic_influence_subscriptions(&self, af_id: &str) -> HandlerResponse {
        log::info!("GetTrafficInfluenceSubscription - afID[{}]", af_id);
        respond(self.list_ti_subscriptions(af_id).await)
    }

    pub async fn post_traffic_influence_subscription(
        &self,
        af_id: &str,
        ti_sub: TrafficInfluSub,
    ) -> HandlerResponse {
        log::info!("PostTrafficInfluenceSubscription - afID[{}]", af_id);
        respond(self.create_ti_subscription(af_id, ti_sub).await)
    }

    pub async fn get_individual_traffic_influence_subscription(
        &self,
        af_id: &str,
        sub_id: &str,
    ) -> HandlerResponse {
        log::info!(
            "GetIndividualTrafficInfluenceSubscription - afID[{}], subscID[{}]",
            af_id,
            sub_id
        );
        let result = async {
            let (_, sub) = self.lookup_ti_subscription(af_id, sub_id)?;
            let ti_sub = self.fetch_ti_subscription(af_id, &sub).await?;
            Ok::<_, NefError>(HandlerResponse::with_body(200, &ti_sub))
        };
        respond(result.await)
    }

    pub async fn put_individual_traffic_influence_subscription(
        &self,
        af_id: &str,
        sub_id: &str,
        ti_sub: TrafficInfluSub,
    ) -> HandlerResponse {
        log::info!(
            "PutIndividualTrafficInfluenceSubscription - afID[{}], subscID[{}]",
            af_id,
            sub_id
        );
        respond(self.replace_ti_subscription(af_id, sub_id, ti_sub).await)
    }

    pub async fn patch_individual_traffic_influence_subscription(
        &self,
        af_id: &str,
        sub_id: &str,
        patch: TrafficInfluSubPatch,
    ) -> HandlerResponse {
        log::info!(
            "PatchIndividualTrafficInfluenceSubscription - afID[{}], subscID[{}]",
            af_id,
            sub_id
        );
        respond(self.modify_ti_subscription(af_id, sub_id, patch).await)
    }

    pub async fn delete_individual_traffic_influence_subscription(
        &self,
        af_id: &str,
        sub_id: &str,
    ) -> HandlerResponse {
        log::info!(
            "DeleteIndividualTrafficInfluenceSubscription - afID[{}], subscID[{}]",
            af_id,
            sub_id
        );
        let result = async {
            let (af, sub) = self.lookup_ti_subscription(af_id, sub_id)?;
            match &sub.backend {
                Some(SubscriptionBackend::Pcf { app_session_id }) => {
                    self.consumer.pcf.delete_app_session(app_session_id).await?
                }
                Some(SubscriptionBackend::Udr { influence_id }) => {
                    self.consumer.udr.delete_influence_data(influence_id).await?
                }
                None => {}
            }
            af.remove_subscription(sub_id)?;
            Ok::<_, NefError>(HandlerResponse::no_content())
        };
        respond(result.await)
    }

    async fn list_ti_subscriptions(&self, af_id: &str) -> NefResult<HandlerResponse> {
        let af = self
            .context
            .get_af_context(af_id)
            .ok_or_else(|| NefError::NotFound(DETAIL_AF_NOT_FOUND.to_string()))?;

        let mut ti_subs = Vec::new();
        for sub in af.subscriptions() {
            ti_subs.push(self.fetch_ti_subscription(af_id, &sub).await?);
        }
        Ok(HandlerResponse::with_body(200, &ti_subs))
    }

    async fn create_ti_subscription(
        &self,
        af_id: &str,
        mut ti_sub: TrafficInfluSub,
    ) -> NefResult<HandlerResponse> {
        validate_traffic_influence_data(&ti_sub)?;
        let route = route_of(&ti_sub)?;

        // A new AF is registered only once the peer accepts the subscription
        let known_af = self.context.get_af_context(af_id);
        let is_new_af = known_af.is_none();
        let af = known_af.unwrap_or_else(|| self.context.new_af_context(af_id));
        let mut sub = self
            .context
            .new_subscription(&af, ti_sub.notification_destination.clone());
        let notif_uri = self.smf_notification_uri();

        let backend = match route {
            Route::Pcf => {
                let asc = ti_sub.to_app_session_context(&sub.notif_corre_id, &notif_uri);
                let (app_session_id, _) = self.consumer.pcf.post_app_session(&asc).await?;
                SubscriptionBackend::Pcf { app_session_id }
            }
            Route::Udr => {
                let influence_id = uuid::Uuid::new_v4().to_string();
                let data = ti_sub.to_influence_data(&sub.notif_corre_id, &notif_uri);
                self.consumer
                    .udr
                    .put_influence_data(&influence_id, &data)
                    .await?;
                SubscriptionBackend::Udr { influence_id }
            }
        };
        log::debug!(
            "Subscription [{}] of AF [{}] backed by {:?}",
            sub.sub_id,
            af_id,
            backend
        );
        sub.backend = Some(backend);

        let location = self.gen_traffic_influ_sub_uri(af_id, &sub.sub_id);
        af.add_subscription(sub);
        if is_new_af {
            self.context.add_af_context(af);
        }

        ti_sub.self_uri = Some(location.clone());
        Ok(HandlerResponse::with_body(201, &ti_sub).with_header("Location", location))
    }

    async fn replace_ti_subscription(
        &self,
        af_id: &str,
        sub_id: &str,
        mut ti_sub: TrafficInfluSub,
    ) -> NefResult<HandlerResponse> {
        let (af, mut sub) = self.lookup_ti_subscription(af_id, sub_id)?;
        validate_traffic_influence_data(&ti_sub)?;

        match &sub.backend {
            Some(SubscriptionBackend::Pcf { app_session_id }) => {
                let update = AppSessionContextUpdateData {
                    af_rout_req: Some(AfRoutingRequirementRm {
                        app_reloc: Some(ti_sub.app_relo_ind),
                        route_to_locs: Some(ti_sub.traffic_routes.clone()),
                    }),
                };
                self.consumer
                    .pcf
                    .patch_app_session(app_session_id, &update)
                    .await?;
            }
            Some(SubscriptionBackend::Udr { influence_id }) => {
                let data = ti_sub.to_influence_data(&sub.notif_corre_id, &self.smf_notification_uri());
                self.consumer
                    .udr
                    .put_influence_data(influence_id, &data)
                    .await?;
            }
            None => return Err(NefError::SystemFailure(DETAIL_NO_ROUTING.to_string())),
        }

        self.update_notification_uri(&af, &mut sub, Some(ti_sub.notification_destination.as_str()));
        ti_sub.self_uri = Some(self.gen_traffic_influ_sub_uri(af_id, sub_id));
        Ok(HandlerResponse::with_body(200, &ti_sub))
    }

    async fn modify_ti_subscription(
        &self,
        af_id: &str,
        sub_id: &str,
        patch: TrafficInfluSubPatch,
    ) -> NefResult<HandlerResponse> {
        let (af, mut sub) = self.lookup_ti_subscription(af_id, sub_id)?;

        let mut ti_sub = match &sub.backend {
            Some(SubscriptionBackend::Pcf { app_session_id }) => {
                let update = AppSessionContextUpdateData::from(&patch);
                let asc = self
                    .consumer
                    .pcf
                    .patch_app_session(app_session_id, &update)
                    .await?;
                TrafficInfluSub::from(&asc)
            }
            Some(SubscriptionBackend::Udr { influence_id }) => {
                let data_patch = TrafficInfluDataPatch::from(&patch);
                let data = match self
                    .consumer
                    .udr
                    .patch_influence_data(influence_id, &data_patch)
                    .await?
                {
                    Some(data) => data,
                    None => self.consumer.udr.get_influence_data(influence_id).await?,
                };
                TrafficInfluSub::from(&data)
            }
            None => return Err(NefError::SystemFailure(DETAIL_NO_ROUTING.to_string())),
        };

        self.update_notification_uri(&af, &mut sub, patch.notification_destination.as_deref());
        ti_sub.notification_destination = sub.notification_uri;
        ti_sub.self_uri = Some(self.gen_traffic_influ_sub_uri(af_id, sub_id));
        Ok(HandlerResponse::with_body(200, &ti_sub))
    }

    fn lookup_ti_subscription(
        &self,
        af_id: &str,
        sub_id: &str,
    ) -> NefResult<(Arc<AfContext>, AfSubscription)> {
        let af = self
            .context
            .get_af_context(af_id)
            .ok_or_else(|| NefError::NotFound(DETAIL_AF_NOT_FOUND.to_string()))?;
        let sub = af
            .get_subscription(sub_id)
            .ok_or_else(|| NefError::NotFound(DETAIL_SUB_NOT_FOUND.to_string()))?;
        Ok((af, sub))
    }

    /// Current state of `sub` as held by its backing peer
    async fn fetch_ti_subscription(
        &self,
        af_id: &str,
        sub: &AfSubscription,
    ) -> NefResult<TrafficInfluSub> {
        let mut ti_sub = match &sub.backend {
            Some(SubscriptionBackend::Pcf { app_session_id }) => {
                let asc = self.consumer.pcf.get_app_session(app_session_id).await?;
                TrafficInfluSub::from(&asc)
            }
            Some(SubscriptionBackend::Udr { influence_id }) => {
                let data = self.consumer.udr.get_influence_data(influence_id).await?;
                TrafficInfluSub::from(&data)
            }
            None => return Err(NefError::SystemFailure(DETAIL_NO_ROUTING.to_string())),
        };
        ti_sub.notification_destination = sub.notification_uri.clone();
        ti_sub.self_uri = Some(self.gen_traffic_influ_sub_uri(af_id, &sub.sub_id));
        Ok(ti_sub)
    }

    fn update_notification_uri(&self, af: &AfContext, sub: &mut AfSubscription, uri: Option<&str>) {
        match uri {
            Some(uri) if !uri.is_empty() && uri != sub.notification_uri => {
                sub.notification_uri = uri.to_string();
                af.add_subscription(sub.clone());
            }
            _ => {}
        }
    }
}

fn validate_traffic_influence_data(ti_sub: &TrafficInfluSub) -> NefResult<()> {
    if ti_sub.af_service_id.is_empty() && ti_sub.dnn.is_empty() {
        return Err(NefError::Malformed(DETAIL_NO_AF_SERVICE_ID_OR_DNN.to_string()));
    }
    if ti_sub.af_app_id.is_empty()
        && ti_sub.traffic_filters.is_empty()
        && ti_sub.eth_traffic_filters.is_empty()
    {
        return Err(NefError::Malformed(DETAIL_NO_APP_OR_FILTERS.to_string()));
    }
    if !ti_sub.is_individual_ue() && !ti_sub.is_group_or_any_ue() {
        return Err(NefError::Malformed(DETAIL_NO_UE_TARGET.to_string()));
    }
    Ok(())
}

fn route_of(ti_sub: &TrafficInfluSub) -> NefResult<Route> {
    if ti_sub.is_individual_ue() {
        Ok(Route::Pcf)
    } else if ti_sub.is_group_or_any_ue() {
        Ok(Route::Udr)
    } else {
        Err(NefError::Malformed(DETAIL_NO_ROUTING.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::harness;
    use super::*;
    use crate::models::RouteToLocation;
    use ogs_sbi::ProblemDetails;

    fn individual() -> TrafficInfluSub {
        TrafficInfluSub {
            af_service_id: "svc1".to_string(),
            af_app_id: "app1".to_string(),
            dnn: "internet".to_string(),
            gpsi: "msisdn-0900000000".to_string(),
            notification_destination: "http://af/ti".to_string(),
            ..Default::default()
        }
    }

    fn any_ue() -> TrafficInfluSub {
        TrafficInfluSub {
            af_service_id: "svc1".to_string(),
            af_app_id: "app1".to_string(),
            any_ue_ind: true,
            ..Default::default()
        }
    }

    fn detail(rsp: &HandlerResponse) -> Option<String> {
        rsp.body_as::<ProblemDetails>().and_then(|p| p.detail)
    }

    #[tokio::test]
    async fn test_individual_ue_goes_to_pcf() {
        let h = harness();
        let rsp = h
            .processor
            .post_traffic_influence_subscription("af1", individual())
            .await;
        assert_eq!(rsp.status, 201);
        assert_eq!(
            rsp.header("Location"),
            Some("http://127.0.0.5:8000/3gpp-traffic-influence/v1/af1/subscriptions/1")
        );
        assert_eq!(*h.pcf.calls.lock(), vec!["post"]);
        assert!(h.udr.calls.lock().is_empty());

        let asc = h.pcf.sessions.lock()["sess1"].clone();
        let req = asc.asc_req_data.unwrap();
        assert_eq!(
            req.notif_uri,
            "http://127.0.0.5:8000/nnef-callback/v1/notification/smf"
        );
        let af = h.processor.context().get_af_context("af1").unwrap();
        let sub = af.get_subscription("1").unwrap();
        assert_eq!(req.af_rout_req.unwrap().up_path_chg_sub.unwrap().notif_corre_id, sub.notif_corre_id);
        assert_eq!(sub.app_session_id(), Some("sess1"));
    }

    #[tokio::test]
    async fn test_any_ue_goes_to_udr() {
        let h = harness();
        let rsp = h
            .processor
            .post_traffic_influence_subscription("af1", any_ue())
            .await;
        assert_eq!(rsp.status, 201);
        assert!(h.pcf.calls.lock().is_empty());

        let af = h.processor.context().get_af_context("af1").unwrap();
        let sub = af.get_subscription("1").unwrap();
        let influence_id = sub.influence_id().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&influence_id).is_ok());
        assert!(h.udr.influence.lock().contains_key(&influence_id));
    }

    #[tokio::test]
    async fn test_validation_rejects_before_peer_call() {
        let h = harness();
        let cases = [
            (
                TrafficInfluSub { af_service_id: String::new(), dnn: String::new(), ..individual() },
                DETAIL_NO_AF_SERVICE_ID_OR_DNN,
            ),
            (
                TrafficInfluSub { af_app_id: String::new(), ..individual() },
                DETAIL_NO_APP_OR_FILTERS,
            ),
            (
                TrafficInfluSub { gpsi: String::new(), ..individual() },
                DETAIL_NO_UE_TARGET,
            ),
        ];
        for (ti_sub, expected) in cases {
            let rsp = h.processor.post_traffic_influence_subscription("af1", ti_sub).await;
            assert_eq!(rsp.status, 400);
            assert_eq!(detail(&rsp).as_deref(), Some(expected));
        }
        assert!(h.pcf.calls.lock().is_empty());
        assert!(h.udr.calls.lock().is_empty());
        assert!(h.processor.context().get_af_context("af1").is_none());
    }

    #[tokio::test]
    async fn test_routing_is_fixed_at_creation() {
        let h = harness();
        h.processor.post_traffic_influence_subscription("af1", individual()).await;

        // A group payload on PUT does not move the subscription to the UDR
        let mut group = any_ue();
        group.external_group_id = "group1".to_string();
        let rsp = h
            .processor
            .put_individual_traffic_influence_subscription("af1", "1", group)
            .await;
        assert_eq!(rsp.status, 200);

        let patch = TrafficInfluSubPatch {
            app_relo_ind: Some(true),
            ..Default::default()
        };
        let rsp = h
            .processor
            .patch_individual_traffic_influence_subscription("af1", "1", patch)
            .await;
        assert_eq!(rsp.status, 200);
        let ti_sub: TrafficInfluSub = rsp.body_as().unwrap();
        assert!(ti_sub.app_relo_ind);

        assert_eq!(
            h.processor
                .get_individual_traffic_influence_subscription("af1", "1")
                .await
                .status,
            200
        );
        assert_eq!(
            *h.pcf.calls.lock(),
            vec!["post", "patch sess1", "patch sess1", "get sess1"]
        );
        assert!(h.udr.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_udr_patch_and_list() {
        let h = harness();
        h.processor.post_traffic_influence_subscription("af1", any_ue()).await;
        h.processor.post_traffic_influence_subscription("af1", individual()).await;

        let patch = TrafficInfluSubPatch {
            traffic_routes: Some(vec![RouteToLocation {
                dnai: "edge1".to_string(),
                ..Default::default()
            }]),
            notification_destination: Some("http://af/ti2".to_string()),
            ..Default::default()
        };
        let rsp = h
            .processor
            .patch_individual_traffic_influence_subscription("af1", "1", patch)
            .await;
        assert_eq!(rsp.status, 200);
        let ti_sub: TrafficInfluSub = rsp.body_as().unwrap();
        assert_eq!(ti_sub.traffic_routes[0].dnai, "edge1");
        assert_eq!(ti_sub.notification_destination, "http://af/ti2");

        let rsp = h.processor.get_traffic_influence_subscriptions("af1").await;
        let list: Vec<TrafficInfluSub> = rsp.body_as().unwrap();
        assert_eq!(list.len(), 2);
        let selfs: Vec<_> = list.iter().filter_map(|s| s.self_uri.clone()).collect();
        assert!(selfs.iter().any(|s| s.ends_with("/af1/subscriptions/1")));
        assert!(selfs.iter().any(|s| s.ends_with("/af1/subscriptions/2")));
    }

    #[tokio::test]
    async fn test_delete_keeps_subscription_on_peer_failure() {
        let h = harness();
        h.processor.post_traffic_influence_subscription("af1", individual()).await;
        h.pcf.sessions.lock().clear();

        let rsp = h
            .processor
            .delete_individual_traffic_influence_subscription("af1", "1")
            .await;
        assert_eq!(rsp.status, 404);
        let af = h.processor.context().get_af_context("af1").unwrap();
        assert!(af.get_subscription("1").is_some());
    }

    #[tokio::test]
    async fn test_delete_and_not_found() {
        let h = harness();
        let rsp = h.processor.get_traffic_influence_subscriptions("af1").await;
        assert_eq!(detail(&rsp).as_deref(), Some(DETAIL_AF_NOT_FOUND));

        h.processor.post_traffic_influence_subscription("af1", any_ue()).await;
        let rsp = h
            .processor
            .delete_individual_traffic_influence_subscription("af1", "1")
            .await;
        assert_eq!(rsp.status, 204);
        assert!(h.udr.influence.lock().is_empty());

        let rsp = h
            .processor
            .get_individual_traffic_influence_subscription("af1", "1")
            .await;
        assert_eq!(rsp.status, 404);
        assert_eq!(detail(&rsp).as_deref(), Some(DETAIL_SUB_NOT_FOUND));
    }
}
