//! PFD Management (3gpp-pfd-management)
//!
//! Transactions of PFDs provisioned by an AF. PFD data lives in the UDR;
//! the registry only records which applications belong to which
//! transaction.

use std::collections::BTreeSet;

use super::{respond, HandlerResponse, Processor};
use crate::context::AfPfdTransaction;
use crate::error::{NefError, NefResult};
use crate::models::{
    add_pfd_report, FailureCode, PfdChangeNotification, PfdData, PfdDataForApp, PfdManagement,
    PfdReport, PfdReports,
};
use crate::notifier::PfdNotifyContext;

pub const DETAIL_NO_AF: &str = "Given AF is not existed";
pub const DETAIL_NO_PFD_DATA: &str = "Absent of PfdManagement.PfdDatas";
pub const DETAIL_NO_PFD: &str = "Absent of PfdData.Pfds";
pub const DETAIL_NO_EXT_APP_ID: &str = "Absent of PfdData.ExternalAppID";
pub const DETAIL_NO_PFD_ID: &str = "Absent of Pfd.PfdID";
pub const DETAIL_NO_PFD_INFO: &str = "One of FlowDescriptions, Urls or DomainNames should be provided";

/// Transaction ID that never matches an existing one
const NEW_TRANSACTION: &str = "-1";

impl Processor {
    pub async fn get_pfd_management_transactions(&self, af_id: &str) -> HandlerResponse {
        log::info!("GetPfdManagementTransactions - afID[{}]", af_id);
        respond(self.list_pfd_transactions(af_id).await)
    }

    pub async fn post_pfd_management_transactions(
        &self,
        af_id: &str,
        pfd_mng: PfdManagement,
    ) -> HandlerResponse {
        log::info!("PostPfdManagementTransactions - afID[{}]", af_id);
        respond(self.create_pfd_transaction(af_id, pfd_mng).await)
    }

    pub async fn delete_pfd_management_transactions(&self, af_id: &str) -> HandlerResponse {
        log::info!("DeletePfdManagementTransactions - afID[{}]", af_id);
        respond(self.delete_all_pfd_transactions(af_id).await)
    }

    pub async fn get_individual_pfd_management_transaction(
        &self,
        af_id: &str,
        trans_id: &str,
    ) -> HandlerResponse {
        log::info!(
            "GetIndividualPfdManagementTransaction - afID[{}], transID[{}]",
            af_id,
            trans_id
        );
        let result = async {
            let (_, trans) = self.context.get_pfd_transaction(af_id, trans_id)?;
            let pfd_mng = self.build_pfd_management(af_id, &trans).await?;
            Ok::<_, NefError>(HandlerResponse::with_body(200, &pfd_mng))
        };
        respond(result.await)
    }

    pub async fn put_individual_pfd_management_transaction(
        &self,
        af_id: &str,
        trans_id: &str,
        pfd_mng: PfdManagement,
    ) -> HandlerResponse {
        log::info!(
            "PutIndividualPfdManagementTransaction - afID[{}], transID[{}]",
            af_id,
            trans_id
        );
        respond(self.replace_pfd_transaction(af_id, trans_id, pfd_mng).await)
    }

    pub async fn delete_individual_pfd_management_transaction(
        &self,
        af_id: &str,
        trans_id: &str,
    ) -> HandlerResponse {
        log::info!(
            "DeleteIndividualPfdManagementTransaction - afID[{}], transID[{}]",
            af_id,
            trans_id
        );
        let result = async {
            let (af, trans) = self.context.get_pfd_transaction(af_id, trans_id)?;
            let mut notify_ctx = self.notifier.new_notify_context();
            for app_id in &trans.ext_app_ids {
                self.delete_pfd_data_from_udr(app_id, &mut notify_ctx).await?;
            }
            af.remove_pfd_transaction(trans_id)?;
            Ok::<_, NefError>(HandlerResponse::no_content())
        };
        respond(result.await)
    }

    pub async fn get_individual_application_pfd_management(
        &self,
        af_id: &str,
        trans_id: &str,
        app_id: &str,
    ) -> HandlerResponse {
        log::info!(
            "GetIndividualApplicationPfdManagement - afID[{}], transID[{}], appID[{}]",
            af_id,
            trans_id,
            app_id
        );
        let result = async {
            self.context
                .get_pfd_transaction_with_app_id(af_id, trans_id, app_id)?;
            let for_app = self.consumer.udr.get_pfd_data(app_id).await?;
            let mut pfd_data = PfdData::from(&for_app);
            pfd_data.self_uri = Some(self.gen_pfd_data_uri(af_id, trans_id, app_id));
            Ok::<_, NefError>(HandlerResponse::with_body(200, &pfd_data))
        };
        respond(result.await)
    }

    pub async fn put_individual_application_pfd_management(
        &self,
        af_id: &str,
        trans_id: &str,
        app_id: &str,
        mut pfd_data: PfdData,
    ) -> HandlerResponse {
        log::info!(
            "PutIndividualApplicationPfdManagement - afID[{}], transID[{}], appID[{}]",
            af_id,
            trans_id,
            app_id
        );
        let result = async {
            self.context
                .get_pfd_transaction_with_app_id(af_id, trans_id, app_id)?;
            validate_pfd_data(&pfd_data, false)?;

            let mut notify_ctx = self.notifier.new_notify_context();
            let for_app = PfdDataForApp::from(&pfd_data);
            if let Some(report) = self.store_pfd_data_to_udr(app_id, &for_app).await {
                return Ok(HandlerResponse::with_body(500, &report));
            }
            notify_ctx.add_notification(PfdChangeNotification::updated(app_id, for_app.pfds));

            pfd_data.self_uri = Some(self.gen_pfd_data_uri(af_id, trans_id, app_id));
            Ok::<_, NefError>(HandlerResponse::with_body(200, &pfd_data))
        };
        respond(result.await)
    }

    pub async fn patch_individual_application_pfd_management(
        &self,
        af_id: &str,
        trans_id: &str,
        app_id: &str,
        pfd_data: PfdData,
    ) -> HandlerResponse {
        log::info!(
            "PatchIndividualApplicationPfdManagement - afID[{}], transID[{}], appID[{}]",
            af_id,
            trans_id,
            app_id
        );
        let result = async {
            self.context
                .get_pfd_transaction_with_app_id(af_id, trans_id, app_id)?;
            validate_pfd_data(&pfd_data, true)?;

            let mut notify_ctx = self.notifier.new_notify_context();
            let old = self.consumer.udr.get_pfd_data(app_id).await?;
            let mut merged = PfdData::from(&old);
            patch_modify_pfd_data(&mut merged, &pfd_data)?;

            let for_app = PfdDataForApp::from(&merged);
            if let Some(report) = self.store_pfd_data_to_udr(app_id, &for_app).await {
                return Ok(HandlerResponse::with_body(500, &report));
            }
            notify_ctx.add_notification(PfdChangeNotification::updated(app_id, for_app.pfds));

            merged.self_uri = Some(self.gen_pfd_data_uri(af_id, trans_id, app_id));
            Ok::<_, NefError>(HandlerResponse::with_body(200, &merged))
        };
        respond(result.await)
    }

    pub async fn delete_individual_application_pfd_management(
        &self,
        af_id: &str,
        trans_id: &str,
        app_id: &str,
    ) -> HandlerResponse {
        log::info!(
            "DeleteIndividualApplicationPfdManagement - afID[{}], transID[{}], appID[{}]",
            af_id,
            trans_id,
            app_id
        );
        let result = async {
            let (af, _) = self
                .context
                .get_pfd_transaction_with_app_id(af_id, trans_id, app_id)?;
            let mut notify_ctx = self.notifier.new_notify_context();
            self.delete_pfd_data_from_udr(app_id, &mut notify_ctx).await?;
            af.remove_pfd_transaction_app_id(trans_id, app_id)?;
            Ok::<_, NefError>(HandlerResponse::no_content())
        };
        respond(result.await)
    }

    async fn list_pfd_transactions(&self, af_id: &str) -> NefResult<HandlerResponse> {
        let af = self
            .context
            .get_af_context(af_id)
            .ok_or_else(|| NefError::NotFound(DETAIL_NO_AF.to_string()))?;

        let mut pfd_mngs = Vec::new();
        for trans in af.pfd_transactions() {
            pfd_mngs.push(self.build_pfd_management(af_id, &trans).await?);
        }
        Ok(HandlerResponse::with_body(200, &pfd_mngs))
    }

    async fn create_pfd_transaction(
        &self,
        af_id: &str,
        mut pfd_mng: PfdManagement,
    ) -> NefResult<HandlerResponse> {
        validate_pfd_management(self, af_id, NEW_TRANSACTION, &mut pfd_mng)?;

        // A new AF is registered only once one application is stored
        let known_af = self.context.get_af_context(af_id);
        let is_new_af = known_af.is_none();
        let af = known_af.unwrap_or_else(|| self.context.new_af_context(af_id));
        let mut trans = self.context.new_pfd_transaction(&af);

        let mut notify_ctx = self.notifier.new_notify_context();
        trans.ext_app_ids = self
            .store_pfd_datas(af_id, &trans.trans_id, &mut pfd_mng, &mut notify_ctx)
            .await;
        if pfd_mng.pfd_datas.is_empty() {
            return Err(NefError::PfdsNotCreated(pfd_mng.pfd_reports));
        }

        pfd_mng.self_uri = Some(self.gen_pfd_management_uri(af_id, &trans.trans_id));
        af.add_pfd_transaction(trans);
        if is_new_af {
            self.context.add_af_context(af);
        }
        Ok(HandlerResponse::with_body(201, &pfd_mng))
    }

    async fn replace_pfd_transaction(
        &self,
        af_id: &str,
        trans_id: &str,
        mut pfd_mng: PfdManagement,
    ) -> NefResult<HandlerResponse> {
        validate_pfd_management(self, af_id, trans_id, &mut pfd_mng)?;
        let (af, old) = self.context.get_pfd_transaction(af_id, trans_id)?;

        let mut notify_ctx = self.notifier.new_notify_context();
        for app_id in old
            .ext_app_ids
            .iter()
            .filter(|id| !pfd_mng.pfd_datas.contains_key(*id))
        {
            self.delete_pfd_data_from_udr(app_id, &mut notify_ctx).await?;
        }

        let requested: BTreeSet<String> = pfd_mng.pfd_datas.keys().cloned().collect();
        let stored = self
            .store_pfd_datas(af_id, trans_id, &mut pfd_mng, &mut notify_ctx)
            .await;
        // A failed store leaves the previous UDR data of that app in place
        let kept = requested
            .into_iter()
            .filter(|id| stored.contains(id) || old.contains(id))
            .collect();
        af.set_pfd_transaction_app_ids(trans_id, kept)?;

        if pfd_mng.pfd_datas.is_empty() {
            return Err(NefError::PfdsNotCreated(pfd_mng.pfd_reports));
        }
        pfd_mng.self_uri = Some(self.gen_pfd_management_uri(af_id, trans_id));
        Ok(HandlerResponse::with_body(200, &pfd_mng))
    }

    async fn delete_all_pfd_transactions(&self, af_id: &str) -> NefResult<HandlerResponse> {
        let af = self
            .context
            .get_af_context(af_id)
            .ok_or_else(|| NefError::NotFound(DETAIL_NO_AF.to_string()))?;

        let mut notify_ctx = self.notifier.new_notify_context();
        for trans in af.pfd_transactions() {
            for app_id in &trans.ext_app_ids {
                self.delete_pfd_data_from_udr(app_id, &mut notify_ctx).await?;
            }
            af.remove_pfd_transaction(&trans.trans_id)?;
        }
        Ok(HandlerResponse::no_content())
    }

    /// Store every application of `pfd_mng`; failed ones move to the
    /// reports, stored ones get their self URI and a notification.
    /// Returns the stored application IDs.
    async fn store_pfd_datas(
        &self,
        af_id: &str,
        trans_id: &str,
        pfd_mng: &mut PfdManagement,
        notify_ctx: &mut PfdNotifyContext<'_>,
    ) -> BTreeSet<String> {
        let mut stored = BTreeSet::new();
        let app_ids: Vec<String> = pfd_mng.pfd_datas.keys().cloned().collect();

        for app_id in app_ids {
            let Some(pfd_data) = pfd_mng.pfd_datas.get(&app_id) else {
                continue;
            };
            let for_app = PfdDataForApp::from(pfd_data);
            match self.store_pfd_data_to_udr(&app_id, &for_app).await {
                Some(report) => {
                    pfd_mng.pfd_datas.remove(&app_id);
                    add_pfd_report(&mut pfd_mng.pfd_reports, report);
                }
                None => {
                    let self_uri = self.gen_pfd_data_uri(af_id, trans_id, &app_id);
                    if let Some(pfd_data) = pfd_mng.pfd_datas.get_mut(&app_id) {
                        pfd_data.self_uri = Some(self_uri);
                    }
                    notify_ctx.add_notification(PfdChangeNotification::updated(&app_id, for_app.pfds));
                    stored.insert(app_id);
                }
            }
        }
        stored
    }

    async fn build_pfd_management(
        &self,
        af_id: &str,
        trans: &AfPfdTransaction,
    ) -> NefResult<PfdManagement> {
        let app_ids: Vec<String> = trans.ext_app_ids.iter().cloned().collect();
        let for_apps = self.consumer.udr.get_pfd_datas(&app_ids).await?;

        let mut pfd_mng = PfdManagement {
            self_uri: Some(self.gen_pfd_management_uri(af_id, &trans.trans_id)),
            ..Default::default()
        };
        for for_app in &for_apps {
            let mut pfd_data = PfdData::from(for_app);
            pfd_data.self_uri = Some(self.gen_pfd_data_uri(
                af_id,
                &trans.trans_id,
                &pfd_data.external_app_id,
            ));
            pfd_mng
                .pfd_datas
                .insert(pfd_data.external_app_id.clone(), pfd_data);
        }
        Ok(pfd_mng)
    }

    async fn store_pfd_data_to_udr(&self, app_id: &str, for_app: &PfdDataForApp) -> Option<PfdReport> {
        match self.consumer.udr.put_pfd_data(app_id, for_app).await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Store PFD data of [{}] to UDR failed: {}", app_id, e);
                Some(PfdReport::new(app_id, FailureCode::Malfunction))
            }
        }
    }

    async fn delete_pfd_data_from_udr(
        &self,
        app_id: &str,
        notify_ctx: &mut PfdNotifyContext<'_>,
    ) -> NefResult<()> {
        self.consumer.udr.delete_pfd_data(app_id).await?;
        notify_ctx.add_notification(PfdChangeNotification::removed(app_id));
        Ok(())
    }
}

/// Checks a whole transaction. Applications already provisioned under
/// another AF or transaction are dropped into an `APP_ID_DUPLICATED`
/// report; if nothing is left the reports are the error.
fn validate_pfd_management(
    processor: &Processor,
    af_id: &str,
    trans_id: &str,
    pfd_mng: &mut PfdManagement,
) -> NefResult<()> {
    pfd_mng.pfd_reports = PfdReports::new();

    if pfd_mng.pfd_datas.is_empty() {
        return Err(NefError::Malformed(DETAIL_NO_PFD_DATA.to_string()));
    }

    for pfd_data in pfd_mng.pfd_datas.values() {
        validate_pfd_data(pfd_data, false)?;
    }

    let app_ids: Vec<String> = pfd_mng.pfd_datas.keys().cloned().collect();
    for app_id in app_ids {
        if let Some((owner_af, owner_trans)) = processor.context.is_app_id_provisioned(&app_id) {
            if owner_af != af_id || owner_trans != trans_id {
                log::warn!(
                    "Application [{}] already provisioned by AF [{}] transaction [{}]",
                    app_id,
                    owner_af,
                    owner_trans
                );
                pfd_mng.pfd_datas.remove(&app_id);
                add_pfd_report(
                    &mut pfd_mng.pfd_reports,
                    PfdReport::new(app_id, FailureCode::AppIdDuplicated),
                );
            }
        }
    }

    if pfd_mng.pfd_datas.is_empty() {
        return Err(NefError::PfdsNotCreated(std::mem::take(&mut pfd_mng.pfd_reports)));
    }
    Ok(())
}

/// PFDs with empty content are allowed on PATCH, where they mean removal
fn validate_pfd_data(pfd_data: &PfdData, is_patch: bool) -> NefResult<()> {
    if pfd_data.external_app_id.is_empty() {
        return Err(NefError::Malformed(DETAIL_NO_EXT_APP_ID.to_string()));
    }
    if pfd_data.pfds.is_empty() {
        return Err(NefError::Malformed(DETAIL_NO_PFD.to_string()));
    }
    for pfd in pfd_data.pfds.values() {
        if pfd.pfd_id.is_empty() {
            return Err(NefError::Malformed(DETAIL_NO_PFD_ID.to_string()));
        }
        if !is_patch && pfd.is_empty() {
            return Err(NefError::Malformed(DETAIL_NO_PFD_INFO.to_string()));
        }
    }
    Ok(())
}

/// Merge a PATCH into the stored PFDs (TS 29.122 clause 4.4.10): empty
/// content removes an existing PFD, anything else adds or overwrites it
fn patch_modify_pfd_data(old: &mut PfdData, patch: &PfdData) -> NefResult<()> {
    for (pfd_id, pfd) in &patch.pfds {
        if pfd.is_empty() {
            if old.pfds.remove(pfd_id).is_none() {
                return Err(NefError::Malformed(DETAIL_NO_PFD_INFO.to_string()));
            }
        } else {
            old.pfds.insert(pfd_id.clone(), pfd.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::harness;
    use super::*;
    use crate::models::{Pfd, PfdSubscription};
    use ogs_sbi::ProblemDetails;

    fn pfd(id: &str, flows: &[&str], urls: &[&str]) -> Pfd {
        Pfd {
            pfd_id: id.to_string(),
            flow_descriptions: flows.iter().map(|f| f.to_string()).collect(),
            urls: urls.iter().map(|u| u.to_string()).collect(),
            domain_names: Vec::new(),
        }
    }

    fn pfd_data(app_id: &str, pfds: Vec<Pfd>) -> PfdData {
        PfdData {
            external_app_id: app_id.to_string(),
            pfds: pfds.into_iter().map(|p| (p.pfd_id.clone(), p)).collect(),
            ..Default::default()
        }
    }

    fn pfd_mng(datas: Vec<PfdData>) -> PfdManagement {
        PfdManagement {
            pfd_datas: datas
                .into_iter()
                .map(|d| (d.external_app_id.clone(), d))
                .collect(),
            ..Default::default()
        }
    }

    fn two_apps() -> PfdManagement {
        pfd_mng(vec![
            pfd_data("app1", vec![pfd("pfd1", &["permit in ip from 10.68.28.39 80 to any"], &[])]),
            pfd_data("app2", vec![pfd("pfd2", &[], &["^http://test.example2.net(/\\S*)?$"])]),
        ])
    }

    #[tokio::test]
    async fn test_create_transaction_notifies_once() {
        let mut h = harness();
        h.processor.notifier().add_pfd_sub(&PfdSubscription {
            application_ids: vec!["app1".to_string(), "app2".to_string()],
            notify_uri: "http://af/notify".to_string(),
            supported_features: String::new(),
        });

        let rsp = h.processor.post_pfd_management_transactions("af1", two_apps()).await;
        assert_eq!(rsp.status, 201);

        let body: PfdManagement = rsp.body_as().unwrap();
        assert_eq!(
            body.self_uri.as_deref(),
            Some("http://127.0.0.5:8000/3gpp-pfd-management/v1/af1/transactions/1")
        );
        assert!(body.pfd_datas.values().all(|d| d.self_uri.is_some()));
        assert!(body.pfd_reports.is_empty());

        let batch = h.rx.try_recv().unwrap();
        assert_eq!(batch.notifications.len(), 2);
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let h = harness();
        let rsp = h
            .processor
            .post_pfd_management_transactions("af1", PfdManagement::default())
            .await;
        assert_eq!(rsp.status, 400);
        assert_eq!(
            rsp.body_as::<ProblemDetails>().unwrap().detail.as_deref(),
            Some(DETAIL_NO_PFD_DATA)
        );

        let rsp = h
            .processor
            .post_pfd_management_transactions(
                "af1",
                pfd_mng(vec![pfd_data("app1", vec![pfd("pfd1", &[], &[])])]),
            )
            .await;
        assert_eq!(
            rsp.body_as::<ProblemDetails>().unwrap().detail.as_deref(),
            Some(DETAIL_NO_PFD_INFO)
        );
        assert!(h.udr.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_app_id_reported() {
        let h = harness();
        assert_eq!(
            h.processor.post_pfd_management_transactions("af1", two_apps()).await.status,
            201
        );

        let mut second = two_apps();
        second
            .pfd_datas
            .insert("app3".to_string(), pfd_data("app3", vec![pfd("pfd3", &["permit out ip from any to any"], &[])]));
        let rsp = h.processor.post_pfd_management_transactions("af2", second).await;
        assert_eq!(rsp.status, 201);
        let body: PfdManagement = rsp.body_as().unwrap();
        assert_eq!(body.pfd_datas.keys().collect::<Vec<_>>(), vec!["app3"]);
        assert_eq!(
            body.pfd_reports["APP_ID_DUPLICATED"].external_app_ids,
            vec!["app1", "app2"]
        );

        let rsp = h.processor.post_pfd_management_transactions("af1", two_apps()).await;
        assert_eq!(rsp.status, 500);
        let reports: PfdReports = rsp.body_as().unwrap();
        assert_eq!(reports["APP_ID_DUPLICATED"].external_app_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_put_same_transaction_allows_own_apps() {
        let h = harness();
        h.processor.post_pfd_management_transactions("af1", two_apps()).await;

        let rsp = h
            .processor
            .put_individual_pfd_management_transaction("af1", "1", two_apps())
            .await;
        assert_eq!(rsp.status, 200);
    }

    #[tokio::test]
    async fn test_store_failure_isolated() {
        let h = harness();
        h.udr.failing_apps.lock().push("app2".to_string());

        let rsp = h.processor.post_pfd_management_transactions("af1", two_apps()).await;
        assert_eq!(rsp.status, 201);
        let body: PfdManagement = rsp.body_as().unwrap();
        assert!(body.pfd_datas.contains_key("app1"));
        assert_eq!(body.pfd_reports["MALFUNCTION"].external_app_ids, vec!["app2"]);

        let (_, trans) = h.processor.context().get_pfd_transaction("af1", "1").unwrap();
        assert!(trans.contains("app1"));
        assert!(!trans.contains("app2"));

        h.udr.failing_apps.lock().push("app5".to_string());
        let only_failing = pfd_mng(vec![pfd_data(
            "app5",
            vec![pfd("pfd5", &["permit out ip from any to any"], &[])],
        )]);
        let rsp = h.processor.post_pfd_management_transactions("af2", only_failing).await;
        assert_eq!(rsp.status, 500);
        let reports: PfdReports = rsp.body_as().unwrap();
        assert_eq!(reports["MALFUNCTION"].external_app_ids, vec!["app5"]);
        assert!(h.processor.context().get_pfd_transaction("af2", "1").is_err());
    }

    #[tokio::test]
    async fn test_put_removes_absent_apps() {
        let mut h = harness();
        h.processor.post_pfd_management_transactions("af1", two_apps()).await;
        h.processor.notifier().add_pfd_sub(&PfdSubscription {
            notify_uri: "http://af/notify".to_string(),
            ..Default::default()
        });

        let mut replacement = two_apps();
        replacement.pfd_datas.remove("app2");
        let rsp = h
            .processor
            .put_individual_pfd_management_transaction("af1", "1", replacement)
            .await;
        assert_eq!(rsp.status, 200);
        assert!(h.udr.calls.lock().contains(&"delete pfds app2".to_string()));

        let batch = h.rx.try_recv().unwrap();
        let removed: Vec<_> = batch.notifications.iter().filter(|n| n.removal_flag).collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].application_id, "app2");

        let (_, trans) = h.processor.context().get_pfd_transaction("af1", "1").unwrap();
        assert_eq!(trans.ext_app_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_all_failed_create_keeps_af_unknown() {
        let h = harness();
        h.udr.failing_apps.lock().extend(["app1".to_string(), "app2".to_string()]);

        let rsp = h.processor.post_pfd_management_transactions("afX", two_apps()).await;
        assert_eq!(rsp.status, 500);

        let rsp = h.processor.get_pfd_management_transactions("afX").await;
        assert_eq!(rsp.status, 404);
        assert_eq!(
            rsp.body_as::<ProblemDetails>().unwrap().detail.as_deref(),
            Some(DETAIL_NO_AF)
        );
        assert_eq!(h.processor.context().stats().af_contexts, 0);
    }

    #[tokio::test]
    async fn test_transaction_not_found() {
        let h = harness();
        let rsp = h.processor.get_pfd_management_transactions("af1").await;
        assert_eq!(rsp.status, 404);
        assert_eq!(
            rsp.body_as::<ProblemDetails>().unwrap().detail.as_deref(),
            Some(DETAIL_NO_AF)
        );

        h.processor.post_pfd_management_transactions("af1", two_apps()).await;
        let rsp = h
            .processor
            .put_individual_pfd_management_transaction("af1", "9", pfd_mng(vec![
                pfd_data("app9", vec![pfd("pfd9", &["permit out ip from any to any"], &[])]),
            ]))
            .await;
        assert_eq!(rsp.status, 404);
    }

    #[tokio::test]
    async fn test_get_and_delete_transactions() {
        let h = harness();
        h.processor.post_pfd_management_transactions("af1", two_apps()).await;

        let rsp = h.processor.get_pfd_management_transactions("af1").await;
        let list: Vec<PfdManagement> = rsp.body_as().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].pfd_datas.len(), 2);

        let rsp = h
            .processor
            .get_individual_pfd_management_transaction("af1", "1")
            .await;
        assert_eq!(rsp.status, 200);

        let rsp = h.processor.delete_pfd_management_transactions("af1").await;
        assert_eq!(rsp.status, 204);
        assert!(h.udr.pfds.lock().is_empty());
        assert!(h.processor.context().is_app_id_provisioned("app1").is_none());
        assert_eq!(
            h.processor
                .delete_individual_pfd_management_transaction("af1", "1")
                .await
                .status,
            404
        );
    }

    #[tokio::test]
    async fn test_application_get_put_delete() {
        let h = harness();
        h.processor.post_pfd_management_transactions("af1", two_apps()).await;

        let rsp = h
            .processor
            .get_individual_application_pfd_management("af1", "1", "app1")
            .await;
        assert_eq!(rsp.status, 200);
        let data: PfdData = rsp.body_as().unwrap();
        assert!(data.pfds.contains_key("pfd1"));

        let rsp = h
            .processor
            .get_individual_application_pfd_management("af1", "1", "app7")
            .await;
        assert_eq!(rsp.status, 404);

        let replacement = pfd_data("app1", vec![pfd("pfd9", &[], &["^http://x$"])]);
        let rsp = h
            .processor
            .put_individual_application_pfd_management("af1", "1", "app1", replacement)
            .await;
        assert_eq!(rsp.status, 200);
        assert_eq!(h.udr.pfds.lock()["app1"].pfds[0].pfd_id.as_deref(), Some("pfd9"));

        for app in ["app1", "app2"] {
            let rsp = h
                .processor
                .delete_individual_application_pfd_management("af1", "1", app)
                .await;
            assert_eq!(rsp.status, 204);
        }
        assert!(h.processor.context().get_pfd_transaction("af1", "1").is_err());
    }

    #[tokio::test]
    async fn test_patch_empty_pfd_deletes_it() {
        let h = harness();
        let initial = pfd_mng(vec![pfd_data(
            "app1",
            vec![
                pfd("pfd1", &["permit in ip from 10.68.28.39 80 to any"], &[]),
                pfd("pfd2", &[], &["^http://a$"]),
            ],
        )]);
        h.processor.post_pfd_management_transactions("af1", initial).await;

        let patch = pfd_data("app1", vec![pfd("pfd1", &[], &[])]);
        let rsp = h
            .processor
            .patch_individual_application_pfd_management("af1", "1", "app1", patch.clone())
            .await;
        assert_eq!(rsp.status, 200);
        let merged: PfdData = rsp.body_as().unwrap();
        assert!(!merged.pfds.contains_key("pfd1"));
        assert!(merged.pfds.contains_key("pfd2"));

        // pfd1 is gone, so the same patch has nothing to remove
        let rsp = h
            .processor
            .patch_individual_application_pfd_management("af1", "1", "app1", patch)
            .await;
        assert_eq!(rsp.status, 400);
    }

    #[test]
    fn test_patch_modify_adds_and_overwrites() {
        let mut old = pfd_data("app1", vec![pfd("pfd1", &["a"], &[])]);
        let patch = pfd_data("app1", vec![pfd("pfd1", &["b"], &[]), pfd("pfd2", &[], &["u"])]);
        patch_modify_pfd_data(&mut old, &patch).unwrap();
        assert_eq!(old.pfds["pfd1"].flow_descriptions, vec!["b"]);
        assert!(old.pfds.contains_key("pfd2"));
    }

    #[test]
    fn test_validate_pfd_data() {
        assert!(validate_pfd_data(&pfd_data("", vec![]), false).is_err());
        assert!(validate_pfd_data(&pfd_data("app1", vec![]), false).is_err());
        assert!(validate_pfd_data(&pfd_data("app1", vec![pfd("", &["a"], &[])]), false).is_err());
        assert!(validate_pfd_data(&pfd_data("app1", vec![pfd("p", &[], &[])]), true).is_ok());
    }
}
