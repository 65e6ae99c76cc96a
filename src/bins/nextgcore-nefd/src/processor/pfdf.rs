//! PFD Function (nnef-pfdmanagement)
//!
//! Read access to provisioned PFDs for SMFs and UPFs, and change
//! notification subscriptions.

use super::{respond, HandlerResponse, Processor};
use crate::error::NefError;
use crate::models::PfdSubscription;

pub const DETAIL_NO_NOTIFY_URI: &str = "Absent of Notify URI";

impl Processor {
    /// PFDs of `app_ids`, or of every application when empty
    pub async fn get_applications_pfd(&self, app_ids: &[String]) -> HandlerResponse {
        log::info!("GetApplicationsPFD - appIDs{:?}", app_ids);
        let result = self.consumer.udr.get_pfd_datas(app_ids).await;
        respond(
            result
                .map(|datas| HandlerResponse::with_body(200, &datas))
                .map_err(NefError::from),
        )
    }

    pub async fn get_individual_application_pfd(&self, app_id: &str) -> HandlerResponse {
        log::info!("GetIndividualApplicationPFD - appID[{}]", app_id);
        let result = self.consumer.udr.get_pfd_data(app_id).await;
        respond(
            result
                .map(|data| HandlerResponse::with_body(200, &data))
                .map_err(NefError::from),
        )
    }

    pub fn post_pfd_subscriptions(&self, sub: PfdSubscription) -> HandlerResponse {
        log::info!("PostPFDSubscriptions - notifyUri[{}]", sub.notify_uri);
        if sub.notify_uri.is_empty() {
            return respond(Err(NefError::Malformed(DETAIL_NO_NOTIFY_URI.to_string())));
        }

        let sub_id = self.notifier.add_pfd_sub(&sub);
        HandlerResponse::with_body(201, &sub)
            .with_header("Location", self.gen_pfd_subscription_uri(&sub_id))
    }

    pub fn delete_individual_pfd_subscription(&self, sub_id: &str) -> HandlerResponse {
        log::info!("DeleteIndividualPFDSubscription - subscID[{}]", sub_id);
        match self.notifier.delete_pfd_sub(sub_id) {
            Ok(()) => HandlerResponse::no_content(),
            Err(e) => respond(Err(NefError::NotFound(e.to_string()))),
        }
    }
}
