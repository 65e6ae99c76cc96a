//! Peer callbacks (nnef-callback)

use super::{respond, HandlerResponse, Processor};
use crate::error::NefError;
use crate::models::NsmfEventExposureNotification;

impl Processor {
    /// SMF UP path change events; `notifId` carries the correlation ID
    /// handed out when the subscription was created
    pub fn smf_notification(&self, ee_notif: NsmfEventExposureNotification) -> HandlerResponse {
        log::info!("SmfNotification - NotifId[{}]", ee_notif.notif_id);

        let Some((af_id, sub)) = self
            .context
            .find_subscription_by_correlation_id(&ee_notif.notif_id)
        else {
            return respond(Err(NefError::NotFound(
                super::ti::DETAIL_SUB_NOT_FOUND.to_string(),
            )));
        };

        for event in &ee_notif.event_notifs {
            log::debug!(
                "AF [{}] subscription [{}]: {} {} -> {}",
                af_id,
                sub.sub_id,
                event.event,
                event.source_dnai.as_deref().unwrap_or("-"),
                event.target_dnai.as_deref().unwrap_or("-")
            );
        }
        HandlerResponse::no_content()
    }
}
