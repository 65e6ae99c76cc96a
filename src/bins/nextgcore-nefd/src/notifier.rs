//! PFD Change Notifier
//!
//! Keeps the nnef-pfdmanagement subscriptions and fans PFD changes out to
//! them. A processor operation collects its changes in a
//! [`PfdNotifyContext`]; when the context is dropped every subscriber
//! receives one batch with all the applications it cares about. Batches
//! travel over a bounded channel to the [`NotifyDispatcher`], which
//! delivers each one on its own task.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ogs_sbi::{base_uri_of, SbiClientCache, SbiRequest};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::consumer::{PeerError, PeerResult, PEER_REQUEST_TIMEOUT};
use crate::models::{PfdChangeNotification, PfdSubscription};

/// Pending batches before new ones are dropped
pub const NOTIFY_QUEUE_SIZE: usize = 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifierError {
    #[error("Subscription not found")]
    SubscriptionNotFound,
}

/// Notifications for one subscriber
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyBatch {
    pub sub_id: String,
    pub notify_uri: String,
    pub notifications: Vec<PfdChangeNotification>,
}

#[derive(Debug, Default)]
struct NotifierState {
    sub_id_to_uri: HashMap<String, String>,
    app_id_to_sub_ids: HashMap<String, HashSet<String>>,
    /// Subscriptions without application IDs
    all_apps_sub_ids: HashSet<String>,
    next_sub_id: u64,
}

/// Registry of PFD change subscriptions
pub struct PfdChangeNotifier {
    state: Mutex<NotifierState>,
    tx: mpsc::Sender<NotifyBatch>,
}

impl PfdChangeNotifier {
    /// Notifier and the receiving end for a [`NotifyDispatcher`]
    pub fn new() -> (Self, mpsc::Receiver<NotifyBatch>) {
        let (tx, rx) = mpsc::channel(NOTIFY_QUEUE_SIZE);
        let notifier = Self {
            state: Mutex::new(NotifierState {
                next_sub_id: 1,
                ..Default::default()
            }),
            tx,
        };
        (notifier, rx)
    }

    /// Register a subscription and return its ID
    pub fn add_pfd_sub(&self, sub: &PfdSubscription) -> String {
        let mut state = self.state.lock();
        let sub_id = state.next_sub_id.to_string();
        state.next_sub_id += 1;

        state.sub_id_to_uri.insert(sub_id.clone(), sub.notify_uri.clone());
        if sub.application_ids.is_empty() {
            state.all_apps_sub_ids.insert(sub_id.clone());
        }
        for app_id in &sub.application_ids {
            state
                .app_id_to_sub_ids
                .entry(app_id.clone())
                .or_default()
                .insert(sub_id.clone());
        }

        log::debug!("PFD subscription [{}] added for [{}]", sub_id, sub.notify_uri);
        sub_id
    }

    pub fn delete_pfd_sub(&self, sub_id: &str) -> Result<(), NotifierError> {
        let mut state = self.state.lock();
        if state.sub_id_to_uri.remove(sub_id).is_none() {
            return Err(NotifierError::SubscriptionNotFound);
        }
        state.all_apps_sub_ids.remove(sub_id);
        state.app_id_to_sub_ids.retain(|_, subs| {
            subs.remove(sub_id);
            !subs.is_empty()
        });

        log::debug!("PFD subscription [{}] deleted", sub_id);
        Ok(())
    }

    pub fn num_of_subs(&self) -> usize {
        self.state.lock().sub_id_to_uri.len()
    }

    /// Batch for one processor operation
    pub fn new_notify_context(&self) -> PfdNotifyContext<'_> {
        PfdNotifyContext {
            notifier: self,
            app_id_to_notification: BTreeMap::new(),
            sub_id_to_changed_app_ids: BTreeMap::new(),
        }
    }

    fn sub_ids_for_app(&self, app_id: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .app_id_to_sub_ids
            .get(app_id)
            .into_iter()
            .flatten()
            .chain(state.all_apps_sub_ids.iter())
            .cloned()
            .collect()
    }

    fn notify_uri(&self, sub_id: &str) -> Option<String> {
        self.state.lock().sub_id_to_uri.get(sub_id).cloned()
    }

    fn enqueue(&self, batch: NotifyBatch) {
        if let Err(e) = self.tx.try_send(batch) {
            log::warn!("PFD notification dropped: {}", e);
        }
    }
}

/// Changes collected during one operation, flushed on drop
pub struct PfdNotifyContext<'a> {
    notifier: &'a PfdChangeNotifier,
    app_id_to_notification: BTreeMap<String, PfdChangeNotification>,
    sub_id_to_changed_app_ids: BTreeMap<String, BTreeSet<String>>,
}

impl PfdNotifyContext<'_> {
    /// Record a change; a later change of the same application replaces it
    pub fn add_notification(&mut self, notification: PfdChangeNotification) {
        let app_id = notification.application_id.clone();
        for sub_id in self.notifier.sub_ids_for_app(&app_id) {
            self.sub_id_to_changed_app_ids
                .entry(sub_id)
                .or_default()
                .insert(app_id.clone());
        }
        self.app_id_to_notification.insert(app_id, notification);
    }

    pub fn is_empty(&self) -> bool {
        self.sub_id_to_changed_app_ids.is_empty()
    }

    /// Hand one batch per subscriber to the dispatcher
    pub fn flush(&mut self) {
        let changed = std::mem::take(&mut self.sub_id_to_changed_app_ids);
        for (sub_id, app_ids) in changed {
            let Some(notify_uri) = self.notifier.notify_uri(&sub_id) else {
                continue;
            };
            let notifications = app_ids
                .iter()
                .filter_map(|app_id| self.app_id_to_notification.get(app_id).cloned())
                .collect();
            self.notifier.enqueue(NotifyBatch {
                sub_id,
                notify_uri,
                notifications,
            });
        }
        self.app_id_to_notification.clear();
    }
}

impl Drop for PfdNotifyContext<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Delivery of one batch to a subscriber
#[async_trait]
pub trait PfdNotificationSender: Send + Sync {
    async fn send(&self, notify_uri: &str, notifications: &[PfdChangeNotification]) -> PeerResult<()>;
}

/// POSTs the batch as a JSON array to the subscriber URI
pub struct HttpPfdNotificationSender {
    clients: SbiClientCache,
}

impl HttpPfdNotificationSender {
    pub fn new() -> Self {
        Self {
            clients: SbiClientCache::new().with_request_timeout(PEER_REQUEST_TIMEOUT),
        }
    }
}

impl Default for HttpPfdNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PfdNotificationSender for HttpPfdNotificationSender {
    async fn send(&self, notify_uri: &str, notifications: &[PfdChangeNotification]) -> PeerResult<()> {
        let client = self.clients.get_client(&base_uri_of(notify_uri)?).await?;
        let request = SbiRequest::post(notify_uri)
            .with_json_body(&notifications)
            .map_err(|e| PeerError::system_failure(e.to_string()))?;
        let response = client.send_request(request).await?;
        if !response.is_success() {
            return Err(PeerError::from_response(&response));
        }
        Ok(())
    }
}

/// Consumes queued batches until every notifier handle is gone
pub struct NotifyDispatcher {
    rx: mpsc::Receiver<NotifyBatch>,
    sender: Arc<dyn PfdNotificationSender>,
}

impl NotifyDispatcher {
    pub fn new(rx: mpsc::Receiver<NotifyBatch>, sender: Arc<dyn PfdNotificationSender>) -> Self {
        Self { rx, sender }
    }

    pub async fn run(mut self) {
        while let Some(batch) = self.rx.recv().await {
            let sender = self.sender.clone();
            tokio::spawn(async move {
                match sender.send(&batch.notify_uri, &batch.notifications).await {
                    Ok(()) => log::debug!(
                        "PFD notification sent to [{}] ({} apps)",
                        batch.notify_uri,
                        batch.notifications.len()
                    ),
                    Err(e) => log::error!(
                        "PFD notification to [{}] of subscription [{}] failed: {}",
                        batch.notify_uri,
                        batch.sub_id,
                        e
                    ),
                }
            });
        }
        log::debug!("PFD notify dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(uri: &str, apps: &[&str]) -> PfdSubscription {
        PfdSubscription {
            application_ids: apps.iter().map(|a| a.to_string()).collect(),
            notify_uri: uri.to_string(),
            supported_features: String::new(),
        }
    }

    #[test]
    fn test_batch_per_subscriber() {
        let (notifier, mut rx) = PfdChangeNotifier::new();
        notifier.add_pfd_sub(&sub("http://af1/notify", &["app1", "app2"]));
        notifier.add_pfd_sub(&sub("http://af2/notify", &["app2"]));

        {
            let mut ctx = notifier.new_notify_context();
            ctx.add_notification(PfdChangeNotification::updated("app1", vec![]));
            ctx.add_notification(PfdChangeNotification::removed("app2"));
            ctx.add_notification(PfdChangeNotification::updated("app3", vec![]));
        }

        let first = rx.try_recv().unwrap();
        assert_eq!(first.notify_uri, "http://af1/notify");
        assert_eq!(first.notifications.len(), 2);
        assert!(first.notifications[1].removal_flag);

        let second = rx.try_recv().unwrap();
        assert_eq!(second.notify_uri, "http://af2/notify");
        assert_eq!(second.notifications.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_empty_application_ids_match_everything() {
        let (notifier, mut rx) = PfdChangeNotifier::new();
        notifier.add_pfd_sub(&sub("http://af/all", &[]));

        let mut ctx = notifier.new_notify_context();
        ctx.add_notification(PfdChangeNotification::updated("any-app", vec![]));
        assert!(!ctx.is_empty());
        drop(ctx);

        assert_eq!(rx.try_recv().unwrap().notifications[0].application_id, "any-app");
    }

    #[test]
    fn test_no_subscriber_no_batch() {
        let (notifier, mut rx) = PfdChangeNotifier::new();
        {
            let mut ctx = notifier.new_notify_context();
            ctx.add_notification(PfdChangeNotification::updated("app1", vec![]));
            assert!(ctx.is_empty());
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_delete_subscription() {
        let (notifier, mut rx) = PfdChangeNotifier::new();
        let id = notifier.add_pfd_sub(&sub("http://af/notify", &["app1"]));
        assert_eq!(notifier.num_of_subs(), 1);

        notifier.delete_pfd_sub(&id).unwrap();
        assert_eq!(notifier.delete_pfd_sub(&id), Err(NotifierError::SubscriptionNotFound));
        assert_eq!(notifier.num_of_subs(), 0);

        notifier
            .new_notify_context()
            .add_notification(PfdChangeNotification::updated("app1", vec![]));
        assert!(rx.try_recv().is_err());
    }

    struct Recorder(tokio::sync::mpsc::UnboundedSender<(String, usize)>);

    #[async_trait]
    impl PfdNotificationSender for Recorder {
        async fn send(&self, notify_uri: &str, notifications: &[PfdChangeNotification]) -> PeerResult<()> {
            let _ = self.0.send((notify_uri.to_string(), notifications.len()));
            Err(PeerError::system_failure("subscriber down"))
        }
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_and_survives_failures() {
        let (notifier, rx) = PfdChangeNotifier::new();
        let (rec_tx, mut rec_rx) = tokio::sync::mpsc::unbounded_channel();
        let dispatcher = NotifyDispatcher::new(rx, Arc::new(Recorder(rec_tx)));
        let handle = tokio::spawn(dispatcher.run());

        notifier.add_pfd_sub(&sub("http://af/notify", &["app1"]));
        for _ in 0..2 {
            notifier
                .new_notify_context()
                .add_notification(PfdChangeNotification::updated("app1", vec![]));
        }

        assert_eq!(rec_rx.recv().await.unwrap(), ("http://af/notify".to_string(), 1));
        assert_eq!(rec_rx.recv().await.unwrap(), ("http://af/notify".to_string(), 1));

        drop(notifier);
        handle.await.unwrap();
    }
}
