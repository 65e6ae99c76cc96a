//! NEF Context Management
//!
//! In-memory registry of AF contexts, their traffic influence subscriptions
//! and PFD management transactions, with identifier allocation.
//!
//! Locking is two level: the AF map and the correlation counter belong to
//! [`NefContext`], and every [`AfContext`] guards its own subscription and
//! transaction maps. Locks are never held across peer calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Registry lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("AF not found")]
    AfNotFound,
    #[error("Transaction not found")]
    TransactionNotFound,
    #[error("Application ID not found")]
    AppIdNotFound,
    #[error("Subscription not found")]
    SubscriptionNotFound,
}

/// Peer that owns a traffic influence subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionBackend {
    /// Individual UE, PCF application session
    Pcf { app_session_id: String },
    /// UE group or any UE, UDR influence data
    Udr { influence_id: String },
}

/// Traffic influence subscription of one AF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfSubscription {
    pub sub_id: String,
    pub notif_corre_id: String,
    pub notification_uri: String,
    /// Decided once at creation; `None` only before the peer accepted it
    pub backend: Option<SubscriptionBackend>,
}

impl AfSubscription {
    /// Backed by a PCF application session
    pub fn is_individual_ue_addr(&self) -> bool {
        matches!(self.backend, Some(SubscriptionBackend::Pcf { .. }))
    }

    pub fn app_session_id(&self) -> Option<&str> {
        match &self.backend {
            Some(SubscriptionBackend::Pcf { app_session_id }) => Some(app_session_id),
            _ => None,
        }
    }

    pub fn influence_id(&self) -> Option<&str> {
        match &self.backend {
            Some(SubscriptionBackend::Udr { influence_id }) => Some(influence_id),
            _ => None,
        }
    }
}

/// PFD management transaction of one AF
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AfPfdTransaction {
    pub trans_id: String,
    pub ext_app_ids: BTreeSet<String>,
}

impl AfPfdTransaction {
    pub fn contains(&self, app_id: &str) -> bool {
        self.ext_app_ids.contains(app_id)
    }
}

#[derive(Debug, Default)]
struct AfContextInner {
    subscriptions: BTreeMap<String, AfSubscription>,
    pfd_transactions: BTreeMap<String, AfPfdTransaction>,
}

/// Per-AF state
#[derive(Debug)]
pub struct AfContext {
    af_id: String,
    next_sub_id: AtomicU64,
    next_trans_id: AtomicU64,
    inner: RwLock<AfContextInner>,
}

impl AfContext {
    fn new(af_id: impl Into<String>) -> Self {
        Self {
            af_id: af_id.into(),
            next_sub_id: AtomicU64::new(1),
            next_trans_id: AtomicU64::new(1),
            inner: RwLock::new(AfContextInner::default()),
        }
    }

    pub fn af_id(&self) -> &str {
        &self.af_id
    }

    // Subscriptions

    pub fn add_subscription(&self, sub: AfSubscription) {
        log::debug!("[{}] Add subscription [{}]", self.af_id, sub.sub_id);
        self.inner.write().subscriptions.insert(sub.sub_id.clone(), sub);
    }

    pub fn get_subscription(&self, sub_id: &str) -> Option<AfSubscription> {
        self.inner.read().subscriptions.get(sub_id).cloned()
    }

    pub fn remove_subscription(&self, sub_id: &str) -> Result<AfSubscription, ContextError> {
        let removed = self.inner.write().subscriptions.remove(sub_id);
        match removed {
            Some(sub) => {
                log::debug!("[{}] Remove subscription [{}]", self.af_id, sub_id);
                Ok(sub)
            }
            None => Err(ContextError::SubscriptionNotFound),
        }
    }

    pub fn subscriptions(&self) -> Vec<AfSubscription> {
        self.inner.read().subscriptions.values().cloned().collect()
    }

    // PFD transactions

    pub fn add_pfd_transaction(&self, trans: AfPfdTransaction) {
        log::debug!("[{}] Add PFD transaction [{}]", self.af_id, trans.trans_id);
        self.inner
            .write()
            .pfd_transactions
            .insert(trans.trans_id.clone(), trans);
    }

    pub fn get_pfd_transaction(&self, trans_id: &str) -> Option<AfPfdTransaction> {
        self.inner.read().pfd_transactions.get(trans_id).cloned()
    }

    pub fn pfd_transactions(&self) -> Vec<AfPfdTransaction> {
        self.inner.read().pfd_transactions.values().cloned().collect()
    }

    /// Replace the application IDs of an existing transaction
    pub fn set_pfd_transaction_app_ids(
        &self,
        trans_id: &str,
        app_ids: BTreeSet<String>,
    ) -> Result<(), ContextError> {
        let mut inner = self.inner.write();
        let trans = inner
            .pfd_transactions
            .get_mut(trans_id)
            .ok_or(ContextError::TransactionNotFound)?;
        trans.ext_app_ids = app_ids;
        if trans.ext_app_ids.is_empty() {
            inner.pfd_transactions.remove(trans_id);
            log::debug!("[{}] PFD transaction [{}] evicted", self.af_id, trans_id);
        }
        Ok(())
    }

    /// Remove one application from a transaction; a transaction left
    /// without applications is evicted
    pub fn remove_pfd_transaction_app_id(
        &self,
        trans_id: &str,
        app_id: &str,
    ) -> Result<(), ContextError> {
        let mut inner = self.inner.write();
        let trans = inner
            .pfd_transactions
            .get_mut(trans_id)
            .ok_or(ContextError::TransactionNotFound)?;
        if !trans.ext_app_ids.remove(app_id) {
            return Err(ContextError::AppIdNotFound);
        }
        if trans.ext_app_ids.is_empty() {
            inner.pfd_transactions.remove(trans_id);
            log::debug!("[{}] PFD transaction [{}] evicted", self.af_id, trans_id);
        }
        Ok(())
    }

    pub fn remove_pfd_transaction(&self, trans_id: &str) -> Result<AfPfdTransaction, ContextError> {
        self.inner
            .write()
            .pfd_transactions
            .remove(trans_id)
            .ok_or(ContextError::TransactionNotFound)
    }

    fn counts(&self) -> (usize, usize) {
        let inner = self.inner.read();
        (inner.subscriptions.len(), inner.pfd_transactions.len())
    }
}

/// Registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NefStats {
    pub af_contexts: usize,
    pub subscriptions: usize,
    pub pfd_transactions: usize,
}

/// NEF context, one per process
pub struct NefContext {
    nf_instance_id: RwLock<String>,
    af_contexts: RwLock<HashMap<String, Arc<AfContext>>>,
    next_corre_id: AtomicU64,
}

impl Default for NefContext {
    fn default() -> Self {
        Self::new()
    }
}

impl NefContext {
    pub fn new() -> Self {
        Self {
            nf_instance_id: RwLock::new(uuid::Uuid::new_v4().to_string()),
            af_contexts: RwLock::new(HashMap::new()),
            next_corre_id: AtomicU64::new(1),
        }
    }

    pub fn nf_instance_id(&self) -> String {
        self.nf_instance_id.read().clone()
    }

    /// Adopt the instance ID assigned by the NRF
    pub fn set_nf_instance_id(&self, id: impl Into<String>) {
        let id = id.into();
        log::info!("NF instance ID [{}]", id);
        *self.nf_instance_id.write() = id;
    }

    // AF contexts

    /// Empty context, not yet registered
    pub fn new_af_context(&self, af_id: &str) -> Arc<AfContext> {
        Arc::new(AfContext::new(af_id))
    }

    pub fn add_af_context(&self, af: Arc<AfContext>) {
        log::debug!("Add AF context [{}]", af.af_id());
        self.af_contexts.write().insert(af.af_id().to_string(), af);
    }

    pub fn get_af_context(&self, af_id: &str) -> Option<Arc<AfContext>> {
        self.af_contexts.read().get(af_id).cloned()
    }

    pub fn delete_af_context(&self, af_id: &str) {
        if self.af_contexts.write().remove(af_id).is_some() {
            log::debug!("Remove AF context [{}]", af_id);
        }
    }

    fn af_context_list(&self) -> Vec<Arc<AfContext>> {
        self.af_contexts.read().values().cloned().collect()
    }

    // Identifier allocation

    /// Fresh subscription of `af`; the caller commits it with
    /// [`AfContext::add_subscription`] once the peer accepted it
    pub fn new_subscription(&self, af: &AfContext, notification_uri: impl Into<String>) -> AfSubscription {
        let corre_id = self.next_corre_id.fetch_add(1, Ordering::SeqCst);
        let sub_id = af.next_sub_id.fetch_add(1, Ordering::SeqCst);
        AfSubscription {
            sub_id: sub_id.to_string(),
            notif_corre_id: corre_id.to_string(),
            notification_uri: notification_uri.into(),
            backend: None,
        }
    }

    /// Fresh, empty transaction of `af`; not inserted
    pub fn new_pfd_transaction(&self, af: &AfContext) -> AfPfdTransaction {
        let trans_id = af.next_trans_id.fetch_add(1, Ordering::SeqCst);
        AfPfdTransaction {
            trans_id: trans_id.to_string(),
            ext_app_ids: BTreeSet::new(),
        }
    }

    // Lookups

    /// `(afId, transId)` already owning `app_id`, if any
    pub fn is_app_id_provisioned(&self, app_id: &str) -> Option<(String, String)> {
        self.af_context_list().into_iter().find_map(|af| {
            let inner = af.inner.read();
            inner
                .pfd_transactions
                .values()
                .find(|trans| trans.contains(app_id))
                .map(|trans| (af.af_id.clone(), trans.trans_id.clone()))
        })
    }

    pub fn get_pfd_transaction(
        &self,
        af_id: &str,
        trans_id: &str,
    ) -> Result<(Arc<AfContext>, AfPfdTransaction), ContextError> {
        let af = self.get_af_context(af_id).ok_or(ContextError::AfNotFound)?;
        let trans = af
            .get_pfd_transaction(trans_id)
            .ok_or(ContextError::TransactionNotFound)?;
        Ok((af, trans))
    }

    pub fn get_pfd_transaction_with_app_id(
        &self,
        af_id: &str,
        trans_id: &str,
        app_id: &str,
    ) -> Result<(Arc<AfContext>, AfPfdTransaction), ContextError> {
        let (af, trans) = self.get_pfd_transaction(af_id, trans_id)?;
        if !trans.contains(app_id) {
            return Err(ContextError::AppIdNotFound);
        }
        Ok((af, trans))
    }

    /// Subscription carrying `corre_id`, with its AF ID
    pub fn find_subscription_by_correlation_id(&self, corre_id: &str) -> Option<(String, AfSubscription)> {
        self.af_context_list().into_iter().find_map(|af| {
            let inner = af.inner.read();
            inner
                .subscriptions
                .values()
                .find(|sub| sub.notif_corre_id == corre_id)
                .map(|sub| (af.af_id.clone(), sub.clone()))
        })
    }

    pub fn stats(&self) -> NefStats {
        let afs = self.af_context_list();
        let mut stats = NefStats {
            af_contexts: afs.len(),
            ..Default::default()
        };
        for af in afs {
            let (subs, trans) = af.counts();
            stats.subscriptions += subs;
            stats.pfd_transactions += trans;
        }
        stats
    }
}
