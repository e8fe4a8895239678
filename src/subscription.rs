use crate::connection::ControllerState;
use crate::connector::{Connector, LiveSubscription, MessageHandler, ProtocolConnection};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Weak;
use tracing::{debug, warn};

/// Identifier of a logical subscription, unique per manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Record<P: ProtocolConnection> {
    id: SubscriptionId,
    topic: String,
    handler: MessageHandler<P::Message>,
    /// Leased from the current physical connection; `None` between
    /// connections
    live: Option<P::Subscription>,
}

/// Outcome of replaying the registry onto a new connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReplayStats {
    pub resubscribed: usize,
    pub failed: usize,
}

/// Logical subscriptions, independent of any physical connection.
///
/// Records are kept in insertion order, which is also replay order.
pub(crate) struct Registry<P: ProtocolConnection> {
    records: Vec<Record<P>>,
    next_id: u64,
}

impl<P: ProtocolConnection> Default for Registry<P> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl<P: ProtocolConnection> Registry<P> {
    /// Store a record whose live handle was already acquired
    pub fn insert(
        &mut self,
        topic: String,
        handler: MessageHandler<P::Message>,
        live: P::Subscription,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.records.push(Record {
            id,
            topic,
            handler,
            live: Some(live),
        });
        id
    }

    /// Release the record's live handle and remove exactly that record.
    ///
    /// Returns `false` if the record was already gone.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return false;
        };
        let mut record = self.records.remove(index);
        if let Some(mut live) = record.live.take() {
            live.unsubscribe();
        }
        debug!("Removed subscription {} ({})", id, record.topic);
        true
    }

    /// Release every live handle, keeping the records.
    ///
    /// Called before the physical connection they were leased from goes away.
    pub fn release_all(&mut self) {
        for record in &mut self.records {
            if let Some(mut live) = record.live.take() {
                live.unsubscribe();
            }
        }
    }

    /// Re-acquire a live handle for every record from `connection`, in
    /// insertion order.
    ///
    /// A record whose re-subscription fails keeps no handle until the next
    /// reconnect.
    pub fn replay(&mut self, connection: &mut P, generation: u64) -> ReplayStats {
        let mut stats = ReplayStats::default();
        for record in &mut self.records {
            if let Some(mut stale) = record.live.take() {
                stale.unsubscribe();
            }
            match connection.subscribe(&record.topic, record.handler.clone()) {
                Ok(live) => {
                    record.live = Some(live);
                    stats.resubscribed += 1;
                }
                Err(e) => {
                    warn!(
                        "[CONN-{}] Failed to resubscribe {} to {}: {}",
                        generation, record.id, record.topic, e
                    );
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_live(&self, id: SubscriptionId) -> bool {
        self.records
            .iter()
            .any(|r| r.id == id && r.live.is_some())
    }

    /// Topics in replay order
    pub fn topics(&self) -> Vec<String> {
        self.records.iter().map(|r| r.topic.clone()).collect()
    }
}

/// A logical subscription returned by
/// [`FailoverManager::subscribe`](crate::FailoverManager::subscribe).
///
/// The subscription outlives individual physical connections: the manager
/// re-establishes it after every reconnect until [`Subscription::unsubscribe`]
/// is called. Dropping this value does *not* unsubscribe.
pub struct Subscription<C: Connector> {
    id: SubscriptionId,
    topic: String,
    state: Weak<Mutex<ControllerState<C>>>,
}

impl<C: Connector> Subscription<C> {
    pub(crate) fn new(
        id: SubscriptionId,
        topic: String,
        state: Weak<Mutex<ControllerState<C>>>,
    ) -> Self {
        Self { id, topic, state }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the subscription currently holds a handle on a live connection
    pub fn is_live(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| state.lock().registry.is_live(self.id))
    }

    /// Release the live handle and forget the subscription.
    ///
    /// It will not be replayed on future reconnects. Safe to call after the
    /// manager has been dropped.
    pub fn unsubscribe(self) {
        if let Some(state) = self.state.upgrade() {
            state.lock().registry.remove(self.id);
        }
    }
}

impl<C: Connector> fmt::Debug for Subscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}
