use crate::config::FailoverConfig;
use crate::connection::{ControllerState, Supervisor};
use crate::connector::{Connector, MessageHandler, MessageOf, ProtocolConnection};
use crate::error::Error;
use crate::metrics::Metrics;
use crate::subscription::Subscription;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Lifecycle state reported by [`FailoverManager::state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    /// Not activated, or explicitly deactivated
    Inactive,
    /// Connected, or waiting for the next tick to connect
    Active,
    /// Previous connection torn down, restart scheduled
    Reconnecting,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::Inactive => "INACTIVE",
            ClientState::Active => "ACTIVE",
            ClientState::Reconnecting => "RECONNECTING",
        };
        f.write_str(name)
    }
}

/// Keeps one logical connection alive across a list of broker endpoints.
///
/// While active, the manager connects to the head of the candidate list and
/// replays every registered subscription onto the new connection. Any
/// failure reported by the protocol client tears the connection down,
/// rotates the list and reconnects after the configured delay, indefinitely,
/// until [`deactivate`](Self::deactivate) is called.
///
/// # Thread Safety
///
/// `FailoverManager` is `Send + Sync`. Internal state is protected by a
/// `parking_lot::Mutex` that is never held across an await point.
pub struct FailoverManager<C: Connector> {
    connector: Arc<C>,
    config: Arc<FailoverConfig>,
    metrics: Arc<Metrics>,
    state: Arc<Mutex<ControllerState<C>>>,
}

impl<C: Connector> FailoverManager<C> {
    /// Create a new, inactive manager
    pub fn new(config: FailoverConfig, connector: C) -> Self {
        let state = ControllerState::new(config.endpoints().to_vec());
        Self {
            connector: Arc::new(connector),
            config: Arc::new(config),
            metrics: Arc::new(Metrics::new()),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Get the metrics for this manager
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Get the configuration this manager was built with
    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> ClientState {
        self.state.lock().state()
    }

    /// `true` while active or reconnecting
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Candidate endpoints in their current rotation order
    pub fn endpoints(&self) -> Vec<String> {
        self.state.lock().ring.to_vec()
    }

    /// Endpoint of the live physical connection, if any
    pub fn current_endpoint(&self) -> Option<String> {
        self.state
            .lock()
            .connection
            .as_ref()
            .map(|c| c.endpoint.clone())
    }

    /// Number of logical subscriptions
    pub fn subscription_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Topics of all logical subscriptions, in replay order
    pub fn topics(&self) -> Vec<String> {
        self.state.lock().registry.topics()
    }

    /// Start maintaining a connection.
    ///
    /// No-op if already active (including while reconnecting). The first
    /// connection attempt happens on the first supervisory tick, one
    /// `supervisor_interval` from now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if called outside a Tokio runtime.
    pub fn activate(&self) -> Result<(), Error> {
        let mut state = self.state.lock();
        if state.active {
            debug!("Already active ({})", state.state());
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;

        state.status = None;
        state.active = true;
        state.run_id += 1;

        if state.ring.is_empty() {
            warn!("Activated with no candidate endpoints, manager will stay idle");
        } else {
            info!(
                "Activating with {} candidate endpoints (head: {})",
                state.ring.len(),
                state.ring.current().unwrap_or_default()
            );
        }

        let supervisor = Supervisor::new(
            state.run_id,
            self.state.clone(),
            self.connector.clone(),
            self.config.clone(),
            self.metrics.clone(),
        );
        let run_id = state.run_id;
        let handle = runtime.spawn(async move {
            match AssertUnwindSafe(supervisor.run()).catch_unwind().await {
                Ok(()) => debug!("Supervisor run {} finished", run_id),
                Err(panic_err) => {
                    let panic_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_err.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    error!(
                        "Supervisor run {} PANICKED: {}. Reconnection stalled until deactivate.",
                        run_id, panic_msg
                    );
                }
            }
        });

        if let Some(previous) = state.supervisor.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Stop maintaining the connection.
    ///
    /// Cancels the pending tick and any scheduled restart, then tears down
    /// the physical connection. Subscriptions stay registered and are
    /// replayed on the next activation. Idempotent.
    pub fn deactivate(&self) {
        let mut state = self.state.lock();
        let was_active = state.active;

        state.status = None;
        state.active = false;
        if let Some(supervisor) = state.supervisor.take() {
            supervisor.abort();
        }
        state.teardown();

        if was_active {
            info!("Deactivated");
        }
    }

    /// Subscribe `handler` to `topic` on the current connection.
    ///
    /// The subscription is replayed onto every future connection until
    /// [`Subscription::unsubscribe`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if there is no live physical
    /// connection (inactive, reconnecting, or before the first tick), and
    /// [`Error::Connection`] if the protocol client rejects the subscription.
    /// Nothing is registered on error.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> Result<Subscription<C>, Error>
    where
        F: Fn(MessageOf<C>) + Send + Sync + 'static,
    {
        self.subscribe_with(topic, Arc::new(handler))
    }

    /// Like [`subscribe`](Self::subscribe), with a shared handler
    pub fn subscribe_with(
        &self,
        topic: impl Into<String>,
        handler: MessageHandler<MessageOf<C>>,
    ) -> Result<Subscription<C>, Error> {
        let topic = topic.into();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(connection) = state.connection.as_mut() else {
            return Err(Error::NotConnected);
        };
        let live = connection.handle.subscribe(&topic, handler.clone())?;
        let id = state.registry.insert(topic.clone(), handler, live);
        debug!("[CONN-{}] Subscribed {} to {}", connection.generation, id, topic);

        Ok(Subscription::new(id, topic, Arc::downgrade(&self.state)))
    }

    /// Always fails: acknowledge on the delivered message instead.
    pub fn ack(&self, _message: &MessageOf<C>) -> Result<(), Error> {
        Err(Error::InvalidOperation(
            "Ack must be called directly on the message".to_string(),
        ))
    }

    /// Always fails: negatively acknowledge on the delivered message instead.
    pub fn nack(&self, _message: &MessageOf<C>) -> Result<(), Error> {
        Err(Error::InvalidOperation(
            "Nack must be called directly on the message".to_string(),
        ))
    }

    /// Always fails: call [`Subscription::unsubscribe`] on the value returned
    /// by [`subscribe`](Self::subscribe) instead.
    pub fn unsubscribe(&self, _topic: &str) -> Result<(), Error> {
        Err(Error::InvalidOperation(
            "Unsubscribe must be called directly on the subscription".to_string(),
        ))
    }
}

impl<C: Connector> Drop for FailoverManager<C> {
    fn drop(&mut self) {
        // The supervisor task keeps the state alive on its own
        self.deactivate();
    }
}
