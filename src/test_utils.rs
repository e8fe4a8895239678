//! Scripted in-memory protocol client for tests.

use crate::connector::{
    ConnectAttempt, ConnectionEvents, Connector, FailureKind, LiveSubscription, MessageHandler,
    ProtocolConnection,
};
use crate::error::Error;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
struct BrokerState {
    attempts: Vec<ConnectAttempt>,
    events: Vec<ConnectionEvents>,
    open_connections: usize,
    max_open_connections: usize,
    live_subscriptions: usize,
    subscribe_log: Vec<(String, String, MessageHandler<String>)>,
    refused_endpoints: HashSet<String>,
    reject_subscriptions: bool,
}

/// Records every connection attempt and subscription made through it
#[derive(Clone, Default)]
pub(crate) struct MockBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection outside of any manager
    pub fn open_connection(&self, endpoint: &str) -> MockConnection {
        let mut state = self.state.lock();
        state.open_connections += 1;
        state.max_open_connections = state.max_open_connections.max(state.open_connections);
        MockConnection {
            endpoint: endpoint.to_string(),
            broker: self.clone(),
            closed: false,
        }
    }

    /// Endpoints of all connection attempts, in order
    pub fn attempts(&self) -> Vec<String> {
        self.state
            .lock()
            .attempts
            .iter()
            .map(|a| a.endpoint.clone())
            .collect()
    }

    pub fn attempt(&self, index: usize) -> ConnectAttempt {
        self.state.lock().attempts[index].clone()
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().open_connections
    }

    /// Highest number of simultaneously open connections seen
    pub fn max_open_connections(&self) -> usize {
        self.state.lock().max_open_connections
    }

    pub fn live_subscriptions(&self) -> usize {
        self.state.lock().live_subscriptions
    }

    /// (topic, handler) pairs acquired against `endpoint`, in order
    pub fn subscribe_log_for(&self, endpoint: &str) -> Vec<(String, MessageHandler<String>)> {
        self.state
            .lock()
            .subscribe_log
            .iter()
            .filter(|(e, _, _)| e == endpoint)
            .map(|(_, t, h)| (t.clone(), h.clone()))
            .collect()
    }

    /// Make `connect` fail for this endpoint
    pub fn refuse(&self, endpoint: &str) {
        self.state.lock().refused_endpoints.insert(endpoint.to_string());
    }

    pub fn reject_subscriptions(&self, reject: bool) {
        self.state.lock().reject_subscriptions = reject;
    }

    /// Notifier of the most recent connection attempt
    pub fn latest_events(&self) -> ConnectionEvents {
        self.state
            .lock()
            .events
            .last()
            .cloned()
            .expect("no connection attempted yet")
    }

    /// Report a failure on the most recent connection
    pub fn fail_latest(&self, kind: FailureKind) {
        self.latest_events().notify(kind, "injected failure");
    }
}

impl Connector for MockBroker {
    type Connection = MockConnection;

    fn connect(
        &self,
        attempt: &ConnectAttempt,
        events: ConnectionEvents,
    ) -> Result<MockConnection, Error> {
        {
            let mut state = self.state.lock();
            state.attempts.push(attempt.clone());
            if state.refused_endpoints.contains(&attempt.endpoint) {
                return Err(Error::Connection(format!("{} refused", attempt.endpoint)));
            }
            state.events.push(events);
        }
        Ok(self.open_connection(&attempt.endpoint))
    }
}

pub(crate) struct MockConnection {
    endpoint: String,
    broker: MockBroker,
    closed: bool,
}

impl ProtocolConnection for MockConnection {
    type Message = String;
    type Subscription = MockSubscription;

    fn subscribe(
        &mut self,
        topic: &str,
        handler: MessageHandler<String>,
    ) -> Result<MockSubscription, Error> {
        let mut state = self.broker.state.lock();
        if state.reject_subscriptions || self.closed {
            return Err(Error::Connection(format!("subscribe to {} rejected", topic)));
        }
        state
            .subscribe_log
            .push((self.endpoint.clone(), topic.to_string(), handler));
        state.live_subscriptions += 1;
        Ok(MockSubscription {
            broker: self.broker.clone(),
            released: false,
        })
    }

    fn deactivate(&mut self) {
        assert!(!self.closed, "connection to {} deactivated twice", self.endpoint);
        self.closed = true;
        self.broker.state.lock().open_connections -= 1;
    }
}

pub(crate) struct MockSubscription {
    broker: MockBroker,
    released: bool,
}

impl LiveSubscription for MockSubscription {
    fn unsubscribe(&mut self) {
        if !self.released {
            self.released = true;
            self.broker.state.lock().live_subscriptions -= 1;
        }
    }
}
