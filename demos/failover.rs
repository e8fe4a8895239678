//! Example: failover across simulated brokers
//!
//! Implements a tiny in-process `Connector` whose brokers can be "crashed"
//! on demand, then shows the manager rotating endpoints and replaying
//! subscriptions.
//!
//! Run with: cargo run --example failover

use broker_failover::{
    ConnectAttempt, ConnectionEvents, Connector, Error, FailoverConfig, FailoverManager,
    LiveSubscription, MessageHandler, ProtocolConnection,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

/// Simulated brokers keyed by endpoint
#[derive(Clone, Default)]
struct SimulatedCluster {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

struct Session {
    events: ConnectionEvents,
    handlers: Vec<(String, MessageHandler<String>)>,
}

impl SimulatedCluster {
    /// Deliver a message to every handler subscribed to `topic` on `endpoint`
    fn publish(&self, endpoint: &str, topic: &str, body: &str) {
        let handlers: Vec<_> = self
            .sessions
            .lock()
            .get(endpoint)
            .map(|s| {
                s.handlers
                    .iter()
                    .filter(|(t, _)| t == topic)
                    .map(|(_, h)| h.clone())
                    .collect()
            })
            .unwrap_or_default();
        for handler in handlers {
            handler(body.to_string());
        }
    }

    /// Simulate the broker at `endpoint` dropping the connection
    fn crash(&self, endpoint: &str) {
        if let Some(session) = self.sessions.lock().get(endpoint) {
            session.events.transport_close(format!("{} crashed", endpoint));
        }
    }
}

impl Connector for SimulatedCluster {
    type Connection = SimConnection;

    fn connect(
        &self,
        attempt: &ConnectAttempt,
        events: ConnectionEvents,
    ) -> Result<SimConnection, Error> {
        info!(
            "Simulated connect to {} (heartbeat {:?}/{:?}, failover: {})",
            attempt.endpoint,
            attempt.protocol.heartbeat_incoming,
            attempt.protocol.heartbeat_outgoing,
            attempt.is_failover
        );
        self.sessions.lock().insert(
            attempt.endpoint.clone(),
            Session {
                events,
                handlers: Vec::new(),
            },
        );
        Ok(SimConnection {
            endpoint: attempt.endpoint.clone(),
            cluster: self.clone(),
        })
    }
}

struct SimConnection {
    endpoint: String,
    cluster: SimulatedCluster,
}

impl ProtocolConnection for SimConnection {
    type Message = String;
    type Subscription = SimSubscription;

    fn subscribe(
        &mut self,
        topic: &str,
        handler: MessageHandler<String>,
    ) -> Result<SimSubscription, Error> {
        let mut sessions = self.cluster.sessions.lock();
        let session = sessions
            .get_mut(&self.endpoint)
            .ok_or_else(|| Error::Connection(format!("no session for {}", self.endpoint)))?;
        session.handlers.push((topic.to_string(), handler));
        Ok(SimSubscription)
    }

    fn deactivate(&mut self) {
        self.cluster.sessions.lock().remove(&self.endpoint);
    }
}

struct SimSubscription;

impl LiveSubscription for SimSubscription {
    fn unsubscribe(&mut self) {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let cluster = SimulatedCluster::default();
    let config = FailoverConfig::builder()
        .endpoint("failover:(sim://broker-1, sim://broker-2, sim://broker-3)")
        .reconnect_delay(Duration::from_millis(500))
        .supervisor_interval(Duration::from_millis(100))
        .build()?;

    let manager = FailoverManager::new(config, cluster.clone());
    manager.activate()?;

    // Wait for the first connection
    while manager.current_endpoint().is_none() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let _orders = manager.subscribe("/queue/orders", |body: String| {
        info!("Received order: {}", body);
    })?;
    cluster.publish("sim://broker-1", "/queue/orders", "order-1");

    // Crash the active broker twice; the subscription follows each failover
    for round in 2..=3 {
        let current = manager.current_endpoint().unwrap_or_default();
        info!("Crashing {} (state: {})", current, manager.state());
        cluster.crash(&current);

        tokio::time::sleep(Duration::from_millis(800)).await;
        let next = manager.current_endpoint().unwrap_or_default();
        info!("Now connected to {} (state: {})", next, manager.state());
        cluster.publish(&next, "/queue/orders", &format!("order-{}", round));
    }

    info!("Endpoint order: {:?}", manager.endpoints());
    info!("Metrics: {:?}", manager.metrics().snapshot());

    manager.deactivate();
    info!("Manager stopped (state: {})", manager.state());

    Ok(())
}
