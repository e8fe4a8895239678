use crate::config::ProtocolConfig;
use crate::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Callback invoked for every message delivered on a subscription.
///
/// Acknowledgment, if the protocol needs it, is performed on the message
/// value itself.
pub type MessageHandler<M> = Arc<dyn Fn(M) + Send + Sync>;

/// Message type delivered by a connector's connections
pub type MessageOf<C> = <<C as Connector>::Connection as ProtocolConnection>::Message;

/// Why a physical connection is considered failed.
///
/// All kinds lead to the same failover path; the distinction is kept for
/// logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Broker sent a protocol-level error frame
    ProtocolError,
    /// Transport reported an error
    TransportError,
    /// Transport closed unexpectedly
    TransportClose,
    /// Broker or client completed a graceful disconnect
    Disconnect,
    /// The connector refused to create a connection
    ConnectFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::ProtocolError => "protocol error",
            FailureKind::TransportError => "transport error",
            FailureKind::TransportClose => "transport closed",
            FailureKind::Disconnect => "disconnected",
            FailureKind::ConnectFailed => "connect failed",
        };
        f.write_str(name)
    }
}

/// Failure notification tagged with the connection it came from
#[derive(Debug, Clone)]
pub(crate) struct FailureEvent {
    pub generation: u64,
    pub kind: FailureKind,
    pub reason: String,
}

/// Notifier handed to the protocol client for one physical connection.
///
/// Cheap to clone. Notifications from a connection that has already been
/// replaced are ignored by the manager, so a protocol client may report
/// freely without tracking whether it is still current.
#[derive(Debug, Clone)]
pub struct ConnectionEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<FailureEvent>,
}

impl ConnectionEvents {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<FailureEvent>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the connection these notifications belong to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report a failure of the given kind
    pub fn notify(&self, kind: FailureKind, reason: impl Into<String>) {
        let event = FailureEvent {
            generation: self.generation,
            kind,
            reason: reason.into(),
        };
        // Receiver is gone once the manager deactivates; nothing to do then.
        if self.tx.send(event).is_err() {
            trace!("[CONN-{}] Dropping {} notification, manager inactive", self.generation, kind);
        }
    }

    /// Broker sent a protocol error
    pub fn protocol_error(&self, reason: impl Into<String>) {
        self.notify(FailureKind::ProtocolError, reason);
    }

    /// Transport reported an error
    pub fn transport_error(&self, reason: impl Into<String>) {
        self.notify(FailureKind::TransportError, reason);
    }

    /// Transport closed
    pub fn transport_close(&self, reason: impl Into<String>) {
        self.notify(FailureKind::TransportClose, reason);
    }

    /// Graceful disconnect completed
    pub fn disconnected(&self) {
        self.notify(FailureKind::Disconnect, "disconnected");
    }
}

/// Parameters for a single connection attempt
#[derive(Debug, Clone)]
pub struct ConnectAttempt {
    /// Endpoint at the head of the candidate list
    pub endpoint: String,
    /// Generation number of the connection being created (starts at 1)
    pub generation: u64,
    /// Whether this attempt follows a failover
    pub is_failover: bool,
    /// Pass-through protocol options
    pub protocol: ProtocolConfig,
}

/// Factory for physical connections.
///
/// This is the seam to the underlying protocol client. The manager owns
/// endpoint selection, retry timing and subscription replay; the connector
/// only has to open a session to the endpoint it is given and report failures
/// through the supplied [`ConnectionEvents`].
///
/// `connect` must not block: it returns a handle immediately and the protocol
/// client establishes the session in the background. It runs while the
/// manager's state lock is held, so a blocking `connect` also blocks
/// [`FailoverManager::state`](crate::FailoverManager::state),
/// [`FailoverManager::subscribe`](crate::FailoverManager::subscribe) and
/// `deactivate` until it returns. Implementations must not call back into the
/// manager synchronously from `connect` or `subscribe`.
///
/// # Example
///
/// ```ignore
/// use broker_failover::{ConnectAttempt, ConnectionEvents, Connector};
///
/// struct StompConnector;
///
/// impl Connector for StompConnector {
///     type Connection = StompSession;
///
///     fn connect(
///         &self,
///         attempt: &ConnectAttempt,
///         events: ConnectionEvents,
///     ) -> Result<StompSession, broker_failover::Error> {
///         let session = StompSession::spawn(&attempt.endpoint, &attempt.protocol);
///         session.on_error(move |e| events.transport_error(e.to_string()));
///         Ok(session)
///     }
/// }
/// ```
pub trait Connector: Send + Sync + 'static {
    /// Physical connection type produced by this connector
    type Connection: ProtocolConnection;

    /// Open a connection to `attempt.endpoint`.
    ///
    /// An `Err` is treated like any other connection failure: the manager
    /// rotates to the next endpoint after the reconnect delay.
    fn connect(
        &self,
        attempt: &ConnectAttempt,
        events: ConnectionEvents,
    ) -> Result<Self::Connection, Error>;
}

/// A live session to one endpoint
pub trait ProtocolConnection: Send + 'static {
    /// Message type delivered to subscription handlers
    type Message: Send + 'static;
    /// Subscription handle leased from this connection
    type Subscription: LiveSubscription;

    /// Subscribe `handler` to `topic` on this connection
    fn subscribe(
        &mut self,
        topic: &str,
        handler: MessageHandler<Self::Message>,
    ) -> Result<Self::Subscription, Error>;

    /// Tear the session down. Called exactly once per connection.
    fn deactivate(&mut self);
}

/// Subscription handle bound to one physical connection
pub trait LiveSubscription: Send + 'static {
    /// Release the subscription on its connection
    fn unsubscribe(&mut self);
}
