//! # broker-failover
//!
//! A failover connection manager for publish/subscribe broker clients.
//!
//! ## Features
//!
//! - **Failover groups**: `failover:(ws://a, ws://b)` syntax, nested lists
//! - **Round-robin failover** with a fixed reconnect delay, retried indefinitely
//! - **Subscription replay** onto every new connection
//! - **Cancellable lifecycle**: `deactivate()` stops both the supervisory tick
//!   and any pending restart
//! - **Metrics** for observability
//!
//! The wire protocol is not implemented here. Plug in a protocol client by
//! implementing [`Connector`], [`ProtocolConnection`] and [`LiveSubscription`].
//!
//! ## Example
//!
//! ```ignore
//! use broker_failover::{FailoverConfig, FailoverManager};
//! use std::time::Duration;
//!
//! let config = FailoverConfig::builder()
//!     .endpoint("failover:(ws://broker-1:61614, ws://broker-2:61614)")
//!     .reconnect_delay(Duration::from_secs(2))
//!     .build()?;
//!
//! let manager = FailoverManager::new(config, StompConnector::default());
//! manager.activate()?;
//!
//! // once connected:
//! let sub = manager.subscribe("/queue/orders", |msg| println!("{msg:?}"))?;
//! ```

mod config;
mod connection;
mod connector;
mod endpoint;
mod error;
mod manager;
mod metrics;
mod rotation;
mod subscription;

#[cfg(test)]
mod test_utils;

pub use config::{ConfigError, FailoverConfig, FailoverConfigBuilder, ProtocolConfig};
pub use connector::{
    ConnectAttempt, ConnectionEvents, Connector, FailureKind, LiveSubscription, MessageHandler,
    MessageOf, ProtocolConnection,
};
pub use endpoint::{normalize, normalize_value, EndpointSpec};
pub use error::{Error, ErrorKind};
pub use manager::{ClientState, FailoverManager};
pub use metrics::{Metrics, MetricsSnapshot};
pub use rotation::EndpointRing;
pub use subscription::{Subscription, SubscriptionId};

/// Result type for broker-failover operations
pub type Result<T> = std::result::Result<T, Error>;
