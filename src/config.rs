use crate::endpoint::{normalize, EndpointSpec};
use crate::error::Error;
use std::time::Duration;

/// Default delay between a failure and the next activation
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);
/// Default period of the supervisory tick
pub const DEFAULT_SUPERVISOR_INTERVAL: Duration = Duration::from_secs(1);
/// Default heartbeat interval, both directions
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(10000);

/// Configuration for the failover manager
#[derive(Debug, Clone)]
pub struct FailoverConfig {
    /// Normalized candidate endpoints, in initial order
    endpoints: Vec<String>,
    /// Fixed delay between tearing down a failed connection and reactivating
    pub reconnect_delay: Duration,
    /// Period of the supervisory tick
    pub supervisor_interval: Duration,
    /// Options handed through to the protocol client on every connect
    pub protocol: ProtocolConfig,
}

impl FailoverConfig {
    /// Create a new builder for configuration
    pub fn builder() -> FailoverConfigBuilder {
        FailoverConfigBuilder::default()
    }

    /// Normalized candidate endpoints
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

/// Pass-through protocol options.
///
/// This is the only options value the protocol client sees. It deliberately
/// has no endpoint or reconnect delay: endpoint selection and retry timing
/// belong to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Heartbeat interval expected from the broker
    pub heartbeat_incoming: Duration,
    /// Heartbeat interval promised to the broker
    pub heartbeat_outgoing: Duration,
    /// Extra headers sent with the protocol-level connect
    pub connect_headers: Vec<(String, String)>,
    /// Give up on a single connection attempt after this long
    pub connection_timeout: Option<Duration>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            heartbeat_incoming: DEFAULT_HEARTBEAT,
            heartbeat_outgoing: DEFAULT_HEARTBEAT,
            connect_headers: Vec::new(),
            connection_timeout: None,
        }
    }
}

/// Builder for FailoverConfig
#[derive(Debug, Clone)]
pub struct FailoverConfigBuilder {
    endpoint: Option<EndpointSpec>,
    reconnect_delay: Duration,
    supervisor_interval: Duration,
    protocol: ProtocolConfig,
}

impl Default for FailoverConfigBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            supervisor_interval: DEFAULT_SUPERVISOR_INTERVAL,
            protocol: ProtocolConfig::default(),
        }
    }
}

impl FailoverConfigBuilder {
    /// Set the endpoint specification (URL, list, or `failover:(...)` group)
    pub fn endpoint(mut self, endpoint: impl Into<EndpointSpec>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the fixed reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the supervisory tick period
    pub fn supervisor_interval(mut self, interval: Duration) -> Self {
        self.supervisor_interval = interval;
        self
    }

    /// Set the incoming heartbeat interval
    pub fn heartbeat_incoming(mut self, interval: Duration) -> Self {
        self.protocol.heartbeat_incoming = interval;
        self
    }

    /// Set the outgoing heartbeat interval
    pub fn heartbeat_outgoing(mut self, interval: Duration) -> Self {
        self.protocol.heartbeat_outgoing = interval;
        self
    }

    /// Add a protocol-level connect header
    pub fn connect_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.protocol.connect_headers.push((name.into(), value.into()));
        self
    }

    /// Set the per-attempt connection timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.protocol.connection_timeout = Some(timeout);
        self
    }

    /// Build the configuration with validation.
    ///
    /// The endpoint specification is normalized here. An empty result (for
    /// example `failover:()`) is accepted; the manager then stays idle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if no endpoint was given, and
    /// [`Error::Config`] for a zero supervisor interval.
    pub fn build(self) -> Result<FailoverConfig, Error> {
        let spec = match self.endpoint {
            Some(spec) if !spec.is_missing() => spec,
            _ => return Err(Error::InvalidEndpoint("missing endpoint".to_string())),
        };

        if self.supervisor_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "supervisor_interval must be > 0".to_string(),
            )
            .into());
        }

        Ok(FailoverConfig {
            endpoints: normalize(&spec),
            reconnect_delay: self.reconnect_delay,
            supervisor_interval: self.supervisor_interval,
            protocol: self.protocol,
        })
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid timer interval
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),
}
