use crate::config::FailoverConfig;
use crate::connector::{
    ConnectAttempt, ConnectionEvents, Connector, FailureEvent, FailureKind, ProtocolConnection,
};
use crate::manager::ClientState;
use crate::metrics::Metrics;
use crate::rotation::EndpointRing;
use crate::subscription::Registry;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// The single physical connection owned by the controller
pub(crate) struct ActiveConnection<P> {
    pub generation: u64,
    pub endpoint: String,
    pub handle: P,
}

/// Controller state shared between the manager façade and the supervisor task
pub(crate) struct ControllerState<C: Connector> {
    pub ring: EndpointRing,
    pub registry: Registry<C::Connection>,
    /// Absent while inactive, reconnecting, or before the first tick
    pub connection: Option<ActiveConnection<C::Connection>>,
    pub active: bool,
    /// Overrides the state derived from `active` (set during failover)
    pub status: Option<ClientState>,
    /// Bumped on every activation; a supervisor only acts while it matches
    pub run_id: u64,
    /// Supervisor task of the current run; aborting it cancels both the
    /// pending tick and any scheduled restart
    pub supervisor: Option<JoinHandle<()>>,
    last_generation: u64,
}

impl<C: Connector> ControllerState<C> {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            ring: EndpointRing::new(endpoints),
            registry: Registry::default(),
            connection: None,
            active: false,
            status: None,
            run_id: 0,
            supervisor: None,
            last_generation: 0,
        }
    }

    pub fn state(&self) -> ClientState {
        self.status.unwrap_or(if self.active {
            ClientState::Active
        } else {
            ClientState::Inactive
        })
    }

    fn is_current_run(&self, run_id: u64) -> bool {
        self.active && self.run_id == run_id
    }

    fn is_current_connection(&self, generation: u64) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.generation == generation)
    }

    fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    /// Release leased subscription handles and tear down the physical
    /// connection. Safe to call with no connection.
    pub fn teardown(&mut self) {
        self.registry.release_all();
        if let Some(mut connection) = self.connection.take() {
            connection.handle.deactivate();
            info!(
                "[CONN-{}] Closed connection to {}",
                connection.generation, connection.endpoint
            );
        }
    }
}

enum TickOutcome {
    Continue,
    Stop,
    Failed(FailureEvent),
}

/// Supervisor for one activation run.
///
/// Drives the tick → connect → replay → failure → failover → delay cycle
/// until the run is cancelled. All steps take the state lock, so ticks,
/// failovers and caller operations never interleave.
pub(crate) struct Supervisor<C: Connector> {
    run_id: u64,
    state: Arc<Mutex<ControllerState<C>>>,
    connector: Arc<C>,
    config: Arc<FailoverConfig>,
    metrics: Arc<Metrics>,
    events_tx: mpsc::UnboundedSender<FailureEvent>,
    events_rx: mpsc::UnboundedReceiver<FailureEvent>,
    failovers: u64,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(
        run_id: u64,
        state: Arc<Mutex<ControllerState<C>>>,
        connector: Arc<C>,
        config: Arc<FailoverConfig>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            run_id,
            state,
            connector,
            config,
            metrics,
            events_tx,
            events_rx,
            failovers: 0,
        }
    }

    /// Run until deactivated. Connection failures never end the loop.
    pub async fn run(mut self) {
        loop {
            let Some(failure) = self.supervise().await else {
                return;
            };

            if !self.failover(&failure) {
                return;
            }

            self.wait_out_delay().await;

            if !self.reactivate() {
                return;
            }
        }
    }

    /// Tick until the current connection fails. Returns `None` once the run
    /// is no longer current.
    async fn supervise(&mut self) -> Option<FailureEvent> {
        let period = self.config.supervisor_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick() {
                        TickOutcome::Continue => {}
                        TickOutcome::Stop => return None,
                        TickOutcome::Failed(failure) => return Some(failure),
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    if self.state.lock().is_current_connection(event.generation) {
                        return Some(event);
                    }
                    self.discard_stale(&event);
                }
            }
        }
    }

    /// Sleep for the reconnect delay. No connection exists meanwhile, so
    /// every notification received is from a torn-down connection.
    async fn wait_out_delay(&mut self) {
        let delay = tokio::time::sleep(self.config.reconnect_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = &mut delay => return,
                Some(event) = self.events_rx.recv() => self.discard_stale(&event),
            }
        }
    }

    fn discard_stale(&self, event: &FailureEvent) {
        self.metrics.record_stale_event();
        debug!(
            "[CONN-{}] Ignoring {} from replaced connection",
            event.generation, event.kind
        );
    }

    /// One supervisory tick: open a connection to the head endpoint if none
    /// exists and replay the registry onto it.
    fn tick(&self) -> TickOutcome {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if !state.is_current_run(self.run_id) {
            debug!("Supervisor run {} no longer current, stopping", self.run_id);
            return TickOutcome::Stop;
        }
        if state.connection.is_some() {
            return TickOutcome::Continue;
        }
        let Some(endpoint) = state.ring.current().map(str::to_string) else {
            trace!("No candidate endpoints, idling");
            return TickOutcome::Continue;
        };

        let generation = state.next_generation();
        let attempt = ConnectAttempt {
            endpoint,
            generation,
            is_failover: self.failovers > 0,
            protocol: self.config.protocol.clone(),
        };
        self.metrics.record_connection_attempt();
        info!("[CONN-{}] Connecting to {}", generation, attempt.endpoint);

        let events = ConnectionEvents::new(generation, self.events_tx.clone());
        match self.connector.connect(&attempt, events) {
            Ok(mut handle) => {
                let stats = state.registry.replay(&mut handle, generation);
                self.metrics.record_resubscriptions(stats.resubscribed);
                self.metrics.record_resubscription_failures(stats.failed);
                if state.registry.len() > 0 {
                    info!(
                        "[CONN-{}] Replayed {} subscriptions ({} failed)",
                        generation, stats.resubscribed, stats.failed
                    );
                }
                state.connection = Some(ActiveConnection {
                    generation,
                    endpoint: attempt.endpoint,
                    handle,
                });
                TickOutcome::Continue
            }
            Err(e) => {
                self.metrics.record_connect_failure();
                TickOutcome::Failed(FailureEvent {
                    generation,
                    kind: FailureKind::ConnectFailed,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Tear down the failed connection, enter `Reconnecting` and rotate to
    /// the next endpoint. Returns `false` if the run was cancelled meanwhile.
    fn failover(&mut self, failure: &FailureEvent) -> bool {
        let mut state = self.state.lock();
        if !state.is_current_run(self.run_id) {
            return false;
        }

        warn!(
            "[CONN-{}] Connection failed ({}): {}",
            failure.generation, failure.kind, failure.reason
        );
        state.teardown();
        state.status = Some(ClientState::Reconnecting);
        let next = state.ring.rotate().map(str::to_string);

        self.failovers += 1;
        self.metrics.record_failover();
        info!(
            "Failing over to {} in {:?}",
            next.as_deref().unwrap_or("<none>"),
            self.config.reconnect_delay
        );
        true
    }

    /// Leave `Reconnecting` after the delay; the next `supervise` restarts
    /// ticking.
    fn reactivate(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_current_run(self.run_id) {
            return false;
        }
        state.status = None;
        debug!("Reconnect delay elapsed, reactivating");
        true
    }
}
