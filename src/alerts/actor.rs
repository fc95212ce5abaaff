//! AlertActor - receives anomaly events from ingestion and dispatches alerts
//!
//! ## Suppression
//!
//! The actor remembers, per (server_id, metric) pair, when it last
//! alerted. A metric that breaches again within the cooldown window is
//! dropped from the event; an event where every metric is suppressed is
//! discarded entirely. This prevents a server that sits above a
//! threshold from producing an alert on every submission.
//!
//! Events arrive over a bounded channel fed with `try_send` from the
//! ingestion path, so a slow SMTP relay can never back-pressure the
//! write path. Overflow drops the event with a warning.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, trace, warn};

use super::{AlertDispatcher, AlertEvent};

/// Commands accepted by the actor alongside the event stream.
#[derive(Debug)]
pub enum AlertCommand {
    /// Stop dispatching (events still drain, suppression state untouched)
    Mute,

    /// Resume dispatching
    Unmute,

    GetStats {
        respond_to: oneshot::Sender<AlertStats>,
    },

    Shutdown,
}

/// Dispatch counters, queryable via [`AlertHandle::stats`].
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AlertStats {
    pub dispatched: u64,
    pub suppressed: u64,
    pub muted: bool,
}

pub struct AlertActor {
    dispatcher: AlertDispatcher,

    event_rx: mpsc::Receiver<AlertEvent>,
    command_rx: mpsc::Receiver<AlertCommand>,

    /// Last alert time per (server_id, metric name)
    last_alerted: HashMap<(String, String), Instant>,

    /// Cooldown before re-alerting the same pair. Zero disables
    /// suppression entirely.
    cooldown: Duration,

    muted: bool,
    dispatched: u64,
    suppressed: u64,
}

impl AlertActor {
    fn new(
        dispatcher: AlertDispatcher,
        event_rx: mpsc::Receiver<AlertEvent>,
        command_rx: mpsc::Receiver<AlertCommand>,
        cooldown: Duration,
    ) -> Self {
        Self {
            dispatcher,
            event_rx,
            command_rx,
            last_alerted: HashMap::new(),
            cooldown,
            muted: false,
            dispatched: 0,
            suppressed: 0,
        }
    }

    #[instrument(skip(self))]
    async fn run(mut self) {
        debug!("starting alert actor");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            debug!("event channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AlertCommand::Mute => {
                            debug!("muting alerts");
                            self.muted = true;
                        }

                        AlertCommand::Unmute => {
                            debug!("unmuting alerts");
                            self.muted = false;
                        }

                        AlertCommand::GetStats { respond_to } => {
                            let _ = respond_to.send(AlertStats {
                                dispatched: self.dispatched,
                                suppressed: self.suppressed,
                                muted: self.muted,
                            });
                        }

                        AlertCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    debug!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("alert actor stopped");
    }

    #[instrument(skip(self, event), fields(server_id = %event.server.server_id))]
    async fn handle_event(&mut self, event: AlertEvent) {
        if self.muted {
            trace!("alerts muted, dropping event");
            return;
        }

        let now = Instant::now();
        let server_id = event.server.server_id.clone();

        // Split the breaches into ones inside and outside the cooldown
        // window for this server.
        let mut suppressed_metrics = vec![];
        for (name, _) in event.anomalies.entries() {
            let key = (server_id.clone(), name.to_string());
            if self.cooldown > Duration::ZERO {
                if let Some(last) = self.last_alerted.get(&key) {
                    if now.duration_since(*last) < self.cooldown {
                        suppressed_metrics.push(name);
                        continue;
                    }
                }
            }
            self.last_alerted.insert(key, now);
        }

        self.suppressed += suppressed_metrics.len() as u64;

        let remaining = event.anomalies.without(&suppressed_metrics);
        if remaining.is_empty() {
            trace!("all breaches within cooldown, suppressing event");
            return;
        }

        let event = AlertEvent {
            anomalies: remaining,
            ..event
        };

        self.dispatched += 1;
        self.dispatcher.dispatch(&event).await;
    }
}

/// Handle for feeding and controlling the alert actor.
#[derive(Clone)]
pub struct AlertHandle {
    event_tx: mpsc::Sender<AlertEvent>,
    command_tx: mpsc::Sender<AlertCommand>,
}

impl AlertHandle {
    pub fn spawn(dispatcher: AlertDispatcher, cooldown: Duration) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = AlertActor::new(dispatcher, event_rx, command_rx, cooldown);
        tokio::spawn(actor.run());

        Self {
            event_tx,
            command_tx,
        }
    }

    /// Hand an event to the actor without blocking. A full queue drops
    /// the event with a warning; ingestion must not wait on alerting.
    pub fn notify(&self, event: AlertEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("alert queue full, dropping event: {e}");
        }
    }

    pub async fn mute(&self) {
        let _ = self.command_tx.send(AlertCommand::Mute).await;
    }

    pub async fn unmute(&self) {
        let _ = self.command_tx.send(AlertCommand::Unmute).await;
    }

    pub async fn stats(&self) -> Option<AlertStats> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(AlertCommand::GetStats { respond_to: tx })
            .await
            .ok()?;
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(AlertCommand::Shutdown).await;
    }
}
