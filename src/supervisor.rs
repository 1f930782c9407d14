//! Display connection supervisor
//!
//! Runs one display session at a time for the life of the process. Each
//! session connects, feeds foreground-app notifications through the
//! reconciler one by one, and ends when its stop signal resolves. The loop
//! then waits (longer after a clean end, shorter after a failure) and
//! reconnects, until the shutdown token is cancelled.
//!
//! The published status is reset to unknown at the start of every attempt
//! and right after a failed session.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::config::Timeouts;
use crate::core::events::{DisplayEvent, EventSender};
use crate::core::state::{App, SharedState};
use crate::display::DisplayConnector;
use crate::receiver::CommandSerializer;
use crate::reconcile::{PendingCommand, Reconciler};
use crate::session::{SessionEnd, SessionError, SessionOutcome, StopSignal};

pub struct Supervisor {
    connector: Arc<dyn DisplayConnector>,
    serializer: Arc<CommandSerializer>,
    shared: Arc<SharedState>,
    timeouts: Timeouts,
}

impl Supervisor {
    pub fn new(
        connector: Arc<dyn DisplayConnector>,
        serializer: Arc<CommandSerializer>,
        shared: Arc<SharedState>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            connector,
            serializer,
            shared,
            timeouts,
        }
    }

    /// Supervise display sessions until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut reconciler = Reconciler::new(self.timeouts.receiver_boot());

        loop {
            self.reset(&mut reconciler);
            info!("Connecting to display...");

            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                outcome = self.run_session(&mut reconciler) => outcome,
            };

            let delay = match outcome {
                Ok(end) => {
                    let delay = self.timeouts.reconnect();
                    info!("Session ended ({}), reconnecting in {:?}", end, delay);
                    delay
                }
                Err(e) => {
                    // Nothing reported by the failed session can be trusted
                    self.reset(&mut reconciler);
                    let delay = self.timeouts.retry_connect();
                    warn!("Session failed: {}, retrying in {:?}", e, delay);
                    delay
                }
            };

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.shared.set_display(None);
        info!("Supervisor stopped");
    }

    fn reset(&self, reconciler: &mut Reconciler) {
        reconciler.reset();
        self.shared.publish(reconciler.status().clone());
    }

    /// One connection, from connect until the stop signal resolves
    async fn run_session(&self, reconciler: &mut Reconciler) -> SessionOutcome {
        let (stop, mut stopped) = StopSignal::new();
        self.serializer.attach(stop.clone());

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let client = self.connector.connect(EventSender::new(event_tx)).await?;
        self.shared.set_display(Some(Arc::clone(&client)));

        let outcome = loop {
            let event = tokio::select! {
                biased;
                outcome = &mut stopped => break outcome,
                event = event_rx.recv() => event,
            };
            let Some(event) = event else {
                break Err(SessionError::EventsClosed);
            };

            // Handle one event at a time; later events queue in the channel,
            // so a `Failed` event waits behind the current transition.
            // A resolved stop signal abandons the rest of the transition.
            tokio::select! {
                biased;
                outcome = &mut stopped => break outcome,
                _ = self.handle_event(event, reconciler, &stop) => {}
            }
        };

        self.shared.set_display(None);
        client.disconnect().await;
        outcome
    }

    async fn handle_event(&self, event: DisplayEvent, reconciler: &mut Reconciler, stop: &StopSignal) {
        match event {
            DisplayEvent::AppChanged(app_id) => {
                let idle = self.apply(reconciler, app_id.map(App::from_app_id)).await;
                if idle && !stop.complete(SessionEnd::Idle) {
                    debug!("Session already stopping");
                }
            }
            DisplayEvent::Disconnected => {
                info!("Display closed the connection");
                self.apply(reconciler, None).await;
                stop.complete(SessionEnd::Disconnected);
            }
            DisplayEvent::Failed(e) => {
                stop.fail(e);
            }
        }
    }

    /// Reconcile one foreground-app value and execute the resulting commands.
    /// Returns whether the display is idle.
    async fn apply(&self, reconciler: &mut Reconciler, app: Option<App>) -> bool {
        let transition = reconciler.on_app_changed(app);
        if !transition.changed {
            return transition.idle;
        }

        match &reconciler.status().app {
            Some(app) => info!("New input: {} (power {})", app, transition.power),
            None => info!("No input (power {})", transition.power),
        }
        self.shared.publish(reconciler.status().clone());

        for command in transition.commands {
            match command {
                PendingCommand::Send(command) => {
                    self.serializer.send(command).await;
                }
                PendingCommand::Settle(delay) => {
                    debug!("Waiting {:?} for the receiver", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        transition.idle
    }
}
