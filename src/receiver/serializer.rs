//! Single gate for every command sent to the receiver
//!
//! Overlapping raw commands confuse the receiver, so `send` holds a FIFO
//! mutex around each transport call. A failed call is reported to the stop
//! signal of the current session instead of to the caller.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ReceiverCommand, ReceiverTransport};
use crate::session::StopSignal;

pub struct CommandSerializer {
    transport: Arc<dyn ReceiverTransport>,
    /// Held for the duration of one transport call
    gate: tokio::sync::Mutex<()>,
    /// Stop signal of the session that receives transport failures
    session: Mutex<Option<StopSignal>>,
}

impl CommandSerializer {
    pub fn new(transport: Arc<dyn ReceiverTransport>) -> Self {
        Self {
            transport,
            gate: tokio::sync::Mutex::new(()),
            session: Mutex::new(None),
        }
    }

    /// Route future transport failures to `stop`
    pub fn attach(&self, stop: StopSignal) {
        *self.session.lock() = Some(stop);
    }

    /// Issue one command. Returns whether the receiver accepted it.
    pub async fn send(&self, command: ReceiverCommand) -> bool {
        let result = {
            let _guard = self.gate.lock().await;
            info!("Receiver: {}", command);
            self.transport.send_code(command.code()).await
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Receiver command '{}' failed: {}", command, e);
                let stop = self.session.lock().clone();
                match stop {
                    Some(stop) => {
                        if !stop.fail(e) {
                            debug!("Session already stopping, dropping receiver error");
                        }
                    }
                    None => debug!("No session attached, dropping receiver error"),
                }
                false
            }
        }
    }
}
