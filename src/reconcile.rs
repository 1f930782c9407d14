//! App-change reconciliation
//!
//! Turns "the display's foreground app is now X" into the ordered receiver
//! commands that bring the receiver in line, plus the new power state.
//! Pure logic: the caller executes the commands and publishes the status.
//!
//! | previous      | new           | power | commands                               |
//! |---------------|---------------|-------|----------------------------------------|
//! | none          | any app       | On    | power on, settle, input for new app    |
//! | any app       | none          | Off   | power off, settle                      |
//! | known app     | other app     | -     | input TV/CD                            |
//! | other app     | other app     | -     | nothing                                |
//! | any           | known app     | -     | input for the known app                |
//! | same as new   |               | -     | nothing                                |

use avsync_protocol::{KnownApp, PowerState};
use std::time::Duration;

use crate::core::state::{App, TvStatus};
use crate::receiver::ReceiverCommand;

/// One step of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCommand {
    /// Issue a receiver command
    Send(ReceiverCommand),
    /// Let the receiver settle before anything else is sent
    Settle(Duration),
}

/// Result of one app-change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Steps to execute, in order
    pub commands: Vec<PendingCommand>,
    /// Power state after the transition
    pub power: PowerState,
    /// False when the notification repeated the current app
    pub changed: bool,
    /// True when nothing is focused on the display any more
    pub idle: bool,
}

/// Tracks the display's foreground app and the derived power state
#[derive(Debug, Clone)]
pub struct Reconciler {
    status: TvStatus,
    receiver_boot: Duration,
}

impl Reconciler {
    pub fn new(receiver_boot: Duration) -> Self {
        Self {
            status: TvStatus::default(),
            receiver_boot,
        }
    }

    pub fn status(&self) -> &TvStatus {
        &self.status
    }

    /// Forget everything: no app, power unknown
    pub fn reset(&mut self) {
        self.status = TvStatus::default();
    }

    pub fn on_app_changed(&mut self, new_app: Option<App>) -> Transition {
        let idle = new_app.is_none();
        if new_app == self.status.app {
            return Transition {
                commands: Vec::new(),
                power: self.status.power,
                changed: false,
                idle,
            };
        }

        let prev_app = std::mem::replace(&mut self.status.app, new_app);
        let mut commands = Vec::new();

        match (&prev_app, &self.status.app) {
            (None, Some(_)) => {
                self.status.power = PowerState::On;
                commands.push(PendingCommand::Send(ReceiverCommand::PowerOn));
                commands.push(PendingCommand::Settle(self.receiver_boot));
            }
            (Some(_), None) => {
                // Powering off supersedes any input change
                self.status.power = PowerState::Off;
                commands.push(PendingCommand::Send(ReceiverCommand::PowerOff));
                commands.push(PendingCommand::Settle(self.receiver_boot));
                return Transition {
                    commands,
                    power: self.status.power,
                    changed: true,
                    idle,
                };
            }
            _ => {}
        }

        if let Some(input) = select_input(prev_app.as_ref(), self.status.app.as_ref()) {
            commands.push(PendingCommand::Send(input));
        }

        Transition {
            commands,
            power: self.status.power,
            changed: true,
            idle,
        }
    }
}

/// Receiver input for `new_app`, or `None` when the receiver is already on
/// the right input
fn select_input(prev_app: Option<&App>, new_app: Option<&App>) -> Option<ReceiverCommand> {
    match new_app? {
        App::Known(KnownApp::Pc) => Some(ReceiverCommand::InputGame),
        App::Known(KnownApp::Receiver) => Some(ReceiverCommand::InputBdDvd),
        App::Other(_) => match prev_app {
            None => Some(ReceiverCommand::InputTvCd),
            Some(prev) if prev.is_known() => Some(ReceiverCommand::InputTvCd),
            Some(_) => None,
        },
    }
}
