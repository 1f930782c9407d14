//! avsync
//!
//! Keeps an A/V receiver in step with a smart display.
//!
//! # Features
//! - Supervises a connection to an LG webOS display, reconnecting forever
//! - Powers the receiver on/off as the display turns on/off
//! - Switches the receiver input to match the display's foreground app
//! - Sends every receiver command through a single serialized gate
//! - HTTP control surface to wake the display or the PC and switch inputs

pub mod core;
pub mod display;
pub mod receiver;
pub mod reconcile;
pub mod rpc;
pub mod session;
pub mod supervisor;
pub mod wol;

pub use core::config::Config;
pub use core::events::DisplayEvent;
pub use core::state::{App, SharedState, TvStatus};
pub use reconcile::{PendingCommand, Reconciler, Transition};
pub use supervisor::Supervisor;
