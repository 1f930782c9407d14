//! Core module - configuration, shared state and connection events

pub mod config;
pub mod events;
pub mod state;
