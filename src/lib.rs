//! Daily usage quota for privileged calls, with a quota-gated chat client
//! and a couple of unmetered public API clients.

pub mod chat;
pub mod config;
pub mod error;
pub mod gate;
pub mod monitoring;
pub mod public_apis;
pub mod store;
pub mod time;
pub mod usage;
