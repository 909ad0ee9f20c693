//! Alert correlation relay.
//!
//! Watches chat channels for monitoring alerts, suppresses repeats of an
//! open incident, and relays the first trigger and the final recovery of
//! each incident to one broadcast channel. Optionally mirrors alerts into
//! an issue tracker.

pub mod api;
pub mod config;
pub mod correlation;
pub mod error;
pub mod integrations;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod processing;
pub mod state;

pub use error::{AppError, Result};
