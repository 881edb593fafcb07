//! Alert decisioning and notification
//!
//! This module owns:
//! - The dedup state machine deciding which anomalies escalate to a
//!   new alert versus being absorbed by an open alert window
//! - The notification dispatch seam and its tracing-backed default

mod engine;
mod notify;

pub use engine::{AlertDecision, AlertDecisionEngine};
pub use notify::{LogDispatcher, NotificationDispatcher};
