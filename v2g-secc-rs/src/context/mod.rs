//! EV and EVSE data contexts
//!
//! Passive per-session records. States write them while reading requests
//! and composing responses; the EVSE controller reads them to drive the
//! power electronics. No validation happens here.

pub mod ev;
pub mod evse;

pub use ev::*;
pub use evse::*;
