//! ISO 15118-20 DC message subset
//!
//! - `types`: enumerations and shared message fields
//! - `dc`: DC-specific request/response pairs
//! - `common`: ScheduleExchange and PowerDelivery
//! - `envelope`: request/response enums exchanged with the transport

pub mod types;
pub mod dc;
pub mod common;
pub mod envelope;

pub use types::*;
pub use dc::*;
pub use common::*;
pub use envelope::{MessageKind, V2gRequest, V2gResponse};
