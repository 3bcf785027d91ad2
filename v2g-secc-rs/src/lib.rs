//! # V2G SECC
//!
//! ISO 15118-20 DC charging session core for the station-side
//! communication controller (SECC).
//!
//! This crate sequences the DC message exchange of one charging session,
//! keeps the limits offered and requested on both sides, and encodes
//! physical quantities into the protocol's fixed-point wire format.
//!
//! ## Architecture
//!
//! ```text
//!   EV (via transport / EXI codec)
//!       │ V2gRequest            ▲ V2gResponse
//!       ▼                       │
//! ┌─────────────────────────────────────┐
//! │    SeccSession                      │
//! │  ┌───────────┐   ┌───────────────┐  │
//! │  │ DC states │◄─►│ EV / EVSE     │  │
//! │  │ (6)       │   │ data contexts │  │
//! │  └─────┬─────┘   └───────────────┘  │
//! └────────┼────────────────────────────┘
//!          │ async calls
//!          ▼
//! ┌─────────────────────────────────────┐
//! │    EvseController                   │
//! │  Contactor │ IMD │ CP │ Power stack │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## DC Sequence
//!
//! | State | Request | Leaves to |
//! |-------|---------|-----------|
//! | DC_ChargeParameterDiscovery | DC_ChargeParameterDiscoveryReq | ScheduleExchange |
//! | ScheduleExchange | ScheduleExchangeReq | DC_CableCheck (on CableCheckReq) |
//! | DC_CableCheck | DC_CableCheckReq | DC_PreCharge (isolation valid) |
//! | DC_PreCharge | DC_PreChargeReq | PowerDelivery |
//! | PowerDelivery | PowerDeliveryReq | DC_ChargeLoop (CP C2/D2) |
//! | DC_ChargeLoop | DC_ChargeLoopReq | PowerDelivery (on PowerDeliveryReq) |
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use v2g_secc::{CommSession, SeccConfig, SeccSession, SimEvseController};
//! use v2g_secc::controller::simulator::default_evse_data_context;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SeccConfig::default();
//!     let controller = Arc::new(SimEvseController::from_config(&config.simulator));
//!     let comm = CommSession::new(&config.session, default_evse_data_context(), controller);
//!
//!     let (req_tx, req_rx) = mpsc::channel(8);
//!     let (res_tx, mut res_rx) = mpsc::channel(8);
//!     let session = tokio::spawn(SeccSession::new(comm).run(req_rx, res_tx));
//!
//!     // Feed decoded requests into req_tx, send responses from res_rx
//!     drop(req_tx);
//!     while res_rx.recv().await.is_some() {}
//!     let end = session.await.unwrap();
//!     println!("{:?}", end.reason);
//! }
//! ```

pub mod rational;
pub mod messages;
pub mod context;
pub mod controller;
pub mod failed_responses;
pub mod states;
pub mod session;
pub mod config;
pub mod error;

pub use config::{SeccConfig, SessionConfig, SimulatorConfig};
pub use error::{Result, SeccError};
pub use session::{CommSession, ProtocolFault, SeccSession, SessionEnd};

// Re-export key types
pub use controller::{
    ControllerError, CpState, EvseController, IsolationLevel, SimEvseController,
};
pub use rational::{RationalError, RationalNumber};
pub use states::{NextState, StateId, StopReason, Transition};
