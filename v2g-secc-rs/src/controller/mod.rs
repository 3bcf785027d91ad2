//! EVSE controller capability
//!
//! The session never touches hardware directly. Everything physical goes
//! through [`EvseController`]:
//! - Contactor and isolation monitoring (cable check)
//! - Control pilot readout
//! - Pre-charge and power limit setpoints
//!
//! # Implementing a controller
//!
//! ```ignore
//! struct MyPowerStack;
//!
//! #[async_trait]
//! impl EvseController for MyPowerStack {
//!     async fn is_contactor_closed(&self) -> ControllerResult<bool> {
//!         // Read contactor feedback over CAN
//!     }
//!
//!     // ... implement other methods
//! }
//! ```
//!
//! A controller shared by several sessions must serialize access to any
//! common hardware channel itself.

pub mod simulator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{EvDataContext, EvseDataContext};
use crate::messages::{ControlMode, Protocol, ScheduleTuple, ServiceV20};

pub use simulator::{PowerLimitCommand, SimEvseController};

/// Errors reported by a controller implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Hardware unavailable: {0}")]
    Unavailable(String),

    #[error("Command rejected: {0}")]
    Rejected(String),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Insulation monitoring result (IEC 61851-23)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    Invalid,
    Valid,
    Warning,
    Fault,
    NoImd,
}

/// Control pilot state (IEC 61851-1)
///
/// Letter is the vehicle-side resistance state, digit tells whether the
/// station oscillator is on (2) or off (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpState {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
    D1,
    D2,
    E,
    F,
    Unknown,
}

/// What a control pilot state means for energy transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpReadiness {
    /// Vehicle requests energy and the station signals availability
    EnergyTransfer,
    /// Vehicle connected but not requesting energy
    EvNotReady,
    /// Vehicle requests energy but the station oscillator is off
    EvseNotReady,
    /// No vehicle connected
    Disconnected,
    /// Short circuit, station error or unreadable signal
    Fault,
}

impl CpState {
    pub fn readiness(self) -> CpReadiness {
        match self {
            CpState::C2 | CpState::D2 => CpReadiness::EnergyTransfer,
            CpState::B1 | CpState::B2 => CpReadiness::EvNotReady,
            CpState::C1 | CpState::D1 => CpReadiness::EvseNotReady,
            CpState::A1 | CpState::A2 => CpReadiness::Disconnected,
            CpState::E | CpState::F | CpState::Unknown => CpReadiness::Fault,
        }
    }
}

/// Hardware capability consumed by the DC states
#[async_trait]
pub trait EvseController: Send + Sync {
    async fn is_contactor_closed(&self) -> ControllerResult<bool>;

    /// Kick off insulation monitoring; called once per cable check phase
    async fn start_cable_check(&self) -> ControllerResult<()>;

    /// `None` while the insulation measurement is still running
    async fn get_cable_check_status(&self) -> ControllerResult<Option<IsolationLevel>>;

    async fn get_cp_state(&self) -> ControllerResult<CpState>;

    async fn set_precharge(&self, target_voltage: f64, present_voltage: f64) -> ControllerResult<()>;

    async fn get_evse_present_voltage(&self) -> ControllerResult<f64>;

    async fn get_evse_present_current(&self) -> ControllerResult<f64>;

    async fn is_evse_power_limit_achieved(&self) -> ControllerResult<bool>;

    async fn is_evse_current_limit_achieved(&self) -> ControllerResult<bool>;

    async fn is_evse_voltage_limit_achieved(&self) -> ControllerResult<bool>;

    /// `None` while the schedule is still being computed
    async fn get_schedule_tuples(
        &self,
        service: ServiceV20,
    ) -> ControllerResult<Option<Vec<ScheduleTuple>>>;

    /// Apply the negotiated limits to the power electronics
    async fn send_charging_power_limits(
        &self,
        protocol: Protocol,
        control_mode: ControlMode,
        service: ServiceV20,
        ev: &EvDataContext,
        evse: &EvseDataContext,
    ) -> ControllerResult<()>;

    /// Ramp down and open contactors
    async fn stop_charger(&self) -> ControllerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp_state_classification() {
        assert_eq!(CpState::C2.readiness(), CpReadiness::EnergyTransfer);
        assert_eq!(CpState::D2.readiness(), CpReadiness::EnergyTransfer);
        assert_eq!(CpState::B2.readiness(), CpReadiness::EvNotReady);
        assert_eq!(CpState::C1.readiness(), CpReadiness::EvseNotReady);
        assert_eq!(CpState::A2.readiness(), CpReadiness::Disconnected);
        assert_eq!(CpState::F.readiness(), CpReadiness::Fault);
        assert_eq!(CpState::Unknown.readiness(), CpReadiness::Fault);
    }
}
