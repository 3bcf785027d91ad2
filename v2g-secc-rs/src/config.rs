//! Configuration for the SECC session core
//!
//! Combines the negotiated session parameters with the settings of the
//! simulated power stack. Usable as a plain builder or loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::controller::{CpState, IsolationLevel};
use crate::error::{Result, SeccError};
use crate::messages::{ControlMode, Protocol, SelectedEnergyService, ServiceV20};

/// Complete SECC configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeccConfig {
    pub session: SessionConfig,
    pub simulator: SimulatorConfig,
}

/// Outcome of the negotiation phases preceding the DC states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub protocol: Protocol,

    /// Energy service selected during ServiceSelection
    pub service: ServiceV20,

    /// Whether the selected service is free of charge
    pub is_free: bool,

    pub control_mode: ControlMode,
}

/// Initial readings of the simulated controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub contactor_closed: bool,

    /// `None` keeps the insulation test pending
    pub isolation_level: Option<IsolationLevel>,

    pub cp_state: CpState,

    /// EVSE present voltage (V)
    pub present_voltage: f64,

    /// EVSE present current (A)
    pub present_current: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Iso15118_20Dc,
            service: ServiceV20::Dc,
            is_free: true,
            control_mode: ControlMode::Scheduled,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            contactor_closed: true,
            isolation_level: Some(IsolationLevel::Valid),
            cp_state: CpState::C2,
            present_voltage: 0.0,
            present_current: 0.0,
        }
    }
}

impl SessionConfig {
    pub fn selected_energy_service(&self) -> SelectedEnergyService {
        SelectedEnergyService {
            is_free: self.is_free,
            ..SelectedEnergyService::new(self.service)
        }
    }
}

impl SeccConfig {
    pub fn new(service: ServiceV20, control_mode: ControlMode) -> Self {
        Self {
            session: SessionConfig {
                service,
                control_mode,
                ..Default::default()
            },
            simulator: SimulatorConfig::default(),
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| SeccError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Set energy service
    pub fn with_service(mut self, service: ServiceV20) -> Self {
        self.session.service = service;
        self
    }

    /// Set control mode
    pub fn with_control_mode(mut self, control_mode: ControlMode) -> Self {
        self.session.control_mode = control_mode;
        self
    }

    /// Mark the service as billed
    pub fn with_paid_service(mut self) -> Self {
        self.session.is_free = false;
        self
    }

    /// Start the simulator with the contactor open
    pub fn with_contactor_open(mut self) -> Self {
        self.simulator.contactor_closed = false;
        self
    }

    pub fn with_isolation_level(mut self, level: Option<IsolationLevel>) -> Self {
        self.simulator.isolation_level = level;
        self
    }

    pub fn with_cp_state(mut self, cp_state: CpState) -> Self {
        self.simulator.cp_state = cp_state;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_builder() {
        let config = SeccConfig::new(ServiceV20::DcBpt, ControlMode::Dynamic)
            .with_paid_service()
            .with_cp_state(CpState::D2)
            .with_isolation_level(None);

        assert_eq!(config.session.service, ServiceV20::DcBpt);
        assert_eq!(config.session.control_mode, ControlMode::Dynamic);
        assert!(!config.session.selected_energy_service().is_free);
        assert_eq!(config.simulator.cp_state, CpState::D2);
        assert!(config.simulator.isolation_level.is_none());
        assert!(config.simulator.contactor_closed);
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"session": {{"service": "DC_BPT", "control_mode": "dynamic"}},
                "simulator": {{"cp_state": "B2"}}}}"#
        )
        .unwrap();

        let config = SeccConfig::from_file(file.path()).unwrap();
        assert_eq!(config.session.service, ServiceV20::DcBpt);
        assert_eq!(config.session.control_mode, ControlMode::Dynamic);
        assert_eq!(config.session.protocol, Protocol::Iso15118_20Dc);
        assert_eq!(config.simulator.cp_state, CpState::B2);
        assert_eq!(config.simulator.isolation_level, Some(IsolationLevel::Valid));
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            SeccConfig::from_file(file.path()),
            Err(SeccError::Config(_))
        ));
    }
}
