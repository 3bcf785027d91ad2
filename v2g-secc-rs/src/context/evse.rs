//! Station-side data context
//!
//! Rated limits are the hardware ceiling advertised during
//! ChargeParameterDiscovery. Session limits are refreshed by the station
//! between charge loop ticks and echoed to the vehicle on every tick.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeccError};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvseDcCpdLimits {
    pub max_charge_power: f64,
    pub min_charge_power: f64,
    pub max_charge_current: f64,
    pub min_charge_current: f64,
    pub max_voltage: f64,
    pub min_voltage: f64,
    pub power_ramp_limit: Option<f64>,
    // ISO 15118-2 / DIN SPEC 70121 only, carried for shared controllers
    pub current_regulation_tolerance: Option<f64>,
    pub peak_current_ripple: Option<f64>,
    pub energy_to_be_delivered: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvseDcBptCpdLimits {
    pub max_discharge_power: f64,
    pub min_discharge_power: f64,
    pub max_discharge_current: f64,
    pub min_discharge_current: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvseRatedLimits {
    pub dc_limits: Option<EvseDcCpdLimits>,
    pub dc_bpt_limits: Option<EvseDcBptCpdLimits>,
}

/// Limits offered on the current charge loop tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvseDcClLimits {
    pub max_charge_power: f64,
    pub min_charge_power: f64,
    pub max_charge_current: f64,
    pub max_voltage: f64,
    pub bpt: Option<EvseDcBptClLimits>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvseDcBptClLimits {
    pub max_discharge_power: f64,
    pub min_discharge_power: f64,
    pub max_discharge_current: f64,
    pub min_voltage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvseSessionContext {
    pub ev_departure_time: Option<u32>,
    pub ev_min_soc: Option<u8>,
    pub ev_target_soc: Option<u8>,
    /// Seconds the EV may take to acknowledge a limit change
    pub ack_max_delay: Option<u16>,
    pub dc_limits: Option<EvseDcClLimits>,
}

/// Everything the station advertises to the vehicle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvseDataContext {
    pub rated_limits: EvseRatedLimits,
    pub session_context: EvseSessionContext,
}

impl EvseDataContext {
    pub fn new(rated_limits: EvseRatedLimits, session_context: EvseSessionContext) -> Self {
        Self {
            rated_limits,
            session_context,
        }
    }

    pub fn rated_dc_limits(&self) -> Result<&EvseDcCpdLimits> {
        self.rated_limits
            .dc_limits
            .as_ref()
            .ok_or(SeccError::MissingLimits("EVSE rated DC limits"))
    }

    pub fn rated_bpt_limits(&self) -> Result<&EvseDcBptCpdLimits> {
        self.rated_limits
            .dc_bpt_limits
            .as_ref()
            .ok_or(SeccError::MissingLimits("EVSE rated DC BPT limits"))
    }

    pub fn session_dc_limits(&self) -> Result<&EvseDcClLimits> {
        self.session_context
            .dc_limits
            .as_ref()
            .ok_or(SeccError::MissingLimits("EVSE session DC limits"))
    }

    pub fn session_bpt_limits(&self) -> Result<&EvseDcBptClLimits> {
        self.session_dc_limits()?
            .bpt
            .as_ref()
            .ok_or(SeccError::MissingLimits("EVSE session DC BPT limits"))
    }

    /// Replace the limits offered on the next charge loop tick
    pub fn set_session_dc_limits(&mut self, limits: EvseDcClLimits) {
        self.session_context.dc_limits = Some(limits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_records_are_reported() {
        let evse = EvseDataContext::default();
        assert!(matches!(
            evse.rated_dc_limits(),
            Err(SeccError::MissingLimits(_))
        ));
        assert!(evse.session_bpt_limits().is_err());
    }

    #[test]
    fn test_session_limits_replaced() {
        let mut evse = EvseDataContext::default();
        evse.set_session_dc_limits(EvseDcClLimits {
            max_charge_power: 300.0,
            min_charge_power: 600.0,
            max_charge_current: 700.0,
            max_voltage: 800.0,
            bpt: None,
        });

        assert_eq!(evse.session_dc_limits().unwrap().max_voltage, 800.0);
        assert!(evse.session_bpt_limits().is_err());
    }
}
