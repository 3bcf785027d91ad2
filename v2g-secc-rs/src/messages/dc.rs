//! DC-specific ISO 15118-20 messages
//!
//! ChargeParameterDiscovery, CableCheck, PreCharge and ChargeLoop. Wherever
//! the schema offers mutually exclusive plain/BPT (or scheduled/dynamic)
//! sub-messages, they are modelled as an enum so exactly one arm exists.

use serde::{Deserialize, Serialize};

use super::types::*;
use crate::rational::RationalNumber;

// ============================================================================
// DC_ChargeParameterDiscovery
// ============================================================================

/// Vehicle rated limits for unidirectional DC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcChargeParameterDiscoveryReqParams {
    pub ev_max_charge_power: RationalNumber,
    pub ev_min_charge_power: RationalNumber,
    pub ev_max_charge_current: RationalNumber,
    pub ev_min_charge_current: RationalNumber,
    pub ev_max_voltage: RationalNumber,
    pub ev_min_voltage: RationalNumber,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_soc: Option<u8>,
}

/// Vehicle rated limits for bidirectional DC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BptDcChargeParameterDiscoveryReqParams {
    #[serde(flatten)]
    pub dc: DcChargeParameterDiscoveryReqParams,
    pub ev_max_discharge_power: RationalNumber,
    pub ev_min_discharge_power: RationalNumber,
    pub ev_max_discharge_current: RationalNumber,
    pub ev_min_discharge_current: RationalNumber,
}

/// Exactly one of DC_CPDReqEnergyTransferMode / BPT_DC_CPDReqEnergyTransferMode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcCpdReqParams {
    Dc(DcChargeParameterDiscoveryReqParams),
    Bpt(BptDcChargeParameterDiscoveryReqParams),
}

impl DcCpdReqParams {
    /// Service this arm belongs to
    pub fn service(&self) -> ServiceV20 {
        match self {
            DcCpdReqParams::Dc(_) => ServiceV20::Dc,
            DcCpdReqParams::Bpt(_) => ServiceV20::DcBpt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcChargeParameterDiscoveryReq {
    pub header: MessageHeader,
    pub params: DcCpdReqParams,
}

/// Station rated limits for unidirectional DC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcChargeParameterDiscoveryResParams {
    pub evse_max_charge_power: RationalNumber,
    pub evse_min_charge_power: RationalNumber,
    pub evse_max_charge_current: RationalNumber,
    pub evse_min_charge_current: RationalNumber,
    pub evse_max_voltage: RationalNumber,
    pub evse_min_voltage: RationalNumber,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub evse_power_ramp_limit: Option<RationalNumber>,
}

/// Station rated limits for bidirectional DC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BptDcChargeParameterDiscoveryResParams {
    #[serde(flatten)]
    pub dc: DcChargeParameterDiscoveryResParams,
    pub evse_max_discharge_power: RationalNumber,
    pub evse_min_discharge_power: RationalNumber,
    pub evse_max_discharge_current: RationalNumber,
    pub evse_min_discharge_current: RationalNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcCpdResParams {
    Dc(DcChargeParameterDiscoveryResParams),
    Bpt(BptDcChargeParameterDiscoveryResParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcChargeParameterDiscoveryRes {
    pub header: MessageHeader,
    pub response_code: ResponseCode,
    /// Absent on negative responses
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<DcCpdResParams>,
}

impl DcChargeParameterDiscoveryRes {
    pub fn dc_params(&self) -> Option<&DcChargeParameterDiscoveryResParams> {
        match &self.params {
            Some(DcCpdResParams::Dc(params)) => Some(params),
            _ => None,
        }
    }

    pub fn bpt_dc_params(&self) -> Option<&BptDcChargeParameterDiscoveryResParams> {
        match &self.params {
            Some(DcCpdResParams::Bpt(params)) => Some(params),
            _ => None,
        }
    }
}

// ============================================================================
// DC_CableCheck
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcCableCheckReq {
    pub header: MessageHeader,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcCableCheckRes {
    pub header: MessageHeader,
    pub response_code: ResponseCode,
    pub evse_processing: Processing,
}

// ============================================================================
// DC_PreCharge
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcPreChargeReq {
    pub header: MessageHeader,
    pub ev_processing: Processing,
    pub ev_present_voltage: RationalNumber,
    pub ev_target_voltage: RationalNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcPreChargeRes {
    pub header: MessageHeader,
    pub response_code: ResponseCode,
    pub evse_present_voltage: RationalNumber,
}

// ============================================================================
// DC_ChargeLoop
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayParameters {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub present_soc: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_soc: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_soc: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub charging_complete: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledDcChargeLoopReqParams {
    pub ev_target_energy_request: Option<RationalNumber>,
    pub ev_max_energy_request: Option<RationalNumber>,
    pub ev_min_energy_request: Option<RationalNumber>,
    pub ev_target_current: RationalNumber,
    pub ev_target_voltage: RationalNumber,
    pub ev_max_charge_power: Option<RationalNumber>,
    pub ev_min_charge_power: Option<RationalNumber>,
    pub ev_max_charge_current: Option<RationalNumber>,
    pub ev_max_voltage: Option<RationalNumber>,
    pub ev_min_voltage: Option<RationalNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BptScheduledDcChargeLoopReqParams {
    #[serde(flatten)]
    pub scheduled: ScheduledDcChargeLoopReqParams,
    pub ev_max_discharge_power: Option<RationalNumber>,
    pub ev_min_discharge_power: Option<RationalNumber>,
    pub ev_max_discharge_current: Option<RationalNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicDcChargeLoopReqParams {
    pub departure_time: Option<u32>,
    pub ev_target_energy_request: RationalNumber,
    pub ev_max_energy_request: RationalNumber,
    pub ev_min_energy_request: RationalNumber,
    pub ev_max_charge_power: RationalNumber,
    pub ev_min_charge_power: RationalNumber,
    pub ev_max_charge_current: RationalNumber,
    pub ev_max_voltage: RationalNumber,
    pub ev_min_voltage: RationalNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BptDynamicDcChargeLoopReqParams {
    #[serde(flatten)]
    pub dynamic: DynamicDcChargeLoopReqParams,
    pub ev_max_discharge_power: RationalNumber,
    pub ev_min_discharge_power: RationalNumber,
    pub ev_max_discharge_current: RationalNumber,
    pub ev_max_v2x_energy_request: Option<RationalNumber>,
    pub ev_min_v2x_energy_request: Option<RationalNumber>,
}

/// Exactly one control-mode sub-message of DC_ChargeLoopReq
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcChargeLoopReqParams {
    Scheduled(ScheduledDcChargeLoopReqParams),
    Dynamic(DynamicDcChargeLoopReqParams),
    BptScheduled(BptScheduledDcChargeLoopReqParams),
    BptDynamic(BptDynamicDcChargeLoopReqParams),
}

impl DcChargeLoopReqParams {
    pub fn control_mode(&self) -> ControlMode {
        match self {
            Self::Scheduled(_) | Self::BptScheduled(_) => ControlMode::Scheduled,
            Self::Dynamic(_) | Self::BptDynamic(_) => ControlMode::Dynamic,
        }
    }

    pub fn service(&self) -> ServiceV20 {
        match self {
            Self::Scheduled(_) | Self::Dynamic(_) => ServiceV20::Dc,
            Self::BptScheduled(_) | Self::BptDynamic(_) => ServiceV20::DcBpt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcChargeLoopReq {
    pub header: MessageHeader,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub display_parameters: Option<DisplayParameters>,
    pub meter_info_requested: bool,
    pub ev_present_voltage: RationalNumber,
    pub params: DcChargeLoopReqParams,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduledDcChargeLoopResParams {
    pub evse_maximum_charge_power: Option<RationalNumber>,
    pub evse_minimum_charge_power: Option<RationalNumber>,
    pub evse_maximum_charge_current: Option<RationalNumber>,
    pub evse_maximum_voltage: Option<RationalNumber>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BptScheduledDcChargeLoopResParams {
    #[serde(flatten)]
    pub scheduled: ScheduledDcChargeLoopResParams,
    pub evse_max_discharge_power: Option<RationalNumber>,
    pub evse_min_discharge_power: Option<RationalNumber>,
    pub evse_max_discharge_current: Option<RationalNumber>,
    pub evse_min_voltage: Option<RationalNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicDcChargeLoopResParams {
    pub departure_time: Option<u32>,
    pub min_soc: Option<u8>,
    pub target_soc: Option<u8>,
    pub ack_max_delay: Option<u16>,
    pub evse_maximum_charge_power: RationalNumber,
    pub evse_minimum_charge_power: RationalNumber,
    pub evse_maximum_charge_current: RationalNumber,
    pub evse_maximum_voltage: RationalNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BptDynamicDcChargeLoopResParams {
    #[serde(flatten)]
    pub dynamic: DynamicDcChargeLoopResParams,
    pub evse_max_discharge_power: RationalNumber,
    pub evse_min_discharge_power: RationalNumber,
    pub evse_max_discharge_current: RationalNumber,
    pub evse_min_voltage: RationalNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcChargeLoopResParams {
    Scheduled(ScheduledDcChargeLoopResParams),
    Dynamic(DynamicDcChargeLoopResParams),
    BptScheduled(BptScheduledDcChargeLoopResParams),
    BptDynamic(BptDynamicDcChargeLoopResParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcChargeLoopRes {
    pub header: MessageHeader,
    pub response_code: ResponseCode,
    pub evse_present_current: RationalNumber,
    pub evse_present_voltage: RationalNumber,
    pub evse_power_limit_achieved: bool,
    pub evse_current_limit_achieved: bool,
    pub evse_voltage_limit_achieved: bool,
    /// Absent on negative responses
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<DcChargeLoopResParams>,
}

impl DcChargeLoopRes {
    pub fn scheduled_params(&self) -> Option<&ScheduledDcChargeLoopResParams> {
        match &self.params {
            Some(DcChargeLoopResParams::Scheduled(params)) => Some(params),
            _ => None,
        }
    }

    pub fn dynamic_params(&self) -> Option<&DynamicDcChargeLoopResParams> {
        match &self.params {
            Some(DcChargeLoopResParams::Dynamic(params)) => Some(params),
            _ => None,
        }
    }

    pub fn bpt_scheduled_params(&self) -> Option<&BptScheduledDcChargeLoopResParams> {
        match &self.params {
            Some(DcChargeLoopResParams::BptScheduled(params)) => Some(params),
            _ => None,
        }
    }

    pub fn bpt_dynamic_params(&self) -> Option<&BptDynamicDcChargeLoopResParams> {
        match &self.params {
            Some(DcChargeLoopResParams::BptDynamic(params)) => Some(params),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rn(exponent: i8, value: i16) -> RationalNumber {
        RationalNumber { exponent, value }
    }

    #[test]
    fn test_charge_loop_arm_classification() {
        let params = DcChargeLoopReqParams::Dynamic(DynamicDcChargeLoopReqParams {
            departure_time: Some(3600),
            ev_target_energy_request: rn(2, 300),
            ev_max_energy_request: rn(2, 300),
            ev_min_energy_request: rn(2, 300),
            ev_max_charge_power: rn(2, 300),
            ev_min_charge_power: rn(2, 300),
            ev_max_charge_current: rn(2, 300),
            ev_max_voltage: rn(2, 300),
            ev_min_voltage: rn(2, 300),
        });
        assert_eq!(params.control_mode(), ControlMode::Dynamic);
        assert_eq!(params.service(), ServiceV20::Dc);
    }

    #[test]
    fn test_bpt_params_flatten_on_the_wire() {
        let params = DcCpdReqParams::Bpt(BptDcChargeParameterDiscoveryReqParams {
            dc: DcChargeParameterDiscoveryReqParams {
                ev_max_charge_power: rn(2, 300),
                ev_min_charge_power: rn(0, 100),
                ev_max_charge_current: rn(0, 300),
                ev_min_charge_current: rn(0, 10),
                ev_max_voltage: rn(0, 1000),
                ev_min_voltage: rn(0, 10),
                target_soc: Some(80),
            },
            ev_max_discharge_power: rn(0, 11),
            ev_min_discharge_power: rn(3, 1),
            ev_max_discharge_current: rn(0, 11),
            ev_min_discharge_current: rn(0, 10),
        });

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["bpt"]["ev_max_voltage"]["value"], 1000);
        assert_eq!(json["bpt"]["ev_min_discharge_power"]["exponent"], 3);

        let back: DcCpdReqParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.service(), ServiceV20::DcBpt);
    }
}
