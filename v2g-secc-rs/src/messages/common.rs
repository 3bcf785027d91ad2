//! Energy-transfer independent messages used by the DC sequence
//!
//! ScheduleExchange and PowerDelivery are shared between AC and DC in
//! ISO 15118-20; only the fields the DC states consume are kept.

use serde::{Deserialize, Serialize};

use super::types::*;
use crate::rational::RationalNumber;

// ============================================================================
// ScheduleExchange
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduledScheduleExchangeReqParams {
    pub departure_time: Option<u32>,
    pub ev_target_energy_request: Option<RationalNumber>,
    pub ev_max_energy_request: Option<RationalNumber>,
    pub ev_min_energy_request: Option<RationalNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicScheduleExchangeReqParams {
    pub departure_time: u32,
    pub min_soc: Option<u8>,
    pub target_soc: Option<u8>,
    pub ev_target_energy_request: RationalNumber,
    pub ev_max_energy_request: RationalNumber,
    pub ev_min_energy_request: RationalNumber,
    pub ev_max_v2x_energy_request: Option<RationalNumber>,
    pub ev_min_v2x_energy_request: Option<RationalNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleExchangeReqParams {
    Scheduled(ScheduledScheduleExchangeReqParams),
    Dynamic(DynamicScheduleExchangeReqParams),
}

impl ScheduleExchangeReqParams {
    pub fn control_mode(&self) -> ControlMode {
        match self {
            ScheduleExchangeReqParams::Scheduled(_) => ControlMode::Scheduled,
            ScheduleExchangeReqParams::Dynamic(_) => ControlMode::Dynamic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleExchangeReq {
    pub header: MessageHeader,
    pub max_supporting_points: u16,
    pub params: ScheduleExchangeReqParams,
}

/// One interval of a power schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerScheduleEntry {
    /// Seconds
    pub duration: u32,
    pub power: RationalNumber,
}

/// Charging (and, for BPT, discharging) schedule offered to the EV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTuple {
    pub schedule_tuple_id: u32,
    pub charging_schedule: Vec<PowerScheduleEntry>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub discharging_schedule: Option<Vec<PowerScheduleEntry>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduledScheduleExchangeResParams {
    pub schedule_tuples: Vec<ScheduleTuple>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DynamicScheduleExchangeResParams {
    pub departure_time: Option<u32>,
    pub min_soc: Option<u8>,
    pub target_soc: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleExchangeResParams {
    Scheduled(ScheduledScheduleExchangeResParams),
    Dynamic(DynamicScheduleExchangeResParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleExchangeRes {
    pub header: MessageHeader,
    pub response_code: ResponseCode,
    pub evse_processing: Processing,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<ScheduleExchangeResParams>,
}

// ============================================================================
// PowerDelivery
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerDeliveryReq {
    pub header: MessageHeader,
    pub ev_processing: Processing,
    pub charge_progress: ChargeProgress,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub selected_schedule_tuple_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerDeliveryRes {
    pub header: MessageHeader,
    pub response_code: ResponseCode,
}
