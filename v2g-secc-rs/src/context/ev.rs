//! Vehicle-side data context
//!
//! Filled from inbound requests: rated limits once during
//! ChargeParameterDiscovery, session limits on every ScheduleExchange and
//! ChargeLoop tick. Physical values are stored decoded (SI units).

use serde::{Deserialize, Serialize};

use crate::messages::*;
use crate::rational::decode_opt;

/// Vehicle hardware limits for DC (DC_CPDReqEnergyTransferMode)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvDcCpdLimits {
    pub max_charge_power: f64,
    pub min_charge_power: f64,
    pub max_charge_current: f64,
    pub min_charge_current: f64,
    pub max_voltage: f64,
    pub min_voltage: f64,
    pub target_soc: Option<u8>,
    /// Present iff the selected service is DC_BPT
    pub bpt: Option<EvDcBptCpdLimits>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvDcBptCpdLimits {
    pub max_discharge_power: f64,
    pub min_discharge_power: f64,
    pub max_discharge_current: f64,
    pub min_discharge_current: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvRatedLimits {
    pub dc_limits: Option<EvDcCpdLimits>,
}

/// Live vehicle request for the current charge loop tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvDcClLimits {
    pub target_energy_request: Option<f64>,
    pub max_energy_request: Option<f64>,
    pub min_energy_request: Option<f64>,
    /// Scheduled mode only
    pub target_current: Option<f64>,
    /// Scheduled mode only
    pub target_voltage: Option<f64>,
    pub max_charge_power: Option<f64>,
    pub min_charge_power: Option<f64>,
    pub max_charge_current: Option<f64>,
    pub max_voltage: Option<f64>,
    pub min_voltage: Option<f64>,
    pub bpt: Option<EvDcBptClLimits>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvDcBptClLimits {
    pub max_discharge_power: Option<f64>,
    pub min_discharge_power: Option<f64>,
    pub max_discharge_current: Option<f64>,
    /// Dynamic mode only
    pub max_v2x_energy_request: Option<f64>,
    /// Dynamic mode only
    pub min_v2x_energy_request: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvSessionContext {
    /// Seconds from now
    pub departure_time: Option<u32>,
    pub target_soc: Option<u8>,
    pub min_soc: Option<u8>,
    pub present_soc: Option<u8>,
    pub present_voltage: Option<f64>,
    pub dc_limits: Option<EvDcClLimits>,
}

/// Everything the station knows about the vehicle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvDataContext {
    pub rated_limits: EvRatedLimits,
    pub session_context: EvSessionContext,
}

impl EvDataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the vehicle's rated limits from DC_ChargeParameterDiscoveryReq
    pub fn update_dc_charge_parameters(&mut self, params: &DcCpdReqParams) {
        let (dc, bpt) = match params {
            DcCpdReqParams::Dc(dc) => (dc, None),
            DcCpdReqParams::Bpt(bpt) => (
                &bpt.dc,
                Some(EvDcBptCpdLimits {
                    max_discharge_power: bpt.ev_max_discharge_power.to_f64(),
                    min_discharge_power: bpt.ev_min_discharge_power.to_f64(),
                    max_discharge_current: bpt.ev_max_discharge_current.to_f64(),
                    min_discharge_current: bpt.ev_min_discharge_current.to_f64(),
                }),
            ),
        };

        self.rated_limits.dc_limits = Some(EvDcCpdLimits {
            max_charge_power: dc.ev_max_charge_power.to_f64(),
            min_charge_power: dc.ev_min_charge_power.to_f64(),
            max_charge_current: dc.ev_max_charge_current.to_f64(),
            min_charge_current: dc.ev_min_charge_current.to_f64(),
            max_voltage: dc.ev_max_voltage.to_f64(),
            min_voltage: dc.ev_min_voltage.to_f64(),
            target_soc: dc.target_soc,
            bpt,
        });
    }

    /// Store departure time, SoC targets and energy requests from ScheduleExchangeReq
    pub fn update_schedule_exchange(&mut self, params: &ScheduleExchangeReqParams) {
        let session = &mut self.session_context;
        let limits = session.dc_limits.get_or_insert_with(EvDcClLimits::default);

        match params {
            ScheduleExchangeReqParams::Scheduled(scheduled) => {
                session.departure_time = scheduled.departure_time;
                limits.target_energy_request = decode_opt(scheduled.ev_target_energy_request);
                limits.max_energy_request = decode_opt(scheduled.ev_max_energy_request);
                limits.min_energy_request = decode_opt(scheduled.ev_min_energy_request);
            }
            ScheduleExchangeReqParams::Dynamic(dynamic) => {
                session.departure_time = Some(dynamic.departure_time);
                session.min_soc = dynamic.min_soc;
                session.target_soc = dynamic.target_soc;
                limits.target_energy_request = Some(dynamic.ev_target_energy_request.to_f64());
                limits.max_energy_request = Some(dynamic.ev_max_energy_request.to_f64());
                limits.min_energy_request = Some(dynamic.ev_min_energy_request.to_f64());

                if dynamic.ev_max_v2x_energy_request.is_some()
                    || dynamic.ev_min_v2x_energy_request.is_some()
                {
                    let bpt = limits.bpt.get_or_insert_with(EvDcBptClLimits::default);
                    bpt.max_v2x_energy_request = decode_opt(dynamic.ev_max_v2x_energy_request);
                    bpt.min_v2x_energy_request = decode_opt(dynamic.ev_min_v2x_energy_request);
                }
            }
        }
    }

    /// Replace the session limits with the values of one DC_ChargeLoopReq
    pub fn update_dc_charge_loop(&mut self, req: &DcChargeLoopReq) {
        let session = &mut self.session_context;
        session.present_voltage = Some(req.ev_present_voltage.to_f64());
        if let Some(display) = &req.display_parameters {
            session.present_soc = display.present_soc.or(session.present_soc);
        }

        let limits = match &req.params {
            DcChargeLoopReqParams::Scheduled(scheduled) => scheduled_limits(scheduled),
            DcChargeLoopReqParams::BptScheduled(bpt) => EvDcClLimits {
                bpt: Some(EvDcBptClLimits {
                    max_discharge_power: decode_opt(bpt.ev_max_discharge_power),
                    min_discharge_power: decode_opt(bpt.ev_min_discharge_power),
                    max_discharge_current: decode_opt(bpt.ev_max_discharge_current),
                    ..Default::default()
                }),
                ..scheduled_limits(&bpt.scheduled)
            },
            DcChargeLoopReqParams::Dynamic(dynamic) => {
                if let Some(departure_time) = dynamic.departure_time {
                    session.departure_time = Some(departure_time);
                }
                dynamic_limits(dynamic)
            }
            DcChargeLoopReqParams::BptDynamic(bpt) => {
                if let Some(departure_time) = bpt.dynamic.departure_time {
                    session.departure_time = Some(departure_time);
                }
                EvDcClLimits {
                    bpt: Some(EvDcBptClLimits {
                        max_discharge_power: Some(bpt.ev_max_discharge_power.to_f64()),
                        min_discharge_power: Some(bpt.ev_min_discharge_power.to_f64()),
                        max_discharge_current: Some(bpt.ev_max_discharge_current.to_f64()),
                        max_v2x_energy_request: decode_opt(bpt.ev_max_v2x_energy_request),
                        min_v2x_energy_request: decode_opt(bpt.ev_min_v2x_energy_request),
                    }),
                    ..dynamic_limits(&bpt.dynamic)
                }
            }
        };

        session.dc_limits = Some(limits);
    }
}

fn scheduled_limits(params: &ScheduledDcChargeLoopReqParams) -> EvDcClLimits {
    EvDcClLimits {
        target_energy_request: decode_opt(params.ev_target_energy_request),
        max_energy_request: decode_opt(params.ev_max_energy_request),
        min_energy_request: decode_opt(params.ev_min_energy_request),
        target_current: Some(params.ev_target_current.to_f64()),
        target_voltage: Some(params.ev_target_voltage.to_f64()),
        max_charge_power: decode_opt(params.ev_max_charge_power),
        min_charge_power: decode_opt(params.ev_min_charge_power),
        max_charge_current: decode_opt(params.ev_max_charge_current),
        max_voltage: decode_opt(params.ev_max_voltage),
        min_voltage: decode_opt(params.ev_min_voltage),
        bpt: None,
    }
}

fn dynamic_limits(params: &DynamicDcChargeLoopReqParams) -> EvDcClLimits {
    EvDcClLimits {
        target_energy_request: Some(params.ev_target_energy_request.to_f64()),
        max_energy_request: Some(params.ev_max_energy_request.to_f64()),
        min_energy_request: Some(params.ev_min_energy_request.to_f64()),
        target_current: None,
        target_voltage: None,
        max_charge_power: Some(params.ev_max_charge_power.to_f64()),
        min_charge_power: Some(params.ev_min_charge_power.to_f64()),
        max_charge_current: Some(params.ev_max_charge_current.to_f64()),
        max_voltage: Some(params.ev_max_voltage.to_f64()),
        min_voltage: Some(params.ev_min_voltage.to_f64()),
        bpt: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::RationalNumber;

    fn rn(exponent: i8, value: i16) -> RationalNumber {
        RationalNumber { exponent, value }
    }

    #[test]
    fn test_rated_limits_plain_dc_has_no_bpt() {
        let mut ev = EvDataContext::new();
        ev.update_dc_charge_parameters(&DcCpdReqParams::Dc(DcChargeParameterDiscoveryReqParams {
            ev_max_charge_power: rn(2, 300),
            ev_min_charge_power: rn(0, 100),
            ev_max_charge_current: rn(0, 300),
            ev_min_charge_current: rn(0, 10),
            ev_max_voltage: rn(0, 1000),
            ev_min_voltage: rn(0, 10),
            target_soc: Some(80),
        }));

        let limits = ev.rated_limits.dc_limits.unwrap();
        assert_eq!(limits.max_charge_power, 30000.0);
        assert_eq!(limits.target_soc, Some(80));
        assert!(limits.bpt.is_none());
    }

    #[test]
    fn test_schedule_exchange_keeps_loop_fields() {
        let mut ev = EvDataContext::new();
        ev.session_context.dc_limits = Some(EvDcClLimits {
            max_voltage: Some(500.0),
            ..Default::default()
        });

        ev.update_schedule_exchange(&ScheduleExchangeReqParams::Dynamic(
            DynamicScheduleExchangeReqParams {
                departure_time: 7200,
                min_soc: Some(20),
                target_soc: Some(90),
                ev_target_energy_request: rn(1, 4000),
                ev_max_energy_request: rn(1, 5000),
                ev_min_energy_request: rn(0, 0),
                ev_max_v2x_energy_request: None,
                ev_min_v2x_energy_request: None,
            },
        ));

        let session = &ev.session_context;
        assert_eq!(session.departure_time, Some(7200));
        assert_eq!(session.target_soc, Some(90));
        let limits = session.dc_limits.as_ref().unwrap();
        assert_eq!(limits.target_energy_request, Some(40000.0));
        assert_eq!(limits.max_voltage, Some(500.0));
        assert!(limits.bpt.is_none());
    }

    #[test]
    fn test_dynamic_loop_keeps_negotiated_departure_time() {
        let mut ev = EvDataContext::new();
        ev.session_context.departure_time = Some(7200);

        let mut req = DcChargeLoopReq {
            header: MessageHeader::now("F9F9EE8505F55838"),
            display_parameters: None,
            meter_info_requested: false,
            ev_present_voltage: rn(0, 400),
            params: DcChargeLoopReqParams::Dynamic(DynamicDcChargeLoopReqParams {
                departure_time: None,
                ev_target_energy_request: rn(3, 40),
                ev_max_energy_request: rn(3, 60),
                ev_min_energy_request: rn(0, 0),
                ev_max_charge_power: rn(3, 100),
                ev_min_charge_power: rn(0, 500),
                ev_max_charge_current: rn(0, 250),
                ev_max_voltage: rn(0, 850),
                ev_min_voltage: rn(0, 200),
            }),
        };
        ev.update_dc_charge_loop(&req);
        assert_eq!(ev.session_context.departure_time, Some(7200));

        if let DcChargeLoopReqParams::Dynamic(dynamic) = &mut req.params {
            dynamic.departure_time = Some(3600);
        }
        ev.update_dc_charge_loop(&req);
        assert_eq!(ev.session_context.departure_time, Some(3600));
    }

    #[test]
    fn test_equality_supports_idempotent_updates() {
        let a = EvDataContext::new();
        let mut b = EvDataContext::new();
        assert_eq!(a, b);
        b.session_context.present_soc = Some(42);
        assert_ne!(a, b);
    }
}
