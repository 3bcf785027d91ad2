//! The six DC states
//!
//! Each state reads the request arm matching the negotiated service and
//! control mode, updates the data contexts, talks to the EVSE controller
//! and encodes the station side of the answer.

use tracing::{debug, error, info, warn};

use super::{StateId, StopReason, Transition};
use crate::context::{EvseDataContext, EvseDcCpdLimits};
use crate::controller::{CpReadiness, IsolationLevel};
use crate::error::Result;
use crate::messages::*;
use crate::rational::{encode_opt, RationalNumber};
use crate::session::CommSession;

fn encode(value: f64) -> Result<RationalNumber> {
    Ok(RationalNumber::from_f64(value)?)
}

// ============================================================================
// DC_ChargeParameterDiscovery
// ============================================================================

/// Exchanges rated limits, then hands over to ScheduleExchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DcChargeParameterDiscovery;

impl DcChargeParameterDiscovery {
    pub async fn process(
        &mut self,
        session: &mut CommSession,
        req: DcChargeParameterDiscoveryReq,
    ) -> Result<Transition> {
        let service = session.service();
        if req.params.service() != service {
            warn!(
                "Session {}: {} parameters received, but {} was selected",
                session.session_id,
                req.params.service(),
                service
            );
            return Ok(session.protocol_fault(
                MessageKind::DcChargeParameterDiscovery,
                req.header,
                ResponseCode::FailedWrongChargeParameter,
            ));
        }

        session.ev_data_context.update_dc_charge_parameters(&req.params);

        let evse = &session.evse_data_context;
        let dc = cpd_res_params(evse.rated_dc_limits()?)?;
        let params = match service {
            ServiceV20::Dc => DcCpdResParams::Dc(dc),
            ServiceV20::DcBpt => {
                let bpt = evse.rated_bpt_limits()?;
                DcCpdResParams::Bpt(BptDcChargeParameterDiscoveryResParams {
                    dc,
                    evse_max_discharge_power: encode(bpt.max_discharge_power)?,
                    evse_min_discharge_power: encode(bpt.min_discharge_power)?,
                    evse_max_discharge_current: encode(bpt.max_discharge_current)?,
                    evse_min_discharge_current: encode(bpt.min_discharge_current)?,
                })
            }
        };

        info!("Session {}: {} rated limits exchanged", session.session_id, service);

        let res = DcChargeParameterDiscoveryRes {
            header: session.header(),
            response_code: ResponseCode::Ok,
            params: Some(params),
        };
        Ok(Transition::goto(
            V2gResponse::DcChargeParameterDiscovery(res),
            StateId::ScheduleExchange,
        ))
    }
}

fn cpd_res_params(limits: &EvseDcCpdLimits) -> Result<DcChargeParameterDiscoveryResParams> {
    Ok(DcChargeParameterDiscoveryResParams {
        evse_max_charge_power: encode(limits.max_charge_power)?,
        evse_min_charge_power: encode(limits.min_charge_power)?,
        evse_max_charge_current: encode(limits.max_charge_current)?,
        evse_min_charge_current: encode(limits.min_charge_current)?,
        evse_max_voltage: encode(limits.max_voltage)?,
        evse_min_voltage: encode(limits.min_voltage)?,
        evse_power_ramp_limit: encode_opt(limits.power_ramp_limit)?,
    })
}

// ============================================================================
// ScheduleExchange
// ============================================================================

/// Iterative schedule negotiation; the EV leaves it by sending CableCheckReq
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleExchange;

impl ScheduleExchange {
    pub async fn process(
        &mut self,
        session: &mut CommSession,
        req: ScheduleExchangeReq,
    ) -> Result<Transition> {
        if req.params.control_mode() != session.control_mode {
            warn!(
                "Session {}: {} schedule requested in {} mode",
                session.session_id,
                req.params.control_mode(),
                session.control_mode
            );
            return Ok(session.protocol_fault(
                MessageKind::ScheduleExchange,
                req.header,
                ResponseCode::FailedWrongChargeParameter,
            ));
        }

        session.ev_data_context.update_schedule_exchange(&req.params);

        let (evse_processing, params) = match &req.params {
            ScheduleExchangeReqParams::Scheduled(_) => {
                let controller = session.evse_controller.clone();
                match controller.get_schedule_tuples(session.service()).await? {
                    Some(mut schedule_tuples) => {
                        let points = usize::from(req.max_supporting_points);
                        for tuple in &mut schedule_tuples {
                            tuple.charging_schedule.truncate(points);
                            if let Some(discharging) = &mut tuple.discharging_schedule {
                                discharging.truncate(points);
                            }
                        }
                        session.offered_schedule_tuple_ids =
                            schedule_tuples.iter().map(|t| t.schedule_tuple_id).collect();
                        (
                            Processing::Finished,
                            Some(ScheduleExchangeResParams::Scheduled(
                                ScheduledScheduleExchangeResParams { schedule_tuples },
                            )),
                        )
                    }
                    None => {
                        debug!("Session {}: schedule not ready yet", session.session_id);
                        (Processing::Ongoing, None)
                    }
                }
            }
            ScheduleExchangeReqParams::Dynamic(_) => {
                let evse = &session.evse_data_context.session_context;
                let ev = &session.ev_data_context.session_context;
                (
                    Processing::Finished,
                    Some(ScheduleExchangeResParams::Dynamic(
                        DynamicScheduleExchangeResParams {
                            departure_time: evse.ev_departure_time.or(ev.departure_time),
                            min_soc: evse.ev_min_soc.or(ev.min_soc),
                            target_soc: evse.ev_target_soc.or(ev.target_soc),
                        },
                    )),
                )
            }
        };

        let res = ScheduleExchangeRes {
            header: session.header(),
            response_code: ResponseCode::Ok,
            evse_processing,
            params,
        };
        Ok(Transition::stay(V2gResponse::ScheduleExchange(res)))
    }
}

// ============================================================================
// DC_CableCheck
// ============================================================================

/// Contactor and insulation check before energizing the cable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DcCableCheck {
    /// Set once insulation monitoring has been started
    pub cable_check_req_was_received: bool,
}

impl DcCableCheck {
    pub async fn process(&mut self, session: &mut CommSession, _req: DcCableCheckReq) -> Result<Transition> {
        let controller = session.evse_controller.clone();

        if !controller.is_contactor_closed().await? {
            error!("Session {}: contactor not closed, aborting cable check", session.session_id);
            return Ok(Transition::terminate(
                cable_check_res(session, ResponseCode::Failed, Processing::Finished),
                StopReason::ContactorOpen,
            ));
        }

        if !self.cable_check_req_was_received {
            controller.start_cable_check().await?;
            self.cable_check_req_was_received = true;
        }

        match controller.get_cable_check_status().await? {
            None => {
                debug!("Session {}: isolation check pending", session.session_id);
                Ok(Transition::stay(cable_check_res(
                    session,
                    ResponseCode::Ok,
                    Processing::Ongoing,
                )))
            }
            Some(IsolationLevel::Valid) => {
                info!("Session {}: isolation valid, starting pre-charge", session.session_id);
                Ok(Transition::goto(
                    cable_check_res(session, ResponseCode::Ok, Processing::Finished),
                    StateId::DcPreCharge,
                ))
            }
            Some(level) => {
                error!("Session {}: isolation check failed: {:?}", session.session_id, level);
                Ok(Transition::terminate(
                    cable_check_res(session, ResponseCode::FailedIsolationFault, Processing::Finished),
                    StopReason::IsolationFault(level),
                ))
            }
        }
    }
}

fn cable_check_res(session: &CommSession, code: ResponseCode, processing: Processing) -> V2gResponse {
    V2gResponse::DcCableCheck(DcCableCheckRes {
        header: session.header(),
        response_code: code,
        evse_processing: processing,
    })
}

// ============================================================================
// DC_PreCharge
// ============================================================================

/// Ramps the output to the battery voltage until the EV reports Finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DcPreCharge;

impl DcPreCharge {
    pub async fn process(&mut self, session: &mut CommSession, req: DcPreChargeReq) -> Result<Transition> {
        let controller = session.evse_controller.clone();
        let present = req.ev_present_voltage.to_f64();
        let target = req.ev_target_voltage.to_f64();
        session.ev_data_context.session_context.present_voltage = Some(present);

        if !req.ev_processing.is_finished() {
            controller.set_precharge(target, present).await?;
        }

        let res = V2gResponse::DcPreCharge(DcPreChargeRes {
            header: session.header(),
            response_code: ResponseCode::Ok,
            evse_present_voltage: encode(controller.get_evse_present_voltage().await?)?,
        });

        if req.ev_processing.is_finished() {
            info!("Session {}: pre-charge finished at {} V", session.session_id, present);
            Ok(Transition::goto(res, StateId::PowerDelivery))
        } else {
            Ok(Transition::stay(res))
        }
    }
}

// ============================================================================
// PowerDelivery
// ============================================================================

/// Start, stop or renegotiate energy transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerDelivery;

impl PowerDelivery {
    pub async fn process(&mut self, session: &mut CommSession, req: PowerDeliveryReq) -> Result<Transition> {
        if !req.ev_processing.is_finished() {
            debug!("Session {}: EV still preparing power delivery", session.session_id);
            return Ok(Transition::stay(power_delivery_res(session, ResponseCode::Ok)));
        }

        let controller = session.evse_controller.clone();
        match req.charge_progress {
            ChargeProgress::Start => {
                if let Some(id) = req.selected_schedule_tuple_id {
                    if session.control_mode == ControlMode::Scheduled
                        && !session.offered_schedule_tuple_ids.contains(&id)
                    {
                        warn!("Session {}: unknown schedule tuple {}", session.session_id, id);
                        return Ok(session.protocol_fault(
                            MessageKind::PowerDelivery,
                            req.header,
                            ResponseCode::FailedScheduleSelectionInvalid,
                        ));
                    }
                }

                let cp_state = controller.get_cp_state().await?;
                match cp_state.readiness() {
                    CpReadiness::EnergyTransfer => {
                        session.renegotiation_requested = false;
                        info!(
                            "Session {}: CP state {:?}, entering charge loop",
                            session.session_id, cp_state
                        );
                        Ok(Transition::goto(
                            power_delivery_res(session, ResponseCode::Ok),
                            StateId::DcChargeLoop,
                        ))
                    }
                    readiness => {
                        error!(
                            "Session {}: CP state {:?} ({:?}), cannot start power delivery",
                            session.session_id, cp_state, readiness
                        );
                        Ok(Transition::terminate(
                            power_delivery_res(session, ResponseCode::Failed),
                            StopReason::CpStateNotReady(cp_state),
                        ))
                    }
                }
            }
            ChargeProgress::Stop => {
                controller.stop_charger().await?;
                info!("Session {}: EV requested stop", session.session_id);
                Ok(Transition::terminate(
                    power_delivery_res(session, ResponseCode::Ok),
                    StopReason::EvRequestedStop,
                ))
            }
            ChargeProgress::ScheduleRenegotiation => {
                session.renegotiation_requested = true;
                info!("Session {}: schedule renegotiation", session.session_id);
                Ok(Transition::goto(
                    power_delivery_res(session, ResponseCode::Ok),
                    StateId::ScheduleExchange,
                ))
            }
            ChargeProgress::Standby => Ok(session.protocol_fault(
                MessageKind::PowerDelivery,
                req.header,
                ResponseCode::FailedPowerDeliveryNotApplied,
            )),
        }
    }
}

fn power_delivery_res(session: &CommSession, code: ResponseCode) -> V2gResponse {
    V2gResponse::PowerDelivery(PowerDeliveryRes {
        header: session.header(),
        response_code: code,
    })
}

// ============================================================================
// DC_ChargeLoop
// ============================================================================

/// Per-tick limit exchange while energy flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DcChargeLoop;

impl DcChargeLoop {
    pub async fn process(&mut self, session: &mut CommSession, req: DcChargeLoopReq) -> Result<Transition> {
        let service = session.service();
        let control_mode = session.control_mode;
        if req.params.service() != service || req.params.control_mode() != control_mode {
            warn!(
                "Session {}: {} {} charge loop request in a {} {} session",
                session.session_id,
                req.params.service(),
                req.params.control_mode(),
                service,
                control_mode
            );
            return Ok(session.protocol_fault(
                MessageKind::DcChargeLoop,
                req.header,
                ResponseCode::FailedWrongChargeParameter,
            ));
        }

        session.ev_data_context.update_dc_charge_loop(&req);
        let params = charge_loop_res_params(&req.params, &session.evse_data_context)?;

        let controller = session.evse_controller.clone();
        controller
            .send_charging_power_limits(
                session.protocol,
                control_mode,
                service,
                &session.ev_data_context,
                &session.evse_data_context,
            )
            .await?;

        let res = DcChargeLoopRes {
            header: session.header(),
            response_code: ResponseCode::Ok,
            evse_present_current: encode(controller.get_evse_present_current().await?)?,
            evse_present_voltage: encode(controller.get_evse_present_voltage().await?)?,
            evse_power_limit_achieved: controller.is_evse_power_limit_achieved().await?,
            evse_current_limit_achieved: controller.is_evse_current_limit_achieved().await?,
            evse_voltage_limit_achieved: controller.is_evse_voltage_limit_achieved().await?,
            params: Some(params),
        };

        debug!(
            "Session {}: charge loop tick, EV at {} V",
            session.session_id,
            req.ev_present_voltage.to_f64()
        );
        Ok(Transition::stay(V2gResponse::DcChargeLoop(res)))
    }
}

/// Encode the station's session limits into the arm matching `req`
fn charge_loop_res_params(
    req: &DcChargeLoopReqParams,
    evse: &EvseDataContext,
) -> Result<DcChargeLoopResParams> {
    let limits = evse.session_dc_limits()?;

    let params = match req {
        DcChargeLoopReqParams::Scheduled(_) => {
            DcChargeLoopResParams::Scheduled(ScheduledDcChargeLoopResParams {
                evse_maximum_charge_power: Some(encode(limits.max_charge_power)?),
                evse_minimum_charge_power: Some(encode(limits.min_charge_power)?),
                evse_maximum_charge_current: Some(encode(limits.max_charge_current)?),
                evse_maximum_voltage: Some(encode(limits.max_voltage)?),
            })
        }
        DcChargeLoopReqParams::BptScheduled(_) => {
            let bpt = evse.session_bpt_limits()?;
            DcChargeLoopResParams::BptScheduled(BptScheduledDcChargeLoopResParams {
                scheduled: ScheduledDcChargeLoopResParams {
                    evse_maximum_charge_power: Some(encode(limits.max_charge_power)?),
                    evse_minimum_charge_power: Some(encode(limits.min_charge_power)?),
                    evse_maximum_charge_current: Some(encode(limits.max_charge_current)?),
                    evse_maximum_voltage: Some(encode(limits.max_voltage)?),
                },
                evse_max_discharge_power: Some(encode(bpt.max_discharge_power)?),
                evse_min_discharge_power: Some(encode(bpt.min_discharge_power)?),
                evse_max_discharge_current: Some(encode(bpt.max_discharge_current)?),
                evse_min_voltage: Some(encode(bpt.min_voltage)?),
            })
        }
        DcChargeLoopReqParams::Dynamic(_) => {
            DcChargeLoopResParams::Dynamic(dynamic_res_params(evse)?)
        }
        DcChargeLoopReqParams::BptDynamic(_) => {
            let bpt = evse.session_bpt_limits()?;
            DcChargeLoopResParams::BptDynamic(BptDynamicDcChargeLoopResParams {
                dynamic: dynamic_res_params(evse)?,
                evse_max_discharge_power: encode(bpt.max_discharge_power)?,
                evse_min_discharge_power: encode(bpt.min_discharge_power)?,
                evse_max_discharge_current: encode(bpt.max_discharge_current)?,
                evse_min_voltage: encode(bpt.min_voltage)?,
            })
        }
    };

    Ok(params)
}

fn dynamic_res_params(evse: &EvseDataContext) -> Result<DynamicDcChargeLoopResParams> {
    let ctx = &evse.session_context;
    let limits = evse.session_dc_limits()?;
    Ok(DynamicDcChargeLoopResParams {
        departure_time: ctx.ev_departure_time,
        min_soc: ctx.ev_min_soc,
        target_soc: ctx.ev_target_soc,
        ack_max_delay: ctx.ack_max_delay,
        evse_maximum_charge_power: encode(limits.max_charge_power)?,
        evse_minimum_charge_power: encode(limits.min_charge_power)?,
        evse_maximum_charge_current: encode(limits.max_charge_current)?,
        evse_maximum_voltage: encode(limits.max_voltage)?,
    })
}
