//! Simulated EVSE controller
//!
//! Stands in for the power stack in tests and in the demo node. Every
//! hardware reading is scriptable; commands are recorded for inspection.
//! One instance may be shared by several sessions (state sits behind a
//! mutex, the way a real adapter would serialize its CAN channel).

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::*;
use crate::config::SimulatorConfig;
use crate::context::*;
use crate::messages::PowerScheduleEntry;
use crate::rational::RationalNumber;

/// Recorded call to `send_charging_power_limits`
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLimitCommand {
    pub protocol: Protocol,
    pub control_mode: ControlMode,
    pub service: ServiceV20,
    pub ev_limits: Option<EvDcClLimits>,
    pub evse_limits: Option<EvseDcClLimits>,
}

#[derive(Debug)]
struct SimState {
    contactor_closed: bool,
    isolation_level: Option<IsolationLevel>,
    cp_state: CpState,
    present_voltage: f64,
    present_current: f64,
    schedule_ready: bool,
    cable_check_started: bool,
    precharge_target: Option<f64>,
    stopped: bool,
    fault: Option<String>,
    power_limit_commands: VecDeque<PowerLimitCommand>,
}

/// Scriptable in-memory controller
#[derive(Debug)]
pub struct SimEvseController {
    state: Mutex<SimState>,
}

impl Default for SimEvseController {
    fn default() -> Self {
        Self::from_config(&SimulatorConfig::default())
    }
}

impl SimEvseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self {
            state: Mutex::new(SimState {
                contactor_closed: config.contactor_closed,
                isolation_level: config.isolation_level,
                cp_state: config.cp_state,
                present_voltage: config.present_voltage,
                present_current: config.present_current,
                schedule_ready: true,
                cable_check_started: false,
                precharge_target: None,
                stopped: false,
                fault: None,
                power_limit_commands: VecDeque::new(),
            }),
        }
    }

    pub fn set_contactor_closed(&self, closed: bool) {
        self.state.lock().contactor_closed = closed;
    }

    pub fn set_isolation_level(&self, level: Option<IsolationLevel>) {
        self.state.lock().isolation_level = level;
    }

    pub fn set_cp_state(&self, cp_state: CpState) {
        self.state.lock().cp_state = cp_state;
    }

    pub fn set_present_current(&self, current: f64) {
        self.state.lock().present_current = current;
    }

    pub fn set_schedule_ready(&self, ready: bool) {
        self.state.lock().schedule_ready = ready;
    }

    /// Make every subsequent call fail with `ControllerError::Unavailable`
    pub fn inject_fault(&self, reason: impl Into<String>) {
        self.state.lock().fault = Some(reason.into());
    }

    pub fn cable_check_started(&self) -> bool {
        self.state.lock().cable_check_started
    }

    pub fn precharge_target(&self) -> Option<f64> {
        self.state.lock().precharge_target
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Most recent power limit commands, oldest first
    pub fn power_limit_commands(&self) -> Vec<PowerLimitCommand> {
        self.state.lock().power_limit_commands.iter().cloned().collect()
    }

    fn check_fault(&self) -> ControllerResult<()> {
        match &self.state.lock().fault {
            Some(reason) => Err(ControllerError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EvseController for SimEvseController {
    async fn is_contactor_closed(&self) -> ControllerResult<bool> {
        self.check_fault()?;
        Ok(self.state.lock().contactor_closed)
    }

    async fn start_cable_check(&self) -> ControllerResult<()> {
        self.check_fault()?;
        self.state.lock().cable_check_started = true;
        info!("Simulated insulation monitoring started");
        Ok(())
    }

    async fn get_cable_check_status(&self) -> ControllerResult<Option<IsolationLevel>> {
        self.check_fault()?;
        Ok(self.state.lock().isolation_level)
    }

    async fn get_cp_state(&self) -> ControllerResult<CpState> {
        self.check_fault()?;
        Ok(self.state.lock().cp_state)
    }

    async fn set_precharge(&self, target_voltage: f64, present_voltage: f64) -> ControllerResult<()> {
        self.check_fault()?;
        debug!(
            "Simulated pre-charge: target {} V, EV present {} V",
            target_voltage, present_voltage
        );
        let mut state = self.state.lock();
        state.precharge_target = Some(target_voltage);
        // Converter reaches the target within one request cycle
        state.present_voltage = target_voltage;
        Ok(())
    }

    async fn get_evse_present_voltage(&self) -> ControllerResult<f64> {
        self.check_fault()?;
        Ok(self.state.lock().present_voltage)
    }

    async fn get_evse_present_current(&self) -> ControllerResult<f64> {
        self.check_fault()?;
        Ok(self.state.lock().present_current)
    }

    async fn is_evse_power_limit_achieved(&self) -> ControllerResult<bool> {
        self.check_fault()?;
        Ok(false)
    }

    async fn is_evse_current_limit_achieved(&self) -> ControllerResult<bool> {
        self.check_fault()?;
        Ok(false)
    }

    async fn is_evse_voltage_limit_achieved(&self) -> ControllerResult<bool> {
        self.check_fault()?;
        Ok(false)
    }

    async fn get_schedule_tuples(
        &self,
        service: ServiceV20,
    ) -> ControllerResult<Option<Vec<ScheduleTuple>>> {
        self.check_fault()?;
        if !self.state.lock().schedule_ready {
            return Ok(None);
        }

        // Single 24 h slot at the rated maximum
        let entry = |power: f64| -> ControllerResult<PowerScheduleEntry> {
            Ok(PowerScheduleEntry {
                duration: 86_400,
                power: RationalNumber::from_f64(power)
                    .map_err(|e| ControllerError::Rejected(e.to_string()))?,
            })
        };
        let discharging_schedule = match service {
            ServiceV20::Dc => None,
            ServiceV20::DcBpt => Some(vec![entry(-DEFAULT_MAX_DISCHARGE_POWER)?]),
        };

        Ok(Some(vec![ScheduleTuple {
            schedule_tuple_id: 1,
            charging_schedule: vec![entry(DEFAULT_MAX_CHARGE_POWER)?],
            discharging_schedule,
        }]))
    }

    async fn send_charging_power_limits(
        &self,
        protocol: Protocol,
        control_mode: ControlMode,
        service: ServiceV20,
        ev: &EvDataContext,
        evse: &EvseDataContext,
    ) -> ControllerResult<()> {
        self.check_fault()?;
        let command = PowerLimitCommand {
            protocol,
            control_mode,
            service,
            ev_limits: ev.session_context.dc_limits.clone(),
            evse_limits: evse.session_context.dc_limits.clone(),
        };
        debug!("Simulated power limits: {:?}", command);
        let mut state = self.state.lock();
        if state.power_limit_commands.len() == MAX_RECORDED_COMMANDS {
            state.power_limit_commands.pop_front();
        }
        state.power_limit_commands.push_back(command);
        Ok(())
    }

    async fn stop_charger(&self) -> ControllerResult<()> {
        self.check_fault()?;
        let mut state = self.state.lock();
        state.stopped = true;
        state.present_current = 0.0;
        info!("Simulated charger stopped");
        Ok(())
    }
}

/// Commands kept for inspection; older ones are dropped
pub const MAX_RECORDED_COMMANDS: usize = 64;

const DEFAULT_MAX_CHARGE_POWER: f64 = 150_000.0;
const DEFAULT_MAX_DISCHARGE_POWER: f64 = 50_000.0;

/// Station data context of a 150 kW bidirectional simulator
pub fn default_evse_data_context() -> EvseDataContext {
    EvseDataContext {
        rated_limits: EvseRatedLimits {
            dc_limits: Some(EvseDcCpdLimits {
                max_charge_power: DEFAULT_MAX_CHARGE_POWER,
                min_charge_power: 100.0,
                max_charge_current: 350.0,
                min_charge_current: 1.0,
                max_voltage: 920.0,
                min_voltage: 150.0,
                power_ramp_limit: Some(500.0),
                current_regulation_tolerance: None,
                peak_current_ripple: None,
                energy_to_be_delivered: None,
            }),
            dc_bpt_limits: Some(EvseDcBptCpdLimits {
                max_discharge_power: DEFAULT_MAX_DISCHARGE_POWER,
                min_discharge_power: 100.0,
                max_discharge_current: 120.0,
                min_discharge_current: 1.0,
            }),
        },
        session_context: EvseSessionContext {
            ev_departure_time: None,
            ev_min_soc: Some(30),
            ev_target_soc: Some(80),
            ack_max_delay: Some(15),
            dc_limits: Some(EvseDcClLimits {
                max_charge_power: DEFAULT_MAX_CHARGE_POWER,
                min_charge_power: 100.0,
                max_charge_current: 350.0,
                max_voltage: 920.0,
                bpt: Some(EvseDcBptClLimits {
                    max_discharge_power: DEFAULT_MAX_DISCHARGE_POWER,
                    min_discharge_power: 100.0,
                    max_discharge_current: 120.0,
                    min_voltage: 150.0,
                }),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_readings() {
        let sim = SimEvseController::new();
        assert!(sim.is_contactor_closed().await.unwrap());

        sim.set_contactor_closed(false);
        sim.set_isolation_level(None);
        sim.set_cp_state(CpState::B2);

        assert!(!sim.is_contactor_closed().await.unwrap());
        assert_eq!(sim.get_cable_check_status().await.unwrap(), None);
        assert_eq!(sim.get_cp_state().await.unwrap(), CpState::B2);
    }

    #[tokio::test]
    async fn test_precharge_tracks_target() {
        let sim = SimEvseController::new();
        sim.set_precharge(400.0, 395.0).await.unwrap();
        assert_eq!(sim.precharge_target(), Some(400.0));
        assert_eq!(sim.get_evse_present_voltage().await.unwrap(), 400.0);
    }

    #[tokio::test]
    async fn test_injected_fault() {
        let sim = SimEvseController::new();
        sim.inject_fault("CAN bus off");
        assert_eq!(
            sim.get_cp_state().await,
            Err(ControllerError::Unavailable("CAN bus off".into()))
        );
    }

    #[tokio::test]
    async fn test_bpt_schedule_has_discharge_slot() {
        let sim = SimEvseController::new();
        let tuples = sim.get_schedule_tuples(ServiceV20::DcBpt).await.unwrap().unwrap();
        assert_eq!(tuples.len(), 1);
        assert!(tuples[0].discharging_schedule.is_some());

        sim.set_schedule_ready(false);
        assert!(sim.get_schedule_tuples(ServiceV20::Dc).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recorded_commands_are_bounded() {
        let sim = SimEvseController::new();
        let evse = default_evse_data_context();
        let mut ev = EvDataContext::new();

        for tick in 0..MAX_RECORDED_COMMANDS + 10 {
            ev.session_context.dc_limits = Some(EvDcClLimits {
                target_voltage: Some(tick as f64),
                ..Default::default()
            });
            sim.send_charging_power_limits(
                Protocol::Iso15118_20Dc,
                ControlMode::Dynamic,
                ServiceV20::Dc,
                &ev,
                &evse,
            )
            .await
            .unwrap();
        }

        let commands = sim.power_limit_commands();
        assert_eq!(commands.len(), MAX_RECORDED_COMMANDS);
        let target = |c: &PowerLimitCommand| c.ev_limits.as_ref().and_then(|l| l.target_voltage);
        assert_eq!(target(&commands[0]), Some(10.0));
        assert_eq!(
            target(commands.last().unwrap()),
            Some((MAX_RECORDED_COMMANDS + 9) as f64)
        );
    }

    #[test]
    fn test_default_context_is_encodable() {
        let evse = default_evse_data_context();
        let rated = evse.rated_dc_limits().unwrap();
        assert!(RationalNumber::from_f64(rated.max_charge_power).is_ok());
        assert!(evse.session_bpt_limits().is_ok());
    }
}
