//! V2G SECC Node - CLI running simulated DC charging sessions
//!
//! Spawns a number of independent ISO 15118-20 DC sessions, each driven by
//! a scripted EV over in-process channels and backed by a simulated power
//! stack.
//!
//! # Usage
//!
//! ```bash
//! # One scheduled DC session
//! v2g-secc-node
//!
//! # Four bidirectional sessions in dynamic mode
//! v2g-secc-node --sessions 4 --service dc-bpt --control-mode dynamic
//!
//! # Simulator readings from a JSON file
//! v2g-secc-node --config secc.json --log-level debug
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use v2g_secc::controller::simulator::default_evse_data_context;
use v2g_secc::messages::*;
use v2g_secc::{CommSession, RationalNumber, SeccConfig, SeccSession, SessionEnd, SimEvseController};

/// Simulated ISO 15118-20 DC charging station
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of concurrent sessions
    #[arg(short, long, default_value = "1")]
    sessions: u32,

    /// Energy service (dc, dc-bpt)
    #[arg(long, default_value = "dc")]
    service: String,

    /// Control mode (scheduled, dynamic)
    #[arg(long, default_value = "scheduled")]
    control_mode: String,

    /// Charge loop ticks before the EV stops
    #[arg(long, default_value = "5")]
    charge_loops: u32,

    /// JSON configuration file (overrides service and control mode)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => SeccConfig::from_file(path)?,
        None => SeccConfig::new(parse_service(&args.service)?, parse_control_mode(&args.control_mode)?),
    };
    let session_config = &config.session;

    // Print banner
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            V2G SECC Node - ISO 15118-20 DC Sessions          ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Protocol: {:<50} ║", session_config.protocol.to_string());
    println!("║  Service:  {:<50} ║", session_config.service.to_string());
    println!("║  Mode:     {:<50} ║", session_config.control_mode.to_string());
    println!("║  Sessions: {:<50} ║", args.sessions);
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut handles = Vec::new();
    for _ in 0..args.sessions {
        let controller = Arc::new(SimEvseController::from_config(&config.simulator));
        let comm = CommSession::new(session_config, default_evse_data_context(), controller);
        let session = SeccSession::new(comm);
        let session_id = session.session_id().to_string();

        let (req_tx, req_rx) = mpsc::channel(8);
        let (res_tx, res_rx) = mpsc::channel(8);
        let ev = SimulatedEv {
            session_id,
            service: session_config.service,
            control_mode: session_config.control_mode,
            charge_loops: args.charge_loops,
        };

        tokio::spawn(ev.run(req_tx, res_rx));
        handles.push(tokio::spawn(session.run(req_rx, res_tx)));
    }

    info!("Started {} session(s)", handles.len());

    let mut ends = Vec::new();
    for handle in handles {
        ends.push(handle.await?);
    }
    report(&ends)?;

    Ok(())
}

fn parse_service(s: &str) -> Result<ServiceV20, String> {
    match s {
        "dc" => Ok(ServiceV20::Dc),
        "dc-bpt" | "dc_bpt" => Ok(ServiceV20::DcBpt),
        other => Err(format!("Unknown service: {}", other)),
    }
}

fn parse_control_mode(s: &str) -> Result<ControlMode, String> {
    match s {
        "scheduled" => Ok(ControlMode::Scheduled),
        "dynamic" => Ok(ControlMode::Dynamic),
        other => Err(format!("Unknown control mode: {}", other)),
    }
}

fn report(ends: &[SessionEnd]) -> Result<(), serde_json::Error> {
    println!();
    for end in ends {
        println!(
            "  {}  {:<30} {} fault(s)",
            end.session_id,
            end.reason.to_string(),
            end.faults.len()
        );
        debug!("{}", serde_json::to_string(end)?);
    }
    let regular = ends.iter().filter(|e| !e.reason.is_fault()).count();
    println!();
    println!("{}/{} session(s) stopped by the EV", regular, ends.len());
    Ok(())
}

// ============================================================================
// Scripted EV
// ============================================================================

/// Plays the vehicle side of a DC session
struct SimulatedEv {
    session_id: String,
    service: ServiceV20,
    control_mode: ControlMode,
    charge_loops: u32,
}

impl SimulatedEv {
    async fn run(self, tx: mpsc::Sender<V2gRequest>, mut rx: mpsc::Receiver<V2gResponse>) {
        for req in self.script() {
            let kind = req.kind();
            if tx.send(req).await.is_err() {
                warn!("EV {}: session gone before {}", self.session_id, kind);
                return;
            }
            let Some(res) = rx.recv().await else {
                warn!("EV {}: no response to {}", self.session_id, kind);
                return;
            };
            if !res.response_code().is_ok() {
                warn!("EV {}: {} answered {:?}", self.session_id, kind, res.response_code());
                return;
            }
            debug!("EV {}: {} OK", self.session_id, kind);
        }
    }

    fn script(&self) -> Vec<V2gRequest> {
        let mut script = vec![
            self.charge_parameter_discovery(),
            self.schedule_exchange(),
            V2gRequest::DcCableCheck(DcCableCheckReq { header: self.header() }),
            self.precharge(Processing::Ongoing),
            self.precharge(Processing::Finished),
            self.power_delivery(ChargeProgress::Start),
        ];
        script.extend((0..self.charge_loops).map(|_| self.charge_loop()));
        script.push(self.power_delivery(ChargeProgress::Stop));
        script
    }

    fn header(&self) -> MessageHeader {
        MessageHeader::now(self.session_id.clone())
    }

    fn charge_parameter_discovery(&self) -> V2gRequest {
        let dc = DcChargeParameterDiscoveryReqParams {
            ev_max_charge_power: rn(3, 100),
            ev_min_charge_power: rn(0, 500),
            ev_max_charge_current: rn(0, 250),
            ev_min_charge_current: rn(0, 1),
            ev_max_voltage: rn(0, 850),
            ev_min_voltage: rn(0, 200),
            target_soc: Some(80),
        };
        let params = match self.service {
            ServiceV20::Dc => DcCpdReqParams::Dc(dc),
            ServiceV20::DcBpt => DcCpdReqParams::Bpt(BptDcChargeParameterDiscoveryReqParams {
                dc,
                ev_max_discharge_power: rn(3, 11),
                ev_min_discharge_power: rn(0, 500),
                ev_max_discharge_current: rn(0, 30),
                ev_min_discharge_current: rn(0, 1),
            }),
        };
        V2gRequest::DcChargeParameterDiscovery(DcChargeParameterDiscoveryReq {
            header: self.header(),
            params,
        })
    }

    fn schedule_exchange(&self) -> V2gRequest {
        let params = match self.control_mode {
            ControlMode::Scheduled => {
                ScheduleExchangeReqParams::Scheduled(ScheduledScheduleExchangeReqParams {
                    departure_time: Some(7200),
                    ev_target_energy_request: Some(rn(3, 40)),
                    ev_max_energy_request: Some(rn(3, 60)),
                    ev_min_energy_request: Some(rn(3, 5)),
                })
            }
            ControlMode::Dynamic => {
                ScheduleExchangeReqParams::Dynamic(DynamicScheduleExchangeReqParams {
                    departure_time: 7200,
                    min_soc: Some(30),
                    target_soc: Some(80),
                    ev_target_energy_request: rn(3, 40),
                    ev_max_energy_request: rn(3, 60),
                    ev_min_energy_request: rn(3, 5),
                    ev_max_v2x_energy_request: None,
                    ev_min_v2x_energy_request: None,
                })
            }
        };
        V2gRequest::ScheduleExchange(ScheduleExchangeReq {
            header: self.header(),
            max_supporting_points: 1024,
            params,
        })
    }

    fn precharge(&self, processing: Processing) -> V2gRequest {
        V2gRequest::DcPreCharge(DcPreChargeReq {
            header: self.header(),
            ev_processing: processing,
            ev_present_voltage: rn(0, 398),
            ev_target_voltage: rn(0, 400),
        })
    }

    fn power_delivery(&self, progress: ChargeProgress) -> V2gRequest {
        let selected_schedule_tuple_id = match (progress, self.control_mode) {
            (ChargeProgress::Start, ControlMode::Scheduled) => Some(1),
            _ => None,
        };
        V2gRequest::PowerDelivery(PowerDeliveryReq {
            header: self.header(),
            ev_processing: Processing::Finished,
            charge_progress: progress,
            selected_schedule_tuple_id,
        })
    }

    fn charge_loop(&self) -> V2gRequest {
        let scheduled = || ScheduledDcChargeLoopReqParams {
            ev_target_energy_request: Some(rn(3, 40)),
            ev_max_energy_request: Some(rn(3, 60)),
            ev_min_energy_request: Some(rn(3, 5)),
            ev_target_current: rn(0, 200),
            ev_target_voltage: rn(0, 400),
            ev_max_charge_power: Some(rn(3, 100)),
            ev_min_charge_power: Some(rn(0, 500)),
            ev_max_charge_current: Some(rn(0, 250)),
            ev_max_voltage: Some(rn(0, 850)),
            ev_min_voltage: Some(rn(0, 200)),
        };
        let dynamic = || DynamicDcChargeLoopReqParams {
            departure_time: Some(7200),
            ev_target_energy_request: rn(3, 40),
            ev_max_energy_request: rn(3, 60),
            ev_min_energy_request: rn(3, 5),
            ev_max_charge_power: rn(3, 100),
            ev_min_charge_power: rn(0, 500),
            ev_max_charge_current: rn(0, 250),
            ev_max_voltage: rn(0, 850),
            ev_min_voltage: rn(0, 200),
        };

        let params = match (self.service, self.control_mode) {
            (ServiceV20::Dc, ControlMode::Scheduled) => DcChargeLoopReqParams::Scheduled(scheduled()),
            (ServiceV20::Dc, ControlMode::Dynamic) => DcChargeLoopReqParams::Dynamic(dynamic()),
            (ServiceV20::DcBpt, ControlMode::Scheduled) => {
                DcChargeLoopReqParams::BptScheduled(BptScheduledDcChargeLoopReqParams {
                    scheduled: scheduled(),
                    ev_max_discharge_power: Some(rn(3, 11)),
                    ev_min_discharge_power: Some(rn(0, 500)),
                    ev_max_discharge_current: Some(rn(0, 30)),
                })
            }
            (ServiceV20::DcBpt, ControlMode::Dynamic) => {
                DcChargeLoopReqParams::BptDynamic(BptDynamicDcChargeLoopReqParams {
                    dynamic: dynamic(),
                    ev_max_discharge_power: rn(3, 11),
                    ev_min_discharge_power: rn(0, 500),
                    ev_max_discharge_current: rn(0, 30),
                    ev_max_v2x_energy_request: Some(rn(3, 20)),
                    ev_min_v2x_energy_request: Some(rn(0, 0)),
                })
            }
        };

        V2gRequest::DcChargeLoop(DcChargeLoopReq {
            header: self.header(),
            display_parameters: Some(DisplayParameters {
                present_soc: Some(55),
                ..Default::default()
            }),
            meter_info_requested: false,
            ev_present_voltage: rn(0, 400),
            params,
        })
    }
}

fn rn(exponent: i8, value: i16) -> RationalNumber {
    RationalNumber { exponent, value }
}
