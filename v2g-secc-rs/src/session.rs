//! Per-session owner of the DC state machine
//!
//! Manages one charging session from ChargeParameterDiscovery to
//! termination:
//! - Routing each request to the active state (or the state it implies)
//! - Swapping states on `Goto`, stopping on `Terminate`
//! - Turning hardware errors into a terminal outcome
//! - Deduplicated reporting of protocol faults
//!
//! Requests are handled strictly one at a time. Concurrent sessions are
//! independent [`SeccSession`]s, typically one tokio task each.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::context::{EvDataContext, EvseDataContext};
use crate::controller::EvseController;
use crate::error::{Result, SeccError};
use crate::failed_responses::{failed_response, FailedResponses};
use crate::messages::*;
use crate::states::{transition, NextState, State, StateId, StopReason, Transition};

/// Protocol fault surfaced to the session owner (first occurrence per kind)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFault {
    pub kind: MessageKind,
    pub response_code: ResponseCode,
}

/// Per-session record handed to every state
pub struct CommSession {
    /// 8 random bytes, hex encoded
    pub session_id: String,
    pub protocol: Protocol,
    pub selected_energy_service: SelectedEnergyService,
    pub control_mode: ControlMode,
    pub ev_data_context: EvDataContext,
    pub evse_data_context: EvseDataContext,
    pub failed_responses: FailedResponses,
    pub evse_controller: Arc<dyn EvseController>,

    /// Schedule tuple IDs offered in the last ScheduleExchangeRes
    pub offered_schedule_tuple_ids: Vec<u32>,

    /// Set by PowerDelivery(ScheduleRenegotiation) until the next Start
    pub renegotiation_requested: bool,

    pub faults: Vec<ProtocolFault>,
}

impl std::fmt::Debug for CommSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommSession")
            .field("session_id", &self.session_id)
            .field("protocol", &self.protocol)
            .field("selected_energy_service", &self.selected_energy_service)
            .field("control_mode", &self.control_mode)
            .field("faults", &self.faults)
            .finish_non_exhaustive()
    }
}

impl CommSession {
    pub fn new(
        config: &SessionConfig,
        evse_data_context: EvseDataContext,
        evse_controller: Arc<dyn EvseController>,
    ) -> Self {
        Self {
            session_id: new_session_id(),
            protocol: config.protocol,
            selected_energy_service: config.selected_energy_service(),
            control_mode: config.control_mode,
            ev_data_context: EvDataContext::new(),
            evse_data_context,
            failed_responses: FailedResponses::new(),
            evse_controller,
            offered_schedule_tuple_ids: Vec::new(),
            renegotiation_requested: false,
            faults: Vec::new(),
        }
    }

    /// Resume a session whose ID was assigned earlier (SessionSetup)
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn service(&self) -> ServiceV20 {
        self.selected_energy_service.service
    }

    /// Response header for this session
    pub fn header(&self) -> MessageHeader {
        MessageHeader::now(self.session_id.clone())
    }

    /// Negative response for a protocol fault; the session stays put
    ///
    /// Only the first fault per message kind is recorded in `faults`.
    pub fn protocol_fault(
        &mut self,
        kind: MessageKind,
        request_header: MessageHeader,
        code: ResponseCode,
    ) -> Transition {
        if self.failed_responses.report(kind) {
            warn!(
                "Session {}: {} rejected with {:?} (request timestamp {})",
                self.session_id, kind, code, request_header.timestamp
            );
            self.faults.push(ProtocolFault {
                kind,
                response_code: code,
            });
        } else {
            debug!("Session {}: repeated {} fault suppressed", self.session_id, kind);
        }
        Transition::stay(failed_response(kind, self.header(), code))
    }
}

fn new_session_id() -> String {
    let bytes: [u8; 8] = rand::random();
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Final report of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEnd {
    pub session_id: String,
    pub reason: StopReason,
    pub faults: Vec<ProtocolFault>,
}

/// One DC charging session
#[derive(Debug)]
pub struct SeccSession {
    comm: CommSession,
    state: State,
    stop_reason: Option<StopReason>,
}

impl SeccSession {
    /// Session waiting for DC_ChargeParameterDiscoveryReq
    pub fn new(comm: CommSession) -> Self {
        Self::starting_at(comm, StateId::DcChargeParameterDiscovery)
    }

    /// Session entering the DC sequence at `state`
    pub fn starting_at(mut comm: CommSession, state: StateId) -> Self {
        comm.failed_responses.reset();
        Self {
            comm,
            state: State::new(state),
            stop_reason: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.comm.session_id
    }

    pub fn state_id(&self) -> StateId {
        self.state.id()
    }

    pub fn comm_session(&self) -> &CommSession {
        &self.comm
    }

    /// Station-side access between requests, e.g. to refresh session limits
    pub fn comm_session_mut(&mut self) -> &mut CommSession {
        &mut self.comm
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Process one request and return the response to send
    pub async fn handle_request(&mut self, req: V2gRequest) -> Result<V2gResponse> {
        if self.is_terminated() {
            return Err(SeccError::SessionTerminated(self.comm.session_id.clone()));
        }

        let kind = req.kind();
        let header = req.header().clone();
        debug!("Session {}: {} in state {}", self.comm.session_id, kind, self.state.id());

        if header.session_id != self.comm.session_id {
            let t = self.comm.protocol_fault(kind, header, ResponseCode::FailedUnknownSession);
            return Ok(t.response);
        }

        let previous = match self.route(kind) {
            Some(id) if id != self.state.id() => {
                Some(std::mem::replace(&mut self.state, State::new(id)))
            }
            Some(_) => None,
            None => {
                let t = self.comm.protocol_fault(kind, header, ResponseCode::FailedSequenceError);
                return Ok(t.response);
            }
        };

        let transition = match self.state.process(&mut self.comm, req).await {
            Ok(transition) => transition,
            Err(e) => self.fatal_transition(kind, e)?,
        };

        // A rejected early exit leaves the session where it was
        if let Some(previous) = previous {
            let rejected = transition.next == NextState::Stay
                && !transition.response.response_code().is_ok();
            if rejected {
                debug!(
                    "Session {}: {} rejected, staying in {}",
                    self.comm.session_id,
                    kind,
                    previous.id()
                );
                self.state = previous;
            } else {
                info!("Session {}: {} -> {}", self.comm.session_id, previous.id(), self.state.id());
            }
        }

        self.apply(transition.next);
        Ok(transition.response)
    }

    /// Drive the session from a request channel until it ends
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<V2gRequest>,
        tx: mpsc::Sender<V2gResponse>,
    ) -> SessionEnd {
        info!(
            "Session {} started: {} {}, {} control",
            self.comm.session_id,
            self.comm.protocol,
            self.comm.service(),
            self.comm.control_mode
        );

        let reason = loop {
            let Some(req) = rx.recv().await else {
                warn!("Session {}: request channel closed", self.comm.session_id);
                break StopReason::TransportClosed;
            };

            match self.handle_request(req).await {
                Ok(res) => {
                    if tx.send(res).await.is_err() {
                        warn!("Session {}: response channel closed", self.comm.session_id);
                        break StopReason::TransportClosed;
                    }
                    if let Some(reason) = self.stop_reason.clone() {
                        break reason;
                    }
                }
                Err(e) => {
                    error!("Session {}: {}", self.comm.session_id, e);
                    break StopReason::ContextInconsistent(e.to_string());
                }
            }
        };

        SessionEnd {
            session_id: self.comm.session_id,
            reason,
            faults: self.comm.faults,
        }
    }

    fn route(&self, kind: MessageKind) -> Option<StateId> {
        // Renegotiating while charging: back to PowerDelivery only, never CableCheck
        if self.comm.renegotiation_requested && self.state.id() == StateId::ScheduleExchange {
            return match kind {
                MessageKind::ScheduleExchange => Some(StateId::ScheduleExchange),
                MessageKind::PowerDelivery => Some(StateId::PowerDelivery),
                _ => None,
            };
        }
        transition(self.state.id(), kind)
    }

    /// Map a state error onto a terminal `FAILED` response
    fn fatal_transition(&self, kind: MessageKind, err: SeccError) -> Result<Transition> {
        let reason = match err {
            SeccError::Controller(e) => StopReason::ControllerFault(e.to_string()),
            e @ (SeccError::MissingLimits(_) | SeccError::Rational(_)) => {
                StopReason::ContextInconsistent(e.to_string())
            }
            e => return Err(e),
        };
        Ok(Transition::terminate(
            failed_response(kind, self.comm.header(), ResponseCode::Failed),
            reason,
        ))
    }

    fn apply(&mut self, next: NextState) {
        match next {
            NextState::Stay => {}
            NextState::Goto(id) => {
                info!("Session {}: {} -> {}", self.comm.session_id, self.state.id(), id);
                self.state = State::new(id);
            }
            NextState::Terminate(reason) => {
                if reason.is_fault() {
                    error!("Session {} terminated: {}", self.comm.session_id, reason);
                } else {
                    info!("Session {} finished: {}", self.comm.session_id, reason);
                }
                self.stop_reason = Some(reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::simulator::{default_evse_data_context, SimEvseController};

    fn session() -> SeccSession {
        let comm = CommSession::new(
            &SessionConfig::default(),
            default_evse_data_context(),
            Arc::new(SimEvseController::new()),
        );
        SeccSession::new(comm)
    }

    #[test]
    fn test_session_id_format() {
        let s = session();
        assert_eq!(s.session_id().len(), 16);
        assert!(s.session_id().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(s.state_id(), StateId::DcChargeParameterDiscovery);
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected() {
        let mut s = session();
        let res = s
            .handle_request(V2gRequest::DcCableCheck(DcCableCheckReq {
                header: MessageHeader::now("0000000000000000"),
            }))
            .await
            .unwrap();
        assert_eq!(res.response_code(), ResponseCode::FailedUnknownSession);
        assert_eq!(s.state_id(), StateId::DcChargeParameterDiscovery);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_session() {
        let s = session();
        let (req_tx, req_rx) = mpsc::channel(1);
        let (res_tx, _res_rx) = mpsc::channel(1);
        drop(req_tx);

        let end = s.run(req_rx, res_tx).await;
        assert_eq!(end.reason, StopReason::TransportClosed);
        assert!(end.faults.is_empty());
    }
}
