//! DC charging state machine
//!
//! Each state consumes one request, produces one response and names what
//! happens next:
//!
//! ```text
//! DC_ChargeParameterDiscovery ──► ScheduleExchange ──(CableCheckReq)──► DC_CableCheck
//!                                        ▲                                   │ VALID
//!                                        │ ScheduleRenegotiation             ▼
//! DC_ChargeLoop ◄── C2/D2 ── PowerDelivery ◄──(PowerDeliveryReq)──── DC_PreCharge
//!       │                          ▲
//!       └────(PowerDeliveryReq)────┘
//! ```
//!
//! States never touch the transport. The session owner swaps states using
//! [`NextState`] and the external transition table in [`transition`].

pub mod dc;

use serde::{Deserialize, Serialize};

use crate::controller::{CpState, IsolationLevel};
use crate::error::Result;
use crate::messages::{MessageKind, ResponseCode, V2gRequest, V2gResponse};
use crate::session::CommSession;

pub use dc::*;

/// Closed set of DC states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateId {
    DcChargeParameterDiscovery,
    ScheduleExchange,
    DcCableCheck,
    DcPreCharge,
    PowerDelivery,
    DcChargeLoop,
}

impl StateId {
    /// Request kind this state processes
    pub fn kind(self) -> MessageKind {
        match self {
            StateId::DcChargeParameterDiscovery => MessageKind::DcChargeParameterDiscovery,
            StateId::ScheduleExchange => MessageKind::ScheduleExchange,
            StateId::DcCableCheck => MessageKind::DcCableCheck,
            StateId::DcPreCharge => MessageKind::DcPreCharge,
            StateId::PowerDelivery => MessageKind::PowerDelivery,
            StateId::DcChargeLoop => MessageKind::DcChargeLoop,
        }
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopReason {
    ContactorOpen,
    IsolationFault(IsolationLevel),
    CpStateNotReady(CpState),
    EvRequestedStop,
    ControllerFault(String),
    ContextInconsistent(String),
    TransportClosed,
}

impl StopReason {
    /// Everything except a regular stop requested by the EV
    pub fn is_fault(&self) -> bool {
        !matches!(self, StopReason::EvRequestedStop)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ContactorOpen => write!(f, "contactor not closed"),
            StopReason::IsolationFault(level) => write!(f, "isolation check failed: {:?}", level),
            StopReason::CpStateNotReady(cp) => write!(f, "control pilot not ready: {:?}", cp),
            StopReason::EvRequestedStop => write!(f, "EV requested stop"),
            StopReason::ControllerFault(e) => write!(f, "controller fault: {}", e),
            StopReason::ContextInconsistent(e) => write!(f, "data context inconsistent: {}", e),
            StopReason::TransportClosed => write!(f, "transport closed"),
        }
    }
}

/// What the session owner does after sending the response
#[derive(Debug, Clone, PartialEq)]
pub enum NextState {
    Stay,
    Goto(StateId),
    Terminate(StopReason),
}

/// Outcome of processing one request
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub response: V2gResponse,
    pub next: NextState,
}

impl Transition {
    pub fn stay(response: V2gResponse) -> Self {
        Self {
            response,
            next: NextState::Stay,
        }
    }

    pub fn goto(response: V2gResponse, state: StateId) -> Self {
        Self {
            response,
            next: NextState::Goto(state),
        }
    }

    pub fn terminate(response: V2gResponse, reason: StopReason) -> Self {
        Self {
            response,
            next: NextState::Terminate(reason),
        }
    }
}

/// State selected for an inbound request kind while in `current`
///
/// Returns `current` for its own kind, the follow-up state for exits the
/// EV drives by sending the next request early, and `None` for anything
/// out of sequence.
pub fn transition(current: StateId, kind: MessageKind) -> Option<StateId> {
    use MessageKind as K;
    use StateId as S;

    if current.kind() == kind {
        return Some(current);
    }
    match (current, kind) {
        (S::ScheduleExchange, K::DcCableCheck) => Some(S::DcCableCheck),
        (S::DcPreCharge, K::PowerDelivery) => Some(S::PowerDelivery),
        (S::DcChargeLoop, K::PowerDelivery) => Some(S::PowerDelivery),
        _ => None,
    }
}

/// Active state with its per-state memory
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    DcChargeParameterDiscovery(DcChargeParameterDiscovery),
    ScheduleExchange(ScheduleExchange),
    DcCableCheck(DcCableCheck),
    DcPreCharge(DcPreCharge),
    PowerDelivery(PowerDelivery),
    DcChargeLoop(DcChargeLoop),
}

impl State {
    pub fn new(id: StateId) -> Self {
        match id {
            StateId::DcChargeParameterDiscovery => {
                State::DcChargeParameterDiscovery(DcChargeParameterDiscovery)
            }
            StateId::ScheduleExchange => State::ScheduleExchange(ScheduleExchange),
            StateId::DcCableCheck => State::DcCableCheck(DcCableCheck::default()),
            StateId::DcPreCharge => State::DcPreCharge(DcPreCharge),
            StateId::PowerDelivery => State::PowerDelivery(PowerDelivery),
            StateId::DcChargeLoop => State::DcChargeLoop(DcChargeLoop),
        }
    }

    pub fn id(&self) -> StateId {
        match self {
            State::DcChargeParameterDiscovery(_) => StateId::DcChargeParameterDiscovery,
            State::ScheduleExchange(_) => StateId::ScheduleExchange,
            State::DcCableCheck(_) => StateId::DcCableCheck,
            State::DcPreCharge(_) => StateId::DcPreCharge,
            State::PowerDelivery(_) => StateId::PowerDelivery,
            State::DcChargeLoop(_) => StateId::DcChargeLoop,
        }
    }

    /// Process one request in this state
    ///
    /// A request of another kind is answered with `FAILED_SequenceError`
    /// and the state is kept.
    pub async fn process(&mut self, session: &mut CommSession, req: V2gRequest) -> Result<Transition> {
        match (self, req) {
            (State::DcChargeParameterDiscovery(s), V2gRequest::DcChargeParameterDiscovery(req)) => {
                s.process(session, req).await
            }
            (State::ScheduleExchange(s), V2gRequest::ScheduleExchange(req)) => {
                s.process(session, req).await
            }
            (State::DcCableCheck(s), V2gRequest::DcCableCheck(req)) => s.process(session, req).await,
            (State::DcPreCharge(s), V2gRequest::DcPreCharge(req)) => s.process(session, req).await,
            (State::PowerDelivery(s), V2gRequest::PowerDelivery(req)) => {
                s.process(session, req).await
            }
            (State::DcChargeLoop(s), V2gRequest::DcChargeLoop(req)) => s.process(session, req).await,
            (_, req) => Ok(session.protocol_fault(
                req.kind(),
                req.header().clone(),
                ResponseCode::FailedSequenceError,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_kind_stays_in_state() {
        for kind in MessageKind::ALL {
            let id = State::new(match kind {
                MessageKind::DcChargeParameterDiscovery => StateId::DcChargeParameterDiscovery,
                MessageKind::ScheduleExchange => StateId::ScheduleExchange,
                MessageKind::DcCableCheck => StateId::DcCableCheck,
                MessageKind::DcPreCharge => StateId::DcPreCharge,
                MessageKind::PowerDelivery => StateId::PowerDelivery,
                MessageKind::DcChargeLoop => StateId::DcChargeLoop,
            })
            .id();
            assert_eq!(id.kind(), kind);
            assert_eq!(transition(id, kind), Some(id));
        }
    }

    #[test]
    fn test_externally_driven_exits() {
        assert_eq!(
            transition(StateId::ScheduleExchange, MessageKind::DcCableCheck),
            Some(StateId::DcCableCheck)
        );
        assert_eq!(
            transition(StateId::DcPreCharge, MessageKind::PowerDelivery),
            Some(StateId::PowerDelivery)
        );
        assert_eq!(
            transition(StateId::DcChargeLoop, MessageKind::PowerDelivery),
            Some(StateId::PowerDelivery)
        );
        assert_eq!(transition(StateId::DcCableCheck, MessageKind::DcChargeLoop), None);
        assert_eq!(
            transition(StateId::DcChargeParameterDiscovery, MessageKind::PowerDelivery),
            None
        );
    }

    #[test]
    fn test_stop_reason_fault_classification() {
        assert!(!StopReason::EvRequestedStop.is_fault());
        assert!(StopReason::ContactorOpen.is_fault());
        assert!(StopReason::CpStateNotReady(CpState::B2).is_fault());
    }
}
