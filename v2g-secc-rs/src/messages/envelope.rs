//! Request/response envelopes handed between the session and its transport
//!
//! EXI encoding is done by the transport collaborator; inside this crate
//! messages travel as these enums. JSON helpers exist for logging and for
//! simulators that exchange messages out of process.

use serde::{Deserialize, Serialize};

use super::common::*;
use super::dc::*;
use super::types::*;

/// Message kinds handled by the DC sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    DcChargeParameterDiscovery,
    ScheduleExchange,
    DcCableCheck,
    DcPreCharge,
    PowerDelivery,
    DcChargeLoop,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        MessageKind::DcChargeParameterDiscovery,
        MessageKind::ScheduleExchange,
        MessageKind::DcCableCheck,
        MessageKind::DcPreCharge,
        MessageKind::PowerDelivery,
        MessageKind::DcChargeLoop,
    ];
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageKind::DcChargeParameterDiscovery => "DC_ChargeParameterDiscovery",
            MessageKind::ScheduleExchange => "ScheduleExchange",
            MessageKind::DcCableCheck => "DC_CableCheck",
            MessageKind::DcPreCharge => "DC_PreCharge",
            MessageKind::PowerDelivery => "PowerDelivery",
            MessageKind::DcChargeLoop => "DC_ChargeLoop",
        };
        write!(f, "{}", name)
    }
}

/// Inbound message from the EV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum V2gRequest {
    DcChargeParameterDiscovery(DcChargeParameterDiscoveryReq),
    ScheduleExchange(ScheduleExchangeReq),
    DcCableCheck(DcCableCheckReq),
    DcPreCharge(DcPreChargeReq),
    PowerDelivery(PowerDeliveryReq),
    DcChargeLoop(DcChargeLoopReq),
}

impl V2gRequest {
    pub fn kind(&self) -> MessageKind {
        match self {
            V2gRequest::DcChargeParameterDiscovery(_) => MessageKind::DcChargeParameterDiscovery,
            V2gRequest::ScheduleExchange(_) => MessageKind::ScheduleExchange,
            V2gRequest::DcCableCheck(_) => MessageKind::DcCableCheck,
            V2gRequest::DcPreCharge(_) => MessageKind::DcPreCharge,
            V2gRequest::PowerDelivery(_) => MessageKind::PowerDelivery,
            V2gRequest::DcChargeLoop(_) => MessageKind::DcChargeLoop,
        }
    }

    pub fn header(&self) -> &MessageHeader {
        match self {
            V2gRequest::DcChargeParameterDiscovery(req) => &req.header,
            V2gRequest::ScheduleExchange(req) => &req.header,
            V2gRequest::DcCableCheck(req) => &req.header,
            V2gRequest::DcPreCharge(req) => &req.header,
            V2gRequest::PowerDelivery(req) => &req.header,
            V2gRequest::DcChargeLoop(req) => &req.header,
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Outbound message to the EV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum V2gResponse {
    DcChargeParameterDiscovery(DcChargeParameterDiscoveryRes),
    ScheduleExchange(ScheduleExchangeRes),
    DcCableCheck(DcCableCheckRes),
    DcPreCharge(DcPreChargeRes),
    PowerDelivery(PowerDeliveryRes),
    DcChargeLoop(DcChargeLoopRes),
}

impl V2gResponse {
    pub fn kind(&self) -> MessageKind {
        match self {
            V2gResponse::DcChargeParameterDiscovery(_) => MessageKind::DcChargeParameterDiscovery,
            V2gResponse::ScheduleExchange(_) => MessageKind::ScheduleExchange,
            V2gResponse::DcCableCheck(_) => MessageKind::DcCableCheck,
            V2gResponse::DcPreCharge(_) => MessageKind::DcPreCharge,
            V2gResponse::PowerDelivery(_) => MessageKind::PowerDelivery,
            V2gResponse::DcChargeLoop(_) => MessageKind::DcChargeLoop,
        }
    }

    pub fn response_code(&self) -> ResponseCode {
        match self {
            V2gResponse::DcChargeParameterDiscovery(res) => res.response_code,
            V2gResponse::ScheduleExchange(res) => res.response_code,
            V2gResponse::DcCableCheck(res) => res.response_code,
            V2gResponse::DcPreCharge(res) => res.response_code,
            V2gResponse::PowerDelivery(res) => res.response_code,
            V2gResponse::DcChargeLoop(res) => res.response_code,
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind_and_header() {
        let req = V2gRequest::DcCableCheck(DcCableCheckReq {
            header: MessageHeader {
                session_id: "F9F9EE8505F55838".into(),
                timestamp: 1,
            },
        });
        assert_eq!(req.kind(), MessageKind::DcCableCheck);
        assert_eq!(req.header().session_id, "F9F9EE8505F55838");
    }

    #[test]
    fn test_response_json_is_tagged() {
        let res = V2gResponse::PowerDelivery(PowerDeliveryRes {
            header: MessageHeader {
                session_id: "F9F9EE8505F55838".into(),
                timestamp: 1,
            },
            response_code: ResponseCode::Ok,
        });

        let bytes = res.to_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "PowerDelivery");
        assert_eq!(json["response_code"], "OK");
        assert_eq!(V2gResponse::from_bytes(&bytes).unwrap(), res);
    }
}
