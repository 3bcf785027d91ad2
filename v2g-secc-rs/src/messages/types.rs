//! ISO 15118-20 enumerations and shared message fields
//!
//! Only the subset needed by the DC charging states is modelled here:
//! - Service and control-mode negotiation results
//! - Processing / charge-progress flags
//! - Response codes used by the DC states

use serde::{Deserialize, Serialize};

// ============================================================================
// Enumerations
// ============================================================================

/// Protocol version negotiated during SupportedAppProtocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "urn:iso:std:iso:15118:-20:DC")]
    Iso15118_20Dc,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Iso15118_20Dc => write!(f, "ISO 15118-20 DC"),
        }
    }
}

/// Energy transfer service selected during ServiceSelection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceV20 {
    /// Unidirectional DC charging
    Dc,
    /// Bidirectional DC power transfer
    DcBpt,
}

impl ServiceV20 {
    /// Service ID as listed in ISO 15118-20 Table 204
    pub fn id(self) -> u16 {
        match self {
            ServiceV20::Dc => 2,
            ServiceV20::DcBpt => 6,
        }
    }

    pub fn is_bpt(self) -> bool {
        matches!(self, ServiceV20::DcBpt)
    }
}

impl std::fmt::Display for ServiceV20 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceV20::Dc => write!(f, "DC"),
            ServiceV20::DcBpt => write!(f, "DC_BPT"),
        }
    }
}

/// Negotiation style for the charge loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Scheduled,
    Dynamic,
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlMode::Scheduled => write!(f, "scheduled"),
            ControlMode::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Processing flag carried by requests and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Processing {
    Finished,
    Ongoing,
    #[serde(rename = "Ongoing_WaitingForCustomerInteraction")]
    OngoingWaitingForCustomerInteraction,
}

impl Processing {
    pub fn is_finished(self) -> bool {
        matches!(self, Processing::Finished)
    }
}

/// ChargeProgress of PowerDeliveryReq
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ChargeProgress {
    Start,
    Stop,
    Standby,
    ScheduleRenegotiation,
}

/// Response codes used by the DC states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "FAILED_SequenceError")]
    FailedSequenceError,
    #[serde(rename = "FAILED_UnknownSession")]
    FailedUnknownSession,
    #[serde(rename = "FAILED_WrongChargeParameter")]
    FailedWrongChargeParameter,
    #[serde(rename = "FAILED_IsolationFault")]
    FailedIsolationFault,
    #[serde(rename = "FAILED_PowerDeliveryNotApplied")]
    FailedPowerDeliveryNotApplied,
    #[serde(rename = "FAILED_ScheduleSelectionInvalid")]
    FailedScheduleSelectionInvalid,
}

impl ResponseCode {
    pub fn is_ok(self) -> bool {
        matches!(self, ResponseCode::Ok)
    }
}

// ============================================================================
// Complex Types
// ============================================================================

/// Header present on every V2G message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    /// 8-byte session ID, hex encoded
    pub session_id: String,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

impl MessageHeader {
    /// Header stamped with the current time
    pub fn now(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Value of an advertised service parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterValue {
    Bool(bool),
    Int(i32),
    Rational(crate::rational::RationalNumber),
    Text(String),
}

/// Single named service parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

/// Advertised parameter set of the selected service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSet {
    pub parameter_set_id: u16,
    pub parameters: Vec<Parameter>,
}

/// Outcome of ServiceSelection, fixed for the rest of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedEnergyService {
    pub service: ServiceV20,
    pub is_free: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parameter_set: Option<ParameterSet>,
}

impl SelectedEnergyService {
    pub fn new(service: ServiceV20) -> Self {
        Self {
            service,
            is_free: true,
            parameter_set: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_ids() {
        assert_eq!(ServiceV20::Dc.id(), 2);
        assert_eq!(ServiceV20::DcBpt.id(), 6);
        assert!(ServiceV20::DcBpt.is_bpt());
        assert!(!ServiceV20::Dc.is_bpt());
    }

    #[test]
    fn test_response_code_wire_names() {
        let json = serde_json::to_string(&ResponseCode::FailedSequenceError).unwrap();
        assert_eq!(json, "\"FAILED_SequenceError\"");
        let json = serde_json::to_string(&ServiceV20::DcBpt).unwrap();
        assert_eq!(json, "\"DC_BPT\"");
    }
}
