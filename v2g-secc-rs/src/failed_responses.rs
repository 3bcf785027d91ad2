//! Failed-response registry
//!
//! Tracks, per message kind, whether a protocol fault has already been
//! surfaced to the session owner. The EV still gets one negative response
//! per request; only the report upstream is deduplicated.

use std::collections::HashMap;

use crate::messages::*;
use crate::rational::RationalNumber;

/// Per-session record of reported failures
#[derive(Debug, Clone, PartialEq)]
pub struct FailedResponses {
    reported: HashMap<MessageKind, bool>,
}

impl Default for FailedResponses {
    fn default() -> Self {
        Self::new()
    }
}

impl FailedResponses {
    /// Registry with every kind unreported
    pub fn new() -> Self {
        Self {
            reported: MessageKind::ALL.iter().map(|kind| (*kind, false)).collect(),
        }
    }

    /// Forget all reports; called once when a session starts
    pub fn reset(&mut self) {
        for reported in self.reported.values_mut() {
            *reported = false;
        }
    }

    /// Mark `kind` as reported. Returns `true` only on the first report.
    pub fn report(&mut self, kind: MessageKind) -> bool {
        let reported = self.reported.entry(kind).or_insert(false);
        let first = !*reported;
        *reported = true;
        first
    }

    pub fn was_reported(&self, kind: MessageKind) -> bool {
        self.reported.get(&kind).copied().unwrap_or(false)
    }
}

/// Minimal negative response for `kind`
///
/// Mandatory physical fields are zero; optional sub-messages are omitted.
pub fn failed_response(kind: MessageKind, header: MessageHeader, code: ResponseCode) -> V2gResponse {
    match kind {
        MessageKind::DcChargeParameterDiscovery => {
            V2gResponse::DcChargeParameterDiscovery(DcChargeParameterDiscoveryRes {
                header,
                response_code: code,
                params: None,
            })
        }
        MessageKind::ScheduleExchange => V2gResponse::ScheduleExchange(ScheduleExchangeRes {
            header,
            response_code: code,
            evse_processing: Processing::Finished,
            params: None,
        }),
        MessageKind::DcCableCheck => V2gResponse::DcCableCheck(DcCableCheckRes {
            header,
            response_code: code,
            evse_processing: Processing::Finished,
        }),
        MessageKind::DcPreCharge => V2gResponse::DcPreCharge(DcPreChargeRes {
            header,
            response_code: code,
            evse_present_voltage: RationalNumber::ZERO,
        }),
        MessageKind::PowerDelivery => V2gResponse::PowerDelivery(PowerDeliveryRes {
            header,
            response_code: code,
        }),
        MessageKind::DcChargeLoop => V2gResponse::DcChargeLoop(DcChargeLoopRes {
            header,
            response_code: code,
            evse_present_current: RationalNumber::ZERO,
            evse_present_voltage: RationalNumber::ZERO,
            evse_power_limit_achieved: false,
            evse_current_limit_achieved: false,
            evse_voltage_limit_achieved: false,
            params: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_report_only() {
        let mut registry = FailedResponses::new();
        assert!(!registry.was_reported(MessageKind::DcCableCheck));

        assert!(registry.report(MessageKind::DcCableCheck));
        assert!(!registry.report(MessageKind::DcCableCheck));
        assert!(registry.was_reported(MessageKind::DcCableCheck));
        assert!(!registry.was_reported(MessageKind::DcPreCharge));
    }

    #[test]
    fn test_reset_clears_reports() {
        let mut registry = FailedResponses::new();
        registry.report(MessageKind::PowerDelivery);
        registry.reset();
        assert!(registry.report(MessageKind::PowerDelivery));
    }

    #[test]
    fn test_failed_response_matches_kind() {
        for kind in MessageKind::ALL {
            let res = failed_response(
                kind,
                MessageHeader::now("0011223344556677"),
                ResponseCode::FailedSequenceError,
            );
            assert_eq!(res.kind(), kind);
            assert_eq!(res.response_code(), ResponseCode::FailedSequenceError);
        }
    }
}
