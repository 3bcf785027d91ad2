//! Property tests for the RationalNumber codec
//!
//! Tests fixed-point invariants:
//! - Bounds: mantissa fits i16, exponent stays in [-3, 3]
//! - Precision: decoding loses at most one unit of the chosen exponent
//! - Minimality: the finest exponent that fits is chosen
//! - Range: values beyond 32767 × 10^3 are rejected, never clamped

use proptest::prelude::*;
use v2g_secc::rational::*;

// ============================================================================
// Strategies
// ============================================================================

fn legal_physical_value() -> impl Strategy<Value = f64> {
    -32_768_000.0f64..32_767_000.0f64
}

fn oversized_value() -> impl Strategy<Value = f64> {
    prop_oneof![32_768_000.0f64..1.0e12, -1.0e12f64..-32_769_000.0]
}

// ============================================================================
// Encoding Property Tests
// ============================================================================

proptest! {
    /// CORE INVARIANT: legal values always encode within wire bounds
    #[test]
    fn encode_stays_in_bounds(v in legal_physical_value()) {
        let rn = RationalNumber::from_f64(v).unwrap();
        prop_assert!((MIN_EXPONENT..=MAX_EXPONENT).contains(&rn.exponent));
    }

    /// Truncation loses less than one unit of the chosen exponent
    #[test]
    fn decode_within_precision(v in legal_physical_value()) {
        let (exponent, mantissa) = encode(v).unwrap();
        let decoded = decode(exponent, mantissa);
        let unit = 10f64.powi(exponent as i32);

        prop_assert!(
            (v - decoded).abs() < unit * 1.0001 + 1e-9,
            "{} decoded as {} with exponent {}", v, decoded, exponent
        );
        prop_assert!(decoded.abs() <= v.abs() + 1e-9, "{} rounded away from zero", v);
    }

    /// Small integers get millis precision
    #[test]
    fn small_integers_use_finest_exponent(n in -32i16..=32i16) {
        let rn = RationalNumber::from_f64(n as f64).unwrap();
        if n == 0 {
            prop_assert_eq!(rn, RationalNumber::ZERO);
        } else {
            prop_assert_eq!(rn, RationalNumber { exponent: -3, value: n * 1000 });
        }
    }

    /// A coarser exponent is only chosen when the finer one overflows
    #[test]
    fn chosen_exponent_is_minimal(v in legal_physical_value()) {
        let rn = RationalNumber::from_f64(v).unwrap();
        if rn.exponent > MIN_EXPONENT {
            let finer_exponent = rn.exponent as i32 - 1;
            let power = 10f64.powi(finer_exponent.abs());
            let finer = if finer_exponent <= 0 { v * power } else { v / power }.trunc();
            prop_assert!(
                finer > i16::MAX as f64 || finer < i16::MIN as f64,
                "{} could have used exponent {}", v, rn.exponent - 1
            );
        }
    }

    /// Out-of-range values are an error, never clamped
    #[test]
    fn oversized_values_rejected(v in oversized_value()) {
        prop_assert_eq!(RationalNumber::from_f64(v), Err(RationalError::OutOfRange(v)));
    }

    /// Raw wire fields decode exactly for integral results
    #[test]
    fn positive_exponents_decode_exactly(value in any::<i16>(), exponent in 0i8..=3i8) {
        let expected = value as f64 * 10f64.powi(exponent as i32);
        prop_assert_eq!(decode(exponent, value), expected);
    }
}
