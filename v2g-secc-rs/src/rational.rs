//! ISO 15118-20 `RationalNumber` codec
//!
//! Physical quantities travel on the wire as a signed 16-bit mantissa and a
//! decimal exponent in [-3, 3]:
//!
//! ```text
//! physical = value × 10^exponent
//! ```
//!
//! Encoding picks the smallest exponent whose truncated mantissa still fits
//! into an `i16`, so the finest representable precision is 0.001. Anything
//! below that is discarded (truncation toward zero, never rounding).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest exponent allowed on the wire
pub const MIN_EXPONENT: i8 = -3;

/// Largest exponent allowed on the wire
pub const MAX_EXPONENT: i8 = 3;

/// Errors from the fixed-point codec
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RationalError {
    #[error("value {0} cannot be represented with exponent in [-3, 3]")]
    OutOfRange(f64),

    #[error("value {0} is not a finite number")]
    NotFinite(f64),

    #[error("exponent {0} outside [-3, 3]")]
    InvalidExponent(i8),
}

/// Fixed-point physical value (mantissa × 10^exponent)
///
/// Deserialization goes through [`RationalNumber::new`], so inbound values
/// with an exponent outside [-3, 3] are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "WireRational")]
pub struct RationalNumber {
    pub exponent: i8,
    pub value: i16,
}

/// Unchecked wire fields
#[derive(Deserialize)]
struct WireRational {
    exponent: i8,
    value: i16,
}

impl TryFrom<WireRational> for RationalNumber {
    type Error = RationalError;

    fn try_from(wire: WireRational) -> Result<Self, Self::Error> {
        Self::new(wire.exponent, wire.value)
    }
}

impl RationalNumber {
    pub const ZERO: Self = Self { exponent: 0, value: 0 };

    /// Build from raw wire fields, rejecting exponents the protocol forbids
    pub fn new(exponent: i8, value: i16) -> Result<Self, RationalError> {
        if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
            return Err(RationalError::InvalidExponent(exponent));
        }
        Ok(Self { exponent, value })
    }

    /// Encode a physical value
    pub fn from_f64(value: f64) -> Result<Self, RationalError> {
        if value == 0.0 {
            return Ok(Self::ZERO);
        }
        if !value.is_finite() {
            return Err(RationalError::NotFinite(value));
        }

        for exponent in MIN_EXPONENT..=MAX_EXPONENT {
            let mantissa = scale(value, exponent).trunc();
            if mantissa >= f64::from(i16::MIN) && mantissa <= f64::from(i16::MAX) {
                // -0.0 casts to 0
                return Ok(Self {
                    exponent,
                    value: mantissa as i16,
                });
            }
        }

        Err(RationalError::OutOfRange(value))
    }

    /// Decode into the physical value
    pub fn to_f64(self) -> f64 {
        decode(self.exponent, self.value)
    }
}

impl TryFrom<f64> for RationalNumber {
    type Error = RationalError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_f64(value)
    }
}

impl From<RationalNumber> for f64 {
    fn from(number: RationalNumber) -> Self {
        number.to_f64()
    }
}

impl std::fmt::Display for RationalNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}e{}", self.value, self.exponent)
    }
}

/// Encode a physical value into its `(exponent, mantissa)` pair
pub fn encode(value: f64) -> Result<(i8, i16), RationalError> {
    let number = RationalNumber::from_f64(value)?;
    Ok((number.exponent, number.value))
}

/// Decode an `(exponent, mantissa)` pair
pub fn decode(exponent: i8, mantissa: i16) -> f64 {
    let power = 10f64.powi(i32::from(exponent.unsigned_abs()));
    if exponent < 0 {
        f64::from(mantissa) / power
    } else {
        f64::from(mantissa) * power
    }
}

/// Encode an optional protocol field
pub fn encode_opt(value: Option<f64>) -> Result<Option<RationalNumber>, RationalError> {
    value.map(RationalNumber::from_f64).transpose()
}

/// Decode an optional protocol field
pub fn decode_opt(number: Option<RationalNumber>) -> Option<f64> {
    number.map(RationalNumber::to_f64)
}

/// `value × 10^-exponent`, dividing for positive exponents to stay exact
fn scale(value: f64, exponent: i8) -> f64 {
    let power = 10f64.powi(i32::from(exponent.unsigned_abs()));
    if exponent <= 0 {
        value * power
    } else {
        value / power
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_vectors() {
        let cases: &[(f64, i8, i16)] = &[
            (-6340.0, 0, -6340),
            (-634.0, -1, -6340),
            (-234.0, -2, -23400),
            (-0.634, -3, -634),
            (-0.0634, -3, -63),
            (-0.00634, -3, -6),
            (-0.000634, -3, 0),
            (-0.0000634, -3, 0),
            (0.0, 0, 0),
            (0.0000234, -3, 0),
            (0.000234, -3, 0),
            (0.00234, -3, 2),
            (0.0234, -3, 23),
            (0.234, -3, 234),
            (2.34, -3, 2340),
            (23.4, -3, 23400),
            (234.0, -2, 23400),
            (2340.0, -1, 23400),
            (23400.0, 0, 23400),
            (234000.0, 1, 23400),
            (0.4, -3, 400),
            (400.0, -1, 4000),
            (32767.0, 0, 32767),
            (32768.0, 1, 3276),
        ];

        for &(input, exponent, value) in cases {
            assert_eq!(
                encode(input).unwrap(),
                (exponent, value),
                "encoding {}",
                input
            );
        }
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(RationalNumber::from_f64(-0.0).unwrap(), RationalNumber::ZERO);
    }

    #[test]
    fn test_out_of_range_fails() {
        assert_eq!(
            RationalNumber::from_f64(32_768_000.0),
            Err(RationalError::OutOfRange(32_768_000.0))
        );
        assert!(RationalNumber::from_f64(-40_000_000.0).is_err());
        assert!(RationalNumber::from_f64(32_767_000.0).is_ok());
    }

    #[test]
    fn test_non_finite_fails() {
        assert!(matches!(
            RationalNumber::from_f64(f64::NAN),
            Err(RationalError::NotFinite(_))
        ));
        assert!(RationalNumber::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode(2, 300), 30000.0);
        assert_eq!(decode(-2, 10000), 100.0);
        assert_eq!(decode(3, 1), 1000.0);
        assert_eq!(decode(-3, -634), -0.634);
        assert_eq!(RationalNumber::new(0, 11).unwrap().to_f64(), 11.0);
    }

    #[test]
    fn test_new_rejects_exponent() {
        assert_eq!(
            RationalNumber::new(4, 1),
            Err(RationalError::InvalidExponent(4))
        );
        assert!(RationalNumber::new(-3, i16::MIN).is_ok());
    }

    #[test]
    fn test_deserialize_checks_exponent() {
        let number: RationalNumber = serde_json::from_str(r#"{"exponent":-2,"value":30000}"#).unwrap();
        assert_eq!(number, RationalNumber { exponent: -2, value: 30000 });

        let err = serde_json::from_str::<RationalNumber>(r#"{"exponent":100,"value":1}"#).unwrap_err();
        assert!(err.to_string().contains("exponent 100"));
    }

    #[test]
    fn test_optional_fields() {
        assert_eq!(encode_opt(None).unwrap(), None);
        assert_eq!(
            encode_opt(Some(100.0)).unwrap(),
            Some(RationalNumber { exponent: -2, value: 10000 })
        );
        assert_eq!(decode_opt(Some(RationalNumber { exponent: 2, value: 300 })), Some(30000.0));
    }
}
