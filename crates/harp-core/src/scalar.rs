//! Tagged scalar values over the closed set of element types.

use crate::error::{HarpError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::Display;

/// The closed set of element types every scalar and array carries a tag for.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    I8,
    I16,
    I32,
    F32,
    F64,
    Str,
}

impl ElementType {
    pub fn is_numeric(self) -> bool {
        !matches!(self, ElementType::Str)
    }

    pub fn is_float(self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }

    /// Size in bytes of one element, used by the array layer's typed
    /// fast paths. `Str` has no fixed size (it owns a `String`).
    pub fn byte_size(self) -> Option<usize> {
        match self {
            ElementType::I8 => Some(1),
            ElementType::I16 => Some(2),
            ElementType::I32 | ElementType::F32 => Some(4),
            ElementType::F64 => Some(8),
            ElementType::Str => None,
        }
    }
}

/// A discriminated union over the element types: a true sum type, not
/// a single struct with one pointer per type.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    I8(i8),
    I16(i16),
    I32(i32),
    F32(f32),
    F64(f64),
    Str(Option<Arc<str>>),
}

impl Scalar {
    pub fn element_type(&self) -> ElementType {
        match self {
            Scalar::I8(_) => ElementType::I8,
            Scalar::I16(_) => ElementType::I16,
            Scalar::I32(_) => ElementType::I32,
            Scalar::F32(_) => ElementType::F32,
            Scalar::F64(_) => ElementType::F64,
            Scalar::Str(_) => ElementType::Str,
        }
    }

    /// The canonical fill value for a type: zero for integers, `NaN`
    /// for floats, `None` (null) for strings.
    pub fn fill(element_type: ElementType) -> Scalar {
        match element_type {
            ElementType::I8 => Scalar::I8(0),
            ElementType::I16 => Scalar::I16(0),
            ElementType::I32 => Scalar::I32(0),
            ElementType::F32 => Scalar::F32(f32::NAN),
            ElementType::F64 => Scalar::F64(f64::NAN),
            ElementType::Str => Scalar::Str(None),
        }
    }

    /// `true` if this scalar equals the canonical fill value of its type.
    /// Float comparison is bitwise-NaN aware (any NaN is a fill, matching
    /// the ingestion convention that "missing" floats are never a signaling
    /// vs. quiet distinction).
    pub fn is_fill(&self) -> bool {
        match self {
            Scalar::I8(v) => *v == 0,
            Scalar::I16(v) => *v == 0,
            Scalar::I32(v) => *v == 0,
            Scalar::F32(v) => v.is_nan(),
            Scalar::F64(v) => v.is_nan(),
            Scalar::Str(v) => v.is_none(),
        }
    }

    /// The canonical valid-min/valid-max for a type: type extrema for
    /// integers, `(-inf, inf)` for floats. `Str` has none.
    pub fn canonical_valid_range(element_type: ElementType) -> Option<(Scalar, Scalar)> {
        match element_type {
            ElementType::I8 => Some((Scalar::I8(i8::MIN), Scalar::I8(i8::MAX))),
            ElementType::I16 => Some((Scalar::I16(i16::MIN), Scalar::I16(i16::MAX))),
            ElementType::I32 => Some((Scalar::I32(i32::MIN), Scalar::I32(i32::MAX))),
            ElementType::F32 => Some((Scalar::F32(f32::NEG_INFINITY), Scalar::F32(f32::INFINITY))),
            ElementType::F64 => Some((Scalar::F64(f64::NEG_INFINITY), Scalar::F64(f64::INFINITY))),
            ElementType::Str => None,
        }
    }

    /// Value as `f64`, for numeric types only.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Scalar::I8(v) => Ok(*v as f64),
            Scalar::I16(v) => Ok(*v as f64),
            Scalar::I32(v) => Ok(*v as f64),
            Scalar::F32(v) => Ok(*v as f64),
            Scalar::F64(v) => Ok(*v),
            Scalar::Str(_) => Err(HarpError::invalid_argument(
                "string scalar is not numerically convertible",
            )),
        }
    }

    /// Range-checked conversion to another element type. `Str` is not
    /// numerically convertible in either direction. `NaN` in a float
    /// source produces the target's canonical fill value, not an error.
    pub fn convert_to(&self, target: ElementType) -> Result<Scalar> {
        if self.element_type() == target {
            return Ok(self.clone());
        }
        if matches!(self, Scalar::Str(_)) || target == ElementType::Str {
            return Err(HarpError::invalid_argument(
                "string scalars cannot be numerically converted",
            ));
        }

        if let Scalar::F32(v) = self {
            if v.is_nan() {
                return Ok(Scalar::fill(target));
            }
        }
        if let Scalar::F64(v) = self {
            if v.is_nan() {
                return Ok(Scalar::fill(target));
            }
        }

        let value = self.as_f64()?;
        match target {
            ElementType::I8 => checked_int(value, i8::MIN as f64, i8::MAX as f64).map(|v| Scalar::I8(v as i8)),
            ElementType::I16 => {
                checked_int(value, i16::MIN as f64, i16::MAX as f64).map(|v| Scalar::I16(v as i16))
            }
            ElementType::I32 => {
                checked_int(value, i32::MIN as f64, i32::MAX as f64).map(|v| Scalar::I32(v as i32))
            }
            ElementType::F32 => Ok(Scalar::F32(value as f32)),
            ElementType::F64 => Ok(Scalar::F64(value)),
            ElementType::Str => unreachable!("handled above"),
        }
    }
}

fn checked_int(value: f64, min: f64, max: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(HarpError::invalid_argument(format!(
            "cannot convert non-finite value {value} to an integer type"
        )));
    }
    let rounded = value.round();
    if rounded < min || rounded > max {
        return Err(HarpError::invalid_argument(format!(
            "value {value} out of range for target integer type"
        )));
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_values_are_canonical() {
        assert_eq!(Scalar::fill(ElementType::I32), Scalar::I32(0));
        assert!(matches!(Scalar::fill(ElementType::F64), Scalar::F64(v) if v.is_nan()));
        assert_eq!(Scalar::fill(ElementType::Str), Scalar::Str(None));
    }

    #[test]
    fn nan_converts_to_target_fill() {
        let nan = Scalar::F64(f64::NAN);
        let converted = nan.convert_to(ElementType::I32).unwrap();
        assert_eq!(converted, Scalar::I32(0));
    }

    #[test]
    fn out_of_range_conversion_errors() {
        let big = Scalar::F64(1e10);
        assert!(big.convert_to(ElementType::I8).is_err());
    }

    #[test]
    fn string_scalar_does_not_convert() {
        let s = Scalar::Str(Some(Arc::from("x")));
        assert!(s.convert_to(ElementType::F64).is_err());
    }
}
