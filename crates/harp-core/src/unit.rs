//! Unit parsing and conversion.
//!
//! `UnitConverter` is the interface to an external units library;
//! `UcumSubset` is a small built-in backend covering the unit families
//! this workspace's derivation registry and test vectors need. A
//! fuller UCUM backend can replace it later without touching any
//! caller.

use crate::error::{HarpError, Result};
use std::sync::Arc;

/// A parsed unit string, kept as-is (UCUM-style), e.g. `"hPa"`, `"degree"`.
pub type Unit = Arc<str>;

/// `value_target = value_source * factor + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConversion {
    pub factor: f64,
    pub offset: f64,
}

impl UnitConversion {
    pub const IDENTITY: UnitConversion = UnitConversion {
        factor: 1.0,
        offset: 0.0,
    };

    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    pub fn is_integral(&self) -> bool {
        self.offset == 0.0 && self.factor.fract() == 0.0
    }
}

/// The contract every unit backend must satisfy.
pub trait UnitConverter {
    fn factor_offset(&self, from: &str, to: &str) -> Result<UnitConversion>;
}

/// Built-in UCUM-subset backend: pressure, angle, temperature, length,
/// and dimensionless/percent families.
#[derive(Debug, Default, Clone, Copy)]
pub struct UcumSubset;

impl UnitConverter for UcumSubset {
    fn factor_offset(&self, from: &str, to: &str) -> Result<UnitConversion> {
        let from = from.trim();
        let to = to.trim();
        if from == to {
            return Ok(UnitConversion::IDENTITY);
        }

        let from_si = to_si(from)?;
        let to_si_conv = to_si(to)?;
        if from_si.family != to_si_conv.family {
            return Err(HarpError::unit_conversion(format!(
                "cannot convert '{from}' to '{to}': incompatible unit families"
            )));
        }

        // value_si = value_from * from.factor + from.offset
        // value_to = (value_si - to.offset) / to.factor
        let factor = from_si.factor / to_si_conv.factor;
        let offset = (from_si.offset - to_si_conv.offset) / to_si_conv.factor;
        Ok(UnitConversion { factor, offset })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Pressure,
    Angle,
    Temperature,
    Length,
    Dimensionless,
}

struct SiConversion {
    family: Family,
    factor: f64,
    offset: f64,
}

fn to_si(unit: &str) -> Result<SiConversion> {
    Ok(match unit {
        "Pa" => SiConversion {
            family: Family::Pressure,
            factor: 1.0,
            offset: 0.0,
        },
        "hPa" | "mbar" => SiConversion {
            family: Family::Pressure,
            factor: 100.0,
            offset: 0.0,
        },
        "bar" => SiConversion {
            family: Family::Pressure,
            factor: 100_000.0,
            offset: 0.0,
        },
        "atm" => SiConversion {
            family: Family::Pressure,
            factor: 101_325.0,
            offset: 0.0,
        },
        "degree" | "deg" | "degrees" => SiConversion {
            family: Family::Angle,
            factor: std::f64::consts::PI / 180.0,
            offset: 0.0,
        },
        "radian" | "rad" => SiConversion {
            family: Family::Angle,
            factor: 1.0,
            offset: 0.0,
        },
        "K" => SiConversion {
            family: Family::Temperature,
            factor: 1.0,
            offset: 0.0,
        },
        "degC" | "celsius" => SiConversion {
            family: Family::Temperature,
            factor: 1.0,
            offset: 273.15,
        },
        "m" => SiConversion {
            family: Family::Length,
            factor: 1.0,
            offset: 0.0,
        },
        "km" => SiConversion {
            family: Family::Length,
            factor: 1000.0,
            offset: 0.0,
        },
        "1" => SiConversion {
            family: Family::Dimensionless,
            factor: 1.0,
            offset: 0.0,
        },
        "%" => SiConversion {
            family: Family::Dimensionless,
            factor: 0.01,
            offset: 0.0,
        },
        other => {
            return Err(HarpError::unit_conversion(format!("unknown unit '{other}'")));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hpa_to_pa_matches_scenario_2() {
        let conv = UcumSubset.factor_offset("hPa", "Pa").unwrap();
        assert!((conv.apply(1013.25) - 101325.0).abs() < 1e-6);
    }

    #[test]
    fn degree_to_radian() {
        let conv = UcumSubset.factor_offset("degree", "radian").unwrap();
        assert!((conv.apply(180.0) - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn incompatible_families_error() {
        assert!(UcumSubset.factor_offset("Pa", "degree").is_err());
    }

    #[test]
    fn identity_for_same_unit() {
        let conv = UcumSubset.factor_offset("hPa", "hPa").unwrap();
        assert_eq!(conv, UnitConversion::IDENTITY);
    }
}
