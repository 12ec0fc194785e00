//! Table-driven derivation registry: `derive(name)` looks up a rule by
//! output variable name, checks its declared inputs are present, and
//! runs its conversion function.

use harp_core::array::TypedArray;
use harp_core::dimension::DimensionKind;
use harp_core::error::{HarpError, Result};
use harp_core::product::Product;
use harp_core::scalar::ElementType;
use harp_core::unit::{UcumSubset, UnitConverter};
use harp_core::variable::Variable;

pub struct DerivationRule {
    pub output_name: &'static str,
    pub inputs: &'static [&'static str],
    pub convert: fn(&Product) -> Result<Variable>,
}

pub static REGISTRY: &[DerivationRule] = &[
    DerivationRule {
        output_name: "pressure_pa",
        inputs: &["pressure"],
        convert: derive_pressure_pa,
    },
    DerivationRule {
        output_name: "cos_solar_zenith_angle",
        inputs: &["solar_zenith_angle"],
        convert: derive_cos_solar_zenith_angle,
    },
];

pub fn derive(product: &mut Product, name: &str) -> Result<()> {
    let rule = REGISTRY
        .iter()
        .find(|rule| rule.output_name == name)
        .ok_or_else(|| HarpError::operation(format!("no derivation rule produces '{name}'")))?;

    for input in rule.inputs {
        if !product.contains(input) {
            return Err(HarpError::operation(format!(
                "cannot derive '{name}': missing required input '{input}'"
            )));
        }
    }

    let variable = (rule.convert)(product)?;
    product.add_variable(variable)
}

fn derive_pressure_pa(product: &Product) -> Result<Variable> {
    let pressure = product.get("pressure").expect("checked by derive()");
    let unit = pressure
        .unit
        .clone()
        .ok_or_else(|| HarpError::unit_conversion("'pressure' has no unit to derive 'pressure_pa' from"))?;
    let conv = UcumSubset.factor_offset(&unit, "Pa")?;

    let n = pressure.data().len();
    let mut out = TypedArray::construct(ElementType::F64, &[n]);
    for i in 0..n {
        let value = pressure.data().get(i).expect("index in range").as_f64()?;
        out.set(i, harp_core::scalar::Scalar::F64(conv.apply(value)))
            .expect("matching element type");
    }

    let mut variable = Variable::from_data(
        "pressure_pa",
        pressure.dimension_kinds().to_vec(),
        pressure.dimension_lengths().to_vec(),
        out,
    )?;
    variable.set_unit("Pa")?;
    Ok(variable)
}

fn derive_cos_solar_zenith_angle(product: &Product) -> Result<Variable> {
    let sza = product.get("solar_zenith_angle").expect("checked by derive()");
    let unit = sza.unit.clone().unwrap_or_else(|| "degree".into());
    let conv = UcumSubset.factor_offset(&unit, "radian")?;

    let n = sza.data().len();
    let mut out = TypedArray::construct(ElementType::F64, &[n]);
    for i in 0..n {
        let value = sza.data().get(i).expect("index in range").as_f64()?;
        out.set(i, harp_core::scalar::Scalar::F64(conv.apply(value).cos()))
            .expect("matching element type");
    }

    let mut variable = Variable::from_data(
        "cos_solar_zenith_angle",
        sza.dimension_kinds().to_vec(),
        sza.dimension_lengths().to_vec(),
        out,
    )?;
    variable.set_unit("1")?;
    Ok(variable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::scalar::ElementType as ET;

    #[test]
    fn derives_pressure_in_pascals() {
        let mut p = Product::new();
        let mut v = Variable::new("pressure", ET::F64, vec![DimensionKind::Time], vec![1]).unwrap();
        v.set_unit("hPa").unwrap();
        if let TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![1013.25];
        }
        p.add_variable(v).unwrap();

        derive(&mut p, "pressure_pa").unwrap();
        let out = p.get("pressure_pa").unwrap();
        assert!(matches!(out.data(), TypedArray::F64(b) if (b[0] - 101325.0).abs() < 1e-6));
    }

    #[test]
    fn rejects_missing_input() {
        let mut p = Product::new();
        assert!(derive(&mut p, "pressure_pa").is_err());
    }

    #[test]
    fn rejects_unknown_output_name() {
        let mut p = Product::new();
        assert!(derive(&mut p, "bogus").is_err());
    }
}
