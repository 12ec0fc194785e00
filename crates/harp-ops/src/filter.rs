//! Row-wise predicate filters: comparisons, `in`/`!in`, bit masks, and
//! the `valid`/`longitude_range` function-call filters. Every filter
//! here reduces to computing a set of surviving row indices along the
//! `time` dimension and handing it to [`Product::filter_rows`].

use harp_core::dimension::DimensionKind;
use harp_core::error::{HarpError, Result};
use harp_core::product::Product;
use harp_core::scalar::Scalar;
use harp_core::unit::{UcumSubset, UnitConverter};
use harp_dsl::{BoundArgument, Comparator, Literal, VariableRef};

pub fn compare(product: &mut Product, variable: &VariableRef, comparator: Comparator, literal: &Literal) -> Result<()> {
    apply_row_predicate(product, &variable.name, |value, unit| {
        compare_scalar(&value, comparator, literal, unit)
    })
}

pub fn in_set(product: &mut Product, variable: &VariableRef, negate: bool, literals: &[Literal]) -> Result<()> {
    apply_row_predicate(product, &variable.name, |value, unit| {
        let mut hit = false;
        for literal in literals {
            if compare_scalar(&value, Comparator::Eq, literal, unit)? {
                hit = true;
                break;
            }
        }
        Ok(hit != negate)
    })
}

pub fn bit_mask(product: &mut Product, variable: &VariableRef, any: bool, mask: i64) -> Result<()> {
    apply_row_predicate(product, &variable.name, |value, _unit| {
        let code = match value {
            Scalar::I8(v) => v as i64,
            Scalar::I16(v) => v as i64,
            Scalar::I32(v) => v as i64,
            other => {
                return Err(HarpError::invalid_argument(format!(
                    "bit-mask predicates require an integer variable, found {:?}",
                    other.element_type()
                )));
            }
        };
        let hit = code & mask != 0;
        Ok(if any { hit } else { !hit })
    })
}

/// `valid(var)`: keeps rows whose value is inside the variable's own
/// `valid_min..=valid_max`, falling back to "not the type's fill value"
/// when no explicit valid range was set.
pub fn valid(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let name = single_variable_name(arguments, "valid")?;
    let (min, max) = {
        let variable = product
            .get(&name)
            .ok_or_else(|| HarpError::variable_not_found(name.clone()))?;
        (variable.valid_min().cloned(), variable.valid_max().cloned())
    };

    apply_row_predicate(product, &name, |value, _unit| match (&min, &max) {
        (Some(min), Some(max)) => {
            let v = value.as_f64()?;
            Ok(v >= min.as_f64()? && v <= max.as_f64()?)
        }
        _ => Ok(!value.is_fill()),
    })
}

/// `longitude_range(min, max)`: keeps rows whose `longitude` variable
/// (degrees) falls within `[min, max]`, wrapping across the antimeridian
/// when `min > max`.
pub fn longitude_range(product: &mut Product, min: f64, max: f64) -> Result<()> {
    let normalize = |d: f64| d.rem_euclid(360.0);
    let (min, max) = (normalize(min), normalize(max));

    apply_row_predicate(product, "longitude", |value, _unit| {
        let lon = normalize(value.as_f64()?);
        Ok(if min <= max {
            lon >= min && lon <= max
        } else {
            lon >= min || lon <= max
        })
    })
}

fn single_variable_name(arguments: &[BoundArgument], function: &str) -> Result<String> {
    match arguments {
        [BoundArgument::Variable(v)] => Ok(v.name.clone()),
        _ => Err(HarpError::operation(format!(
            "'{function}' expects a single variable name argument"
        ))),
    }
}

fn compare_scalar(value: &Scalar, comparator: Comparator, literal: &Literal, unit: Option<&str>) -> Result<bool> {
    if let (Scalar::Str(s), Literal::Str(lit)) = (value, literal) {
        let matches = s.as_deref() == Some(lit.as_str());
        return match comparator {
            Comparator::Eq => Ok(matches),
            Comparator::Ne => Ok(!matches),
            _ => Err(HarpError::invalid_argument(
                "only '==' and '!=' are supported for string comparisons",
            )),
        };
    }

    let value_f = value.as_f64()?;
    let literal_f = match literal {
        Literal::Number(n) => *n,
        Literal::Quantity(n, literal_unit) => {
            let variable_unit = unit.ok_or_else(|| {
                HarpError::unit_conversion("cannot compare a unit-bearing literal against a unitless variable")
            })?;
            UcumSubset.factor_offset(literal_unit, variable_unit)?.apply(*n)
        }
        Literal::Str(_) => {
            return Err(HarpError::invalid_argument(
                "cannot compare a string literal to a numeric variable",
            ));
        }
    };

    Ok(match comparator {
        Comparator::Eq => value_f == literal_f,
        Comparator::Ne => value_f != literal_f,
        Comparator::Lt => value_f < literal_f,
        Comparator::Le => value_f <= literal_f,
        Comparator::Gt => value_f > literal_f,
        Comparator::Ge => value_f >= literal_f,
    })
}

fn apply_row_predicate(
    product: &mut Product,
    variable_name: &str,
    predicate: impl Fn(Scalar, Option<&str>) -> Result<bool>,
) -> Result<()> {
    let variable = product
        .get(variable_name)
        .ok_or_else(|| HarpError::variable_not_found(variable_name))?;
    let unit = variable.unit.clone();

    if variable.rank() == 0 {
        let value = variable.data().get(0).expect("0-D variable holds one element");
        let keep = predicate(value, unit.as_deref())?;
        let time_len = product.dimension_length(DimensionKind::Time).unwrap_or(0);
        let indices: Vec<usize> = if keep { (0..time_len).collect() } else { Vec::new() };
        return product.filter_rows(DimensionKind::Time, &indices);
    }

    if variable.outermost_kind() != Some(DimensionKind::Time) {
        return Err(HarpError::invalid_argument(format!(
            "row-wise filters apply to the time dimension; '{variable_name}' has outermost dimension {:?}",
            variable.outermost_kind()
        )));
    }

    let outer_len = variable.dimension_lengths()[0];
    let inner: usize = variable.dimension_lengths()[1..].iter().product::<usize>().max(1);

    let mut indices = Vec::with_capacity(outer_len);
    for row in 0..outer_len {
        let value = variable
            .data()
            .get(row * inner)
            .expect("row start index in range");
        if predicate(value, unit.as_deref())? {
            indices.push(row);
        }
    }
    product.filter_rows(DimensionKind::Time, &indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::scalar::ElementType;
    use harp_core::variable::Variable;

    fn product_with_pressure(values: &[f64]) -> Product {
        let mut p = Product::new();
        let mut v = Variable::new(
            "pressure",
            ElementType::F64,
            vec![DimensionKind::Time],
            vec![values.len()],
        )
        .unwrap();
        v.set_unit("hPa").unwrap();
        if let harp_core::array::TypedArray::F64(buf) = v.data_mut() {
            *buf = values.to_vec();
        }
        p.add_variable(v).unwrap();
        p
    }

    #[test]
    fn compare_filters_rows_by_threshold() {
        let mut p = product_with_pressure(&[50.0, 150.0, 250.0]);
        let var = VariableRef { name: "pressure".into(), dimensions: vec![] };
        compare(&mut p, &var, Comparator::Ge, &Literal::Quantity(100.0, "hPa".into())).unwrap();
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), 2);
    }

    #[test]
    fn longitude_range_wraps_across_antimeridian() {
        let mut p = Product::new();
        let mut v = Variable::new("longitude", ElementType::F64, vec![DimensionKind::Time], vec![3]).unwrap();
        if let harp_core::array::TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![170.0, 0.0, -170.0];
        }
        p.add_variable(v).unwrap();
        longitude_range(&mut p, 160.0, -160.0).unwrap();
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), 2);
    }

    #[test]
    fn bit_mask_any_keeps_rows_with_a_set_bit() {
        let mut p = Product::new();
        let mut v = Variable::new("flags", ElementType::I32, vec![DimensionKind::Time], vec![3]).unwrap();
        if let harp_core::array::TypedArray::I32(buf) = v.data_mut() {
            *buf = vec![0, 4, 5];
        }
        p.add_variable(v).unwrap();
        let var = VariableRef { name: "flags".into(), dimensions: vec![] };
        bit_mask(&mut p, &var, true, 4).unwrap();
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), 2);
    }
}
