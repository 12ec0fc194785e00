//! Top-level pipeline executor: applies a bound [`Pipeline`] to a
//! [`Product`]. Bind-time errors never reach this module — they abort
//! in `harp_dsl::compile` before a product is touched. Runtime errors
//! here abort mid-pipeline leaving the product in its pre-operation
//! state: every operation runs against a clone, and the clone is only
//! written back over the caller's product once the whole pipeline
//! succeeds.

use crate::{collocate, derive, filter, reshape, spatial};
use harp_core::error::{HarpError, Result};
use harp_core::product::Product;
use harp_core::scalar::Scalar;
use harp_dsl::{BitMaskMode, BoundArgument, BoundOperation, Literal, Pipeline};
use tracing::debug;

pub fn execute(pipeline: &Pipeline, product: &mut Product) -> Result<()> {
    let mut staged = product.clone();

    for (operation, source) in pipeline.operations.iter().zip(&pipeline.sources) {
        apply(operation, &mut staged)?;
        staged.history_append(source);
        debug!(operation = %source, "applied pipeline operation");
    }

    *product = staged;
    Ok(())
}

fn apply(operation: &BoundOperation, product: &mut Product) -> Result<()> {
    match operation {
        BoundOperation::Compare { variable, comparator, literal } => filter::compare(product, variable, *comparator, literal),
        BoundOperation::In { variable, negate, literals } => filter::in_set(product, variable, *negate, literals),
        BoundOperation::BitMask { variable, mode, mask } => {
            filter::bit_mask(product, variable, matches!(mode, BitMaskMode::Any), *mask)
        }
        BoundOperation::Call { name, arguments } => apply_call(name, arguments, product),
    }
}

fn apply_call(name: &str, arguments: &[BoundArgument], product: &mut Product) -> Result<()> {
    match name {
        "keep" => keep(product, arguments),
        "exclude" => exclude(product, arguments),
        "rename" => rename(product, arguments),
        "set" => set(product, arguments),
        "derive" => derive::derive(product, single_name(arguments, "derive")?),
        "valid" => filter::valid(product, arguments),
        "longitude_range" => {
            let (min, max) = two_numbers(arguments, "longitude_range")?;
            filter::longitude_range(product, min, max)
        }
        "point_distance" => {
            let reference = single_str(arguments, 0, "point_distance")?;
            let max_distance = number_argument(arguments, 1, "point_distance")?;
            spatial::point_distance(product, reference, max_distance)
        }
        "point_in_area" => spatial::point_in_area(product, single_str(arguments, 0, "point_in_area")?),
        "area_covers_point" => spatial::area_covers_point(product, single_str(arguments, 0, "area_covers_point")?),
        "area_covers_area" => spatial::area_covers_area(product, single_str(arguments, 0, "area_covers_area")?),
        "area_inside_area" => spatial::area_inside_area(product, single_str(arguments, 0, "area_inside_area")?),
        "area_intersects_area" => spatial::area_intersects_area(product, single_str(arguments, 0, "area_intersects_area")?),
        "area_mask_covers_area" => {
            let path = single_str(arguments, 0, "area_mask_covers_area")?;
            let min_fraction = number_argument(arguments, 1, "area_mask_covers_area")?;
            spatial::area_mask_covers_area(product, path, min_fraction)
        }
        "regrid" => reshape::regrid(product, arguments),
        "bin" => reshape::bin(product, arguments),
        "smooth" => reshape::smooth(product, arguments),
        "sort" => reshape::sort(product, arguments),
        "squash" => reshape::squash(product, arguments),
        "flatten" => reshape::flatten(product, arguments),
        "collocate_left" => collocate::collocate_left(product, arguments),
        "collocate_right" => collocate::collocate_right(product, arguments),
        other => Err(HarpError::operation(format!("'{other}' is not a known operation"))),
    }
}

fn keep(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let requested = variable_names(arguments, "keep")?;
    let to_remove: Vec<String> = product
        .variables()
        .iter()
        .map(|v| v.name.to_string())
        .filter(|name| !requested.contains(name))
        .collect();
    for name in to_remove {
        product.remove_variable(&name)?;
    }
    Ok(())
}

fn exclude(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    for name in variable_names(arguments, "exclude")? {
        product.remove_variable(&name)?;
    }
    Ok(())
}

fn rename(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let names = variable_names(arguments, "rename")?;
    match names.as_slice() {
        [old, new] => product.rename_variable(old, new),
        _ => Err(HarpError::operation("'rename' expects exactly two variable names")),
    }
}

fn set(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let (name, literal) = match arguments {
        [BoundArgument::Variable(v), BoundArgument::Literal(l)] => (&v.name, l),
        _ => return Err(HarpError::operation("'set' expects a variable name and a literal value")),
    };
    let value = match literal {
        Literal::Number(n) | Literal::Quantity(n, _) => Scalar::F64(*n),
        Literal::Str(s) => Scalar::Str(Some(std::sync::Arc::from(s.as_str()))),
    };

    let variable = product.get_mut(name).ok_or_else(|| HarpError::variable_not_found(name.clone()))?;
    let n = variable.data().len();
    for i in 0..n {
        let cast = value.clone().convert_to(variable.element_type())?;
        variable.data_mut().set(i, cast)?;
    }
    Ok(())
}

fn variable_names(arguments: &[BoundArgument], function: &str) -> Result<Vec<String>> {
    arguments
        .iter()
        .map(|a| match a {
            BoundArgument::Variable(v) => Ok(v.name.clone()),
            _ => Err(HarpError::operation(format!("'{function}' expects variable name arguments"))),
        })
        .collect()
}

fn single_name<'a>(arguments: &'a [BoundArgument], function: &str) -> Result<&'a str> {
    match arguments {
        [BoundArgument::Variable(v)] => Ok(v.name.as_str()),
        _ => Err(HarpError::operation(format!("'{function}' expects a single variable name argument"))),
    }
}

fn single_str<'a>(arguments: &'a [BoundArgument], index: usize, function: &str) -> Result<&'a str> {
    match arguments.get(index) {
        Some(BoundArgument::Literal(Literal::Str(s))) => Ok(s.as_str()),
        _ => Err(HarpError::operation(format!("'{function}' expects a string literal argument"))),
    }
}

fn number_argument(arguments: &[BoundArgument], index: usize, function: &str) -> Result<f64> {
    match arguments.get(index) {
        Some(BoundArgument::Literal(Literal::Number(n))) => Ok(*n),
        Some(BoundArgument::Literal(Literal::Quantity(n, _))) => Ok(*n),
        _ => Err(HarpError::operation(format!("'{function}' expects a numeric argument"))),
    }
}

fn two_numbers(arguments: &[BoundArgument], function: &str) -> Result<(f64, f64)> {
    Ok((number_argument(arguments, 0, function)?, number_argument(arguments, 1, function)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::array::TypedArray;
    use harp_core::dimension::DimensionKind;
    use harp_core::scalar::ElementType;
    use harp_core::variable::Variable;
    use harp_dsl::compile;

    fn sample_product() -> Product {
        let mut p = Product::new();
        let mut pressure = Variable::new("pressure", ElementType::F64, vec![DimensionKind::Time], vec![3]).unwrap();
        pressure.set_unit("hPa").unwrap();
        if let TypedArray::F64(buf) = pressure.data_mut() {
            *buf = vec![50.0, 150.0, 250.0];
        }
        p.add_variable(pressure).unwrap();

        let mut flag = Variable::new("flag", ElementType::I32, vec![DimensionKind::Time], vec![3]).unwrap();
        if let TypedArray::I32(buf) = flag.data_mut() {
            *buf = vec![0, 1, 0];
        }
        p.add_variable(flag).unwrap();
        p
    }

    #[test]
    fn execute_commits_successful_pipeline() {
        let mut p = sample_product();
        let pipeline = compile("pressure >= 100[hPa]").unwrap();
        execute(&pipeline, &mut p).unwrap();
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), 2);
        assert!(p.history().contains("pressure >= 100[hPa]"));
    }

    #[test]
    fn execute_leaves_product_untouched_on_runtime_error() {
        let mut p = sample_product();
        let pipeline = compile("missing_variable >= 1").unwrap();
        let original_len = p.dimension_length(DimensionKind::Time).unwrap();
        let err = execute(&pipeline, &mut p);
        assert!(err.is_err());
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), original_len);
        assert!(p.history().is_empty());
    }

    #[test]
    fn keep_is_idempotent() {
        let mut p = sample_product();
        let pipeline = compile("keep(pressure)").unwrap();
        execute(&pipeline, &mut p).unwrap();
        assert!(p.contains("pressure"));
        assert!(!p.contains("flag"));

        execute(&pipeline, &mut p).unwrap();
        assert!(p.contains("pressure"));
        assert_eq!(p.variables().len(), 1);
    }
}
