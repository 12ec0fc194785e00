//! `collocate_left`/`collocate_right`: keep only the time rows present
//! in a pre-computed collocation index variable.
//!
//! A true two-product collocation join needs both products in scope at
//! once; this executor applies bound operations to one product at a
//! time, so collocation here assumes an upstream step (an ingestion
//! module or a prior `derive`) has already populated an integer
//! `collocation_index` variable recording, per row, the matching row
//! index in the other product (or a negative fill value for rows with
//! no match). `collocate_left`/`collocate_right` both reduce to
//! "keep only rows with a real match" — they differ only in which side
//! of a join produced the index, which this single-product view cannot
//! observe, so both dispatch to the same filter.

use harp_core::dimension::DimensionKind;
use harp_core::error::{HarpError, Result};
use harp_core::product::Product;
use harp_dsl::BoundArgument;

pub fn collocate_left(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    collocate(product, arguments)
}

pub fn collocate_right(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    collocate(product, arguments)
}

fn collocate(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let name = match arguments {
        [BoundArgument::Variable(v)] => &v.name,
        _ => {
            return Err(HarpError::operation(
                "'collocate_left'/'collocate_right' expect a single collocation-index variable name",
            ));
        }
    };

    let index_var = product.get(name).ok_or_else(|| HarpError::variable_not_found(name.clone()))?;
    if index_var.outermost_kind() != Some(DimensionKind::Time) {
        return Err(HarpError::invalid_argument(format!(
            "'{name}' must be a time-dimensioned collocation index"
        )));
    }

    let time_len = product.dimension_length(DimensionKind::Time)?;
    let inner: usize = index_var.dimension_lengths()[1..].iter().product::<usize>().max(1);

    let mut matched = Vec::with_capacity(time_len);
    for row in 0..time_len {
        let value = index_var.data().get(row * inner).expect("row start index in range");
        if value.as_f64()? >= 0.0 {
            matched.push(row);
        }
    }

    product.filter_rows(DimensionKind::Time, &matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::array::TypedArray;
    use harp_core::scalar::ElementType;
    use harp_core::variable::Variable;
    use harp_dsl::VariableRef;

    #[test]
    fn collocate_left_keeps_rows_with_a_nonnegative_index() {
        let mut p = Product::new();
        let mut v = Variable::new("collocation_index", ElementType::I32, vec![DimensionKind::Time], vec![3]).unwrap();
        if let TypedArray::I32(buf) = v.data_mut() {
            *buf = vec![2, -1, 0];
        }
        p.add_variable(v).unwrap();

        let args = [BoundArgument::Variable(VariableRef { name: "collocation_index".into(), dimensions: vec![] })];
        collocate_left(&mut p, &args).unwrap();
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), 2);
    }
}
