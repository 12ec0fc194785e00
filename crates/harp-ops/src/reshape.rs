//! Per-variable reshaping operations: `sort`, `smooth`, `squash`,
//! `flatten`, `bin`, `regrid`. Row-wise operations (`sort`, `bin`) work
//! at the product level through [`Product::filter_rows`] or direct
//! aggregation; the rest replace one variable's buffer in place.

use harp_core::array::TypedArray;
use harp_core::dimension::DimensionKind;
use harp_core::error::{HarpError, Result};
use harp_core::product::Product;
use harp_core::scalar::Scalar;
use harp_core::variable::Variable;
use harp_dsl::BoundArgument;

/// `sort(var)`: reorder the `time` dimension by ascending value of
/// `var`, a time-dimensioned variable. Ties keep their original
/// relative order.
pub fn sort(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let name = single_variable_name(arguments, "sort")?;
    let time_len = product.dimension_length(DimensionKind::Time)?;
    let keys = row_values(product, &name, time_len)?;

    let mut order: Vec<usize> = (0..time_len).collect();
    order.sort_by(|&a, &b| keys[a].partial_cmp(&keys[b]).unwrap_or(std::cmp::Ordering::Equal));
    product.filter_rows(DimensionKind::Time, &order)
}

/// `smooth(var)`: replace `var`'s values with a centered 3-point moving
/// average along its outermost dimension, edge rows averaging over
/// whatever neighbors exist.
pub fn smooth(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let name = single_variable_name(arguments, "smooth")?;
    let variable = product.get(&name).ok_or_else(|| HarpError::variable_not_found(name.clone()))?;
    if variable.rank() == 0 {
        return Err(HarpError::invalid_argument("smooth requires a variable with at least one dimension"));
    }
    let outer_len = variable.dimension_lengths()[0];
    let inner: usize = variable.dimension_lengths()[1..].iter().product::<usize>().max(1);

    let mut smoothed = vec![0.0f64; outer_len * inner];
    for col in 0..inner {
        for row in 0..outer_len {
            let lo = row.saturating_sub(1);
            let hi = (row + 1).min(outer_len - 1);
            let mut sum = 0.0;
            for r in lo..=hi {
                sum += variable.data().get(r * inner + col).expect("index in range").as_f64()?;
            }
            smoothed[row * inner + col] = sum / (hi - lo + 1) as f64;
        }
    }

    let variable = product.get_mut(&name).ok_or_else(|| HarpError::variable_not_found(name.clone()))?;
    for (i, value) in smoothed.into_iter().enumerate() {
        variable.data_mut().set(i, Scalar::F64(value)).or_else(|_| {
            variable.data_mut().set(i, Scalar::F32(value as f32))
        })?;
    }
    Ok(())
}

/// `squash(dim)`: removes `dim` from every variable that carries it by
/// averaging across it, collapsing a vertical or spectral axis into a
/// single value per remaining row.
pub fn squash(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let kind = single_dimension(arguments, "squash")?;

    let mut replacements = Vec::new();
    for variable in product.variables() {
        let Some(axis) = variable.dimension_kinds().iter().position(|&k| k == kind) else {
            continue;
        };
        replacements.push(squash_axis(variable, axis)?);
    }

    for replacement in replacements {
        let name = replacement.name.clone();
        product.remove_variable(&name)?;
        product.add_variable(replacement)?;
    }
    Ok(())
}

fn squash_axis(variable: &Variable, axis: usize) -> Result<Variable> {
    let dims = variable.dimension_lengths();
    let strides = harp_core::array::row_major_strides(dims);
    let axis_len = dims[axis];
    let outer: usize = dims[..axis].iter().product::<usize>().max(1);
    let inner = strides[axis];

    let axis_stride = axis_len * inner;
    let mut out = vec![0.0f64; outer * inner];
    for o in 0..outer {
        for i in 0..inner {
            let mut sum = 0.0;
            for a in 0..axis_len {
                let flat = o * axis_stride + a * inner + i;
                sum += variable.data().get(flat).expect("index in range").as_f64()?;
            }
            out[o * inner + i] = sum / axis_len as f64;
        }
    }

    let mut new_kinds = variable.dimension_kinds().to_vec();
    let mut new_lengths = variable.dimension_lengths().to_vec();
    new_kinds.remove(axis);
    new_lengths.remove(axis);

    let mut squashed = Variable::from_data(variable.name.clone(), new_kinds, new_lengths, TypedArray::F64(out))?;
    if let Some(unit) = &variable.unit {
        squashed.set_unit(unit.clone())?;
    }
    Ok(squashed)
}

/// `flatten(dim)`: merges `dim` with the axis immediately following it
/// into a single `independent` axis. Pure metadata relabeling: the
/// buffer is already row-major contiguous across adjacent axes, so no
/// data moves.
pub fn flatten(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let kind = single_dimension(arguments, "flatten")?;

    let mut replacements = Vec::new();
    for variable in product.variables() {
        let Some(axis) = variable.dimension_kinds().iter().position(|&k| k == kind) else {
            continue;
        };
        if axis + 1 >= variable.rank() {
            return Err(HarpError::operation(format!(
                "cannot flatten '{}': '{}' has no following dimension to merge with",
                variable.name,
                kind.name()
            )));
        }

        let mut new_kinds = variable.dimension_kinds().to_vec();
        let mut new_lengths = variable.dimension_lengths().to_vec();
        let merged_len = new_lengths[axis] * new_lengths[axis + 1];
        new_kinds.splice(axis..axis + 2, [DimensionKind::Independent]);
        new_lengths.splice(axis..axis + 2, [merged_len]);

        let flattened = Variable::from_data(variable.name.clone(), new_kinds, new_lengths, variable.data().clone())?;
        replacements.push(flattened);
    }

    for replacement in replacements {
        let name = replacement.name.clone();
        product.remove_variable(&name)?;
        product.add_variable(replacement)?;
    }
    Ok(())
}

/// `bin(group_var)`: groups `time` rows by equal value of `group_var`,
/// preserving first-seen group order, and replaces every time-outermost
/// variable with one row per group holding the mean of its members
/// (first value for string variables).
pub fn bin(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let name = single_variable_name(arguments, "bin")?;
    let time_len = product.dimension_length(DimensionKind::Time)?;
    let keys = row_values(product, &name, time_len)?;

    let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
    for (row, &key) in keys.iter().enumerate() {
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, rows)) => rows.push(row),
            None => groups.push((key, vec![row])),
        }
    }

    let mut replacements = Vec::new();
    for variable in product.variables() {
        if variable.outermost_kind() != Some(DimensionKind::Time) {
            continue;
        }
        replacements.push(bin_variable(variable, &groups)?);
    }

    for replacement in replacements {
        let name = replacement.name.clone();
        product.remove_variable(&name)?;
        product.add_variable(replacement)?;
    }
    product.set_dimension_length_forced(DimensionKind::Time, groups.len());
    Ok(())
}

fn bin_variable(variable: &Variable, groups: &[(f64, Vec<usize>)]) -> Result<Variable> {
    let inner: usize = variable.dimension_lengths()[1..].iter().product::<usize>().max(1);
    let is_string = variable.element_type() == harp_core::scalar::ElementType::Str;

    let mut out = if is_string {
        TypedArray::Str(vec![None; groups.len() * inner])
    } else {
        TypedArray::F64(vec![0.0; groups.len() * inner])
    };

    for (g, (_, rows)) in groups.iter().enumerate() {
        for col in 0..inner {
            if is_string {
                let first_row = rows[0];
                let value = variable.data().get(first_row * inner + col).expect("index in range");
                out.set(g * inner + col, value)?;
            } else {
                let mut sum = 0.0;
                for &row in rows {
                    sum += variable.data().get(row * inner + col).expect("index in range").as_f64()?;
                }
                out.set(g * inner + col, Scalar::F64(sum / rows.len() as f64))?;
            }
        }
    }

    let mut new_lengths = variable.dimension_lengths().to_vec();
    new_lengths[0] = groups.len();
    let mut binned = Variable::from_data(variable.name.clone(), variable.dimension_kinds().to_vec(), new_lengths, out)?;
    if let Some(unit) = &variable.unit {
        binned.set_unit(unit.clone())?;
    }
    Ok(binned)
}

/// `regrid(variable, target_grid)`: linearly interpolates `variable`'s
/// profile from the product's `vertical_grid` coordinate onto the
/// values held by `target_grid` (another product variable), per time
/// row.
pub fn regrid(product: &mut Product, arguments: &[BoundArgument]) -> Result<()> {
    let names = two_variable_names(arguments, "regrid")?;
    let (source_name, target_grid_name) = names;

    let source = product.get(&source_name).ok_or_else(|| HarpError::variable_not_found(source_name.clone()))?;
    let source_grid = product
        .get("vertical_grid")
        .ok_or_else(|| HarpError::variable_not_found("vertical_grid"))?;
    let target_grid = product
        .get(&target_grid_name)
        .ok_or_else(|| HarpError::variable_not_found(target_grid_name.clone()))?;

    if source.outermost_kind() != Some(DimensionKind::Time) || source.rank() != 2 {
        return Err(HarpError::invalid_argument("regrid requires a {time, vertical} source variable"));
    }

    let time_len = source.dimension_lengths()[0];
    let old_len = source.dimension_lengths()[1];
    let new_len = target_grid.data().len();
    let source_x: Vec<f64> = (0..old_len)
        .map(|i| source_grid.data().get(i).expect("index in range").as_f64())
        .collect::<Result<Vec<_>>>()?;
    let target_x: Vec<f64> = (0..new_len)
        .map(|i| target_grid.data().get(i).expect("index in range").as_f64())
        .collect::<Result<Vec<_>>>()?;

    let mut out = vec![0.0f64; time_len * new_len];
    for row in 0..time_len {
        let profile: Vec<f64> = (0..old_len)
            .map(|i| source.data().get(row * old_len + i).expect("index in range").as_f64())
            .collect::<Result<Vec<_>>>()?;
        for (j, &x) in target_x.iter().enumerate() {
            out[row * new_len + j] = linear_interpolate(&source_x, &profile, x);
        }
    }

    let mut regridded = Variable::from_data(
        source_name.clone(),
        vec![DimensionKind::Time, DimensionKind::Vertical],
        vec![time_len, new_len],
        TypedArray::F64(out),
    )?;
    if let Some(unit) = &source.unit {
        regridded.set_unit(unit.clone())?;
    }

    product.remove_variable(&source_name)?;
    product.add_variable(regridded)
}

fn linear_interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if xs.len() == 1 {
        return ys[0];
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let i = xs.partition_point(|&v| v <= x).saturating_sub(1).min(xs.len() - 2);
    let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + t * (ys[i + 1] - ys[i])
}

fn row_values(product: &Product, name: &str, time_len: usize) -> Result<Vec<f64>> {
    let variable = product.get(name).ok_or_else(|| HarpError::variable_not_found(name))?;
    let inner: usize = variable.dimension_lengths().get(1..).map(|d| d.iter().product()).unwrap_or(1).max(1);
    (0..time_len)
        .map(|row| variable.data().get(row * inner).expect("row start index in range").as_f64())
        .collect()
}

fn single_variable_name(arguments: &[BoundArgument], function: &str) -> Result<String> {
    match arguments {
        [BoundArgument::Variable(v)] => Ok(v.name.clone()),
        _ => Err(HarpError::operation(format!("'{function}' expects a single variable name argument"))),
    }
}

fn two_variable_names(arguments: &[BoundArgument], function: &str) -> Result<(String, String)> {
    match arguments {
        [BoundArgument::Variable(a), BoundArgument::Variable(b)] => Ok((a.name.clone(), b.name.clone())),
        _ => Err(HarpError::operation(format!("'{function}' expects two variable name arguments"))),
    }
}

fn single_dimension(arguments: &[BoundArgument], function: &str) -> Result<DimensionKind> {
    match arguments {
        [BoundArgument::Dimensions(dims)] if dims.len() == 1 => Ok(dims[0]),
        _ => Err(HarpError::operation(format!("'{function}' expects a single dimension argument"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::scalar::ElementType;
    use harp_dsl::VariableRef;

    fn var_arg(name: &str) -> BoundArgument {
        BoundArgument::Variable(VariableRef { name: name.into(), dimensions: vec![] })
    }

    #[test]
    fn sort_reorders_time_rows_ascending() {
        let mut p = Product::new();
        let mut v = Variable::new("pressure", ElementType::F64, vec![DimensionKind::Time], vec![3]).unwrap();
        if let TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![30.0, 10.0, 20.0];
        }
        p.add_variable(v).unwrap();

        sort(&mut p, &[var_arg("pressure")]).unwrap();
        let out = p.get("pressure").unwrap();
        assert_eq!(out.data(), &TypedArray::F64(vec![10.0, 20.0, 30.0]));
    }

    #[test]
    fn smooth_averages_neighbors() {
        let mut p = Product::new();
        let mut v = Variable::new("x", ElementType::F64, vec![DimensionKind::Time], vec![3]).unwrap();
        if let TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![0.0, 3.0, 6.0];
        }
        p.add_variable(v).unwrap();

        smooth(&mut p, &[var_arg("x")]).unwrap();
        let out = p.get("x").unwrap();
        assert_eq!(out.data(), &TypedArray::F64(vec![1.5, 3.0, 4.5]));
    }

    #[test]
    fn squash_averages_out_the_given_dimension() {
        let mut p = Product::new();
        let mut v = Variable::new(
            "profile",
            ElementType::F64,
            vec![DimensionKind::Time, DimensionKind::Vertical],
            vec![2, 2],
        )
        .unwrap();
        if let TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![1.0, 3.0, 10.0, 20.0];
        }
        p.add_variable(v).unwrap();

        squash(&mut p, &[BoundArgument::Dimensions(vec![DimensionKind::Vertical])]).unwrap();
        let out = p.get("profile").unwrap();
        assert_eq!(out.dimension_kinds(), &[DimensionKind::Time]);
        assert_eq!(out.data(), &TypedArray::F64(vec![2.0, 15.0]));
    }

    #[test]
    fn flatten_merges_adjacent_axis_without_moving_data() {
        let mut p = Product::new();
        let mut v = Variable::new(
            "radiance",
            ElementType::F64,
            vec![DimensionKind::Time, DimensionKind::Spectral],
            vec![2, 2],
        )
        .unwrap();
        if let TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![1.0, 2.0, 3.0, 4.0];
        }
        p.add_variable(v).unwrap();

        flatten(&mut p, &[BoundArgument::Dimensions(vec![DimensionKind::Time])]).unwrap();
        let out = p.get("radiance").unwrap();
        assert_eq!(out.dimension_kinds(), &[DimensionKind::Independent]);
        assert_eq!(out.dimension_lengths(), &[4]);
        assert_eq!(out.data(), &TypedArray::F64(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn bin_averages_rows_with_equal_group_value() {
        let mut p = Product::new();
        let mut group = Variable::new("orbit", ElementType::F64, vec![DimensionKind::Time], vec![4]).unwrap();
        if let TypedArray::F64(buf) = group.data_mut() {
            *buf = vec![1.0, 1.0, 2.0, 2.0];
        }
        p.add_variable(group).unwrap();
        let mut value = Variable::new("pressure", ElementType::F64, vec![DimensionKind::Time], vec![4]).unwrap();
        if let TypedArray::F64(buf) = value.data_mut() {
            *buf = vec![10.0, 20.0, 100.0, 200.0];
        }
        p.add_variable(value).unwrap();

        bin(&mut p, &[var_arg("orbit")]).unwrap();
        let out = p.get("pressure").unwrap();
        assert_eq!(out.data(), &TypedArray::F64(vec![15.0, 150.0]));
    }
}
