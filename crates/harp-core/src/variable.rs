//! Named, typed, N-D array with semantic dimension tags.

use crate::array::{self, TypedArray};
use crate::dimension::{validate_dimension_kinds, DimensionKind};
use crate::error::{HarpError, Result};
use crate::scalar::{ElementType, Scalar};
use crate::unit::{Unit, UnitConversion, UnitConverter};
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Arc<str>,
    element_type: ElementType,
    dimension_kinds: Vec<DimensionKind>,
    dimension_lengths: Vec<usize>,
    data: TypedArray,
    pub unit: Option<Unit>,
    pub description: Option<String>,
    valid_min: Option<Scalar>,
    valid_max: Option<Scalar>,
    enum_labels: Option<Vec<String>>,
}

impl Variable {
    /// Construct a variable with a fill-initialized buffer. Fails if a
    /// non-independent kind repeats.
    pub fn new(
        name: impl Into<Arc<str>>,
        element_type: ElementType,
        dimension_kinds: Vec<DimensionKind>,
        dimension_lengths: Vec<usize>,
    ) -> Result<Variable> {
        if dimension_kinds.len() != dimension_lengths.len() {
            return Err(HarpError::invalid_argument(
                "dimension_kinds and dimension_lengths must have the same length",
            ));
        }
        validate_dimension_kinds(&dimension_kinds).map_err(HarpError::invalid_argument)?;

        let data = TypedArray::construct(element_type, &dimension_lengths);
        Ok(Variable {
            name: name.into(),
            element_type,
            dimension_kinds,
            dimension_lengths,
            data,
            unit: None,
            description: None,
            valid_min: None,
            valid_max: None,
            enum_labels: None,
        })
    }

    /// Wrap an already-populated buffer (used by ingestion modules after
    /// filling a variable's read callback). The buffer's length must
    /// equal the product of `dimension_lengths`.
    pub fn from_data(
        name: impl Into<Arc<str>>,
        dimension_kinds: Vec<DimensionKind>,
        dimension_lengths: Vec<usize>,
        data: TypedArray,
    ) -> Result<Variable> {
        let name = name.into();
        validate_dimension_kinds(&dimension_kinds).map_err(HarpError::invalid_argument)?;
        let expected = array::num_elements(&dimension_lengths);
        if data.len() != expected {
            return Err(HarpError::invalid_argument(format!(
                "variable '{}': data has {} elements, expected {} from dimensions {:?}",
                name,
                data.len(),
                expected,
                dimension_lengths
            )));
        }
        Ok(Variable {
            name,
            element_type: data.element_type(),
            dimension_kinds,
            dimension_lengths,
            data,
            unit: None,
            description: None,
            valid_min: None,
            valid_max: None,
            enum_labels: None,
        })
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn rank(&self) -> usize {
        self.dimension_kinds.len()
    }

    pub fn dimension_kinds(&self) -> &[DimensionKind] {
        &self.dimension_kinds
    }

    pub fn dimension_lengths(&self) -> &[usize] {
        &self.dimension_lengths
    }

    pub fn data(&self) -> &TypedArray {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut TypedArray {
        &mut self.data
    }

    pub fn valid_min(&self) -> Option<&Scalar> {
        self.valid_min.as_ref()
    }

    pub fn valid_max(&self) -> Option<&Scalar> {
        self.valid_max.as_ref()
    }

    pub fn enum_labels(&self) -> Option<&[String]> {
        self.enum_labels.as_deref()
    }

    /// The outermost (first) dimension kind, used by the pipeline
    /// executor to decide whether a row-wise filter applies to this
    /// variable.
    pub fn outermost_kind(&self) -> Option<DimensionKind> {
        self.dimension_kinds.first().copied()
    }

    /// Structural check used by operations to validate shape
    /// prerequisites: does this variable use exactly these kinds, in
    /// any order?
    pub fn has_dimension_kinds(&self, kinds: &[DimensionKind]) -> bool {
        kinds.iter().all(|k| self.dimension_kinds.contains(k))
    }

    pub fn set_unit(&mut self, unit: impl Into<Arc<str>>) -> Result<()> {
        if self.element_type == ElementType::Str {
            return Err(HarpError::invalid_argument(
                "cannot set a unit on a string variable",
            ));
        }
        self.unit = Some(unit.into());
        Ok(())
    }

    pub fn set_valid_range(&mut self, min: Scalar, max: Scalar) -> Result<()> {
        if min.element_type() != self.element_type || max.element_type() != self.element_type {
            return Err(HarpError::invalid_argument(
                "valid_min/valid_max element type must match the variable's element type",
            ));
        }
        let min_f = min.as_f64()?;
        let max_f = max.as_f64()?;
        if min_f > max_f {
            return Err(HarpError::invalid_argument("valid_min must be <= valid_max"));
        }
        self.valid_min = Some(min);
        self.valid_max = Some(max);
        Ok(())
    }

    /// Integer-code -> label table. Only legal for integer element types.
    pub fn set_enum(&mut self, labels: Vec<String>) -> Result<()> {
        if !matches!(
            self.element_type,
            ElementType::I8 | ElementType::I16 | ElementType::I32
        ) {
            return Err(HarpError::invalid_argument(
                "enum_labels is only valid for integer element types",
            ));
        }
        self.enum_labels = Some(labels);
        Ok(())
    }

    /// Label for an integer code; codes outside `[0, len)` are "unknown".
    pub fn enum_label(&self, code: i64) -> Option<&str> {
        let labels = self.enum_labels.as_ref()?;
        if code < 0 {
            return None;
        }
        labels.get(code as usize).map(|s| s.as_str())
    }

    /// Compute `(factor, offset)` from the current unit to `target` and
    /// apply it to the numeric buffer in place. Rejects string
    /// variables. Integer variables promote to `f64` first if the
    /// conversion is non-integral.
    pub fn convert_unit(&mut self, target: &str, converter: &dyn UnitConverter) -> Result<()> {
        if self.element_type == ElementType::Str {
            return Err(HarpError::invalid_argument(
                "cannot convert the unit of a string variable",
            ));
        }
        let current = self.unit.clone().ok_or_else(|| {
            HarpError::unit_conversion("variable has no unit set; cannot convert")
        })?;
        let conv = converter.factor_offset(&current, target)?;

        if !self.element_type.is_float() && !conv.is_integral() {
            self.promote_to_f64();
            self.apply_conversion(&conv);
        } else {
            self.apply_conversion(&conv);
        }
        self.unit = Some(Arc::from(target));
        Ok(())
    }

    fn apply_conversion(&mut self, conv: &UnitConversion) {
        match &mut self.data {
            TypedArray::I8(v) => v.iter_mut().for_each(|x| *x = conv.apply(*x as f64) as i8),
            TypedArray::I16(v) => v.iter_mut().for_each(|x| *x = conv.apply(*x as f64) as i16),
            TypedArray::I32(v) => v.iter_mut().for_each(|x| *x = conv.apply(*x as f64) as i32),
            TypedArray::F32(v) => v.iter_mut().for_each(|x| *x = conv.apply(*x as f64) as f32),
            TypedArray::F64(v) => v.iter_mut().for_each(|x| *x = conv.apply(*x)),
            TypedArray::Str(_) => unreachable!("string variables rejected above"),
        }
    }

    fn promote_to_f64(&mut self) {
        self.data = match &self.data {
            TypedArray::I8(v) => TypedArray::F64(v.iter().map(|&x| x as f64).collect()),
            TypedArray::I16(v) => TypedArray::F64(v.iter().map(|&x| x as f64).collect()),
            TypedArray::I32(v) => TypedArray::F64(v.iter().map(|&x| x as f64).collect()),
            TypedArray::F32(v) => TypedArray::F64(v.iter().map(|&x| x as f64).collect()),
            other => other.clone(),
        };
        self.element_type = self.data.element_type();
    }

    /// Range-checked cast to a new element type. NaN in a float source
    /// produces the target's fill value rather than erroring.
    pub fn convert_element_type(&mut self, target: ElementType) -> Result<()> {
        if self.element_type == target {
            return Ok(());
        }
        let n = self.data.len();
        let mut converted = TypedArray::construct(target, &[n]);
        for i in 0..n {
            let value = self.data.get(i).expect("index in range");
            let out = value.convert_to(target)?;
            converted.set(i, out)?;
        }
        self.data = converted;
        self.element_type = target;
        Ok(())
    }

    /// Replicate values along dimensions this variable is missing
    /// relative to `target_kinds`/`target_lengths` (e.g. broadcasting a
    /// per-scanline value across all pixels of that scanline). The
    /// existing dimensions must appear, in order, as a sub-sequence of
    /// the target.
    pub fn rebroadcast(&self, target_kinds: &[DimensionKind], target_lengths: &[usize]) -> Result<Variable> {
        if target_kinds.len() != target_lengths.len() {
            return Err(HarpError::invalid_argument(
                "target_kinds and target_lengths must have the same length",
            ));
        }

        // Map each of our dims onto a position in the target, preserving order.
        let mut src_pos = Vec::with_capacity(self.dimension_kinds.len());
        let mut cursor = 0usize;
        for &kind in &self.dimension_kinds {
            while cursor < target_kinds.len() && target_kinds[cursor] != kind {
                cursor += 1;
            }
            if cursor == target_kinds.len() {
                return Err(HarpError::invalid_argument(format!(
                    "cannot rebroadcast: dimension kind '{}' not found in target",
                    kind.name()
                )));
            }
            src_pos.push(cursor);
            cursor += 1;
        }

        let target_strides = array::row_major_strides(target_lengths);
        let src_strides = array::row_major_strides(&self.dimension_lengths);
        let n = array::num_elements(target_lengths);

        let mut out = TypedArray::construct(self.element_type, target_lengths);
        for flat in 0..n {
            let mut rem = flat;
            let mut idx = vec![0usize; target_lengths.len()];
            for (axis, &stride) in target_strides.iter().enumerate() {
                let divisor = stride.max(1);
                idx[axis] = rem / divisor;
                rem %= divisor;
            }
            let mut src_flat = 0usize;
            for (i, &pos) in src_pos.iter().enumerate() {
                src_flat += idx[pos] * src_strides[i];
            }
            let value = self.data.get(src_flat).expect("index in range");
            out.set(flat, value).expect("matching element type");
        }

        Ok(Variable {
            name: self.name.clone(),
            element_type: self.element_type,
            dimension_kinds: target_kinds.to_vec(),
            dimension_lengths: target_lengths.to_vec(),
            data: out,
            unit: self.unit.clone(),
            description: self.description.clone(),
            valid_min: self.valid_min.clone(),
            valid_max: self.valid_max.clone(),
            enum_labels: self.enum_labels.clone(),
        })
    }

    /// Keep only the rows at `indices` along the outermost dimension,
    /// updating that dimension's length accordingly (used by the
    /// pipeline executor's row-wise filters).
    pub fn select_outer(&self, indices: &[usize]) -> Result<Variable> {
        if self.dimension_kinds.is_empty() {
            return Err(HarpError::invalid_argument(
                "cannot select rows of a rank-0 variable",
            ));
        }
        let outer_len = self.dimension_lengths[0];
        let inner: usize = self.dimension_lengths[1..].iter().product::<usize>().max(1);

        let mut flat_indices = Vec::with_capacity(indices.len() * inner);
        for &row in indices {
            for j in 0..inner {
                flat_indices.push(row * inner + j);
            }
        }
        let _ = outer_len;

        let mut new_lengths = self.dimension_lengths.clone();
        new_lengths[0] = indices.len();

        Ok(Variable {
            name: self.name.clone(),
            element_type: self.element_type,
            dimension_kinds: self.dimension_kinds.clone(),
            dimension_lengths: new_lengths,
            data: self.data.select(&flat_indices),
            unit: self.unit.clone(),
            description: self.description.clone(),
            valid_min: self.valid_min.clone(),
            valid_max: self.valid_max.clone(),
            enum_labels: self.enum_labels.clone(),
        })
    }
}

pub type VariableMap = FxHashMap<Arc<str>, usize>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_duplicate_non_independent_kind() {
        let err = Variable::new(
            "bad",
            ElementType::F64,
            vec![DimensionKind::Time, DimensionKind::Time],
            vec![2, 2],
        );
        assert!(err.is_err());
    }

    #[test]
    fn select_outer_reduces_time_length() {
        let mut v = Variable::new("sza", ElementType::F64, vec![DimensionKind::Time], vec![5]).unwrap();
        if let TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        }
        let selected = v.select_outer(&[0, 1, 2]).unwrap();
        assert_eq!(selected.dimension_lengths(), &[3]);
        assert_eq!(selected.data(), &TypedArray::F64(vec![10.0, 20.0, 30.0]));
    }

    #[test]
    fn rebroadcast_replicates_along_missing_dimension() {
        let mut v = Variable::new(
            "scan_quality",
            ElementType::I32,
            vec![DimensionKind::Time],
            vec![2],
        )
        .unwrap();
        if let TypedArray::I32(buf) = v.data_mut() {
            *buf = vec![1, 2];
        }
        let wide = v
            .rebroadcast(
                &[DimensionKind::Time, DimensionKind::Independent],
                &[2, 3],
            )
            .unwrap();
        assert_eq!(wide.data(), &TypedArray::I32(vec![1, 1, 1, 2, 2, 2]));
    }

    #[test]
    fn convert_unit_hpa_to_pa() {
        use crate::unit::UcumSubset;
        let mut v = Variable::new("p", ElementType::F64, vec![], vec![]).unwrap();
        v.set_unit("hPa").unwrap();
        if let TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![1013.25];
        }
        v.convert_unit("Pa", &UcumSubset).unwrap();
        assert!(matches!(v.data(), TypedArray::F64(b) if (b[0] - 101325.0).abs() < 1e-6));
    }

    #[test]
    fn convert_element_type_nan_becomes_fill() {
        let mut v = Variable::new("x", ElementType::F64, vec![], vec![]).unwrap();
        if let TypedArray::F64(buf) = v.data_mut() {
            *buf = vec![f64::NAN];
        }
        v.convert_element_type(ElementType::I32).unwrap();
        assert_eq!(v.data(), &TypedArray::I32(vec![0]));
    }
}
