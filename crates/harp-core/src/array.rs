//! N-dimensional typed buffers.
//!
//! `TypedArray` is a true sum type over the element types rather than
//! a tagged union with one pointer per type; each arm owns a
//! contiguous `Vec<T>` (string arrays own one `Option<Arc<str>>` per
//! element, the entry's own fill/null marker).

use crate::error::{HarpError, Result};
use crate::scalar::{ElementType, Scalar};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Str(Vec<Option<Arc<str>>>),
}

/// Product of dimension lengths; an empty `dims` slice is rank 0 and
/// represents a single element, not an empty array.
pub fn num_elements(dims: &[usize]) -> usize {
    if dims.is_empty() {
        1
    } else {
        dims.iter().product()
    }
}

impl TypedArray {
    pub fn element_type(&self) -> ElementType {
        match self {
            TypedArray::I8(_) => ElementType::I8,
            TypedArray::I16(_) => ElementType::I16,
            TypedArray::I32(_) => ElementType::I32,
            TypedArray::F32(_) => ElementType::F32,
            TypedArray::F64(_) => ElementType::F64,
            TypedArray::Str(_) => ElementType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedArray::I8(v) => v.len(),
            TypedArray::I16(v) => v.len(),
            TypedArray::I32(v) => v.len(),
            TypedArray::F32(v) => v.len(),
            TypedArray::F64(v) => v.len(),
            TypedArray::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Construct a buffer of `dims`, initialized to the type's fill value.
    pub fn construct(element_type: ElementType, dims: &[usize]) -> TypedArray {
        let n = num_elements(dims);
        match element_type {
            ElementType::I8 => TypedArray::I8(vec![0; n]),
            ElementType::I16 => TypedArray::I16(vec![0; n]),
            ElementType::I32 => TypedArray::I32(vec![0; n]),
            ElementType::F32 => TypedArray::F32(vec![f32::NAN; n]),
            ElementType::F64 => TypedArray::F64(vec![f64::NAN; n]),
            ElementType::Str => TypedArray::Str(vec![None; n]),
        }
    }

    pub fn get(&self, index: usize) -> Option<Scalar> {
        match self {
            TypedArray::I8(v) => v.get(index).copied().map(Scalar::I8),
            TypedArray::I16(v) => v.get(index).copied().map(Scalar::I16),
            TypedArray::I32(v) => v.get(index).copied().map(Scalar::I32),
            TypedArray::F32(v) => v.get(index).copied().map(Scalar::F32),
            TypedArray::F64(v) => v.get(index).copied().map(Scalar::F64),
            TypedArray::Str(v) => v.get(index).cloned().map(Scalar::Str),
        }
    }

    pub fn set(&mut self, index: usize, value: Scalar) -> Result<()> {
        match (self, value) {
            (TypedArray::I8(v), Scalar::I8(x)) => v[index] = x,
            (TypedArray::I16(v), Scalar::I16(x)) => v[index] = x,
            (TypedArray::I32(v), Scalar::I32(x)) => v[index] = x,
            (TypedArray::F32(v), Scalar::F32(x)) => v[index] = x,
            (TypedArray::F64(v), Scalar::F64(x)) => v[index] = x,
            (TypedArray::Str(v), Scalar::Str(x)) => v[index] = x,
            (array, value) => {
                return Err(HarpError::invalid_argument(format!(
                    "element type mismatch: array is {:?}, value is {:?}",
                    array.element_type(),
                    value.element_type()
                )));
            }
        }
        Ok(())
    }

    /// Permute axes of a `dims`-shaped buffer according to `order`, a
    /// permutation of `[0, rank)`. `None` reverses the axes. Allocates
    /// one scratch buffer and walks strides; each arm is a typed fast
    /// path over its own element width.
    pub fn transpose(&self, dims: &[usize], order: Option<&[usize]>) -> Result<(TypedArray, Vec<usize>)> {
        let rank = dims.len();
        let order: Vec<usize> = match order {
            Some(o) => o.to_vec(),
            None => (0..rank).rev().collect(),
        };
        if order.len() != rank || !is_permutation(&order, rank) {
            return Err(HarpError::invalid_argument(
                "transpose order must be a permutation of [0, rank)",
            ));
        }

        let new_dims: Vec<usize> = order.iter().map(|&ax| dims[ax]).collect();
        let src_strides = row_major_strides(dims);
        let dst_strides = row_major_strides(&new_dims);
        let n = self.len();

        macro_rules! transpose_typed {
            ($variant:ident, $v:expr, $fill:expr) => {{
                let mut out = vec![$fill; n];
                let mut idx = vec![0usize; rank.max(1)];
                for dst_flat in 0..n {
                    let mut rem = dst_flat;
                    for (axis, &stride) in dst_strides.iter().enumerate() {
                        let divisor = stride.max(1);
                        idx[axis] = rem / divisor;
                        rem %= divisor;
                    }
                    let mut src_flat = 0usize;
                    for (dst_axis, &src_axis) in order.iter().enumerate() {
                        src_flat += idx[dst_axis] * src_strides[src_axis];
                    }
                    out[dst_flat] = $v[src_flat].clone();
                }
                TypedArray::$variant(out)
            }};
        }

        let result = match self {
            TypedArray::I8(v) => transpose_typed!(I8, v, 0i8),
            TypedArray::I16(v) => transpose_typed!(I16, v, 0i16),
            TypedArray::I32(v) => transpose_typed!(I32, v, 0i32),
            TypedArray::F32(v) => transpose_typed!(F32, v, 0f32),
            TypedArray::F64(v) => transpose_typed!(F64, v, 0f64),
            TypedArray::Str(v) => transpose_typed!(Str, v, None),
        };
        Ok((result, new_dims))
    }

    /// Reverse slices along `axis`, in place.
    pub fn invert_axis(&mut self, dims: &[usize], axis: usize) -> Result<()> {
        if axis >= dims.len() {
            return Err(HarpError::invalid_argument(format!(
                "axis {axis} out of range for rank {}",
                dims.len()
            )));
        }
        let strides = row_major_strides(dims);
        let axis_len = dims[axis];
        let axis_stride = strides[axis];
        let outer = dims[..axis].iter().product::<usize>().max(1);
        let inner = strides[axis];

        macro_rules! invert_typed {
            ($v:expr) => {{
                for o in 0..outer {
                    let base = o * dims[axis] * inner;
                    for i in 0..inner {
                        let mut lo = 0usize;
                        let mut hi = axis_len - 1;
                        while lo < hi {
                            let a = base + lo * axis_stride + i;
                            let b = base + hi * axis_stride + i;
                            $v.swap(a, b);
                            lo += 1;
                            hi -= 1;
                        }
                    }
                }
            }};
        }

        match self {
            TypedArray::I8(v) => invert_typed!(v),
            TypedArray::I16(v) => invert_typed!(v),
            TypedArray::I32(v) => invert_typed!(v),
            TypedArray::F32(v) => invert_typed!(v),
            TypedArray::F64(v) => invert_typed!(v),
            TypedArray::Str(v) => invert_typed!(v),
        }
        Ok(())
    }

    /// Replace every element equal to `old` with the type's canonical
    /// fill value. No-op if `old` is already canonical. Undefined (a
    /// no-op returning an error) for string arrays: use an explicit
    /// null set instead.
    pub fn replace_fill(&mut self, old: &Scalar) -> Result<()> {
        if old.is_fill() {
            return Ok(());
        }
        match (self, old) {
            (TypedArray::I8(v), Scalar::I8(o)) => v.iter_mut().for_each(|x| {
                if x == o {
                    *x = 0;
                }
            }),
            (TypedArray::I16(v), Scalar::I16(o)) => v.iter_mut().for_each(|x| {
                if x == o {
                    *x = 0;
                }
            }),
            (TypedArray::I32(v), Scalar::I32(o)) => v.iter_mut().for_each(|x| {
                if x == o {
                    *x = 0;
                }
            }),
            (TypedArray::F32(v), Scalar::F32(o)) => v.iter_mut().for_each(|x| {
                if *x == *o {
                    *x = f32::NAN;
                }
            }),
            (TypedArray::F64(v), Scalar::F64(o)) => v.iter_mut().for_each(|x| {
                if *x == *o {
                    *x = f64::NAN;
                }
            }),
            (TypedArray::Str(_), _) => {
                return Err(HarpError::invalid_argument(
                    "replace_fill is undefined for string arrays; use an explicit null set",
                ));
            }
            _ => {
                return Err(HarpError::invalid_argument(
                    "replace_fill: element type mismatch between array and old value",
                ));
            }
        }
        Ok(())
    }

    /// Keep only the elements at `indices` (used by the pipeline executor
    /// to slice the outermost, typically time, dimension).
    pub fn select(&self, indices: &[usize]) -> TypedArray {
        macro_rules! select_typed {
            ($variant:ident, $v:expr) => {
                TypedArray::$variant(indices.iter().map(|&i| $v[i].clone()).collect())
            };
        }
        match self {
            TypedArray::I8(v) => select_typed!(I8, v),
            TypedArray::I16(v) => select_typed!(I16, v),
            TypedArray::I32(v) => select_typed!(I32, v),
            TypedArray::F32(v) => select_typed!(F32, v),
            TypedArray::F64(v) => select_typed!(F64, v),
            TypedArray::Str(v) => select_typed!(Str, v),
        }
    }
}

fn is_permutation(order: &[usize], rank: usize) -> bool {
    let mut seen = vec![false; rank];
    for &o in order {
        if o >= rank || seen[o] {
            return false;
        }
        seen[o] = true;
    }
    true
}

/// Row-major (C order) strides for `dims`; rank 0 yields an empty vec.
pub fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_elements_rank_zero_is_one() {
        assert_eq!(num_elements(&[]), 1);
    }

    #[test]
    fn num_elements_is_product() {
        assert_eq!(num_elements(&[2, 3, 4]), 24);
    }

    #[test]
    fn transpose_then_inverse_transpose_is_identity() {
        let dims = [2usize, 3];
        let arr = TypedArray::I32((0..6).collect());
        let (t, new_dims) = arr.transpose(&dims, Some(&[1, 0])).unwrap();
        assert_eq!(new_dims, vec![3, 2]);
        let (back, back_dims) = t.transpose(&new_dims, Some(&[1, 0])).unwrap();
        assert_eq!(back_dims, dims.to_vec());
        assert_eq!(back, arr);
    }

    #[test]
    fn invert_axis_twice_is_identity() {
        let dims = [2usize, 3];
        let mut arr = TypedArray::I32(vec![1, 2, 3, 4, 5, 6]);
        let original = arr.clone();
        arr.invert_axis(&dims, 1).unwrap();
        assert_eq!(arr, TypedArray::I32(vec![3, 2, 1, 6, 5, 4]));
        arr.invert_axis(&dims, 1).unwrap();
        assert_eq!(arr, original);
    }

    #[test]
    fn replace_fill_only_touches_matching_elements() {
        let mut arr = TypedArray::I32(vec![1, 2, 1, 3]);
        arr.replace_fill(&Scalar::I32(1)).unwrap();
        assert_eq!(arr, TypedArray::I32(vec![0, 2, 0, 3]));
    }

    #[test]
    fn replace_fill_noop_when_old_is_canonical() {
        let mut arr = TypedArray::F64(vec![1.0, f64::NAN, 3.0]);
        arr.replace_fill(&Scalar::F64(f64::NAN)).unwrap();
        assert_eq!(arr.get(0), Some(Scalar::F64(1.0)));
    }

    #[test]
    fn replace_fill_undefined_for_strings() {
        let mut arr = TypedArray::Str(vec![Some(Arc::from("a"))]);
        assert!(arr.replace_fill(&Scalar::Str(Some(Arc::from("a")))).is_err());
    }
}
