//! Ordered set of variables sharing a dimension-size map.

use crate::dimension::DimensionKind;
use crate::error::{HarpError, Result};
use crate::variable::Variable;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Default)]
pub struct Product {
    variables: Vec<Variable>,
    index: FxHashMap<Arc<str>, usize>,
    dimension_lengths: FxHashMap<DimensionKind, usize>,
    pub source_product: Option<String>,
    history: String,
}

impl Product {
    pub fn new() -> Product {
        Product::default()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&i| &self.variables[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        if let Some(&i) = self.index.get(name) {
            Some(&mut self.variables[i])
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Append a variable, preserving insertion order. Fails if the name
    /// already exists, or if any non-independent dimension kind the
    /// variable uses disagrees with the product's established length
    /// for that kind.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        if self.index.contains_key(&variable.name) {
            return Err(HarpError::invalid_argument(format!(
                "variable '{}' already exists in this product",
                variable.name
            )));
        }

        for (&kind, &len) in variable
            .dimension_kinds()
            .iter()
            .zip(variable.dimension_lengths())
        {
            if kind.is_independent() {
                continue;
            }
            match self.dimension_lengths.get(&kind) {
                Some(&existing) if existing != len => {
                    return Err(HarpError::invalid_argument(format!(
                        "variable '{}' declares {} = {}, but the product already has {} = {}",
                        variable.name,
                        kind.name(),
                        len,
                        kind.name(),
                        existing
                    )));
                }
                _ => {}
            }
        }

        // Only commit dimension-length entries after every check passed,
        // so a failed add leaves the product's dimension map untouched.
        for (&kind, &len) in variable
            .dimension_kinds()
            .iter()
            .zip(variable.dimension_lengths())
        {
            if !kind.is_independent() {
                self.dimension_lengths.entry(kind).or_insert(len);
            }
        }

        let idx = self.variables.len();
        self.index.insert(variable.name.clone(), idx);
        self.variables.push(variable);
        Ok(())
    }

    /// Remove a variable by name, preserving insertion order of the rest.
    pub fn remove_variable(&mut self, name: &str) -> Result<Variable> {
        let idx = self
            .index
            .get(name)
            .copied()
            .ok_or_else(|| HarpError::variable_not_found(name))?;
        let removed = self.variables.remove(idx);
        self.rebuild_index();
        Ok(removed)
    }

    pub fn rename_variable(&mut self, old: &str, new: &str) -> Result<()> {
        if self.index.contains_key(new) {
            return Err(HarpError::invalid_argument(format!(
                "cannot rename '{old}' to '{new}': '{new}' already exists"
            )));
        }
        let idx = self
            .index
            .get(old)
            .copied()
            .ok_or_else(|| HarpError::variable_not_found(old))?;
        let new_name: Arc<str> = Arc::from(new);
        self.variables[idx].name = new_name.clone();
        self.index.remove(old);
        self.index.insert(new_name, idx);
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, v) in self.variables.iter().enumerate() {
            self.index.insert(v.name.clone(), i);
        }
    }

    /// Look up a dimension's established length. Fails if no variable
    /// has declared that kind yet.
    pub fn dimension_length(&self, kind: DimensionKind) -> Result<usize> {
        self.dimension_lengths.get(&kind).copied().ok_or_else(|| {
            HarpError::invalid_argument(format!(
                "no variable in this product has established a length for dimension '{}'",
                kind.name()
            ))
        })
    }

    /// Force-set a dimension length directly (used by the pipeline
    /// executor after a row-wise filter changes e.g. `time`).
    pub(crate) fn set_dimension_length(&mut self, kind: DimensionKind, len: usize) {
        self.dimension_lengths.insert(kind, len);
    }

    /// Force-set a dimension length directly, overriding any existing
    /// entry (used by aggregating operations such as `bin`, which change
    /// `time`'s length without going through [`Product::filter_rows`]).
    pub fn set_dimension_length_forced(&mut self, kind: DimensionKind, len: usize) {
        self.set_dimension_length(kind, len);
    }

    /// Keep only `indices` along `kind` for every variable whose
    /// outermost dimension is `kind`, and update the product's
    /// established length for it. Variables not carrying `kind` as
    /// their outermost dimension are left untouched.
    ///
    /// Builds every replacement before mutating anything, so a failure
    /// partway through (e.g. an index out of range) leaves the product
    /// exactly as it was.
    pub fn filter_rows(&mut self, kind: DimensionKind, indices: &[usize]) -> Result<()> {
        let mut replacements = Vec::new();
        for (i, variable) in self.variables.iter().enumerate() {
            if variable.outermost_kind() == Some(kind) {
                replacements.push((i, variable.select_outer(indices)?));
            }
        }
        for (i, replacement) in replacements {
            self.replace_variable(i, replacement);
        }
        self.set_dimension_length(kind, indices.len());
        Ok(())
    }

    /// Append a line to the audit log, stamped with the current time.
    /// By convention the line records the operation fragment that
    /// produced the current state.
    pub fn history_append(&mut self, line: &str) {
        let stamp = unix_timestamp_string();
        if !self.history.is_empty() {
            self.history.push('\n');
        }
        self.history.push_str(&format!("[{stamp}] {line}"));
    }

    /// Replace a variable's buffer in place at the same index (used by
    /// the pipeline executor to commit row-wise filtering results
    /// without disturbing insertion order).
    pub(crate) fn replace_variable(&mut self, idx: usize, variable: Variable) {
        self.variables[idx] = variable;
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

fn unix_timestamp_string() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("t={secs}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ElementType;

    #[test]
    fn add_variable_rejects_duplicate_name() {
        let mut p = Product::new();
        let v1 = Variable::new("x", ElementType::F64, vec![], vec![]).unwrap();
        let v2 = Variable::new("x", ElementType::F64, vec![], vec![]).unwrap();
        p.add_variable(v1).unwrap();
        assert!(p.add_variable(v2).is_err());
    }

    #[test]
    fn add_variable_rejects_dimension_disagreement() {
        let mut p = Product::new();
        let a = Variable::new("a", ElementType::F64, vec![DimensionKind::Time], vec![5]).unwrap();
        p.add_variable(a).unwrap();

        let b = Variable::new("b", ElementType::F64, vec![DimensionKind::Time], vec![4]).unwrap();
        let err = p.add_variable(b);
        assert!(err.is_err());
        // product is untouched: only "a" remains
        assert_eq!(p.variables().len(), 1);
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), 5);
    }

    #[test]
    fn remove_variable_preserves_order() {
        let mut p = Product::new();
        for name in ["a", "b", "c"] {
            p.add_variable(Variable::new(name, ElementType::F64, vec![], vec![]).unwrap())
                .unwrap();
        }
        p.remove_variable("b").unwrap();
        let names: Vec<&str> = p.variables().iter().map(|v| v.name.as_ref()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn rename_variable_rejects_existing_name() {
        let mut p = Product::new();
        p.add_variable(Variable::new("a", ElementType::F64, vec![], vec![]).unwrap())
            .unwrap();
        p.add_variable(Variable::new("b", ElementType::F64, vec![], vec![]).unwrap())
            .unwrap();
        assert!(p.rename_variable("a", "b").is_err());
    }
}
