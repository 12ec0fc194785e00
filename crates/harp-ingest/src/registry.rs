//! Ingestion-module contract and the registry that dispatches a file
//! path to the first module whose `detect` matches.

use harp_core::dimension::DimensionKind;
use harp_core::error::{HarpError, Result};
use harp_core::variable::Variable;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::path::Path;

/// One ingestion option and its fixed enum of legal values, e.g.
/// `{ name: "calibration", legal_values: ["raw", "corrected"] }`.
#[derive(Debug, Clone)]
pub struct IngestionOption {
    pub name: String,
    pub legal_values: Vec<String>,
}

/// The only contract the core requires of an ingestion backend: probe,
/// init, read the declared variables, done. `read_variable` is keyed
/// by name rather than index since `user_data` already carries the
/// module's own notion of variable order.
pub trait IngestionModule: Send + Sync {
    fn vendor(&self) -> &str;
    fn product_class(&self) -> &str;
    fn product_type(&self) -> &str;

    /// True if this module recognizes `path` as one of its own.
    fn detect(&self, path: &Path) -> bool;

    /// The legal option combinations this module accepts; empty if none.
    fn options(&self) -> &[IngestionOption];

    fn init(&self, path: &Path, options: &FxHashMap<String, String>) -> Result<Box<dyn Any>>;
    fn dimensions(&self, user_data: &dyn Any) -> Result<FxHashMap<DimensionKind, usize>>;
    fn variable_names(&self, user_data: &dyn Any) -> Vec<String>;
    fn read_variable(&self, user_data: &dyn Any, name: &str) -> Result<Variable>;
    fn done(&self, user_data: Box<dyn Any>) -> Result<()>;
}

#[derive(Default)]
pub struct Registry {
    modules: Vec<Box<dyn IngestionModule>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn register(&mut self, module: Box<dyn IngestionModule>) {
        self.modules.push(module);
    }

    pub fn modules(&self) -> &[Box<dyn IngestionModule>] {
        &self.modules
    }

    pub fn find(&self, path: &Path) -> Result<&dyn IngestionModule> {
        self.modules
            .iter()
            .map(|m| m.as_ref())
            .find(|m| m.detect(path))
            .ok_or_else(|| HarpError::Ingestion {
                file: path.display().to_string(),
                message: "no registered ingestion module recognizes this file".to_string(),
            })
    }
}

/// Every legal combination of a module's declared options, as one map
/// per combination. A module with no options yields a single empty map.
pub fn option_combinations(options: &[IngestionOption]) -> Vec<FxHashMap<String, String>> {
    let mut combos = vec![FxHashMap::default()];
    for option in options {
        let mut next = Vec::with_capacity(combos.len() * option.legal_values.len().max(1));
        for combo in &combos {
            for value in &option.legal_values {
                let mut extended = combo.clone();
                extended.insert(option.name.clone(), value.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}
