//! Dispatch: probe → init → allocate → read → attach provenance, plus
//! the `harpcheck` verify logic that exercises every legal option
//! combination of every registered module against a file.

use crate::registry::{option_combinations, IngestionModule, Registry};
use harp_core::error::Result;
use harp_core::product::Product;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Probe `path` against the registry and ingest it using the module's
/// default (first legal) option combination.
pub fn dispatch(registry: &Registry, path: &Path) -> Result<Product> {
    let module = registry.find(path)?;
    let options = option_combinations(module.options()).remove(0);
    dispatch_with(module, path, &options)
}

fn dispatch_with(module: &dyn IngestionModule, path: &Path, options: &FxHashMap<String, String>) -> Result<Product> {
    let user_data = module.init(path, options)?;
    module.dimensions(user_data.as_ref())?;

    let mut product = Product::new();
    for name in module.variable_names(user_data.as_ref()) {
        let variable = module.read_variable(user_data.as_ref(), &name)?;
        product.add_variable(variable)?;
    }
    product.source_product = Some(path.display().to_string());

    module.done(user_data)?;
    Ok(product)
}

#[derive(Debug, Clone)]
pub struct VariableReport {
    pub name: String,
    pub shape: Vec<usize>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub path: String,
    pub options: Vec<(String, String)>,
    pub ok: bool,
    pub variables: Vec<VariableReport>,
    pub error: Option<String>,
}

/// Ingest `path` under every legal option combination of whichever
/// module recognizes it. One report per combination; a file no module
/// recognizes yields a single failing report.
pub fn check_path(registry: &Registry, path: &Path) -> Vec<CheckReport> {
    let module = match registry.find(path) {
        Ok(module) => module,
        Err(e) => {
            return vec![CheckReport {
                path: path.display().to_string(),
                options: Vec::new(),
                ok: false,
                variables: Vec::new(),
                error: Some(e.to_string()),
            }];
        }
    };

    option_combinations(module.options())
        .into_iter()
        .map(|options| {
            let mut sorted_options: Vec<(String, String)> = options.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            sorted_options.sort();

            match dispatch_with(module, path, &options) {
                Ok(product) => CheckReport {
                    path: path.display().to_string(),
                    options: sorted_options,
                    ok: true,
                    variables: product
                        .variables()
                        .iter()
                        .map(|v| VariableReport {
                            name: v.name.to_string(),
                            shape: v.dimension_lengths().to_vec(),
                            unit: v.unit.as_ref().map(|u| u.to_string()),
                        })
                        .collect(),
                    error: None,
                },
                Err(e) => CheckReport {
                    path: path.display().to_string(),
                    options: sorted_options,
                    ok: false,
                    variables: Vec::new(),
                    error: Some(e.to_string()),
                },
            }
        })
        .collect()
}

/// `true` iff every report in `reports` succeeded; `harpcheck`'s exit
/// code is non-zero when this is `false`.
pub fn all_ok(reports: &[CheckReport]) -> bool {
    reports.iter().all(|r| r.ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::text_grid::TextGridModule;
    use std::io::Write;

    fn sample_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".grid").tempfile().unwrap();
        writeln!(file, "pressure:f64:time:3:hPa").unwrap();
        writeln!(file, "flag:i32:time:3:1").unwrap();
        writeln!(file, "1013.25 0").unwrap();
        writeln!(file, "1000.0 1").unwrap();
        writeln!(file, "950.0 0").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn dispatch_ingests_a_recognized_file() {
        let mut registry = Registry::new();
        registry.register(Box::new(TextGridModule));
        let file = sample_file();

        let product = dispatch(&registry, file.path()).unwrap();
        assert!(product.contains("pressure"));
        assert!(product.contains("flag"));
        assert_eq!(product.source_product.as_deref(), Some(file.path().to_str().unwrap()));
    }

    #[test]
    fn check_path_reports_failure_for_unrecognized_file() {
        let registry = Registry::new();
        let file = sample_file();
        let reports = check_path(&registry, file.path());
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].ok);
        assert!(!all_ok(&reports));
    }
}
