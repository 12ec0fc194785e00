//! Reference ingestion module for the toolkit's own plain-text grid
//! format: a header of `name:type:kind:len:unit` lines (one per
//! time-dimensioned variable) followed by whitespace-separated data
//! rows, one row per time step, columns in header order.
//!
//! This is a stand-in format invented for testing the ingestion
//! contract end-to-end; it carries no instrument-specific semantics.
//! Only rank-1, time-dimensioned variables are supported — a real
//! vendor backend would need the general N-D case, but the contract
//! (`init`/`dimensions`/`read_variable`/`done`) does not.

use crate::registry::{IngestionModule, IngestionOption};
use harp_core::array::TypedArray;
use harp_core::dimension::DimensionKind;
use harp_core::error::{HarpError, Result};
use harp_core::scalar::{ElementType, Scalar};
use harp_core::variable::Variable;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

struct FieldSpec {
    name: String,
    element_type: ElementType,
    kind: DimensionKind,
    len: usize,
    unit: Option<String>,
}

struct GridData {
    fields: Vec<FieldSpec>,
    rows: Vec<Vec<String>>,
}

pub struct TextGridModule;

impl IngestionModule for TextGridModule {
    fn vendor(&self) -> &str {
        "harp"
    }

    fn product_class(&self) -> &str {
        "reference"
    }

    fn product_type(&self) -> &str {
        "text_grid"
    }

    fn detect(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("grid")
    }

    fn options(&self) -> &[IngestionOption] {
        &[]
    }

    fn init(&self, path: &Path, _options: &FxHashMap<String, String>) -> Result<Box<dyn Any>> {
        let text = std::fs::read_to_string(path).map_err(|e| HarpError::FileOpen {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let data = parse(&text).map_err(|message| HarpError::Ingestion {
            file: path.display().to_string(),
            message,
        })?;
        Ok(Box::new(data))
    }

    fn dimensions(&self, user_data: &dyn Any) -> Result<FxHashMap<DimensionKind, usize>> {
        let data = downcast(user_data)?;
        let mut dims = FxHashMap::default();
        for field in &data.fields {
            dims.insert(field.kind, field.len);
        }
        Ok(dims)
    }

    fn variable_names(&self, user_data: &dyn Any) -> Vec<String> {
        match downcast(user_data) {
            Ok(data) => data.fields.iter().map(|f| f.name.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn read_variable(&self, user_data: &dyn Any, name: &str) -> Result<Variable> {
        let data = downcast(user_data)?;
        let (column, field) = data
            .fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .ok_or_else(|| HarpError::variable_not_found(name))?;

        let mut array = TypedArray::construct(field.element_type, &[field.len]);
        for (row, tokens) in data.rows.iter().enumerate() {
            let token = tokens.get(column).ok_or_else(|| HarpError::Ingestion {
                file: name.to_string(),
                message: format!("row {row} is missing a value for column '{name}'"),
            })?;
            array.set(row, parse_scalar(field.element_type, token)?)?;
        }

        let mut variable = Variable::from_data(name, vec![field.kind], vec![field.len], array)?;
        if let Some(unit) = &field.unit {
            variable.set_unit(unit.clone())?;
        }
        Ok(variable)
    }

    fn done(&self, _user_data: Box<dyn Any>) -> Result<()> {
        Ok(())
    }
}

fn downcast(user_data: &dyn Any) -> Result<&GridData> {
    user_data
        .downcast_ref::<GridData>()
        .ok_or_else(|| HarpError::invalid_argument("text_grid: user_data is not a GridData"))
}

fn parse(text: &str) -> std::result::Result<GridData, String> {
    let mut fields = Vec::new();
    let mut data_lines = Vec::new();
    let mut in_header = true;

    for (i, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if in_header {
            match parse_header_line(line) {
                Some(field) => {
                    fields.push(field);
                    continue;
                }
                None => in_header = false,
            }
        }
        data_lines.push((i + 1, line));
    }

    if fields.is_empty() {
        return Err("text_grid file has no header lines".to_string());
    }

    let len = fields[0].len;
    for field in &fields[1..] {
        if field.len != len {
            return Err(format!(
                "field '{}' declares length {}, expected {len} to match '{}'",
                field.name, field.len, fields[0].name
            ));
        }
    }
    if data_lines.len() != len {
        return Err(format!("expected {len} data row(s), found {}", data_lines.len()));
    }

    let rows = data_lines
        .into_iter()
        .map(|(line_number, line)| {
            let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if tokens.len() != fields.len() {
                return Err(format!(
                    "line {line_number}: expected {} column(s), found {}",
                    fields.len(),
                    tokens.len()
                ));
            }
            Ok(tokens)
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;

    Ok(GridData { fields, rows })
}

fn parse_header_line(line: &str) -> Option<FieldSpec> {
    let parts: Vec<&str> = line.split(':').collect();
    let [name, type_str, kind_str, len_str, unit_str] = parts.as_slice() else {
        return None;
    };

    let element_type = match *type_str {
        "i8" => ElementType::I8,
        "i16" => ElementType::I16,
        "i32" => ElementType::I32,
        "f32" => ElementType::F32,
        "f64" => ElementType::F64,
        "str" => ElementType::Str,
        _ => return None,
    };
    let kind = DimensionKind::from_name(kind_str)?;
    let len: usize = len_str.parse().ok()?;
    let unit = if *unit_str == "1" || unit_str.is_empty() {
        None
    } else {
        Some(unit_str.to_string())
    };

    Some(FieldSpec { name: name.to_string(), element_type, kind, len, unit })
}

fn parse_scalar(element_type: ElementType, token: &str) -> Result<Scalar> {
    let invalid = || HarpError::invalid_format(format!("'{token}' is not a valid {element_type} value"));
    Ok(match element_type {
        ElementType::I8 => Scalar::I8(token.parse().map_err(|_| invalid())?),
        ElementType::I16 => Scalar::I16(token.parse().map_err(|_| invalid())?),
        ElementType::I32 => Scalar::I32(token.parse().map_err(|_| invalid())?),
        ElementType::F32 => Scalar::F32(token.parse().map_err(|_| invalid())?),
        ElementType::F64 => Scalar::F64(token.parse().map_err(|_| invalid())?),
        ElementType::Str => Scalar::Str(Some(Arc::from(token))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let text = "pressure:f64:time:2:hPa\nflag:i32:time:2:1\n1013.25 0\n1000.0 1\n";
        let data = parse(text).unwrap();
        assert_eq!(data.fields.len(), 2);
        assert_eq!(data.rows.len(), 2);
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let text = "pressure:f64:time:3:hPa\n1013.25\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn read_variable_round_trips_values() {
        let module = TextGridModule;
        let data = parse("pressure:f64:time:2:hPa\n1013.25\n1000.0\n").unwrap();
        let boxed: Box<dyn Any> = Box::new(data);
        let variable = module.read_variable(boxed.as_ref(), "pressure").unwrap();
        assert_eq!(variable.data(), &TypedArray::F64(vec![1013.25, 1000.0]));
        assert_eq!(variable.unit.as_deref(), Some("hPa"));
    }
}
