//! Semantic binder: checks a parsed [`Node::OperationList`] against the
//! fixed set of operation names and produces a typed [`Pipeline`] that
//! `harp-ops` can execute without re-inspecting the AST.

use crate::ast::Node;
use harp_core::dimension::DimensionKind;
use harp_core::error::{HarpError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub operations: Vec<BoundOperation>,
    /// Each operation's original source fragment (via [`Node`]'s
    /// `Display`), in the same order as `operations`. Used by the
    /// executor to append to a product's history after a successful
    /// operation.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundOperation {
    Call { name: String, arguments: Vec<BoundArgument> },
    Compare { variable: VariableRef, comparator: Comparator, literal: Literal },
    In { variable: VariableRef, negate: bool, literals: Vec<Literal> },
    BitMask { variable: VariableRef, mode: BitMaskMode, mask: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    pub name: String,
    pub dimensions: Vec<DimensionKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundArgument {
    Variable(VariableRef),
    Dimensions(Vec<DimensionKind>),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Quantity(f64, String),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitMaskMode {
    Any,
    None,
}

/// Minimum and maximum accepted argument count for each function, `None`
/// meaning unbounded. Grounded on the fixed operation set: `keep`,
/// `exclude`, `derive`, the collocation pair, the area predicates,
/// and the per-variable reshaping operations.
const FUNCTION_ARITY: &[(&str, usize, Option<usize>)] = &[
    ("keep", 1, None),
    ("exclude", 1, None),
    ("derive", 1, Some(1)),
    ("collocate_left", 1, Some(1)),
    ("collocate_right", 1, Some(1)),
    ("point_distance", 2, Some(2)),
    ("point_in_area", 1, Some(1)),
    ("area_covers_point", 1, Some(1)),
    ("area_covers_area", 1, Some(1)),
    ("area_inside_area", 1, Some(1)),
    ("area_intersects_area", 1, Some(1)),
    ("area_mask_covers_area", 2, Some(2)),
    ("regrid", 2, Some(2)),
    ("bin", 1, Some(1)),
    ("set", 2, Some(2)),
    ("smooth", 1, Some(1)),
    ("sort", 1, Some(1)),
    ("squash", 1, Some(1)),
    ("flatten", 1, Some(1)),
    ("rename", 2, Some(2)),
    ("valid", 1, Some(1)),
    ("longitude_range", 2, Some(2)),
];

pub fn bind(node: &Node) -> Result<Pipeline> {
    let items = match node {
        Node::OperationList { items, .. } => items,
        other => {
            return Err(HarpError::operation_syntax(
                "expected an operation list at the top level",
                other.position(),
            ));
        }
    };

    let operations = items.iter().map(bind_operation).collect::<Result<Vec<_>>>()?;
    let sources = items.iter().map(|n| n.to_string()).collect();
    Ok(Pipeline { operations, sources })
}

fn bind_operation(node: &Node) -> Result<BoundOperation> {
    match node {
        Node::FunctionCall { name, arguments, position } => bind_call(name, arguments, *position),
        Node::Eq { left, right, .. } => bind_compare(left, right, Comparator::Eq),
        Node::Ne { left, right, .. } => bind_compare(left, right, Comparator::Ne),
        Node::Lt { left, right, .. } => bind_compare(left, right, Comparator::Lt),
        Node::Le { left, right, .. } => bind_compare(left, right, Comparator::Le),
        Node::Gt { left, right, .. } => bind_compare(left, right, Comparator::Gt),
        Node::Ge { left, right, .. } => bind_compare(left, right, Comparator::Ge),
        Node::BitMaskAny { left, right, .. } => bind_bit_mask(left, right, BitMaskMode::Any),
        Node::BitMaskNone { left, right, .. } => bind_bit_mask(left, right, BitMaskMode::None),
        Node::In { left, right, .. } => bind_in(left, right, false),
        Node::NotIn { left, right, .. } => bind_in(left, right, true),
        other => Err(HarpError::operation_syntax(
            "expected a function call or a predicate",
            other.position(),
        )),
    }
}

fn bind_call(name: &str, arguments: &Node, position: usize) -> Result<BoundOperation> {
    let (min, max) = FUNCTION_ARITY
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, min, max)| (*min, *max))
        .ok_or_else(|| HarpError::operation_syntax(format!("unknown operation '{name}'"), position))?;

    let items = match arguments {
        Node::ArgumentList { items, .. } => items,
        other => {
            return Err(HarpError::operation_syntax(
                "malformed argument list",
                other.position(),
            ));
        }
    };

    if items.len() < min || max.is_some_and(|max| items.len() > max) {
        return Err(HarpError::operation_syntax(
            format!(
                "'{name}' takes {} argument(s), found {}",
                arity_description(min, max),
                items.len()
            ),
            position,
        ));
    }

    let bound = items.iter().map(bind_argument).collect::<Result<Vec<_>>>()?;
    Ok(BoundOperation::Call { name: name.to_string(), arguments: bound })
}

fn arity_description(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => format!("exactly {min}"),
        Some(max) => format!("between {min} and {max}"),
        None => format!("at least {min}"),
    }
}

fn bind_argument(node: &Node) -> Result<BoundArgument> {
    match node {
        Node::Name { value, .. } => Ok(BoundArgument::Variable(VariableRef {
            name: value.clone(),
            dimensions: Vec::new(),
        })),
        Node::QualifiedName { name, dimensions, position } => Ok(BoundArgument::Variable(
            VariableRef { name: name.clone(), dimensions: bind_dimensions(dimensions, *position)? },
        )),
        Node::DimensionList { items, position } => {
            Ok(BoundArgument::Dimensions(bind_dimensions(items, *position)?))
        }
        Node::Number { value, .. } => Ok(BoundArgument::Literal(Literal::Number(*value))),
        Node::Quantity { number, unit: Some(unit), .. } => {
            Ok(BoundArgument::Literal(Literal::Quantity(*number, unit.clone())))
        }
        Node::Quantity { number, unit: None, .. } => Ok(BoundArgument::Literal(Literal::Number(*number))),
        Node::Str { value, .. } => Ok(BoundArgument::Literal(Literal::Str(value.clone()))),
        other => Err(HarpError::operation_syntax(
            "unsupported argument kind",
            other.position(),
        )),
    }
}

fn bind_dimensions(names: &[String], position: usize) -> Result<Vec<DimensionKind>> {
    names
        .iter()
        .map(|n| {
            DimensionKind::from_name(n).ok_or_else(|| {
                HarpError::operation_syntax(format!("unknown dimension kind '{n}'"), position)
            })
        })
        .collect()
}

fn bind_variable_ref(node: &Node) -> Result<VariableRef> {
    match node {
        Node::Name { value, .. } => Ok(VariableRef { name: value.clone(), dimensions: Vec::new() }),
        Node::QualifiedName { name, dimensions, position } => {
            Ok(VariableRef { name: name.clone(), dimensions: bind_dimensions(dimensions, *position)? })
        }
        other => Err(HarpError::operation_syntax(
            "expected a variable reference",
            other.position(),
        )),
    }
}

fn bind_literal(node: &Node) -> Result<Literal> {
    match node {
        Node::Number { value, .. } => Ok(Literal::Number(*value)),
        Node::Quantity { number, unit: Some(unit), .. } => Ok(Literal::Quantity(*number, unit.clone())),
        Node::Quantity { number, unit: None, .. } => Ok(Literal::Number(*number)),
        Node::Str { value, .. } => Ok(Literal::Str(value.clone())),
        other => Err(HarpError::operation_syntax(
            "expected a literal",
            other.position(),
        )),
    }
}

fn bind_compare(left: &Node, right: &Node, comparator: Comparator) -> Result<BoundOperation> {
    Ok(BoundOperation::Compare {
        variable: bind_variable_ref(left)?,
        comparator,
        literal: bind_literal(right)?,
    })
}

fn bind_bit_mask(left: &Node, right: &Node, mode: BitMaskMode) -> Result<BoundOperation> {
    let variable = bind_variable_ref(left)?;
    let mask = match bind_literal(right)? {
        Literal::Number(n) if n.fract() == 0.0 => n as i64,
        _ => {
            return Err(HarpError::operation_syntax(
                "bit mask must be an integer literal",
                right.position(),
            ));
        }
    };
    Ok(BoundOperation::BitMask { variable, mode, mask })
}

fn bind_in(left: &Node, right: &Node, negate: bool) -> Result<BoundOperation> {
    let variable = bind_variable_ref(left)?;
    let literals = match right {
        Node::List { items, .. } => items.iter().map(bind_literal).collect::<Result<Vec<_>>>()?,
        other => {
            return Err(HarpError::operation_syntax(
                "expected a brace-enclosed list of literals",
                other.position(),
            ));
        }
    };
    Ok(BoundOperation::In { variable, negate, literals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn binds_keep_with_dimension_list_argument() {
        let ast = parse("keep(time,latitude)").unwrap();
        let pipeline = bind(&ast).unwrap();
        assert_eq!(pipeline.operations.len(), 1);
        match &pipeline.operations[0] {
            BoundOperation::Call { name, arguments } => {
                assert_eq!(name, "keep");
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_function_name() {
        let ast = parse("bogus(time)").unwrap();
        let err = bind(&ast).unwrap_err();
        assert!(matches!(err, HarpError::OperationSyntax { .. }));
    }

    #[test]
    fn rejects_wrong_arity() {
        let ast = parse("rename(a)").unwrap();
        let err = bind(&ast).unwrap_err();
        assert!(matches!(err, HarpError::OperationSyntax { .. }));
    }

    #[test]
    fn binds_comparison_with_quantity_literal() {
        let ast = parse("pressure >= 100.5[hPa]").unwrap();
        let pipeline = bind(&ast).unwrap();
        match &pipeline.operations[0] {
            BoundOperation::Compare { comparator, literal, .. } => {
                assert_eq!(*comparator, Comparator::Ge);
                assert_eq!(*literal, Literal::Quantity(100.5, "hPa".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn binds_qualified_name_dimensions() {
        let ast = parse("flag{time,latitude} in {1,2}").unwrap();
        let pipeline = bind(&ast).unwrap();
        match &pipeline.operations[0] {
            BoundOperation::In { variable, literals, negate } => {
                assert_eq!(variable.dimensions, vec![DimensionKind::Time, DimensionKind::Latitude]);
                assert_eq!(literals.len(), 2);
                assert!(!negate);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_dimension_kind() {
        let ast = parse("keep(bogus_dim)").unwrap();
        let err = bind(&ast).unwrap_err();
        assert!(matches!(err, HarpError::OperationSyntax { .. }));
    }

    #[test]
    fn bit_mask_requires_integer_literal() {
        let ast = parse("flags =& 4").unwrap();
        let pipeline = bind(&ast).unwrap();
        match &pipeline.operations[0] {
            BoundOperation::BitMask { mode, mask, .. } => {
                assert_eq!(*mode, BitMaskMode::Any);
                assert_eq!(*mask, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
