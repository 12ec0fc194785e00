//! The operation-string abstract syntax tree: a true algebraic enum,
//! one variant per node kind, each carrying its source position so
//! binder errors can point at the offending token.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Name { value: String, position: usize },
    QualifiedName { name: String, dimensions: Vec<String>, position: usize },
    Unit { value: String, position: usize },
    Str { value: String, position: usize },
    Number { value: f64, position: usize },
    Quantity { number: f64, unit: Option<String>, position: usize },
    List { items: Vec<Node>, position: usize },
    Eq { left: Box<Node>, right: Box<Node>, position: usize },
    Ne { left: Box<Node>, right: Box<Node>, position: usize },
    Lt { left: Box<Node>, right: Box<Node>, position: usize },
    Le { left: Box<Node>, right: Box<Node>, position: usize },
    Gt { left: Box<Node>, right: Box<Node>, position: usize },
    Ge { left: Box<Node>, right: Box<Node>, position: usize },
    BitMaskAny { left: Box<Node>, right: Box<Node>, position: usize },
    BitMaskNone { left: Box<Node>, right: Box<Node>, position: usize },
    In { left: Box<Node>, right: Box<Node>, position: usize },
    NotIn { left: Box<Node>, right: Box<Node>, position: usize },
    FunctionCall { name: String, arguments: Box<Node>, position: usize },
    ArgumentList { items: Vec<Node>, position: usize },
    DimensionList { items: Vec<String>, position: usize },
    OperationList { items: Vec<Node>, position: usize },
}

impl Node {
    pub fn position(&self) -> usize {
        match self {
            Node::Name { position, .. }
            | Node::QualifiedName { position, .. }
            | Node::Unit { position, .. }
            | Node::Str { position, .. }
            | Node::Number { position, .. }
            | Node::Quantity { position, .. }
            | Node::List { position, .. }
            | Node::Eq { position, .. }
            | Node::Ne { position, .. }
            | Node::Lt { position, .. }
            | Node::Le { position, .. }
            | Node::Gt { position, .. }
            | Node::Ge { position, .. }
            | Node::BitMaskAny { position, .. }
            | Node::BitMaskNone { position, .. }
            | Node::In { position, .. }
            | Node::NotIn { position, .. }
            | Node::FunctionCall { position, .. }
            | Node::ArgumentList { position, .. }
            | Node::DimensionList { position, .. }
            | Node::OperationList { position, .. } => *position,
        }
    }
}

/// Pretty-printer used both for diagnostics and the round-trip
/// testable property: parsing `node.to_string()` yields an
/// equivalent AST.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Name { value, .. } => write!(f, "{value}"),
            Node::QualifiedName { name, dimensions, .. } => {
                write!(f, "{name}{{{}}}", dimensions.join(","))
            }
            Node::Unit { value, .. } => write!(f, "[{value}]"),
            Node::Str { value, .. } => write!(f, "\"{value}\""),
            Node::Number { value, .. } => write!(f, "{}", format_number(*value)),
            Node::Quantity { number, unit, .. } => match unit {
                Some(u) => write!(f, "{}[{u}]", format_number(*number)),
                None => write!(f, "{}", format_number(*number)),
            },
            Node::List { items, .. } => {
                write!(f, "{{")?;
                write_joined(f, items)?;
                write!(f, "}}")
            }
            Node::Eq { left, right, .. } => write!(f, "{left} == {right}"),
            Node::Ne { left, right, .. } => write!(f, "{left} != {right}"),
            Node::Lt { left, right, .. } => write!(f, "{left} < {right}"),
            Node::Le { left, right, .. } => write!(f, "{left} <= {right}"),
            Node::Gt { left, right, .. } => write!(f, "{left} > {right}"),
            Node::Ge { left, right, .. } => write!(f, "{left} >= {right}"),
            Node::BitMaskAny { left, right, .. } => write!(f, "{left} =& {right}"),
            Node::BitMaskNone { left, right, .. } => write!(f, "{left} =| {right}"),
            Node::In { left, right, .. } => write!(f, "{left} in {right}"),
            Node::NotIn { left, right, .. } => write!(f, "{left} ! in {right}"),
            Node::FunctionCall { name, arguments, .. } => write!(f, "{name}{arguments}"),
            Node::ArgumentList { items, .. } => {
                write!(f, "(")?;
                write_joined(f, items)?;
                write!(f, ")")
            }
            Node::DimensionList { items, .. } => write!(f, "{{{}}}", items.join(",")),
            Node::OperationList { items, .. } => {
                let rendered: Vec<String> = items.iter().map(|n| n.to_string()).collect();
                write!(f, "{}", rendered.join(";"))
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
