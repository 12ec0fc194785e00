//! Operation DSL: lexer, parser, algebraic AST and semantic binder for
//! HARP operation strings (`"keep(time);pressure > 100[hPa]"`).

pub mod ast;
pub mod binder;
pub mod lexer;
pub mod parser;

pub use ast::Node;
pub use binder::{bind, BitMaskMode, BoundArgument, BoundOperation, Comparator, Literal, Pipeline, VariableRef};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::parse;

use harp_core::error::Result;

/// Parse and bind an operation string in one call.
pub fn compile(source: &str) -> Result<Pipeline> {
    let ast = parse(source)?;
    bind(&ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_multi_operation_pipeline() {
        let pipeline = compile("keep(time,pressure);pressure >= 100[hPa]").unwrap();
        assert_eq!(pipeline.operations.len(), 2);
    }

    #[test]
    fn round_trips_through_display() {
        let ast = parse("pressure >= 100.5[hPa]").unwrap();
        let rendered = ast.to_string();
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(ast, reparsed);
    }

    #[test]
    fn surfaces_bind_time_syntax_errors() {
        let err = compile("bogus(time)").unwrap_err();
        assert!(matches!(err, harp_core::error::HarpError::OperationSyntax { .. }));
    }
}
