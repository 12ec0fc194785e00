//! Recursive-descent parser: operation string -> `Node::OperationList`.

use crate::ast::Node;
use crate::lexer::{Lexer, TokenKind};
use harp_core::error::{HarpError, Result};

pub fn parse(source: &str) -> Result<Node> {
    let mut parser = Parser {
        lexer: Lexer::new(source),
    };
    let list = parser.parse_operation_list()?;
    Ok(list)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    fn parse_operation_list(&mut self) -> Result<Node> {
        let position = self.lexer.peek().position;
        let mut items = vec![self.parse_operation()?];
        while self.lexer.peek().kind == TokenKind::Semicolon {
            self.lexer.consume();
            items.push(self.parse_operation()?);
        }
        self.expect(TokenKind::End)?;
        Ok(Node::OperationList { items, position })
    }

    fn parse_operation(&mut self) -> Result<Node> {
        if matches!(self.lexer.peek().kind, TokenKind::Name(_))
            && self.lexer.peek2().kind == TokenKind::LParen
        {
            self.parse_function_call()
        } else {
            self.parse_predicate()
        }
    }

    fn parse_function_call(&mut self) -> Result<Node> {
        let name_tok = self.lexer.consume();
        let name = match name_tok.kind {
            TokenKind::Name(n) => n,
            _ => unreachable!("caller checked for Name"),
        };
        let position = name_tok.position;
        let args_position = self.expect(TokenKind::LParen)?.position;

        let mut items = Vec::new();
        if self.lexer.peek().kind != TokenKind::RParen {
            items.push(self.parse_argument()?);
            while self.lexer.peek().kind == TokenKind::Comma {
                self.lexer.consume();
                items.push(self.parse_argument()?);
            }
        }
        self.expect(TokenKind::RParen)?;

        let arguments = Node::ArgumentList {
            items,
            position: args_position,
        };
        Ok(Node::FunctionCall {
            name,
            arguments: Box::new(arguments),
            position,
        })
    }

    fn parse_argument(&mut self) -> Result<Node> {
        match &self.lexer.peek().kind {
            TokenKind::Str(_) | TokenKind::Number(_) => self.parse_literal(),
            TokenKind::Name(_) => self.parse_variable_ref(),
            TokenKind::LBrace => self.parse_brace_group(),
            other => Err(HarpError::operation_syntax(
                format!("unexpected token '{other}' in argument list"),
                self.lexer.peek().position,
            )),
        }
    }

    /// `{a,b,c}`: a dimension list if every element is a bare name, a
    /// literal list otherwise.
    fn parse_brace_group(&mut self) -> Result<Node> {
        let position = self.expect(TokenKind::LBrace)?.position;
        let mut names = Vec::new();
        let mut literal_items = Vec::new();
        let mut all_names = true;

        loop {
            match self.lexer.peek().kind.clone() {
                TokenKind::Name(n) => {
                    let tok = self.lexer.consume();
                    names.push(n.clone());
                    literal_items.push(Node::Name {
                        value: n,
                        position: tok.position,
                    });
                }
                TokenKind::Str(_) | TokenKind::Number(_) => {
                    all_names = false;
                    literal_items.push(self.parse_literal()?);
                }
                TokenKind::RBrace => break,
                ref other => {
                    return Err(HarpError::operation_syntax(
                        format!("unexpected token '{other}' inside '{{...}}'"),
                        self.lexer.peek().position,
                    ));
                }
            }
            if self.lexer.peek().kind == TokenKind::Comma {
                self.lexer.consume();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        if all_names && !names.is_empty() {
            Ok(Node::DimensionList { items: names, position })
        } else {
            Ok(Node::List {
                items: literal_items,
                position,
            })
        }
    }

    fn parse_predicate(&mut self) -> Result<Node> {
        let var = self.parse_variable_ref()?;
        let position = var.position();

        match self.lexer.peek().kind.clone() {
            TokenKind::Eq => self.binary_literal(var, position, |left, right, position| {
                Node::Eq { left, right, position }
            }),
            TokenKind::Ne => self.binary_literal(var, position, |left, right, position| {
                Node::Ne { left, right, position }
            }),
            TokenKind::Lt => self.binary_literal(var, position, |left, right, position| {
                Node::Lt { left, right, position }
            }),
            TokenKind::Le => self.binary_literal(var, position, |left, right, position| {
                Node::Le { left, right, position }
            }),
            TokenKind::Gt => self.binary_literal(var, position, |left, right, position| {
                Node::Gt { left, right, position }
            }),
            TokenKind::Ge => self.binary_literal(var, position, |left, right, position| {
                Node::Ge { left, right, position }
            }),
            TokenKind::BitMaskAny => {
                self.binary_literal(var, position, |left, right, position| Node::BitMaskAny {
                    left,
                    right,
                    position,
                })
            }
            TokenKind::BitMaskNone => {
                self.binary_literal(var, position, |left, right, position| Node::BitMaskNone {
                    left,
                    right,
                    position,
                })
            }
            TokenKind::In => {
                self.lexer.consume();
                let right = self.parse_literal_list()?;
                Ok(Node::In {
                    left: Box::new(var),
                    right: Box::new(right),
                    position,
                })
            }
            TokenKind::Not => {
                self.lexer.consume();
                self.expect(TokenKind::In)?;
                let right = self.parse_literal_list()?;
                Ok(Node::NotIn {
                    left: Box::new(var),
                    right: Box::new(right),
                    position,
                })
            }
            other => Err(HarpError::operation_syntax(
                format!("expected a comparator, 'in', '!in', '=&' or '=|', found '{other}'"),
                self.lexer.peek().position,
            )),
        }
    }

    fn binary_literal(
        &mut self,
        left: Node,
        position: usize,
        build: impl FnOnce(Box<Node>, Box<Node>, usize) -> Node,
    ) -> Result<Node> {
        self.lexer.consume();
        let right = self.parse_literal()?;
        Ok(build(Box::new(left), Box::new(right), position))
    }

    fn parse_variable_ref(&mut self) -> Result<Node> {
        let name_tok = self.expect_name()?;
        let (name, position) = match name_tok.kind {
            TokenKind::Name(n) => (n, name_tok.position),
            _ => unreachable!("expect_name checked this"),
        };

        if self.lexer.peek().kind == TokenKind::LBrace {
            self.lexer.consume();
            let mut dimensions = Vec::new();
            loop {
                let dim_tok = self.expect_name()?;
                match dim_tok.kind {
                    TokenKind::Name(d) => dimensions.push(d),
                    _ => unreachable!(),
                }
                if self.lexer.peek().kind == TokenKind::Comma {
                    self.lexer.consume();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::RBrace)?;
            Ok(Node::QualifiedName {
                name,
                dimensions,
                position,
            })
        } else {
            Ok(Node::Name { value: name, position })
        }
    }

    fn parse_literal(&mut self) -> Result<Node> {
        let tok = self.lexer.consume();
        match tok.kind {
            TokenKind::Str(s) => Ok(Node::Str {
                value: s,
                position: tok.position,
            }),
            TokenKind::Number(n) => {
                if let TokenKind::Unit(_) = self.lexer.peek().kind.clone() {
                    let unit_tok = self.lexer.consume();
                    let unit = match unit_tok.kind {
                        TokenKind::Unit(u) => u,
                        _ => unreachable!(),
                    };
                    Ok(Node::Quantity {
                        number: n,
                        unit: Some(unit),
                        position: tok.position,
                    })
                } else {
                    Ok(Node::Number {
                        value: n,
                        position: tok.position,
                    })
                }
            }
            other => Err(HarpError::operation_syntax(
                format!("expected a literal (number or string), found '{other}'"),
                tok.position,
            )),
        }
    }

    fn parse_literal_list(&mut self) -> Result<Node> {
        let position = self.expect(TokenKind::LBrace)?.position;
        let mut items = vec![self.parse_literal()?];
        while self.lexer.peek().kind == TokenKind::Comma {
            self.lexer.consume();
            items.push(self.parse_literal()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Node::List { items, position })
    }

    fn expect(&mut self, kind: TokenKind) -> Result<crate::lexer::Token> {
        if self.lexer.peek().kind == kind {
            Ok(self.lexer.consume())
        } else {
            Err(HarpError::operation_syntax(
                format!("expected '{kind}', found '{}'", self.lexer.peek().kind),
                self.lexer.peek().position,
            ))
        }
    }

    fn expect_name(&mut self) -> Result<crate::lexer::Token> {
        if matches!(self.lexer.peek().kind, TokenKind::Name(_)) {
            Ok(self.lexer.consume())
        } else {
            Err(HarpError::operation_syntax(
                format!("expected a name, found '{}'", self.lexer.peek().kind),
                self.lexer.peek().position,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_call_with_dimension_list() {
        let ast = parse("squash(time)").unwrap();
        match ast {
            Node::OperationList { items, .. } => {
                assert_eq!(items.len(), 1);
                assert!(matches!(&items[0], Node::FunctionCall { name, .. } if name == "squash"));
            }
            _ => panic!("expected operation list"),
        }
    }

    #[test]
    fn parses_comparison_with_unit() {
        let ast = parse("pressure >= 100.5[hPa]").unwrap();
        match ast {
            Node::OperationList { items, .. } => match &items[0] {
                Node::Ge { left, right, .. } => {
                    assert!(matches!(**left, Node::Name { .. }));
                    assert!(matches!(**right, Node::Quantity { .. }));
                }
                other => panic!("unexpected node {other:?}"),
            },
            _ => panic!("expected operation list"),
        }
    }

    #[test]
    fn parses_in_list_and_qualified_name() {
        let ast = parse("flag{time} in {1,2,3}").unwrap();
        match ast {
            Node::OperationList { items, .. } => {
                assert!(matches!(&items[0], Node::In { .. }));
            }
            _ => panic!("expected operation list"),
        }
    }

    #[test]
    fn parses_multiple_operations_separated_by_semicolon() {
        let ast = parse("keep(time);pressure > 0[Pa]").unwrap();
        match ast {
            Node::OperationList { items, .. } => assert_eq!(items.len(), 2),
            _ => panic!("expected operation list"),
        }
    }

    #[test]
    fn reports_syntax_error_position() {
        let err = parse("pressure >= ").unwrap_err();
        match err {
            HarpError::OperationSyntax { position, .. } => assert_eq!(position, 12),
            other => panic!("expected OperationSyntax, got {other:?}"),
        }
    }

    #[test]
    fn not_in_requires_space_between_not_and_in() {
        let ast = parse("flag !in {1}").unwrap();
        match ast {
            Node::OperationList { items, .. } => assert!(matches!(&items[0], Node::NotIn { .. })),
            _ => panic!("expected operation list"),
        }
    }
}
