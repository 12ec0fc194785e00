//! Tokenizer for operation strings: a fixed set of token kinds, each
//! carrying the byte offset it started at.

use std::fmt;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Str(String),
    Unit(String),
    Number(f64),
    /// Reserved for future keywords; `in` already has its own kind.
    Keyword(String),
    Name(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitMaskAny,
    BitMaskNone,
    Not,
    In,
    End,
    Unknown(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::Unit(u) => write!(f, "[{u}]"),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Keyword(k) => write!(f, "{k}"),
            TokenKind::Name(n) => write!(f, "{n}"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Eq => write!(f, "=="),
            TokenKind::Ne => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Le => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Ge => write!(f, ">="),
            TokenKind::BitMaskAny => write!(f, "=&"),
            TokenKind::BitMaskNone => write!(f, "=|"),
            TokenKind::Not => write!(f, "!"),
            TokenKind::In => write!(f, "in"),
            TokenKind::End => write!(f, "<end>"),
            TokenKind::Unknown(c) => write!(f, "<unknown '{c}'>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Two-token-lookahead tokenizer over an operation string.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<CharIndices<'a>>,
    lookahead: [Option<Token>; 2],
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        let mut lexer = Lexer {
            source,
            chars: source.char_indices().peekable(),
            lookahead: [None, None],
        };
        lexer.lookahead[0] = Some(lexer.scan());
        lexer.lookahead[1] = Some(lexer.scan());
        lexer
    }

    pub fn at_end(&self) -> bool {
        matches!(self.lookahead[0], Some(Token { kind: TokenKind::End, .. }))
    }

    pub fn peek(&self) -> &Token {
        self.lookahead[0].as_ref().expect("lexer always holds a lookahead token")
    }

    pub fn peek2(&self) -> &Token {
        self.lookahead[1].as_ref().expect("lexer always holds a lookahead token")
    }

    pub fn consume(&mut self) -> Token {
        let next = self.scan();
        let consumed = self.lookahead[0].take().expect("lexer always holds a lookahead token");
        self.lookahead[0] = self.lookahead[1].take();
        self.lookahead[1] = Some(next);
        consumed
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn scan(&mut self) -> Token {
        self.skip_whitespace();
        let Some(&(start, c)) = self.chars.peek() else {
            return Token {
                kind: TokenKind::End,
                position: self.source.len(),
            };
        };

        let kind = match c {
            '(' => {
                self.chars.next();
                TokenKind::LParen
            }
            ')' => {
                self.chars.next();
                TokenKind::RParen
            }
            '{' => {
                self.chars.next();
                TokenKind::LBrace
            }
            '}' => {
                self.chars.next();
                TokenKind::RBrace
            }
            ',' => {
                self.chars.next();
                TokenKind::Comma
            }
            ';' => {
                self.chars.next();
                TokenKind::Semicolon
            }
            '!' => {
                self.chars.next();
                if self.eat_if('=') {
                    TokenKind::Ne
                } else {
                    TokenKind::Not
                }
            }
            '=' => {
                self.chars.next();
                if self.eat_if('=') {
                    TokenKind::Eq
                } else if self.eat_if('&') {
                    TokenKind::BitMaskAny
                } else if self.eat_if('|') {
                    TokenKind::BitMaskNone
                } else {
                    TokenKind::Unknown('=')
                }
            }
            '<' => {
                self.chars.next();
                if self.eat_if('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.chars.next();
                if self.eat_if('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '"' | '\'' => self.scan_string(c),
            '[' => self.scan_unit(),
            '0'..='9' | '+' | '-' => self.scan_number(start),
            c if c == '_' || c.is_alphabetic() => self.scan_name(),
            other => {
                self.chars.next();
                TokenKind::Unknown(other)
            }
        };

        Token { kind, position: start }
    }

    fn eat_if(&mut self, expected: char) -> bool {
        if let Some(&(_, c)) = self.chars.peek() {
            if c == expected {
                self.chars.next();
                return true;
            }
        }
        false
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        self.chars.next(); // opening quote
        let mut s = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == quote {
                return TokenKind::Str(s);
            }
            s.push(c);
        }
        // unterminated string: report as unknown at the opening quote
        TokenKind::Unknown(quote)
    }

    fn scan_unit(&mut self) -> TokenKind {
        self.chars.next(); // '['
        let mut s = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == ']' {
                return TokenKind::Unit(s);
            }
            s.push(c);
        }
        TokenKind::Unknown('[')
    }

    fn scan_number(&mut self, start: usize) -> TokenKind {
        let mut end = start;
        if let Some(&(i, c)) = self.chars.peek() {
            if c == '+' || c == '-' {
                end = i + c.len_utf8();
                self.chars.next();
            }
        }
        let mut saw_digit = false;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                saw_digit = true;
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        if let Some(&(i, '.')) = self.chars.peek() {
            end = i + 1;
            self.chars.next();
            while let Some(&(i, c)) = self.chars.peek() {
                if c.is_ascii_digit() {
                    saw_digit = true;
                    end = i + c.len_utf8();
                    self.chars.next();
                } else {
                    break;
                }
            }
        }
        if let Some(&(_, e)) = self.chars.peek() {
            if saw_digit && (e == 'e' || e == 'E') {
                let mut lookahead_end = end;
                let mut iter = self.chars.clone();
                iter.next(); // consume 'e'/'E'
                lookahead_end += 1;
                if let Some(&(_, sign)) = iter.peek() {
                    if sign == '+' || sign == '-' {
                        lookahead_end += 1;
                        iter.next();
                    }
                }
                let mut has_exp_digit = false;
                while let Some(&(i, c)) = iter.peek() {
                    if c.is_ascii_digit() {
                        has_exp_digit = true;
                        lookahead_end = i + 1;
                        iter.next();
                    } else {
                        break;
                    }
                }
                if has_exp_digit {
                    end = lookahead_end;
                    self.chars = iter;
                }
            }
        }

        if !saw_digit {
            return TokenKind::Unknown(self.source[start..].chars().next().unwrap_or('?'));
        }
        match self.source[start..end].parse::<f64>() {
            Ok(value) => TokenKind::Number(value),
            Err(_) => TokenKind::Unknown(self.source[start..].chars().next().unwrap_or('?')),
        }
    }

    fn scan_name(&mut self) -> TokenKind {
        let start = self.chars.peek().map(|&(i, _)| i).unwrap_or(0);
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.source[start..end];
        if text == "in" {
            TokenKind::In
        } else {
            TokenKind::Name(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.consume();
            if tok.kind == TokenKind::End {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn tokenizes_function_call() {
        let toks = kinds("keep(time)");
        assert_eq!(
            toks,
            vec![
                TokenKind::Name("keep".into()),
                TokenKind::LParen,
                TokenKind::Name("time".into()),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn tokenizes_quantity_and_comparator() {
        let toks = kinds("pressure >= 100.5[hPa]");
        assert_eq!(
            toks,
            vec![
                TokenKind::Name("pressure".into()),
                TokenKind::Ge,
                TokenKind::Number(100.5),
                TokenKind::Unit("hPa".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_negative_exponent_number() {
        let toks = kinds("x == -1.5e-3");
        assert_eq!(
            toks,
            vec![TokenKind::Name("x".into()), TokenKind::Eq, TokenKind::Number(-1.5e-3)]
        );
    }

    #[test]
    fn peek_and_peek2_do_not_consume() {
        let lexer = Lexer::new("a , b");
        assert_eq!(lexer.peek().kind, TokenKind::Name("a".into()));
        assert_eq!(lexer.peek2().kind, TokenKind::Comma);
        assert_eq!(lexer.peek().kind, TokenKind::Name("a".into()));
    }

    #[test]
    fn unknown_token_reports_position() {
        let toks: Vec<Token> = {
            let mut lexer = Lexer::new("x == @");
            let mut out = Vec::new();
            loop {
                let tok = lexer.consume();
                if tok.kind == TokenKind::End {
                    break;
                }
                out.push(tok);
            }
            out
        };
        let last = toks.last().unwrap();
        assert_eq!(last.kind, TokenKind::Unknown('@'));
        assert_eq!(last.position, 5);
    }

    #[test]
    fn bit_mask_tokens() {
        let toks = kinds("flags =& 4");
        assert_eq!(
            toks,
            vec![
                TokenKind::Name("flags".into()),
                TokenKind::BitMaskAny,
                TokenKind::Number(4.0),
            ]
        );
    }
}
