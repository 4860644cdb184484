//! Parsing
//!
//! This module is responsible for turning the source code from its string
//! form into an AST. The main interface is [parse] which takes a string and
//! produces an [ast::Program](crate::ast::Program).
//!
//! Internally, parsing works in two phases:
//! - the [lexer] scans the source text and turns it into a stream of tokens
//! - the [parser] generates the AST from these tokens
//!
//! Both phases are best-effort. The lexer never fails (unknown bytes become
//! illegal tokens), and the parser drops statements it cannot make sense of
//! while accumulating a [ParseError] for each. The returned program contains
//! everything that did parse, so callers can keep going with a partial
//! program if they choose to.

use miette::Diagnostic;
use thiserror::Error;

use crate::ast;

mod lexer;
mod parser;

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Expected `{expected}` but found `{found}`")]
    UnexpectedToken { expected: TokenKind, found: String },

    #[error("No expression can start with `{token}`")]
    #[diagnostic(help("Statements begin with `let`, `var`, `struct`, `return` or an expression"))]
    NoPrefixParse { token: String },

    #[error("Encountered an illegal character: `{literal}`")]
    IllegalToken { literal: String },

    #[error("The integer literal `{literal}` does not fit into a signed 64-bit value")]
    IntegerOutOfRange { literal: String },

    #[error("Only a plain identifier can be assigned to, not `{found}`")]
    InvalidAssignmentTarget { found: String },
}

/// Parse ManiT source code into an AST.
///
/// Returns the program together with every error encountered along the way.
/// An empty error list means the whole input parsed cleanly.
pub fn parse(source: &str) -> (ast::Program, Vec<ParseError>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    (program, parser.into_errors())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_program() {
        let src = r#"
            // a tiny program
            let data = [11, 22, 33];
            return data[1];
        "#;

        let (program, errors) = parse(src);
        assert!(errors.is_empty());
        assert_eq!(
            program.to_string(),
            "let data = [11, 22, 33];return (data[1]);"
        );
    }

    #[test]
    fn partial_program_survives_errors() {
        let (program, errors) = parse("struct { }; let x = 1;");
        assert!(!errors.is_empty());
        assert_eq!(
            program.statements.last().unwrap().to_string(),
            "let x = 1;"
        );
    }

    #[test]
    fn reserved_keywords_do_not_parse() {
        let (_, errors) = parse("try 1;");
        assert!(matches!(errors[0], ParseError::NoPrefixParse { .. }));
    }
}
