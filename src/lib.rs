//! manit
//!
//! An ahead-of-time compiler for the ManiT language. Source text runs
//! through a linear pipeline:
//!
//! - [parsing] scans and parses the text into an [ast::Program]
//! - [codegen] lowers the AST to an LLVM module and verifies it
//!
//! The driver binary prints the resulting textual IR module on stdout for
//! an external optimizer/backend to pick up. Every stage is best-effort:
//! what cannot be parsed or lowered is reported and skipped, and the module
//! verifier has the last word.

pub mod ast;
pub mod codegen;
pub mod parsing;

pub use codegen::compile;
pub use parsing::parse;
