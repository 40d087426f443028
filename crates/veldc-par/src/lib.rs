//! veldc-par - Parser for the Veld language.
//!
//! Consumes the token stream produced by `veldc-lex` and builds the AST
//! consumed by `veldc-sem`. The parser assigns every expression node a
//! unique [`ExprId`](ast::ExprId); the type checker keys its
//! expression-type table by those ids.

pub mod ast;
mod dump;
mod parser;

pub use dump::dump_ast;
pub use parser::parse;
