//! Sandboxed user motion functions: lexer, parser, bytecode compiler and a budgeted VM.

pub(crate) mod ast;
pub(crate) mod bytecode;
pub mod compile;
pub mod error;
pub(crate) mod lexer;
pub(crate) mod parser;
pub mod sandbox;
pub mod vm;
