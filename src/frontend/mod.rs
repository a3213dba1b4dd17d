pub mod ast;
pub mod dump;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod source;
pub mod token;
pub mod token_dumper;

pub use ast::{Instruction, Proc};
pub use source::{Diagnostic, Pos, Span, Unit};
