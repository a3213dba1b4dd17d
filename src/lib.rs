//! Assembler and bytecode VM for a small typed-register machine.
//!
//! `frontend` turns source text into procedures, `bytecode` encodes them into
//! an `Image`, and `runtime::Vm` executes the image's code.

pub mod bytecode;
pub mod frontend;
pub mod runtime;

use thiserror::Error;

use crate::bytecode::{CompileError, Image};
use crate::frontend::Unit;

#[derive(Debug, Error)]
pub enum AssembleError {
    /// Lexical or syntactic errors; the diagnostics are on the unit.
    #[error("{count} error(s) in {path}")]
    Syntax { path: String, count: usize },

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Scans, parses and encodes a unit.
///
/// Parsing is skipped when scanning reported errors. On `Syntax` the unit
/// holds the diagnostics for `Unit::render_diagnostics`.
pub fn assemble(unit: &mut Unit) -> Result<Image, AssembleError> {
    if !frontend::lexer::scan(unit) || !frontend::parser::parse(unit) {
        return Err(AssembleError::Syntax {
            path: unit.path.clone(),
            count: unit.errors.len(),
        });
    }
    Ok(bytecode::compile(unit)?)
}
