use crate::frontend::token::{Family, Token};

/// One parsed instruction.
///
/// Which operands are present follows from `op.kind.family()`:
/// - load, arithmetic, compare: `dst`, `src`
/// - conditional jump: `dst`, `src`, `label`
/// - `jmp`: `label`
/// - label definition: none (the label name is `op` itself)
/// - `halt`: none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Token,
    pub dst: Option<Token>,
    pub src: Option<Token>,
    pub label: Option<Token>,
}

impl Instruction {
    pub fn new(op: Token) -> Self {
        Instruction {
            op,
            dst: None,
            src: None,
            label: None,
        }
    }

    pub fn family(&self) -> Option<Family> {
        self.op.kind.family()
    }
}

/// A named, flat block of instructions: `proc <name> ... end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proc {
    pub name: Token,
    pub body: Vec<Instruction>,
}
