use thiserror::Error;

use crate::frontend::source::Pos;
use crate::frontend::token::Ty;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A jump names a label that its procedure never defines
    #[error("{pos}: undefined label '{name}' in procedure '{proc}'")]
    UndefinedLabel {
        name: String,
        proc: String,
        pos: Pos,
    },

    /// The same label defined twice in one procedure
    #[error("{pos}: label '{name}' is already defined in procedure '{proc}'")]
    DuplicateLabel {
        name: String,
        proc: String,
        pos: Pos,
    },

    /// Integer constant outside both the signed and unsigned range of the width
    #[error("{pos}: constant '{text}' does not fit in {ty}")]
    OutOfRange { text: String, ty: Ty, pos: Pos },

    /// Float constants only load into 32- and 64-bit registers
    #[error("{pos}: float constant '{text}' cannot be loaded as {ty}")]
    FloatWidth { text: String, ty: Ty, pos: Pos },

    /// Operand token missing or of the wrong kind for its position
    #[error("{pos}: malformed operand '{text}'")]
    Malformed { text: String, pos: Pos },

    /// Token in opcode position that starts no instruction
    #[error("{pos}: '{text}' is not an instruction")]
    Unsupported { text: String, pos: Pos },

    /// A label lies outside the addressable range of a relative jump
    #[error("{pos}: jump to '{name}' is out of range")]
    JumpRange { name: String, pos: Pos },
}

impl CompileError {
    pub fn undefined_label(name: &str, proc: &str, pos: Pos) -> Self {
        CompileError::UndefinedLabel {
            name: name.to_string(),
            proc: proc.to_string(),
            pos,
        }
    }

    pub fn duplicate_label(name: &str, proc: &str, pos: Pos) -> Self {
        CompileError::DuplicateLabel {
            name: name.to_string(),
            proc: proc.to_string(),
            pos,
        }
    }

    pub fn malformed(text: &str, pos: Pos) -> Self {
        CompileError::Malformed {
            text: text.to_string(),
            pos,
        }
    }

    /// Position in the source the error points at.
    pub fn pos(&self) -> Pos {
        match self {
            CompileError::UndefinedLabel { pos, .. }
            | CompileError::DuplicateLabel { pos, .. }
            | CompileError::OutOfRange { pos, .. }
            | CompileError::FloatWidth { pos, .. }
            | CompileError::Malformed { pos, .. }
            | CompileError::Unsupported { pos, .. }
            | CompileError::JumpRange { pos, .. } => *pos,
        }
    }
}
