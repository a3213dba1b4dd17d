use thiserror::Error;

use crate::bytecode::op::Opcode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The machine entered the error state. `byte` is the opcode byte at `ip`,
    /// or `None` when `ip` was past the end of the code.
    #[error("machine fault at {ip:#06x}: {}", fault_detail(.byte))]
    Fault { ip: u64, byte: Option<u8> },

    #[error("execution step limit exceeded ({limit})")]
    StepLimit { limit: u64 },
}

fn fault_detail(byte: &Option<u8>) -> String {
    match byte.map(|b| (b, Opcode::from_byte(b))) {
        None => "ran past the end of the code".to_string(),
        Some((b, None | Some(Opcode::Igl))) => format!("illegal opcode {:#04x}", b),
        Some((_, Some(op))) => format!("{} failed", op.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = RuntimeError::Fault {
            ip: 0x1c,
            byte: Some(0xee),
        };
        assert_eq!(err.to_string(), "machine fault at 0x001c: illegal opcode 0xee");

        let err = RuntimeError::Fault {
            ip: 3,
            byte: Some(Opcode::Div8.byte()),
        };
        assert_eq!(err.to_string(), "machine fault at 0x0003: DIV8 failed");

        let err = RuntimeError::Fault { ip: 9, byte: None };
        assert_eq!(
            err.to_string(),
            "machine fault at 0x0009: ran past the end of the code"
        );

        assert_eq!(
            RuntimeError::StepLimit { limit: 10 }.to_string(),
            "execution step limit exceeded (10)"
        );
    }
}
