use std::fmt;

use crate::bytecode::ir::Image;
use crate::bytecode::op::{Opcode, Shape};
use crate::frontend::token::Register;

/// Operand of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Register),
    /// Immediate bits, zero-extended, with its width in bytes.
    Imm(u64, usize),
    /// Absolute address a relative jump lands on.
    Target(u64),
}

/// One instruction decoded from an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub op: Opcode,
    pub operands: Vec<Operand>,
    /// Encoded length in bytes.
    pub len: usize,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{}", r.name()),
            Operand::Imm(bits, width) => write!(f, "{:#0w$x}", bits, w = width * 2 + 2),
            Operand::Target(addr) => write!(f, "-> {:04x}", addr),
        }
    }
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op.name())?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}

/// Decodes the instruction starting at `addr`.
///
/// `None` wherever the VM would fault while decoding the same bytes.
pub fn decode(code: &[u8], addr: usize) -> Option<Decoded> {
    let op = Opcode::from_byte(*code.get(addr)?)?;
    let len = op.shape().encoded_len();
    let fields = code.get(addr + 1..addr.checked_add(len)?)?;

    let reg = |i: usize| fields.get(i).copied().and_then(Register::from_index).map(Operand::Reg);

    let operands = match op.shape() {
        Shape::None if op == Opcode::Igl => return None,
        Shape::None => Vec::new(),
        Shape::RegImm(width) => {
            let mut bits = [0u8; 8];
            bits[..width.bytes()].copy_from_slice(fields.get(1..)?);
            vec![reg(0)?, Operand::Imm(u64::from_le_bytes(bits), width.bytes())]
        }
        Shape::RegReg => vec![reg(0)?, reg(1)?],
        Shape::Rel => {
            let offset = i64::from_le_bytes(fields.try_into().ok()?);
            let next = (addr + len) as u64;
            vec![Operand::Target(next.wrapping_add_signed(offset))]
        }
    };

    Some(Decoded { op, operands, len })
}

/// Every address some decodable jump in `code` lands on.
fn jump_targets(code: &[u8]) -> Vec<u64> {
    let mut targets = Vec::new();
    let mut addr = 0;

    while let Some(ins) = decode(code, addr) {
        for operand in &ins.operands {
            if let Operand::Target(t) = operand {
                if !targets.contains(t) {
                    targets.push(*t);
                }
            }
        }
        addr += ins.len;
    }

    targets
}

/// Renders an image as one line per instruction, `addr  MNEMONIC operands`.
///
/// Procedure starts get a `name:` header and jump targets a `►` marker.
/// Output stops at the first byte that does not decode.
pub fn disassemble(image: &Image) -> String {
    let code = &image.code;
    let targets = jump_targets(code);
    let mut out = String::new();
    let mut addr = 0;

    while addr < code.len() {
        if let Some(name) = image.proc_at(addr as u64) {
            out.push_str(&format!("{}:\n", name));
        }

        let mark = if targets.contains(&(addr as u64)) { "►" } else { " " };

        match decode(code, addr) {
            Some(ins) => {
                out.push_str(&format!("{:04x} {} {}\n", addr, mark, ins));
                addr += ins.len;
            }
            None => {
                out.push_str(&format!("{:04x} {} .illegal {:#04x}\n", addr, mark, code[addr]));
                break;
            }
        }
    }

    out
}

/// Print disassembly of an image with a summary banner.
pub fn print_image(image: &Image) {
    println!("════════════════════════════════════════");
    println!(" image v{}", image.version);
    println!(" {} bytes, {} procedures", image.code.len(), image.procs.len());
    println!("════════════════════════════════════════");
    print!("{}", disassemble(image));
}
