// =============================================================================
// OPCODE - 1-byte instruction codes
// =============================================================================

/// Operand width of a sized opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }
}

/// Encoded operands following an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    None,
    /// register index, then a little-endian immediate
    RegImm(Width),
    /// two register indices
    RegReg,
    /// 8-byte little-endian signed offset relative to the next instruction
    Rel,
}

impl Shape {
    /// Encoded length including the opcode byte.
    pub fn encoded_len(self) -> usize {
        match self {
            Shape::None => 1,
            Shape::RegImm(w) => 2 + w.bytes(),
            Shape::RegReg => 3,
            Shape::Rel => 9,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Explicitly illegal; always faults.
    Igl = 0,

    Load8,
    Load16,
    Load32,
    Load64,

    // unsigned (and sign-agnostic) arithmetic
    Add8,
    Add16,
    Add32,
    Add64,
    Sub8,
    Sub16,
    Sub32,
    Sub64,
    Mul8,
    Mul16,
    Mul32,
    Mul64,
    Div8,
    Div16,
    Div32,
    Div64,

    // signed arithmetic
    Imul8,
    Imul16,
    Imul32,
    Imul64,
    Idiv8,
    Idiv16,
    Idiv32,
    Idiv64,

    // comparison
    Cmp8,
    Cmp16,
    Cmp32,
    Cmp64,
    Icmp8,
    Icmp16,
    Icmp32,
    Icmp64,

    // control flow
    Jmp,
    Je,
    Jne,
    Jl,
    Jle,
    Jg,
    Jge,

    Halt,
}

use Opcode::*;

pub const LOAD: [Opcode; 4] = [Load8, Load16, Load32, Load64];
pub const ADD: [Opcode; 4] = [Add8, Add16, Add32, Add64];
pub const SUB: [Opcode; 4] = [Sub8, Sub16, Sub32, Sub64];
pub const MUL: [Opcode; 4] = [Mul8, Mul16, Mul32, Mul64];
pub const DIV: [Opcode; 4] = [Div8, Div16, Div32, Div64];
pub const IMUL: [Opcode; 4] = [Imul8, Imul16, Imul32, Imul64];
pub const IDIV: [Opcode; 4] = [Idiv8, Idiv16, Idiv32, Idiv64];
pub const CMP: [Opcode; 4] = [Cmp8, Cmp16, Cmp32, Cmp64];
pub const ICMP: [Opcode; 4] = [Icmp8, Icmp16, Icmp32, Icmp64];

impl Opcode {
    /// Every opcode, indexed by its byte value.
    pub const ALL: [Opcode; 45] = [
        Igl, Load8, Load16, Load32, Load64, Add8, Add16, Add32, Add64, Sub8, Sub16, Sub32, Sub64,
        Mul8, Mul16, Mul32, Mul64, Div8, Div16, Div32, Div64, Imul8, Imul16, Imul32, Imul64,
        Idiv8, Idiv16, Idiv32, Idiv64, Cmp8, Cmp16, Cmp32, Cmp64, Icmp8, Icmp16, Icmp32, Icmp64,
        Jmp, Je, Jne, Jl, Jle, Jg, Jge, Halt,
    ];

    /// Picks the member of a width group (`LOAD`, `ADD`, ...).
    pub fn sized(group: [Opcode; 4], width: Width) -> Opcode {
        group[width as usize]
    }

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Self::ALL.get(byte as usize).copied()
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn shape(self) -> Shape {
        match self {
            Load8 => Shape::RegImm(Width::W8),
            Load16 => Shape::RegImm(Width::W16),
            Load32 => Shape::RegImm(Width::W32),
            Load64 => Shape::RegImm(Width::W64),
            Jmp | Je | Jne | Jl | Jle | Jg | Jge => Shape::Rel,
            Igl | Halt => Shape::None,
            _ => Shape::RegReg,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Igl => "IGL",
            Load8 => "LOAD8",
            Load16 => "LOAD16",
            Load32 => "LOAD32",
            Load64 => "LOAD64",
            Add8 => "ADD8",
            Add16 => "ADD16",
            Add32 => "ADD32",
            Add64 => "ADD64",
            Sub8 => "SUB8",
            Sub16 => "SUB16",
            Sub32 => "SUB32",
            Sub64 => "SUB64",
            Mul8 => "MUL8",
            Mul16 => "MUL16",
            Mul32 => "MUL32",
            Mul64 => "MUL64",
            Div8 => "DIV8",
            Div16 => "DIV16",
            Div32 => "DIV32",
            Div64 => "DIV64",
            Imul8 => "IMUL8",
            Imul16 => "IMUL16",
            Imul32 => "IMUL32",
            Imul64 => "IMUL64",
            Idiv8 => "IDIV8",
            Idiv16 => "IDIV16",
            Idiv32 => "IDIV32",
            Idiv64 => "IDIV64",
            Cmp8 => "CMP8",
            Cmp16 => "CMP16",
            Cmp32 => "CMP32",
            Cmp64 => "CMP64",
            Icmp8 => "ICMP8",
            Icmp16 => "ICMP16",
            Icmp32 => "ICMP32",
            Icmp64 => "ICMP64",
            Jmp => "JMP",
            Je => "JE",
            Jne => "JNE",
            Jl => "JL",
            Jle => "JLE",
            Jg => "JG",
            Jge => "JGE",
            Halt => "HALT",
        }
    }
}
