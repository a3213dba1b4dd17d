use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::frontend::source::{Pos, Span, Symbol};

/// Integer type named by a mnemonic prefix (`i32_add`, `u8_load`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl Ty {
    pub const ALL: [Ty; 8] = [
        Ty::I8,
        Ty::I16,
        Ty::I32,
        Ty::I64,
        Ty::U8,
        Ty::U16,
        Ty::U32,
        Ty::U64,
    ];

    /// Width of the type in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Ty::I8 | Ty::U8 => 1,
            Ty::I16 | Ty::U16 => 2,
            Ty::I32 | Ty::U32 => 4,
            Ty::I64 | Ty::U64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Ty::I8 | Ty::I16 | Ty::I32 | Ty::I64)
    }

    pub fn name(self) -> &'static str {
        match self {
            Ty::I8 => "i8",
            Ty::I16 => "i16",
            Ty::I32 => "i32",
            Ty::I64 => "i64",
            Ty::U8 => "u8",
            Ty::U16 => "u16",
            Ty::U32 => "u32",
            Ty::U64 => "u64",
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operation half of a typed mnemonic. Row order matches `TYPED_NAMES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedOp {
    Load,
    Add,
    Sub,
    Mul,
    Div,
    Cmp,
    Je,
    Jne,
    Jl,
    Jle,
    Jg,
    Jge,
}

impl TypedOp {
    pub const ALL: [TypedOp; 12] = [
        TypedOp::Load,
        TypedOp::Add,
        TypedOp::Sub,
        TypedOp::Mul,
        TypedOp::Div,
        TypedOp::Cmp,
        TypedOp::Je,
        TypedOp::Jne,
        TypedOp::Jl,
        TypedOp::Jle,
        TypedOp::Jg,
        TypedOp::Jge,
    ];
}

// Rows follow `TypedOp`, columns follow `Ty`.
const TYPED_NAMES: [[&str; 8]; 12] = [
    [
        "i8_load", "i16_load", "i32_load", "i64_load", "u8_load", "u16_load", "u32_load",
        "u64_load",
    ],
    [
        "i8_add", "i16_add", "i32_add", "i64_add", "u8_add", "u16_add", "u32_add", "u64_add",
    ],
    [
        "i8_sub", "i16_sub", "i32_sub", "i64_sub", "u8_sub", "u16_sub", "u32_sub", "u64_sub",
    ],
    [
        "i8_mul", "i16_mul", "i32_mul", "i64_mul", "u8_mul", "u16_mul", "u32_mul", "u64_mul",
    ],
    [
        "i8_div", "i16_div", "i32_div", "i64_div", "u8_div", "u16_div", "u32_div", "u64_div",
    ],
    [
        "i8_cmp", "i16_cmp", "i32_cmp", "i64_cmp", "u8_cmp", "u16_cmp", "u32_cmp", "u64_cmp",
    ],
    [
        "i8_je", "i16_je", "i32_je", "i64_je", "u8_je", "u16_je", "u32_je", "u64_je",
    ],
    [
        "i8_jne", "i16_jne", "i32_jne", "i64_jne", "u8_jne", "u16_jne", "u32_jne", "u64_jne",
    ],
    [
        "i8_jl", "i16_jl", "i32_jl", "i64_jl", "u8_jl", "u16_jl", "u32_jl", "u64_jl",
    ],
    [
        "i8_jle", "i16_jle", "i32_jle", "i64_jle", "u8_jle", "u16_jle", "u32_jle", "u64_jle",
    ],
    [
        "i8_jg", "i16_jg", "i32_jg", "i64_jg", "u8_jg", "u16_jg", "u32_jg", "u64_jg",
    ],
    [
        "i8_jge", "i16_jge", "i32_jge", "i64_jge", "u8_jge", "u16_jge", "u32_jge", "u64_jge",
    ],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Typed(TypedOp, Ty),
    Jmp,
    Halt,
}

impl Mnemonic {
    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Typed(op, ty) => TYPED_NAMES[op as usize][ty as usize],
            Mnemonic::Jmp => "jmp",
            Mnemonic::Halt => "halt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    Ip,
}

impl Register {
    pub const ALL: [Register; 9] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
        Register::Ip,
    ];

    /// Register-file slot; general-purpose registers first, `ip` last.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Register> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::R0 => "r0",
            Register::R1 => "r1",
            Register::R2 => "r2",
            Register::R3 => "r3",
            Register::R4 => "r4",
            Register::R5 => "r5",
            Register::R6 => "r6",
            Register::R7 => "r7",
            Register::Ip => "ip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Integer,
    Float,
    Colon,
    Proc,
    End,
    Op(Mnemonic),
    Reg(Register),
}

/// Operand shape shared by a group of mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// `op dst constant`
    Load(Ty),
    /// `op dst src`
    Arithmetic(TypedOp, Ty),
    /// `op dst src`
    Compare(Ty),
    /// `op dst src label`
    CondJump(TypedOp, Ty),
    /// `jmp label`
    Jump,
    /// `name:`
    Label,
    /// `halt`
    Halt,
}

impl TokenKind {
    /// Classifies a token sitting in opcode position. `None` means the token
    /// cannot start an instruction.
    pub fn family(self) -> Option<Family> {
        match self {
            TokenKind::Ident => Some(Family::Label),
            TokenKind::Op(Mnemonic::Jmp) => Some(Family::Jump),
            TokenKind::Op(Mnemonic::Halt) => Some(Family::Halt),
            TokenKind::Op(Mnemonic::Typed(op, ty)) => Some(match op {
                TypedOp::Load => Family::Load(ty),
                TypedOp::Add | TypedOp::Sub | TypedOp::Mul | TypedOp::Div => {
                    Family::Arithmetic(op, ty)
                }
                TypedOp::Cmp => Family::Compare(ty),
                TypedOp::Je
                | TypedOp::Jne
                | TypedOp::Jl
                | TypedOp::Jle
                | TypedOp::Jg
                | TypedOp::Jge => Family::CondJump(op, ty),
            }),
            _ => None,
        }
    }

    pub fn is_register(self) -> bool {
        matches!(self, TokenKind::Reg(_))
    }

    pub fn is_constant(self) -> bool {
        matches!(self, TokenKind::Integer | TokenKind::Float)
    }

    /// Canonical spelling, used by keyword recognition and diagnostics alike.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Ident => "<identifier>",
            TokenKind::Integer => "<integer>",
            TokenKind::Float => "<float>",
            TokenKind::Colon => ":",
            TokenKind::Proc => "proc",
            TokenKind::End => "end",
            TokenKind::Op(m) => m.name(),
            TokenKind::Reg(r) => r.name(),
        }
    }

    fn keywords() -> impl Iterator<Item = TokenKind> {
        let typed = TypedOp::ALL.into_iter().flat_map(|op| {
            Ty::ALL
                .into_iter()
                .map(move |ty| TokenKind::Op(Mnemonic::Typed(op, ty)))
        });

        [
            TokenKind::Proc,
            TokenKind::End,
            TokenKind::Op(Mnemonic::Jmp),
            TokenKind::Op(Mnemonic::Halt),
        ]
        .into_iter()
        .chain(Register::ALL.into_iter().map(TokenKind::Reg))
        .chain(typed)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opcode-style spellings of the compare family: `cmp<w>` compares unsigned,
/// `icmp<w>` signed.
const COMPARE_ALIASES: [(&str, Ty); 8] = [
    ("cmp8", Ty::U8),
    ("cmp16", Ty::U16),
    ("cmp32", Ty::U32),
    ("cmp64", Ty::U64),
    ("icmp8", Ty::I8),
    ("icmp16", Ty::I16),
    ("icmp32", Ty::I32),
    ("icmp64", Ty::I64),
];

static KEYWORDS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    let aliases = COMPARE_ALIASES
        .into_iter()
        .map(|(name, ty)| (name, TokenKind::Op(Mnemonic::Typed(TypedOp::Cmp, ty))));

    TokenKind::keywords()
        .map(|k| (k.name(), k))
        .chain(aliases)
        .collect()
});

/// Case-insensitive keyword lookup.
pub fn keyword(text: &str) -> Option<TokenKind> {
    KEYWORDS.get(text.to_lowercase().as_str()).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Symbol,
    pub pos: Pos,
    pub span: Span,
}
