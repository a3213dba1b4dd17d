use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::ir::{Image, ProcEntry};
use crate::bytecode::op::{self, Opcode, Shape, Width};
use crate::frontend::ast::Instruction;
use crate::frontend::literal;
use crate::frontend::source::{Pos, Symbol, Unit};
use crate::frontend::token::{Family, Token, TokenKind, Ty, TypedOp};

/// Encodes the unit's parsed procedures into a flat bytecode image.
#[instrument(skip_all, fields(path = %unit.path))]
pub fn compile(unit: &Unit) -> Result<Image, CompileError> {
    Compiler::new(unit).compile()
}

/// Two-pass encoder.
///
/// The first pass lays out every procedure and records label addresses (labels
/// are scoped to their procedure); the second emits bytes. Every instruction
/// has a fixed encoded size, so forward references need no patching.
pub struct Compiler<'u> {
    unit: &'u Unit,
    image: Image,
    /// Label addresses, one table per procedure in `unit.procs` order.
    labels: Vec<HashMap<Symbol, u64>>,
}

impl<'u> Compiler<'u> {
    pub fn new(unit: &'u Unit) -> Self {
        Self {
            unit,
            image: Image::new(),
            labels: Vec::new(),
        }
    }

    pub fn compile(mut self) -> Result<Image, CompileError> {
        self.layout()?;

        let unit = self.unit;
        for (ix, proc) in unit.procs.iter().enumerate() {
            for ins in &proc.body {
                self.emit(ix, ins)?;
            }
        }

        debug!(
            bytes = self.image.code.len(),
            procs = self.image.procs.len(),
            "encoded"
        );
        Ok(self.image)
    }

    fn layout(&mut self) -> Result<(), CompileError> {
        let unit = self.unit;
        let mut addr: u64 = 0;

        for proc in &unit.procs {
            let name = unit.text(&proc.name);
            self.image.procs.push(ProcEntry {
                name: name.to_string(),
                offset: addr,
            });

            let mut labels = HashMap::new();
            for ins in &proc.body {
                if ins.family() == Some(Family::Label)
                    && labels.insert(ins.op.text, addr).is_some()
                {
                    return Err(CompileError::duplicate_label(
                        unit.text(&ins.op),
                        name,
                        ins.op.pos,
                    ));
                }
                addr += self.encoded_len(ins)? as u64;
            }

            trace!(proc = name, labels = labels.len(), "laid out");
            self.labels.push(labels);
        }

        Ok(())
    }

    fn encoded_len(&self, ins: &Instruction) -> Result<usize, CompileError> {
        let family = self.family(ins)?;
        Ok(match family {
            Family::Load(ty) => Shape::RegImm(width(ty)).encoded_len(),
            Family::Arithmetic(..) | Family::Compare(_) => Shape::RegReg.encoded_len(),
            Family::CondJump(..) => Shape::RegReg.encoded_len() + Shape::Rel.encoded_len(),
            Family::Jump => Shape::Rel.encoded_len(),
            Family::Label => 0,
            Family::Halt => Shape::None.encoded_len(),
        })
    }

    fn family(&self, ins: &Instruction) -> Result<Family, CompileError> {
        ins.family().ok_or_else(|| CompileError::Unsupported {
            text: self.unit.text(&ins.op).to_string(),
            pos: ins.op.pos,
        })
    }

    fn emit(&mut self, proc_ix: usize, ins: &Instruction) -> Result<(), CompileError> {
        match self.family(ins)? {
            Family::Load(ty) => {
                let dst = self.reg(ins.dst, ins.op.pos)?;
                let imm = self.immediate(ty, ins.src, ins.op.pos)?;
                self.push_op(Opcode::sized(op::LOAD, width(ty)));
                self.image.code.push(dst);
                self.image.code.extend_from_slice(&imm);
            }
            Family::Arithmetic(kind, ty) => {
                let group = match (kind, ty.is_signed()) {
                    (TypedOp::Add, _) => op::ADD,
                    (TypedOp::Sub, _) => op::SUB,
                    (TypedOp::Mul, true) => op::IMUL,
                    (TypedOp::Mul, false) => op::MUL,
                    (TypedOp::Div, true) => op::IDIV,
                    (TypedOp::Div, false) => op::DIV,
                    _ => return Err(self.unsupported(ins)),
                };
                self.reg_reg(Opcode::sized(group, width(ty)), ins)?;
            }
            Family::Compare(ty) => {
                self.reg_reg(compare_op(ty), ins)?;
            }
            Family::CondJump(kind, ty) => {
                let jump = match kind {
                    TypedOp::Je => Opcode::Je,
                    TypedOp::Jne => Opcode::Jne,
                    TypedOp::Jl => Opcode::Jl,
                    TypedOp::Jle => Opcode::Jle,
                    TypedOp::Jg => Opcode::Jg,
                    TypedOp::Jge => Opcode::Jge,
                    _ => return Err(self.unsupported(ins)),
                };
                self.reg_reg(compare_op(ty), ins)?;
                self.relative(jump, proc_ix, ins)?;
            }
            Family::Jump => {
                self.relative(Opcode::Jmp, proc_ix, ins)?;
            }
            Family::Label => {}
            Family::Halt => self.push_op(Opcode::Halt),
        }
        Ok(())
    }

    fn push_op(&mut self, op: Opcode) {
        self.image.code.push(op.byte());
    }

    fn unsupported(&self, ins: &Instruction) -> CompileError {
        CompileError::Unsupported {
            text: self.unit.text(&ins.op).to_string(),
            pos: ins.op.pos,
        }
    }

    fn reg_reg(&mut self, op: Opcode, ins: &Instruction) -> Result<(), CompileError> {
        let dst = self.reg(ins.dst, ins.op.pos)?;
        let src = self.reg(ins.src, ins.op.pos)?;
        self.push_op(op);
        self.image.code.extend_from_slice(&[dst, src]);
        Ok(())
    }

    /// Emits a jump whose offset is measured from the end of the offset field.
    fn relative(
        &mut self,
        op: Opcode,
        proc_ix: usize,
        ins: &Instruction,
    ) -> Result<(), CompileError> {
        let unit = self.unit;
        let label = ins
            .label
            .ok_or_else(|| CompileError::malformed("", ins.op.pos))?;
        let name = unit.text(&label);

        let target = self
            .labels
            .get(proc_ix)
            .and_then(|labels| labels.get(&label.text))
            .copied()
            .ok_or_else(|| {
                let proc = unit
                    .procs
                    .get(proc_ix)
                    .map(|p| unit.text(&p.name))
                    .unwrap_or_default();
                CompileError::undefined_label(name, proc, label.pos)
            })?;

        let next = (self.image.code.len() + Shape::Rel.encoded_len()) as u64;
        let out_of_range = || CompileError::JumpRange {
            name: name.to_string(),
            pos: label.pos,
        };
        let target = i64::try_from(target).map_err(|_| out_of_range())?;
        let next = i64::try_from(next).map_err(|_| out_of_range())?;

        self.push_op(op);
        self.image
            .code
            .extend_from_slice(&(target - next).to_le_bytes());
        Ok(())
    }

    fn reg(&self, token: Option<Token>, at: Pos) -> Result<u8, CompileError> {
        match token {
            Some(Token {
                kind: TokenKind::Reg(r),
                ..
            }) => Ok(r.index()),
            Some(t) => Err(CompileError::malformed(self.unit.text(&t), t.pos)),
            None => Err(CompileError::malformed("", at)),
        }
    }

    /// Little-endian bytes of a load constant, sized for `ty`.
    fn immediate(&self, ty: Ty, token: Option<Token>, at: Pos) -> Result<Vec<u8>, CompileError> {
        let token = token.ok_or_else(|| CompileError::malformed("", at))?;
        let text = self.unit.text(&token);
        let size = ty.bytes();

        match token.kind {
            TokenKind::Integer => {
                let value = literal::int_value(text)
                    .ok_or_else(|| CompileError::malformed(text, token.pos))?;

                // Accept anything representable as either the signed or the
                // unsigned type of this width.
                let bits = size as u32 * 8;
                let min = -(1i128 << (bits - 1));
                let max = (1i128 << bits) - 1;
                if value < min || value > max {
                    return Err(CompileError::OutOfRange {
                        text: text.to_string(),
                        ty,
                        pos: token.pos,
                    });
                }

                Ok(value.to_le_bytes()[..size].to_vec())
            }
            TokenKind::Float => {
                let value = literal::float_value(text)
                    .ok_or_else(|| CompileError::malformed(text, token.pos))?;
                match size {
                    4 => Ok((value as f32).to_le_bytes().to_vec()),
                    8 => Ok(value.to_le_bytes().to_vec()),
                    _ => Err(CompileError::FloatWidth {
                        text: text.to_string(),
                        ty,
                        pos: token.pos,
                    }),
                }
            }
            _ => Err(CompileError::malformed(text, token.pos)),
        }
    }
}

fn width(ty: Ty) -> Width {
    match ty {
        Ty::I8 | Ty::U8 => Width::W8,
        Ty::I16 | Ty::U16 => Width::W16,
        Ty::I32 | Ty::U32 => Width::W32,
        Ty::I64 | Ty::U64 => Width::W64,
    }
}

fn compare_op(ty: Ty) -> Opcode {
    let group = if ty.is_signed() { op::ICMP } else { op::CMP };
    Opcode::sized(group, width(ty))
}
