use tracing::{debug, instrument};

use crate::frontend::ast::{Instruction, Proc};
use crate::frontend::source::{Pos, Span, Unit};
use crate::frontend::token::{Family, Token, TokenKind};

/// Parses the unit's token buffer into `unit.procs`.
///
/// Procedures are admitted until the input runs out or a procedure finishes
/// with errors on the unit; there is no recovery past the first failing
/// procedure. Returns `true` when no error has been recorded.
#[instrument(skip_all, fields(path = %unit.path))]
pub fn parse(unit: &mut Unit) -> bool {
    let mut parser = Parser::new(unit);

    while !parser.at_end() {
        let proc = parser.parse_proc();
        if parser.unit.has_errors() {
            break;
        }
        if let Ok(proc) = proc {
            parser.unit.procs.push(proc);
        }
    }

    debug!(procs = unit.procs.len(), errors = unit.errors.len(), "parse finished");
    !unit.has_errors()
}

/// Why a parse operation produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// The token in opcode position starts no instruction family. Nothing was
    /// consumed and nothing was reported.
    NoMatch,
    /// A required token was missing; a diagnostic is already on the unit.
    Reported,
}

pub type Parsed<T> = Result<T, Miss>;

/// Recursive-descent parser over a fully scanned unit.
pub struct Parser<'u> {
    unit: &'u mut Unit,
    ix: usize,
}

impl<'u> Parser<'u> {
    pub fn new(unit: &'u mut Unit) -> Self {
        Parser { unit, ix: 0 }
    }

    fn at_end(&self) -> bool {
        self.ix >= self.unit.tokens.len()
    }

    fn look(&self) -> Option<Token> {
        self.unit.tokens.get(self.ix).copied()
    }

    fn eat(&mut self) -> Option<Token> {
        let token = self.look()?;
        self.ix += 1;
        Some(token)
    }

    /// Consumes the current token only if it has the given kind.
    fn eat_kind(&mut self, kind: TokenKind) -> Option<Token> {
        match self.look() {
            Some(t) if t.kind == kind => self.eat(),
            _ => None,
        }
    }

    /// Location used for errors at end of input: just past the last token.
    fn eof_location(&self) -> (Pos, Span) {
        match self.unit.tokens.last() {
            Some(last) => (last.pos, Span::new(last.span.end, last.span.end)),
            None => (Pos::default(), Span::default()),
        }
    }

    /// Reports `expected <what> but found <current>` without consuming.
    fn expected(&mut self, what: &str) -> Miss {
        match self.look() {
            Some(found) => {
                let message = format!("expected {} but found '{}'", what, self.unit.text(&found));
                self.unit.err(found.pos, found.span, message);
            }
            None => {
                let (pos, span) = self.eof_location();
                self.unit
                    .err(pos, span, format!("expected {} but found EOF", what));
            }
        }
        Miss::Reported
    }

    /// Consumes a token of the given kind or reports it as missing.
    fn eat_must(&mut self, kind: TokenKind) -> Parsed<Token> {
        match self.eat_kind(kind) {
            Some(t) => Ok(t),
            None => Err(self.expected(&format!("'{}'", kind.name()))),
        }
    }

    fn reg(&mut self) -> Parsed<Token> {
        match self.look() {
            Some(t) if t.kind.is_register() => {
                self.ix += 1;
                Ok(t)
            }
            _ => Err(self.expected("a register")),
        }
    }

    fn constant(&mut self) -> Parsed<Token> {
        match self.look() {
            Some(t) if t.kind.is_constant() => {
                self.ix += 1;
                Ok(t)
            }
            _ => Err(self.expected("a constant")),
        }
    }

    /// Parses one instruction, dispatching on the family of the opcode token.
    pub fn parse_instruction(&mut self) -> Parsed<Instruction> {
        let op = self.look().ok_or(Miss::NoMatch)?;
        let family = op.kind.family().ok_or(Miss::NoMatch)?;
        self.eat();

        let mut ins = Instruction::new(op);
        match family {
            Family::Load(_) => {
                ins.dst = Some(self.reg()?);
                ins.src = Some(self.constant()?);
            }
            Family::Arithmetic(..) | Family::Compare(_) => {
                ins.dst = Some(self.reg()?);
                ins.src = Some(self.reg()?);
            }
            Family::CondJump(..) => {
                ins.dst = Some(self.reg()?);
                ins.src = Some(self.reg()?);
                ins.label = Some(self.eat_must(TokenKind::Ident)?);
            }
            Family::Jump => {
                ins.label = Some(self.eat_must(TokenKind::Ident)?);
            }
            Family::Label => {
                self.eat_must(TokenKind::Colon)?;
            }
            Family::Halt => {}
        }

        Ok(ins)
    }

    /// Parses `proc <name> <instruction>* [end]`.
    ///
    /// The instruction loop stops at the first instruction that fails to
    /// parse; a failing instruction has already reported its own error, and a
    /// non-instruction token simply ends the body. A missing `end` is allowed.
    pub fn parse_proc(&mut self) -> Parsed<Proc> {
        self.eat_must(TokenKind::Proc)?;
        let name = self.eat_must(TokenKind::Ident)?;

        let mut body = Vec::new();
        while self.look().is_some_and(|t| t.kind != TokenKind::End) {
            match self.parse_instruction() {
                Ok(ins) => body.push(ins),
                Err(_) => break,
            }
        }

        if self.eat_kind(TokenKind::End).is_none() {
            debug!(proc = %self.unit.text(&name), "procedure without 'end'");
        }

        Ok(Proc { name, body })
    }
}
