use crate::frontend::source::Unit;
use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
    /// Last column shows `TokenKind`'s Debug form (`Op(Typed(Add, I32))`)
    /// rather than its canonical name (`i32_add`).
    pub show_debug_repr: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const GRN: &'static str = "\x1b[32m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, unit: &Unit) {
        print!("{}", self.render(unit));
    }

    pub fn render(&self, unit: &Unit) -> String {
        unit.tokens
            .iter()
            .map(|t| self.render_one(unit, t))
            .collect()
    }

    fn render_one(&self, unit: &Unit, t: &Token) -> String {
        let colr = if self.color { self.color(t.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let detail = if self.show_debug_repr {
            format!("{:?}", t.kind)
        } else {
            t.kind.name().to_string()
        };

        format!(
            "[{:02}:{:02}] {}{:<8} {:<12} {}{}\n",
            t.pos.line,
            t.pos.col,
            colr,
            self.kind(t.kind),
            unit.text(t),
            detail,
            reset
        )
    }

    fn kind(&self, k: TokenKind) -> &'static str {
        match k {
            TokenKind::Integer => "INT",
            TokenKind::Float => "FLOAT",
            TokenKind::Ident => "IDENT",
            TokenKind::Colon => "PUNCT",
            TokenKind::Reg(_) => "REG",
            TokenKind::Op(_) => "OP",
            TokenKind::Proc | TokenKind::End => "KEYWORD",
        }
    }

    fn color(&self, k: TokenKind) -> &'static str {
        match k {
            TokenKind::Integer | TokenKind::Float => Self::CYN,
            TokenKind::Ident => Self::YEL,
            TokenKind::Reg(_) => Self::GRN,
            TokenKind::Op(_) => Self::MAG,
            _ => Self::RESET,
        }
    }
}
