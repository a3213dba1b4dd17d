use std::fmt;

use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

use crate::frontend::ast::Proc;
use crate::frontend::token::Token;

pub type Symbol = DefaultSymbol;

/// 1-based line/column of a character in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Default for Pos {
    fn default() -> Self {
        Pos { line: 1, col: 1 }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Byte range into the unit's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// A lexical or syntactic error recorded against a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub pos: Pos,
    pub span: Span,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    /// Formats as `line:col: message`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

/// One compilation unit: the source text plus everything the scanner and
/// parser derive from it.
///
/// The scanner fills `tokens`, the parser fills `procs`; both append to the
/// shared diagnostic list instead of failing outright.
pub struct Unit {
    pub path: String,
    pub content: String,
    pub tokens: Vec<Token>,
    pub procs: Vec<Proc>,
    pub errors: Vec<Diagnostic>,
    strings: StringInterner<DefaultBackend>,
    lines: Vec<Span>,
}

impl Unit {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Unit {
            path: path.into(),
            content: content.into(),
            tokens: Vec::new(),
            procs: Vec::new(),
            errors: Vec::new(),
            strings: StringInterner::new(),
            lines: Vec::new(),
        }
    }

    pub fn from_source(content: impl Into<String>) -> Self {
        Self::new("<input>", content)
    }

    /// Interns the source slice covered by `span`.
    pub fn intern_span(&mut self, span: Span) -> Symbol {
        let text = self.content.get(span.start..span.end).unwrap_or_default();
        self.strings.get_or_intern(text)
    }

    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.strings.resolve(symbol).unwrap_or_default()
    }

    /// Interned text of a token.
    pub fn text(&self, token: &Token) -> &str {
        self.resolve(token.text)
    }

    pub fn line_begin(&mut self, offset: usize) {
        self.lines.push(Span::new(offset, self.content.len()));
    }

    pub fn line_end(&mut self, offset: usize) {
        if let Some(line) = self.lines.last_mut() {
            line.end = offset;
        }
    }

    /// Source text of a 1-based line, as recorded by the scanner.
    pub fn line(&self, line: usize) -> Option<&str> {
        let span = self.lines.get(line.checked_sub(1)?)?;
        self.content.get(span.start..span.end)
    }

    pub fn err(&mut self, pos: Pos, span: Span, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            pos,
            span,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Renders every diagnostic with its source line and a caret underline.
    pub fn render_diagnostics(&self) -> String {
        let mut out = String::new();

        for err in &self.errors {
            out.push_str(&format!("{}:{}: error: {}\n", self.path, err.pos, err.message));

            let Some(text) = self.line(err.pos.line) else {
                continue;
            };
            out.push_str(&format!("  {}\n", text.trim_end_matches('\r')));

            let col = err.pos.col.saturating_sub(1);
            let width = self
                .content
                .get(err.span.start..err.span.end)
                .map(|s| s.chars().take_while(|c| *c != '\n').count())
                .unwrap_or(0)
                .max(1);
            out.push_str(&format!("  {}{}\n", " ".repeat(col), "^".repeat(width)));
        }

        out
    }
}
