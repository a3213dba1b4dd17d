use tracing::{debug, instrument};

use crate::frontend::source::{Pos, Span, Unit};
use crate::frontend::token::{self, Token, TokenKind};

/// Tokenizes the unit's source into `unit.tokens`.
///
/// Lexical errors are recorded on the unit and scanning resumes after the
/// offending input. Returns `true` when no error has been recorded.
#[instrument(skip_all, fields(path = %unit.path))]
pub fn scan(unit: &mut Unit) -> bool {
    let mut lexer = Lexer::new(unit);
    lexer.tokenize();
    debug!(
        tokens = unit.tokens.len(),
        errors = unit.errors.len(),
        "scan finished"
    );
    !unit.has_errors()
}

/// Forward-only scanner over a unit's source text.
pub struct Lexer<'u> {
    unit: &'u mut Unit,
    /// Characters paired with their byte offsets.
    source: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'u> Lexer<'u> {
    pub fn new(unit: &'u mut Unit) -> Self {
        let source = unit.content.char_indices().collect();
        Lexer {
            unit,
            source,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).map(|&(_, c)| c)
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).map(|&(_, c)| c)
    }

    /// Byte offset of the current character, or the source length at EOF.
    fn offset(&self) -> usize {
        self.source
            .get(self.pos)
            .map(|&(o, _)| o)
            .unwrap_or(self.unit.content.len())
    }

    fn advance(&mut self) -> Option<char> {
        let (at, ch) = *self.source.get(self.pos)?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
            self.unit.line_end(at);
            let next = self.offset();
            self.unit.line_begin(next);
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn here(&self) -> Pos {
        Pos {
            line: self.line,
            col: self.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if matches!(ch, ' ' | '\t' | '\r' | '\n' | '\x0B') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&mut self, pos: Pos, start: usize, message: String) {
        let span = Span::new(start, self.offset());
        self.unit.err(pos, span, message);
    }

    fn token(&mut self, kind: TokenKind, pos: Pos, start: usize) -> Token {
        let span = Span::new(start, self.offset());
        Token {
            kind,
            text: self.unit.intern_span(span),
            pos,
            span,
        }
    }

    /// Consumes a run of digits valid in `base`. Returns whether any were found.
    fn digits(&mut self, base: u32) -> bool {
        let mut found = false;
        while let Some(ch) = self.current() {
            match ch.to_digit(16) {
                Some(d) if d < base => {
                    found = true;
                    self.advance();
                }
                _ => break,
            }
        }
        found
    }

    fn read_number(&mut self, pos: Pos, start: usize) -> Token {
        let mut kind = TokenKind::Integer;

        if matches!(self.current(), Some('-' | '+')) {
            self.advance();
        }

        // Base-prefixed integer: 0b, 0o, 0d, 0x
        if self.current() == Some('0') {
            if let Some(base) = self.peek().and_then(base_prefix) {
                self.advance(); // '0'
                self.advance(); // base letter
                if !self.digits(base) {
                    let text = self.slice(start);
                    self.error(pos, start, format!("illegal int literal '{}'", text));
                }
                return self.token(kind, pos, start);
            }
        }

        if !self.digits(10) {
            let text = self.slice(start);
            self.error(pos, start, format!("illegal int literal '{}'", text));
        }

        if self.current() == Some('.') {
            kind = TokenKind::Float;
            self.advance();
            if !self.digits(10) {
                let text = self.slice(start);
                self.error(pos, start, format!("illegal float literal '{}'", text));
            }
        }

        if matches!(self.current(), Some('e' | 'E')) {
            kind = TokenKind::Float;
            self.advance();
            if matches!(self.current(), Some('-' | '+')) {
                self.advance();
            }
            if !self.digits(10) {
                let text = self.slice(start);
                self.error(pos, start, format!("illegal float literal '{}'", text));
            }
        }

        self.token(kind, pos, start)
    }

    fn read_identifier(&mut self, pos: Pos, start: usize) -> Token {
        while let Some(ch) = self.current() {
            if is_letter(ch) || ch.is_ascii_digit() || ch == '.' {
                self.advance();
            } else {
                break;
            }
        }

        let mut token = self.token(TokenKind::Ident, pos, start);
        if let Some(kind) = token::keyword(self.unit.text(&token)) {
            token.kind = kind;
        }
        token
    }

    fn slice(&self, start: usize) -> String {
        self.unit
            .content
            .get(start..self.offset())
            .unwrap_or_default()
            .to_string()
    }

    /// Produces the next token, or `None` once the input is exhausted.
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            self.skip_whitespace();
            let pos = self.here();
            let start = self.offset();

            let token = match self.current()? {
                ch if ch.is_ascii_digit() => self.read_number(pos, start),
                '-' | '+' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_number(pos, start)
                }
                ch if is_letter(ch) => self.read_identifier(pos, start),
                ':' => {
                    self.advance();
                    self.token(TokenKind::Colon, pos, start)
                }
                ch => {
                    self.advance();
                    self.error(pos, start, format!("illegal character '{}'", ch));
                    continue;
                }
            };

            return Some(token);
        }
    }

    /// Scans the whole source into the unit's token buffer.
    pub fn tokenize(&mut self) {
        let first = self.offset();
        self.unit.line_begin(first);

        while let Some(token) = self.next_token() {
            self.unit.tokens.push(token);
        }

        let end = self.offset();
        self.unit.line_end(end);
    }
}

fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn base_prefix(ch: char) -> Option<u32> {
    match ch {
        'b' | 'B' => Some(2),
        'o' | 'O' => Some(8),
        'd' | 'D' => Some(10),
        'x' | 'X' => Some(16),
        _ => None,
    }
}
