//! Lexer for the source dialect
//!
//! Byte stream in, token stream out, with INDENT/DEDENT synthesized from
//! leading whitespace at logical-line starts. Newlines inside bracket pairs
//! are suppressed, so container literals may span lines. Mixed tab/space
//! indentation is rejected outright rather than guessed at.

use crate::diagnostics::{CompileError, Diagnostic, Loc};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Keyword(&'static str),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// f-string with escapes processed; `{...}` splitting happens in the
    /// parser.
    FStr(String),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

pub const KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "in", "not", "and", "or", "return", "try", "except",
    "finally", "import", "from", "def", "True", "False", "None", "pass", "break", "continue",
    "as", "is",
];

const OPERATORS: &[&str] = &[
    "**=", "//=", "->", "**", "//", "<=", ">=", "==", "!=", "+=", "-=", "*=", "/=", "%=", "(",
    ")", "[", "]", "{", "}", ",", ":", ".", ";", "+", "-", "*", "/", "%", "<", ">", "=",
];

pub struct Lexer<'a> {
    src: &'a [u8],
    file: &'a Path,
    pos: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    paren_depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: &'a Path) -> Self {
        Lexer {
            src: source.as_bytes(),
            file,
            pos: 0,
            line: 0,
            column: 0,
            indent_stack: vec![0],
            paren_depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn loc(&self) -> Loc {
        Loc::new(self.line, self.column, self.pos)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Lex(Diagnostic::error("lex", message, self.file, self.loc()))
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, loc: Loc) {
        self.tokens.push(Token { kind, loc });
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, CompileError> {
        loop {
            if self.at_line_start && self.paren_depth == 0 {
                if !self.handle_indentation()? {
                    break; // EOF reached on a blank tail
                }
            }
            match self.peek() {
                None => break,
                Some(b'\n') => {
                    let loc = self.loc();
                    self.bump();
                    if self.paren_depth == 0 {
                        self.push(TokenKind::Newline, loc);
                        self.at_line_start = true;
                    }
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.bump();
                }
                Some(_) => self.token()?,
            }
        }

        // Synthesize a final NEWLINE and close every open block.
        let loc = self.loc();
        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(TokenKind::Newline) | None
        ) {
            self.push(TokenKind::Newline, loc);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent, loc);
        }
        self.push(TokenKind::Eof, loc);
        Ok(self.tokens)
    }

    /// Measure leading whitespace and emit INDENT/DEDENT as needed.
    /// Returns false at end of input.
    fn handle_indentation(&mut self) -> Result<bool, CompileError> {
        loop {
            let start = self.pos;
            let mut saw_space = false;
            let mut saw_tab = false;
            let mut width = 0usize;
            while let Some(c) = self.peek() {
                match c {
                    b' ' => {
                        saw_space = true;
                        width += 1;
                        self.bump();
                    }
                    b'\t' => {
                        saw_tab = true;
                        width += 8 - width % 8;
                        self.bump();
                    }
                    b'\r' => {
                        self.bump();
                    }
                    _ => break,
                }
            }
            if saw_space && saw_tab {
                return Err(self.error("inconsistent use of tabs and spaces in indentation"));
            }
            match self.peek() {
                None => return Ok(false),
                Some(b'\n') => {
                    // Blank line: no tokens, no indentation change.
                    self.bump();
                    continue;
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                    continue;
                }
                Some(_) => {
                    let loc = Loc::new(self.line, 0, start);
                    let current = *self.indent_stack.last().unwrap();
                    if width > current {
                        self.indent_stack.push(width);
                        self.push(TokenKind::Indent, loc);
                    } else if width < current {
                        while width < *self.indent_stack.last().unwrap() {
                            self.indent_stack.pop();
                            self.push(TokenKind::Dedent, loc);
                        }
                        if width != *self.indent_stack.last().unwrap() {
                            return Err(self.error("unindent does not match any outer indentation level"));
                        }
                    }
                    self.at_line_start = false;
                    return Ok(true);
                }
            }
        }
    }

    fn token(&mut self) -> Result<(), CompileError> {
        let loc = self.loc();
        let c = self.peek().unwrap();

        // String prefixes: r'', b'', f''
        if matches!(c, b'r' | b'b' | b'f')
            && matches!(self.peek_at(1), Some(b'\'') | Some(b'"'))
        {
            self.bump();
            return self.string(Some(c), loc);
        }
        if c == b'\'' || c == b'"' {
            return self.string(None, loc);
        }
        if c.is_ascii_digit() {
            return self.number(loc);
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            let mut name = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == b'_' {
                    name.push(c as char);
                    self.bump();
                } else {
                    break;
                }
            }
            if let Some(kw) = KEYWORDS.iter().find(|k| **k == name) {
                self.push(TokenKind::Keyword(kw), loc);
            } else {
                self.push(TokenKind::Name(name), loc);
            }
            return Ok(());
        }

        for op in OPERATORS {
            if self.src[self.pos..].starts_with(op.as_bytes()) {
                for _ in 0..op.len() {
                    self.bump();
                }
                match *op {
                    "(" | "[" | "{" => self.paren_depth += 1,
                    ")" | "]" | "}" => self.paren_depth = self.paren_depth.saturating_sub(1),
                    _ => {}
                }
                self.push(TokenKind::Op(op), loc);
                return Ok(());
            }
        }

        Err(self.error(format!("unknown character '{}'", c as char)))
    }

    fn number(&mut self, loc: Loc) -> Result<(), CompileError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E'))
            && (self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
                || (matches!(self.peek_at(1), Some(b'+') | Some(b'-'))
                    && self.peek_at(2).is_some_and(|c| c.is_ascii_digit())))
        {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.bump();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float literal '{}'", text)))?;
            self.push(TokenKind::Float(value), loc);
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error(format!("integer literal '{}' out of range", text)))?;
            self.push(TokenKind::Int(value), loc);
        }
        Ok(())
    }

    fn string(&mut self, prefix: Option<u8>, loc: Loc) -> Result<(), CompileError> {
        let quote = self.bump().unwrap();
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }
        let raw = prefix == Some(b'r');
        let mut text: Vec<u8> = Vec::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unterminated string literal"));
            };
            if c == quote {
                if triple {
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.bump();
                        self.bump();
                        self.bump();
                        break;
                    }
                    self.bump();
                    text.push(c);
                    continue;
                }
                self.bump();
                break;
            }
            if c == b'\n' && !triple {
                return Err(self.error("unterminated string literal"));
            }
            if c == b'\\' && !raw {
                self.bump();
                let Some(esc) = self.bump() else {
                    return Err(self.error("unterminated string literal"));
                };
                match esc {
                    b'n' => text.push(b'\n'),
                    b't' => text.push(b'\t'),
                    b'r' => text.push(b'\r'),
                    b'\\' => text.push(b'\\'),
                    b'\'' => text.push(b'\''),
                    b'"' => text.push(b'"'),
                    b'x' => {
                        let hi = self.bump();
                        let lo = self.bump();
                        let (Some(hi), Some(lo)) = (hi, lo) else {
                            return Err(self.error("truncated \\x escape"));
                        };
                        let hex = [hi, lo];
                        let hex = std::str::from_utf8(&hex).unwrap_or("");
                        let byte = u8::from_str_radix(hex, 16)
                            .map_err(|_| self.error("invalid \\x escape"))?;
                        text.push(byte);
                    }
                    other => {
                        return Err(self.error(format!("invalid escape '\\{}'", other as char)))
                    }
                }
                continue;
            }
            self.bump();
            text.push(c);
        }

        match prefix {
            Some(b'b') => self.push(TokenKind::Bytes(text), loc),
            Some(b'f') => {
                let s = String::from_utf8(text)
                    .map_err(|_| self.error("invalid UTF-8 in f-string literal"))?;
                self.push(TokenKind::FStr(s), loc);
            }
            _ => {
                let s = String::from_utf8(text)
                    .map_err(|_| self.error("invalid UTF-8 in string literal"))?;
                self.push(TokenKind::Str(s), loc);
            }
        }
        Ok(())
    }
}

/// Convenience wrapper used by the parser and tests.
pub fn tokenize(source: &str, file: &Path) -> Result<Vec<Token>, CompileError> {
    Lexer::new(source, file).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let file = PathBuf::from("test.py");
        tokenize(source, &file).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(source: &str) -> String {
        let file = PathBuf::from("test.py");
        match tokenize(source, &file) {
            Err(CompileError::Lex(d)) => d.message,
            other => panic!("expected lex error, got {:?}", other),
        }
    }

    #[test]
    fn simple_assignment() {
        assert_eq!(
            kinds("x = 1\n"),
            vec![
                TokenKind::Name("x".into()),
                TokenKind::Op("="),
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn indentation_block() {
        let toks = kinds("if x:\n    y = 1\nz = 2\n");
        assert!(toks.contains(&TokenKind::Indent));
        assert!(toks.contains(&TokenKind::Dedent));
        let indent_pos = toks.iter().position(|t| *t == TokenKind::Indent).unwrap();
        let dedent_pos = toks.iter().position(|t| *t == TokenKind::Dedent).unwrap();
        assert!(indent_pos < dedent_pos);
    }

    #[test]
    fn blank_and_comment_lines_do_not_dedent() {
        let toks = kinds("if x:\n    a = 1\n\n    # note\n    b = 2\n");
        let dedents = toks.iter().filter(|t| **t == TokenKind::Dedent).count();
        assert_eq!(dedents, 1);
    }

    #[test]
    fn mixed_tabs_and_spaces_rejected() {
        let msg = lex_err("if x:\n \ty = 1\n");
        assert!(msg.contains("tabs and spaces"));
    }

    #[test]
    fn dedent_must_match() {
        let msg = lex_err("if x:\n    a = 1\n  b = 2\n");
        assert!(msg.contains("unindent"));
    }

    #[test]
    fn string_forms() {
        assert_eq!(kinds("'a\\n'")[0], TokenKind::Str("a\n".into()));
        assert_eq!(kinds("\"q\"")[0], TokenKind::Str("q".into()));
        assert_eq!(kinds("b'\\x41'")[0], TokenKind::Bytes(vec![0x41]));
        assert_eq!(kinds("r'a\\n'")[0], TokenKind::Str("a\\n".into()));
        assert_eq!(kinds("f'x={y}'")[0], TokenKind::FStr("x={y}".into()));
        assert_eq!(kinds("'''tri\nple'''")[0], TokenKind::Str("tri\nple".into()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(lex_err("'open\n").contains("unterminated"));
        assert!(lex_err("'open").contains("unterminated"));
    }

    #[test]
    fn invalid_escape_is_an_error() {
        assert!(lex_err("'\\q'").contains("invalid escape"));
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("42")[0], TokenKind::Int(42));
        assert_eq!(kinds("1.5")[0], TokenKind::Float(1.5));
        assert_eq!(kinds("2e3")[0], TokenKind::Float(2000.0));
        assert_eq!(kinds("1e-6")[0], TokenKind::Float(1e-6));
    }

    #[test]
    fn keywords_vs_names() {
        assert_eq!(kinds("for")[0], TokenKind::Keyword("for"));
        assert_eq!(kinds("format")[0], TokenKind::Name("format".into()));
        assert_eq!(kinds("True")[0], TokenKind::Keyword("True"));
    }

    #[test]
    fn newline_suppressed_in_brackets() {
        let toks = kinds("x = [1,\n     2]\n");
        let newlines = toks.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn multi_char_operators() {
        let toks = kinds("a //= 2 ** 3 != 4");
        assert!(toks.contains(&TokenKind::Op("//=")));
        assert!(toks.contains(&TokenKind::Op("**")));
        assert!(toks.contains(&TokenKind::Op("!=")));
    }

    #[test]
    fn unknown_character() {
        assert!(lex_err("a @ b").contains("unknown character"));
    }

    #[test]
    fn locations_are_tracked() {
        let file = PathBuf::from("test.py");
        let toks = tokenize("x = 1\ny = 2\n", &file).unwrap();
        let y = toks.iter().find(|t| t.kind == TokenKind::Name("y".into())).unwrap();
        assert_eq!(y.loc.line, 1);
        assert_eq!(y.loc.column, 0);
        assert_eq!(y.loc.offset, 6);
    }
}
