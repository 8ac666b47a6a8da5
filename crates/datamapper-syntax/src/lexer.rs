//! Tokenizer.

use crate::position::TextSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    Ident,
    /// `module:name` written without spaces and directly followed by `(`.
    QualifiedIdent,
    Int,
    Float,
    String,
    /// Backtick template such as the body of ``xml `...` ``.
    Template,
    Punct,
    /// A character the lexer does not understand.
    Unknown,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub kind: LexemeKind,
    pub text: &'a str,
    pub span: TextSpan,
}

const PUNCTS: &[&str] = &[
    "=>", "?.", "?:", "==", "!=", "<=", ">=", "&&", "||", "{|", "|}", "{", "}", "[", "]", "(",
    ")", "<", ">", ",", ";", ":", ".", "?", "|", "&", "+", "-", "*", "/", "%", "=", "!", "@",
];

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    idx: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            idx: 0,
        }
    }

    pub fn tokenize(mut self) -> Vec<Lexeme<'a>> {
        let mut out = Vec::new();
        loop {
            let lexeme = self.next_lexeme();
            let is_eof = lexeme.kind == LexemeKind::Eof;
            out.push(lexeme);
            if is_eof {
                break;
            }
        }
        out
    }

    fn next_lexeme(&mut self) -> Lexeme<'a> {
        self.skip_trivia();
        let start = self.idx;
        let Some(&b) = self.bytes.get(self.idx) else {
            return self.lexeme(LexemeKind::Eof, start);
        };

        if b == b'"' {
            return self.lex_delimited(start, b'"', LexemeKind::String);
        }
        if b == b'`' {
            return self.lex_delimited(start, b'`', LexemeKind::Template);
        }
        if b.is_ascii_digit() {
            return self.lex_number(start);
        }
        if b == b'\'' || is_ident_start(b) {
            return self.lex_identifier(start);
        }
        for punct in PUNCTS {
            if self.input[self.idx..].starts_with(punct) {
                self.idx += punct.len();
                return self.lexeme(LexemeKind::Punct, start);
            }
        }
        let width = self.input[self.idx..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        self.idx += width;
        self.lexeme(LexemeKind::Unknown, start)
    }

    fn lexeme(&self, kind: LexemeKind, start: usize) -> Lexeme<'a> {
        Lexeme {
            kind,
            text: &self.input[start..self.idx],
            span: TextSpan::new(start as u32, self.idx as u32),
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&b) = self.bytes.get(self.idx) {
            if b.is_ascii_whitespace() {
                self.idx += 1;
            } else if b == b'/' && self.bytes.get(self.idx + 1) == Some(&b'/') {
                while let Some(&c) = self.bytes.get(self.idx) {
                    if c == b'\n' {
                        break;
                    }
                    self.idx += 1;
                }
            } else {
                break;
            }
        }
    }

    fn lex_delimited(&mut self, start: usize, delimiter: u8, kind: LexemeKind) -> Lexeme<'a> {
        self.idx += 1;
        while let Some(&b) = self.bytes.get(self.idx) {
            self.idx += 1;
            if b == b'\\' {
                self.idx += 1;
            } else if b == delimiter {
                break;
            }
        }
        self.idx = self.idx.min(self.bytes.len());
        self.lexeme(kind, start)
    }

    fn lex_number(&mut self, start: usize) -> Lexeme<'a> {
        self.eat_while(|b| b.is_ascii_digit());
        let is_fraction = self.bytes.get(self.idx) == Some(&b'.')
            && self.bytes.get(self.idx + 1).is_some_and(u8::is_ascii_digit);
        if is_fraction {
            self.idx += 1;
            self.eat_while(|b| b.is_ascii_digit());
            return self.lexeme(LexemeKind::Float, start);
        }
        self.lexeme(LexemeKind::Int, start)
    }

    fn lex_identifier(&mut self, start: usize) -> Lexeme<'a> {
        if self.bytes[self.idx] == b'\'' {
            self.idx += 1;
        }
        self.eat_while(is_ident_continue);

        // `module:function(` is one token; `name: value` is not.
        if self.bytes.get(self.idx) == Some(&b':')
            && self.bytes.get(self.idx + 1).copied().is_some_and(is_ident_start)
        {
            let save = self.idx;
            self.idx += 1;
            self.eat_while(is_ident_continue);
            if self.bytes.get(self.idx) == Some(&b'(') {
                return self.lexeme(LexemeKind::QualifiedIdent, start);
            }
            self.idx = save;
        }
        self.lexeme(LexemeKind::Ident, start)
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.bytes.get(self.idx).copied().is_some_and(&pred) {
            self.idx += 1;
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
