//! The tokenizer.
//!
//! One pass over the source produces the full lexeme stream the parser
//! works on. Keyword recognition is *not* done here — `div` lexes as a
//! name, and the kernel decides from position and one-token lookahead
//! whether it is the operator or an element test. Only the fused lexical
//! forms that must be decided by adjacency (QNames, `pfx:*`, `*:local`,
//! `Q{uri}local`, numeric literals) are resolved in the lexer.

use rust_decimal::Decimal;

use crate::engine::runtime::{Error, ErrorCode};
use crate::parser::dialects::DialectVersion;
use crate::parser::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum LexValue {
    /// NCName or prefixed QName (`a`, `a:b`).
    Name {
        prefix: Option<String>,
        local: String,
    },
    /// `Q{uri}local` (3.0+).
    BracedName {
        uri: String,
        local: String,
    },
    /// `pfx:*`
    NsWildcard(String),
    /// `*:local`
    LocalWildcard(String),
    Integer(i64),
    Decimal(Decimal),
    Double(f64),
    String(String),
    Symbol(&'static str),
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub value: LexValue,
    pub span: Span,
}

/// Multi-character symbols first so the scan is longest-match.
const SYMBOLS: &[&str] = &[
    "||", "=>", "!=", "<=", "<<", ">=", ">>", "//", "::", ":=", "..", "/", "(", ")", "[", "]",
    "{", "}", "@", ",", "$", "|", "=", "<", ">", "+", "-", "*", "?", "#", "!", ".", ":",
];

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_char(c: char) -> bool {
    c == '_' || c == '-' || c == '.' || c.is_alphanumeric()
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    version: DialectVersion,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, version: DialectVersion) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            version,
        }
    }

    /// Tokenize the whole input, ending with a single `End` lexeme.
    pub fn tokenize(mut self) -> Result<Vec<Lexeme>, Error> {
        let mut out = Vec::new();
        loop {
            let lex = self.next_lexeme()?;
            let end = matches!(lex.value, LexValue::End);
            out.push(lex);
            if end {
                return Ok(out);
            }
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn byte_offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(i, _)| i)
            .unwrap_or(self.src.len())
    }

    fn skip_ws_and_comments(&mut self) -> Result<(), Error> {
        loop {
            while self.peek(0).is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            if self.peek(0) == Some('(') && self.peek(1) == Some(':') {
                if self.version < DialectVersion::V2_0 {
                    return Err(Error::from_code(
                        ErrorCode::XPST0003,
                        "comments are not allowed in XPath 1.0",
                    )
                    .with_span(Span::new(self.byte_offset(), self.byte_offset() + 2)));
                }
                let start = self.byte_offset();
                self.pos += 2;
                // Comments nest.
                let mut depth = 1usize;
                while depth > 0 {
                    match (self.peek(0), self.peek(1)) {
                        (Some('('), Some(':')) => {
                            depth += 1;
                            self.pos += 2;
                        }
                        (Some(':'), Some(')')) => {
                            depth -= 1;
                            self.pos += 2;
                        }
                        (Some(_), _) => self.pos += 1,
                        (None, _) => {
                            return Err(Error::from_code(
                                ErrorCode::XPST0003,
                                "unterminated comment",
                            )
                            .with_span(Span::new(start, self.byte_offset())));
                        }
                    }
                }
                continue;
            }
            return Ok(());
        }
    }

    fn next_lexeme(&mut self) -> Result<Lexeme, Error> {
        self.skip_ws_and_comments()?;
        let start = self.byte_offset();
        let Some(c) = self.peek(0) else {
            return Ok(Lexeme {
                value: LexValue::End,
                span: Span::new(start, start),
            });
        };

        if c == '"' || c == '\'' {
            return self.string_literal(c);
        }
        if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
            return self.number();
        }
        // Q{uri}local
        if c == 'Q'
            && self.peek(1) == Some('{')
            && self.version >= DialectVersion::V3_0
        {
            return self.braced_name();
        }
        if is_name_start(c) {
            return self.name_or_wildcard_tail();
        }
        if c == '*' && self.peek(1) == Some(':') && self.peek(2).is_some_and(is_name_start) {
            // *:local
            self.pos += 2;
            let local = self.ncname();
            return Ok(Lexeme {
                value: LexValue::LocalWildcard(local),
                span: Span::new(start, self.byte_offset()),
            });
        }
        // Punctuation, longest match first.
        for sym in SYMBOLS {
            if self.src[start..].starts_with(sym) {
                self.pos += sym.chars().count();
                return Ok(Lexeme {
                    value: LexValue::Symbol(sym),
                    span: Span::new(start, start + sym.len()),
                });
            }
        }
        Err(
            Error::from_code(ErrorCode::XPST0003, format!("unexpected character {c:?}"))
                .with_span(Span::new(start, start + c.len_utf8())),
        )
    }

    fn ncname(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek(0) {
            if is_name_char(c) {
                s.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        s
    }

    fn name_or_wildcard_tail(&mut self) -> Result<Lexeme, Error> {
        let start = self.byte_offset();
        let first = self.ncname();
        // Adjacent colon fuses a QName or a namespace wildcard; `a : b`
        // (with whitespace) stays three lexemes.
        if self.peek(0) == Some(':') && self.peek(1) != Some(':') && self.peek(1) != Some('=') {
            if self.peek(1) == Some('*') {
                self.pos += 2;
                return Ok(Lexeme {
                    value: LexValue::NsWildcard(first),
                    span: Span::new(start, self.byte_offset()),
                });
            }
            if self.peek(1).is_some_and(is_name_start) {
                self.pos += 1;
                let local = self.ncname();
                return Ok(Lexeme {
                    value: LexValue::Name {
                        prefix: Some(first),
                        local,
                    },
                    span: Span::new(start, self.byte_offset()),
                });
            }
        }
        Ok(Lexeme {
            value: LexValue::Name {
                prefix: None,
                local: first,
            },
            span: Span::new(start, self.byte_offset()),
        })
    }

    fn braced_name(&mut self) -> Result<Lexeme, Error> {
        let start = self.byte_offset();
        self.pos += 2; // Q{
        let mut uri = String::new();
        loop {
            match self.peek(0) {
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    uri.push(c);
                    self.pos += 1;
                }
                None => {
                    return Err(Error::from_code(
                        ErrorCode::XPST0003,
                        "unterminated braced URI literal",
                    )
                    .with_span(Span::new(start, self.byte_offset())));
                }
            }
        }
        if !self.peek(0).is_some_and(is_name_start) {
            return Err(Error::from_code(
                ErrorCode::XPST0003,
                "expected local name after braced URI literal",
            )
            .with_span(Span::new(start, self.byte_offset())));
        }
        let local = self.ncname();
        Ok(Lexeme {
            value: LexValue::BracedName {
                uri: uri.trim().to_string(),
                local,
            },
            span: Span::new(start, self.byte_offset()),
        })
    }

    fn string_literal(&mut self, quote: char) -> Result<Lexeme, Error> {
        let start = self.byte_offset();
        self.pos += 1;
        let mut s = String::new();
        loop {
            match self.peek(0) {
                Some(c) if c == quote => {
                    // Doubled quote is the escape (2.0+).
                    if self.version >= DialectVersion::V2_0 && self.peek(1) == Some(quote) {
                        s.push(quote);
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        return Ok(Lexeme {
                            value: LexValue::String(s),
                            span: Span::new(start, self.byte_offset()),
                        });
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.pos += 1;
                }
                None => {
                    return Err(Error::from_code(
                        ErrorCode::XPST0003,
                        "unterminated string literal",
                    )
                    .with_span(Span::new(start, self.byte_offset())));
                }
            }
        }
    }

    fn number(&mut self) -> Result<Lexeme, Error> {
        let start = self.byte_offset();
        let mut text = String::new();
        let mut is_decimal = false;
        let mut is_double = false;
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.peek(0).unwrap());
            self.pos += 1;
        }
        // Avoid swallowing the first dot of `..`.
        if self.peek(0) == Some('.') && self.peek(1) != Some('.') {
            is_decimal = true;
            text.push('.');
            self.pos += 1;
            while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.peek(0).unwrap());
                self.pos += 1;
            }
        }
        if matches!(self.peek(0), Some('e') | Some('E')) && self.version >= DialectVersion::V2_0 {
            let mut ahead = 1usize;
            if matches!(self.peek(1), Some('+') | Some('-')) {
                ahead = 2;
            }
            if self.peek(ahead).is_some_and(|c| c.is_ascii_digit()) {
                is_double = true;
                for _ in 0..ahead {
                    text.push(self.peek(0).unwrap());
                    self.pos += 1;
                }
                while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                    text.push(self.peek(0).unwrap());
                    self.pos += 1;
                }
            }
        }
        // A number must not run straight into a name: `1div` is a syntax
        // error, not `1 div`.
        if self.peek(0).is_some_and(is_name_start) {
            return Err(Error::from_code(
                ErrorCode::XPST0003,
                format!("number {text:?} followed directly by a name"),
            )
            .with_span(Span::new(start, self.byte_offset())));
        }
        if text.starts_with('.') {
            text.insert(0, '0');
        }
        let span = Span::new(start, self.byte_offset());
        let value = if is_double {
            let d: f64 = text.parse().map_err(|_| {
                Error::from_code(ErrorCode::XPST0003, format!("bad double literal {text:?}"))
                    .with_span(span)
            })?;
            LexValue::Double(d)
        } else if is_decimal {
            let d: Decimal = text.parse().map_err(|_| {
                Error::from_code(ErrorCode::XPST0003, format!("bad decimal literal {text:?}"))
                    .with_span(span)
            })?;
            LexValue::Decimal(d)
        } else {
            match text.parse::<i64>() {
                Ok(i) => LexValue::Integer(i),
                // Out-of-range integer literals degrade to decimal.
                Err(_) => {
                    let d: Decimal = text.parse().map_err(|_| {
                        Error::from_code(
                            ErrorCode::XPST0003,
                            format!("bad integer literal {text:?}"),
                        )
                        .with_span(span)
                    })?;
                    LexValue::Decimal(d)
                }
            }
        };
        Ok(Lexeme { value, span })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<LexValue> {
        Lexer::new(src, DialectVersion::V3_1)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|l| l.value)
            .collect()
    }

    #[test]
    fn qname_adjacency() {
        assert_eq!(
            lex("a:b"),
            vec![
                LexValue::Name {
                    prefix: Some("a".into()),
                    local: "b".into()
                },
                LexValue::End
            ]
        );
        // With whitespace, the colon stays separate.
        assert_eq!(
            lex("a : b"),
            vec![
                LexValue::Name {
                    prefix: None,
                    local: "a".into()
                },
                LexValue::Symbol(":"),
                LexValue::Name {
                    prefix: None,
                    local: "b".into()
                },
                LexValue::End
            ]
        );
    }

    #[test]
    fn wildcards() {
        assert_eq!(lex("pfx:*")[0], LexValue::NsWildcard("pfx".into()));
        assert_eq!(lex("*:local")[0], LexValue::LocalWildcard("local".into()));
        assert_eq!(lex("*")[0], LexValue::Symbol("*"));
    }

    #[test]
    fn numbers() {
        assert_eq!(lex("42")[0], LexValue::Integer(42));
        assert_eq!(lex("4.2")[0], LexValue::Decimal("4.2".parse().unwrap()));
        assert_eq!(lex("1.0e0")[0], LexValue::Double(1.0));
        assert_eq!(lex(".5")[0], LexValue::Decimal("0.5".parse().unwrap()));
        // `1 to 2` abbreviated range over integers must not eat dots.
        assert_eq!(
            lex("1..")[..2],
            [LexValue::Integer(1), LexValue::Symbol("..")]
        );
    }

    #[test]
    fn strings_with_doubled_quotes() {
        assert_eq!(lex(r#""he said ""hi""""#)[0], LexValue::String("he said \"hi\"".into()));
        assert_eq!(lex("'it''s'")[0], LexValue::String("it's".into()));
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            lex("a << b")[1],
            LexValue::Symbol("<<"),
        );
        assert_eq!(lex("x => f()")[1], LexValue::Symbol("=>"));
        assert_eq!(lex("a//b")[1], LexValue::Symbol("//"));
    }

    #[test]
    fn nested_comments() {
        assert_eq!(
            lex("1 (: outer (: inner :) still :) + 2"),
            vec![
                LexValue::Integer(1),
                LexValue::Symbol("+"),
                LexValue::Integer(2),
                LexValue::End
            ]
        );
    }

    #[test]
    fn comments_rejected_in_xpath1() {
        let err = Lexer::new("1 (: c :)", DialectVersion::V1_0)
            .tokenize()
            .unwrap_err();
        assert_eq!(err.code.local, "XPST0003");
    }

    #[test]
    fn braced_uri_literal() {
        assert_eq!(
            lex("Q{http://example.com/ns}foo")[0],
            LexValue::BracedName {
                uri: "http://example.com/ns".into(),
                local: "foo".into()
            }
        );
    }
}
