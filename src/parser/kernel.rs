//! The TDOP (Pratt) kernel.
//!
//! Every language construct is a registered [`TokenClass`] carrying binding
//! powers and two semantic actions: `nud` (the token starts an expression)
//! and `led` (the token continues one, receiving the left operand). The
//! kernel itself knows nothing about XPath — dialects populate a
//! [`SymbolTable`] and the same `expression` loop parses every version.
//!
//! Keywords are not distinguished by the lexer; a name lexeme is mapped to
//! a registered keyword class here, from its position (prefix vs. infix)
//! and a one-token lookahead guard (`element` before `(` is a kind test,
//! anywhere else it is a name test).

use std::collections::HashMap;

use crate::engine::runtime::{Error, ErrorCode, FunctionSignatures, StaticContext};
use crate::parser::ast::{Label, NamePayload, Token, TokenValue};
use crate::parser::dialects::DialectVersion;
use crate::parser::lexer::{LexValue, Lexeme};
use crate::parser::span::Span;
use crate::xdm::ExpandedName;
use crate::xdm::types::NameOrWildcard;

/// Binding powers shared by all dialects.
pub mod bp {
    pub const NONE: u8 = 0;
    pub const COMMA: u8 = 4;
    pub const OR: u8 = 20;
    pub const AND: u8 = 25;
    pub const COMPARISON: u8 = 30;
    pub const CONCAT: u8 = 32;
    pub const RANGE: u8 = 35;
    pub const ADDITIVE: u8 = 40;
    pub const MULTIPLICATIVE: u8 = 45;
    pub const UNION: u8 = 50;
    pub const INTERSECT: u8 = 55;
    pub const INSTANCE_OF: u8 = 60;
    pub const TREAT: u8 = 61;
    pub const CASTABLE: u8 = 62;
    pub const CAST: u8 = 63;
    pub const ARROW: u8 = 66;
    pub const UNARY: u8 = 70;
    pub const SIMPLE_MAP: u8 = 72;
    pub const PATH: u8 = 75;
    pub const POSTFIX: u8 = 80;
}

pub type NudFn = fn(&mut Cursor<'_>, Token) -> Result<Token, Error>;
pub type LedFn = fn(&mut Cursor<'_>, Token, Token) -> Result<Token, Error>;

/// Lookahead guard deciding whether a *name* lexeme is read as this keyword
/// class. Punctuation symbols never need one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordGuard {
    /// Applies unconditionally (pure operators like `and`, only ever
    /// consulted in infix position).
    None,
    /// Applies when the following lexeme is this symbol (`if` + `(`,
    /// `for` + `$`, `map` + `{`).
    NextIs(&'static str),
    /// Applies when followed by `::` (axis names).
    Axis,
}

#[derive(Clone)]
pub struct TokenClass {
    pub symbol: &'static str,
    pub label: Label,
    pub lbp: u8,
    pub rbp: u8,
    pub guard: KeywordGuard,
    pub nud: Option<NudFn>,
    pub led: Option<LedFn>,
}

/// The dialect registry: symbol → token class. Registration is additive and
/// later registrations override (how XPath 2.0 builds on 1.0).
#[derive(Clone, Default)]
pub struct SymbolTable {
    classes: HashMap<&'static str, TokenClass>,
}

impl SymbolTable {
    pub fn register(&mut self, class: TokenClass) {
        self.classes.insert(class.symbol, class);
    }

    pub fn class(&self, symbol: &str) -> Option<&TokenClass> {
        self.classes.get(symbol)
    }

    // Registration shorthands used by the dialect modules.

    pub fn literal(&mut self, symbol: &'static str) {
        self.register(TokenClass {
            symbol,
            label: Label::Literal,
            lbp: bp::NONE,
            rbp: bp::NONE,
            guard: KeywordGuard::None,
            nud: Some(|_, seed| Ok(seed)),
            led: None,
        });
    }

    pub fn prefix(&mut self, symbol: &'static str, label: Label, nud: NudFn) {
        self.register(TokenClass {
            symbol,
            label,
            lbp: bp::NONE,
            rbp: bp::NONE,
            guard: KeywordGuard::None,
            nud: Some(nud),
            led: None,
        });
    }

    pub fn guarded(
        &mut self,
        symbol: &'static str,
        label: Label,
        guard: KeywordGuard,
        nud: NudFn,
    ) {
        self.register(TokenClass {
            symbol,
            label,
            lbp: bp::NONE,
            rbp: bp::NONE,
            guard,
            nud: Some(nud),
            led: None,
        });
    }

    pub fn infix(&mut self, symbol: &'static str, lbp: u8, led: LedFn) {
        self.register(TokenClass {
            symbol,
            label: Label::Operator,
            lbp,
            rbp: lbp,
            guard: KeywordGuard::None,
            nud: None,
            led: Some(led),
        });
    }

    /// Infix that also has a prefix reading (`*`, `-`, `/`, `?`).
    pub fn infix_prefix(&mut self, symbol: &'static str, lbp: u8, led: LedFn, nud: NudFn) {
        self.register(TokenClass {
            symbol,
            label: Label::Operator,
            lbp,
            rbp: lbp,
            guard: KeywordGuard::None,
            nud: Some(nud),
            led: Some(led),
        });
    }
}

/// The standard binary led: `left OP expression(rbp)`.
pub fn binary_led(cur: &mut Cursor<'_>, seed: Token, left: Token) -> Result<Token, Error> {
    let rbp = cur
        .table
        .class(seed.symbol)
        .map(|c| c.rbp)
        .unwrap_or(bp::NONE);
    let right = cur.expression(rbp)?;
    Ok(seed.with_operands(vec![left, right]))
}

/// Active parse state over one lexeme stream.
pub struct Cursor<'a> {
    lexemes: Vec<Lexeme>,
    pos: usize,
    pub table: &'a SymbolTable,
    pub version: DialectVersion,
    pub static_ctx: &'a StaticContext,
    pub signatures: &'a FunctionSignatures,
    pub source: &'a str,
    depth: usize,
}

const MAX_DEPTH: usize = 256;

impl<'a> Cursor<'a> {
    pub fn new(
        lexemes: Vec<Lexeme>,
        table: &'a SymbolTable,
        version: DialectVersion,
        static_ctx: &'a StaticContext,
        signatures: &'a FunctionSignatures,
        source: &'a str,
    ) -> Self {
        Self {
            lexemes,
            pos: 0,
            table,
            version,
            static_ctx,
            signatures,
            source,
            depth: 0,
        }
    }

    // ----- lexeme access -----

    pub fn lex(&self, ahead: usize) -> &LexValue {
        self.lexemes
            .get(self.pos + ahead)
            .map(|l| &l.value)
            .unwrap_or(&LexValue::End)
    }

    pub fn span(&self, ahead: usize) -> Span {
        self.lexemes
            .get(self.pos + ahead)
            .map(|l| l.span)
            .unwrap_or_else(|| Span::new(self.source.len(), self.source.len()))
    }

    pub fn at_end(&self) -> bool {
        matches!(self.lex(0), LexValue::End)
    }

    pub fn advance(&mut self) {
        if self.pos < self.lexemes.len() {
            self.pos += 1;
        }
    }

    /// Lookahead predicate over punctuation and keywords alike.
    pub fn next_is(&self, symbol: &str) -> bool {
        self.lex_matches(0, symbol)
    }

    pub fn lex_matches(&self, ahead: usize, symbol: &str) -> bool {
        match self.lex(ahead) {
            LexValue::Symbol(s) => *s == symbol,
            LexValue::Name { prefix: None, local } => local == symbol,
            _ => false,
        }
    }

    /// Consume the next lexeme, asserting it is `symbol` (punctuation or
    /// bare keyword).
    pub fn expect(&mut self, symbol: &str) -> Result<Span, Error> {
        if self.lex_matches(0, symbol) {
            let span = self.span(0);
            self.advance();
            Ok(span)
        } else {
            Err(self.syntax_error(format!("expected {symbol:?}, found {}", self.describe(0))))
        }
    }

    pub fn describe(&self, ahead: usize) -> String {
        match self.lex(ahead) {
            LexValue::End => "end of expression".to_string(),
            LexValue::Symbol(s) => format!("{s:?}"),
            LexValue::Name { prefix: None, local } => format!("{local:?}"),
            LexValue::Name {
                prefix: Some(p),
                local,
            } => format!("\"{p}:{local}\""),
            LexValue::BracedName { uri, local } => format!("\"Q{{{uri}}}{local}\""),
            LexValue::NsWildcard(p) => format!("\"{p}:*\""),
            LexValue::LocalWildcard(l) => format!("\"*:{l}\""),
            LexValue::Integer(i) => format!("{i}"),
            LexValue::Decimal(d) => format!("{d}"),
            LexValue::Double(d) => format!("{d}"),
            LexValue::String(s) => format!("{s:?}"),
        }
    }

    pub fn syntax_error(&self, msg: impl Into<String>) -> Error {
        Error::from_code(ErrorCode::XPST0003, msg).with_span(self.span(0))
    }

    // ----- the Pratt loop -----

    pub fn expression(&mut self, rbp: u8) -> Result<Token, Error> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.syntax_error("expression nesting too deep"));
        }
        let result = self.expression_inner(rbp);
        self.depth -= 1;
        result
    }

    fn expression_inner(&mut self, rbp: u8) -> Result<Token, Error> {
        let (nud, seed) = self.prefix_class()?;
        let mut left = nud(self, seed)?;
        loop {
            let Some(lbp) = self.infix_lbp() else { break };
            if lbp <= rbp {
                break;
            }
            let (led, seed) = self.infix_class()?;
            left = led(self, seed, left)?;
        }
        Ok(left)
    }

    /// Binding power of the next lexeme read as an infix operator, if it has
    /// one.
    fn infix_lbp(&self) -> Option<u8> {
        let symbol: &str = match self.lex(0) {
            LexValue::Symbol(s) => s,
            LexValue::Name { prefix: None, local } => local.as_str(),
            _ => return None,
        };
        let class = self.table.class(symbol)?;
        if class.led.is_some() && class.lbp > 0 {
            Some(class.lbp)
        } else {
            None
        }
    }

    fn infix_class(&mut self) -> Result<(LedFn, Token), Error> {
        let symbol: &str = match self.lex(0) {
            LexValue::Symbol(s) => s,
            LexValue::Name { prefix: None, local } => local.as_str(),
            _ => unreachable!("infix_lbp gated"),
        };
        let class = self.table.class(symbol).expect("infix_lbp gated");
        let led = class.led.expect("infix_lbp gated");
        let seed = Token::new(class.symbol, class.label, self.span(0));
        self.advance();
        Ok((led, seed))
    }

    /// Classify the current lexeme in prefix position and build its seed
    /// token; advances past it.
    fn prefix_class(&mut self) -> Result<(NudFn, Token), Error> {
        let span = self.span(0);
        match self.lex(0).clone() {
            LexValue::End => Err(self.syntax_error("unexpected end of expression")),
            LexValue::Integer(i) => {
                self.advance();
                Ok((
                    self.require_nud("(integer)")?,
                    Token::new("(integer)", Label::Literal, span)
                        .with_value(TokenValue::Integer(i)),
                ))
            }
            LexValue::Decimal(d) => {
                self.advance();
                Ok((
                    self.require_nud("(decimal)")?,
                    Token::new("(decimal)", Label::Literal, span)
                        .with_value(TokenValue::Decimal(d)),
                ))
            }
            LexValue::Double(d) => {
                self.advance();
                Ok((
                    self.require_nud("(double)")?,
                    Token::new("(double)", Label::Literal, span).with_value(TokenValue::Double(d)),
                ))
            }
            LexValue::String(s) => {
                self.advance();
                Ok((
                    self.require_nud("(string)")?,
                    Token::new("(string)", Label::Literal, span).with_value(TokenValue::String(s)),
                ))
            }
            LexValue::NsWildcard(prefix) => {
                self.advance();
                let uri = self
                    .static_ctx
                    .resolve_prefix(&prefix)
                    .ok_or_else(|| {
                        Error::from_code(
                            ErrorCode::XPST0081,
                            format!("unbound namespace prefix {prefix:?}"),
                        )
                        .with_span(span)
                    })?
                    .to_string();
                Ok((
                    self.require_nud("(wildcard)")?,
                    Token::new("(wildcard)", Label::Wildcard, span).with_value(
                        TokenValue::NodeTest(crate::parser::ast::NodeTest::Name(
                            NameOrWildcard::NsAny(uri),
                        )),
                    ),
                ))
            }
            LexValue::LocalWildcard(local) => {
                self.advance();
                Ok((
                    self.require_nud("(wildcard)")?,
                    Token::new("(wildcard)", Label::Wildcard, span).with_value(
                        TokenValue::NodeTest(crate::parser::ast::NodeTest::Name(
                            NameOrWildcard::LocalAny(local),
                        )),
                    ),
                ))
            }
            LexValue::BracedName { uri, local } => {
                self.advance();
                let payload = NamePayload {
                    prefix: None,
                    local,
                    ns_uri: if uri.is_empty() { None } else { Some(uri) },
                };
                Ok((
                    self.require_nud("(name)")?,
                    Token::new("(name)", Label::Name, span).with_value(TokenValue::Name(payload)),
                ))
            }
            LexValue::Name { prefix, local } => {
                // A bare name may be a registered keyword class whose guard
                // matches the lookahead; otherwise it is a plain name.
                if prefix.is_none()
                    && let Some(class) = self.table.class(local.as_str())
                    && let Some(nud) = class.nud
                    && self.guard_matches(class.guard)
                {
                    let seed = Token::new(class.symbol, class.label, span);
                    self.advance();
                    return Ok((nud, seed));
                }
                self.advance();
                let payload = NamePayload {
                    prefix,
                    local,
                    ns_uri: None,
                };
                Ok((
                    self.require_nud("(name)")?,
                    Token::new("(name)", Label::Name, span).with_value(TokenValue::Name(payload)),
                ))
            }
            LexValue::Symbol(s) => {
                let class = self
                    .table
                    .class(s)
                    .ok_or_else(|| self.syntax_error(format!("unexpected {s:?}")))?;
                let nud = class.nud.ok_or_else(|| {
                    self.syntax_error(format!("{s:?} cannot start an expression"))
                })?;
                let seed = Token::new(class.symbol, class.label, span);
                self.advance();
                Ok((nud, seed))
            }
        }
    }

    fn require_nud(&self, symbol: &'static str) -> Result<NudFn, Error> {
        self.table
            .class(symbol)
            .and_then(|c| c.nud)
            .ok_or_else(|| self.syntax_error(format!("{symbol} not valid here")))
    }

    fn guard_matches(&self, guard: KeywordGuard) -> bool {
        match guard {
            KeywordGuard::None => false, // pure operators never start an expression
            KeywordGuard::NextIs(sym) => match self.lex(1) {
                LexValue::Symbol(s) => *s == sym,
                _ => false,
            },
            KeywordGuard::Axis => matches!(self.lex(1), LexValue::Symbol("::")),
        }
    }

    // ----- name resolution -----

    pub fn resolve_prefix(&self, prefix: &str, span: Span) -> Result<String, Error> {
        self.static_ctx
            .resolve_prefix(prefix)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::from_code(
                    ErrorCode::XPST0081,
                    format!("unbound namespace prefix {prefix:?}"),
                )
                .with_span(span)
            })
    }

    /// Resolve a name in element/type position: prefixes via the static
    /// namespaces, no prefix via the default element namespace.
    pub fn resolve_element_name(
        &self,
        payload: &NamePayload,
        span: Span,
    ) -> Result<NamePayload, Error> {
        if payload.ns_uri.is_some() {
            return Ok(payload.clone());
        }
        let ns_uri = match &payload.prefix {
            Some(p) => Some(self.resolve_prefix(p, span)?),
            None => self.static_ctx.default_element_namespace.clone(),
        };
        Ok(NamePayload {
            prefix: payload.prefix.clone(),
            local: payload.local.clone(),
            ns_uri,
        })
    }

    /// Resolve a name in function position: no prefix means the default
    /// function namespace.
    pub fn resolve_function_name(
        &self,
        payload: &NamePayload,
        span: Span,
    ) -> Result<ExpandedName, Error> {
        if let Some(uri) = &payload.ns_uri {
            return Ok(ExpandedName::in_ns(uri, payload.local.clone()));
        }
        let ns_uri = match &payload.prefix {
            Some(p) => self.resolve_prefix(p, span)?,
            None => self.static_ctx.default_function_namespace.clone(),
        };
        Ok(ExpandedName::in_ns(&ns_uri, payload.local.clone()))
    }

    /// Resolve a variable name: no prefix means no namespace.
    pub fn resolve_variable_name(
        &self,
        payload: &NamePayload,
        span: Span,
    ) -> Result<ExpandedName, Error> {
        if let Some(uri) = &payload.ns_uri {
            return Ok(ExpandedName::in_ns(uri, payload.local.clone()));
        }
        match &payload.prefix {
            Some(p) => Ok(ExpandedName::in_ns(
                &self.resolve_prefix(p, span)?,
                payload.local.clone(),
            )),
            None => Ok(ExpandedName::local(payload.local.clone())),
        }
    }

    /// Read a name lexeme (plain or braced) or fail.
    pub fn expect_name(&mut self) -> Result<(NamePayload, Span), Error> {
        let span = self.span(0);
        match self.lex(0).clone() {
            LexValue::Name { prefix, local } => {
                self.advance();
                Ok((
                    NamePayload {
                        prefix,
                        local,
                        ns_uri: None,
                    },
                    span,
                ))
            }
            LexValue::BracedName { uri, local } => {
                self.advance();
                Ok((
                    NamePayload {
                        prefix: None,
                        local,
                        ns_uri: if uri.is_empty() { None } else { Some(uri) },
                    },
                    span,
                ))
            }
            _ => Err(self.syntax_error(format!("expected a name, found {}", self.describe(0)))),
        }
    }
}
