//! The token tree.
//!
//! Parsing does not translate tokens into a separate AST: the token a
//! construct was parsed from *is* its tree node, carrying the operand
//! tokens. One record type covers every construct; the registered symbol
//! and label say what a node means.

use rust_decimal::Decimal;

use crate::parser::span::Span;
use crate::xdm::types::{AtomicType, KindTest, NameOrWildcard, SequenceType};

/// Token category, fixed by the registered token class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Literal,
    /// A QName in name-test or function-name position.
    Name,
    Wildcard,
    Variable,
    Operator,
    Axis,
    Function,
    KindTest,
}

/// Payload of a token: literal data, a resolved name, or static type data
/// attached by the type operators.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Integer(i64),
    Decimal(Decimal),
    Double(f64),
    String(String),
    Name(NamePayload),
    NodeTest(NodeTest),
    SeqType(SequenceType),
    SingleType { ty: AtomicType, optional: bool },
}

/// A lexical QName with its prefix resolved against the static context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamePayload {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl NamePayload {
    pub fn expanded(&self) -> crate::xdm::ExpandedName {
        crate::xdm::ExpandedName::new(self.ns_uri.clone(), self.local.clone())
    }

    pub fn qname(&self) -> crate::model::QName {
        crate::model::QName {
            prefix: self.prefix.clone(),
            local: self.local.clone(),
            ns_uri: self.ns_uri.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    Name(NameOrWildcard),
    Kind(KindTest),
}

/// One node of the token tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub symbol: &'static str,
    pub label: Label,
    pub value: Option<TokenValue>,
    pub operands: Vec<Token>,
    pub span: Span,
}

impl Token {
    pub fn new(symbol: &'static str, label: Label, span: Span) -> Self {
        Self {
            symbol,
            label,
            value: None,
            operands: Vec::new(),
            span,
        }
    }

    pub fn with_value(mut self, value: TokenValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_operands(mut self, operands: Vec<Token>) -> Self {
        if let Some(first) = operands.first() {
            self.span = self.span.cover(first.span);
        }
        if let Some(last) = operands.last() {
            self.span = self.span.cover(last.span);
        }
        self.operands = operands;
        self
    }

    pub fn push(&mut self, operand: Token) {
        self.span = self.span.cover(operand.span);
        self.operands.push(operand);
    }

    /// n-th operand; panics only on parser bugs, never on user input.
    pub fn op(&self, n: usize) -> &Token {
        &self.operands[n]
    }

    pub fn name_value(&self) -> Option<&NamePayload> {
        match &self.value {
            Some(TokenValue::Name(n)) => Some(n),
            _ => None,
        }
    }

    pub fn string_literal(&self) -> Option<&str> {
        match &self.value {
            Some(TokenValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer_literal(&self) -> Option<i64> {
        match &self.value {
            Some(TokenValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Whether this token is one of the step forms (axis step, name test,
    /// kind test, abbreviations) that a path joins together.
    pub fn is_step(&self) -> bool {
        matches!(self.label, Label::Axis | Label::KindTest | Label::Wildcard)
            || (self.label == Label::Name && self.symbol == "(name)")
            || self.symbol == "."
            || self.symbol == ".."
            || (self.symbol == "[" && !self.operands.is_empty() && self.op(0).is_step())
    }
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.label {
            Label::Literal => match &self.value {
                Some(TokenValue::String(s)) => write!(f, "{s:?}"),
                Some(TokenValue::Integer(i)) => write!(f, "{i}"),
                Some(TokenValue::Decimal(d)) => write!(f, "{d}"),
                Some(TokenValue::Double(d)) => write!(f, "{d:e}"),
                _ => write!(f, "{}", self.symbol),
            },
            Label::Name | Label::Variable | Label::Function => match self.name_value() {
                Some(n) => match (&n.prefix, self.label) {
                    (Some(p), Label::Variable) => write!(f, "${}:{}", p, n.local),
                    (None, Label::Variable) => write!(f, "${}", n.local),
                    (Some(p), _) => write!(f, "{}:{}", p, n.local),
                    (None, _) => write!(f, "{}", n.local),
                },
                None => write!(f, "{}", self.symbol),
            },
            Label::Axis => write!(f, "{}::", self.symbol),
            _ => write!(f, "{}", self.symbol),
        }
    }
}
