//! Post-parse static analysis.
//!
//! Scope-checks variable references (`XPST0008`), and computes a
//! conservative bottom-up static type for each subtree to surface operand
//! type errors (`XPTY0004`) before evaluation. The analysis never narrows
//! beyond what is provable: `unknown` simply stays unknown.
//!
//! Unknown functions/arities and unbound prefixes are already rejected
//! during parsing; this pass covers what needs scope or type context.

use crate::engine::runtime::{Error, ErrorCode, StaticContext};
use crate::parser::ast::{Label, Token, TokenValue};
use crate::schema::SchemaProvider;
use crate::xdm::ExpandedName;
use crate::xdm::types::AtomicType;

/// Coarse static type: just enough lattice to reject impossible operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticType {
    Unknown,
    Empty,
    Nodes,
    Atomic(AtomicType),
    FunctionLike,
}

pub struct StaticChecker<'a> {
    static_ctx: &'a StaticContext,
    schema: Option<&'a dyn SchemaProvider>,
    version: crate::parser::dialects::DialectVersion,
    scope: Vec<ExpandedName>,
}

impl<'a> StaticChecker<'a> {
    pub fn new(
        static_ctx: &'a StaticContext,
        schema: Option<&'a dyn SchemaProvider>,
        version: crate::parser::dialects::DialectVersion,
    ) -> Self {
        Self {
            static_ctx,
            schema,
            version,
            scope: Vec::new(),
        }
    }

    pub fn check(&mut self, root: &Token) -> Result<(), Error> {
        self.visit(root).map(|_| ())
    }

    fn visit(&mut self, tok: &Token) -> Result<StaticType, Error> {
        match (tok.label, tok.symbol) {
            (Label::Variable, "$") => {
                let name = tok
                    .name_value()
                    .map(|n| n.expanded())
                    .expect("variable token carries its name");
                if !self.scope.contains(&name)
                    && !self.static_ctx.in_scope_variables.contains(&name)
                {
                    return Err(Error::from_code(
                        ErrorCode::XPST0008,
                        format!("undeclared variable ${}", name.local),
                    )
                    .with_span(tok.span));
                }
                Ok(StaticType::Unknown)
            }
            (_, "for") | (_, "some") | (_, "every") | (_, "let") => {
                let pushed = self.visit_bindings(tok)?;
                let body = self.visit(tok.operands.last().expect("binding forms have a body"))?;
                self.scope.truncate(self.scope.len() - pushed);
                Ok(match tok.symbol {
                    "for" | "let" => body,
                    _ => StaticType::Atomic(AtomicType::Boolean),
                })
            }
            (Label::Function, "function") => {
                let mut pushed = 0usize;
                for param in &tok.operands[..tok.operands.len() - 1] {
                    if let Some(name) = param.name_value() {
                        self.scope.push(name.expanded());
                        pushed += 1;
                    }
                }
                self.visit(tok.operands.last().expect("inline function has a body"))?;
                self.scope.truncate(self.scope.len() - pushed);
                Ok(StaticType::FunctionLike)
            }
            (Label::Function, _) => {
                // Static or dynamic call, or a named reference.
                for arg in &tok.operands {
                    self.visit(arg)?;
                }
                Ok(StaticType::Unknown)
            }
            (Label::Literal, sym) => Ok(StaticType::Atomic(match sym {
                "(integer)" => AtomicType::Integer,
                "(decimal)" => AtomicType::Decimal,
                "(double)" => AtomicType::Double,
                _ => AtomicType::String,
            })),
            (Label::Axis | Label::KindTest | Label::Wildcard, _) => {
                self.visit_operands(tok)?;
                Ok(self.step_type(tok))
            }
            (Label::Name, "(name)") => Ok(self.step_type(tok)),
            (Label::Operator, sym) => self.visit_operator(tok, sym),
            _ => {
                self.visit_operands(tok)?;
                Ok(StaticType::Unknown)
            }
        }
    }

    fn visit_operands(&mut self, tok: &Token) -> Result<(), Error> {
        for op in &tok.operands {
            self.visit(op)?;
        }
        Ok(())
    }

    /// Bind (var, expr) pairs; returns how many scope entries were pushed.
    fn visit_bindings(&mut self, tok: &Token) -> Result<usize, Error> {
        let mut pushed = 0usize;
        let pairs = &tok.operands[..tok.operands.len() - 1];
        for pair in pairs.chunks(2) {
            self.visit(&pair[1])?;
            if let Some(name) = pair[0].name_value() {
                self.scope.push(name.expanded());
                pushed += 1;
            }
        }
        Ok(pushed)
    }

    /// Steps produce nodes; with a schema the attribute/element type is
    /// refined but stays conservative (a future narrowing hook).
    fn step_type(&self, tok: &Token) -> StaticType {
        if let Some(schema) = self.schema
            && let Some(TokenValue::Name(name)) = &tok.value
        {
            let qname = name.expanded();
            let refined = if tok.symbol == "attribute" {
                schema.attribute_type(&qname)
            } else {
                schema.element_type(&qname)
            };
            if refined.is_some() {
                return StaticType::Nodes;
            }
        }
        StaticType::Nodes
    }

    fn visit_operator(&mut self, tok: &Token, sym: &str) -> Result<StaticType, Error> {
        match sym {
            "+" | "-" | "*" | "div" | "idiv" | "mod" => {
                let mut tys = Vec::new();
                for op in &tok.operands {
                    tys.push(self.visit(op)?);
                }
                // 1.0 coerces anything numeric-ward; no static rejection.
                let strict = self.version >= crate::parser::dialects::DialectVersion::V2_0;
                for ty in tys.iter().filter(|_| strict) {
                    if let StaticType::Atomic(a) = ty
                        && !a.is_numeric()
                        && !matches!(
                            a,
                            AtomicType::UntypedAtomic
                                | AtomicType::Duration
                                | AtomicType::YearMonthDuration
                                | AtomicType::DayTimeDuration
                                | AtomicType::Date
                                | AtomicType::Time
                                | AtomicType::DateTime
                                | AtomicType::DateTimeStamp
                        )
                    {
                        return Err(Error::from_code(
                            ErrorCode::XPTY0004,
                            format!("xs:{} is not a valid arithmetic operand", a.local_name()),
                        )
                        .with_span(tok.span));
                    }
                }
                // Minimal promotion: any double makes the result double.
                Ok(match tys.as_slice() {
                    [StaticType::Atomic(a), StaticType::Atomic(b)] => {
                        if *a == AtomicType::Double || *b == AtomicType::Double {
                            StaticType::Atomic(AtomicType::Double)
                        } else {
                            StaticType::Unknown
                        }
                    }
                    _ => StaticType::Unknown,
                })
            }
            "and" | "or" | "castable" | "instance" => {
                self.visit_operands(tok)?;
                Ok(StaticType::Atomic(AtomicType::Boolean))
            }
            "=" | "!=" | "<" | "<=" | ">" | ">=" | "eq" | "ne" | "lt" | "le" | "gt" | "ge"
            | "is" | "<<" | ">>" => {
                self.visit_operands(tok)?;
                Ok(StaticType::Atomic(AtomicType::Boolean))
            }
            "cast" => {
                self.visit_operands(tok)?;
                match &tok.value {
                    Some(TokenValue::SingleType { ty, .. }) => Ok(StaticType::Atomic(*ty)),
                    _ => Ok(StaticType::Unknown),
                }
            }
            "||" => {
                self.visit_operands(tok)?;
                Ok(StaticType::Atomic(AtomicType::String))
            }
            "to" => {
                self.visit_operands(tok)?;
                Ok(StaticType::Atomic(AtomicType::Integer))
            }
            "|" | "union" | "intersect" | "except" => {
                let mut saw_atomic = None;
                for op in &tok.operands {
                    if let StaticType::Atomic(a) = self.visit(op)? {
                        saw_atomic = Some(a);
                    }
                }
                if let Some(a) = saw_atomic {
                    return Err(Error::from_code(
                        ErrorCode::XPTY0004,
                        format!(
                            "set operations require node sequences, found xs:{}",
                            a.local_name()
                        ),
                    )
                    .with_span(tok.span));
                }
                Ok(StaticType::Nodes)
            }
            "()" => Ok(StaticType::Empty),
            _ => {
                self.visit_operands(tok)?;
                Ok(StaticType::Unknown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::dialects::DialectVersion;
    use crate::parser::parse_xpath;

    #[test]
    fn undeclared_variable_is_static() {
        let err = parse_xpath("$nope + 1", DialectVersion::V2_0).unwrap_err();
        assert_eq!(err.code.local, "XPST0008");
    }

    #[test]
    fn bound_variables_pass() {
        assert!(parse_xpath("for $x in 1 to 3 return $x", DialectVersion::V2_0).is_ok());
        assert!(parse_xpath("let $x := 2 return $x * $x", DialectVersion::V3_0).is_ok());
        assert!(
            parse_xpath("some $x in (1, 2) satisfies $x = 2", DialectVersion::V2_0).is_ok()
        );
    }

    #[test]
    fn atomic_operand_of_union_is_static_type_error() {
        let err = parse_xpath("1 union 2", DialectVersion::V2_0).unwrap_err();
        assert_eq!(err.code.local, "XPTY0004");
    }

    #[test]
    fn string_arithmetic_is_static_type_error() {
        let err = parse_xpath("\"a\" + 1", DialectVersion::V2_0).unwrap_err();
        assert_eq!(err.code.local, "XPTY0004");
    }
}
