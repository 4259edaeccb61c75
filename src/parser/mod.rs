//! Parsing entry points.
//!
//! `parse_xpath` turns a source string into an [`XPathExpr`]: the token
//! tree plus the static context it was resolved against. The tree is
//! immutable and may be shared across threads; evaluation state lives
//! entirely in the dynamic context.

use std::sync::Arc;

use crate::engine::runtime::{DynamicContext, Error, StaticContext};
use crate::model::XdmNode;
use crate::schema::SchemaProvider;
use crate::xdm::XdmSequence;

pub mod ast;
pub mod dialects;
pub mod kernel;
pub mod lexer;
pub mod span;
pub mod static_check;

use ast::Token;
use dialects::{DialectVersion, dialect};
use kernel::Cursor;
use lexer::Lexer;

/// A parsed, statically checked XPath expression.
#[derive(Clone)]
pub struct XPathExpr {
    root: Token,
    version: DialectVersion,
    static_ctx: Arc<StaticContext>,
    source: String,
}

impl XPathExpr {
    pub fn root(&self) -> &Token {
        &self.root
    }

    pub fn version(&self) -> DialectVersion {
        self.version
    }

    pub fn static_ctx(&self) -> &StaticContext {
        &self.static_ctx
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate and materialize the full result sequence.
    pub fn evaluate<N: XdmNode>(
        &self,
        dyn_ctx: &DynamicContext<N>,
    ) -> Result<XdmSequence<N>, Error> {
        crate::engine::evaluator::evaluate_expr(self, dyn_ctx)
    }

    /// Lazily iterate the result. Path steps, ranges, and sequence
    /// concatenations stream; other constructs materialize on demand.
    pub fn select<'a, N: XdmNode>(
        &'a self,
        dyn_ctx: &'a DynamicContext<N>,
    ) -> impl Iterator<Item = Result<crate::xdm::XdmItem<N>, Error>> + 'a {
        crate::engine::evaluator::select_expr(self, dyn_ctx)
    }
}

impl core::fmt::Debug for XPathExpr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XPathExpr")
            .field("source", &self.source)
            .field("version", &self.version.as_str())
            .finish()
    }
}

/// Parse with the default static context.
pub fn parse_xpath(source: &str, version: DialectVersion) -> Result<XPathExpr, Error> {
    parse_with_context(source, version, &StaticContext::default())
}

/// Parse against an explicit static context (namespaces, declared
/// variables, extra function signatures).
pub fn parse_with_context(
    source: &str,
    version: DialectVersion,
    static_ctx: &StaticContext,
) -> Result<XPathExpr, Error> {
    parse_full(source, version, static_ctx, None)
}

/// Parse with an optional schema provider feeding the static analysis.
pub fn parse_full(
    source: &str,
    version: DialectVersion,
    static_ctx: &StaticContext,
    schema: Option<&dyn SchemaProvider>,
) -> Result<XPathExpr, Error> {
    let dialect = dialect(version);
    let lexemes = Lexer::new(source, version).tokenize()?;
    let mut cursor = Cursor::new(
        lexemes,
        &dialect.table,
        version,
        static_ctx,
        &dialect.signatures,
        source,
    );
    let root = cursor.expression(0)?;
    if !cursor.at_end() {
        return Err(cursor.syntax_error(format!(
            "unexpected {} after complete expression",
            cursor.describe(0)
        )));
    }
    static_check::StaticChecker::new(static_ctx, schema, version).check(&root)?;
    Ok(XPathExpr {
        root,
        version,
        static_ctx: Arc::new(static_ctx.clone()),
        source: source.to_string(),
    })
}
