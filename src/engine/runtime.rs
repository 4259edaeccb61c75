//! Errors, evaluation contexts, and the function/collation registries.
//!
//! The static context is fixed when an expression is parsed; the dynamic
//! context is supplied per evaluation. Both are built through builders and
//! are immutable afterwards — sub-expressions that change focus work on
//! copy-on-write snapshots inside the evaluator, never on shared state.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset};

use crate::engine::collation::CollationRegistry;
use crate::model::XdmNode;
use crate::parser::dialects::DialectVersion;
use crate::parser::span::Span;
use crate::xdm::types::SequenceType;
use crate::xdm::{ExpandedName, XdmItem, XdmSequence};

/// Error codes the engine emits, in the `err:` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum ErrorCode {
    // Static errors
    XPST0003, // syntax error
    XPST0008, // undeclared variable
    XPST0017, // unknown function or wrong arity
    XPST0051, // unknown atomic type in a sequence type
    XPST0080, // cast to NOTATION or anyAtomicType
    XPST0081, // unbound namespace prefix
    // Type errors
    XPTY0004, // operand type mismatch
    XPTY0018, // path result mixes nodes and atomics
    XPTY0019, // step applied to non-node
    XPTY0020, // axis step context item is not a node
    // Dynamic errors
    XPDY0002, // absent context item
    XPDY0050, // treat as mismatch
    XQDY0137, // duplicate key in map constructor
    // Functions and operators
    FOAR0001, // division by zero
    FOAR0002, // numeric overflow/underflow
    FOCA0001, // value too large for decimal
    FOCA0002, // invalid lexical value
    FOCA0003, // value out of range for integer
    FOCA0005, // NaN supplied as float/double value
    FOCH0001, // codepoint not valid
    FOCH0002, // unsupported collation
    FOCH0003, // unsupported normalization form
    FODC0002, // error retrieving resource
    FODC0005, // invalid argument to fn:doc
    FODT0001, // overflow in date/time arithmetic
    FODT0002, // overflow in duration arithmetic
    FODT0003, // invalid timezone value
    FOER0000, // fn:error
    FONS0004, // no namespace found for prefix
    FONS0005, // base URI not defined
    FORG0001, // invalid value for cast/constructor
    FORG0003, // zero-or-one got more than one
    FORG0004, // one-or-more got empty
    FORG0005, // exactly-one violated
    FORG0006, // invalid argument type
    FORG0008, // fn:dateTime arguments with differing timezones
    FORG0009, // error resolving relative URI
    FORX0001, // invalid regex flags
    FORX0002, // invalid regex pattern
    FORX0003, // pattern matches the zero-length string
    FORX0004, // invalid replacement string
    FOTY0013, // function item has no atomization
    FOTY0014, // function item has no string value
    FOAY0001, // array index out of bounds
    FOAY0002, // negative array length
    FOJS0003, // duplicate keys rejected in map:merge
    FOJS0005, // invalid option parameter
}

impl ErrorCode {
    pub fn local_name(self) -> &'static str {
        macro_rules! names {
            ($($v:ident),+ $(,)?) => {
                match self { $(ErrorCode::$v => stringify!($v)),+ }
            };
        }
        names!(
            XPST0003, XPST0008, XPST0017, XPST0051, XPST0080, XPST0081, XPTY0004, XPTY0018, XPTY0019,
            XPTY0020, XPDY0002, XPDY0050, XQDY0137, FOAR0001, FOAR0002, FOCA0001, FOCA0002,
            FOCA0003, FOCA0005, FOCH0001, FOCH0002, FOCH0003, FODC0002, FODC0005, FODT0001,
            FODT0002, FODT0003,
            FOER0000, FONS0004, FONS0005, FORG0001, FORG0003, FORG0004, FORG0005, FORG0006,
            FORG0008, FORG0009, FORX0001, FORX0002, FORX0003, FORX0004, FOTY0013, FOTY0014,
            FOAY0001, FOAY0002, FOJS0003, FOJS0005,
        )
    }

    pub fn qname(self) -> ExpandedName {
        ExpandedName::in_ns(crate::consts::ERR_NS, self.local_name())
    }
}

/// An XPath error: a code QName, a message, the source span of the token
/// that raised it (when known), and an optional chained cause.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} [{code}]")]
pub struct Error {
    pub code: ExpandedName,
    pub message: String,
    pub span: Option<Span>,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code: code.qname(),
            message: msg.into(),
            span: None,
            source: None,
        }
    }

    /// Error with a caller-supplied code QName (used by `fn:error`).
    pub fn with_qname(code: ExpandedName, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            span: None,
            source: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn with_source(mut self, source: Arc<dyn std::error::Error + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_code(&self, code: ErrorCode) -> bool {
        self.code == code.qname()
    }

    /// `err:LOCAL` for spec-defined codes, `Q{ns}local` otherwise.
    pub fn format_code(&self) -> String {
        if self.code.ns_uri.as_deref() == Some(crate::consts::ERR_NS) {
            format!("err:{}", self.code.local)
        } else {
            self.code.to_string()
        }
    }
}

// ===== Focus and call context =====

/// The focus triple: context item, 1-based position, focus size.
#[derive(Debug, Clone)]
pub struct Focus<N: XdmNode> {
    pub item: Option<XdmItem<N>>,
    pub position: usize,
    pub size: usize,
}

impl<N: XdmNode> Default for Focus<N> {
    fn default() -> Self {
        Self {
            item: None,
            position: 0,
            size: 0,
        }
    }
}

impl<N: XdmNode> Focus<N> {
    pub fn of(item: XdmItem<N>) -> Self {
        Self {
            item: Some(item),
            position: 1,
            size: 1,
        }
    }

    pub fn item_or_absent(&self) -> Result<&XdmItem<N>, Error> {
        self.item
            .as_ref()
            .ok_or_else(|| Error::from_code(ErrorCode::XPDY0002, "context item is absent"))
    }
}

/// Calling context handed to native functions: the dynamic environment plus
/// the focus at the call site.
pub struct CallCtx<'a, N: XdmNode> {
    pub env: &'a DynamicContext<N>,
    pub static_ctx: &'a StaticContext,
    pub focus: &'a Focus<N>,
    /// Frozen once per evaluation.
    pub now: DateTime<FixedOffset>,
    pub version: DialectVersion,
}

impl<N: XdmNode> CallCtx<'_, N> {
    /// The implicit timezone: an explicit override wins, otherwise the
    /// offset of the frozen evaluation instant.
    pub fn implicit_timezone(&self) -> FixedOffset {
        self.env.implicit_timezone.unwrap_or(*self.now.offset())
    }

    pub fn default_collation(&self) -> &str {
        &self.static_ctx.default_collation
    }
}

// ===== Functions =====

pub type NativeFn<N> = Arc<
    dyn Fn(&CallCtx<'_, N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync,
>;

pub struct FunctionDef<N: XdmNode> {
    pub min_arity: usize,
    /// `None` means variadic from `min_arity` (fn:concat).
    pub max_arity: Option<usize>,
    /// Declared parameter types; when present the evaluator applies the
    /// function conversion rules (atomization, untyped cast, numeric
    /// promotion) before the call. Variadic functions repeat the last spec.
    pub params: Option<Vec<SequenceType>>,
    pub body: NativeFn<N>,
}

impl<N: XdmNode> FunctionDef<N> {
    pub fn accepts_arity(&self, argc: usize) -> bool {
        argc >= self.min_arity && self.max_arity.is_none_or(|m| argc <= m)
    }
}

/// Built-in and user functions keyed by expanded name; overloads on arity
/// are separate entries, resolved first-match.
pub struct FunctionRegistry<N: XdmNode> {
    fns: HashMap<ExpandedName, Vec<FunctionDef<N>>>,
}

impl<N: XdmNode> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }
}

impl<N: XdmNode> FunctionRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        ns_uri: &str,
        local: &str,
        min_arity: usize,
        max_arity: Option<usize>,
        params: Option<Vec<SequenceType>>,
        body: NativeFn<N>,
    ) {
        let name = ExpandedName::in_ns(ns_uri, local);
        self.fns.entry(name).or_default().push(FunctionDef {
            min_arity,
            max_arity,
            params,
            body,
        });
    }

    /// Exact-arity convenience used by most registrations.
    pub fn register_fn<F>(&mut self, ns_uri: &str, local: &str, arity: usize, f: F)
    where
        F: Fn(&CallCtx<'_, N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error>
            + Send
            + Sync
            + 'static,
    {
        self.register(ns_uri, local, arity, Some(arity), None, Arc::new(f));
    }

    /// Arity-range convenience (optional trailing arguments; `None` max is
    /// variadic).
    pub fn register_range<F>(
        &mut self,
        ns_uri: &str,
        local: &str,
        min_arity: usize,
        max_arity: Option<usize>,
        f: F,
    ) where
        F: Fn(&CallCtx<'_, N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error>
            + Send
            + Sync
            + 'static,
    {
        self.register(ns_uri, local, min_arity, max_arity, None, Arc::new(f));
    }

    pub fn resolve(&self, name: &ExpandedName, argc: usize) -> Option<&FunctionDef<N>> {
        self.fns
            .get(name)?
            .iter()
            .find(|def| def.accepts_arity(argc))
    }

    pub fn contains(&self, name: &ExpandedName) -> bool {
        self.fns.contains_key(name)
    }

    pub fn arities(&self, name: &ExpandedName) -> Vec<(usize, Option<usize>)> {
        self.fns
            .get(name)
            .map(|v| v.iter().map(|d| (d.min_arity, d.max_arity)).collect())
            .unwrap_or_default()
    }
}

/// Arity table consulted during static analysis, so unknown functions and
/// wrong arities surface as `XPST0017` without evaluating anything.
#[derive(Debug, Clone, Default)]
pub struct FunctionSignatures {
    sigs: HashMap<ExpandedName, Vec<(usize, Option<usize>)>>,
}

impl FunctionSignatures {
    pub fn register(&mut self, ns_uri: &str, local: &str, min: usize, max: Option<usize>) {
        self.sigs
            .entry(ExpandedName::in_ns(ns_uri, local))
            .or_default()
            .push((min, max));
    }

    pub fn knows(&self, name: &ExpandedName) -> bool {
        self.sigs.contains_key(name)
    }

    pub fn accepts(&self, name: &ExpandedName, argc: usize) -> bool {
        self.sigs.get(name).is_some_and(|v| {
            v.iter()
                .any(|(min, max)| argc >= *min && max.is_none_or(|m| argc <= m))
        })
    }
}

// ===== Document loading =====

/// Loader callback for `fn:doc`. The engine never performs I/O itself; the
/// caller decides what a URI means.
pub trait DocumentLoader<N>: Send + Sync {
    fn load(&self, uri: &str) -> Result<Option<N>, Error>;
}

// ===== Static context =====

#[derive(Debug, Clone)]
pub struct StaticContext {
    pub base_uri: Option<String>,
    pub default_element_namespace: Option<String>,
    pub default_function_namespace: String,
    pub default_collation: String,
    pub namespaces: HashMap<String, String>,
    pub in_scope_variables: HashSet<ExpandedName>,
    /// Caller-registered function signatures visible to the static checker
    /// in addition to the dialect built-ins.
    pub extra_functions: FunctionSignatures,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut namespaces = HashMap::new();
        // Reserved bindings; `xml` cannot be rebound.
        namespaces.insert("xml".to_string(), crate::consts::XML_NS.to_string());
        namespaces.insert("xs".to_string(), crate::consts::XS_NS.to_string());
        namespaces.insert("xsi".to_string(), crate::consts::XSI_NS.to_string());
        namespaces.insert("fn".to_string(), crate::consts::FN_NS.to_string());
        namespaces.insert("math".to_string(), crate::consts::MATH_NS.to_string());
        namespaces.insert("map".to_string(), crate::consts::MAP_NS.to_string());
        namespaces.insert("array".to_string(), crate::consts::ARRAY_NS.to_string());
        namespaces.insert("err".to_string(), crate::consts::ERR_NS.to_string());
        namespaces.insert("local".to_string(), crate::consts::LOCAL_NS.to_string());
        Self {
            base_uri: None,
            default_element_namespace: None,
            default_function_namespace: crate::consts::FN_NS.to_string(),
            default_collation: crate::consts::CODEPOINT_URI.to_string(),
            namespaces,
            in_scope_variables: HashSet::new(),
            extra_functions: FunctionSignatures::default(),
        }
    }
}

impl StaticContext {
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }
}

pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: StaticContext::default(),
        }
    }

    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.ctx.base_uri = Some(uri.into());
        self
    }

    pub fn default_element_namespace(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_element_namespace = Some(uri.into());
        self
    }

    pub fn default_function_namespace(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_function_namespace = uri.into();
        self
    }

    pub fn default_collation(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_collation = uri.into();
        self
    }

    /// Bind a prefix. Attempts to rebind `xml` are ignored.
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let p = prefix.into();
        if p != "xml" {
            self.ctx.namespaces.insert(p, uri.into());
        }
        self
    }

    /// Declare a variable as in scope for the static checker.
    pub fn variable(mut self, name: ExpandedName) -> Self {
        self.ctx.in_scope_variables.insert(name);
        self
    }

    pub fn function_signature(
        mut self,
        ns_uri: &str,
        local: &str,
        min: usize,
        max: Option<usize>,
    ) -> Self {
        self.ctx.extra_functions.register(ns_uri, local, min, max);
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

// ===== Dynamic context =====

pub struct DynamicContext<N: XdmNode> {
    pub context_item: Option<XdmItem<N>>,
    pub variables: HashMap<ExpandedName, XdmSequence<N>>,
    pub functions: Arc<FunctionRegistry<N>>,
    pub collations: Arc<CollationRegistry>,
    pub loader: Option<Arc<dyn DocumentLoader<N>>>,
    /// Documents already available, keyed by absolute URI. Doubles as the
    /// cache for loader results.
    documents: Mutex<HashMap<String, N>>,
    /// Fixed instant for current-dateTime; sampled at evaluation start when
    /// absent and then held stable for the whole evaluation.
    pub now: Option<DateTime<FixedOffset>>,
    pub implicit_timezone: Option<FixedOffset>,
    /// Cooperative cancellation, polled at token-evaluation boundaries.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl<N: XdmNode> DynamicContext<N> {
    pub fn cached_document(&self, uri: &str) -> Option<N> {
        self.documents.lock().unwrap().get(uri).cloned()
    }

    pub fn cache_document(&self, uri: &str, doc: N) {
        self.documents.lock().unwrap().insert(uri.to_string(), doc);
    }
}

pub struct DynamicContextBuilder<N: XdmNode> {
    ctx: DynamicContext<N>,
}

impl<N: XdmNode> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: XdmNode> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            ctx: DynamicContext {
                context_item: None,
                variables: HashMap::new(),
                functions: Arc::new(crate::engine::functions::registry_for(
                    DialectVersion::V3_1,
                )),
                collations: Arc::new(CollationRegistry::default()),
                loader: None,
                documents: Mutex::new(HashMap::new()),
                now: None,
                implicit_timezone: None,
                cancel: None,
            },
        }
    }

    pub fn context_item(mut self, item: impl Into<XdmItem<N>>) -> Self {
        self.ctx.context_item = Some(item.into());
        self
    }

    pub fn variable(mut self, name: ExpandedName, value: impl Into<XdmSequence<N>>) -> Self {
        self.ctx.variables.insert(name, value.into());
        self
    }

    pub fn functions(mut self, reg: Arc<FunctionRegistry<N>>) -> Self {
        self.ctx.functions = reg;
        self
    }

    pub fn collations(mut self, reg: Arc<CollationRegistry>) -> Self {
        self.ctx.collations = reg;
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DocumentLoader<N>>) -> Self {
        self.ctx.loader = Some(loader);
        self
    }

    pub fn document(self, uri: &str, doc: N) -> Self {
        self.ctx.cache_document(uri, doc);
        self
    }

    /// Fix the instant reported by current-dateTime (deterministic tests).
    pub fn now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.ctx.now = Some(now);
        self
    }

    pub fn implicit_timezone(mut self, offset_seconds: i32) -> Self {
        self.ctx.implicit_timezone = FixedOffset::east_opt(offset_seconds);
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.ctx.cancel = Some(flag);
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        self.ctx
    }
}
