//! The atomic type lattice and sequence types.
//!
//! The derivation DAG and the promotion lattice are static tables; subtype
//! checks walk parents, promotion checks consult the numeric tower plus the
//! two special edges (anyURI to string, duration subtypes to duration).

use crate::model::{NodeKind, XdmNode};
use crate::xdm::{ExpandedName, XdmItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    AnyAtomic,
    UntypedAtomic,
    String,
    NormalizedString,
    Token,
    Language,
    NMTOKEN,
    Name,
    NCName,
    Id,
    IdRef,
    Entity,
    Boolean,
    Decimal,
    Integer,
    NonPositiveInteger,
    NegativeInteger,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    PositiveInteger,
    Float,
    Double,
    Duration,
    YearMonthDuration,
    DayTimeDuration,
    DateTime,
    DateTimeStamp,
    Date,
    Time,
    GYear,
    GYearMonth,
    GMonth,
    GMonthDay,
    GDay,
    AnyUri,
    QName,
    Notation,
    Base64Binary,
    HexBinary,
}

impl AtomicType {
    /// Immediate base type in the XSD derivation tree.
    pub fn parent(self) -> Option<AtomicType> {
        use AtomicType as T;
        Some(match self {
            T::AnyAtomic => return None,
            T::UntypedAtomic | T::String | T::Boolean | T::Decimal | T::Float | T::Double
            | T::Duration | T::DateTime | T::Date | T::Time | T::GYear | T::GYearMonth
            | T::GMonth | T::GMonthDay | T::GDay | T::AnyUri | T::QName | T::Notation
            | T::Base64Binary | T::HexBinary => T::AnyAtomic,
            T::NormalizedString => T::String,
            T::Token => T::NormalizedString,
            T::Language | T::NMTOKEN => T::Token,
            T::Name => T::Token,
            T::NCName => T::Name,
            T::Id | T::IdRef | T::Entity => T::NCName,
            T::Integer => T::Decimal,
            T::NonPositiveInteger => T::Integer,
            T::NegativeInteger => T::NonPositiveInteger,
            T::Long => T::Integer,
            T::Int => T::Long,
            T::Short => T::Int,
            T::Byte => T::Short,
            T::NonNegativeInteger => T::Integer,
            T::UnsignedLong => T::NonNegativeInteger,
            T::UnsignedInt => T::UnsignedLong,
            T::UnsignedShort => T::UnsignedInt,
            T::UnsignedByte => T::UnsignedShort,
            T::PositiveInteger => T::NonNegativeInteger,
            T::YearMonthDuration | T::DayTimeDuration => T::Duration,
            T::DateTimeStamp => T::DateTime,
        })
    }

    /// Reflexive-transitive derivation check.
    pub fn derives_from(self, sup: AtomicType) -> bool {
        let mut cur = Some(self);
        while let Some(t) = cur {
            if t == sup {
                return true;
            }
            cur = t.parent();
        }
        false
    }

    pub fn is_numeric(self) -> bool {
        self.derives_from(AtomicType::Decimal)
            || self == AtomicType::Float
            || self == AtomicType::Double
    }

    /// Whether a value of `self` can be promoted to `target` during function
    /// conversion and operator dispatch. Asymmetric.
    pub fn promotes_to(self, target: AtomicType) -> bool {
        use AtomicType as T;
        if self.derives_from(target) {
            return true;
        }
        match target {
            T::Double => self.is_numeric(),
            T::Float => self.derives_from(T::Decimal) || self == T::Float,
            T::String => self.derives_from(T::AnyUri),
            _ => false,
        }
    }

    pub fn local_name(self) -> &'static str {
        use AtomicType as T;
        match self {
            T::AnyAtomic => "anyAtomicType",
            T::UntypedAtomic => "untypedAtomic",
            T::String => "string",
            T::NormalizedString => "normalizedString",
            T::Token => "token",
            T::Language => "language",
            T::NMTOKEN => "NMTOKEN",
            T::Name => "Name",
            T::NCName => "NCName",
            T::Id => "ID",
            T::IdRef => "IDREF",
            T::Entity => "ENTITY",
            T::Boolean => "boolean",
            T::Decimal => "decimal",
            T::Integer => "integer",
            T::NonPositiveInteger => "nonPositiveInteger",
            T::NegativeInteger => "negativeInteger",
            T::Long => "long",
            T::Int => "int",
            T::Short => "short",
            T::Byte => "byte",
            T::NonNegativeInteger => "nonNegativeInteger",
            T::UnsignedLong => "unsignedLong",
            T::UnsignedInt => "unsignedInt",
            T::UnsignedShort => "unsignedShort",
            T::UnsignedByte => "unsignedByte",
            T::PositiveInteger => "positiveInteger",
            T::Float => "float",
            T::Double => "double",
            T::Duration => "duration",
            T::YearMonthDuration => "yearMonthDuration",
            T::DayTimeDuration => "dayTimeDuration",
            T::DateTime => "dateTime",
            T::DateTimeStamp => "dateTimeStamp",
            T::Date => "date",
            T::Time => "time",
            T::GYear => "gYear",
            T::GYearMonth => "gYearMonth",
            T::GMonth => "gMonth",
            T::GMonthDay => "gMonthDay",
            T::GDay => "gDay",
            T::AnyUri => "anyURI",
            T::QName => "QName",
            T::Notation => "NOTATION",
            T::Base64Binary => "base64Binary",
            T::HexBinary => "hexBinary",
        }
    }

    /// Look up an `xs:` local name. Returns `None` for unknown names and for
    /// the non-atomic schema types (`anyType`, `anySimpleType`).
    pub fn by_local_name(local: &str) -> Option<AtomicType> {
        use AtomicType as T;
        Some(match local {
            "anyAtomicType" => T::AnyAtomic,
            "untypedAtomic" => T::UntypedAtomic,
            "string" => T::String,
            "normalizedString" => T::NormalizedString,
            "token" => T::Token,
            "language" => T::Language,
            "NMTOKEN" => T::NMTOKEN,
            "Name" => T::Name,
            "NCName" => T::NCName,
            "ID" => T::Id,
            "IDREF" => T::IdRef,
            "ENTITY" => T::Entity,
            "boolean" => T::Boolean,
            "decimal" => T::Decimal,
            "integer" => T::Integer,
            "nonPositiveInteger" => T::NonPositiveInteger,
            "negativeInteger" => T::NegativeInteger,
            "long" => T::Long,
            "int" => T::Int,
            "short" => T::Short,
            "byte" => T::Byte,
            "nonNegativeInteger" => T::NonNegativeInteger,
            "unsignedLong" => T::UnsignedLong,
            "unsignedInt" => T::UnsignedInt,
            "unsignedShort" => T::UnsignedShort,
            "unsignedByte" => T::UnsignedByte,
            "positiveInteger" => T::PositiveInteger,
            "float" => T::Float,
            "double" => T::Double,
            "duration" => T::Duration,
            "yearMonthDuration" => T::YearMonthDuration,
            "dayTimeDuration" => T::DayTimeDuration,
            "dateTime" => T::DateTime,
            "dateTimeStamp" => T::DateTimeStamp,
            "date" => T::Date,
            "time" => T::Time,
            "gYear" => T::GYear,
            "gYearMonth" => T::GYearMonth,
            "gMonth" => T::GMonth,
            "gMonthDay" => T::GMonthDay,
            "gDay" => T::GDay,
            "anyURI" => T::AnyUri,
            "QName" => T::QName,
            "NOTATION" => T::Notation,
            "base64Binary" => T::Base64Binary,
            "hexBinary" => T::HexBinary,
            _ => return None,
        })
    }

    pub fn qname(self) -> ExpandedName {
        ExpandedName::new(Some(crate::consts::XS_NS.to_string()), self.local_name())
    }
}

// ===== Node tests and kind tests =====

#[derive(Debug, Clone, PartialEq)]
pub enum NameOrWildcard {
    Name(ExpandedName),
    /// `*`
    Any,
    /// `pfx:*` (stored with the prefix resolved to its URI)
    NsAny(String),
    /// `*:local`
    LocalAny(String),
}

impl NameOrWildcard {
    pub fn matches(&self, name: Option<&crate::model::QName>) -> bool {
        let Some(name) = name else {
            return matches!(self, NameOrWildcard::Any);
        };
        match self {
            NameOrWildcard::Any => true,
            NameOrWildcard::Name(e) => {
                e.local == name.local && e.ns_uri.as_deref() == name.ns_uri.as_deref()
            }
            NameOrWildcard::NsAny(uri) => name.ns_uri.as_deref() == Some(uri.as_str()),
            NameOrWildcard::LocalAny(local) => name.local == *local,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    /// `node()`
    AnyKind,
    Text,
    Comment,
    NamespaceNode,
    /// `processing-instruction(target?)`
    Pi(Option<String>),
    /// `document-node(inner?)`
    Document(Option<Box<KindTest>>),
    Element {
        name: Option<NameOrWildcard>,
        ty: Option<ExpandedName>,
        nillable: bool,
    },
    Attribute {
        name: Option<NameOrWildcard>,
        ty: Option<ExpandedName>,
    },
    SchemaElement(ExpandedName),
    SchemaAttribute(ExpandedName),
}

impl KindTest {
    /// Type annotations only match the untyped defaults here; trees validated
    /// against a schema go through the `SchemaProvider` in static analysis.
    fn type_annotation_matches(ty: &Option<ExpandedName>, element: bool) -> bool {
        match ty {
            None => true,
            Some(t) => {
                t.ns_uri.as_deref() == Some(crate::consts::XS_NS)
                    && if element {
                        t.local == "anyType" || t.local == "untyped"
                    } else {
                        t.local == "anySimpleType" || t.local == "untypedAtomic"
                    }
            }
        }
    }

    pub fn matches_node<N: XdmNode>(&self, n: &N) -> bool {
        match self {
            KindTest::AnyKind => true,
            KindTest::Text => n.kind() == NodeKind::Text,
            KindTest::Comment => n.kind() == NodeKind::Comment,
            KindTest::NamespaceNode => n.kind() == NodeKind::Namespace,
            KindTest::Pi(target) => {
                n.kind() == NodeKind::ProcessingInstruction
                    && target
                        .as_ref()
                        .is_none_or(|t| n.name().is_some_and(|q| q.local == *t))
            }
            KindTest::Document(inner) => {
                n.kind() == NodeKind::Document
                    && inner.as_ref().is_none_or(|kt| {
                        n.children()
                            .iter()
                            .filter(|c| c.kind() == NodeKind::Element)
                            .all(|c| kt.matches_node(c))
                    })
            }
            KindTest::Element { name, ty, .. } => {
                n.kind() == NodeKind::Element
                    && name.as_ref().is_none_or(|w| w.matches(n.name().as_ref()))
                    && Self::type_annotation_matches(ty, true)
            }
            KindTest::Attribute { name, ty } => {
                n.kind() == NodeKind::Attribute
                    && name.as_ref().is_none_or(|w| w.matches(n.name().as_ref()))
                    && Self::type_annotation_matches(ty, false)
            }
            KindTest::SchemaElement(name) => {
                n.kind() == NodeKind::Element
                    && n.name().is_some_and(|q| {
                        q.local == name.local && q.ns_uri.as_deref() == name.ns_uri.as_deref()
                    })
            }
            KindTest::SchemaAttribute(name) => {
                n.kind() == NodeKind::Attribute
                    && n.name().is_some_and(|q| {
                        q.local == name.local && q.ns_uri.as_deref() == name.ns_uri.as_deref()
                    })
            }
        }
    }
}

// ===== Sequence types =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    pub fn accepts(self, len: usize) -> bool {
        match self {
            Occurrence::One => len == 1,
            Occurrence::ZeroOrOne => len <= 1,
            Occurrence::ZeroOrMore => true,
            Occurrence::OneOrMore => len >= 1,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            Occurrence::One => "",
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemType {
    /// `item()`
    AnyItem,
    Atomic(AtomicType),
    Kind(KindTest),
    /// `function(*)`
    AnyFunction,
    Function {
        args: Vec<SequenceType>,
        ret: Box<SequenceType>,
    },
    /// `map(*)`
    AnyMap,
    Map {
        key: AtomicType,
        value: Box<SequenceType>,
    },
    /// `array(*)`
    AnyArray,
    Array(Box<SequenceType>),
}

impl ItemType {
    pub fn matches<N: XdmNode>(&self, item: &XdmItem<N>) -> bool {
        match (self, item) {
            (ItemType::AnyItem, _) => true,
            (ItemType::Atomic(t), XdmItem::Atomic(a)) => a.type_of().derives_from(*t),
            (ItemType::Kind(kt), XdmItem::Node(n)) => kt.matches_node(n),
            (ItemType::AnyFunction, XdmItem::Function(_))
            | (ItemType::AnyFunction, XdmItem::Map(_))
            | (ItemType::AnyFunction, XdmItem::Array(_)) => true,
            (ItemType::Function { args, .. }, XdmItem::Function(f)) => args.len() == f.arity(),
            // Maps are functions of arity 1, arrays too.
            (ItemType::Function { args, .. }, XdmItem::Map(_))
            | (ItemType::Function { args, .. }, XdmItem::Array(_)) => args.len() == 1,
            (ItemType::AnyMap, XdmItem::Map(_)) => true,
            (ItemType::Map { key, value }, XdmItem::Map(m)) => m
                .entries()
                .iter()
                .all(|(k, v)| k.type_of().derives_from(*key) && value.matches_sequence(v)),
            (ItemType::AnyArray, XdmItem::Array(_)) => true,
            (ItemType::Array(member), XdmItem::Array(a)) => {
                a.members().iter().all(|m| member.matches_sequence(m))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceType {
    /// `empty-sequence()`
    Empty,
    Typed {
        item: ItemType,
        occ: Occurrence,
    },
}

impl SequenceType {
    pub const ANY: SequenceType = SequenceType::Typed {
        item: ItemType::AnyItem,
        occ: Occurrence::ZeroOrMore,
    };

    pub fn one(item: ItemType) -> Self {
        SequenceType::Typed {
            item,
            occ: Occurrence::One,
        }
    }

    pub fn atomic(t: AtomicType, occ: Occurrence) -> Self {
        SequenceType::Typed {
            item: ItemType::Atomic(t),
            occ,
        }
    }

    /// The `instance of` decision procedure.
    pub fn matches_sequence<N: XdmNode>(&self, seq: &[XdmItem<N>]) -> bool {
        match self {
            SequenceType::Empty => seq.is_empty(),
            SequenceType::Typed { item, occ } => {
                occ.accepts(seq.len()) && seq.iter().all(|it| item.matches(it))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_walks_to_root() {
        assert!(AtomicType::Id.derives_from(AtomicType::String));
        assert!(AtomicType::UnsignedByte.derives_from(AtomicType::Integer));
        assert!(AtomicType::Integer.derives_from(AtomicType::Decimal));
        assert!(!AtomicType::Decimal.derives_from(AtomicType::Integer));
        assert!(AtomicType::DateTimeStamp.derives_from(AtomicType::DateTime));
    }

    #[test]
    fn promotion_is_asymmetric() {
        assert!(AtomicType::Integer.promotes_to(AtomicType::Double));
        assert!(AtomicType::Decimal.promotes_to(AtomicType::Float));
        assert!(AtomicType::Float.promotes_to(AtomicType::Double));
        assert!(!AtomicType::Double.promotes_to(AtomicType::Float));
        assert!(AtomicType::AnyUri.promotes_to(AtomicType::String));
        assert!(!AtomicType::String.promotes_to(AtomicType::AnyUri));
    }

    #[test]
    fn occurrence_bounds() {
        assert!(Occurrence::ZeroOrOne.accepts(0));
        assert!(!Occurrence::ZeroOrOne.accepts(2));
        assert!(Occurrence::OneOrMore.accepts(3));
        assert!(!Occurrence::OneOrMore.accepts(0));
    }
}
