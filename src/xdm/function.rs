//! Function items, maps, and arrays (XPath 3.0/3.1).
//!
//! All three are immutable values with cheap clones; "updates" (`map:put`,
//! `array:append`, …) copy the backing storage.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::runtime::{Error, ErrorCode, NativeFn};
use crate::model::XdmNode;
use crate::parser::ast::Token;
use crate::xdm::types::SequenceType;
use crate::xdm::{ExpandedName, XdmAtomicValue, XdmSequence};
#[cfg(test)]
use crate::xdm::XdmItem;

/// A first-class function value.
#[derive(Clone)]
pub struct FunctionItem<N: XdmNode> {
    inner: Arc<FunctionKind<N>>,
}

pub enum FunctionKind<N: XdmNode> {
    /// A named built-in or registered function, bound at reference time.
    Native {
        name: Option<ExpandedName>,
        arity: usize,
        body: NativeFn<N>,
    },
    /// `function($a, $b) { ... }` with its captured environment.
    Inline {
        params: Vec<(ExpandedName, Option<SequenceType>)>,
        ret: Option<SequenceType>,
        body: Arc<Token>,
        closure: Vec<(ExpandedName, XdmSequence<N>)>,
    },
    /// Partial application: `f(?, 2)`. `None` slots are placeholders.
    Partial {
        base: FunctionItem<N>,
        bound: Vec<Option<XdmSequence<N>>>,
    },
}

impl<N: XdmNode> FunctionItem<N> {
    pub fn native(name: Option<ExpandedName>, arity: usize, body: NativeFn<N>) -> Self {
        Self {
            inner: Arc::new(FunctionKind::Native { name, arity, body }),
        }
    }

    pub fn inline(
        params: Vec<(ExpandedName, Option<SequenceType>)>,
        ret: Option<SequenceType>,
        body: Arc<Token>,
        closure: Vec<(ExpandedName, XdmSequence<N>)>,
    ) -> Self {
        Self {
            inner: Arc::new(FunctionKind::Inline {
                params,
                ret,
                body,
                closure,
            }),
        }
    }

    pub fn partial(base: FunctionItem<N>, bound: Vec<Option<XdmSequence<N>>>) -> Self {
        Self {
            inner: Arc::new(FunctionKind::Partial { base, bound }),
        }
    }

    pub fn kind(&self) -> &FunctionKind<N> {
        &self.inner
    }

    pub fn arity(&self) -> usize {
        match &*self.inner {
            FunctionKind::Native { arity, .. } => *arity,
            FunctionKind::Inline { params, .. } => params.len(),
            FunctionKind::Partial { bound, .. } => bound.iter().filter(|b| b.is_none()).count(),
        }
    }

    pub fn name(&self) -> Option<&ExpandedName> {
        match &*self.inner {
            FunctionKind::Native { name, .. } => name.as_ref(),
            _ => None,
        }
    }
}

impl<N: XdmNode> core::fmt::Debug for FunctionItem<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(n) => write!(f, "function {}#{}", n, self.arity()),
            None => write!(f, "function(*)#{}", self.arity()),
        }
    }
}

// ===== Maps =====

/// Normalized map key implementing `op:same-key`: values of one comparison
/// family collide regardless of their exact atomic type (integer `1` and
/// double `1.0e0` are the same key; `NaN` matches `NaN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Str(String),
    Bool(bool),
    Int(i128),
    /// Non-integral numerics, keyed by the bit pattern of the widened double.
    Bits(u64),
    NaN,
    /// (months, millis)
    Duration(i32, i64),
    /// Temporal family: type class, timezone presence, normalized value.
    Temporal(u8, bool, i64),
    QName(Option<String>, String),
    Binary(Vec<u8>),
}

impl MapKey {
    pub fn from_atomic(a: &XdmAtomicValue) -> MapKey {
        use XdmAtomicValue as V;
        match a {
            V::String(s)
            | V::UntypedAtomic(s)
            | V::AnyUri(s)
            | V::NormalizedString(s)
            | V::Token(s)
            | V::Language(s)
            | V::NMTOKEN(s)
            | V::Name(s)
            | V::NCName(s)
            | V::Id(s)
            | V::IdRef(s)
            | V::Entity(s) => MapKey::Str(s.clone()),
            V::Boolean(b) => MapKey::Bool(*b),
            V::Duration { months, millis } => MapKey::Duration(*months, *millis),
            V::YearMonthDuration(m) => MapKey::Duration(*m, 0),
            V::DayTimeDuration(ms) => MapKey::Duration(0, *ms),
            V::DateTime { dt, tz } => {
                MapKey::Temporal(0, tz.is_some(), normalize_temporal(dt, tz))
            }
            V::DateTimeStamp(dt) => MapKey::Temporal(0, true, dt.timestamp_millis()),
            V::Date { date, tz } => {
                let dt = date.and_hms_opt(0, 0, 0).unwrap_or_default();
                MapKey::Temporal(1, tz.is_some(), normalize_temporal(&dt, tz))
            }
            V::Time { time, tz } => {
                let secs = i64::from(chrono::Timelike::num_seconds_from_midnight(time));
                let base = secs * 1000 + i64::from(chrono::Timelike::nanosecond(time) / 1_000_000);
                let adjusted = match tz {
                    Some(off) => base - i64::from(off.local_minus_utc()) * 1000,
                    None => base,
                };
                MapKey::Temporal(2, tz.is_some(), adjusted)
            }
            V::GYear { year, tz } => MapKey::Temporal(3, tz.is_some(), i64::from(*year)),
            V::GYearMonth { year, month, tz } => {
                MapKey::Temporal(4, tz.is_some(), i64::from(*year) * 12 + i64::from(*month))
            }
            V::GMonth { month, tz } => MapKey::Temporal(5, tz.is_some(), i64::from(*month)),
            V::GMonthDay { month, day, tz } => {
                MapKey::Temporal(6, tz.is_some(), i64::from(*month) * 32 + i64::from(*day))
            }
            V::GDay { day, tz } => MapKey::Temporal(7, tz.is_some(), i64::from(*day)),
            V::QName { ns_uri, local, .. } | V::Notation { ns_uri, local, .. } => {
                MapKey::QName(ns_uri.clone(), local.clone())
            }
            V::Base64Binary(b) | V::HexBinary(b) => MapKey::Binary(b.clone()),
            _ => {
                // Numerics: integral values of any numeric type share a key.
                if let Some(i) = a.integer_value() {
                    return MapKey::Int(i as i128);
                }
                match a {
                    V::UnsignedLong(v) | V::NonNegativeInteger(v) | V::PositiveInteger(v) => {
                        MapKey::Int(*v as i128)
                    }
                    V::Decimal(d) => {
                        if d.fract().is_zero() {
                            use rust_decimal::prelude::ToPrimitive;
                            MapKey::Int(d.to_i128().unwrap_or(0))
                        } else {
                            MapKey::Bits(a.double_value().unwrap_or(f64::NAN).to_bits())
                        }
                    }
                    _ => {
                        let d = a.double_value().unwrap_or(f64::NAN);
                        if d.is_nan() {
                            MapKey::NaN
                        } else if d == d.trunc() && d.abs() < 1e38 {
                            MapKey::Int(d as i128)
                        } else {
                            MapKey::Bits(d.to_bits())
                        }
                    }
                }
            }
        }
    }
}

fn normalize_temporal(dt: &chrono::NaiveDateTime, tz: &Option<chrono::FixedOffset>) -> i64 {
    let base = dt.and_utc().timestamp_millis();
    match tz {
        Some(off) => base - i64::from(off.local_minus_utc()) * 1000,
        None => base,
    }
}

struct MapInner<N: XdmNode> {
    entries: Vec<(XdmAtomicValue, XdmSequence<N>)>,
    index: HashMap<MapKey, usize>,
}

/// An immutable XDM map. Entry order is insertion order, which `map:keys`
/// and `map:for-each` expose (the order is implementation defined; keeping
/// insertion order makes results reproducible).
#[derive(Clone)]
pub struct XdmMap<N: XdmNode> {
    inner: Arc<MapInner<N>>,
}

impl<N: XdmNode + Clone> Default for XdmMap<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: XdmNode + Clone> XdmMap<N> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MapInner {
                entries: Vec::new(),
                index: HashMap::new(),
            }),
        }
    }

    pub fn from_entries(
        entries: Vec<(XdmAtomicValue, XdmSequence<N>)>,
    ) -> Result<Self, Error> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, (k, _)) in entries.iter().enumerate() {
            if index.insert(MapKey::from_atomic(k), i).is_some() {
                return Err(Error::from_code(
                    ErrorCode::XQDY0137,
                    format!("duplicate map key: {}", k.string_value()),
                ));
            }
        }
        Ok(Self {
            inner: Arc::new(MapInner { entries, index }),
        })
    }

    pub fn entries(&self) -> &[(XdmAtomicValue, XdmSequence<N>)] {
        &self.inner.entries
    }

    pub fn size(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn contains(&self, key: &XdmAtomicValue) -> bool {
        self.inner.index.contains_key(&MapKey::from_atomic(key))
    }

    pub fn get(&self, key: &XdmAtomicValue) -> Option<&XdmSequence<N>> {
        self.inner
            .index
            .get(&MapKey::from_atomic(key))
            .map(|&i| &self.inner.entries[i].1)
    }

    pub fn put(&self, key: XdmAtomicValue, value: XdmSequence<N>) -> Self {
        let mut entries = self.inner.entries.clone();
        let mut index = self.inner.index.clone();
        let mk = MapKey::from_atomic(&key);
        match index.get(&mk) {
            Some(&i) => entries[i] = (key, value),
            None => {
                index.insert(mk, entries.len());
                entries.push((key, value));
            }
        }
        Self {
            inner: Arc::new(MapInner { entries, index }),
        }
    }

    pub fn remove(&self, keys: &[XdmAtomicValue]) -> Self {
        let drop: Vec<MapKey> = keys.iter().map(MapKey::from_atomic).collect();
        let entries: Vec<_> = self
            .inner
            .entries
            .iter()
            .filter(|(k, _)| !drop.contains(&MapKey::from_atomic(k)))
            .cloned()
            .collect();
        let mut index = HashMap::with_capacity(entries.len());
        for (i, (k, _)) in entries.iter().enumerate() {
            index.insert(MapKey::from_atomic(k), i);
        }
        Self {
            inner: Arc::new(MapInner { entries, index }),
        }
    }
}

impl<N: XdmNode + Clone + PartialEq> PartialEq for XdmMap<N> {
    fn eq(&self, other: &Self) -> bool {
        if self.size() != other.size() {
            return false;
        }
        self.entries()
            .iter()
            .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl<N: XdmNode> core::fmt::Debug for XdmMap<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "map{{..{} entries..}}", self.inner.entries.len())
    }
}

// ===== Arrays =====

/// An immutable 1-indexed XDM array. Members are sequences; arrays do not
/// flatten.
#[derive(Clone)]
pub struct XdmArray<N: XdmNode> {
    members: Arc<Vec<XdmSequence<N>>>,
}

impl<N: XdmNode + Clone> Default for XdmArray<N> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<N: XdmNode + Clone> XdmArray<N> {
    pub fn new(members: Vec<XdmSequence<N>>) -> Self {
        Self {
            members: Arc::new(members),
        }
    }

    pub fn members(&self) -> &[XdmSequence<N>] {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// 1-indexed access; out of range is `FOAY0001`.
    pub fn get(&self, position: i64) -> Result<&XdmSequence<N>, Error> {
        if position < 1 || position as usize > self.members.len() {
            return Err(Error::from_code(
                ErrorCode::FOAY0001,
                format!("array index {position} out of bounds (size {})", self.size()),
            ));
        }
        Ok(&self.members[(position - 1) as usize])
    }

    pub fn put(&self, position: i64, member: XdmSequence<N>) -> Result<Self, Error> {
        if position < 1 || position as usize > self.members.len() {
            return Err(Error::from_code(
                ErrorCode::FOAY0001,
                format!("array index {position} out of bounds (size {})", self.size()),
            ));
        }
        let mut members = (*self.members).clone();
        members[(position - 1) as usize] = member;
        Ok(Self::new(members))
    }

    pub fn append(&self, member: XdmSequence<N>) -> Self {
        let mut members = (*self.members).clone();
        members.push(member);
        Self::new(members)
    }
}

impl<N: XdmNode + Clone + PartialEq> PartialEq for XdmArray<N> {
    fn eq(&self, other: &Self) -> bool {
        self.members() == other.members()
    }
}

impl<N: XdmNode> core::fmt::Debug for XdmArray<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "array{{..{} members..}}", self.members.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn numeric_map_keys_collide_across_types() {
        let a = MapKey::from_atomic(&XdmAtomicValue::Integer(1));
        let b = MapKey::from_atomic(&XdmAtomicValue::Double(1.0));
        let c = MapKey::from_atomic(&XdmAtomicValue::Decimal(Decimal::ONE));
        assert_eq!(a, b);
        assert_eq!(a, c);
        let nan1 = MapKey::from_atomic(&XdmAtomicValue::Double(f64::NAN));
        let nan2 = MapKey::from_atomic(&XdmAtomicValue::Float(f32::NAN));
        assert_eq!(nan1, nan2);
    }

    #[test]
    fn array_is_one_indexed() {
        type A = XdmArray<crate::model::simple::SimpleNode>;
        let arr: A = XdmArray::new(vec![
            vec![XdmItem::Atomic(XdmAtomicValue::Integer(10))],
            vec![XdmItem::Atomic(XdmAtomicValue::Integer(20))],
        ]);
        assert!(arr.get(0).is_err());
        assert!(arr.get(3).is_err());
        assert_eq!(
            arr.get(2).unwrap(),
            &vec![XdmItem::Atomic(XdmAtomicValue::Integer(20))]
        );
    }
}
