//! Atomic values of the XDM, one variant per built-in XSD type.
//!
//! Every value carries its exact type label so that type-preserving
//! operations (`fn:abs`, casts, `instance of`) can retain the narrowest
//! applicable type. Derived string and integer types keep their payload in
//! the base representation; the variant itself is the label.

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::xdm::types::AtomicType;

#[derive(Debug, Clone, PartialEq)]
pub enum XdmAtomicValue {
    UntypedAtomic(String),
    String(String),
    // String-derived types: lexical payload only, the variant is the label.
    NormalizedString(String),
    Token(String),
    Language(String),
    NMTOKEN(String),
    Name(String),
    NCName(String),
    Id(String),
    IdRef(String),
    Entity(String),
    Boolean(bool),
    Decimal(Decimal),
    Integer(i64),
    // Integer-derived types.
    NonPositiveInteger(i64),
    NegativeInteger(i64),
    Long(i64),
    Int(i32),
    Short(i16),
    Byte(i8),
    NonNegativeInteger(u64),
    UnsignedLong(u64),
    UnsignedInt(u32),
    UnsignedShort(u16),
    UnsignedByte(u8),
    PositiveInteger(u64),
    Float(f32),
    Double(f64),
    /// Full xs:duration: a month part and a millisecond part, same sign.
    Duration {
        months: i32,
        millis: i64,
    },
    /// Months only.
    YearMonthDuration(i32),
    /// Milliseconds only.
    DayTimeDuration(i64),
    DateTime {
        dt: NaiveDateTime,
        tz: Option<FixedOffset>,
    },
    /// xs:dateTimeStamp: a dateTime whose timezone is required.
    DateTimeStamp(chrono::DateTime<FixedOffset>),
    Date {
        date: NaiveDate,
        tz: Option<FixedOffset>,
    },
    Time {
        time: NaiveTime,
        tz: Option<FixedOffset>,
    },
    GYear {
        year: i32,
        tz: Option<FixedOffset>,
    },
    GYearMonth {
        year: i32,
        month: u32,
        tz: Option<FixedOffset>,
    },
    GMonth {
        month: u32,
        tz: Option<FixedOffset>,
    },
    GMonthDay {
        month: u32,
        day: u32,
        tz: Option<FixedOffset>,
    },
    GDay {
        day: u32,
        tz: Option<FixedOffset>,
    },
    AnyUri(String),
    QName {
        prefix: Option<String>,
        ns_uri: Option<String>,
        local: String,
    },
    Notation {
        prefix: Option<String>,
        ns_uri: Option<String>,
        local: String,
    },
    Base64Binary(Vec<u8>),
    HexBinary(Vec<u8>),
}

impl XdmAtomicValue {
    pub fn type_of(&self) -> AtomicType {
        use XdmAtomicValue as V;
        match self {
            V::UntypedAtomic(_) => AtomicType::UntypedAtomic,
            V::String(_) => AtomicType::String,
            V::NormalizedString(_) => AtomicType::NormalizedString,
            V::Token(_) => AtomicType::Token,
            V::Language(_) => AtomicType::Language,
            V::NMTOKEN(_) => AtomicType::NMTOKEN,
            V::Name(_) => AtomicType::Name,
            V::NCName(_) => AtomicType::NCName,
            V::Id(_) => AtomicType::Id,
            V::IdRef(_) => AtomicType::IdRef,
            V::Entity(_) => AtomicType::Entity,
            V::Boolean(_) => AtomicType::Boolean,
            V::Decimal(_) => AtomicType::Decimal,
            V::Integer(_) => AtomicType::Integer,
            V::NonPositiveInteger(_) => AtomicType::NonPositiveInteger,
            V::NegativeInteger(_) => AtomicType::NegativeInteger,
            V::Long(_) => AtomicType::Long,
            V::Int(_) => AtomicType::Int,
            V::Short(_) => AtomicType::Short,
            V::Byte(_) => AtomicType::Byte,
            V::NonNegativeInteger(_) => AtomicType::NonNegativeInteger,
            V::UnsignedLong(_) => AtomicType::UnsignedLong,
            V::UnsignedInt(_) => AtomicType::UnsignedInt,
            V::UnsignedShort(_) => AtomicType::UnsignedShort,
            V::UnsignedByte(_) => AtomicType::UnsignedByte,
            V::PositiveInteger(_) => AtomicType::PositiveInteger,
            V::Float(_) => AtomicType::Float,
            V::Double(_) => AtomicType::Double,
            V::Duration { .. } => AtomicType::Duration,
            V::YearMonthDuration(_) => AtomicType::YearMonthDuration,
            V::DayTimeDuration(_) => AtomicType::DayTimeDuration,
            V::DateTime { .. } => AtomicType::DateTime,
            V::DateTimeStamp(_) => AtomicType::DateTimeStamp,
            V::Date { .. } => AtomicType::Date,
            V::Time { .. } => AtomicType::Time,
            V::GYear { .. } => AtomicType::GYear,
            V::GYearMonth { .. } => AtomicType::GYearMonth,
            V::GMonth { .. } => AtomicType::GMonth,
            V::GMonthDay { .. } => AtomicType::GMonthDay,
            V::GDay { .. } => AtomicType::GDay,
            V::AnyUri(_) => AtomicType::AnyUri,
            V::QName { .. } => AtomicType::QName,
            V::Notation { .. } => AtomicType::Notation,
            V::Base64Binary(_) => AtomicType::Base64Binary,
            V::HexBinary(_) => AtomicType::HexBinary,
        }
    }

    /// True for the four primitive numeric types and everything derived from
    /// them.
    pub fn is_numeric(&self) -> bool {
        self.type_of().is_numeric()
    }

    /// Signed integer payload of any integer-derived variant.
    pub fn integer_value(&self) -> Option<i64> {
        use XdmAtomicValue as V;
        Some(match self {
            V::Integer(v) | V::NonPositiveInteger(v) | V::NegativeInteger(v) | V::Long(v) => *v,
            V::Int(v) => *v as i64,
            V::Short(v) => *v as i64,
            V::Byte(v) => *v as i64,
            V::NonNegativeInteger(v) | V::UnsignedLong(v) | V::PositiveInteger(v) => {
                i64::try_from(*v).ok()?
            }
            V::UnsignedInt(v) => *v as i64,
            V::UnsignedShort(v) => *v as i64,
            V::UnsignedByte(v) => *v as i64,
            _ => return None,
        })
    }

    /// Numeric value widened to double; `None` for non-numerics.
    pub fn double_value(&self) -> Option<f64> {
        use XdmAtomicValue as V;
        match self {
            V::Double(d) => Some(*d),
            V::Float(f) => Some(*f as f64),
            V::Decimal(d) => Some(d.to_f64().unwrap_or(f64::NAN)),
            _ => self.integer_value().map(|i| i as f64),
        }
    }

    /// The canonical lexical form, as produced by `fn:string`.
    pub fn string_value(&self) -> String {
        use XdmAtomicValue as V;
        match self {
            V::UntypedAtomic(s)
            | V::String(s)
            | V::NormalizedString(s)
            | V::Token(s)
            | V::Language(s)
            | V::NMTOKEN(s)
            | V::Name(s)
            | V::NCName(s)
            | V::Id(s)
            | V::IdRef(s)
            | V::Entity(s)
            | V::AnyUri(s) => s.clone(),
            V::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            V::Decimal(d) => canonical_decimal(d),
            V::Integer(v) | V::NonPositiveInteger(v) | V::NegativeInteger(v) | V::Long(v) => {
                v.to_string()
            }
            V::Int(v) => v.to_string(),
            V::Short(v) => v.to_string(),
            V::Byte(v) => v.to_string(),
            V::NonNegativeInteger(v) | V::UnsignedLong(v) | V::PositiveInteger(v) => v.to_string(),
            V::UnsignedInt(v) => v.to_string(),
            V::UnsignedShort(v) => v.to_string(),
            V::UnsignedByte(v) => v.to_string(),
            V::Float(f) => canonical_double(*f as f64),
            V::Double(d) => canonical_double(*d),
            V::Duration { months, millis } => canonical_duration(*months, *millis),
            V::YearMonthDuration(m) => canonical_duration(*m, 0),
            V::DayTimeDuration(ms) => canonical_duration(0, *ms),
            V::DateTime { dt, tz } => {
                format!("{}{}", canonical_date_time(dt), canonical_tz(tz))
            }
            V::DateTimeStamp(dt) => format!(
                "{}{}",
                canonical_date_time(&dt.naive_local()),
                canonical_tz(&Some(*dt.offset()))
            ),
            V::Date { date, tz } => format!("{}{}", canonical_date(date), canonical_tz(tz)),
            V::Time { time, tz } => format!("{}{}", canonical_time(time), canonical_tz(tz)),
            V::GYear { year, tz } => format!("{}{}", canonical_year(*year), canonical_tz(tz)),
            V::GYearMonth { year, month, tz } => {
                format!("{}-{:02}{}", canonical_year(*year), month, canonical_tz(tz))
            }
            V::GMonth { month, tz } => format!("--{:02}{}", month, canonical_tz(tz)),
            V::GMonthDay { month, day, tz } => {
                format!("--{:02}-{:02}{}", month, day, canonical_tz(tz))
            }
            V::GDay { day, tz } => format!("---{:02}{}", day, canonical_tz(tz)),
            V::QName { prefix, local, .. } | V::Notation { prefix, local, .. } => match prefix {
                Some(p) => format!("{p}:{local}"),
                None => local.clone(),
            },
            V::Base64Binary(bytes) => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
            V::HexBinary(bytes) => bytes.iter().map(|b| format!("{b:02X}")).collect(),
        }
    }
}

/// Canonical form of xs:double / xs:float per F&O `fn:string` rules:
/// plain decimal notation within [1e-6, 1e21), otherwise scientific.
pub fn canonical_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if d == 0.0 {
        return if d.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let abs = d.abs();
    if (1e-6..1e21).contains(&abs) {
        if d == d.trunc() && abs < 1e18 {
            return format!("{}", d as i128);
        }
        let mut s = format!("{d}");
        if s.contains('e') || s.contains('E') {
            // Shortest-form repr chose an exponent; expand it.
            s = format!("{d:.17}");
            while s.contains('.') && s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.pop();
            }
        }
        s
    } else {
        // Scientific notation with a single leading digit mantissa.
        let s = format!("{d:E}");
        match s.split_once('E') {
            Some((mantissa, exp)) => {
                let mantissa = if mantissa.contains('.') {
                    mantissa.to_string()
                } else {
                    format!("{mantissa}.0")
                };
                format!("{mantissa}E{exp}")
            }
            None => s,
        }
    }
}

/// Canonical form of xs:decimal: no exponent, no trailing zeros, no point
/// when integral.
pub fn canonical_decimal(d: &Decimal) -> String {
    let normalized = d.normalize();
    normalized.to_string()
}

fn canonical_year(year: i32) -> String {
    if year < 0 {
        format!("-{:04}", -year)
    } else {
        format!("{year:04}")
    }
}

fn canonical_date(d: &NaiveDate) -> String {
    format!("{}-{:02}-{:02}", canonical_year(d.year()), d.month(), d.day())
}

fn canonical_time(t: &NaiveTime) -> String {
    let base = format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second());
    let nanos = t.nanosecond();
    if nanos == 0 {
        base
    } else {
        let frac = format!("{:09}", nanos);
        let frac = frac.trim_end_matches('0');
        format!("{base}.{frac}")
    }
}

fn canonical_date_time(dt: &NaiveDateTime) -> String {
    format!("{}T{}", canonical_date(&dt.date()), canonical_time(&dt.time()))
}

fn canonical_tz(tz: &Option<FixedOffset>) -> String {
    match tz {
        None => String::new(),
        Some(off) => {
            let secs = off.local_minus_utc();
            if secs == 0 {
                return "Z".to_string();
            }
            let sign = if secs < 0 { '-' } else { '+' };
            let abs = secs.abs();
            format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
        }
    }
}

/// Canonical xs:duration lexical form; also covers the two subtypes, which
/// pass zero for the missing part.
pub fn canonical_duration(months: i32, millis: i64) -> String {
    if months == 0 && millis == 0 {
        // Zero yearMonthDuration canonically prints as P0M, dayTime as PT0S;
        // the generic zero defaults to the dayTime spelling.
        return "PT0S".to_string();
    }
    let negative = months < 0 || millis < 0;
    let months = months.unsigned_abs();
    let millis = millis.unsigned_abs();
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    let (years, months) = (months / 12, months % 12);
    if years > 0 {
        out.push_str(&format!("{years}Y"));
    }
    if months > 0 {
        out.push_str(&format!("{months}M"));
    }
    let (days, rem) = (millis / 86_400_000, millis % 86_400_000);
    let (hours, rem) = (rem / 3_600_000, rem % 3_600_000);
    let (minutes, rem) = (rem / 60_000, rem % 60_000);
    let (seconds, ms) = (rem / 1000, rem % 1000);
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || ms > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || ms > 0 {
            if ms > 0 {
                let frac = format!("{ms:03}");
                out.push_str(&format!("{seconds}.{}S", frac.trim_end_matches('0')));
            } else {
                out.push_str(&format!("{seconds}S"));
            }
        }
    }
    if out.ends_with('P') {
        // Months consumed everything (pure yearMonth value).
        out.push_str("0M");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_canonical_forms() {
        assert_eq!(canonical_double(1.0), "1");
        assert_eq!(canonical_double(-0.0), "-0");
        assert_eq!(canonical_double(0.5), "0.5");
        assert_eq!(canonical_double(f64::NAN), "NaN");
        assert_eq!(canonical_double(f64::INFINITY), "INF");
        assert_eq!(canonical_double(1.0e21), "1.0E21");
        assert_eq!(canonical_double(1.0e-7), "1.0E-7");
    }

    #[test]
    fn duration_canonical_forms() {
        assert_eq!(canonical_duration(14, 0), "P1Y2M");
        assert_eq!(canonical_duration(0, 3_661_000), "PT1H1M1S");
        assert_eq!(canonical_duration(0, 0), "PT0S");
        assert_eq!(canonical_duration(-14, 0), "-P1Y2M");
        assert_eq!(canonical_duration(0, 500), "PT0.5S");
    }

    #[test]
    fn integer_value_covers_derived_types() {
        assert_eq!(XdmAtomicValue::Short(-3).integer_value(), Some(-3));
        assert_eq!(XdmAtomicValue::UnsignedLong(u64::MAX).integer_value(), None);
    }
}
