//! Atomic casting: the (source, target) dispatch behind `cast as`,
//! `castable as`, and the `xs:*` constructor functions.
//!
//! Lexical parsing of the temporal, duration and binary types lives here
//! too; the evaluator and the function library reuse these parsers.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::engine::runtime::{Error, ErrorCode};
use crate::engine::ops::parse_double_lexical;
use crate::xdm::XdmAtomicValue;
use crate::xdm::types::AtomicType;

fn bad_lexical(s: &str, target: AtomicType) -> Error {
    Error::from_code(
        ErrorCode::FORG0001,
        format!("{s:?} is not a valid xs:{}", target.local_name()),
    )
}

/// `castable as` without constructing the error.
pub fn castable(value: &XdmAtomicValue, target: AtomicType) -> bool {
    cast_atomic(value, target).is_ok()
}

/// Cast one atomic value to a target type.
pub fn cast_atomic(value: &XdmAtomicValue, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    use AtomicType as T;
    use XdmAtomicValue as V;

    if value.type_of() == target {
        return Ok(value.clone());
    }
    match target {
        T::AnyAtomic | T::Notation => Err(Error::from_code(
            ErrorCode::XPST0080,
            format!("cannot cast to xs:{}", target.local_name()),
        )),
        T::String => Ok(V::String(value.string_value())),
        T::UntypedAtomic => Ok(V::UntypedAtomic(value.string_value())),
        T::AnyUri => match value {
            V::String(s) | V::UntypedAtomic(s) => Ok(V::AnyUri(s.trim().to_string())),
            _ => Err(cast_type_error(value, target)),
        },
        T::Boolean => cast_to_boolean(value),
        _ if target.is_numeric() => cast_to_numeric(value, target),
        _ if target.derives_from(T::String) => cast_to_string_subtype(value, target),
        T::Duration | T::YearMonthDuration | T::DayTimeDuration => {
            cast_to_duration(value, target)
        }
        T::DateTime | T::DateTimeStamp | T::Date | T::Time => cast_to_temporal(value, target),
        T::GYear | T::GYearMonth | T::GMonth | T::GMonthDay | T::GDay => {
            cast_to_gregorian(value, target)
        }
        T::QName => match value {
            V::String(s) | V::UntypedAtomic(s) => {
                let t = s.trim();
                // Prefixed forms need in-scope namespaces; the constructor
                // function layer resolves them before calling here.
                if t.contains(':') {
                    Err(Error::from_code(
                        ErrorCode::FONS0004,
                        format!("cannot resolve prefix in {t:?} without a namespace context"),
                    ))
                } else if is_ncname(t) {
                    Ok(V::QName {
                        prefix: None,
                        ns_uri: None,
                        local: t.to_string(),
                    })
                } else {
                    Err(bad_lexical(s, target))
                }
            }
            _ => Err(cast_type_error(value, target)),
        },
        T::Base64Binary => match value {
            V::HexBinary(b) => Ok(V::Base64Binary(b.clone())),
            V::String(s) | V::UntypedAtomic(s) => {
                use base64::Engine;
                let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .map(V::Base64Binary)
                    .map_err(|_| bad_lexical(s, target))
            }
            _ => Err(cast_type_error(value, target)),
        },
        T::HexBinary => match value {
            V::Base64Binary(b) => Ok(V::HexBinary(b.clone())),
            V::String(s) | V::UntypedAtomic(s) => {
                let t = s.trim();
                if t.len() % 2 != 0 || !t.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(bad_lexical(s, target));
                }
                let bytes = (0..t.len())
                    .step_by(2)
                    .map(|i| u8::from_str_radix(&t[i..i + 2], 16).expect("hex digits checked"))
                    .collect();
                Ok(V::HexBinary(bytes))
            }
            _ => Err(cast_type_error(value, target)),
        },
        _ => Err(cast_type_error(value, target)),
    }
}

fn cast_type_error(value: &XdmAtomicValue, target: AtomicType) -> Error {
    Error::from_code(
        ErrorCode::XPTY0004,
        format!(
            "cannot cast xs:{} to xs:{}",
            value.type_of().local_name(),
            target.local_name()
        ),
    )
}

fn cast_to_boolean(value: &XdmAtomicValue) -> Result<XdmAtomicValue, Error> {
    use XdmAtomicValue as V;
    match value {
        V::String(s) | V::UntypedAtomic(s) => match s.trim() {
            "true" | "1" => Ok(V::Boolean(true)),
            "false" | "0" => Ok(V::Boolean(false)),
            _ => Err(bad_lexical(s, AtomicType::Boolean)),
        },
        _ if value.is_numeric() => {
            let d = value.double_value().unwrap_or(f64::NAN);
            Ok(V::Boolean(!d.is_nan() && d != 0.0))
        }
        _ => Err(cast_type_error(value, AtomicType::Boolean)),
    }
}

// ===== Numerics =====

fn cast_to_numeric(value: &XdmAtomicValue, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    use AtomicType as T;
    use XdmAtomicValue as V;
    // Establish a decimal or double intermediate.
    enum Mid {
        Int(i128),
        Dec(Decimal),
        Dbl(f64),
    }
    let mid = match value {
        V::Boolean(b) => Mid::Int(*b as i128),
        V::Float(f) => Mid::Dbl(*f as f64),
        V::Double(d) => Mid::Dbl(*d),
        V::Decimal(d) => Mid::Dec(*d),
        V::String(s) | V::UntypedAtomic(s) => {
            let t = s.trim();
            match target {
                T::Float | T::Double => Mid::Dbl(parse_double_lexical(t)
                    .map_err(|_| bad_lexical(s, target))?),
                T::Decimal => Mid::Dec(
                    parse_decimal_lexical(t).ok_or_else(|| bad_lexical(s, target))?,
                ),
                _ => Mid::Int(
                    t.parse::<i128>().map_err(|_| bad_lexical(s, target))?,
                ),
            }
        }
        _ if value.is_numeric() => match value.integer_value() {
            Some(i) => Mid::Int(i as i128),
            None => match value {
                V::UnsignedLong(u) | V::NonNegativeInteger(u) | V::PositiveInteger(u) => {
                    Mid::Int(*u as i128)
                }
                _ => Mid::Dbl(value.double_value().unwrap_or(f64::NAN)),
            },
        },
        _ => return Err(cast_type_error(value, target)),
    };

    match target {
        T::Double => Ok(V::Double(match mid {
            Mid::Int(i) => i as f64,
            Mid::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
            Mid::Dbl(d) => d,
        })),
        T::Float => Ok(V::Float(match mid {
            Mid::Int(i) => i as f32,
            Mid::Dec(d) => d.to_f64().unwrap_or(f64::NAN) as f32,
            Mid::Dbl(d) => d as f32,
        })),
        T::Decimal => match mid {
            Mid::Int(i) => Decimal::from_i128(i).map(V::Decimal).ok_or_else(|| {
                Error::from_code(ErrorCode::FOCA0001, "value too large for xs:decimal")
            }),
            Mid::Dec(d) => Ok(V::Decimal(d)),
            Mid::Dbl(d) => {
                if d.is_nan() || d.is_infinite() {
                    return Err(Error::from_code(
                        ErrorCode::FOCA0002,
                        "NaN and INF have no decimal representation",
                    ));
                }
                Decimal::try_from(d).map(V::Decimal).map_err(|_| {
                    Error::from_code(ErrorCode::FOCA0001, "value too large for xs:decimal")
                })
            }
        },
        _ => {
            // Integer family: truncate toward zero, then range-check.
            let i: i128 = match mid {
                Mid::Int(i) => i,
                Mid::Dec(d) => d.trunc().to_i128().ok_or_else(|| {
                    Error::from_code(ErrorCode::FOCA0003, "value out of integer range")
                })?,
                Mid::Dbl(d) => {
                    if d.is_nan() || d.is_infinite() {
                        return Err(Error::from_code(
                            ErrorCode::FOCA0002,
                            "NaN and INF have no integer representation",
                        ));
                    }
                    let t = d.trunc();
                    if t < i128::MIN as f64 || t > i128::MAX as f64 {
                        return Err(Error::from_code(
                            ErrorCode::FOCA0003,
                            "value out of integer range",
                        ));
                    }
                    t as i128
                }
            };
            integer_in_range(i, target)
        }
    }
}

fn parse_decimal_lexical(t: &str) -> Option<Decimal> {
    // XSD decimal: optional sign, digits, optional fraction; no exponent.
    if t.is_empty() || t.contains(['e', 'E']) {
        return None;
    }
    t.parse::<Decimal>().ok()
}

fn integer_in_range(i: i128, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    use AtomicType as T;
    use XdmAtomicValue as V;
    let out_of_range = || {
        Error::from_code(
            ErrorCode::FORG0001,
            format!("value out of range for xs:{}", target.local_name()),
        )
    };
    macro_rules! narrowed {
        ($variant:ident, $ty:ty) => {
            <$ty>::try_from(i).map(V::$variant).map_err(|_| out_of_range())
        };
    }
    match target {
        T::Integer => narrowed!(Integer, i64),
        T::Long => narrowed!(Long, i64),
        T::Int => narrowed!(Int, i32),
        T::Short => narrowed!(Short, i16),
        T::Byte => narrowed!(Byte, i8),
        T::UnsignedLong => narrowed!(UnsignedLong, u64),
        T::UnsignedInt => narrowed!(UnsignedInt, u32),
        T::UnsignedShort => narrowed!(UnsignedShort, u16),
        T::UnsignedByte => narrowed!(UnsignedByte, u8),
        T::NonNegativeInteger => {
            if i >= 0 {
                narrowed!(NonNegativeInteger, u64)
            } else {
                Err(out_of_range())
            }
        }
        T::PositiveInteger => {
            if i > 0 {
                narrowed!(PositiveInteger, u64)
            } else {
                Err(out_of_range())
            }
        }
        T::NonPositiveInteger => {
            if i <= 0 {
                narrowed!(NonPositiveInteger, i64)
            } else {
                Err(out_of_range())
            }
        }
        T::NegativeInteger => {
            if i < 0 {
                narrowed!(NegativeInteger, i64)
            } else {
                Err(out_of_range())
            }
        }
        _ => unreachable!("integer family dispatch"),
    }
}

// ===== String-derived types =====

pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '-' || c == '.' || c.is_alphanumeric())
}

fn replace_ws(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cast_to_string_subtype(
    value: &XdmAtomicValue,
    target: AtomicType,
) -> Result<XdmAtomicValue, Error> {
    use AtomicType as T;
    use XdmAtomicValue as V;
    let s = match value {
        V::String(s) | V::UntypedAtomic(s) | V::AnyUri(s) => s.clone(),
        _ if value.type_of().derives_from(T::String) => value.string_value(),
        _ => return Err(cast_type_error(value, target)),
    };
    let ok = |v: String| -> Result<XdmAtomicValue, Error> {
        Ok(match target {
            T::NormalizedString => V::NormalizedString(v),
            T::Token => V::Token(v),
            T::Language => V::Language(v),
            T::NMTOKEN => V::NMTOKEN(v),
            T::Name => V::Name(v),
            T::NCName => V::NCName(v),
            T::Id => V::Id(v),
            T::IdRef => V::IdRef(v),
            T::Entity => V::Entity(v),
            _ => unreachable!("string subtype dispatch"),
        })
    };
    match target {
        T::NormalizedString => ok(replace_ws(&s)),
        T::Token => ok(collapse_ws(&s)),
        T::Language => {
            let v = collapse_ws(&s);
            let valid = !v.is_empty()
                && v.split('-').all(|part| {
                    !part.is_empty() && part.len() <= 8 && part.chars().all(|c| c.is_ascii_alphanumeric())
                })
                && v.split('-').next().is_some_and(|p| p.chars().all(|c| c.is_ascii_alphabetic()));
            if valid { ok(v) } else { Err(bad_lexical(&s, target)) }
        }
        T::NMTOKEN => {
            let v = collapse_ws(&s);
            let valid = !v.is_empty()
                && v.chars().all(|c| c == '_' || c == '-' || c == '.' || c == ':' || c.is_alphanumeric());
            if valid { ok(v) } else { Err(bad_lexical(&s, target)) }
        }
        T::Name => {
            let v = collapse_ws(&s);
            let valid = {
                let mut chars = v.chars();
                matches!(chars.next(), Some(c) if c == '_' || c == ':' || c.is_alphabetic())
                    && chars.all(|c| c == '_' || c == '-' || c == '.' || c == ':' || c.is_alphanumeric())
            };
            if valid { ok(v) } else { Err(bad_lexical(&s, target)) }
        }
        T::NCName | T::Id | T::IdRef | T::Entity => {
            let v = collapse_ws(&s);
            if is_ncname(&v) { ok(v) } else { Err(bad_lexical(&s, target)) }
        }
        _ => unreachable!("string subtype dispatch"),
    }
}

// ===== Durations =====

/// Parse an xs:duration lexical form into (months, milliseconds).
pub fn parse_duration_lexical(s: &str) -> Option<(i32, i64)> {
    let t = s.trim();
    let (negative, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let t = t.strip_prefix('P')?;
    let (date_part, time_part) = match t.split_once('T') {
        Some((d, tm)) => {
            if tm.is_empty() {
                return None;
            }
            (d, Some(tm))
        }
        None => (t, None),
    };
    if date_part.is_empty() && time_part.is_none() {
        return None;
    }

    let mut months: i64 = 0;
    let mut millis: i64 = 0;
    let mut any = false;

    let mut rest = date_part;
    for (marker, scale) in [('Y', 12i64), ('M', 1), ('D', 0)] {
        if let Some(pos) = rest.find(marker) {
            let (num, tail) = rest.split_at(pos);
            let n: i64 = num.parse().ok()?;
            if marker == 'D' {
                millis += n.checked_mul(86_400_000)?;
            } else {
                months = months.checked_add(n.checked_mul(scale)?)?;
            }
            rest = &tail[1..];
            any = true;
        }
    }
    if !rest.is_empty() {
        return None;
    }

    if let Some(tp) = time_part {
        let mut rest = tp;
        for (marker, scale) in [('H', 3_600_000i64), ('M', 60_000)] {
            if let Some(pos) = rest.find(marker) {
                let (num, tail) = rest.split_at(pos);
                let n: i64 = num.parse().ok()?;
                millis = millis.checked_add(n.checked_mul(scale)?)?;
                rest = &tail[1..];
                any = true;
            }
        }
        if let Some(pos) = rest.find('S') {
            let (num, tail) = rest.split_at(pos);
            if !tail[1..].is_empty() {
                return None;
            }
            let secs: f64 = num.parse().ok()?;
            if !secs.is_finite() || secs < 0.0 {
                return None;
            }
            millis = millis.checked_add((secs * 1000.0).round() as i64)?;
            any = true;
        } else if !rest.is_empty() {
            return None;
        }
    }

    if !any {
        return None;
    }
    let months: i32 = months.try_into().ok()?;
    if negative {
        Some((-months, -millis))
    } else {
        Some((months, millis))
    }
}

fn cast_to_duration(value: &XdmAtomicValue, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    use AtomicType as T;
    use XdmAtomicValue as V;
    let (months, millis) = match value {
        V::String(s) | V::UntypedAtomic(s) => {
            let (m, ms) = parse_duration_lexical(s).ok_or_else(|| bad_lexical(s, target))?;
            // The two subtypes reject lexical forms with foreign components.
            match target {
                T::YearMonthDuration if ms != 0 => return Err(bad_lexical(s, target)),
                T::DayTimeDuration if m != 0 => return Err(bad_lexical(s, target)),
                _ => {}
            }
            (m, ms)
        }
        V::Duration { months, millis } => (*months, *millis),
        V::YearMonthDuration(m) => (*m, 0),
        V::DayTimeDuration(ms) => (0, *ms),
        _ => return Err(cast_type_error(value, target)),
    };
    Ok(match target {
        T::Duration => V::Duration { months, millis },
        // Casting between the subtypes drops the foreign component.
        T::YearMonthDuration => V::YearMonthDuration(months),
        T::DayTimeDuration => V::DayTimeDuration(millis),
        _ => unreachable!("duration dispatch"),
    })
}

// ===== Temporal lexical forms =====

/// Split a trailing timezone (`Z`, `±hh:mm`) off a temporal lexical form.
pub fn split_timezone(s: &str) -> Result<(&str, Option<FixedOffset>), Error> {
    if let Some(rest) = s.strip_suffix('Z') {
        return Ok((rest, Some(FixedOffset::east_opt(0).expect("zero offset"))));
    }
    // A sign 6 characters from the end introduces ±hh:mm — but a leading
    // sign (negative years) must not be mistaken for one.
    if s.len() > 6 && s.is_char_boundary(s.len() - 6) {
        let tail = &s[s.len() - 6..];
        let sign = tail.as_bytes()[0];
        if (sign == b'+' || sign == b'-') && tail.as_bytes()[3] == b':' {
            let hours: i32 = tail[1..3]
                .parse()
                .map_err(|_| Error::from_code(ErrorCode::FODT0003, "invalid timezone"))?;
            let mins: i32 = tail[4..6]
                .parse()
                .map_err(|_| Error::from_code(ErrorCode::FODT0003, "invalid timezone"))?;
            if hours > 14 || mins > 59 || (hours == 14 && mins != 0) {
                return Err(Error::from_code(ErrorCode::FODT0003, "timezone out of range"));
            }
            let mut secs = hours * 3600 + mins * 60;
            if sign == b'-' {
                secs = -secs;
            }
            let off = FixedOffset::east_opt(secs)
                .ok_or_else(|| Error::from_code(ErrorCode::FODT0003, "timezone out of range"))?;
            return Ok((&s[..s.len() - 6], Some(off)));
        }
    }
    Ok((s, None))
}

pub fn parse_date_lexical(s: &str) -> Result<(NaiveDate, Option<FixedOffset>), Error> {
    let t = s.trim();
    let (body, tz) = split_timezone(t)?;
    let date = NaiveDate::parse_from_str(body, "%Y-%m-%d")
        .map_err(|_| bad_lexical(s, AtomicType::Date))?;
    Ok((date, tz))
}

pub fn parse_time_lexical(s: &str) -> Result<(NaiveTime, Option<FixedOffset>), Error> {
    let t = s.trim();
    let (body, tz) = split_timezone(t)?;
    // 24:00:00 normalizes to midnight.
    if body.starts_with("24:") {
        if body == "24:00:00" {
            return Ok((NaiveTime::from_hms_opt(0, 0, 0).expect("midnight"), tz));
        }
        return Err(bad_lexical(s, AtomicType::Time));
    }
    let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
        .map_err(|_| bad_lexical(s, AtomicType::Time))?;
    Ok((time, tz))
}

pub fn parse_datetime_lexical(
    s: &str,
) -> Result<(NaiveDateTime, Option<FixedOffset>), Error> {
    let t = s.trim();
    let (body, tz) = split_timezone(t)?;
    let dt = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| bad_lexical(s, AtomicType::DateTime))?;
    Ok((dt, tz))
}

fn cast_to_temporal(value: &XdmAtomicValue, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    use AtomicType as T;
    use XdmAtomicValue as V;
    match (value, target) {
        (V::String(s) | V::UntypedAtomic(s), T::Date) => {
            let (date, tz) = parse_date_lexical(s)?;
            Ok(V::Date { date, tz })
        }
        (V::String(s) | V::UntypedAtomic(s), T::Time) => {
            let (time, tz) = parse_time_lexical(s)?;
            Ok(V::Time { time, tz })
        }
        (V::String(s) | V::UntypedAtomic(s), T::DateTime) => {
            let (dt, tz) = parse_datetime_lexical(s)?;
            Ok(V::DateTime { dt, tz })
        }
        (V::String(s) | V::UntypedAtomic(s), T::DateTimeStamp) => {
            let (dt, tz) = parse_datetime_lexical(s)?;
            let tz = tz.ok_or_else(|| bad_lexical(s, T::DateTimeStamp))?;
            Ok(V::DateTimeStamp(dt.and_local_timezone(tz).single().ok_or_else(
                || bad_lexical(s, T::DateTimeStamp),
            )?))
        }
        (V::DateTime { dt, tz }, T::Date) => Ok(V::Date {
            date: dt.date(),
            tz: *tz,
        }),
        (V::DateTime { dt, tz }, T::Time) => Ok(V::Time {
            time: dt.time(),
            tz: *tz,
        }),
        (V::DateTime { dt, tz }, T::DateTimeStamp) => {
            let tz = tz.ok_or_else(|| {
                Error::from_code(
                    ErrorCode::FORG0001,
                    "xs:dateTimeStamp requires a timezone",
                )
            })?;
            Ok(V::DateTimeStamp(dt.and_local_timezone(tz).single().ok_or_else(
                || Error::from_code(ErrorCode::FORG0001, "invalid timezone combination"),
            )?))
        }
        (V::DateTimeStamp(dt), T::DateTime) => Ok(V::DateTime {
            dt: dt.naive_local(),
            tz: Some(*dt.offset()),
        }),
        (V::DateTimeStamp(dt), T::Date) => Ok(V::Date {
            date: dt.naive_local().date(),
            tz: Some(*dt.offset()),
        }),
        (V::DateTimeStamp(dt), T::Time) => Ok(V::Time {
            time: dt.naive_local().time(),
            tz: Some(*dt.offset()),
        }),
        (V::Date { date, tz }, T::DateTime) => Ok(V::DateTime {
            dt: date.and_hms_opt(0, 0, 0).expect("midnight"),
            tz: *tz,
        }),
        _ => Err(cast_type_error(value, target)),
    }
}

fn cast_to_gregorian(value: &XdmAtomicValue, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    use AtomicType as T;
    use XdmAtomicValue as V;
    use chrono::Datelike;
    let from_date = |date: &NaiveDate, tz: &Option<FixedOffset>| -> XdmAtomicValue {
        match target {
            T::GYear => V::GYear {
                year: date.year(),
                tz: *tz,
            },
            T::GYearMonth => V::GYearMonth {
                year: date.year(),
                month: date.month(),
                tz: *tz,
            },
            T::GMonth => V::GMonth {
                month: date.month(),
                tz: *tz,
            },
            T::GMonthDay => V::GMonthDay {
                month: date.month(),
                day: date.day(),
                tz: *tz,
            },
            T::GDay => V::GDay {
                day: date.day(),
                tz: *tz,
            },
            _ => unreachable!("gregorian dispatch"),
        }
    };
    match value {
        V::Date { date, tz } => Ok(from_date(date, tz)),
        V::DateTime { dt, tz } => Ok(from_date(&dt.date(), tz)),
        V::DateTimeStamp(dt) => Ok(from_date(&dt.naive_local().date(), &Some(*dt.offset()))),
        V::String(s) | V::UntypedAtomic(s) => {
            let t = s.trim();
            let (body, tz) = split_timezone(t)?;
            let parse_u32 = |x: &str| x.parse::<u32>().ok();
            let bad = || bad_lexical(s, target);
            match target {
                T::GYear => {
                    let year: i32 = body.parse().map_err(|_| bad())?;
                    Ok(V::GYear { year, tz })
                }
                T::GYearMonth => {
                    let (y, m) = body.rsplit_once('-').ok_or_else(bad)?;
                    let year: i32 = y.parse().map_err(|_| bad())?;
                    let month = parse_u32(m).filter(|m| (1..=12).contains(m)).ok_or_else(bad)?;
                    Ok(V::GYearMonth { year, month, tz })
                }
                T::GMonth => {
                    let m = body.strip_prefix("--").ok_or_else(bad)?;
                    let month = parse_u32(m).filter(|m| (1..=12).contains(m)).ok_or_else(bad)?;
                    Ok(V::GMonth { month, tz })
                }
                T::GMonthDay => {
                    let md = body.strip_prefix("--").ok_or_else(bad)?;
                    let (m, d) = md.split_once('-').ok_or_else(bad)?;
                    let month = parse_u32(m).filter(|m| (1..=12).contains(m)).ok_or_else(bad)?;
                    let day = parse_u32(d).filter(|d| (1..=31).contains(d)).ok_or_else(bad)?;
                    Ok(V::GMonthDay { month, day, tz })
                }
                T::GDay => {
                    let d = body.strip_prefix("---").ok_or_else(bad)?;
                    let day = parse_u32(d).filter(|d| (1..=31).contains(d)).ok_or_else(bad)?;
                    Ok(V::GDay { day, tz })
                }
                _ => unreachable!("gregorian dispatch"),
            }
        }
        _ => Err(cast_type_error(value, target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use XdmAtomicValue as V;

    #[test]
    fn duration_lexical_round_trip() {
        assert_eq!(parse_duration_lexical("P1Y2M"), Some((14, 0)));
        assert_eq!(parse_duration_lexical("PT1H1M1.5S"), Some((0, 3_661_500)));
        assert_eq!(parse_duration_lexical("-P1D"), Some((0, -86_400_000)));
        assert_eq!(parse_duration_lexical("P"), None);
        assert_eq!(parse_duration_lexical("P1S"), None);
        assert_eq!(parse_duration_lexical("PT"), None);
    }

    #[test]
    fn date_with_timezone() {
        let (d, tz) = parse_date_lexical("2024-02-29Z").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(tz.unwrap().local_minus_utc(), 0);
        let (_, tz) = parse_date_lexical("2024-02-29-05:00").unwrap();
        assert_eq!(tz.unwrap().local_minus_utc(), -5 * 3600);
        let (_, tz) = parse_date_lexical("2024-02-29").unwrap();
        assert!(tz.is_none());
    }

    #[test]
    fn numeric_narrowing_range_checks() {
        assert!(cast_atomic(&V::Integer(300), AtomicType::Byte).is_err());
        assert_eq!(
            cast_atomic(&V::Integer(-3), AtomicType::Short).unwrap(),
            V::Short(-3)
        );
        assert!(cast_atomic(&V::Integer(-1), AtomicType::NonNegativeInteger).is_err());
        assert!(
            cast_atomic(&V::Double(f64::NAN), AtomicType::Integer)
                .unwrap_err()
                .is_code(ErrorCode::FOCA0002)
        );
    }

    #[test]
    fn boolean_lexical_space() {
        assert_eq!(
            cast_atomic(&V::String(" true ".into()), AtomicType::Boolean).unwrap(),
            V::Boolean(true)
        );
        assert!(cast_atomic(&V::String("TRUE".into()), AtomicType::Boolean).is_err());
    }

    #[test]
    fn subtype_duration_rejects_foreign_components() {
        assert!(
            cast_atomic(
                &V::String("P1Y1D".into()),
                AtomicType::YearMonthDuration
            )
            .is_err()
        );
        assert_eq!(
            cast_atomic(&V::String("P1YT0S".into()), AtomicType::YearMonthDuration).unwrap(),
            V::YearMonthDuration(12)
        );
        // Duration → subtype drops the foreign part instead.
        assert_eq!(
            cast_atomic(
                &V::Duration {
                    months: 13,
                    millis: 500
                },
                AtomicType::YearMonthDuration
            )
            .unwrap(),
            V::YearMonthDuration(13)
        );
    }

    #[test]
    fn untyped_round_trips_through_string() {
        let v = V::UntypedAtomic("42".into());
        assert_eq!(
            cast_atomic(&v, AtomicType::Integer).unwrap(),
            V::Integer(42)
        );
        assert_eq!(
            cast_atomic(&V::Integer(42), AtomicType::String).unwrap(),
            V::String("42".into())
        );
    }
}
