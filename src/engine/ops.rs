//! Runtime operator semantics: the numeric tower, arithmetic (numeric,
//! duration, date/time), value and general comparison, and the node-set
//! operations.
//!
//! Every function here works on already-atomized values; atomization and
//! focus handling live in the evaluator.

use chrono::{Datelike, Duration as ChronoDuration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::engine::collation::Collation;
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::XdmAtomicValue;
use crate::xdm::types::AtomicType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn from_symbol(symbol: &str) -> Option<CompareOp> {
        Some(match symbol {
            "=" | "eq" => CompareOp::Eq,
            "!=" | "ne" => CompareOp::Ne,
            "<" | "lt" => CompareOp::Lt,
            "<=" | "le" => CompareOp::Le,
            ">" | "gt" => CompareOp::Gt,
            ">=" | "ge" => CompareOp::Ge,
            _ => return None,
        })
    }

    pub fn of_ordering(self, ord: core::cmp::Ordering) -> bool {
        use core::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ord == Equal,
            CompareOp::Ne => ord != Equal,
            CompareOp::Lt => ord == Less,
            CompareOp::Le => ord != Greater,
            CompareOp::Gt => ord == Greater,
            CompareOp::Ge => ord != Less,
        }
    }
}

// ===== The numeric tower =====

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Integer(i) => i as f64,
            Numeric::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            Numeric::Float(f) => f as f64,
            Numeric::Double(d) => d,
        }
    }

    pub fn into_atomic(self) -> XdmAtomicValue {
        match self {
            Numeric::Integer(i) => XdmAtomicValue::Integer(i),
            Numeric::Decimal(d) => XdmAtomicValue::Decimal(d),
            Numeric::Float(f) => XdmAtomicValue::Float(f),
            Numeric::Double(d) => XdmAtomicValue::Double(d),
        }
    }
}

/// Classify an atomic value into the numeric tower. Untyped values cast to
/// double per the arithmetic rules; non-numerics yield `None`.
pub fn as_numeric(a: &XdmAtomicValue) -> Result<Option<Numeric>, Error> {
    use XdmAtomicValue as V;
    Ok(Some(match a {
        V::Double(d) => Numeric::Double(*d),
        V::Float(f) => Numeric::Float(*f),
        V::Decimal(d) => Numeric::Decimal(*d),
        V::UntypedAtomic(s) => Numeric::Double(parse_double_lexical(s)?),
        _ => match a.integer_value() {
            Some(i) => Numeric::Integer(i),
            None => match a {
                // Unsigned values beyond i64 still participate as decimals.
                V::UnsignedLong(u) | V::NonNegativeInteger(u) | V::PositiveInteger(u) => {
                    Numeric::Decimal(Decimal::from(*u))
                }
                _ => return Ok(None),
            },
        },
    }))
}

/// The XSD double lexical space: INF/-INF/NaN spellings, no Rust extras.
pub fn parse_double_lexical(s: &str) -> Result<f64, Error> {
    let t = s.trim();
    match t {
        "INF" | "+INF" => return Ok(f64::INFINITY),
        "-INF" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    if t.contains("inf") || t.contains("Inf") || t.contains("nan") {
        return Err(Error::from_code(
            ErrorCode::FORG0001,
            format!("invalid double lexical form {s:?}"),
        ));
    }
    t.parse::<f64>().map_err(|_| {
        Error::from_code(
            ErrorCode::FORG0001,
            format!("invalid double lexical form {s:?}"),
        )
    })
}

/// Promote a pair of numerics to their least common type.
fn unify(a: Numeric, b: Numeric) -> (Numeric, Numeric) {
    use Numeric::*;
    match (a, b) {
        (Double(_), _) | (_, Double(_)) => (Double(a.as_f64()), Double(b.as_f64())),
        (Float(_), _) | (_, Float(_)) => (Float(a.as_f64() as f32), Float(b.as_f64() as f32)),
        (Decimal(_), _) | (_, Decimal(_)) => {
            let to_dec = |n: Numeric| match n {
                Decimal(d) => d,
                Integer(i) => rust_decimal::Decimal::from(i),
                _ => unreachable!("float/double handled above"),
            };
            (Decimal(to_dec(a)), Decimal(to_dec(b)))
        }
        (Integer(_), Integer(_)) => (a, b),
    }
}

fn overflow() -> Error {
    Error::from_code(ErrorCode::FOAR0002, "numeric operation overflow")
}

fn div_by_zero() -> Error {
    Error::from_code(ErrorCode::FOAR0001, "division by zero")
}

/// Arithmetic on the numeric tower. Integer and decimal division by zero
/// raise `FOAR0001`; float/double follow IEEE (±INF, NaN). `div` of two
/// integers produces a decimal, `idiv` truncates toward zero.
pub fn numeric_arith(op: ArithOp, a: Numeric, b: Numeric) -> Result<XdmAtomicValue, Error> {
    use Numeric::*;
    // idiv works on the promoted pair but always yields an integer.
    if op == ArithOp::IDiv {
        return numeric_idiv(a, b);
    }
    let (a, b) = unify(a, b);
    Ok(match (a, b) {
        (Integer(x), Integer(y)) => match op {
            ArithOp::Add => XdmAtomicValue::Integer(x.checked_add(y).ok_or_else(overflow)?),
            ArithOp::Sub => XdmAtomicValue::Integer(x.checked_sub(y).ok_or_else(overflow)?),
            ArithOp::Mul => XdmAtomicValue::Integer(x.checked_mul(y).ok_or_else(overflow)?),
            ArithOp::Div => {
                // Integer div produces xs:decimal.
                if y == 0 {
                    return Err(div_by_zero());
                }
                let d = rust_decimal::Decimal::from(x)
                    .checked_div(rust_decimal::Decimal::from(y))
                    .ok_or_else(overflow)?;
                XdmAtomicValue::Decimal(d)
            }
            ArithOp::Mod => {
                if y == 0 {
                    return Err(div_by_zero());
                }
                XdmAtomicValue::Integer(x.checked_rem(y).ok_or_else(overflow)?)
            }
            ArithOp::IDiv => unreachable!("handled above"),
        },
        (Decimal(x), Decimal(y)) => match op {
            ArithOp::Add => XdmAtomicValue::Decimal(x.checked_add(y).ok_or_else(overflow)?),
            ArithOp::Sub => XdmAtomicValue::Decimal(x.checked_sub(y).ok_or_else(overflow)?),
            ArithOp::Mul => XdmAtomicValue::Decimal(x.checked_mul(y).ok_or_else(overflow)?),
            ArithOp::Div => {
                if y.is_zero() {
                    return Err(div_by_zero());
                }
                XdmAtomicValue::Decimal(x.checked_div(y).ok_or_else(overflow)?)
            }
            ArithOp::Mod => {
                if y.is_zero() {
                    return Err(div_by_zero());
                }
                XdmAtomicValue::Decimal(x.checked_rem(y).ok_or_else(overflow)?)
            }
            ArithOp::IDiv => unreachable!("handled above"),
        },
        (Float(x), Float(y)) => {
            let r = match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::Div => x / y,
                ArithOp::Mod => x % y,
                ArithOp::IDiv => unreachable!("handled above"),
            };
            XdmAtomicValue::Float(r)
        }
        (Double(x), Double(y)) => {
            let r = match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::Div => x / y,
                ArithOp::Mod => x % y,
                ArithOp::IDiv => unreachable!("handled above"),
            };
            XdmAtomicValue::Double(r)
        }
        _ => unreachable!("unify produced mixed pair"),
    })
}

fn numeric_idiv(a: Numeric, b: Numeric) -> Result<XdmAtomicValue, Error> {
    let fa = a.as_f64();
    let fb = b.as_f64();
    if fa.is_nan() || fa.is_infinite() {
        return Err(overflow());
    }
    if fb == 0.0 {
        return Err(div_by_zero());
    }
    if let (Numeric::Integer(x), Numeric::Integer(y)) = (a, b) {
        return Ok(XdmAtomicValue::Integer(
            x.checked_div(y).ok_or_else(overflow)?,
        ));
    }
    let q = (fa / fb).trunc();
    if q.abs() >= i64::MAX as f64 {
        return Err(overflow());
    }
    Ok(XdmAtomicValue::Integer(q as i64))
}

// ===== Temporal helpers =====

/// Add months to a date, clamping the day to the target month's length
/// (2024-02-29 + P1Y = 2025-02-28).
pub fn add_months(date: NaiveDate, months: i32) -> Result<NaiveDate, Error> {
    let total = date.year() as i64 * 12 + date.month0() as i64 + months as i64;
    let year: i32 = total
        .div_euclid(12)
        .try_into()
        .map_err(|_| Error::from_code(ErrorCode::FODT0001, "date arithmetic overflow"))?;
    let month = total.rem_euclid(12) as u32 + 1;
    let mut day = date.day();
    loop {
        if let Some(nd) = NaiveDate::from_ymd_opt(year, month, day) {
            return Ok(nd);
        }
        if day <= 28 {
            return Err(Error::from_code(ErrorCode::FODT0001, "date arithmetic overflow"));
        }
        day -= 1;
    }
}

fn add_millis_to_datetime(dt: NaiveDateTime, millis: i64) -> Result<NaiveDateTime, Error> {
    dt.checked_add_signed(ChronoDuration::milliseconds(millis))
        .ok_or_else(|| Error::from_code(ErrorCode::FODT0001, "date/time arithmetic overflow"))
}

/// Epoch milliseconds for ordering and subtraction; tz-less values assume
/// the implicit timezone.
pub fn temporal_epoch_millis(
    value: &XdmAtomicValue,
    implicit_tz: FixedOffset,
) -> Option<i64> {
    use XdmAtomicValue as V;
    let adjust = |dt: &NaiveDateTime, tz: &Option<FixedOffset>| {
        let off = tz.unwrap_or(implicit_tz);
        dt.and_utc().timestamp_millis() - i64::from(off.local_minus_utc()) * 1000
    };
    match value {
        V::DateTime { dt, tz } => Some(adjust(dt, tz)),
        V::DateTimeStamp(dt) => Some(dt.timestamp_millis()),
        V::Date { date, tz } => Some(adjust(&date.and_hms_opt(0, 0, 0)?, tz)),
        V::Time { time, tz } => {
            let base = i64::from(time.num_seconds_from_midnight()) * 1000
                + i64::from(time.nanosecond() / 1_000_000);
            let off = tz.unwrap_or(implicit_tz);
            Some(base - i64::from(off.local_minus_utc()) * 1000)
        }
        _ => None,
    }
}

fn duration_parts(value: &XdmAtomicValue) -> Option<(i32, i64)> {
    use XdmAtomicValue as V;
    match value {
        V::Duration { months, millis } => Some((*months, *millis)),
        V::YearMonthDuration(m) => Some((*m, 0)),
        V::DayTimeDuration(ms) => Some((0, *ms)),
        _ => None,
    }
}

// ===== Arithmetic dispatch =====

/// Binary arithmetic over atomics: numeric tower, durations, and
/// temporal ± duration. `compat` selects XPath 1.0 number coercion;
/// `implicit_tz` fills in for tz-less temporal operands.
pub fn arithmetic(
    op: ArithOp,
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    compat: bool,
    implicit_tz: FixedOffset,
) -> Result<XdmAtomicValue, Error> {
    if compat {
        // 1.0: both operands become doubles via fn:number semantics.
        let x = number_1_0(a);
        let y = number_1_0(b);
        return numeric_arith(op, Numeric::Double(x), Numeric::Double(y));
    }

    let ta = a.type_of();
    let tb = b.type_of();

    // Pure numerics (and untyped, which casts to double).
    let numeric_side =
        |t: AtomicType| t.is_numeric() || t == AtomicType::UntypedAtomic;
    if numeric_side(ta) && numeric_side(tb) {
        let x = as_numeric(a)?.expect("numeric side classified");
        let y = as_numeric(b)?.expect("numeric side classified");
        return numeric_arith(op, x, y);
    }

    let ym = |t: AtomicType| t == AtomicType::YearMonthDuration;
    let dt_dur = |t: AtomicType| t == AtomicType::DayTimeDuration;
    let temporal = |t: AtomicType| {
        matches!(
            t,
            AtomicType::Date | AtomicType::Time | AtomicType::DateTime | AtomicType::DateTimeStamp
        )
    };

    match (op, ta, tb) {
        // duration + duration (same subtype)
        (ArithOp::Add | ArithOp::Sub, x, y) if ym(x) && ym(y) => {
            let (ma, _) = duration_parts(a).expect("yearMonthDuration");
            let (mb, _) = duration_parts(b).expect("yearMonthDuration");
            let m = if op == ArithOp::Add {
                ma.checked_add(mb)
            } else {
                ma.checked_sub(mb)
            };
            Ok(XdmAtomicValue::YearMonthDuration(m.ok_or_else(|| {
                Error::from_code(ErrorCode::FODT0002, "duration overflow")
            })?))
        }
        (ArithOp::Add | ArithOp::Sub, x, y) if dt_dur(x) && dt_dur(y) => {
            let (_, la) = duration_parts(a).expect("dayTimeDuration");
            let (_, lb) = duration_parts(b).expect("dayTimeDuration");
            let ms = if op == ArithOp::Add {
                la.checked_add(lb)
            } else {
                la.checked_sub(lb)
            };
            Ok(XdmAtomicValue::DayTimeDuration(ms.ok_or_else(|| {
                Error::from_code(ErrorCode::FODT0002, "duration overflow")
            })?))
        }
        // duration * number, duration div number, duration div duration
        (ArithOp::Mul, x, _) if (ym(x) || dt_dur(x)) && tb.is_numeric() => {
            scale_duration(a, b.double_value().unwrap_or(f64::NAN))
        }
        (ArithOp::Mul, _, y) if (ym(y) || dt_dur(y)) && ta.is_numeric() => {
            scale_duration(b, a.double_value().unwrap_or(f64::NAN))
        }
        (ArithOp::Div, x, _) if (ym(x) || dt_dur(x)) && tb.is_numeric() => {
            let f = b.double_value().unwrap_or(f64::NAN);
            if f == 0.0 {
                return Err(Error::from_code(ErrorCode::FODT0002, "duration division by zero"));
            }
            scale_duration(a, 1.0 / f)
        }
        (ArithOp::Div, x, y) if ym(x) && ym(y) => {
            let (ma, _) = duration_parts(a).expect("yearMonthDuration");
            let (mb, _) = duration_parts(b).expect("yearMonthDuration");
            if mb == 0 {
                return Err(div_by_zero());
            }
            let q = Decimal::from(ma)
                .checked_div(Decimal::from(mb))
                .ok_or_else(overflow)?;
            Ok(XdmAtomicValue::Decimal(q))
        }
        (ArithOp::Div, x, y) if dt_dur(x) && dt_dur(y) => {
            let (_, la) = duration_parts(a).expect("dayTimeDuration");
            let (_, lb) = duration_parts(b).expect("dayTimeDuration");
            if lb == 0 {
                return Err(div_by_zero());
            }
            let q = Decimal::from(la)
                .checked_div(Decimal::from(lb))
                .ok_or_else(overflow)?;
            Ok(XdmAtomicValue::Decimal(q))
        }
        // temporal ± duration
        (ArithOp::Add | ArithOp::Sub, x, y) if temporal(x) && (ym(y) || dt_dur(y)) => {
            let (months, millis) = duration_parts(b).expect("duration operand");
            let (months, millis) = if op == ArithOp::Sub {
                (-months, -millis)
            } else {
                (months, millis)
            };
            shift_temporal(a, months, millis)
        }
        (ArithOp::Add, x, y) if temporal(y) && (ym(x) || dt_dur(x)) => {
            let (months, millis) = duration_parts(a).expect("duration operand");
            shift_temporal(b, months, millis)
        }
        // temporal - temporal → dayTimeDuration
        (ArithOp::Sub, x, y)
            if temporal(x) && temporal(y) && (x == y || x.derives_from(y) || y.derives_from(x)) =>
        {
            let ea = temporal_epoch_millis(a, implicit_tz)
                .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "bad temporal operand"))?;
            let eb = temporal_epoch_millis(b, implicit_tz)
                .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "bad temporal operand"))?;
            Ok(XdmAtomicValue::DayTimeDuration(ea - eb))
        }
        _ => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!(
                "cannot apply arithmetic to xs:{} and xs:{}",
                ta.local_name(),
                tb.local_name()
            ),
        )),
    }
}

fn scale_duration(dur: &XdmAtomicValue, factor: f64) -> Result<XdmAtomicValue, Error> {
    if factor.is_nan() {
        return Err(Error::from_code(
            ErrorCode::FOCA0005,
            "NaN is not a valid duration factor",
        ));
    }
    let (months, millis) = duration_parts(dur).expect("duration operand");
    match dur {
        XdmAtomicValue::YearMonthDuration(_) => {
            let m = (months as f64 * factor).round();
            if !m.is_finite() || m.abs() > i32::MAX as f64 {
                return Err(Error::from_code(ErrorCode::FODT0002, "duration overflow"));
            }
            Ok(XdmAtomicValue::YearMonthDuration(m as i32))
        }
        _ => {
            let ms = (millis as f64 * factor).round();
            if !ms.is_finite() || ms.abs() > i64::MAX as f64 {
                return Err(Error::from_code(ErrorCode::FODT0002, "duration overflow"));
            }
            Ok(XdmAtomicValue::DayTimeDuration(ms as i64))
        }
    }
}

fn shift_temporal(
    value: &XdmAtomicValue,
    months: i32,
    millis: i64,
) -> Result<XdmAtomicValue, Error> {
    use XdmAtomicValue as V;
    match value {
        V::Date { date, tz } => {
            let shifted = add_months(*date, months)?;
            // Day-time parts shift through midnight and truncate back.
            let dt = add_millis_to_datetime(
                shifted.and_hms_opt(0, 0, 0).expect("midnight is valid"),
                millis,
            )?;
            Ok(V::Date {
                date: dt.date(),
                tz: *tz,
            })
        }
        V::DateTime { dt, tz } => {
            let with_months = NaiveDateTime::new(add_months(dt.date(), months)?, dt.time());
            Ok(V::DateTime {
                dt: add_millis_to_datetime(with_months, millis)?,
                tz: *tz,
            })
        }
        V::DateTimeStamp(dt) => {
            let naive = dt.naive_local();
            let with_months = NaiveDateTime::new(add_months(naive.date(), months)?, naive.time());
            let shifted = add_millis_to_datetime(with_months, millis)?;
            Ok(V::DateTimeStamp(
                shifted
                    .and_local_timezone(*dt.offset())
                    .single()
                    .ok_or_else(|| Error::from_code(ErrorCode::FODT0001, "timezone shift failed"))?,
            ))
        }
        V::Time { time, tz } => {
            if months != 0 {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "cannot add a yearMonthDuration to xs:time",
                ));
            }
            let day_ms = 86_400_000i64;
            let base = i64::from(time.num_seconds_from_midnight()) * 1000
                + i64::from(time.nanosecond() / 1_000_000);
            let total = (base + millis).rem_euclid(day_ms);
            let time = chrono::NaiveTime::from_num_seconds_from_midnight_opt(
                (total / 1000) as u32,
                ((total % 1000) * 1_000_000) as u32,
            )
            .expect("wrapped time is in range");
            Ok(V::Time { time, tz: *tz })
        }
        _ => Err(Error::from_code(ErrorCode::XPTY0004, "bad temporal operand")),
    }
}

/// XPath 1.0 `number()` coercion: anything not numeric becomes NaN rather
/// than an error.
pub fn number_1_0(a: &XdmAtomicValue) -> f64 {
    match a {
        XdmAtomicValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => match a.double_value() {
            Some(d) => d,
            None => a.string_value().trim().parse().unwrap_or(f64::NAN),
        },
    }
}

// ===== Value comparison =====

/// Compare two atomics under the value-comparison rules. Untyped operands
/// compare as strings; numeric pairs promote; temporal pairs use the
/// implicit timezone; mismatched families are `XPTY0004`.
pub fn value_compare(
    op: CompareOp,
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    collation: &dyn Collation,
    implicit_tz: FixedOffset,
) -> Result<bool, Error> {
    use XdmAtomicValue as V;

    let ta = a.type_of();
    let tb = b.type_of();

    // Numeric pair (untyped already cast by the caller for general
    // comparisons; here untyped means string).
    if ta.is_numeric() && tb.is_numeric() {
        let (x, y) = unify(
            as_numeric(a)?.expect("numeric type classified"),
            as_numeric(b)?.expect("numeric type classified"),
        );
        return Ok(match (x, y) {
            (Numeric::Integer(i), Numeric::Integer(j)) => op.of_ordering(i.cmp(&j)),
            (Numeric::Decimal(i), Numeric::Decimal(j)) => op.of_ordering(i.cmp(&j)),
            (Numeric::Float(i), Numeric::Float(j)) => float_compare(op, i as f64, j as f64),
            (Numeric::Double(i), Numeric::Double(j)) => float_compare(op, i, j),
            _ => unreachable!("unify produced mixed pair"),
        });
    }

    let stringish = |t: AtomicType| {
        t.derives_from(AtomicType::String)
            || t == AtomicType::AnyUri
            || t == AtomicType::UntypedAtomic
    };
    if stringish(ta) && stringish(tb) {
        let sa = a.string_value();
        let sb = b.string_value();
        return Ok(match op {
            CompareOp::Eq => collation.key(&sa) == collation.key(&sb),
            CompareOp::Ne => collation.key(&sa) != collation.key(&sb),
            _ => op.of_ordering(collation.compare(&sa, &sb)),
        });
    }

    if let (V::Boolean(x), V::Boolean(y)) = (a, b) {
        return Ok(op.of_ordering(x.cmp(y)));
    }

    let temporal = |t: AtomicType| {
        matches!(
            t,
            AtomicType::Date | AtomicType::Time | AtomicType::DateTime | AtomicType::DateTimeStamp
        )
    };
    if temporal(ta) && temporal(tb) && (ta == tb || (ta.derives_from(tb) || tb.derives_from(ta))) {
        let ea = temporal_epoch_millis(a, implicit_tz)
            .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "bad temporal operand"))?;
        let eb = temporal_epoch_millis(b, implicit_tz)
            .ok_or_else(|| Error::from_code(ErrorCode::XPTY0004, "bad temporal operand"))?;
        return Ok(op.of_ordering(ea.cmp(&eb)));
    }

    // Durations: equality across the family, ordering only within the two
    // proper subtypes.
    if let (Some((ma, la)), Some((mb, lb))) = (duration_parts(a), duration_parts(b)) {
        match op {
            CompareOp::Eq => return Ok(ma == mb && la == lb),
            CompareOp::Ne => return Ok(ma != mb || la != lb),
            _ => {
                if ta == AtomicType::YearMonthDuration && tb == AtomicType::YearMonthDuration {
                    return Ok(op.of_ordering(ma.cmp(&mb)));
                }
                if ta == AtomicType::DayTimeDuration && tb == AtomicType::DayTimeDuration {
                    return Ok(op.of_ordering(la.cmp(&lb)));
                }
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "xs:duration values are not ordered",
                ));
            }
        }
    }

    if let (
        V::QName {
            ns_uri: na,
            local: la,
            ..
        },
        V::QName {
            ns_uri: nb,
            local: lb,
            ..
        },
    ) = (a, b)
    {
        return match op {
            CompareOp::Eq => Ok(na == nb && la == lb),
            CompareOp::Ne => Ok(na != nb || la != lb),
            _ => Err(Error::from_code(
                ErrorCode::XPTY0004,
                "xs:QName values are not ordered",
            )),
        };
    }

    if let (V::Base64Binary(x) | V::HexBinary(x), V::Base64Binary(y) | V::HexBinary(y)) = (a, b) {
        return Ok(match op {
            CompareOp::Eq => x == y,
            CompareOp::Ne => x != y,
            _ => op.of_ordering(x.cmp(y)),
        });
    }

    // g* fragments: equality within the same type.
    if ta == tb
        && matches!(
            ta,
            AtomicType::GYear
                | AtomicType::GYearMonth
                | AtomicType::GMonth
                | AtomicType::GMonthDay
                | AtomicType::GDay
        )
    {
        return match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Ne => Ok(a != b),
            _ => Err(Error::from_code(
                ErrorCode::XPTY0004,
                "gregorian fragment values are not ordered",
            )),
        };
    }

    Err(Error::from_code(
        ErrorCode::XPTY0004,
        format!(
            "cannot compare xs:{} with xs:{}",
            ta.local_name(),
            tb.local_name()
        ),
    ))
}

fn float_compare(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

// ===== General comparison =====

/// Existentially quantified comparison over two atomized sequences.
pub fn general_compare(
    op: CompareOp,
    lhs: &[XdmAtomicValue],
    rhs: &[XdmAtomicValue],
    compat: bool,
    collation: &dyn Collation,
    implicit_tz: FixedOffset,
) -> Result<bool, Error> {
    for a in lhs {
        for b in rhs {
            if compat {
                if general_pair_1_0(op, a, b, collation)? {
                    return Ok(true);
                }
            } else if general_pair(op, a, b, collation, implicit_tz)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn general_pair(
    op: CompareOp,
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    collation: &dyn Collation,
    implicit_tz: FixedOffset,
) -> Result<bool, Error> {
    use XdmAtomicValue as V;
    let ta = a.type_of();
    let tb = b.type_of();
    // Untyped operands take the other side's type: numeric → double,
    // untyped/string → string, otherwise cast to the partner type.
    let (ca, cb): (XdmAtomicValue, XdmAtomicValue) = match (ta, tb) {
        (AtomicType::UntypedAtomic, AtomicType::UntypedAtomic) => (a.clone(), b.clone()),
        (AtomicType::UntypedAtomic, other) => {
            let cast = if other.is_numeric() {
                V::Double(parse_double_lexical(&a.string_value())?)
            } else if other.derives_from(AtomicType::String) || other == AtomicType::AnyUri {
                V::String(a.string_value())
            } else {
                crate::xdm::cast::cast_atomic(a, other)?
            };
            (cast, b.clone())
        }
        (other, AtomicType::UntypedAtomic) => {
            let cast = if other.is_numeric() {
                V::Double(parse_double_lexical(&b.string_value())?)
            } else if other.derives_from(AtomicType::String) || other == AtomicType::AnyUri {
                V::String(b.string_value())
            } else {
                crate::xdm::cast::cast_atomic(b, other)?
            };
            (a.clone(), cast)
        }
        _ => (a.clone(), b.clone()),
    };
    value_compare(op, &ca, &cb, collation, implicit_tz)
}

/// XPath 1.0 comparison coercions: booleans dominate, relational operators
/// force numbers, `=`/`!=` fall back to string comparison.
fn general_pair_1_0(
    op: CompareOp,
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    collation: &dyn Collation,
) -> Result<bool, Error> {
    use XdmAtomicValue as V;
    if matches!(a, V::Boolean(_)) || matches!(b, V::Boolean(_)) {
        let ba = match a {
            V::Boolean(v) => *v,
            _ => truthy_1_0(a),
        };
        let bb = match b {
            V::Boolean(v) => *v,
            _ => truthy_1_0(b),
        };
        return Ok(match op {
            CompareOp::Eq => ba == bb,
            CompareOp::Ne => ba != bb,
            _ => float_compare(op, ba as u8 as f64, bb as u8 as f64),
        });
    }
    let numeric_context = !matches!(op, CompareOp::Eq | CompareOp::Ne)
        || a.is_numeric()
        || b.is_numeric();
    if numeric_context {
        return Ok(float_compare(op, number_1_0(a), number_1_0(b)));
    }
    let sa = a.string_value();
    let sb = b.string_value();
    Ok(match op {
        CompareOp::Eq => collation.key(&sa) == collation.key(&sb),
        CompareOp::Ne => collation.key(&sa) != collation.key(&sb),
        _ => unreachable!("relational handled in numeric context"),
    })
}

fn truthy_1_0(a: &XdmAtomicValue) -> bool {
    match a {
        XdmAtomicValue::Boolean(b) => *b,
        _ if a.is_numeric() => {
            let d = a.double_value().unwrap_or(f64::NAN);
            !d.is_nan() && d != 0.0
        }
        _ => !a.string_value().is_empty(),
    }
}

// ===== Node-set operations =====

/// Sort by document order and drop duplicate identities.
pub fn document_order_dedup<N: XdmNode>(mut nodes: Vec<N>) -> Result<Vec<N>, Error> {
    let mut err: Option<Error> = None;
    nodes.sort_by(|a, b| match a.compare_document_order(b) {
        Ok(ord) => ord,
        Err(e) => {
            err.get_or_insert(e);
            core::cmp::Ordering::Equal
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    let mut seen = std::collections::HashSet::with_capacity(nodes.len());
    nodes.retain(|n| seen.insert(n.clone()));
    Ok(nodes)
}

pub fn set_union<N: XdmNode>(a: Vec<N>, b: Vec<N>) -> Result<Vec<N>, Error> {
    let mut all = a;
    all.extend(b);
    document_order_dedup(all)
}

pub fn set_intersect<N: XdmNode>(a: Vec<N>, b: Vec<N>) -> Result<Vec<N>, Error> {
    let keep: std::collections::HashSet<N> = b.into_iter().collect();
    let filtered = a.into_iter().filter(|n| keep.contains(n)).collect();
    document_order_dedup(filtered)
}

pub fn set_except<N: XdmNode>(a: Vec<N>, b: Vec<N>) -> Result<Vec<N>, Error> {
    let drop: std::collections::HashSet<N> = b.into_iter().collect();
    let filtered = a.into_iter().filter(|n| !drop.contains(n)).collect();
    document_order_dedup(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_yields_decimal() {
        let r = numeric_arith(ArithOp::Div, Numeric::Integer(1), Numeric::Integer(2)).unwrap();
        assert_eq!(r, XdmAtomicValue::Decimal("0.5".parse().unwrap()));
    }

    #[test]
    fn division_by_zero_per_type() {
        assert!(
            numeric_arith(ArithOp::Div, Numeric::Integer(1), Numeric::Integer(0))
                .unwrap_err()
                .is_code(ErrorCode::FOAR0001)
        );
        let inf = numeric_arith(ArithOp::Div, Numeric::Double(1.0), Numeric::Double(0.0)).unwrap();
        assert_eq!(inf, XdmAtomicValue::Double(f64::INFINITY));
        let nan = numeric_arith(ArithOp::Div, Numeric::Double(0.0), Numeric::Double(0.0)).unwrap();
        match nan {
            XdmAtomicValue::Double(d) => assert!(d.is_nan()),
            other => panic!("expected double NaN, got {other:?}"),
        }
    }

    #[test]
    fn idiv_truncates_toward_zero() {
        assert_eq!(
            numeric_idiv(Numeric::Integer(-7), Numeric::Integer(2)).unwrap(),
            XdmAtomicValue::Integer(-3)
        );
        assert_eq!(
            numeric_idiv(Numeric::Double(7.9), Numeric::Integer(2)).unwrap(),
            XdmAtomicValue::Integer(3)
        );
    }

    #[test]
    fn leap_day_plus_year_clamps() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            add_months(d, 12).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
    }

    #[test]
    fn duration_times_number() {
        let r = arithmetic(
            ArithOp::Mul,
            &XdmAtomicValue::YearMonthDuration(18),
            &XdmAtomicValue::Double(2.0),
            false,
            FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap();
        assert_eq!(r, XdmAtomicValue::YearMonthDuration(36));
    }
}
