//! Date/time functions: the current-* accessors (frozen per evaluation),
//! `fn:dateTime`, component extraction, and timezone adjustment.

use chrono::{Datelike, FixedOffset, NaiveDateTime, Timelike};
use rust_decimal::Decimal;

use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

use super::opt_atom;

fn wrap<N: crate::model::XdmNode>(a: XdmAtomicValue) -> XdmSequence<N> {
    vec![XdmItem::Atomic(a)]
}

pub(super) fn current_date_time_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(XdmAtomicValue::DateTime {
        dt: ctx.now.naive_local(),
        tz: Some(*ctx.now.offset()),
    }))
}

pub(super) fn current_date_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(XdmAtomicValue::Date {
        date: ctx.now.naive_local().date(),
        tz: Some(*ctx.now.offset()),
    }))
}

pub(super) fn current_time_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(wrap(XdmAtomicValue::Time {
        time: ctx.now.naive_local().time(),
        tz: Some(*ctx.now.offset()),
    }))
}

pub(super) fn implicit_timezone_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let off = ctx.implicit_timezone();
    Ok(wrap(XdmAtomicValue::DayTimeDuration(
        i64::from(off.local_minus_utc()) * 1000,
    )))
}

/// `fn:dateTime(date, time)`: timezones must agree (or one side has none).
pub(super) fn date_time_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let (Some(d), Some(t)) = (opt_atom(&args[0])?, opt_atom(&args[1])?) else {
        return Ok(Vec::new());
    };
    let XdmAtomicValue::Date { date, tz: dtz } = d else {
        return Err(Error::from_code(ErrorCode::XPTY0004, "expected xs:date"));
    };
    let XdmAtomicValue::Time { time, tz: ttz } = t else {
        return Err(Error::from_code(ErrorCode::XPTY0004, "expected xs:time"));
    };
    let tz = match (dtz, ttz) {
        (Some(a), Some(b)) if a != b => {
            return Err(Error::from_code(
                ErrorCode::FORG0008,
                "date and time have different timezones",
            ));
        }
        (a, b) => a.or(b),
    };
    Ok(wrap(XdmAtomicValue::DateTime {
        dt: NaiveDateTime::new(date, time),
        tz,
    }))
}

fn timezone_item<N: crate::model::XdmNode>(tz: Option<FixedOffset>) -> XdmSequence<N> {
    match tz {
        Some(off) => vec![XdmItem::Atomic(XdmAtomicValue::DayTimeDuration(
            i64::from(off.local_minus_utc()) * 1000,
        ))],
        None => Vec::new(),
    }
}

fn seconds_value<N: crate::model::XdmNode>(time: chrono::NaiveTime) -> XdmSequence<N> {
    let millis = i64::from(time.second()) * 1000 + i64::from(time.nanosecond() / 1_000_000);
    vec![XdmItem::Atomic(XdmAtomicValue::Decimal(Decimal::new(
        millis, 3,
    )))]
}

pub(super) fn component_impl<N: XdmNode>(
    name: &'static str,
) -> impl Fn(&CallCtx<'_, N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync {
    move |_ctx, args| {
        let Some(a) = opt_atom(&args[0])? else {
            return Ok(Vec::new());
        };
        let int = |v: i64| vec![XdmItem::Atomic(XdmAtomicValue::Integer(v))];
        let (dt, tz): (Option<NaiveDateTime>, Option<FixedOffset>) = match &a {
            XdmAtomicValue::DateTime { dt, tz } => (Some(*dt), *tz),
            XdmAtomicValue::DateTimeStamp(d) => (Some(d.naive_local()), Some(*d.offset())),
            XdmAtomicValue::Date { date, tz } => {
                (date.and_hms_opt(0, 0, 0), *tz)
            }
            XdmAtomicValue::Time { time, tz } => (
                chrono::NaiveDate::from_ymd_opt(1972, 12, 31).map(|d| d.and_time(*time)),
                *tz,
            ),
            other => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!(
                        "expected a date/time value, got xs:{}",
                        other.type_of().local_name()
                    ),
                ));
            }
        };
        let Some(dt) = dt else { return Ok(Vec::new()) };
        Ok(match name {
            "year-from-dateTime" | "year-from-date" => int(i64::from(dt.year())),
            "month-from-dateTime" | "month-from-date" => int(i64::from(dt.month())),
            "day-from-dateTime" | "day-from-date" => int(i64::from(dt.day())),
            "hours-from-dateTime" | "hours-from-time" => int(i64::from(dt.hour())),
            "minutes-from-dateTime" | "minutes-from-time" => int(i64::from(dt.minute())),
            "seconds-from-dateTime" | "seconds-from-time" => seconds_value(dt.time()),
            _ => timezone_item(tz),
        })
    }
}

/// Shared implementation of the three adjust-*-to-timezone functions.
pub(super) fn adjust_impl<N: XdmNode>()
-> impl Fn(&CallCtx<'_, N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync {
    move |ctx, args| {
        let Some(value) = opt_atom(&args[0])? else {
            return Ok(Vec::new());
        };
        // The new timezone: absent argument means the implicit timezone;
        // an empty-sequence argument strips the timezone.
        let new_tz: Option<FixedOffset> = match args.get(1) {
            None => Some(ctx.implicit_timezone()),
            Some(seq) => match opt_atom(seq)? {
                None => None,
                Some(XdmAtomicValue::DayTimeDuration(ms)) => {
                    if ms % 60_000 != 0 || ms.abs() > 14 * 3_600_000 {
                        return Err(Error::from_code(
                            ErrorCode::FODT0003,
                            "timezone out of range",
                        ));
                    }
                    Some(FixedOffset::east_opt((ms / 1000) as i32).ok_or_else(|| {
                        Error::from_code(ErrorCode::FODT0003, "timezone out of range")
                    })?)
                }
                Some(other) => {
                    return Err(Error::from_code(
                        ErrorCode::XPTY0004,
                        format!(
                            "timezone must be a dayTimeDuration, got xs:{}",
                            other.type_of().local_name()
                        ),
                    ));
                }
            },
        };
        let shift = |dt: NaiveDateTime, old: Option<FixedOffset>| -> NaiveDateTime {
            match (old, new_tz) {
                (Some(o), Some(n)) => {
                    dt + chrono::Duration::seconds(i64::from(
                        n.local_minus_utc() - o.local_minus_utc(),
                    ))
                }
                _ => dt,
            }
        };
        let adjusted = match &value {
            XdmAtomicValue::DateTime { dt, tz } => XdmAtomicValue::DateTime {
                dt: shift(*dt, *tz),
                tz: new_tz,
            },
            XdmAtomicValue::DateTimeStamp(d) => XdmAtomicValue::DateTime {
                dt: shift(d.naive_local(), Some(*d.offset())),
                tz: new_tz,
            },
            XdmAtomicValue::Date { date, tz } => {
                let dt = date.and_hms_opt(0, 0, 0).expect("midnight");
                XdmAtomicValue::Date {
                    date: shift(dt, *tz).date(),
                    tz: new_tz,
                }
            }
            XdmAtomicValue::Time { time, tz } => {
                let base = chrono::NaiveDate::from_ymd_opt(1972, 12, 31)
                    .expect("fixed date")
                    .and_time(*time);
                XdmAtomicValue::Time {
                    time: shift(base, *tz).time(),
                    tz: new_tz,
                }
            }
            other => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!(
                        "expected a date/time value, got xs:{}",
                        other.type_of().local_name()
                    ),
                ));
            }
        };
        Ok(wrap(adjusted))
    }
}
