//! Numeric functions: `number`, `abs`, `floor`, `ceiling`, `round`,
//! `round-half-to-even`, and the aggregates `sum`, `avg`, `min`, `max`.
//!
//! The unary functions preserve the narrowest input type: `abs` of an
//! xs:integer is an xs:integer, of an xs:float an xs:float.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;

use crate::engine::ops::{self, ArithOp, CompareOp, Numeric};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::types::AtomicType;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence, atomize};

use super::opt_atom;

pub(super) fn number_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let atom = match args.first() {
        Some(seq) => opt_atom(seq)?,
        None => {
            let item = ctx.focus.item_or_absent()?;
            atomize(std::slice::from_ref(item))?.into_iter().next()
        }
    };
    let d = match atom {
        None => f64::NAN,
        Some(a) => ops::number_1_0(&a),
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Double(d))])
}

/// Apply a type-preserving unary operation across the numeric tower.
fn unary_numeric<N: XdmNode>(
    args: &[XdmSequence<N>],
    int_op: impl Fn(i64) -> Result<i64, Error>,
    dec_op: impl Fn(Decimal) -> Decimal,
    f64_op: impl Fn(f64) -> f64,
) -> Result<XdmSequence<N>, Error> {
    let Some(a) = opt_atom(&args[0])? else {
        return Ok(Vec::new());
    };
    let n = ops::as_numeric(&a)?.ok_or_else(|| {
        Error::from_code(
            ErrorCode::XPTY0004,
            format!("xs:{} is not numeric", a.type_of().local_name()),
        )
    })?;
    let out = match n {
        Numeric::Integer(i) => XdmAtomicValue::Integer(int_op(i)?),
        Numeric::Decimal(d) => XdmAtomicValue::Decimal(dec_op(d)),
        Numeric::Float(f) => XdmAtomicValue::Float(f64_op(f as f64) as f32),
        Numeric::Double(d) => XdmAtomicValue::Double(f64_op(d)),
    };
    Ok(vec![XdmItem::Atomic(out)])
}

pub(super) fn abs_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    unary_numeric(
        args,
        |i| {
            i.checked_abs()
                .ok_or_else(|| Error::from_code(ErrorCode::FOAR0002, "abs overflow"))
        },
        |d| d.abs(),
        f64::abs,
    )
}

pub(super) fn floor_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    unary_numeric(args, Ok, |d| d.floor(), f64::floor)
}

pub(super) fn ceiling_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    unary_numeric(args, Ok, |d| d.ceil(), f64::ceil)
}

/// `10^p` as a decimal; negative powers use the scale directly.
fn dec_pow10(p: i32) -> Decimal {
    if p >= 0 {
        let mut d = Decimal::ONE;
        for _ in 0..p {
            d *= Decimal::from(10);
        }
        d
    } else {
        Decimal::new(1, (-p) as u32)
    }
}

fn precision_arg<N: XdmNode>(args: &[XdmSequence<N>]) -> Result<i32, Error> {
    match args.get(1) {
        None => Ok(0),
        Some(seq) => {
            let p = opt_atom(seq)?
                .and_then(|a| a.integer_value())
                .ok_or_else(|| {
                    Error::from_code(ErrorCode::XPTY0004, "precision must be an integer")
                })?;
            i32::try_from(p)
                .map_err(|_| Error::from_code(ErrorCode::FOAR0002, "precision out of range"))
        }
    }
}

/// `fn:round`: half rounds toward positive infinity (2.5 → 3, -2.5 → -2).
pub(super) fn round_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let precision = precision_arg(args)?;
    let scale = 10f64.powi(precision);
    let dec_scale = dec_pow10(precision);
    unary_numeric(
        args,
        move |i| {
            if precision >= 0 {
                return Ok(i);
            }
            let d = Decimal::from(i) * dec_scale;
            let r = (d.floor() + round_half_up_fraction(d)) / dec_scale;
            r.to_i64()
                .ok_or_else(|| Error::from_code(ErrorCode::FOAR0002, "round overflow"))
        },
        move |d| {
            let scaled = d * dec_scale;
            (scaled.floor() + round_half_up_fraction(scaled)) / dec_scale
        },
        move |d| {
            if d.is_nan() || d.is_infinite() || d == 0.0 {
                return d;
            }
            (d * scale + 0.5).floor() / scale
        },
    )
}

/// 1 when the fractional part is ≥ 0.5 (round toward +INF), else 0.
fn round_half_up_fraction(d: Decimal) -> Decimal {
    if d - d.floor() >= Decimal::new(5, 1) {
        Decimal::ONE
    } else {
        Decimal::ZERO
    }
}

pub(super) fn round_half_to_even_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let precision = precision_arg(args)?;
    let dec_scale = dec_pow10(precision);
    let scale = 10f64.powi(precision);
    unary_numeric(
        args,
        move |i| {
            if precision >= 0 {
                return Ok(i);
            }
            let d = (Decimal::from(i) * dec_scale)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
                / dec_scale;
            d.to_i64()
                .ok_or_else(|| Error::from_code(ErrorCode::FOAR0002, "round overflow"))
        },
        move |d| {
            (d * dec_scale).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
                / dec_scale
        },
        move |d| {
            if d.is_nan() || d.is_infinite() || d == 0.0 {
                return d;
            }
            (d * scale).round_ties_even() / scale
        },
    )
}

/// `fn:sum`: the empty sequence yields 0 (or the caller-supplied zero).
/// Operands are all numeric or all durations of one subtype.
pub(super) fn sum_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let atoms = atomize(&args[0])?;
    if atoms.is_empty() {
        return match args.get(1) {
            Some(zero) => Ok(zero.clone()),
            None => Ok(vec![XdmItem::Atomic(XdmAtomicValue::Integer(0))]),
        };
    }
    let mut acc = normalize_untyped(&atoms[0])?;
    for a in &atoms[1..] {
        let a = normalize_untyped(a)?;
        acc = ops::arithmetic(
            ArithOp::Add,
            &acc,
            &a,
            false,
            chrono::FixedOffset::east_opt(0).expect("zero offset"),
        )?;
    }
    Ok(vec![XdmItem::Atomic(acc)])
}

pub(super) fn avg_fn<N: XdmNode>(
    _ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let atoms = atomize(&args[0])?;
    if atoms.is_empty() {
        return Ok(Vec::new());
    }
    let count = XdmAtomicValue::Integer(atoms.len() as i64);
    let sum = sum_fn::<N>(_ctx, &[args[0].clone()])?;
    let [XdmItem::Atomic(total)] = sum.as_slice() else {
        return Err(Error::from_code(ErrorCode::XPTY0004, "avg on non-atomics"));
    };
    let avg = ops::arithmetic(
        ArithOp::Div,
        total,
        &count,
        false,
        chrono::FixedOffset::east_opt(0).expect("zero offset"),
    )?;
    Ok(vec![XdmItem::Atomic(avg)])
}

fn normalize_untyped(a: &XdmAtomicValue) -> Result<XdmAtomicValue, Error> {
    if a.type_of() == AtomicType::UntypedAtomic {
        Ok(XdmAtomicValue::Double(ops::parse_double_lexical(
            &a.string_value(),
        )?))
    } else {
        Ok(a.clone())
    }
}

fn minmax<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
    want_max: bool,
) -> Result<XdmSequence<N>, Error> {
    let atoms = atomize(&args[0])?;
    if atoms.is_empty() {
        return Ok(Vec::new());
    }
    let collation = match args.get(1) {
        Some(seq) => {
            let uri = super::opt_string(seq)?;
            ctx.env
                .collations
                .resolve(uri.as_deref(), ctx.default_collation())?
        }
        None => ctx
            .env
            .collations
            .resolve(None, ctx.default_collation())?,
    };
    let tz = ctx.implicit_timezone();
    let mut best = normalize_untyped(&atoms[0])?;
    // NaN in the input makes the whole aggregate NaN.
    let is_nan =
        |v: &XdmAtomicValue| matches!(v, XdmAtomicValue::Double(d) if d.is_nan())
            || matches!(v, XdmAtomicValue::Float(f) if f.is_nan());
    if is_nan(&best) {
        return Ok(vec![XdmItem::Atomic(best)]);
    }
    let op = if want_max { CompareOp::Gt } else { CompareOp::Lt };
    for a in &atoms[1..] {
        let a = normalize_untyped(a)?;
        if is_nan(&a) {
            return Ok(vec![XdmItem::Atomic(a)]);
        }
        if ops::value_compare(op, &a, &best, collation.as_ref(), tz)? {
            best = a;
        }
    }
    Ok(vec![XdmItem::Atomic(best)])
}

pub(super) fn max_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    minmax(ctx, args, true)
}

pub(super) fn min_fn<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    minmax(ctx, args, false)
}
