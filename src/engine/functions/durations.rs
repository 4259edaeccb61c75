//! Duration component extraction.

use rust_decimal::Decimal;

use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

use super::opt_atom;

pub(super) fn component_impl<N: XdmNode>(
    name: &'static str,
) -> impl Fn(&CallCtx<'_, N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync {
    move |_ctx, args| {
        let Some(a) = opt_atom(&args[0])? else {
            return Ok(Vec::new());
        };
        let (months, millis) = match &a {
            XdmAtomicValue::Duration { months, millis } => (*months, *millis),
            XdmAtomicValue::YearMonthDuration(m) => (*m, 0),
            XdmAtomicValue::DayTimeDuration(ms) => (0, *ms),
            other => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!(
                        "expected a duration, got xs:{}",
                        other.type_of().local_name()
                    ),
                ));
            }
        };
        let int = |v: i64| vec![XdmItem::Atomic(XdmAtomicValue::Integer(v))];
        Ok(match name {
            "years-from-duration" => int(i64::from(months) / 12),
            "months-from-duration" => int(i64::from(months) % 12),
            "days-from-duration" => int(millis / 86_400_000),
            "hours-from-duration" => int(millis % 86_400_000 / 3_600_000),
            "minutes-from-duration" => int(millis % 3_600_000 / 60_000),
            _ => {
                // seconds-from-duration returns a decimal with the
                // millisecond fraction preserved.
                let sec_millis = millis % 60_000;
                vec![XdmItem::Atomic(XdmAtomicValue::Decimal(
                    Decimal::new(sec_millis, 3),
                ))]
            }
        })
    }
}
