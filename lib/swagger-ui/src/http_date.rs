//! `Last-Modified` / `If-Modified-Since` style timestamps.

use std::time::SystemTime;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// The preferred format, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const IMF_FIXDATE: &[BorrowedFormatItem<'_>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// ANSI C's `asctime()` format, e.g. `Sun Nov  6 08:49:37 1994`.
const ASCTIME: &[BorrowedFormatItem<'_>] = format_description!(
    "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
);

/// `None` when `t` can't be written as an HTTP date.
pub(crate) fn format(t: SystemTime) -> Option<String> {
    to_datetime(t)?.format(IMF_FIXDATE).ok()
}

pub(crate) fn parse(s: &str) -> Option<SystemTime> {
    let s = s.trim();
    [IMF_FIXDATE, ASCTIME]
        .into_iter()
        .find_map(|format| PrimitiveDateTime::parse(s, format).ok())
        .map(|t| t.assume_utc().into())
}

/// Seconds since the UNIX epoch, the resolution HTTP dates are compared at.
/// `None` for times that shouldn't be advertised at all: the epoch itself,
/// anything before it and anything past year 9999.
pub(crate) fn unix_seconds(t: SystemTime) -> Option<u64> {
    to_datetime(t)?;
    match t.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) if d.as_secs() > 0 => Some(d.as_secs()),
        _ => None,
    }
}

fn to_datetime(t: SystemTime) -> Option<OffsetDateTime> {
    let since_epoch = t.duration_since(SystemTime::UNIX_EPOCH).ok()?;
    let secs = i64::try_from(since_epoch.as_secs()).ok()?;
    OffsetDateTime::UNIX_EPOCH.checked_add(time::Duration::seconds(secs))
}
