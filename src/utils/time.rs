use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// The layout SQLite's `CURRENT_TIMESTAMP` produces.  Always UTC.
const SQLITE_TIMESTAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Parse a SQLite `CURRENT_TIMESTAMP` value into a UTC OffsetDateTime
pub fn parse_sqlite_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(s.trim(), SQLITE_TIMESTAMP).map(PrimitiveDateTime::assume_utc)
}

/// Format an OffsetDateTime the way SQLite's `CURRENT_TIMESTAMP` does
pub fn format_sqlite_timestamp(datetime: OffsetDateTime) -> Result<String, time::error::Format> {
    datetime
        .to_offset(time::UtcOffset::UTC)
        .format(SQLITE_TIMESTAMP)
}
