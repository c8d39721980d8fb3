use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

/// Layout of every timestamp exchanged with the payment gateway.
pub const GATEWAY_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// The gateway reads and writes timestamps in East Africa Time.
pub fn gateway_timezone() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap_or_else(|| Utc.fix())
}

pub fn format_gateway_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&gateway_timezone())
        .format(GATEWAY_TIMESTAMP_FORMAT)
        .to_string()
}

/// Parses a gateway timestamp such as `20191219102115`.
pub fn parse_gateway_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, GATEWAY_TIMESTAMP_FORMAT).ok()?;
    gateway_timezone()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
