//! Stored field formats, as the web client writes them: hyphenated UUIDs,
//! UTC timestamps ending in `Z`, and a `dueDate` key that is present even
//! when it is null.

use chrono::{DateTime, NaiveDate, SecondsFormat, Timelike, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use uuid::Uuid;

const UUID_HYPHENS: [usize; 4] = [8, 13, 18, 23];

/// The 8-4-4-4-12 hex form only; simple, braced and `urn:uuid:` forms are
/// rejected.
pub fn is_hyphenated_uuid(raw: &str) -> bool {
    raw.len() == 36
        && raw.bytes().enumerate().all(|(i, b)| {
            if UUID_HYPHENS.contains(&i) {
                b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        })
}

pub fn hyphenated_uuid<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if !is_hyphenated_uuid(&raw) {
        return Err(D::Error::custom(format!(
            "invalid UUID `{raw}`, expected the hyphenated 8-4-4-4-12 form"
        )));
    }
    Uuid::parse_str(&raw).map_err(D::Error::custom)
}

/// `null` or a date, but the key itself is required.
pub fn required_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NaiveDate>::deserialize(deserializer)
}

/// `YYYY-MM-DDTHH:MM:SS[.fraction]Z`. Offsets other than `Z` are rejected.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let shaped = raw.len() >= 20 && raw.as_bytes()[10] == b'T' && raw.ends_with('Z');
    if !shaped {
        return Err(format!(
            "invalid timestamp `{raw}`, expected UTC form like 2024-01-01T00:00:00.000Z"
        ));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp `{raw}`: {e}"))
}

/// Millisecond precision, the way `Date.toISOString` writes it, unless the
/// value carries finer digits.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    let precision = if value.nanosecond() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::AutoSi
    };
    value.to_rfc3339_opts(precision, true)
}

pub mod utc_timestamp {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(D::Error::custom)
    }
}
