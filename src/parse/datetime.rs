//! Timestamp normalization.
//!
//! Stored values arrive in several shapes:
//! - `20240918T230000Z` (UTC)
//! - `TZID=America/New_York:20240918T190000`, or the same value on a property
//!   carrying a `TZID` parameter (named zone)
//! - `20240918` (date only, local midnight)
//! - `20240918T190000` (floating, local)
//!
//! Everything becomes a `DateTime<Local>` in memory and is written back as
//! UTC with a trailing `Z`. The rewrite keeps the instant, not the text.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use icalendar::Property;

const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const FLOATING_FORMAT: &str = "%Y%m%dT%H%M%S";
const DATE_FORMAT: &str = "%Y%m%d";

/// Parse a raw timestamp string in any of the supported shapes.
/// Unparseable input is logged and yields `None`.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("TZID=") {
        Some(rest) => match rest.rsplit_once(':') {
            Some((zone, value)) => parse_in_zone(zone, value),
            None => None,
        },
        None => parse_value(raw),
    };
    if parsed.is_none() {
        warn!(value = raw, "unparseable timestamp");
    }
    parsed
}

/// Parse a date-time property, honouring its `TZID` parameter
pub fn parse_property(prop: &Property) -> Option<DateTime<Local>> {
    match prop.params().get("TZID") {
        Some(zone) => {
            let parsed = parse_in_zone(zone.value(), prop.value().trim());
            if parsed.is_none() {
                warn!(
                    property = prop.key(),
                    zone = zone.value(),
                    value = prop.value(),
                    "unparseable timestamp"
                );
            }
            parsed
        }
        None => parse_datetime(prop.value()),
    }
}

/// Storage form: always UTC with a trailing `Z`
pub fn format_utc(dt: &DateTime<Local>) -> String {
    dt.with_timezone(&Utc).format(UTC_FORMAT).to_string()
}

fn parse_value(value: &str) -> Option<DateTime<Local>> {
    if value.ends_with(['Z', 'z']) {
        let naive = NaiveDateTime::parse_from_str(&value.to_ascii_uppercase(), UTC_FORMAT).ok()?;
        return Some(Utc.from_utc_datetime(&naive).with_timezone(&Local));
    }
    resolve_local(&Local, parse_naive(value)?)
}

fn parse_in_zone(zone: &str, value: &str) -> Option<DateTime<Local>> {
    let zone = zone.trim().trim_matches('"');
    if value.ends_with(['Z', 'z']) {
        return parse_value(value);
    }
    let naive = parse_naive(value)?;
    match zone.parse::<Tz>() {
        Ok(tz) => resolve_local(&tz, naive),
        Err(_) => {
            warn!(zone, "unknown time zone, reading value as local time");
            resolve_local(&Local, naive)
        }
    }
}

/// Floating date-time or bare date (midnight)
fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, FLOATING_FORMAT) {
        return Some(naive);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Interpret `naive` as wall-clock time in `tz` and convert to local.
/// Ambiguous times take the earlier instant; times in a DST gap fail.
fn resolve_local<T: TimeZone>(tz: &T, naive: NaiveDateTime) -> Option<DateTime<Local>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Local))
}
