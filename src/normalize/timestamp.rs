//! Best-effort timestamp inference. The load path favors a plausible
//! instant over rejecting a record, so this never fails: anything that
//! does not parse falls back to the provided instant, then to now.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Format an instant as the canonical stored form:
/// `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso_instant(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a full date-time string in any of the shapes historical records
/// carried: RFC 3339, ISO without offset, or space-separated.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Looser instant parse for stored `createdAt` strings that are kept
/// verbatim: a bare `YYYY-MM-DD` reads as midnight UTC.
pub(crate) fn parse_loose_instant(raw: &str) -> Option<DateTime<Utc>> {
    parse_instant(raw).or_else(|| midnight_utc(raw))
}

fn is_hh_mm(raw: &str) -> bool {
    raw.len() == 5
        && raw.bytes().enumerate().all(|(i, b)| match i {
            2 => b == b':',
            _ => b.is_ascii_digit(),
        })
}

fn midnight_utc(date: &str) -> Option<DateTime<Utc>> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&parsed.and_time(NaiveTime::MIN)))
}

fn hh_mm_on(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let parsed_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let parsed_time = NaiveTime::parse_from_str(time, "%H:%M").ok()?;
    Some(Utc.from_utc_datetime(&parsed_date.and_time(parsed_time)))
}

/// Infer an ISO instant from a raw timestamp value.
///
/// - epoch-millisecond numbers and parseable date-time strings convert
///   directly;
/// - a bare `HH:MM` is anchored to `context_date`, else the date portion of
///   `fallback_iso`, else today, at UTC;
/// - a bare `YYYY-MM-DD` anchors to midnight UTC;
/// - otherwise `fallback_iso` is returned verbatim when provided, else the
///   current instant.
pub fn normalize_timestamp(
    raw: Option<&Value>,
    context_date: Option<&str>,
    fallback_iso: Option<&str>,
) -> String {
    match raw {
        Some(Value::Number(n)) => {
            if let Some(ms) = n.as_i64()
                && let Some(dt) = Utc.timestamp_millis_opt(ms).single()
            {
                return iso_instant(dt);
            }
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                if let Some(dt) = parse_instant(trimmed) {
                    return iso_instant(dt);
                }
                if is_hh_mm(trimmed) {
                    let today = crate::utils::get_current_date_string();
                    let base = context_date
                        .filter(|d| !d.is_empty())
                        .or_else(|| fallback_iso.map(|f| &f[..f.len().min(10)]))
                        .unwrap_or(&today);
                    if let Some(dt) = hh_mm_on(base, trimmed) {
                        return iso_instant(dt);
                    }
                }
                if let Some(dt) = midnight_utc(trimmed) {
                    return iso_instant(dt);
                }
            }
        }
        _ => {}
    }
    match fallback_iso {
        Some(fallback) if !fallback.is_empty() => fallback.to_string(),
        _ => iso_instant(Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn iso_strings_convert_directly() {
        assert_eq!(
            normalize_timestamp(Some(&json!("2024-03-01T14:30:00.000Z")), None, None),
            "2024-03-01T14:30:00.000Z"
        );
        assert_eq!(
            normalize_timestamp(Some(&json!("2024-03-01T14:30:00+02:00")), None, None),
            "2024-03-01T12:30:00.000Z"
        );
    }

    #[test]
    fn epoch_millis_convert() {
        assert_eq!(
            normalize_timestamp(Some(&json!(1_709_303_400_000_i64)), None, None),
            "2024-03-01T14:30:00.000Z"
        );
    }

    #[test]
    fn bare_time_anchors_to_context_date() {
        assert_eq!(
            normalize_timestamp(Some(&json!("14:30")), Some("2024-03-01"), None),
            "2024-03-01T14:30:00.000Z"
        );
    }

    #[test]
    fn bare_time_falls_back_to_fallback_date() {
        assert_eq!(
            normalize_timestamp(Some(&json!("09:15")), None, Some("2024-02-02T00:00:00.000Z")),
            "2024-02-02T09:15:00.000Z"
        );
    }

    #[test]
    fn bare_date_anchors_to_midnight() {
        assert_eq!(
            normalize_timestamp(Some(&json!("2024-02-02")), None, None),
            "2024-02-02T00:00:00.000Z"
        );
    }

    #[test]
    fn unparseable_returns_fallback_verbatim() {
        assert_eq!(
            normalize_timestamp(Some(&json!("garbage")), None, Some("2024-01-01T00:00:00.000Z")),
            "2024-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn nothing_parseable_still_yields_an_instant() {
        let out = normalize_timestamp(None, None, None);
        assert!(parse_instant(&out).is_some());
    }

    #[test]
    fn idempotent_on_canonical_output() {
        let first = normalize_timestamp(Some(&json!("2024-03-01")), None, None);
        let second = normalize_timestamp(Some(&json!(first.clone())), None, None);
        assert_eq!(first, second);
    }
}
