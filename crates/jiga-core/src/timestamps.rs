//! Rewrites ISO-8601 date strings at known field paths into store timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use jiga_store::{Document, FieldValue};

use crate::error::ConversionError;

/// Where a date string may live inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPath {
    /// Top-level field that must be present.
    Field(&'static str),
    /// Field inside an optional map; skipped when the map or the field is
    /// absent, null or empty.
    Nested(&'static str, &'static str),
    /// Field on every element of an optional sequence. When the sequence is
    /// present each element must carry a valid date.
    EachElement(&'static str, &'static str),
}

pub const AGENT_TIMESTAMP_PATHS: &[TimestampPath] = &[
    TimestampPath::Field("createdAt"),
    TimestampPath::Field("updatedAt"),
    TimestampPath::Nested("marketplaceStatus", "publishedAt"),
    TimestampPath::EachElement("achievements", "earnedAt"),
];

pub const LISTING_TIMESTAMP_PATHS: &[TimestampPath] = &[
    TimestampPath::Field("createdAt"),
    TimestampPath::Field("updatedAt"),
];

/// Parse an ISO-8601 date or date-time. Inputs without an offset are UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err("not an ISO-8601 date".to_string())
}

/// Return `document` with every date at `paths` converted. Fields that are
/// not there stay not there.
pub fn normalize(
    record_id: &str,
    mut document: Document,
    paths: &[TimestampPath],
) -> Result<Document, ConversionError> {
    for path in paths {
        match *path {
            TimestampPath::Field(field) => {
                let converted = convert(record_id, field, document.get(field))?;
                document.insert(field.to_string(), converted);
            }
            TimestampPath::Nested(parent, field) => {
                let Some(inner) = document.get_mut(parent).and_then(FieldValue::as_map_mut) else {
                    continue;
                };
                if is_blank(inner.get(field)) {
                    continue;
                }
                let converted =
                    convert(record_id, &format!("{parent}.{field}"), inner.get(field))?;
                inner.insert(field.to_string(), converted);
            }
            TimestampPath::EachElement(parent, field) => {
                let elements = match document.get_mut(parent) {
                    None | Some(FieldValue::Null) => continue,
                    Some(FieldValue::Array(elements)) => elements,
                    Some(other) => {
                        return Err(ConversionError {
                            record_id: record_id.to_string(),
                            field: parent.to_string(),
                            value: other.kind().to_string(),
                            reason: "expected a sequence".to_string(),
                        })
                    }
                };
                for (index, element) in elements.iter_mut().enumerate() {
                    let path = format!("{parent}[{index}].{field}");
                    let Some(entry) = element.as_map_mut() else {
                        return Err(ConversionError {
                            record_id: record_id.to_string(),
                            field: path,
                            value: element.kind().to_string(),
                            reason: "expected a map".to_string(),
                        });
                    };
                    let converted = convert(record_id, &path, entry.get(field))?;
                    entry.insert(field.to_string(), converted);
                }
            }
        }
    }
    Ok(document)
}

fn is_blank(value: Option<&FieldValue>) -> bool {
    match value {
        None | Some(FieldValue::Null) => true,
        Some(FieldValue::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn convert(
    record_id: &str,
    field: &str,
    value: Option<&FieldValue>,
) -> Result<FieldValue, ConversionError> {
    let failure = |value: String, reason: String| ConversionError {
        record_id: record_id.to_string(),
        field: field.to_string(),
        value,
        reason,
    };

    match value {
        None => Err(failure("<missing>".to_string(), "field is required".to_string())),
        // Already converted, e.g. a record normalized twice.
        Some(FieldValue::Timestamp(ts)) => Ok(FieldValue::Timestamp(*ts)),
        Some(FieldValue::String(raw)) => parse_timestamp(raw)
            .map(FieldValue::Timestamp)
            .map_err(|reason| failure(raw.clone(), reason)),
        Some(other) => Err(failure(
            other.kind().to_string(),
            "expected a date string".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn accepts_common_iso_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T10:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05T12:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05T10:00:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-03-05T10:00:00.125Z").unwrap().timestamp_subsec_millis(),
            125
        );
        assert_eq!(
            parse_timestamp("2024-03-05").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(parse_timestamp("2024-02-30T00:00:00Z").is_err());
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
