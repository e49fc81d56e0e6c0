use chrono::{DateTime, SecondsFormat, Utc};

use super::validate::Record;

/// `2026-10-18T09:15:02.123Z`
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Spreadsheet row for a validated record: timestamp, then one cell per
/// schema field in schema order.
pub fn build(record: &Record, at: DateTime<Utc>) -> Vec<String> {
    std::iter::once(timestamp(at))
        .chain(record.values().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::schema::{Schema, ValidationMode};
    use crate::submission::validate::validate;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn timestamp_is_first_and_fields_follow_schema_order() {
        let record = validate(
            &json!({"message": "Hello", "email": "ann@example.com", "name": "Ann"}),
            &Schema::contact(),
            ValidationMode::Strict,
        )
        .unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 15, 2).unwrap();

        let row = build(&record, at);
        assert_eq!(
            row,
            ["2026-10-18T09:15:02.000Z", "Ann", "ann@example.com", "Hello"]
        );
    }

    #[test]
    fn timestamp_round_trips_as_rfc3339() {
        let now = Utc::now();
        let parsed = DateTime::parse_from_rfc3339(&timestamp(now)).unwrap();
        assert_eq!(parsed.timestamp_millis(), now.timestamp_millis());
    }
}
