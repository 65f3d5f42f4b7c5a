use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::note::Note;
use super::property::{CREATED, MODIFIED, NoteProperty, PropertyKind};

const DATE_TIME_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

const OFFSET_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M %z"];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parses a decimal number or a numeric string. Non-finite results are rejected.
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Permissive date parsing into epoch milliseconds. Values without an offset are read as UTC.
pub fn parse_date_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }

    for format in OFFSET_DATE_TIME_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Some(parsed.timestamp_millis());
        }
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return parsed
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc().timestamp_millis());
        }
    }

    None
}

fn parse_date_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|millis| millis.is_finite()),
        Value::String(text) => parse_date_millis(text).map(|millis| millis as f64),
        _ => None,
    }
}

/// Maps a note to its position on the timeline axis.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueSelector {
    Created,
    Modified,
    Number(String),
    Date(String),
}

impl ValueSelector {
    pub fn for_property(property: &NoteProperty) -> Self {
        match property.name.as_str() {
            CREATED => return Self::Created,
            MODIFIED => return Self::Modified,
            _ => {}
        }

        match property.kind {
            PropertyKind::Number => Self::Number(property.name.clone()),
            PropertyKind::Date | PropertyKind::DateTime => Self::Date(property.name.clone()),
            other => {
                tracing::warn!(
                    property = %property.name,
                    kind = other.label(),
                    "unsupported property type for timeline values; treating as number"
                );
                Self::Number(property.name.clone())
            }
        }
    }

    pub fn property_name(&self) -> &str {
        match self {
            Self::Created => CREATED,
            Self::Modified => MODIFIED,
            Self::Number(name) | Self::Date(name) => name,
        }
    }

    pub fn is_temporal(&self) -> bool {
        !matches!(self, Self::Number(_))
    }

    pub fn select(&self, note: &Note) -> Option<f64> {
        match self {
            Self::Created => Some(note.created as f64),
            Self::Modified => Some(note.modified as f64),
            Self::Number(name) => note.property(name).and_then(parse_number),
            Self::Date(name) => note.property(name).and_then(parse_date_value),
        }
    }

    pub fn select_or_zero(&self, note: &Note) -> f64 {
        self.select(note).unwrap_or(0.0)
    }

    /// Converts an axis value back into a frontmatter value for this selector.
    pub fn to_property_value(&self, value: f64, whole_numbers: bool) -> Option<Value> {
        match self {
            Self::Created | Self::Modified => None,
            Self::Number(_) => {
                if whole_numbers {
                    Some(Value::from(value.round() as i64))
                } else {
                    serde_json::Number::from_f64(value).map(Value::Number)
                }
            }
            Self::Date(_) => {
                DateTime::from_timestamp_millis(value.round() as i64).map(|date| {
                    Value::String(date.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string())
                })
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SortKey(f64);

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Stable ascending sort by selected value; notes without a value sort as 0.
pub fn sort_by_selected_value<T>(
    items: &mut [T],
    selector: &ValueSelector,
    note_of: impl Fn(&T) -> &Note,
) {
    items.sort_by_cached_key(|item| SortKey(selector.select_or_zero(note_of(item))));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ValueSelector, parse_date_millis, parse_number, sort_by_selected_value};
    use crate::notes::note::test_note;
    use crate::notes::property::{NoteProperty, PropertyKind};

    #[test]
    fn parses_numbers_and_numeric_strings() {
        assert_eq!(parse_number(&json!(4)), Some(4.0));
        assert_eq!(parse_number(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(parse_number(&json!("two")), None);
        assert_eq!(parse_number(&json!("NaN")), None);
        assert_eq!(parse_number(&json!(true)), None);
    }

    #[test]
    fn parses_common_date_formats() {
        assert_eq!(parse_date_millis("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_date_millis("1970/01/02"), Some(86_400_000));
        assert_eq!(parse_date_millis("02.01.1970"), Some(86_400_000));
        assert_eq!(parse_date_millis("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(parse_date_millis("1970-01-01T01:00:00+01:00"), Some(0));
        assert_eq!(parse_date_millis("1970-01-01 00:01"), Some(60_000));
        assert_eq!(parse_date_millis("January 2, 1970"), Some(86_400_000));
        assert_eq!(parse_date_millis("not a date"), None);
        assert_eq!(parse_date_millis(""), None);
    }

    #[test]
    fn builtins_read_timestamps() {
        let note = test_note("a.md", json!({}));
        assert_eq!(ValueSelector::Created.select(&note), Some(1_000.0));
        assert_eq!(ValueSelector::Modified.select(&note), Some(2_000.0));
    }

    #[test]
    fn missing_or_garbage_properties_yield_none_or_zero() {
        let note = test_note("a.md", json!({ "weight": "heavy" }));
        let weight = ValueSelector::Number("weight".into());
        let missing = ValueSelector::Date("due".into());
        assert_eq!(weight.select(&note), None);
        assert_eq!(weight.select_or_zero(&note), 0.0);
        assert_eq!(missing.select(&note), None);
    }

    #[test]
    fn unknown_kinds_degrade_to_number() {
        let selector =
            ValueSelector::for_property(&NoteProperty::new("tags", PropertyKind::List));
        assert_eq!(selector, ValueSelector::Number("tags".into()));
        assert_eq!(
            ValueSelector::for_property(&NoteProperty::created()),
            ValueSelector::Created
        );
        assert_eq!(
            ValueSelector::for_property(&NoteProperty::new("due", PropertyKind::Date)),
            ValueSelector::Date("due".into())
        );
    }

    #[test]
    fn sort_is_stable_and_treats_missing_as_zero() {
        let mut notes = vec![
            test_note("c.md", json!({ "rank": 3 })),
            test_note("none.md", json!({})),
            test_note("a.md", json!({ "rank": 1 })),
            test_note("zero.md", json!({ "rank": 0 })),
            test_note("b.md", json!({ "rank": "1" })),
        ];
        sort_by_selected_value(&mut notes, &ValueSelector::Number("rank".into()), |note| note);
        let order = notes.iter().map(|note| note.path()).collect::<Vec<_>>();
        assert_eq!(order, vec!["none.md", "zero.md", "a.md", "b.md", "c.md"]);
    }

    #[test]
    fn converts_values_back_to_frontmatter() {
        let number = ValueSelector::Number("rank".into());
        assert_eq!(number.to_property_value(2.6, true), Some(json!(3)));
        assert_eq!(number.to_property_value(2.5, false), Some(json!(2.5)));
        let date = ValueSelector::Date("due".into());
        assert_eq!(
            date.to_property_value(86_400_000.0, false),
            Some(json!("1970-01-02T00:00:00"))
        );
        assert_eq!(ValueSelector::Created.to_property_value(1.0, false), None);
    }
}
