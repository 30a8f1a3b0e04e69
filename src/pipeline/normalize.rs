//! Split a [`RawRecord`] into the two tables shown in the report.
//!
//! A value is the subject table when it is a nested group holding at least
//! one text or number — `{"Math": 90}` qualifies, `{"Line 1": {...}}` does
//! not. Only one subject table is kept: when several groups qualify, the last
//! one in reply order wins and the earlier ones are dropped with a warning.

use crate::record::{NormalizedRecord, RawRecord, RawValue};
use indexmap::IndexMap;
use tracing::warn;

/// Prefix that flattened subject keys carry (`Subjects.Math`).
pub const SUBJECT_KEY_PREFIX: &str = "Subjects.";

/// Split `record` into main fields and an optional subject/score table.
pub fn normalize(record: &RawRecord) -> NormalizedRecord {
    let mut main = Vec::with_capacity(record.len());
    let mut subjects: Option<(&str, Vec<(String, RawValue)>)> = None;

    for (key, value) in record.iter() {
        match value.as_group().filter(|group| is_subject_group(group)) {
            Some(group) => {
                if let Some((dropped, _)) = &subjects {
                    warn!(
                        "Multiple subject tables in reply; '{}' replaces '{}'",
                        key.trim(),
                        dropped
                    );
                }
                let rows = group
                    .iter()
                    .map(|(subject, score)| (clean_field_name(subject), score.clone()))
                    .collect();
                subjects = Some((key.trim(), rows));
            }
            None => main.push((clean_field_name(key), value.clone())),
        }
    }

    NormalizedRecord {
        main,
        subjects: subjects.map(|(_, rows)| rows),
    }
}

fn is_subject_group(group: &IndexMap<String, RawValue>) -> bool {
    group.values().any(RawValue::is_primitive)
}

/// Trim whitespace and drop the flattened subject prefix.
pub fn clean_field_name(name: &str) -> String {
    let trimmed = name.trim();
    trimmed
        .strip_prefix(SUBJECT_KEY_PREFIX)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RawRecord {
        serde_json::from_str(json).expect("valid record")
    }

    #[test]
    fn splits_subject_table() {
        let n = normalize(&parse(r#"{"Full Name": "A", "Scores": {"Math": 90, "Sci": 85}}"#));
        assert_eq!(n.main, vec![("Full Name".to_string(), RawValue::from("A"))]);
        assert_eq!(
            n.subjects,
            Some(vec![
                ("Math".to_string(), RawValue::from(90i64)),
                ("Sci".to_string(), RawValue::from(85i64)),
            ])
        );
    }

    #[test]
    fn flat_record_has_no_subjects() {
        let n = normalize(&parse(
            r#"{"Seat Number": "B1", "Year of Passing": 2019, "Percentage": "91%"}"#,
        ));
        assert_eq!(n.subjects, None);
        let fields: Vec<&str> = n.main.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["Seat Number", "Year of Passing", "Percentage"]);
    }

    #[test]
    fn last_subject_group_wins() {
        let n = normalize(&parse(
            r#"{"Theory": {"Math": 70}, "Name": "A", "Practical": {"Math": 20, "Lab": 18}}"#,
        ));
        let subjects = n.subjects.expect("subjects");
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[1], ("Lab".to_string(), RawValue::from(18i64)));
        assert_eq!(n.main.len(), 1, "earlier group is dropped, not moved to main");
    }

    #[test]
    fn nested_group_without_primitives_stays_in_main() {
        let n = normalize(&parse(
            r#"{"Address": {"Home": {"City": "Pune"}}, "Subjects": {"Math": 90}}"#,
        ));
        assert_eq!(n.main.len(), 1);
        assert_eq!(n.main[0].0, "Address");
        assert!(matches!(n.main[0].1, RawValue::Group(_)));
        assert_eq!(n.subjects.map(|s| s.len()), Some(1));
    }

    #[test]
    fn field_names_are_cleaned() {
        let n = normalize(&parse(
            r#"{"  Full Name ": "A", "Subjects.Math": 90, "Subjects": {" Subjects.Sci ": 85}}"#,
        ));
        let fields: Vec<&str> = n.main.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["Full Name", "Math"]);
        assert_eq!(n.subjects.expect("subjects")[0].0, "Sci");
    }

    #[test]
    fn empty_group_is_not_a_subject_table() {
        let n = normalize(&parse(r#"{"Subjects": {}}"#));
        assert_eq!(n.subjects, None);
        assert_eq!(n.main.len(), 1);
    }

    #[test]
    fn clean_field_name_cases() {
        assert_eq!(clean_field_name("Subjects.English "), "English");
        assert_eq!(clean_field_name("  Gender"), "Gender");
        assert_eq!(clean_field_name("Subjects"), "Subjects");
    }
}
