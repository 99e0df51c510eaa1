//! Integration tests for the ers-internals crate.
//!
//! - `test_record_json_round_trip`: a record with a nested cause survives JSON
//! - `test_record_json_is_sorted`: table keys are emitted in sorted order
//! - `test_record_without_cause_omits_field`: the `cause` field is optional
//! - `test_deserialize_skips_empty_values`: empty strings never enter a table
//! - `test_reserved_keys_cover_stack_frames`: stack frame keys are reserved

use ers_internals::{IssueRecord, Severity, ValueTable, keys};

fn table(entries: &[(&str, &str)]) -> ValueTable {
    entries.iter().copied().collect()
}

#[test]
fn test_record_json_round_trip() {
    let cause = IssueRecord::new(table(&[
        (keys::CLASS, "ers::Issue"),
        (keys::MESSAGE, "root"),
        (keys::SEVERITY, Severity::Warning.as_str()),
    ]));
    let record = IssueRecord {
        values: table(&[
            (keys::CLASS, "app::CannotConnect"),
            (keys::MESSAGE, "cannot connect"),
            (keys::CAUSE_TEXT, "root"),
            ("port", "8080"),
        ]),
        cause: Some(Box::new(cause)),
    };

    let json = serde_json::to_string(&record).unwrap();
    let parsed: IssueRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
    assert_eq!(parsed.depth(), 2);
    assert_eq!(parsed.values.value("port"), "8080");
    assert_eq!(
        Severity::parse(parsed.cause.unwrap().values.value(keys::SEVERITY)),
        Severity::Warning
    );
}

#[test]
fn test_record_json_is_sorted() {
    let record = IssueRecord::new(table(&[("B", "2"), ("C", "3"), ("A", "1")]));
    let json = serde_json::to_string(&record).unwrap();
    assert_eq!(json, r#"{"values":{"A":"1","B":"2","C":"3"}}"#);
}

#[test]
fn test_record_without_cause_omits_field() {
    let parsed: IssueRecord = serde_json::from_str(r#"{"values":{"MESSAGE":"x"}}"#).unwrap();
    assert!(parsed.cause.is_none());
    assert_eq!(parsed.values.value(keys::MESSAGE), "x");
}

#[test]
fn test_deserialize_skips_empty_values() {
    let parsed: ValueTable = serde_json::from_str(r#"{"A":"","B":"b"}"#).unwrap();
    assert!(!parsed.contains_key("A"));
    assert_eq!(parsed.len(), 1);
}

#[test]
fn test_reserved_keys_cover_stack_frames() {
    for ordinal in [0, 1, 17, 300] {
        assert!(keys::is_reserved(&keys::stack_frame(ordinal)));
    }
    assert!(!keys::is_reserved("SOURCE_STACK"));
}
