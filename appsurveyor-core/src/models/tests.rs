//! Tests for the scan data models.

use super::*;

#[test]
fn test_label_ordering() {
    assert!(SensitivityLabel::High > SensitivityLabel::Moderate);
    assert!(SensitivityLabel::Moderate > SensitivityLabel::Low);
    assert_eq!(SensitivityLabel::default(), SensitivityLabel::Low);
}

#[test]
fn test_label_parse_synonyms() {
    assert_eq!(SensitivityLabel::parse("HIGH"), Some(SensitivityLabel::High));
    assert_eq!(SensitivityLabel::parse(" medium "), Some(SensitivityLabel::Moderate));
    assert_eq!(SensitivityLabel::parse("none"), Some(SensitivityLabel::Low));
    assert_eq!(SensitivityLabel::parse("spicy"), None);
    assert!("spicy".parse::<SensitivityLabel>().is_err());
}

#[test]
fn test_label_serde_lowercase() {
    let json = serde_json::to_string(&SensitivityLabel::Moderate).expect("serialize");
    assert_eq!(json, "\"moderate\"");
}

#[test]
fn test_display_name_for() {
    assert_eq!(display_name_for("user"), "User");
    assert_eq!(display_name_for("order_item"), "Order item");
    assert_eq!(display_name_for(""), "");
}

#[test]
fn test_record_count_display() {
    assert_eq!(RecordCount::Exact(399).to_string(), "399");
    assert_eq!(RecordCount::AtLeast(400).to_string(), "400+");
    assert_eq!(RecordCount::Unknown.to_string(), "?");
    assert!(RecordCount::Exact(3).is_exact());
    assert!(!RecordCount::AtLeast(400).is_exact());
    assert!(!RecordCount::Exact(0).has_records());
    assert!(!RecordCount::Unknown.has_records());
}

#[test]
fn test_table_count_real_data() {
    let with_data = TableCount {
        count: RecordCount::Exact(3),
        metadata_only: false,
        status: EnvelopeStatus::Success,
    };
    assert!(with_data.has_real_data());

    let metadata_only = TableCount {
        metadata_only: true,
        ..with_data
    };
    assert!(!metadata_only.has_real_data());
    assert_eq!(metadata_only.display_count(), RecordCount::Exact(0));

    let error_status = TableCount {
        count: RecordCount::Exact(0),
        metadata_only: false,
        status: EnvelopeStatus::ErrorStatus { status: 404 },
    };
    assert!(!error_status.has_real_data());

    assert!(!TableCount::unavailable().has_real_data());
}

#[test]
fn test_table_columns_dedup_and_reserved() {
    let mut table = Table::new("users").with_columns(vec![
        Column::new("email", "text"),
        Column::new("email", "text"),
        Column::new("_id", "text"),
    ]);
    assert_eq!(table.column_names(), vec!["email".to_string()]);

    let added = table.add_discovered_columns(["email", "phone", "_version"]);
    assert_eq!(added, 1);
    assert_eq!(table.column_names(), vec!["email".to_string(), "phone".to_string()]);
    assert!(table.columns[1].discovered);
}

#[test]
fn test_sort_for_display() {
    let mut tables = vec![Table::new("zebra"), Table::new("apple"), Table::new("Mango")];
    sort_for_display(&mut tables);
    let ids: Vec<&str> = tables.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["apple", "Mango", "zebra"]);
}

#[test]
fn test_phase_transitions() {
    use ScanPhase::*;
    assert!(Idle.can_transition_to(SchemaLoading));
    assert!(SchemaLoading.can_transition_to(TableListReady));
    assert!(TableListReady.can_transition_to(SensitivityScanning));
    assert!(SensitivityScanning.can_transition_to(Complete));
    assert!(SchemaLoading.can_transition_to(Failed));
    assert!(!Idle.can_transition_to(Complete));
    assert!(!Complete.can_transition_to(Failed));
    assert!(!Failed.can_transition_to(SchemaLoading));
    assert!(Complete.is_terminal());
}

#[test]
fn test_table_serde_roundtrip() {
    let mut table = Table::new("orders").with_columns(vec![Column::new("total", "number")]);
    table.count = Some(TableCount {
        count: RecordCount::AtLeast(400),
        metadata_only: false,
        status: EnvelopeStatus::Success,
    });

    let json = serde_json::to_value(&table).expect("serialize");
    assert_eq!(json["columns"][0]["type"], "number");
    assert_eq!(json["count"]["count"]["kind"], "at_least");

    let back: Table = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, table);
}
