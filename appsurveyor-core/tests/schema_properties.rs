//! Property tests for schema parsing and name classification.

#![allow(clippy::unwrap_used)]

use appsurveyor_core::{
    ScanConfig,
    schema::{SchemaParser, clean_identifier},
    sensitivity::is_test_named,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}"
}

fn column_name() -> impl Strategy<Value = String> {
    "c_[a-z0-9_]{0,10}"
}

fn block(name: &str, columns: &[String]) -> String {
    let body: String = columns.iter().map(|c| format!("  {} text\n", c)).collect();
    format!("Table {} {{\n{}}}\n\n", name, body)
}

/// Blocks that must not yield a table, wherever they appear.
fn malformed_block() -> impl Strategy<Value = String> {
    prop_oneof![
        identifier().prop_map(|name| format!("Table {} {{\n  orphan text\n\n", name)),
        Just("Table \"\" {\n  ignored text\n}\n\n".to_string()),
        Just("Table \"%\" {\n  ignored text\n}\n\n".to_string()),
        identifier().prop_map(|name| format!("Table {}-bar {{\n  stray text\n}}\n\n", name)),
    ]
}

proptest! {
    #[test]
    fn malformed_blocks_interleaved_are_skipped(
        names in prop::collection::btree_set(identifier(), 1..8),
        noise in prop::collection::vec((malformed_block(), 0usize..8), 1..8),
    ) {
        let mut blocks: Vec<String> = names
            .iter()
            .map(|n| block(n, &["value".to_string()]))
            .collect();
        for (fragment, position) in noise {
            let at = position.min(blocks.len());
            blocks.insert(at, fragment);
        }
        let description = blocks.concat();

        let tables = SchemaParser::new().parse(&description).unwrap();
        let parsed: BTreeSet<String> = tables.iter().map(|t| t.id.clone()).collect();
        prop_assert_eq!(tables.len(), names.len());
        prop_assert_eq!(parsed, names);
        for table in &tables {
            prop_assert_eq!(table.column_names(), vec!["value"]);
        }
    }

    #[test]
    fn well_formed_blocks_all_parse(
        names in prop::collection::btree_set(identifier(), 1..8),
        columns in prop::collection::vec(column_name(), 1..5),
    ) {
        let description: String = names.iter().map(|n| block(n, &columns)).collect();
        let tables = SchemaParser::new().parse(&description).unwrap();

        let parsed: BTreeSet<String> = tables.iter().map(|t| t.id.clone()).collect();
        prop_assert_eq!(parsed, names);
        for table in &tables {
            let unique: BTreeSet<&String> = columns.iter().collect();
            prop_assert_eq!(table.columns.len(), unique.len());
        }
    }

    #[test]
    fn artifact_prefix_collapses_duplicates(name in identifier()) {
        let description = format!(
            "{}{}",
            block(&name, &["a".to_string()]),
            block(&format!("%{}", name), &["b".to_string()]),
        );
        let tables = SchemaParser::new().parse(&description).unwrap();
        prop_assert_eq!(tables.len(), 1);
        prop_assert_eq!(&tables[0].id, &name);
        prop_assert_eq!(tables[0].column_names(), vec!["a", "b"]);
    }

    #[test]
    fn empty_named_blocks_are_skipped(good in prop::collection::btree_set(identifier(), 1..5)) {
        let mut description = String::from("Table \"\" {\n  ignored text\n}\n\n");
        for name in &good {
            description.push_str(&block(name, &["value".to_string()]));
        }
        let tables = SchemaParser::new().parse(&description).unwrap();
        prop_assert_eq!(tables.len(), good.len());
    }

    #[test]
    fn parser_never_panics(input in ".{0,400}") {
        let _ = SchemaParser::new().parse(&input);
    }

    #[test]
    fn clean_identifier_is_idempotent(raw in "%?[A-Za-z_][A-Za-z0-9_ ]{0,20}") {
        let once = clean_identifier(&raw);
        prop_assert_eq!(clean_identifier(&once), once.clone());
    }

    #[test]
    fn test_terms_match_whole_tokens_only(prefix in "[a-z]{1,6}") {
        let terms = ScanConfig::default().excluded_name_terms;
        let underscored = format!("{}_test", prefix);
        let glued = format!("{}test{}", prefix, prefix);
        prop_assert!(is_test_named(&underscored, &terms));
        prop_assert!(!is_test_named(&glued, &terms));
    }
}

#[test]
fn test_unclosed_block_keeps_neighbors() {
    let description = "Table open {\n  a text\n\nTable closed {\n  b text\n}\n";
    let tables = SchemaParser::new().parse(description).unwrap();
    let ids: Vec<&str> = tables.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["closed"]);
}
