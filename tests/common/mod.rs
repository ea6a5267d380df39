#![allow(dead_code)]

use pgyaml::catalog::Catalog;
use pgyaml::diff::operations::{MigrationStep, SqlRenderer};
use pgyaml::diff::{cascade, diff_all, diff_order};
use pgyaml::schema_loader::mapping_to_catalog;

/// Build a linked catalog from inline YAML.
pub fn catalog(yaml: &str) -> Catalog {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).expect("test YAML parses");
    mapping_to_catalog(&value).expect("test YAML loads")
}

/// Run the full diff pipeline: pair, cascade, order.
pub fn plan(old: &Catalog, new: &Catalog) -> Vec<MigrationStep> {
    let steps = diff_all(old, new).expect("diff succeeds");
    let steps = cascade::expand(steps, old, new);
    diff_order(steps, old, new).expect("ordering succeeds")
}

/// Rendered SQL statements of an ordered plan.
pub fn sql_statements(steps: &[MigrationStep]) -> Vec<String> {
    steps
        .iter()
        .flat_map(|step| step.to_sql())
        .map(|rendered| rendered.sql)
        .collect()
}

/// Index of the first statement containing the needle.
pub fn position(statements: &[String], needle: &str) -> usize {
    statements
        .iter()
        .position(|s| s.contains(needle))
        .unwrap_or_else(|| panic!("no statement contains {:?} in {:#?}", needle, statements))
}
