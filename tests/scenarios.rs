//! End-to-end diff scenarios: empty-to-populated, cross-schema FKs,
//! column changes, implicit sequence drops, grants and renames.

mod common;

use common::{catalog, plan, position, sql_statements};
use pgyaml::catalog::Catalog;

#[test]
fn empty_to_one_table_with_primary_key() {
    let current = Catalog::empty();
    let desired = catalog(
        r#"
schema public:
  table t1:
    columns:
      - c1: { type: integer, not_null: true }
    primary_key:
      t1_pkey: { columns: [ c1 ] }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert_eq!(statements.len(), 2, "got: {:#?}", statements);
    assert_eq!(
        statements[0],
        "CREATE TABLE \"public\".\"t1\" (\n    \"c1\" integer NOT NULL\n);"
    );
    assert_eq!(
        statements[1],
        "ALTER TABLE \"public\".\"t1\" ADD CONSTRAINT \"t1_pkey\" PRIMARY KEY (\"c1\");"
    );
}

#[test]
fn cross_schema_foreign_key_ordering() {
    let current = Catalog::empty();
    let desired = catalog(
        r#"
schema public:
  table t1:
    columns:
      - c1: { type: integer, not_null: true }
      - c2: { type: integer }
    primary_key:
      t1_pkey: { columns: [ c1 ] }
    foreign_keys:
      t1_c2_fkey:
        columns: [ c2 ]
        references: { schema: s1, table: t2, columns: [ c21 ] }
        on_delete: restrict
        on_update: set null
schema s1:
  table t2:
    columns:
      - c21: { type: integer, not_null: true }
    primary_key:
      t2_pkey: { columns: [ c21 ] }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));

    let create_s1 = position(&statements, "CREATE SCHEMA \"s1\"");
    let create_t2 = position(&statements, "CREATE TABLE \"s1\".\"t2\"");
    let t2_pkey = position(&statements, "\"t2_pkey\"");
    let create_t1 = position(&statements, "CREATE TABLE \"public\".\"t1\"");
    let fkey = position(&statements, "\"t1_c2_fkey\"");

    assert!(create_s1 < create_t2, "schema before its table");
    assert!(create_t2 < t2_pkey, "table before its primary key");
    assert!(t2_pkey < fkey, "referenced key before the foreign key");
    assert!(create_t1 < fkey, "referencing table before the foreign key");
    assert!(
        statements[fkey].contains("ON DELETE RESTRICT"),
        "got: {}",
        statements[fkey]
    );
    assert!(statements[fkey].contains("ON UPDATE SET NULL"));
}

#[test]
fn add_column() {
    let current = catalog(
        r#"
schema public:
  table t:
    columns:
      - c1: { type: integer }
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t:
    columns:
      - c1: { type: integer }
      - c2: { type: text }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0],
        "ALTER TABLE \"public\".\"t\" ADD COLUMN \"c2\" text;"
    );
}

#[test]
fn drop_serial_column_leaves_sequence_implicit() {
    let current = catalog(
        r#"
schema public:
  table t:
    columns:
      - c1: { type: integer, not_null: true, default: "nextval('t_c1_seq'::regclass)" }
      - c2: { type: text }
    sequence t_c1_seq:
      data_type: integer
      start_value: 1
      min_value: 1
      max_value: 2147483647
      increment_by: 1
      owned_by: public.t.c1
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t:
    columns:
      - c2: { type: text }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert!(
        statements
            .iter()
            .any(|s| s.contains("DROP COLUMN \"c1\"")),
        "got: {:#?}",
        statements
    );
    assert!(
        !statements.iter().any(|s| s.contains("DROP SEQUENCE")),
        "owned sequence drops with its column: {:#?}",
        statements
    );
}

#[test]
fn new_grant_emits_exactly_one_grant() {
    let current = catalog(
        r#"
schema public:
  table t1:
    owner: postgres
    columns:
      - c1: { type: integer }
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t1:
    owner: postgres
    columns:
      - c1: { type: integer }
    privileges:
      - alice: [ select ]
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert_eq!(statements.len(), 1, "got: {:#?}", statements);
    assert_eq!(
        statements[0],
        "GRANT SELECT ON TABLE \"public\".\"t1\" TO \"alice\";"
    );
}

#[test]
fn rename_is_a_single_alter_not_drop_create() {
    let current = catalog(
        r#"
schema public:
  table t1:
    columns:
      - c1: { type: integer }
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t2:
    oldname: t1
    columns:
      - c1: { type: integer }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert_eq!(statements.len(), 1, "got: {:#?}", statements);
    assert_eq!(
        statements[0],
        "ALTER TABLE \"public\".\"t1\" RENAME TO \"t2\";"
    );
}

#[test]
fn rename_with_missing_oldname_degrades_to_create() {
    let current = Catalog::empty();
    let desired = catalog(
        r#"
schema public:
  table t2:
    oldname: gone
    columns:
      - c1: { type: integer }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert!(
        statements.iter().any(|s| s.contains("CREATE TABLE")),
        "got: {:#?}",
        statements
    );
    assert!(!statements.iter().any(|s| s.contains("RENAME")));
}

#[test]
fn oldname_of_wrong_kind_aborts() {
    let current = catalog(
        r#"
schema public:
  view t1:
    definition: SELECT 1
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t2:
    oldname: t1
    columns:
      - c1: { type: integer }
"#,
    );

    let err = pgyaml::diff::diff_all(&current, &desired).unwrap_err();
    assert!(err.to_string().contains("view"), "error was: {}", err);
}

#[test]
fn drop_index_before_type_change_recreate_after() {
    let current = catalog(
        r#"
schema public:
  table t:
    columns:
      - c: { type: integer }
    indexes:
      ix: { columns: [ c ] }
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t:
    columns:
      - c: { type: text }
    indexes:
      ix: { columns: [ c ] }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    let drop_ix = position(&statements, "DROP INDEX \"public\".\"ix\"");
    let alter = position(&statements, "ALTER COLUMN \"c\" TYPE text");
    let create_ix = position(&statements, "CREATE INDEX \"ix\"");

    assert!(drop_ix < alter, "index drops before the type change");
    assert!(alter < create_ix, "index recreates after the type change");
}

#[test]
fn drops_precede_non_drops() {
    let current = catalog(
        r#"
schema public:
  table doomed:
    columns:
      - c: { type: integer }
  table kept:
    columns:
      - c: { type: integer }
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table kept:
    columns:
      - c: { type: integer }
      - d: { type: text }
  table fresh:
    columns:
      - c: { type: integer }
"#,
    );

    let steps = plan(&current, &desired);
    let first_non_drop = steps
        .iter()
        .position(|s| !s.is_drop())
        .expect("plan has non-drop steps");
    assert!(
        steps[first_non_drop..].iter().all(|s| !s.is_drop()),
        "all drops come first"
    );
}

#[test]
fn column_reorder_with_type_change_still_alters() {
    let current = catalog(
        r#"
schema public:
  table t:
    columns:
      - a: { type: integer }
      - b: { type: integer }
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t:
    columns:
      - b: { type: text }
      - a: { type: integer }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert!(
        statements
            .iter()
            .any(|s| s.contains("ALTER COLUMN \"b\" TYPE text")),
        "attribute change must surface despite the reorder: {:#?}",
        statements
    );
}

#[test]
fn pure_column_reorder_emits_nothing() {
    let current = catalog(
        r#"
schema public:
  table t:
    columns:
      - a: { type: integer }
      - b: { type: integer }
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t:
    columns:
      - b: { type: integer }
      - a: { type: integer }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert!(statements.is_empty(), "got: {:#?}", statements);
}

#[test]
fn comment_change_emits_comment_on() {
    let current = catalog(
        r#"
schema public:
  table t:
    columns:
      - c: { type: integer }
    description: old words
"#,
    );
    let desired = catalog(
        r#"
schema public:
  table t:
    columns:
      - c: { type: integer }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0],
        "COMMENT ON TABLE \"public\".\"t\" IS NULL;"
    );
}

#[test]
fn extension_creates_before_other_objects() {
    let current = Catalog::empty();
    let desired = catalog(
        r#"
extension pgcrypto:
  schema: public
schema public:
  table t:
    columns:
      - c: { type: integer }
"#,
    );

    let statements = sql_statements(&plan(&current, &desired));
    let ext = position(&statements, "CREATE EXTENSION");
    let table = position(&statements, "CREATE TABLE");
    assert!(ext < table);
}
