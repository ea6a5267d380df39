//! Multiple-files layout: one file per object, index-driven stale-file
//! cleanup, directory round-trip.

mod common;

use common::{catalog, plan};
use pgyaml::schema_generator::{EmitOptions, catalog_to_mapping, write_multiple};
use pgyaml::schema_loader::{load_repo_value, mapping_to_catalog};

const SAMPLE: &str = r#"
extension pgcrypto:
  schema: public
schema public:
  table films:
    columns:
      - id: { type: integer, not_null: true }
      - title: { type: text }
    primary_key:
      films_pkey: { columns: [ id ] }
  function film_count():
    language: sql
    returns: bigint
    source: SELECT count(*) FROM films
  function film_count(integer):
    language: sql
    params: year integer
    returns: bigint
    source: SELECT count(*) FROM films
schema s1:
  table t2:
    columns:
      - c21: { type: integer }
"#;

#[test]
fn writes_expected_layout() {
    let model = catalog(SAMPLE);
    let mapping = catalog_to_mapping(&model, &EmitOptions::default());
    let root = tempfile::tempdir().unwrap();

    write_multiple(&mapping, root.path(), "moviesdb", 32).unwrap();

    assert!(root.path().join("database.moviesdb.yaml").is_file());
    assert!(root.path().join("extension.pgcrypto.yaml").is_file());
    assert!(root.path().join("schema.public.yaml").is_file());
    assert!(root.path().join("schema.public").is_dir());
    assert!(root.path().join("schema.public/table.films.yaml").is_file());
    assert!(root.path().join("schema.s1.yaml").is_file());
    assert!(root.path().join("schema.s1/table.t2.yaml").is_file());
}

#[test]
fn function_overloads_share_one_file() {
    let model = catalog(SAMPLE);
    let mapping = catalog_to_mapping(&model, &EmitOptions::default());
    let root = tempfile::tempdir().unwrap();

    write_multiple(&mapping, root.path(), "moviesdb", 32).unwrap();

    let file = root.path().join("schema.public/function.film_count.yaml");
    assert!(file.is_file());
    let content = std::fs::read_to_string(&file).unwrap();
    assert!(content.contains("function film_count()"));
    assert!(content.contains("function film_count(integer)"));
}

#[test]
fn stale_files_are_deleted_on_rewrite() {
    let model = catalog(SAMPLE);
    let mapping = catalog_to_mapping(&model, &EmitOptions::default());
    let root = tempfile::tempdir().unwrap();

    write_multiple(&mapping, root.path(), "moviesdb", 32).unwrap();
    let films = root.path().join("schema.public/table.films.yaml");
    assert!(films.is_file());

    let smaller = catalog(
        r#"
schema public:
  table other:
    columns:
      - c: { type: integer }
"#,
    );
    let mapping = catalog_to_mapping(&smaller, &EmitOptions::default());
    write_multiple(&mapping, root.path(), "moviesdb", 32).unwrap();

    assert!(!films.exists(), "dropped object's file is removed");
    assert!(root.path().join("schema.public/table.other.yaml").is_file());
}

#[test]
fn directory_round_trip_produces_empty_plan() {
    let model = catalog(SAMPLE);
    let mapping = catalog_to_mapping(&model, &EmitOptions::default());
    let root = tempfile::tempdir().unwrap();

    write_multiple(&mapping, root.path(), "moviesdb", 32).unwrap();

    let loaded = load_repo_value(root.path(), "moviesdb").unwrap();
    let reparsed = mapping_to_catalog(&loaded).unwrap();

    let steps = plan(&model, &reparsed);
    assert!(
        steps.is_empty(),
        "multi-file round trip must diff clean, got {} steps",
        steps.len()
    );
}

#[test]
fn filename_truncation_respects_limit() {
    let model = catalog(
        r#"
schema public:
  table a_table_with_an_exceedingly_long_identifier_name:
    columns:
      - c: { type: integer }
"#,
    );
    let mapping = catalog_to_mapping(&model, &EmitOptions::default());
    let root = tempfile::tempdir().unwrap();

    write_multiple(&mapping, root.path(), "db", 16).unwrap();

    let expected = root.path().join("schema.public/table.a_table_with_an_.yaml");
    assert!(expected.is_file(), "truncated to 16 characters");
}
