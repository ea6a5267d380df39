//! Round-trip, determinism and idempotence laws.

mod common;

use common::{catalog, plan};
use pgyaml::schema_generator::{EmitOptions, catalog_to_mapping, mapping_to_string};
use pgyaml::schema_loader::mapping_to_catalog;

const SAMPLE: &str = r#"
schema public:
  owner: postgres
  table films:
    owner: postgres
    columns:
      - id: { type: integer, not_null: true }
      - title: { type: text, not_null: true }
      - released: { type: date }
    primary_key:
      films_pkey: { columns: [ id ] }
    check_constraints:
      films_released_check: { columns: [ released ], expression: "(released > '1900-01-01'::date)" }
    indexes:
      films_title_ix: { columns: [ title ] }
    description: film catalog
  view recent_films:
    definition: |-
      SELECT films.title
         FROM films
        WHERE films.released > '2000-01-01'::date
    depends_on: [ table films ]
  function film_count():
    language: sql
    returns: bigint
    source: SELECT count(*) FROM films
schema s1:
  table t2:
    columns:
      - c21: { type: integer, not_null: true }
    primary_key:
      t2_pkey: { columns: [ c21 ] }
"#;

#[test]
fn emit_is_deterministic() {
    let model = catalog(SAMPLE);
    let options = EmitOptions::default();
    let first = mapping_to_string(&catalog_to_mapping(&model, &options)).unwrap();
    let second = mapping_to_string(&catalog_to_mapping(&model, &options)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn parse_emit_round_trip_is_stable() {
    let model = catalog(SAMPLE);
    let options = EmitOptions::default();

    let emitted = catalog_to_mapping(&model, &options);
    let yaml = mapping_to_string(&emitted).unwrap();

    let reparsed = mapping_to_catalog(&serde_yaml::from_str(&yaml).unwrap()).unwrap();
    let re_emitted = mapping_to_string(&catalog_to_mapping(&reparsed, &options)).unwrap();

    assert_eq!(yaml, re_emitted, "emit(parse(emit(C))) == emit(C)");
}

#[test]
fn round_trip_produces_empty_plan() {
    let model = catalog(SAMPLE);
    let options = EmitOptions::default();

    let yaml = mapping_to_string(&catalog_to_mapping(&model, &options)).unwrap();
    let reparsed = mapping_to_catalog(&serde_yaml::from_str(&yaml).unwrap()).unwrap();

    let steps = plan(&model, &reparsed);
    assert!(
        steps.is_empty(),
        "diff(C, parse(emit(C))) must be empty, got {} steps",
        steps.len()
    );
}

#[test]
fn self_diff_is_empty() {
    let model = catalog(SAMPLE);
    let steps = plan(&model, &model);
    assert!(steps.is_empty(), "diff(D, D) must be empty");
}

#[test]
fn oldname_is_never_persisted() {
    let model = catalog(
        r#"
schema public:
  table t2:
    oldname: t1
    columns:
      - c1: { type: integer }
"#,
    );
    let yaml = mapping_to_string(&catalog_to_mapping(&model, &EmitOptions::default())).unwrap();
    assert!(
        !yaml.contains("oldname"),
        "the rename directive is one-shot: {}",
        yaml
    );
}

#[test]
fn no_owner_and_no_privileges_modes() {
    let model = catalog(
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

    let bare = mapping_to_string(&catalog_to_mapping(
        &model,
        &EmitOptions {
            include_owner: false,
            include_privileges: false,
        },
    ))
    .unwrap();
    assert!(!bare.contains("owner"));
    assert!(!bare.contains("privileges"));

    let full = mapping_to_string(&catalog_to_mapping(&model, &EmitOptions::default())).unwrap();
    assert!(full.contains("owner: postgres"));
    assert!(full.contains("alice"));
}

#[test]
fn multiline_source_survives_round_trip() {
    let model = catalog(
        r#"
schema public:
  function add_one(integer):
    language: sql
    params: n integer
    returns: integer
    source: "SELECT n\n   + 1"
"#,
    );
    let options = EmitOptions::default();
    let yaml = mapping_to_string(&catalog_to_mapping(&model, &options)).unwrap();
    let reparsed = mapping_to_catalog(&serde_yaml::from_str(&yaml).unwrap()).unwrap();
    assert_eq!(reparsed.functions[0].source, "SELECT n\n   + 1");
}
