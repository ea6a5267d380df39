//! Audit-trail augmentation.
//!
//! Rewrites a desired model by injecting predefined audit columns and, for
//! templates that track modification, a row trigger plus its plpgsql
//! function. Prototypes are parameterized by single-pass, left-to-right
//! `{{placeholder}}` substitution. The output is a regular model; the
//! standard diff/emit path runs unchanged afterwards.

use anyhow::{Result, anyhow, bail};
use once_cell::sync::Lazy;
use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::catalog::function::{Function, FunctionKind};
use crate::catalog::id::DbObjectId;
use crate::catalog::link;
use crate::catalog::table::Column;
use crate::catalog::triggers::Trigger;
use crate::schema_generator::split_object_key;

#[derive(Debug, Clone)]
struct ColumnPrototype {
    name: &'static str,
    data_type: &'static str,
    not_null: bool,
    default: Option<&'static str>,
}

#[derive(Debug, Clone)]
struct AuditTemplate {
    columns: Vec<ColumnPrototype>,
    /// Present when the template maintains modification data via a trigger.
    trigger: Option<TriggerPrototype>,
}

#[derive(Debug, Clone)]
struct TriggerPrototype {
    name: &'static str,
    function_name: &'static str,
    function_source: &'static str,
}

const MODIFIED_TRIGGER_SOURCE: &str = "BEGIN
    NEW.{{modified_by_user}} = SESSION_USER;
    NEW.{{modified_timestamp}} = CURRENT_TIMESTAMP;
    RETURN NEW;
END";

const MODIFIED_ONLY_TRIGGER_SOURCE: &str = "BEGIN
    NEW.{{modified_timestamp}} = CURRENT_TIMESTAMP;
    RETURN NEW;
END";

static AUDIT_TEMPLATES: Lazy<BTreeMap<&'static str, AuditTemplate>> = Lazy::new(|| {
    let mut templates = BTreeMap::new();

    templates.insert(
        "created_date_only",
        AuditTemplate {
            columns: vec![ColumnPrototype {
                name: "created_date",
                data_type: "date",
                not_null: true,
                default: Some("CURRENT_DATE"),
            }],
            trigger: None,
        },
    );

    templates.insert(
        "modified_only",
        AuditTemplate {
            columns: vec![ColumnPrototype {
                name: "modified_timestamp",
                data_type: "timestamp with time zone",
                not_null: true,
                default: Some("CURRENT_TIMESTAMP"),
            }],
            trigger: Some(TriggerPrototype {
                name: "{{table_name}}_20_aud_dflt",
                function_name: "{{table_name}}_20_aud_dflt",
                function_source: MODIFIED_ONLY_TRIGGER_SOURCE,
            }),
        },
    );

    templates.insert(
        "default",
        AuditTemplate {
            columns: vec![
                ColumnPrototype {
                    name: "modified_by_user",
                    data_type: "character varying(63)",
                    not_null: true,
                    default: Some("SESSION_USER"),
                },
                ColumnPrototype {
                    name: "modified_timestamp",
                    data_type: "timestamp with time zone",
                    not_null: true,
                    default: Some("CURRENT_TIMESTAMP"),
                },
            ],
            trigger: Some(TriggerPrototype {
                name: "{{table_name}}_20_aud_dflt",
                function_name: "{{table_name}}_20_aud_dflt",
                function_source: MODIFIED_TRIGGER_SOURCE,
            }),
        },
    );

    templates.insert(
        "full",
        AuditTemplate {
            columns: vec![
                ColumnPrototype {
                    name: "created_by_user",
                    data_type: "character varying(63)",
                    not_null: true,
                    default: Some("SESSION_USER"),
                },
                ColumnPrototype {
                    name: "created_timestamp",
                    data_type: "timestamp with time zone",
                    not_null: true,
                    default: Some("CURRENT_TIMESTAMP"),
                },
                ColumnPrototype {
                    name: "modified_by_user",
                    data_type: "character varying(63)",
                    not_null: true,
                    default: Some("SESSION_USER"),
                },
                ColumnPrototype {
                    name: "modified_timestamp",
                    data_type: "timestamp with time zone",
                    not_null: true,
                    default: Some("CURRENT_TIMESTAMP"),
                },
            ],
            trigger: Some(TriggerPrototype {
                name: "{{table_name}}_20_aud_dflt",
                function_name: "{{table_name}}_20_aud_dflt",
                function_source: MODIFIED_TRIGGER_SOURCE,
            }),
        },
    );

    templates
});

/// Single-pass, left-to-right substitution of `{{placeholder}}` tokens.
/// Replacement output is never re-scanned.
pub fn substitute(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Apply an augmentation spec to a desired model, in place.
///
/// The spec is a mapping of `schema <name>` → `table <name>` →
/// `{ audit_columns: <template> }`.
pub fn apply(catalog: &mut Catalog, spec: &Value) -> Result<()> {
    let top = spec
        .as_mapping()
        .ok_or_else(|| anyhow!("augmentation spec: top-level mapping expected"))?;

    for (key, schema_value) in top {
        let key_str = key
            .as_str()
            .ok_or_else(|| anyhow!("augmentation spec: non-string key"))?;
        let (kind, schema_name) = split_object_key(key_str);
        if kind != "schema" {
            bail!("augmentation spec: unknown key {:?}", key_str);
        }

        let schema_map = schema_value
            .as_mapping()
            .ok_or_else(|| anyhow!("augmentation spec: schema {}: mapping expected", schema_name))?;
        for (table_key, table_value) in schema_map {
            let table_key_str = table_key
                .as_str()
                .ok_or_else(|| anyhow!("augmentation spec: non-string key under schema {}", schema_name))?;
            let (table_kind, table_name) = split_object_key(table_key_str);
            if table_kind != "table" {
                bail!(
                    "augmentation spec: schema {}: unknown key {:?}",
                    schema_name,
                    table_key_str
                );
            }

            let options = table_value.as_mapping().ok_or_else(|| {
                anyhow!(
                    "augmentation spec: table {}.{}: mapping expected",
                    schema_name,
                    table_name
                )
            })?;
            for (option_key, option_value) in options {
                match option_key.as_str() {
                    Some("audit_columns") => {
                        let template_name = option_value.as_str().ok_or_else(|| {
                            anyhow!(
                                "augmentation spec: table {}.{}: audit_columns must be a string",
                                schema_name,
                                table_name
                            )
                        })?;
                        augment_table(catalog, &schema_name, &table_name, template_name)?;
                    }
                    Some(other) => bail!(
                        "augmentation spec: table {}.{}: unknown option {:?}",
                        schema_name,
                        table_name,
                        other
                    ),
                    None => bail!("augmentation spec: non-string option key"),
                }
            }
        }
    }

    link::resolve(catalog);
    Ok(())
}

fn augment_table(
    catalog: &mut Catalog,
    schema: &str,
    table_name: &str,
    template_name: &str,
) -> Result<()> {
    let template = AUDIT_TEMPLATES.get(template_name).ok_or_else(|| {
        anyhow!(
            "table {}.{}: unknown audit_columns template {:?} (expected one of: {})",
            schema,
            table_name,
            template_name,
            AUDIT_TEMPLATES
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    let table_idx = catalog
        .tables
        .iter()
        .position(|t| t.schema == schema && t.name == table_name)
        .ok_or_else(|| {
            anyhow!(
                "augmentation spec names table {}.{} which is not in the model",
                schema,
                table_name
            )
        })?;

    let mut values = BTreeMap::new();
    values.insert("table_name".to_string(), table_name.to_string());
    for prototype in &template.columns {
        values.insert(prototype.name.to_string(), prototype.name.to_string());
    }

    for prototype in &template.columns {
        let table = &mut catalog.tables[table_idx];
        if table.columns.iter().any(|c| c.name == prototype.name) {
            continue;
        }
        table.columns.push(Column {
            name: prototype.name.to_string(),
            data_type: prototype.data_type.to_string(),
            not_null: prototype.not_null,
            default: prototype.default.map(String::from),
            collation: None,
            identity: None,
            generated: None,
            statistics: None,
            storage: None,
            comment: None,
            oldname: None,
            depends_on: Vec::new(),
        });
        table.update_all_dependencies();
    }

    if let Some(prototype) = &template.trigger {
        let function_name = substitute(prototype.function_name, &values);
        let trigger_name = substitute(prototype.name, &values);
        let source = substitute(prototype.function_source, &values);

        if catalog.find_function(schema, &function_name, "").is_none() {
            catalog.functions.push(Function {
                schema: schema.to_string(),
                name: function_name.clone(),
                arguments: String::new(),
                parameters: String::new(),
                returns: Some("trigger".to_string()),
                language: "plpgsql".to_string(),
                source,
                kind: FunctionKind::Function,
                volatility: None,
                strict: false,
                security_definer: false,
                owner: None,
                comment: None,
                oldname: None,
                depends_on: Vec::new(),
            });
        }

        if catalog
            .find_trigger(schema, table_name, &trigger_name)
            .is_none()
        {
            catalog.triggers.push(Trigger {
                schema: schema.to_string(),
                table_name: table_name.to_string(),
                name: trigger_name,
                timing: "before".to_string(),
                events: vec!["insert".to_string(), "update".to_string()],
                level: "row".to_string(),
                function: format!("{}.{}", schema, function_name),
                function_arguments: String::new(),
                condition: None,
                comment: None,
                depends_on: vec![
                    DbObjectId::Table {
                        schema: schema.to_string(),
                        name: table_name.to_string(),
                    },
                    DbObjectId::Function {
                        schema: schema.to_string(),
                        name: function_name,
                        arguments: String::new(),
                    },
                ],
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::table::{Table, make_test_column};

    fn catalog_with_table() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.schemas.push(crate::catalog::schema::Schema {
            name: "public".into(),
            owner: None,
            comment: None,
            oldname: None,
        });
        catalog.tables.push(Table::new(
            "public".into(),
            "t1".into(),
            vec![make_test_column("c1", "integer", true)],
            vec![],
        ));
        catalog
    }

    fn spec(template: &str) -> Value {
        serde_yaml::from_str(&format!(
            "schema public:\n  table t1:\n    audit_columns: {}\n",
            template
        ))
        .unwrap()
    }

    #[test]
    fn test_substitute_single_pass() {
        let mut values = BTreeMap::new();
        values.insert("a".to_string(), "{{b}}".to_string());
        values.insert("b".to_string(), "NO".to_string());
        // the substituted text is not re-scanned
        assert_eq!(substitute("x {{a}} y", &values), "x {{b}} y");
    }

    #[test]
    fn test_substitute_unknown_placeholder_kept() {
        let values = BTreeMap::new();
        assert_eq!(substitute("{{missing}}", &values), "{{missing}}");
    }

    #[test]
    fn test_default_template_adds_columns_trigger_function() {
        let mut catalog = catalog_with_table();
        apply(&mut catalog, &spec("default")).unwrap();

        let table = &catalog.tables[0];
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["c1", "modified_by_user", "modified_timestamp"]
        );
        assert_eq!(catalog.triggers.len(), 1);
        assert_eq!(catalog.triggers[0].name, "t1_20_aud_dflt");
        assert_eq!(catalog.functions.len(), 1);
        assert!(catalog.functions[0].source.contains("NEW.modified_by_user"));
    }

    #[test]
    fn test_created_date_only_has_no_trigger() {
        let mut catalog = catalog_with_table();
        apply(&mut catalog, &spec("created_date_only")).unwrap();
        assert!(catalog.triggers.is_empty());
        assert!(catalog.functions.is_empty());
        assert!(
            catalog.tables[0]
                .columns
                .iter()
                .any(|c| c.name == "created_date")
        );
    }

    #[test]
    fn test_existing_column_not_duplicated() {
        let mut catalog = catalog_with_table();
        apply(&mut catalog, &spec("default")).unwrap();
        apply(&mut catalog, &spec("default")).unwrap();
        assert_eq!(catalog.tables[0].columns.len(), 3);
        assert_eq!(catalog.triggers.len(), 1);
    }

    #[test]
    fn test_unknown_template_rejected() {
        let mut catalog = catalog_with_table();
        let err = apply(&mut catalog, &spec("nonsense")).unwrap_err();
        assert!(err.to_string().contains("nonsense"));
    }

    #[test]
    fn test_unknown_table_rejected() {
        let mut catalog = catalog_with_table();
        let spec: Value =
            serde_yaml::from_str("schema public:\n  table missing:\n    audit_columns: default\n")
                .unwrap();
        assert!(apply(&mut catalog, &spec).is_err());
    }
}
