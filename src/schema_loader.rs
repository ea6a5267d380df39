//! YAML mapping → Catalog.
//!
//! The inverse of `schema_generator`: parses the `"<kind> <identifier>"`
//! keyed mapping into model objects, populating everything except
//! dependency edges (the linker derives those afterwards). Errors name the
//! offending object key and attribute and abort before any DDL is emitted.

use anyhow::{Context, Result, anyhow, bail};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::catalog::cast::Cast;
use crate::catalog::collation::Collation;
use crate::catalog::constraint::{Constraint, ConstraintType};
use crate::catalog::conversion::Conversion;
use crate::catalog::custom_type::{CompositeAttribute, CustomType, TypeDefinition};
use crate::catalog::domain::{Domain, DomainCheck};
use crate::catalog::event_trigger::EventTrigger;
use crate::catalog::extension::Extension;
use crate::catalog::foreign::{ForeignDataWrapper, ForeignServer, ForeignTable, UserMapping};
use crate::catalog::function::{Function, FunctionKind};
use crate::catalog::grant::{Grant, GranteeType, ObjectType};
use crate::catalog::id::DbObjectId;
use crate::catalog::index::Index;
use crate::catalog::language::Language;
use crate::catalog::link;
use crate::catalog::operator::{Operator, OperatorClass, OperatorFamily};
use crate::catalog::rule::Rule;
use crate::catalog::schema::Schema;
use crate::catalog::sequence::Sequence;
use crate::catalog::table::{Column, Table};
use crate::catalog::text_search::{TsConfiguration, TsDictionary, TsParser, TsTemplate};
use crate::catalog::triggers::Trigger;
use crate::catalog::view::View;
use crate::catalog::{Catalog, utils::is_system_schema};
use crate::schema_generator::{is_object_key, split_object_key};

/// Read the spec mapping from a file, or stdin for `-` / no path.
pub fn load_spec_value(input: Option<&Path>) -> Result<Value> {
    let content = match input {
        Some(path) if path.to_str() != Some("-") => fs::read_to_string(path)
            .with_context(|| format!("cannot read spec file {}", path.display()))?,
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("cannot read spec from stdin")?;
            buffer
        }
    };
    serde_yaml::from_str(&content).context("invalid YAML in spec input")
}

/// Load and deep-merge a multiple-files tree rooted at `root`.
pub fn load_repo_value(root: &Path, dbname: &str) -> Result<Value> {
    let pattern = root.join("**").join("*.yaml");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow!("repository path is not valid UTF-8"))?
        .to_string();

    let index_name = format!("database.{}.yaml", dbname);
    let config_name =
        std::env::var("PGYAML_CONFIG_FILE").unwrap_or_else(|_| "pgyaml.yaml".to_string());
    let mut merged = Mapping::new();
    let mut paths: Vec<std::path::PathBuf> = glob::glob(&pattern)
        .context("invalid repository glob")?
        .filter_map(|entry| entry.ok())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n != index_name && n != config_name && !n.starts_with("database."))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        bail!("no YAML files found under {}", root.display());
    }

    for path in paths {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let value: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?;
        if let Value::Mapping(map) = value {
            deep_merge(&mut merged, &map);
        } else if !matches!(value, Value::Null) {
            bail!("{}: top-level mapping expected", path.display());
        }
    }

    Ok(Value::Mapping(merged))
}

fn deep_merge(target: &mut Mapping, source: &Mapping) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn as_map<'a>(value: &'a Value, ctx: &str) -> Result<&'a Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| anyhow!("{}: mapping expected", ctx))
}

fn get_str(map: &Mapping, key: &str, ctx: &str) -> Result<Option<String>> {
    match map.get(Value::String(key.to_string())) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => bail!("{}: attribute {:?} must be a string", ctx, key),
    }
}

fn req_str(map: &Mapping, key: &str, ctx: &str) -> Result<String> {
    get_str(map, key, ctx)?
        .ok_or_else(|| anyhow!("{}: missing required attribute {:?}", ctx, key))
}

fn get_bool(map: &Mapping, key: &str, ctx: &str) -> Result<bool> {
    match map.get(Value::String(key.to_string())) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => bail!("{}: attribute {:?} must be a boolean", ctx, key),
    }
}

fn get_i64(map: &Mapping, key: &str, default: i64, ctx: &str) -> Result<i64> {
    match map.get(Value::String(key.to_string())) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| anyhow!("{}: attribute {:?} out of range", ctx, key)),
        Some(_) => bail!("{}: attribute {:?} must be an integer", ctx, key),
    }
}

fn get_str_list(map: &Mapping, key: &str, ctx: &str) -> Result<Vec<String>> {
    match map.get(Value::String(key.to_string())) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(|v| {
                v.as_str()
                    .map(String::from)
                    .ok_or_else(|| anyhow!("{}: {:?} entries must be strings", ctx, key))
            })
            .collect(),
        Some(_) => bail!("{}: attribute {:?} must be a list", ctx, key),
    }
}

fn check_keys(map: &Mapping, allowed: &[&str], ctx: &str) -> Result<()> {
    for key in map.keys() {
        let key_str = key
            .as_str()
            .ok_or_else(|| anyhow!("{}: non-string key", ctx))?;
        if is_object_key(key_str) {
            continue;
        }
        if !allowed.contains(&key_str) {
            bail!("{}: unknown attribute {:?}", ctx, key_str);
        }
    }
    Ok(())
}

/// Parse the `privileges` list into grant records for the object.
fn parse_privileges(
    map: &Mapping,
    object: ObjectType,
    object_owner: &str,
    ctx: &str,
) -> Result<Vec<Grant>> {
    let entries = match map.get(Value::String("privileges".to_string())) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(entries)) => entries,
        Some(_) => bail!("{}: privileges must be a list", ctx),
    };

    let mut grants = Vec::new();
    for entry in entries {
        let entry_map = as_map(entry, &format!("{}: privileges entry", ctx))?;
        for (grantee_key, privs_value) in entry_map {
            let grantee_name = grantee_key
                .as_str()
                .ok_or_else(|| anyhow!("{}: privilege grantee must be a string", ctx))?;
            let grantee = if grantee_name.eq_ignore_ascii_case("public") {
                GranteeType::Public
            } else {
                GranteeType::Role(grantee_name.to_string())
            };

            let (raw_privs, grantable) = match privs_value {
                Value::Sequence(seq) => (seq.clone(), false),
                Value::Mapping(inner) => {
                    let privs = match inner.get(Value::String("privileges".to_string())) {
                        Some(Value::Sequence(seq)) => seq.clone(),
                        _ => bail!("{}: privileges entry for {:?} malformed", ctx, grantee_name),
                    };
                    (privs, get_bool(inner, "grantable", ctx)?)
                }
                _ => bail!(
                    "{}: privileges for {:?} must be a list or mapping",
                    ctx,
                    grantee_name
                ),
            };

            let mut privileges = Vec::new();
            for priv_value in &raw_privs {
                let name = priv_value
                    .as_str()
                    .ok_or_else(|| anyhow!("{}: privilege names must be strings", ctx))?;
                if name.eq_ignore_ascii_case("all") {
                    privileges.extend(object.all_privileges().iter().map(|p| p.to_string()));
                } else {
                    privileges.push(name.to_uppercase());
                }
            }

            grants.push(Grant {
                grantee,
                object: object.clone(),
                privileges,
                with_grant_option: grantable,
                depends_on: vec![object.db_object_id()],
                object_owner: object_owner.to_string(),
            });
        }
    }
    Ok(grants)
}

fn parse_column(entry: &Value, ctx: &str) -> Result<Column> {
    let entry_map = as_map(entry, &format!("{}: column entry", ctx))?;
    if entry_map.len() != 1 {
        bail!("{}: each column entry must have exactly one key", ctx);
    }
    let (name_value, attrs_value) = entry_map.iter().next().unwrap();
    let name = name_value
        .as_str()
        .ok_or_else(|| anyhow!("{}: column name must be a string", ctx))?
        .to_string();
    let col_ctx = format!("{}: column {:?}", ctx, name);
    let attrs = as_map(attrs_value, &col_ctx)?;
    check_keys(
        attrs,
        &[
            "type",
            "not_null",
            "default",
            "collation",
            "identity",
            "generated",
            "statistics",
            "storage",
            "description",
            "oldname",
        ],
        &col_ctx,
    )?;

    let statistics = match attrs.get(Value::String("statistics".to_string())) {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(
            n.as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| anyhow!("{}: statistics out of range", col_ctx))?,
        ),
        Some(_) => bail!("{}: statistics must be an integer", col_ctx),
    };

    Ok(Column {
        data_type: req_str(attrs, "type", &col_ctx)?,
        not_null: get_bool(attrs, "not_null", &col_ctx)?,
        default: get_str(attrs, "default", &col_ctx)?,
        collation: get_str(attrs, "collation", &col_ctx)?,
        identity: get_str(attrs, "identity", &col_ctx)?,
        generated: get_str(attrs, "generated", &col_ctx)?,
        statistics,
        storage: get_str(attrs, "storage", &col_ctx)?,
        comment: get_str(attrs, "description", &col_ctx)?,
        oldname: get_str(attrs, "oldname", &col_ctx)?,
        depends_on: Vec::new(),
        name,
    })
}

struct Loader {
    catalog: Catalog,
}

impl Loader {
    fn new() -> Self {
        Self {
            catalog: Catalog::default(),
        }
    }

    fn parse_table(&mut self, schema: &str, name: &str, value: &Value) -> Result<()> {
        let ctx = format!("table {}.{}", schema, name);
        let map = as_map(value, &ctx)?;
        check_keys(
            map,
            &[
                "columns",
                "primary_key",
                "check_constraints",
                "unique_constraints",
                "foreign_keys",
                "indexes",
                "triggers",
                "rules",
                "unlogged",
                "tablespace",
                "inherits",
                "partition_by",
                "partition_of",
                "partition_bound",
                "options",
                "owner",
                "privileges",
                "description",
                "oldname",
                "depends_on",
            ],
            &ctx,
        )?;

        let mut columns = Vec::new();
        match map.get(Value::String("columns".to_string())) {
            Some(Value::Sequence(entries)) => {
                for entry in entries {
                    columns.push(parse_column(entry, &ctx)?);
                }
            }
            Some(_) => bail!("{}: columns must be a list", ctx),
            None => {
                if map
                    .get(Value::String("partition_of".to_string()))
                    .is_none()
                {
                    bail!("{}: missing required attribute \"columns\"", ctx);
                }
            }
        }

        let owner = get_str(map, "owner", &ctx)?;
        let mut table = Table::new(
            schema.to_string(),
            name.to_string(),
            columns,
            vec![DbObjectId::Schema {
                name: schema.to_string(),
            }],
        );
        table.unlogged = get_bool(map, "unlogged", &ctx)?;
        table.tablespace = get_str(map, "tablespace", &ctx)?;
        table.inherits = get_str_list(map, "inherits", &ctx)?;
        table.partition_by = get_str(map, "partition_by", &ctx)?;
        table.partition_of = get_str(map, "partition_of", &ctx)?;
        table.partition_bound = get_str(map, "partition_bound", &ctx)?;
        table.options = get_str_list(map, "options", &ctx)?;
        table.owner = owner.clone();
        table.comment = get_str(map, "description", &ctx)?;
        table.oldname = get_str(map, "oldname", &ctx)?;

        self.catalog.grants.extend(parse_privileges(
            map,
            ObjectType::Table {
                schema: schema.to_string(),
                name: name.to_string(),
            },
            owner.as_deref().unwrap_or_default(),
            &ctx,
        )?);

        self.parse_table_constraints(schema, name, map, &ctx)?;
        self.parse_table_indexes(schema, name, map, &ctx)?;
        self.parse_table_triggers(schema, name, map, &ctx)?;
        self.parse_table_rules(schema, name, map, &ctx)?;

        // owned sequences nested under the table
        for (key, child) in map {
            let key_str = key.as_str().unwrap_or_default();
            if let Some(seq_name) = key_str.strip_prefix("sequence ") {
                self.parse_sequence(schema, seq_name, child, Some((schema, name)))?;
            }
        }

        self.catalog.tables.push(table);
        Ok(())
    }

    fn parse_table_constraints(
        &mut self,
        schema: &str,
        table: &str,
        map: &Mapping,
        ctx: &str,
    ) -> Result<()> {
        if let Some(value) = map.get(Value::String("primary_key".to_string())) {
            let pk_map = as_map(value, &format!("{}: primary_key", ctx))?;
            for (name_value, attrs_value) in pk_map {
                let name = name_value
                    .as_str()
                    .ok_or_else(|| anyhow!("{}: primary key name must be a string", ctx))?;
                let attrs = as_map(attrs_value, &format!("{}: primary key {:?}", ctx, name))?;
                self.catalog.constraints.push(Constraint {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    name: name.to_string(),
                    constraint_type: ConstraintType::PrimaryKey {
                        columns: get_str_list(attrs, "columns", ctx)?,
                    },
                    comment: get_str(attrs, "description", ctx)?,
                    depends_on: Vec::new(),
                });
            }
        }

        if let Some(value) = map.get(Value::String("check_constraints".to_string())) {
            let checks = as_map(value, &format!("{}: check_constraints", ctx))?;
            for (name_value, attrs_value) in checks {
                let name = name_value
                    .as_str()
                    .ok_or_else(|| anyhow!("{}: check constraint name must be a string", ctx))?;
                let check_ctx = format!("{}: check constraint {:?}", ctx, name);
                let attrs = as_map(attrs_value, &check_ctx)?;
                self.catalog.constraints.push(Constraint {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    name: name.to_string(),
                    constraint_type: ConstraintType::Check {
                        expression: req_str(attrs, "expression", &check_ctx)?,
                        columns: get_str_list(attrs, "columns", &check_ctx)?,
                    },
                    comment: get_str(attrs, "description", &check_ctx)?,
                    depends_on: Vec::new(),
                });
            }
        }

        if let Some(value) = map.get(Value::String("unique_constraints".to_string())) {
            let uniques = as_map(value, &format!("{}: unique_constraints", ctx))?;
            for (name_value, attrs_value) in uniques {
                let name = name_value
                    .as_str()
                    .ok_or_else(|| anyhow!("{}: unique constraint name must be a string", ctx))?;
                let attrs = as_map(attrs_value, &format!("{}: unique constraint {:?}", ctx, name))?;
                self.catalog.constraints.push(Constraint {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    name: name.to_string(),
                    constraint_type: ConstraintType::Unique {
                        columns: get_str_list(attrs, "columns", ctx)?,
                    },
                    comment: get_str(attrs, "description", ctx)?,
                    depends_on: Vec::new(),
                });
            }
        }

        if let Some(value) = map.get(Value::String("foreign_keys".to_string())) {
            let fks = as_map(value, &format!("{}: foreign_keys", ctx))?;
            for (name_value, attrs_value) in fks {
                let name = name_value
                    .as_str()
                    .ok_or_else(|| anyhow!("{}: foreign key name must be a string", ctx))?;
                let fk_ctx = format!("{}: foreign key {:?}", ctx, name);
                let attrs = as_map(attrs_value, &fk_ctx)?;
                let references_value = attrs
                    .get(Value::String("references".to_string()))
                    .ok_or_else(|| anyhow!("{}: missing required attribute \"references\"", fk_ctx))?;
                let references = as_map(references_value, &format!("{}: references", fk_ctx))?;
                self.catalog.constraints.push(Constraint {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    name: name.to_string(),
                    constraint_type: ConstraintType::ForeignKey {
                        columns: get_str_list(attrs, "columns", &fk_ctx)?,
                        referenced_schema: get_str(references, "schema", &fk_ctx)?
                            .unwrap_or_else(|| schema.to_string()),
                        referenced_table: req_str(references, "table", &fk_ctx)?,
                        referenced_columns: get_str_list(references, "columns", &fk_ctx)?,
                        on_delete: get_str(attrs, "on_delete", &fk_ctx)?,
                        on_update: get_str(attrs, "on_update", &fk_ctx)?,
                        deferrable: get_bool(attrs, "deferrable", &fk_ctx)?,
                    },
                    comment: get_str(attrs, "description", &fk_ctx)?,
                    depends_on: Vec::new(),
                });
            }
        }

        Ok(())
    }

    fn parse_table_indexes(
        &mut self,
        schema: &str,
        table: &str,
        map: &Mapping,
        ctx: &str,
    ) -> Result<()> {
        let Some(value) = map.get(Value::String("indexes".to_string())) else {
            return Ok(());
        };
        let indexes = as_map(value, &format!("{}: indexes", ctx))?;
        for (name_value, attrs_value) in indexes {
            let name = name_value
                .as_str()
                .ok_or_else(|| anyhow!("{}: index name must be a string", ctx))?;
            let index_ctx = format!("{}: index {:?}", ctx, name);
            let attrs = as_map(attrs_value, &index_ctx)?;
            check_keys(
                attrs,
                &[
                    "columns",
                    "definition",
                    "unique",
                    "access_method",
                    "tablespace",
                    "description",
                    "oldname",
                ],
                &index_ctx,
            )?;
            let columns = get_str_list(attrs, "columns", &index_ctx)?;
            let method = get_str(attrs, "access_method", &index_ctx)?
                .unwrap_or_else(|| "btree".to_string());
            let unique = get_bool(attrs, "unique", &index_ctx)?;
            let definition = match get_str(attrs, "definition", &index_ctx)? {
                Some(definition) => definition,
                None if !columns.is_empty() => format!(
                    "CREATE {}INDEX {} ON {}.{} USING {} ({})",
                    if unique { "UNIQUE " } else { "" },
                    name,
                    schema,
                    table,
                    method,
                    columns.join(", ")
                ),
                None => bail!(
                    "{}: either \"columns\" or \"definition\" is required",
                    index_ctx
                ),
            };
            self.catalog.indexes.push(Index {
                schema: schema.to_string(),
                name: name.to_string(),
                table: table.to_string(),
                definition,
                columns: if columns.is_empty() { None } else { Some(columns) },
                unique,
                method,
                tablespace: get_str(attrs, "tablespace", &index_ctx)?,
                comment: get_str(attrs, "description", &index_ctx)?,
                oldname: get_str(attrs, "oldname", &index_ctx)?,
                depends_on: Vec::new(),
            });
        }
        Ok(())
    }

    fn parse_table_triggers(
        &mut self,
        schema: &str,
        table: &str,
        map: &Mapping,
        ctx: &str,
    ) -> Result<()> {
        let Some(value) = map.get(Value::String("triggers".to_string())) else {
            return Ok(());
        };
        let triggers = as_map(value, &format!("{}: triggers", ctx))?;
        for (name_value, attrs_value) in triggers {
            let name = name_value
                .as_str()
                .ok_or_else(|| anyhow!("{}: trigger name must be a string", ctx))?;
            let trigger_ctx = format!("{}: trigger {:?}", ctx, name);
            let attrs = as_map(attrs_value, &trigger_ctx)?;
            check_keys(
                attrs,
                &[
                    "timing",
                    "events",
                    "level",
                    "procedure",
                    "condition",
                    "description",
                ],
                &trigger_ctx,
            )?;
            self.catalog.triggers.push(Trigger {
                schema: schema.to_string(),
                table_name: table.to_string(),
                name: name.to_string(),
                timing: req_str(attrs, "timing", &trigger_ctx)?,
                events: get_str_list(attrs, "events", &trigger_ctx)?,
                level: get_str(attrs, "level", &trigger_ctx)?
                    .unwrap_or_else(|| "statement".to_string()),
                function: req_str(attrs, "procedure", &trigger_ctx)?,
                function_arguments: String::new(),
                condition: get_str(attrs, "condition", &trigger_ctx)?,
                comment: get_str(attrs, "description", &trigger_ctx)?,
                depends_on: Vec::new(),
            });
        }
        Ok(())
    }

    fn parse_table_rules(
        &mut self,
        schema: &str,
        table: &str,
        map: &Mapping,
        ctx: &str,
    ) -> Result<()> {
        let Some(value) = map.get(Value::String("rules".to_string())) else {
            return Ok(());
        };
        let rules = as_map(value, &format!("{}: rules", ctx))?;
        for (name_value, attrs_value) in rules {
            let name = name_value
                .as_str()
                .ok_or_else(|| anyhow!("{}: rule name must be a string", ctx))?;
            let rule_ctx = format!("{}: rule {:?}", ctx, name);
            let attrs = as_map(attrs_value, &rule_ctx)?;
            self.catalog.rules.push(Rule {
                schema: schema.to_string(),
                table_name: table.to_string(),
                name: name.to_string(),
                definition: req_str(attrs, "definition", &rule_ctx)?,
                comment: get_str(attrs, "description", &rule_ctx)?,
                depends_on: Vec::new(),
            });
        }
        Ok(())
    }

    fn parse_sequence(
        &mut self,
        schema: &str,
        name: &str,
        value: &Value,
        owning_table: Option<(&str, &str)>,
    ) -> Result<()> {
        let ctx = format!("sequence {}.{}", schema, name);
        let map = as_map(value, &ctx)?;
        check_keys(
            map,
            &[
                "data_type",
                "start_value",
                "min_value",
                "max_value",
                "increment_by",
                "cache",
                "cycle",
                "owned_by",
                "owner",
                "privileges",
                "description",
                "oldname",
            ],
            &ctx,
        )?;

        let owner = get_str(map, "owner", &ctx)?;
        // nested sequences always carry owned_by; the table context only
        // validates the nesting
        let owned_by = get_str(map, "owned_by", &ctx)?;
        if let (Some(owned_by), Some((table_schema, table_name))) = (&owned_by, owning_table) {
            let expected = format!("{}.{}.", table_schema, table_name);
            if !owned_by.starts_with(&expected) {
                bail!(
                    "{}: owned_by {:?} does not match the containing table {}.{}",
                    ctx,
                    owned_by,
                    table_schema,
                    table_name
                );
            }
        }

        self.catalog.grants.extend(parse_privileges(
            map,
            ObjectType::Sequence {
                schema: schema.to_string(),
                name: name.to_string(),
            },
            owner.as_deref().unwrap_or_default(),
            &ctx,
        )?);

        self.catalog.sequences.push(Sequence {
            schema: schema.to_string(),
            name: name.to_string(),
            data_type: get_str(map, "data_type", &ctx)?.unwrap_or_else(|| "bigint".to_string()),
            start_value: get_i64(map, "start_value", 1, &ctx)?,
            min_value: get_i64(map, "min_value", 1, &ctx)?,
            max_value: get_i64(map, "max_value", i64::MAX, &ctx)?,
            increment: get_i64(map, "increment_by", 1, &ctx)?,
            cache_value: get_i64(map, "cache", 1, &ctx)?,
            cycle: get_bool(map, "cycle", &ctx)?,
            owned_by,
            owner,
            comment: get_str(map, "description", &ctx)?,
            oldname: get_str(map, "oldname", &ctx)?,
            depends_on: Vec::new(),
        });
        Ok(())
    }

    fn parse_view(
        &mut self,
        schema: &str,
        name: &str,
        value: &Value,
        materialized: bool,
    ) -> Result<()> {
        let kind = if materialized {
            "materialized view"
        } else {
            "view"
        };
        let ctx = format!("{} {}.{}", kind, schema, name);
        let map = as_map(value, &ctx)?;
        check_keys(
            map,
            &[
                "definition",
                "tablespace",
                "owner",
                "privileges",
                "description",
                "oldname",
                "depends_on",
            ],
            &ctx,
        )?;

        let owner = get_str(map, "owner", &ctx)?;
        let object = if materialized {
            ObjectType::MaterializedView {
                schema: schema.to_string(),
                name: name.to_string(),
            }
        } else {
            ObjectType::View {
                schema: schema.to_string(),
                name: name.to_string(),
            }
        };
        self.catalog.grants.extend(parse_privileges(
            map,
            object,
            owner.as_deref().unwrap_or_default(),
            &ctx,
        )?);

        // explicit relation hints, e.g. "table t1" or "view public.v2"
        let mut depends_on = Vec::new();
        for hint in get_str_list(map, "depends_on", &ctx)? {
            depends_on.push(parse_relation_hint(&hint, schema, &ctx)?);
        }

        self.catalog.views.push(View {
            schema: schema.to_string(),
            name: name.to_string(),
            definition: req_str(map, "definition", &ctx)?,
            materialized,
            tablespace: get_str(map, "tablespace", &ctx)?,
            owner,
            comment: get_str(map, "description", &ctx)?,
            oldname: get_str(map, "oldname", &ctx)?,
            depends_on,
        });
        Ok(())
    }

    fn parse_function(&mut self, schema: &str, ident: &str, value: &Value) -> Result<()> {
        let ctx = format!("function {}.{}", schema, ident);
        let (name, arguments) = split_signature(ident, &ctx)?;
        let map = as_map(value, &ctx)?;
        check_keys(
            map,
            &[
                "language",
                "params",
                "returns",
                "source",
                "procedure",
                "volatility",
                "strict",
                "security_definer",
                "owner",
                "privileges",
                "description",
                "oldname",
            ],
            &ctx,
        )?;

        let owner = get_str(map, "owner", &ctx)?;
        self.catalog.grants.extend(parse_privileges(
            map,
            ObjectType::Function {
                schema: schema.to_string(),
                name: name.clone(),
                arguments: arguments.clone(),
            },
            owner.as_deref().unwrap_or_default(),
            &ctx,
        )?);

        self.catalog.functions.push(Function {
            schema: schema.to_string(),
            parameters: get_str(map, "params", &ctx)?.unwrap_or_else(|| arguments.clone()),
            name,
            arguments,
            returns: get_str(map, "returns", &ctx)?,
            language: get_str(map, "language", &ctx)?.unwrap_or_else(|| "sql".to_string()),
            source: req_str(map, "source", &ctx)?,
            kind: if get_bool(map, "procedure", &ctx)? {
                FunctionKind::Procedure
            } else {
                FunctionKind::Function
            },
            volatility: get_str(map, "volatility", &ctx)?,
            strict: get_bool(map, "strict", &ctx)?,
            security_definer: get_bool(map, "security_definer", &ctx)?,
            owner,
            comment: get_str(map, "description", &ctx)?,
            oldname: get_str(map, "oldname", &ctx)?,
            depends_on: Vec::new(),
        });
        Ok(())
    }

    fn parse_aggregate(&mut self, schema: &str, ident: &str, value: &Value) -> Result<()> {
        let ctx = format!("aggregate {}.{}", schema, ident);
        let (name, arguments) = split_signature(ident, &ctx)?;
        let map = as_map(value, &ctx)?;
        self.catalog.aggregates.push(crate::catalog::aggregate::Aggregate {
            schema: schema.to_string(),
            name,
            arguments,
            sfunc: req_str(map, "sfunc", &ctx)?,
            stype: req_str(map, "stype", &ctx)?,
            finalfunc: get_str(map, "finalfunc", &ctx)?,
            combinefunc: get_str(map, "combinefunc", &ctx)?,
            initcond: get_str(map, "initcond", &ctx)?,
            owner: get_str(map, "owner", &ctx)?,
            comment: get_str(map, "description", &ctx)?,
            depends_on: Vec::new(),
        });
        Ok(())
    }

    fn parse_type(&mut self, schema: &str, name: &str, value: &Value) -> Result<()> {
        let ctx = format!("type {}.{}", schema, name);
        let map = as_map(value, &ctx)?;

        let definition = if map.contains_key(Value::String("labels".to_string())) {
            TypeDefinition::Enum {
                labels: get_str_list(map, "labels", &ctx)?,
            }
        } else if let Some(attrs_value) = map.get(Value::String("attributes".to_string())) {
            let entries = attrs_value
                .as_sequence()
                .ok_or_else(|| anyhow!("{}: attributes must be a list", ctx))?;
            let mut attributes = Vec::new();
            for entry in entries {
                let entry_map = as_map(entry, &format!("{}: attribute entry", ctx))?;
                if entry_map.len() != 1 {
                    bail!("{}: each attribute entry must have exactly one key", ctx);
                }
                let (attr_name, attr_value) = entry_map.iter().next().unwrap();
                let attr_name = attr_name
                    .as_str()
                    .ok_or_else(|| anyhow!("{}: attribute name must be a string", ctx))?;
                let attrs = as_map(attr_value, &format!("{}: attribute {:?}", ctx, attr_name))?;
                attributes.push(CompositeAttribute {
                    name: attr_name.to_string(),
                    data_type: req_str(attrs, "type", &ctx)?,
                    collation: get_str(attrs, "collation", &ctx)?,
                });
            }
            TypeDefinition::Composite { attributes }
        } else if map.contains_key(Value::String("subtype".to_string())) {
            TypeDefinition::Range {
                subtype: req_str(map, "subtype", &ctx)?,
                subtype_opclass: get_str(map, "subtype_opclass", &ctx)?,
                canonical: get_str(map, "canonical", &ctx)?,
                subtype_diff: get_str(map, "subtype_diff", &ctx)?,
            }
        } else if map.contains_key(Value::String("input".to_string())) {
            TypeDefinition::Base {
                input: req_str(map, "input", &ctx)?,
                output: req_str(map, "output", &ctx)?,
                internallength: get_str(map, "internallength", &ctx)?,
                alignment: get_str(map, "alignment", &ctx)?,
                storage: get_str(map, "storage", &ctx)?,
            }
        } else {
            bail!(
                "{}: one of \"labels\", \"attributes\", \"subtype\" or \"input\" is required",
                ctx
            );
        };

        self.catalog.types.push(CustomType {
            schema: schema.to_string(),
            name: name.to_string(),
            definition,
            owner: get_str(map, "owner", &ctx)?,
            comment: get_str(map, "description", &ctx)?,
            depends_on: Vec::new(),
        });
        Ok(())
    }

    fn parse_domain(&mut self, schema: &str, name: &str, value: &Value) -> Result<()> {
        let ctx = format!("domain {}.{}", schema, name);
        let map = as_map(value, &ctx)?;

        let mut check_constraints = Vec::new();
        if let Some(checks_value) = map.get(Value::String("check_constraints".to_string())) {
            let checks = as_map(checks_value, &format!("{}: check_constraints", ctx))?;
            for (check_name, check_value) in checks {
                let check_name = check_name
                    .as_str()
                    .ok_or_else(|| anyhow!("{}: check name must be a string", ctx))?;
                let attrs = as_map(check_value, &format!("{}: check {:?}", ctx, check_name))?;
                check_constraints.push(DomainCheck {
                    name: check_name.to_string(),
                    expression: req_str(attrs, "expression", &ctx)?,
                });
            }
        }

        self.catalog.domains.push(Domain {
            schema: schema.to_string(),
            name: name.to_string(),
            data_type: req_str(map, "type", &ctx)?,
            not_null: get_bool(map, "not_null", &ctx)?,
            default: get_str(map, "default", &ctx)?,
            check_constraints,
            owner: get_str(map, "owner", &ctx)?,
            comment: get_str(map, "description", &ctx)?,
            depends_on: Vec::new(),
        });
        Ok(())
    }

    fn parse_schema_entry(&mut self, name: &str, value: &Value) -> Result<()> {
        let ctx = format!("schema {}", name);
        let map = as_map(value, &ctx)?;
        check_keys(
            map,
            &["owner", "privileges", "description", "oldname"],
            &ctx,
        )?;

        let owner = get_str(map, "owner", &ctx)?;
        self.catalog.grants.extend(parse_privileges(
            map,
            ObjectType::Schema {
                name: name.to_string(),
            },
            owner.as_deref().unwrap_or_default(),
            &ctx,
        )?);

        self.catalog.schemas.push(Schema {
            name: name.to_string(),
            owner,
            comment: get_str(map, "description", &ctx)?,
            oldname: get_str(map, "oldname", &ctx)?,
        });

        for (key, child) in map {
            let key_str = key
                .as_str()
                .ok_or_else(|| anyhow!("{}: non-string key", ctx))?;
            if !is_object_key(key_str) {
                continue;
            }
            let (kind, ident) = split_object_key(key_str);
            match kind.as_str() {
                "table" => self.parse_table(name, &ident, child)?,
                "view" => self.parse_view(name, &ident, child, false)?,
                "materialized view" => self.parse_view(name, &ident, child, true)?,
                "sequence" => self.parse_sequence(name, &ident, child, None)?,
                "function" => self.parse_function(name, &ident, child)?,
                "aggregate" => self.parse_aggregate(name, &ident, child)?,
                "type" => self.parse_type(name, &ident, child)?,
                "domain" => self.parse_domain(name, &ident, child)?,
                "collation" => {
                    let child_ctx = format!("collation {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    self.catalog.collations.push(Collation {
                        schema: name.to_string(),
                        name: ident.clone(),
                        lc_collate: get_str(attrs, "lc_collate", &child_ctx)?,
                        lc_ctype: get_str(attrs, "lc_ctype", &child_ctx)?,
                        provider: get_str(attrs, "provider", &child_ctx)?,
                        owner: get_str(attrs, "owner", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "conversion" => {
                    let child_ctx = format!("conversion {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    self.catalog.conversions.push(Conversion {
                        schema: name.to_string(),
                        name: ident.clone(),
                        source_encoding: req_str(attrs, "source_encoding", &child_ctx)?,
                        dest_encoding: req_str(attrs, "dest_encoding", &child_ctx)?,
                        function: req_str(attrs, "function", &child_ctx)?,
                        default: get_bool(attrs, "default", &child_ctx)?,
                        owner: get_str(attrs, "owner", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "operator" => {
                    let child_ctx = format!("operator {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    let (op_name, signature) = split_signature(&ident, &child_ctx)?;
                    let mut operands = signature.splitn(2, ',').map(|s| s.trim().to_string());
                    let left = operands.next().filter(|s| s != "NONE" && !s.is_empty());
                    let right = operands.next().filter(|s| s != "NONE" && !s.is_empty());
                    self.catalog.operators.push(Operator {
                        schema: name.to_string(),
                        name: op_name,
                        left: get_str(attrs, "leftarg", &child_ctx)?.or(left),
                        right: get_str(attrs, "rightarg", &child_ctx)?.or(right),
                        function: req_str(attrs, "function", &child_ctx)?,
                        commutator: get_str(attrs, "commutator", &child_ctx)?,
                        negator: get_str(attrs, "negator", &child_ctx)?,
                        restrict: get_str(attrs, "restrict", &child_ctx)?,
                        join: get_str(attrs, "join", &child_ctx)?,
                        owner: get_str(attrs, "owner", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "operator class" => {
                    let child_ctx = format!("operator class {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    let (class_name, method) = split_using(&ident, &child_ctx)?;
                    self.catalog.operator_classes.push(OperatorClass {
                        schema: name.to_string(),
                        name: class_name,
                        method: get_str(attrs, "access_method", &child_ctx)?.unwrap_or(method),
                        type_name: req_str(attrs, "type", &child_ctx)?,
                        default: get_bool(attrs, "default", &child_ctx)?,
                        family: get_str(attrs, "family", &child_ctx)?,
                        operators: get_str_list(attrs, "operators", &child_ctx)?,
                        functions: get_str_list(attrs, "functions", &child_ctx)?,
                        owner: get_str(attrs, "owner", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "operator family" => {
                    let child_ctx = format!("operator family {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    let (family_name, method) = split_using(&ident, &child_ctx)?;
                    self.catalog.operator_families.push(OperatorFamily {
                        schema: name.to_string(),
                        name: family_name,
                        method: get_str(attrs, "access_method", &child_ctx)?.unwrap_or(method),
                        owner: get_str(attrs, "owner", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "text search parser" => {
                    let child_ctx = format!("text search parser {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    self.catalog.ts_parsers.push(TsParser {
                        schema: name.to_string(),
                        name: ident.clone(),
                        start: req_str(attrs, "start", &child_ctx)?,
                        gettoken: req_str(attrs, "gettoken", &child_ctx)?,
                        end: req_str(attrs, "end", &child_ctx)?,
                        lextypes: req_str(attrs, "lextypes", &child_ctx)?,
                        headline: get_str(attrs, "headline", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "text search dictionary" => {
                    let child_ctx = format!("text search dictionary {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    self.catalog.ts_dictionaries.push(TsDictionary {
                        schema: name.to_string(),
                        name: ident.clone(),
                        template: req_str(attrs, "template", &child_ctx)?,
                        options: get_str(attrs, "options", &child_ctx)?,
                        owner: get_str(attrs, "owner", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "text search template" => {
                    let child_ctx = format!("text search template {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    self.catalog.ts_templates.push(TsTemplate {
                        schema: name.to_string(),
                        name: ident.clone(),
                        init: get_str(attrs, "init", &child_ctx)?,
                        lexize: req_str(attrs, "lexize", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "text search configuration" => {
                    let child_ctx = format!("text search configuration {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    self.catalog.ts_configurations.push(TsConfiguration {
                        schema: name.to_string(),
                        name: ident.clone(),
                        parser: req_str(attrs, "parser", &child_ctx)?,
                        owner: get_str(attrs, "owner", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                "foreign table" => {
                    let child_ctx = format!("foreign table {}.{}", name, ident);
                    let attrs = as_map(child, &child_ctx)?;
                    let mut columns = Vec::new();
                    if let Some(Value::Sequence(entries)) =
                        attrs.get(Value::String("columns".to_string()))
                    {
                        for entry in entries {
                            columns.push(parse_column(entry, &child_ctx)?);
                        }
                    }
                    self.catalog.foreign_tables.push(ForeignTable {
                        schema: name.to_string(),
                        name: ident.clone(),
                        server: req_str(attrs, "server", &child_ctx)?,
                        columns,
                        options: parse_options_map(attrs, &child_ctx)?,
                        owner: get_str(attrs, "owner", &child_ctx)?,
                        comment: get_str(attrs, "description", &child_ctx)?,
                        depends_on: Vec::new(),
                    });
                }
                other => bail!("{}: unknown object kind {:?}", ctx, other),
            }
        }

        Ok(())
    }

    fn parse_top_level(&mut self, kind: &str, ident: &str, value: &Value) -> Result<()> {
        match kind {
            "schema" => self.parse_schema_entry(ident, value)?,
            "extension" => {
                let ctx = format!("extension {}", ident);
                let map = as_map(value, &ctx)?;
                self.catalog.extensions.push(Extension {
                    name: ident.to_string(),
                    schema: get_str(map, "schema", &ctx)?.unwrap_or_else(|| "public".to_string()),
                    version: get_str(map, "version", &ctx)?,
                    comment: get_str(map, "description", &ctx)?,
                    depends_on: Vec::new(),
                });
            }
            "language" => {
                let ctx = format!("language {}", ident);
                let map = as_map(value, &ctx)?;
                self.catalog.languages.push(Language {
                    name: ident.to_string(),
                    trusted: get_bool(map, "trusted", &ctx)?,
                    owner: get_str(map, "owner", &ctx)?,
                    comment: get_str(map, "description", &ctx)?,
                    depends_on: Vec::new(),
                });
            }
            "cast" => {
                let ctx = format!("cast {}", ident);
                let map = as_map(value, &ctx)?;
                let (source, target) = parse_cast_identifier(ident, &ctx)?;
                let (function, function_arguments) = match get_str(map, "function", &ctx)? {
                    Some(signature) => {
                        let (name, args) = split_signature(&signature, &ctx)?;
                        (Some(name), Some(args))
                    }
                    None => (None, None),
                };
                self.catalog.casts.push(Cast {
                    source,
                    target,
                    function,
                    function_arguments,
                    context: get_str(map, "context", &ctx)?,
                    method: get_str(map, "method", &ctx)?,
                    comment: get_str(map, "description", &ctx)?,
                    depends_on: Vec::new(),
                });
            }
            "event trigger" => {
                let ctx = format!("event trigger {}", ident);
                let map = as_map(value, &ctx)?;
                self.catalog.event_triggers.push(EventTrigger {
                    name: ident.to_string(),
                    event: req_str(map, "event", &ctx)?,
                    tags: get_str_list(map, "tags", &ctx)?,
                    function: req_str(map, "procedure", &ctx)?,
                    enabled: !map.contains_key(Value::String("enabled".to_string()))
                        || get_bool(map, "enabled", &ctx)?,
                    owner: get_str(map, "owner", &ctx)?,
                    comment: get_str(map, "description", &ctx)?,
                    depends_on: Vec::new(),
                });
            }
            "foreign data wrapper" => {
                let ctx = format!("foreign data wrapper {}", ident);
                let map = as_map(value, &ctx)?;
                self.catalog.foreign_data_wrappers.push(ForeignDataWrapper {
                    name: ident.to_string(),
                    handler: get_str(map, "handler", &ctx)?,
                    validator: get_str(map, "validator", &ctx)?,
                    options: parse_options_map(map, &ctx)?,
                    owner: get_str(map, "owner", &ctx)?,
                    comment: get_str(map, "description", &ctx)?,
                    depends_on: Vec::new(),
                });
            }
            "server" => {
                let ctx = format!("server {}", ident);
                let map = as_map(value, &ctx)?;
                self.catalog.foreign_servers.push(ForeignServer {
                    name: ident.to_string(),
                    wrapper: req_str(map, "wrapper", &ctx)?,
                    server_type: get_str(map, "type", &ctx)?,
                    version: get_str(map, "version", &ctx)?,
                    options: parse_options_map(map, &ctx)?,
                    owner: get_str(map, "owner", &ctx)?,
                    comment: get_str(map, "description", &ctx)?,
                    depends_on: Vec::new(),
                });
            }
            "user mapping" => {
                // "user mapping for <user> server <server>"
                let ctx = format!("user mapping {}", ident);
                let map = as_map(value, &ctx)?;
                let rest = ident
                    .strip_prefix("for ")
                    .ok_or_else(|| anyhow!("{}: identifier must be \"for <user> server <server>\"", ctx))?;
                let (user, server) = rest
                    .split_once(" server ")
                    .ok_or_else(|| anyhow!("{}: identifier must be \"for <user> server <server>\"", ctx))?;
                self.catalog.user_mappings.push(UserMapping {
                    user: user.to_string(),
                    server: server.to_string(),
                    options: parse_options_map(map, &ctx)?,
                    depends_on: Vec::new(),
                });
            }
            other => bail!("unknown top-level object kind {:?}", other),
        }
        Ok(())
    }
}

fn parse_options_map(map: &Mapping, ctx: &str) -> Result<BTreeMap<String, String>> {
    match map.get(Value::String("options".to_string())) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Mapping(options)) => {
            let mut result = BTreeMap::new();
            for (key, value) in options {
                let key = key
                    .as_str()
                    .ok_or_else(|| anyhow!("{}: option names must be strings", ctx))?;
                let value = value
                    .as_str()
                    .map(String::from)
                    .or_else(|| value.as_i64().map(|n| n.to_string()))
                    .ok_or_else(|| anyhow!("{}: option {:?} must be a scalar", ctx, key))?;
                result.insert(key.to_string(), value);
            }
            Ok(result)
        }
        Some(_) => bail!("{}: options must be a mapping", ctx),
    }
}

/// "name(arg, arg)" -> (name, "arg, arg")
fn split_signature(ident: &str, ctx: &str) -> Result<(String, String)> {
    match ident.find('(') {
        Some(idx) => {
            let name = ident[..idx].trim().to_string();
            let args = ident[idx + 1..]
                .strip_suffix(')')
                .ok_or_else(|| anyhow!("{}: malformed signature {:?}", ctx, ident))?
                .trim()
                .to_string();
            Ok((name, args))
        }
        None => Ok((ident.trim().to_string(), String::new())),
    }
}

/// "name using method" -> (name, method)
fn split_using(ident: &str, ctx: &str) -> Result<(String, String)> {
    ident
        .split_once(" using ")
        .map(|(name, method)| (name.to_string(), method.to_string()))
        .ok_or_else(|| anyhow!("{}: identifier must be \"<name> using <method>\"", ctx))
}

/// "(source AS target)"
fn parse_cast_identifier(ident: &str, ctx: &str) -> Result<(String, String)> {
    let inner = ident
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| anyhow!("{}: cast identifier must be \"(source AS target)\"", ctx))?;
    let (source, target) = inner
        .split_once(" AS ")
        .ok_or_else(|| anyhow!("{}: cast identifier must be \"(source AS target)\"", ctx))?;
    Ok((source.trim().to_string(), target.trim().to_string()))
}

/// "table t1", "view public.v2" and friends.
fn parse_relation_hint(hint: &str, default_schema: &str, ctx: &str) -> Result<DbObjectId> {
    let (kind, ident) = split_object_key(hint);
    let (schema, name) = match ident.split_once('.') {
        Some((schema, name)) => (schema.to_string(), name.to_string()),
        None => (default_schema.to_string(), ident),
    };
    match kind.as_str() {
        "table" => Ok(DbObjectId::Table { schema, name }),
        "view" => Ok(DbObjectId::View { schema, name }),
        "materialized view" => Ok(DbObjectId::MaterializedView { schema, name }),
        "function" => {
            let (fn_name, arguments) = split_signature(&name, ctx)?;
            Ok(DbObjectId::Function {
                schema,
                name: fn_name,
                arguments,
            })
        }
        other => bail!("{}: unsupported depends_on kind {:?}", ctx, other),
    }
}

/// Parse a full mapping into a linked catalog.
pub fn mapping_to_catalog(value: &Value) -> Result<Catalog> {
    let top = match value {
        Value::Null => return Ok(Catalog::default()),
        other => as_map(other, "top level")?,
    };

    let mut loader = Loader::new();
    for (key, entry) in top {
        let key_str = key
            .as_str()
            .ok_or_else(|| anyhow!("top level: non-string key"))?;
        if !is_object_key(key_str) {
            bail!("top level: unknown key {:?}", key_str);
        }
        let (kind, ident) = split_object_key(key_str);
        loader.parse_top_level(&kind, &ident, entry)?;
    }

    let mut catalog = loader.catalog;

    // spec models always include the implicit public schema when anything
    // references it
    let references_public = catalog.tables.iter().any(|t| t.schema == "public")
        || catalog.views.iter().any(|v| v.schema == "public")
        || catalog.sequences.iter().any(|s| s.schema == "public")
        || catalog.functions.iter().any(|f| f.schema == "public");
    if references_public && !catalog.schemas.iter().any(|s| s.name == "public") {
        catalog.schemas.push(Schema {
            name: "public".to_string(),
            owner: None,
            comment: None,
            oldname: None,
        });
    }

    for schema in &catalog.schemas {
        if is_system_schema(&schema.name) {
            bail!("schema {}: system schemas cannot be described", schema.name);
        }
    }

    link::resolve(&mut catalog);
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(yaml: &str) -> Catalog {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        mapping_to_catalog(&value).unwrap()
    }

    #[test]
    fn test_load_table_with_constraints() {
        let catalog = load(
            r#"
schema public:
  table t1:
    columns:
      - c1: { not_null: true, type: integer }
      - c2: { type: smallint }
    primary_key:
      t1_pkey: { columns: [ c1 ] }
    check_constraints:
      t1_c2_check: { columns: [ c2 ], expression: "(c2 > 123)" }
"#,
        );
        assert_eq!(catalog.tables.len(), 1);
        let table = &catalog.tables[0];
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].name, "c1");
        assert!(table.columns[0].not_null);
        assert_eq!(catalog.constraints.len(), 2);
    }

    #[test]
    fn test_load_cross_schema_foreign_key() {
        let catalog = load(
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
schema s1:
  table t2:
    columns:
      - c21: { type: integer, not_null: true }
    primary_key:
      t2_pkey: { columns: [ c21 ] }
"#,
        );
        let fk = catalog
            .constraints
            .iter()
            .find(|c| c.name == "t1_c2_fkey")
            .unwrap();
        match &fk.constraint_type {
            ConstraintType::ForeignKey {
                referenced_schema,
                referenced_table,
                on_delete,
                ..
            } => {
                assert_eq!(referenced_schema, "s1");
                assert_eq!(referenced_table, "t2");
                assert_eq!(on_delete.as_deref(), Some("restrict"));
            }
            other => panic!("expected foreign key, got {:?}", other),
        }
        // the linker must resolve the FK to the referenced table's PK
        assert!(fk.depends_on.contains(&DbObjectId::Constraint {
            schema: "s1".into(),
            table: "t2".into(),
            name: "t2_pkey".into(),
        }));
    }

    #[test]
    fn test_unknown_attribute_is_pinpointed() {
        let value: Value = serde_yaml::from_str(
            r#"
schema public:
  table t1:
    columns:
      - c1: { type: integer }
    sparkle: true
"#,
        )
        .unwrap();
        let err = mapping_to_catalog(&value).unwrap_err().to_string();
        assert!(err.contains("table public.t1"), "error was: {}", err);
        assert!(err.contains("sparkle"), "error was: {}", err);
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let value: Value = serde_yaml::from_str("bogus: {}").unwrap();
        assert!(mapping_to_catalog(&value).is_err());
    }

    #[test]
    fn test_oldname_is_loaded() {
        let catalog = load(
            r#"
schema public:
  table t2:
    oldname: t1
    columns:
      - c1: { type: integer }
"#,
        );
        assert_eq!(catalog.tables[0].oldname.as_deref(), Some("t1"));
    }

    #[test]
    fn test_privileges_all_expansion() {
        let catalog = load(
            r#"
schema public:
  table t1:
    owner: postgres
    columns:
      - c1: { type: integer }
    privileges:
      - alice: [ all ]
"#,
        );
        let grant = catalog
            .grants
            .iter()
            .find(|g| g.grantee == GranteeType::Role("alice".into()))
            .unwrap();
        assert_eq!(grant.privileges.len(), 7);
    }
}
