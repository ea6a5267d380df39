//! Layered configuration and object filtering.
//!
//! Config files merge system → user → repository → `-c` override, each a
//! small YAML mapping. Tool-owned environment variables use the crate
//! prefix: PGYAML_CONFIG_FILE renames the default config file,
//! PGYAML_SYS_CONFIG / PGYAML_USER_CONFIG move the search paths,
//! PGYAML_MAX_IDENT_LEN caps multiple-files filename length.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;

pub const DEFAULT_CONFIG_FILE: &str = "pgyaml.yaml";
pub const DEFAULT_MAX_IDENT_LEN: usize = 32;
pub const MAX_IDENT_LEN_LIMIT: usize = 63;

/// Raw configuration input - all fields optional for merging
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigInput {
    pub schemas: Option<SchemasInput>,
    pub tables: Option<TablesInput>,
    pub output: Option<OutputInput>,
    pub augmenter: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchemasInput {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TablesInput {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputInput {
    pub no_owner: Option<bool>,
    pub no_privileges: Option<bool>,
    pub multiple_files: Option<bool>,
}

/// Resolved configuration with defaults applied.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub filter: ObjectFilter,
    pub no_owner: bool,
    pub no_privileges: bool,
    pub multiple_files: bool,
    pub augmenter: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectFilter {
    pub include_schemas: Vec<String>,
    pub exclude_schemas: Vec<String>,
    pub include_tables: Vec<String>,
    pub exclude_tables: Vec<String>,
}

impl ObjectFilter {
    pub fn is_empty(&self) -> bool {
        self.include_schemas.is_empty()
            && self.exclude_schemas.is_empty()
            && self.include_tables.is_empty()
            && self.exclude_tables.is_empty()
    }

    pub fn keeps_schema(&self, schema: &str) -> bool {
        if self.exclude_schemas.iter().any(|s| s == schema) {
            return false;
        }
        self.include_schemas.is_empty() || self.include_schemas.iter().any(|s| s == schema)
    }

    pub fn keeps_table(&self, schema: &str, table: &str) -> bool {
        if !self.keeps_schema(schema) {
            return false;
        }
        if self.exclude_tables.iter().any(|t| t == table) {
            return false;
        }
        self.include_tables.is_empty() || self.include_tables.iter().any(|t| t == table)
    }
}

fn config_file_name() -> String {
    std::env::var("PGYAML_CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
}

fn system_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PGYAML_SYS_CONFIG") {
        return Some(PathBuf::from(path));
    }
    Some(PathBuf::from("/etc").join(config_file_name()))
}

fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PGYAML_USER_CONFIG") {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".config").join(config_file_name()))
}

fn read_config(path: &Path) -> Result<Option<ConfigInput>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    // reject unknown keys up front: a typoed key silently ignored is worse
    // than an error
    let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid YAML in {}", path.display()))?;
    for key in raw.keys() {
        if !matches!(key.as_str(), "schemas" | "tables" | "output" | "augmenter") {
            bail!("{}: unknown config key {:?}", path.display(), key);
        }
    }
    let input: ConfigInput = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(Some(input))
}

fn merge(base: &mut ConfigInput, overlay: ConfigInput) {
    if let Some(schemas) = overlay.schemas {
        let target = base.schemas.get_or_insert_with(Default::default);
        if schemas.include.is_some() {
            target.include = schemas.include;
        }
        if schemas.exclude.is_some() {
            target.exclude = schemas.exclude;
        }
    }
    if let Some(tables) = overlay.tables {
        let target = base.tables.get_or_insert_with(Default::default);
        if tables.include.is_some() {
            target.include = tables.include;
        }
        if tables.exclude.is_some() {
            target.exclude = tables.exclude;
        }
    }
    if let Some(output) = overlay.output {
        let target = base.output.get_or_insert_with(Default::default);
        if output.no_owner.is_some() {
            target.no_owner = output.no_owner;
        }
        if output.no_privileges.is_some() {
            target.no_privileges = output.no_privileges;
        }
        if output.multiple_files.is_some() {
            target.multiple_files = output.multiple_files;
        }
    }
    if overlay.augmenter.is_some() {
        base.augmenter = overlay.augmenter;
    }
}

/// Load and merge config layers: system, user, repository, explicit `-c`.
pub fn load(repo: Option<&Path>, explicit: Option<&Path>) -> Result<Config> {
    let mut merged = ConfigInput::default();

    if let Some(path) = system_config_path() {
        if let Some(input) = read_config(&path)? {
            merge(&mut merged, input);
        }
    }
    if let Some(path) = user_config_path() {
        if let Some(input) = read_config(&path)? {
            merge(&mut merged, input);
        }
    }
    if let Some(repo) = repo {
        if let Some(input) = read_config(&repo.join(config_file_name()))? {
            merge(&mut merged, input);
        }
    }
    if let Some(path) = explicit {
        match read_config(path)? {
            Some(input) => merge(&mut merged, input),
            None => bail!("config file {} does not exist", path.display()),
        }
    }

    let schemas = merged.schemas.unwrap_or_default();
    let tables = merged.tables.unwrap_or_default();
    let output = merged.output.unwrap_or_default();
    Ok(Config {
        filter: ObjectFilter {
            include_schemas: schemas.include.unwrap_or_default(),
            exclude_schemas: schemas.exclude.unwrap_or_default(),
            include_tables: tables.include.unwrap_or_default(),
            exclude_tables: tables.exclude.unwrap_or_default(),
        },
        no_owner: output.no_owner.unwrap_or(false),
        no_privileges: output.no_privileges.unwrap_or(false),
        multiple_files: output.multiple_files.unwrap_or(false),
        augmenter: merged.augmenter,
    })
}

/// PGYAML_MAX_IDENT_LEN, clamped to the Postgres identifier limit.
pub fn max_ident_len() -> usize {
    std::env::var("PGYAML_MAX_IDENT_LEN")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .map(|v| v.min(MAX_IDENT_LEN_LIMIT))
        .unwrap_or(DEFAULT_MAX_IDENT_LEN)
}

/// Reduce a catalog to the schemas/tables the filter keeps, dropping
/// children of filtered-out objects along the way.
pub fn apply_filter(catalog: &Catalog, filter: &ObjectFilter) -> Catalog {
    if filter.is_empty() {
        return catalog.clone();
    }

    let mut filtered = catalog.clone();
    filtered.schemas.retain(|s| filter.keeps_schema(&s.name));
    filtered
        .tables
        .retain(|t| filter.keeps_table(&t.schema, &t.name));
    filtered
        .constraints
        .retain(|c| filter.keeps_table(&c.schema, &c.table));
    filtered
        .indexes
        .retain(|i| filter.keeps_table(&i.schema, &i.table));
    filtered
        .triggers
        .retain(|t| filter.keeps_table(&t.schema, &t.table_name));
    filtered
        .rules
        .retain(|r| filter.keeps_table(&r.schema, &r.table_name));
    filtered.views.retain(|v| filter.keeps_schema(&v.schema));
    filtered
        .sequences
        .retain(|s| match s.owning_table() {
            Some((schema, table)) => filter.keeps_table(&schema, &table),
            None => filter.keeps_schema(&s.schema),
        });
    filtered.functions.retain(|f| filter.keeps_schema(&f.schema));
    filtered
        .aggregates
        .retain(|a| filter.keeps_schema(&a.schema));
    filtered.types.retain(|t| filter.keeps_schema(&t.schema));
    filtered.domains.retain(|d| filter.keeps_schema(&d.schema));
    filtered
        .collations
        .retain(|c| filter.keeps_schema(&c.schema));
    filtered
        .conversions
        .retain(|c| filter.keeps_schema(&c.schema));
    filtered
        .operators
        .retain(|o| filter.keeps_schema(&o.schema));
    filtered
        .operator_classes
        .retain(|o| filter.keeps_schema(&o.schema));
    filtered
        .operator_families
        .retain(|o| filter.keeps_schema(&o.schema));
    filtered
        .ts_parsers
        .retain(|p| filter.keeps_schema(&p.schema));
    filtered
        .ts_dictionaries
        .retain(|d| filter.keeps_schema(&d.schema));
    filtered
        .ts_templates
        .retain(|t| filter.keeps_schema(&t.schema));
    filtered
        .ts_configurations
        .retain(|c| filter.keeps_schema(&c.schema));
    filtered
        .foreign_tables
        .retain(|t| filter.keeps_table(&t.schema, &t.name));
    filtered.grants.retain(|g| {
        let id = g.object.db_object_id();
        match (id.schema(), &id) {
            (_, crate::catalog::id::DbObjectId::Table { schema, name })
            | (_, crate::catalog::id::DbObjectId::ForeignTable { schema, name }) => {
                filter.keeps_table(schema, name)
            }
            (Some(schema), _) => filter.keeps_schema(schema),
            (None, _) => true,
        }
    });

    filtered.rebuild_dependency_maps();
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_keeps_everything_by_default() {
        let filter = ObjectFilter::default();
        assert!(filter.keeps_schema("public"));
        assert!(filter.keeps_table("public", "t1"));
    }

    #[test]
    fn test_schema_include_excludes_others() {
        let filter = ObjectFilter {
            include_schemas: vec!["app".into()],
            ..Default::default()
        };
        assert!(filter.keeps_schema("app"));
        assert!(!filter.keeps_schema("public"));
    }

    #[test]
    fn test_table_exclusion_wins() {
        let filter = ObjectFilter {
            include_tables: vec!["t1".into(), "t2".into()],
            exclude_tables: vec!["t2".into()],
            ..Default::default()
        };
        assert!(filter.keeps_table("public", "t1"));
        assert!(!filter.keeps_table("public", "t2"));
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = ConfigInput {
            schemas: Some(SchemasInput {
                include: Some(vec!["a".into()]),
                exclude: None,
            }),
            ..Default::default()
        };
        merge(
            &mut base,
            ConfigInput {
                schemas: Some(SchemasInput {
                    include: Some(vec!["b".into()]),
                    exclude: None,
                }),
                ..Default::default()
            },
        );
        assert_eq!(base.schemas.unwrap().include.unwrap(), vec!["b"]);
    }
}
