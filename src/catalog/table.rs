//! Fetch tables and their columns via pg_catalog.
//!
//! Constraints (including primary keys) are modeled separately in
//! `constraint.rs`; the YAML layer nests them back under their table.
use anyhow::Result;
use itertools::Itertools;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;
use crate::render::quote_ident;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    /// Non-default collation, schema-qualified when not in pg_catalog.
    pub collation: Option<String>,
    /// Identity kind: "always" or "by default" (PG 10+).
    pub identity: Option<String>,
    /// Generation expression for GENERATED ... STORED columns (PG 12+).
    pub generated: Option<String>,
    /// Explicit per-column statistics target, if set.
    pub statistics: Option<i32>,
    /// Explicit storage mode when it differs from the type default.
    pub storage: Option<String>,
    pub comment: Option<String>,
    /// Desired-side only: rename directive for this column.
    pub oldname: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub unlogged: bool,
    pub tablespace: Option<String>,
    /// Partition key definition for partitioned parents (PG 10+).
    pub partition_by: Option<String>,
    /// For partitions: parent table ("schema.table") and bound clause.
    pub partition_of: Option<String>,
    pub partition_bound: Option<String>,
    pub inherits: Vec<String>,
    pub options: Vec<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub oldname: Option<String>,

    table_dependencies: Vec<DbObjectId>,
    all_dependencies: Vec<DbObjectId>,
}

impl Table {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Table {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn compute_all_dependencies(&self) -> Vec<DbObjectId> {
        let mut all_deps = self.table_dependencies.clone();
        for column in &self.columns {
            for col_dep in &column.depends_on {
                if !all_deps.contains(col_dep) {
                    all_deps.push(col_dep.clone());
                }
            }
        }
        all_deps
    }

    pub fn update_all_dependencies(&mut self) {
        self.all_dependencies = self.compute_all_dependencies();
    }

    pub fn push_dependency(&mut self, dep: DbObjectId) {
        if !self.table_dependencies.contains(&dep) {
            self.table_dependencies.push(dep);
        }
        self.update_all_dependencies();
    }

    pub fn new(
        schema: String,
        name: String,
        columns: Vec<Column>,
        table_dependencies: Vec<DbObjectId>,
    ) -> Self {
        let mut table = Self {
            schema,
            name,
            columns,
            unlogged: false,
            tablespace: None,
            partition_by: None,
            partition_of: None,
            partition_bound: None,
            inherits: Vec::new(),
            options: Vec::new(),
            owner: None,
            comment: None,
            oldname: None,
            table_dependencies: table_dependencies.clone(),
            all_dependencies: table_dependencies,
        };
        table.update_all_dependencies();
        table
    }
}

impl DependsOn for Table {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.all_dependencies
    }
}

impl Commentable for Table {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

struct TableRow {
    schema: String,
    name: String,
    unlogged: bool,
    tablespace: Option<String>,
    partition_by: Option<String>,
    partition_of: Option<String>,
    partition_bound: Option<String>,
    inherits: Vec<String>,
    options: Vec<String>,
    owner: Option<String>,
    comment: Option<String>,
}

async fn fetch_all_tables(conn: &mut PgConnection, version: i32) -> Result<Vec<TableRow>> {
    // relkind 'p' (partitioned parent) and relispartition exist from PG 10.
    let (relkinds, partition_cols) = if version >= 100_000 {
        (
            "('r', 'p')",
            r#"
            CASE WHEN c.relkind = 'p' THEN pg_catalog.pg_get_partkeydef(c.oid) END AS partition_by,
            CASE WHEN c.relispartition THEN (
                SELECT pn.nspname || '.' || pc.relname
                FROM pg_inherits i
                JOIN pg_class pc ON i.inhparent = pc.oid
                JOIN pg_namespace pn ON pc.relnamespace = pn.oid
                WHERE i.inhrelid = c.oid
                LIMIT 1
            ) END AS partition_of,
            CASE WHEN c.relispartition
                 THEN pg_catalog.pg_get_expr(c.relpartbound, c.oid) END AS partition_bound,
            "#,
        )
    } else {
        (
            "('r')",
            r#"
            NULL::text AS partition_by,
            NULL::text AS partition_of,
            NULL::text AS partition_bound,
            "#,
        )
    };

    let sql = format!(
        r#"
        SELECT
            n.nspname AS table_schema,
            c.relname AS table_name,
            c.relpersistence = 'u' AS unlogged,
            ts.spcname AS tablespace,
            {partition_cols}
            ARRAY(
                SELECT pn.nspname || '.' || pc.relname
                FROM pg_inherits i
                JOIN pg_class pc ON i.inhparent = pc.oid
                JOIN pg_namespace pn ON pc.relnamespace = pn.oid
                WHERE i.inhrelid = c.oid
                ORDER BY i.inhseqno
            ) AS inherits,
            COALESCE(c.reloptions, ARRAY[]::text[]) AS options,
            r.rolname AS owner,
            d.description AS table_comment
        FROM pg_class c
        JOIN pg_namespace n ON c.relnamespace = n.oid
        JOIN pg_roles r ON c.relowner = r.oid
        LEFT JOIN pg_tablespace ts ON c.reltablespace = ts.oid
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE c.relkind IN {relkinds}
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.relname
        "#
    );

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.into_iter()
        .map(|row| {
            let partition_of: Option<String> = row.try_get("partition_of")?;
            Ok(TableRow {
                schema: row.try_get("table_schema")?,
                name: row.try_get("table_name")?,
                unlogged: row.try_get("unlogged")?,
                tablespace: row.try_get("tablespace")?,
                partition_by: row.try_get("partition_by")?,
                partition_bound: row.try_get("partition_bound")?,
                inherits: if partition_of.is_some() {
                    Vec::new() // partitions also show up in pg_inherits
                } else {
                    row.try_get("inherits")?
                },
                partition_of,
                options: row.try_get("options")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("table_comment")?,
            })
        })
        .collect()
}

struct ColumnRow {
    table_schema: String,
    table_name: String,
    column_name: String,
    data_type: String,
    type_schema: Option<String>,
    type_name: Option<String>,
    type_typtype: Option<String>,
    column_expr: Option<String>,
    identity: Option<String>,
    generated: bool,
    not_null: bool,
    collation: Option<String>,
    statistics: Option<i32>,
    storage: Option<String>,
    comment: Option<String>,
    is_extension_type: bool,
    extension_name: Option<String>,
}

async fn fetch_table_columns(conn: &mut PgConnection, version: i32) -> Result<Vec<ColumnRow>> {
    let identity_expr = if version >= 100_000 {
        "NULLIF(a.attidentity::text, '')"
    } else {
        "NULL::text"
    };
    let generated_expr = if version >= 120_000 {
        "a.attgenerated = 's'"
    } else {
        "false"
    };
    let relkinds = if version >= 100_000 { "('r', 'p')" } else { "('r')" };

    let sql = format!(
        r#"
        SELECT
          n.nspname AS table_schema,
          c.relname AS table_name,
          a.attname AS column_name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
          -- resolve array columns to their element type
          CASE WHEN t.typelem != 0 AND t.typlen = -1 THEN elem_tn.nspname
               ELSE tn.nspname END AS type_schema,
          CASE WHEN t.typelem != 0 AND t.typlen = -1 THEN elem_t.typname
               ELSE t.typname END AS type_name,
          CASE WHEN t.typelem != 0 AND t.typlen = -1 THEN elem_t.typtype::text
               ELSE t.typtype::text END AS type_typtype,
          pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) AS column_expr,
          {identity_expr} AS identity,
          {generated_expr} AS generated,
          a.attnotnull AS not_null,
          CASE WHEN a.attcollation <> t.typcollation THEN
            CASE WHEN coll_n.nspname = 'pg_catalog' THEN coll.collname
                 ELSE coll_n.nspname || '.' || coll.collname END
          END AS collation,
          CASE WHEN a.attstattarget > 0 THEN a.attstattarget::int4 END AS statistics,
          CASE WHEN a.attstorage <> t.typstorage THEN
            CASE a.attstorage::text
              WHEN 'p' THEN 'plain'
              WHEN 'e' THEN 'external'
              WHEN 'x' THEN 'extended'
              WHEN 'm' THEN 'main'
            END
          END AS storage,
          d.description AS column_comment,
          ext_types.extname IS NOT NULL AS is_extension_type,
          ext_types.extname AS extension_name
        FROM pg_attribute a
        LEFT JOIN pg_attrdef ad
          ON a.attrelid = ad.adrelid AND a.attnum = ad.adnum
        LEFT JOIN pg_type t ON a.atttypid = t.oid
        LEFT JOIN pg_namespace tn ON t.typnamespace = tn.oid
        LEFT JOIN pg_type elem_t ON t.typelem = elem_t.oid AND t.typelem != 0
        LEFT JOIN pg_namespace elem_tn ON elem_t.typnamespace = elem_tn.oid
        LEFT JOIN pg_collation coll ON a.attcollation = coll.oid
        LEFT JOIN pg_namespace coll_n ON coll.collnamespace = coll_n.oid
        LEFT JOIN pg_description d ON d.objoid = a.attrelid AND d.objsubid = a.attnum
        LEFT JOIN (
          SELECT DISTINCT dep.objid AS type_oid, e.extname
          FROM pg_depend dep
          JOIN pg_extension e ON dep.refobjid = e.oid
          WHERE dep.deptype = 'e'
        ) ext_types ON ext_types.type_oid = COALESCE(NULLIF(t.typelem, 0::oid), t.oid)
        JOIN pg_class c ON a.attrelid = c.oid
        JOIN pg_namespace n ON c.relnamespace = n.oid
        WHERE a.attnum > 0
          AND NOT a.attisdropped
          AND c.relkind IN {relkinds}
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.relname, a.attnum
        "#
    );

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.into_iter()
        .map(|row| {
            Ok(ColumnRow {
                table_schema: row.try_get("table_schema")?,
                table_name: row.try_get("table_name")?,
                column_name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                type_schema: row.try_get("type_schema")?,
                type_name: row.try_get("type_name")?,
                type_typtype: row.try_get("type_typtype")?,
                column_expr: row.try_get("column_expr")?,
                identity: row.try_get("identity")?,
                generated: row.try_get("generated")?,
                not_null: row.try_get("not_null")?,
                collation: row.try_get("collation")?,
                statistics: row.try_get("statistics")?,
                storage: row.try_get("storage")?,
                comment: row.try_get("column_comment")?,
                is_extension_type: row.try_get("is_extension_type")?,
                extension_name: row.try_get("extension_name")?,
            })
        })
        .collect()
}

/// Sequences reachable through column defaults ('a' deptype, i.e. SERIAL).
async fn fetch_sequence_dependencies(
    conn: &mut PgConnection,
) -> Result<std::collections::BTreeMap<(String, String, String), Vec<DbObjectId>>> {
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS table_schema,
            c.relname AS table_name,
            a.attname AS column_name,
            seq_n.nspname AS sequence_schema,
            seq_c.relname AS sequence_name
        FROM pg_depend d
        JOIN pg_attrdef ad ON d.objid = ad.oid
        JOIN pg_attribute a ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
        JOIN pg_class c ON a.attrelid = c.oid
        JOIN pg_namespace n ON c.relnamespace = n.oid
        JOIN pg_class seq_c ON d.refobjid = seq_c.oid
        JOIN pg_namespace seq_n ON seq_c.relnamespace = seq_n.oid
        WHERE d.refclassid = 'pg_class'::regclass
          AND seq_c.relkind = 'S'
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut map: std::collections::BTreeMap<(String, String, String), Vec<DbObjectId>> =
        std::collections::BTreeMap::new();
    for row in rows {
        let key = (
            row.try_get("table_schema")?,
            row.try_get("table_name")?,
            row.try_get("column_name")?,
        );
        map.entry(key).or_default().push(DbObjectId::Sequence {
            schema: row.try_get("sequence_schema")?,
            name: row.try_get("sequence_name")?,
        });
    }
    Ok(map)
}

/// User functions referenced from column defaults or generation expressions.
async fn fetch_function_dependencies(
    conn: &mut PgConnection,
) -> Result<std::collections::BTreeMap<(String, String, String), Vec<DbObjectId>>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT
            n.nspname AS table_schema,
            c.relname AS table_name,
            a.attname AS column_name,
            nf.nspname AS function_schema,
            pf.proname AS function_name,
            pg_catalog.pg_get_function_identity_arguments(pf.oid) AS function_args,
            (
                SELECT e.extname
                FROM pg_depend ext_dep
                JOIN pg_extension e ON ext_dep.refobjid = e.oid
                WHERE ext_dep.objid = pf.oid AND ext_dep.deptype = 'e'
                LIMIT 1
            ) AS extension_name
        FROM pg_depend d
        JOIN pg_attrdef ad ON d.classid = 'pg_attrdef'::regclass AND d.objid = ad.oid
        JOIN pg_attribute a ON a.attrelid = ad.adrelid AND a.attnum = ad.adnum
        JOIN pg_class c ON c.oid = a.attrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_proc pf ON d.refclassid = 'pg_proc'::regclass AND d.refobjid = pf.oid
        JOIN pg_namespace nf ON pf.pronamespace = nf.oid
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND nf.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut map: std::collections::BTreeMap<(String, String, String), Vec<DbObjectId>> =
        std::collections::BTreeMap::new();
    for row in rows {
        let key = (
            row.try_get("table_schema")?,
            row.try_get("table_name")?,
            row.try_get("column_name")?,
        );
        let extension_name: Option<String> = row.try_get("extension_name")?;
        map.entry(key).or_default().push(match extension_name {
            Some(name) => DbObjectId::Extension { name },
            None => DbObjectId::Function {
                schema: row.try_get("function_schema")?,
                name: row.try_get("function_name")?,
                arguments: row.try_get("function_args")?,
            },
        });
    }
    Ok(map)
}

fn initialize_tables(
    all_tables: Vec<TableRow>,
) -> (
    Vec<Table>,
    std::collections::BTreeMap<(String, String), usize>,
) {
    let mut tables = Vec::new();
    let mut table_index_map = std::collections::BTreeMap::new();

    for (idx, row) in all_tables.into_iter().enumerate() {
        table_index_map.insert((row.schema.clone(), row.name.clone()), idx);
        let mut table_deps = vec![DbObjectId::Schema {
            name: row.schema.clone(),
        }];
        for parent in row.inherits.iter().chain(row.partition_of.iter()) {
            if let Some((schema, name)) = parent.split_once('.') {
                table_deps.push(DbObjectId::Table {
                    schema: schema.to_string(),
                    name: name.to_string(),
                });
            }
        }
        tables.push(Table {
            schema: row.schema,
            name: row.name,
            columns: Vec::new(),
            unlogged: row.unlogged,
            tablespace: row.tablespace,
            partition_by: row.partition_by,
            partition_of: row.partition_of,
            partition_bound: row.partition_bound,
            inherits: row.inherits,
            options: row.options,
            owner: row.owner,
            comment: row.comment,
            oldname: None,
            table_dependencies: table_deps.clone(),
            all_dependencies: table_deps,
        });
    }

    (tables, table_index_map)
}

fn populate_columns(
    tables: &mut [Table],
    rows: Vec<ColumnRow>,
    table_index_map: &std::collections::BTreeMap<(String, String), usize>,
    function_dep_map: std::collections::BTreeMap<(String, String, String), Vec<DbObjectId>>,
    sequence_dep_map: std::collections::BTreeMap<(String, String, String), Vec<DbObjectId>>,
) {
    for ((schema, table), group) in &rows
        .into_iter()
        .chunk_by(|r| (r.table_schema.clone(), r.table_name.clone()))
    {
        let table_idx = match table_index_map.get(&(schema.clone(), table.clone())) {
            Some(&idx) => idx,
            None => continue,
        };

        let columns = group
            .map(|r| {
                let mut column_depends_on = Vec::new();

                if r.is_extension_type {
                    if let Some(ext_name) = &r.extension_name {
                        column_depends_on.push(DbObjectId::Extension {
                            name: ext_name.clone(),
                        });
                    }
                } else if let (Some(type_schema), Some(type_name)) =
                    (r.type_schema.clone(), r.type_name.clone())
                {
                    if !is_system_schema(&type_schema) {
                        if r.type_typtype.as_deref() == Some("d") {
                            column_depends_on.push(DbObjectId::Domain {
                                schema: type_schema,
                                name: type_name,
                            });
                        } else {
                            column_depends_on.push(DbObjectId::Type {
                                schema: type_schema,
                                name: type_name,
                            });
                        }
                    }
                }

                let key = (schema.clone(), table.clone(), r.column_name.clone());
                if let Some(funcs) = function_dep_map.get(&key) {
                    column_depends_on.extend(funcs.clone());
                }
                if let Some(seqs) = sequence_dep_map.get(&key) {
                    column_depends_on.extend(seqs.clone());
                }

                let data_type = match (&r.type_schema, &r.type_name) {
                    (Some(type_schema), Some(type_name))
                        if !is_system_schema(type_schema)
                            && !r.is_extension_type
                            && !r.data_type.contains('.') =>
                    {
                        // keep array dimensions from format_type output
                        let array_suffix = "[]".repeat(r.data_type.matches("[]").count());
                        format!(
                            "{}.{}{}",
                            quote_ident(type_schema),
                            quote_ident(type_name),
                            array_suffix
                        )
                    }
                    _ => r.data_type.clone(),
                };

                Column {
                    name: r.column_name,
                    data_type,
                    not_null: r.not_null,
                    generated: if r.generated { r.column_expr.clone() } else { None },
                    default: if r.generated { None } else { r.column_expr },
                    collation: r.collation,
                    identity: r.identity.map(|i| match i.as_str() {
                        "a" => "always".to_string(),
                        _ => "by default".to_string(),
                    }),
                    statistics: r.statistics,
                    storage: r.storage,
                    comment: r.comment,
                    oldname: None,
                    depends_on: column_depends_on,
                }
            })
            .collect::<Vec<_>>();

        tables[table_idx].columns = columns;
        tables[table_idx].update_all_dependencies();
    }
}

pub async fn fetch(conn: &mut PgConnection, version: i32) -> Result<Vec<Table>> {
    info!("Fetching tables...");
    let all_tables = fetch_all_tables(&mut *conn, version).await?;
    info!("Fetching table function dependencies...");
    let function_dep_map = fetch_function_dependencies(&mut *conn).await?;
    info!("Fetching table sequence dependencies...");
    let sequence_dep_map = fetch_sequence_dependencies(&mut *conn).await?;
    info!("Fetching table columns...");
    let column_rows = fetch_table_columns(&mut *conn, version).await?;

    let (mut tables, table_index_map) = initialize_tables(all_tables);
    populate_columns(
        &mut tables,
        column_rows,
        &table_index_map,
        function_dep_map,
        sequence_dep_map,
    );

    Ok(tables)
}

#[cfg(test)]
pub(crate) fn make_test_column(name: &str, data_type: &str, not_null: bool) -> Column {
    Column {
        name: name.to_string(),
        data_type: data_type.to_string(),
        not_null,
        default: None,
        collation: None,
        identity: None,
        generated: None,
        statistics: None,
        storage: None,
        comment: None,
        oldname: None,
        depends_on: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_dependencies_aggregate_column_deps() {
        let mut col = make_test_column("c1", "public.mood", false);
        col.depends_on.push(DbObjectId::Type {
            schema: "public".to_string(),
            name: "mood".to_string(),
        });

        let table = Table::new(
            "public".to_string(),
            "t1".to_string(),
            vec![col],
            vec![DbObjectId::Schema {
                name: "public".to_string(),
            }],
        );

        let deps = table.depends_on();
        assert!(deps.contains(&DbObjectId::Schema {
            name: "public".to_string()
        }));
        assert!(deps.contains(&DbObjectId::Type {
            schema: "public".to_string(),
            name: "mood".to_string()
        }));
    }

    #[test]
    fn test_duplicate_column_deps_collapse() {
        let mut c1 = make_test_column("a", "public.mood", false);
        let mut c2 = make_test_column("b", "public.mood", false);
        let dep = DbObjectId::Type {
            schema: "public".to_string(),
            name: "mood".to_string(),
        };
        c1.depends_on.push(dep.clone());
        c2.depends_on.push(dep.clone());

        let table = Table::new("public".to_string(), "t".to_string(), vec![c1, c2], vec![]);
        assert_eq!(table.depends_on().iter().filter(|d| **d == dep).count(), 1);
    }
}
