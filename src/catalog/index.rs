//! Fetch indexes (excluding those backing constraints) via pg_index.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct Index {
    pub schema: String,
    pub name: String,
    pub table: String,
    /// Raw `pg_get_indexdef` output, kept verbatim. Expression indexes
    /// round-trip through this string.
    pub definition: String,
    /// Structured key list, present only when every key is a plain column.
    pub columns: Option<Vec<String>>,
    pub unique: bool,
    pub method: String,
    pub tablespace: Option<String>,
    pub comment: Option<String>,
    pub oldname: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Index {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Index {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Index {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Index {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Index>> {
    info!("Fetching indexes...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            ic.relname AS index_name,
            tc.relname AS table_name,
            pg_catalog.pg_get_indexdef(i.indexrelid) AS definition,
            i.indisunique AS is_unique,
            am.amname AS method,
            ts.spcname AS tablespace,
            i.indexprs IS NULL AND i.indpred IS NULL AS is_plain,
            CASE WHEN i.indexprs IS NULL THEN ARRAY(
                SELECT a.attname
                FROM unnest(i.indkey) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = k.attnum
                ORDER BY k.ord
            ) END AS columns,
            ARRAY(
                SELECT fn.nspname || '|' || p.proname || '|' ||
                       pg_catalog.pg_get_function_identity_arguments(p.oid)
                FROM pg_depend dep
                JOIN pg_proc p ON dep.refclassid = 'pg_proc'::regclass
                              AND dep.refobjid = p.oid
                JOIN pg_namespace fn ON p.pronamespace = fn.oid
                WHERE dep.objid = i.indexrelid
                  AND fn.nspname NOT IN ('pg_catalog', 'information_schema')
            ) AS function_deps,
            d.description AS comment
        FROM pg_index i
        JOIN pg_class ic ON i.indexrelid = ic.oid
        JOIN pg_class tc ON i.indrelid = tc.oid
        JOIN pg_namespace n ON tc.relnamespace = n.oid
        JOIN pg_am am ON ic.relam = am.oid
        LEFT JOIN pg_tablespace ts ON ic.reltablespace = ts.oid
        LEFT JOIN pg_description d ON d.objoid = ic.oid AND d.objsubid = 0
        WHERE NOT i.indisprimary
          AND NOT EXISTS (
              SELECT 1 FROM pg_constraint c WHERE c.conindid = i.indexrelid
          )
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = ic.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, ic.relname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut indexes = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let table: String = row.try_get("table_name")?;

        let mut depends_on = vec![DbObjectId::Table {
            schema: schema.clone(),
            name: table.clone(),
        }];
        let function_deps: Vec<String> = row.try_get("function_deps")?;
        for dep in function_deps {
            let mut parts = dep.splitn(3, '|');
            if let (Some(fschema), Some(fname), Some(fargs)) =
                (parts.next(), parts.next(), parts.next())
            {
                depends_on.push(DbObjectId::Function {
                    schema: fschema.to_string(),
                    name: fname.to_string(),
                    arguments: fargs.to_string(),
                });
            }
        }

        let is_plain: bool = row.try_get("is_plain")?;
        indexes.push(Index {
            schema,
            name: row.try_get("index_name")?,
            table,
            definition: row.try_get("definition")?,
            columns: if is_plain { row.try_get("columns")? } else { None },
            unique: row.try_get("is_unique")?,
            method: row.try_get("method")?,
            tablespace: row.try_get("tablespace")?,
            comment: row.try_get("comment")?,
            oldname: None,
            depends_on,
        });
    }

    Ok(indexes)
}
