//! Fetch user-defined collations.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct Collation {
    pub schema: String,
    pub name: String,
    pub lc_collate: Option<String>,
    pub lc_ctype: Option<String>,
    /// "icu" or "libc" (PG 10+); None on older servers.
    pub provider: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Collation {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Collation {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Collation {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Collation {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection, version: i32) -> Result<Vec<Collation>> {
    info!("Fetching collations...");
    let provider_expr = if version >= 100_000 {
        "CASE c.collprovider::text WHEN 'i' THEN 'icu' WHEN 'c' THEN 'libc' END"
    } else {
        "NULL::text"
    };

    let sql = format!(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.collname AS collation_name,
            c.collcollate AS lc_collate,
            c.collctype AS lc_ctype,
            {provider_expr} AS provider,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_collation c
        JOIN pg_namespace n ON c.collnamespace = n.oid
        JOIN pg_roles r ON c.collowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.collname
        "#
    );

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            Ok(Collation {
                depends_on: vec![DbObjectId::Schema {
                    name: schema.clone(),
                }],
                schema,
                name: row.try_get("collation_name")?,
                lc_collate: row.try_get("lc_collate")?,
                lc_ctype: row.try_get("lc_ctype")?,
                provider: row.try_get("provider")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}
