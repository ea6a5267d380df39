//! Fetch user-defined encoding conversions.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct Conversion {
    pub schema: String,
    pub name: String,
    pub source_encoding: String,
    pub dest_encoding: String,
    pub function: String,
    pub default: bool,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Conversion {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Conversion {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Conversion {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Conversion {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Conversion>> {
    info!("Fetching conversions...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.conname AS conversion_name,
            pg_catalog.pg_encoding_to_char(c.conforencoding) AS source_encoding,
            pg_catalog.pg_encoding_to_char(c.contoencoding) AS dest_encoding,
            fn.nspname || '.' || p.proname AS function,
            c.condefault AS is_default,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_conversion c
        JOIN pg_namespace n ON c.connamespace = n.oid
        JOIN pg_roles r ON c.conowner = r.oid
        JOIN pg_proc p ON c.conproc = p.oid
        JOIN pg_namespace fn ON p.pronamespace = fn.oid
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.conname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            Ok(Conversion {
                depends_on: vec![DbObjectId::Schema {
                    name: schema.clone(),
                }],
                schema,
                name: row.try_get("conversion_name")?,
                source_encoding: row.try_get("source_encoding")?,
                dest_encoding: row.try_get("dest_encoding")?,
                function: row.try_get("function")?,
                default: row.try_get("is_default")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}
