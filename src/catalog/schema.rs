//! Fetch user-defined schemas from pg_namespace
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
    /// Desired-side only: rename directive, never written back out.
    pub oldname: Option<String>,
}

impl Schema {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Schema {
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Schema {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &[]
    }
}

impl Commentable for Schema {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Schema>> {
    info!("Fetching schemas...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_namespace n
        JOIN pg_roles r ON n.nspowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = n.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND n.nspname NOT LIKE 'pg_temp_%'
          AND n.nspname NOT LIKE 'pg_toast_temp_%'
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = n.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(Schema {
                name: row.try_get("schema_name")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
                oldname: None,
            })
        })
        .collect()
}
