//! Fetch installed extensions. Member objects are excluded from the model
//! everywhere else; the extension record itself stands in for them.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct Extension {
    pub name: String,
    pub schema: String,
    pub version: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Extension {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Extension {
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Extension {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Extension {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Extension>> {
    info!("Fetching extensions...");
    let rows = sqlx::query(
        r#"
        SELECT
            e.extname AS extension_name,
            n.nspname AS schema_name,
            e.extversion AS version,
            d.description AS comment
        FROM pg_extension e
        JOIN pg_namespace n ON e.extnamespace = n.oid
        LEFT JOIN pg_description d ON d.objoid = e.oid AND d.objsubid = 0
        WHERE e.extname <> 'plpgsql'
        ORDER BY e.extname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            Ok(Extension {
                name: row.try_get("extension_name")?,
                depends_on: if schema == "pg_catalog" || schema == "public" {
                    Vec::new()
                } else {
                    vec![DbObjectId::Schema {
                        name: schema.clone(),
                    }]
                },
                schema,
                version: row.try_get("version")?,
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}
