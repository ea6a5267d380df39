//! Fetch user-installed procedural languages.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct Language {
    pub name: String,
    pub trusted: bool,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Language {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Language {
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Language {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Language {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Language>> {
    info!("Fetching languages...");
    let rows = sqlx::query(
        r#"
        SELECT
            l.lanname AS language_name,
            l.lanpltrusted AS trusted,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_language l
        JOIN pg_roles r ON l.lanowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = l.oid AND d.objsubid = 0
        WHERE l.lanispl
          AND l.lanname <> 'plpgsql'
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = l.oid AND dep.deptype = 'e'
          )
        ORDER BY l.lanname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(Language {
                name: row.try_get("language_name")?,
                trusted: row.try_get("trusted")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
                depends_on: Vec::new(),
            })
        })
        .collect()
}
