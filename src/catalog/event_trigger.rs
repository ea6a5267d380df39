//! Fetch event triggers from pg_event_trigger.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;

#[derive(Debug, Clone)]
pub struct EventTrigger {
    pub name: String,
    /// ddl_command_start, ddl_command_end, table_rewrite or sql_drop.
    pub event: String,
    pub tags: Vec<String>,
    pub function: String,
    pub enabled: bool,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl EventTrigger {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::EventTrigger {
            name: self.name.clone(),
        }
    }
}

impl DependsOn for EventTrigger {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for EventTrigger {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<EventTrigger>> {
    info!("Fetching event triggers...");
    let rows = sqlx::query(
        r#"
        SELECT
            e.evtname AS trigger_name,
            e.evtevent AS event,
            COALESCE(e.evttags, ARRAY[]::text[]) AS tags,
            fn.nspname AS function_schema,
            p.proname AS function_name,
            e.evtenabled::text <> 'D' AS enabled,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_event_trigger e
        JOIN pg_proc p ON e.evtfoid = p.oid
        JOIN pg_namespace fn ON p.pronamespace = fn.oid
        JOIN pg_roles r ON e.evtowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = e.oid AND d.objsubid = 0
        WHERE NOT EXISTS (
            SELECT 1 FROM pg_depend dep
            WHERE dep.objid = e.oid AND dep.deptype = 'e'
        )
        ORDER BY e.evtname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let function_schema: String = row.try_get("function_schema")?;
            let function_name: String = row.try_get("function_name")?;
            let depends_on = if is_system_schema(&function_schema) {
                Vec::new()
            } else {
                vec![DbObjectId::Function {
                    schema: function_schema.clone(),
                    name: function_name.clone(),
                    arguments: String::new(),
                }]
            };
            Ok(EventTrigger {
                name: row.try_get("trigger_name")?,
                event: row.try_get("event")?,
                tags: row.try_get("tags")?,
                function: format!("{}.{}", function_schema, function_name),
                enabled: row.try_get("enabled")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
                depends_on,
            })
        })
        .collect()
}
