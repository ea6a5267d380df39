//! Fetch triggers from pg_trigger.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;

#[derive(Debug, Clone)]
pub struct Trigger {
    pub schema: String,
    pub table_name: String,
    pub name: String,
    /// "before", "after" or "instead of".
    pub timing: String,
    /// Events in firing order: insert / update / delete / truncate.
    pub events: Vec<String>,
    /// "row" or "statement".
    pub level: String,
    /// Schema-qualified function name without arguments.
    pub function: String,
    pub function_arguments: String,
    pub condition: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Trigger {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Trigger {
            schema: self.schema.clone(),
            table: self.table_name.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Trigger {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Trigger {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

/// tgtype bit layout, per catalog/pg_trigger.h.
fn decode_tgtype(tgtype: i16) -> (String, Vec<String>, String) {
    let level = if tgtype & 1 != 0 { "row" } else { "statement" };
    let timing = if tgtype & 2 != 0 {
        "before"
    } else if tgtype & 64 != 0 {
        "instead of"
    } else {
        "after"
    };
    let mut events = Vec::new();
    if tgtype & 4 != 0 {
        events.push("insert".to_string());
    }
    if tgtype & 8 != 0 {
        events.push("delete".to_string());
    }
    if tgtype & 16 != 0 {
        events.push("update".to_string());
    }
    if tgtype & 32 != 0 {
        events.push("truncate".to_string());
    }
    (timing.to_string(), events, level.to_string())
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Trigger>> {
    info!("Fetching triggers...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.relname AS table_name,
            t.tgname AS trigger_name,
            t.tgtype AS tgtype,
            fn.nspname AS function_schema,
            p.proname AS function_name,
            pg_catalog.pg_get_function_identity_arguments(p.oid) AS function_args,
            (SELECT pg_catalog.pg_get_expr(t.tgqual, t.tgrelid)) AS condition,
            d.description AS comment
        FROM pg_trigger t
        JOIN pg_class c ON t.tgrelid = c.oid
        JOIN pg_namespace n ON c.relnamespace = n.oid
        JOIN pg_proc p ON t.tgfoid = p.oid
        JOIN pg_namespace fn ON p.pronamespace = fn.oid
        LEFT JOIN pg_description d ON d.objoid = t.oid AND d.objsubid = 0
        WHERE NOT t.tgisinternal
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.relname, t.tgname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut triggers = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let table_name: String = row.try_get("table_name")?;
        let function_schema: String = row.try_get("function_schema")?;
        let function_name: String = row.try_get("function_name")?;
        let function_args: String = row.try_get("function_args")?;
        let tgtype: i16 = row.try_get("tgtype")?;
        let (timing, events, level) = decode_tgtype(tgtype);

        let mut depends_on = vec![DbObjectId::Table {
            schema: schema.clone(),
            name: table_name.clone(),
        }];
        if !is_system_schema(&function_schema) {
            depends_on.push(DbObjectId::Function {
                schema: function_schema.clone(),
                name: function_name.clone(),
                arguments: function_args.clone(),
            });
        }

        triggers.push(Trigger {
            schema,
            table_name,
            name: row.try_get("trigger_name")?,
            timing,
            events,
            level,
            function: format!("{}.{}", function_schema, function_name),
            function_arguments: function_args,
            condition: row.try_get("condition")?,
            comment: row.try_get("comment")?,
            depends_on,
        });
    }

    Ok(triggers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tgtype_before_insert_row() {
        // ROW | BEFORE | INSERT
        let (timing, events, level) = decode_tgtype(1 | 2 | 4);
        assert_eq!(timing, "before");
        assert_eq!(events, vec!["insert"]);
        assert_eq!(level, "row");
    }

    #[test]
    fn test_decode_tgtype_after_update_statement() {
        let (timing, events, level) = decode_tgtype(16);
        assert_eq!(timing, "after");
        assert_eq!(events, vec!["update"]);
        assert_eq!(level, "statement");
    }

    #[test]
    fn test_decode_tgtype_instead_of() {
        let (timing, _, _) = decode_tgtype(1 | 64 | 4);
        assert_eq!(timing, "instead of");
    }
}
