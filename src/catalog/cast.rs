//! Fetch user-defined casts.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;

#[derive(Debug, Clone)]
pub struct Cast {
    pub source: String,
    pub target: String,
    /// Schema-qualified cast function; None for binary-coercible or I/O casts.
    pub function: Option<String>,
    pub function_arguments: Option<String>,
    /// "assignment", "implicit" or None for explicit-only.
    pub context: Option<String>,
    /// "inout" for WITH INOUT casts, "binary" for WITHOUT FUNCTION.
    pub method: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Cast {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Cast {
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }
}

impl DependsOn for Cast {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Cast {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Cast>> {
    info!("Fetching casts...");
    let rows = sqlx::query(
        r#"
        SELECT
            pg_catalog.format_type(c.castsource, NULL) AS source,
            pg_catalog.format_type(c.casttarget, NULL) AS target,
            sn.nspname AS source_schema,
            st.typname AS source_name,
            tn.nspname AS target_schema,
            tt.typname AS target_name,
            CASE WHEN c.castfunc <> 0
                 THEN fn.nspname || '.' || p.proname END AS function,
            CASE WHEN c.castfunc <> 0
                 THEN pg_catalog.pg_get_function_identity_arguments(p.oid) END AS function_args,
            CASE c.castcontext::text
                WHEN 'a' THEN 'assignment'
                WHEN 'i' THEN 'implicit'
            END AS context,
            CASE c.castmethod::text
                WHEN 'i' THEN 'inout'
                WHEN 'b' THEN 'binary'
            END AS method,
            d.description AS comment
        FROM pg_cast c
        JOIN pg_type st ON c.castsource = st.oid
        JOIN pg_namespace sn ON st.typnamespace = sn.oid
        JOIN pg_type tt ON c.casttarget = tt.oid
        JOIN pg_namespace tn ON tt.typnamespace = tn.oid
        LEFT JOIN pg_proc p ON c.castfunc = p.oid
        LEFT JOIN pg_namespace fn ON p.pronamespace = fn.oid
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE (sn.nspname NOT IN ('pg_catalog', 'information_schema')
               OR tn.nspname NOT IN ('pg_catalog', 'information_schema'))
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY source, target
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut casts = Vec::new();
    for row in rows {
        let source_schema: String = row.try_get("source_schema")?;
        let source_name: String = row.try_get("source_name")?;
        let target_schema: String = row.try_get("target_schema")?;
        let target_name: String = row.try_get("target_name")?;
        let function: Option<String> = row.try_get("function")?;
        let function_arguments: Option<String> = row.try_get("function_args")?;

        let mut depends_on = Vec::new();
        if !is_system_schema(&source_schema) {
            depends_on.push(DbObjectId::Type {
                schema: source_schema,
                name: source_name,
            });
        }
        if !is_system_schema(&target_schema) {
            depends_on.push(DbObjectId::Type {
                schema: target_schema,
                name: target_name,
            });
        }
        if let (Some(func), Some(args)) = (&function, &function_arguments) {
            if let Some((fschema, fname)) = func.split_once('.') {
                if !is_system_schema(fschema) {
                    depends_on.push(DbObjectId::Function {
                        schema: fschema.to_string(),
                        name: fname.to_string(),
                        arguments: args.clone(),
                    });
                }
            }
        }

        casts.push(Cast {
            source: row.try_get("source")?,
            target: row.try_get("target")?,
            function,
            function_arguments,
            context: row.try_get("context")?,
            method: row.try_get("method")?,
            comment: row.try_get("comment")?,
            depends_on,
        });
    }

    Ok(casts)
}
