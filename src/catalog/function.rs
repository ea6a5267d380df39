//! Fetch functions and procedures from pg_proc.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Procedure,
}

impl FunctionKind {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            FunctionKind::Function => "FUNCTION",
            FunctionKind::Procedure => "PROCEDURE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub schema: String,
    pub name: String,
    /// Identity argument list, e.g. "integer, text". Part of the key.
    pub arguments: String,
    /// Full argument list with names and defaults, used in CREATE.
    pub parameters: String,
    pub returns: Option<String>,
    pub language: String,
    pub source: String,
    pub kind: FunctionKind,
    pub volatility: Option<String>,
    pub strict: bool,
    pub security_definer: bool,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub oldname: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Function {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Function {
            schema: self.schema.clone(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

impl DependsOn for Function {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Function {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection, version: i32) -> Result<Vec<Function>> {
    info!("Fetching functions...");
    // prokind replaced proisagg/proiswindow in PG 11.
    let (kind_expr, not_aggregate) = if version >= 110_000 {
        ("p.prokind::text", "p.prokind IN ('f', 'p')")
    } else {
        ("'f'", "NOT p.proisagg AND NOT p.proiswindow")
    };

    let sql = format!(
        r#"
        SELECT
            n.nspname AS schema_name,
            p.proname AS function_name,
            pg_catalog.pg_get_function_identity_arguments(p.oid) AS arguments,
            pg_catalog.pg_get_function_arguments(p.oid) AS parameters,
            pg_catalog.pg_get_function_result(p.oid) AS returns,
            l.lanname AS language,
            p.prosrc AS source,
            {kind_expr} AS kind,
            CASE p.provolatile::text
                WHEN 'i' THEN 'immutable'
                WHEN 's' THEN 'stable'
            END AS volatility,
            p.proisstrict AS strict,
            p.prosecdef AS security_definer,
            r.rolname AS owner,
            d.description AS comment,
            ARRAY(
                SELECT tn.nspname || E'\x01' || t.typname
                FROM unnest(p.proargtypes || p.prorettype) AS at(oid)
                JOIN pg_type t ON t.oid = at.oid
                JOIN pg_namespace tn ON t.typnamespace = tn.oid
                WHERE tn.nspname NOT IN ('pg_catalog', 'information_schema')
            ) AS type_deps
        FROM pg_proc p
        JOIN pg_namespace n ON p.pronamespace = n.oid
        JOIN pg_language l ON p.prolang = l.oid
        JOIN pg_roles r ON p.proowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = p.oid AND d.objsubid = 0
        WHERE {not_aggregate}
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = p.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, p.proname, arguments
        "#
    );

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    let mut functions = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let language: String = row.try_get("language")?;
        let kind: String = row.try_get("kind")?;

        let mut depends_on = vec![DbObjectId::Schema {
            name: schema.clone(),
        }];
        if !matches!(language.as_str(), "sql" | "internal" | "c" | "plpgsql") {
            depends_on.push(DbObjectId::Language {
                name: language.clone(),
            });
        }
        let type_deps: Vec<String> = row.try_get("type_deps")?;
        for raw in type_deps {
            if let Some((tschema, tname)) = raw.split_once('\x01') {
                let dep = DbObjectId::Type {
                    schema: tschema.to_string(),
                    name: tname.to_string(),
                };
                if !depends_on.contains(&dep) {
                    depends_on.push(dep);
                }
            }
        }

        functions.push(Function {
            schema,
            name: row.try_get("function_name")?,
            arguments: row.try_get("arguments")?,
            parameters: row.try_get("parameters")?,
            returns: row.try_get("returns")?,
            language,
            source: row.try_get("source")?,
            kind: if kind == "p" {
                FunctionKind::Procedure
            } else {
                FunctionKind::Function
            },
            volatility: row.try_get("volatility")?,
            strict: row.try_get("strict")?,
            security_definer: row.try_get("security_definer")?,
            owner: row.try_get("owner")?,
            comment: row.try_get("comment")?,
            oldname: None,
            depends_on,
        });
    }

    Ok(functions)
}
