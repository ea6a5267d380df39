//! Fetch views and materialized views, with dependencies derived from
//! pg_depend / pg_rewrite records rather than re-parsed SQL.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use std::collections::BTreeMap;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct View {
    pub schema: String,
    pub name: String,
    /// Raw `pg_get_viewdef` output.
    pub definition: String,
    pub materialized: bool,
    pub tablespace: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub oldname: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl View {
    pub fn id(&self) -> DbObjectId {
        if self.materialized {
            DbObjectId::MaterializedView {
                schema: self.schema.clone(),
                name: self.name.clone(),
            }
        } else {
            DbObjectId::View {
                schema: self.schema.clone(),
                name: self.name.clone(),
            }
        }
    }
}

impl DependsOn for View {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for View {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

/// Relations and functions each view's rewrite rule references.
async fn fetch_view_dependencies(
    conn: &mut PgConnection,
) -> Result<BTreeMap<(String, String), Vec<DbObjectId>>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT
            vn.nspname AS view_schema,
            v.relname AS view_name,
            rn.nspname AS ref_schema,
            rc.relname AS ref_name,
            rc.relkind::text AS ref_kind
        FROM pg_depend d
        JOIN pg_rewrite rw ON d.objid = rw.oid
        JOIN pg_class v ON rw.ev_class = v.oid
        JOIN pg_namespace vn ON v.relnamespace = vn.oid
        JOIN pg_class rc ON d.refclassid = 'pg_class'::regclass AND d.refobjid = rc.oid
        JOIN pg_namespace rn ON rc.relnamespace = rn.oid
        WHERE v.relkind IN ('v', 'm')
          AND rc.oid <> v.oid
          AND vn.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND rn.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')

        UNION

        SELECT DISTINCT
            vn.nspname,
            v.relname,
            fn.nspname,
            p.proname || '(' || pg_catalog.pg_get_function_identity_arguments(p.oid) || ')',
            'f'
        FROM pg_depend d
        JOIN pg_rewrite rw ON d.objid = rw.oid
        JOIN pg_class v ON rw.ev_class = v.oid
        JOIN pg_namespace vn ON v.relnamespace = vn.oid
        JOIN pg_proc p ON d.refclassid = 'pg_proc'::regclass AND d.refobjid = p.oid
        JOIN pg_namespace fn ON p.pronamespace = fn.oid
        WHERE v.relkind IN ('v', 'm')
          AND vn.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND fn.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut map: BTreeMap<(String, String), Vec<DbObjectId>> = BTreeMap::new();
    for row in rows {
        let view_key = (row.try_get("view_schema")?, row.try_get("view_name")?);
        let ref_schema: String = row.try_get("ref_schema")?;
        let ref_name: String = row.try_get("ref_name")?;
        let ref_kind: String = row.try_get("ref_kind")?;

        let dep = match ref_kind.as_str() {
            "r" | "p" => DbObjectId::Table {
                schema: ref_schema,
                name: ref_name,
            },
            "v" => DbObjectId::View {
                schema: ref_schema,
                name: ref_name,
            },
            "m" => DbObjectId::MaterializedView {
                schema: ref_schema,
                name: ref_name,
            },
            "f" => {
                // name carries "proname(args)"
                let (fname, fargs) = match ref_name.split_once('(') {
                    Some((n, a)) => (n.to_string(), a.trim_end_matches(')').to_string()),
                    None => (ref_name, String::new()),
                };
                DbObjectId::Function {
                    schema: ref_schema,
                    name: fname,
                    arguments: fargs,
                }
            }
            _ => continue,
        };

        let deps = map.entry(view_key).or_default();
        if !deps.contains(&dep) {
            deps.push(dep);
        }
    }
    Ok(map)
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<View>> {
    info!("Fetching views...");
    let mut dep_map = fetch_view_dependencies(&mut *conn).await?;

    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.relname AS view_name,
            pg_catalog.pg_get_viewdef(c.oid, true) AS definition,
            c.relkind = 'm' AS materialized,
            ts.spcname AS tablespace,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_class c
        JOIN pg_namespace n ON c.relnamespace = n.oid
        JOIN pg_roles r ON c.relowner = r.oid
        LEFT JOIN pg_tablespace ts ON c.reltablespace = ts.oid
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE c.relkind IN ('v', 'm')
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.relname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut views = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let name: String = row.try_get("view_name")?;
        let definition: Option<String> = row.try_get("definition")?;

        // A NULL definition means a damaged catalog entry; skip but keep going.
        let Some(definition) = definition else {
            tracing::warn!("skipping view {}.{}: no definition available", schema, name);
            continue;
        };

        let mut depends_on = vec![DbObjectId::Schema {
            name: schema.clone(),
        }];
        if let Some(deps) = dep_map.remove(&(schema.clone(), name.clone())) {
            depends_on.extend(deps);
        }

        views.push(View {
            schema,
            name,
            definition,
            materialized: row.try_get("materialized")?,
            tablespace: row.try_get("tablespace")?,
            owner: row.try_get("owner")?,
            comment: row.try_get("comment")?,
            oldname: None,
            depends_on,
        });
    }

    Ok(views)
}
