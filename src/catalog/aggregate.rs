//! Fetch aggregates from pg_aggregate.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;

#[derive(Debug, Clone)]
pub struct Aggregate {
    pub schema: String,
    pub name: String,
    pub arguments: String,
    pub sfunc: String,
    pub stype: String,
    pub finalfunc: Option<String>,
    pub combinefunc: Option<String>,
    pub initcond: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Aggregate {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Aggregate {
            schema: self.schema.clone(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

impl DependsOn for Aggregate {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Aggregate {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

fn push_function_dep(depends_on: &mut Vec<DbObjectId>, qualified: &str, arguments: &str) {
    if let Some((schema, name)) = qualified.split_once('.') {
        if !is_system_schema(schema) {
            depends_on.push(DbObjectId::Function {
                schema: schema.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            });
        }
    }
}

pub async fn fetch(conn: &mut PgConnection, version: i32) -> Result<Vec<Aggregate>> {
    info!("Fetching aggregates...");
    let is_aggregate = if version >= 110_000 {
        "p.prokind = 'a'"
    } else {
        "p.proisagg"
    };

    let sql = format!(
        r#"
        SELECT
            n.nspname AS schema_name,
            p.proname AS aggregate_name,
            pg_catalog.pg_get_function_identity_arguments(p.oid) AS arguments,
            sf_n.nspname || '.' || sf.proname AS sfunc,
            pg_catalog.pg_get_function_identity_arguments(sf.oid) AS sfunc_args,
            pg_catalog.format_type(a.aggtranstype, NULL) AS stype,
            CASE WHEN a.aggfinalfn <> 0
                 THEN ff_n.nspname || '.' || ff.proname END AS finalfunc,
            CASE WHEN a.aggfinalfn <> 0
                 THEN pg_catalog.pg_get_function_identity_arguments(ff.oid) END AS finalfunc_args,
            CASE WHEN a.aggcombinefn <> 0
                 THEN cf_n.nspname || '.' || cf.proname END AS combinefunc,
            CASE WHEN a.aggcombinefn <> 0
                 THEN pg_catalog.pg_get_function_identity_arguments(cf.oid) END AS combinefunc_args,
            a.agginitval AS initcond,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_aggregate a
        JOIN pg_proc p ON a.aggfnoid = p.oid
        JOIN pg_namespace n ON p.pronamespace = n.oid
        JOIN pg_roles r ON p.proowner = r.oid
        JOIN pg_proc sf ON a.aggtransfn = sf.oid
        JOIN pg_namespace sf_n ON sf.pronamespace = sf_n.oid
        LEFT JOIN pg_proc ff ON a.aggfinalfn = ff.oid
        LEFT JOIN pg_namespace ff_n ON ff.pronamespace = ff_n.oid
        LEFT JOIN pg_proc cf ON a.aggcombinefn = cf.oid
        LEFT JOIN pg_namespace cf_n ON cf.pronamespace = cf_n.oid
        LEFT JOIN pg_description d ON d.objoid = p.oid AND d.objsubid = 0
        WHERE {is_aggregate}
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = p.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, p.proname, arguments
        "#
    );

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    let mut aggregates = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let sfunc: String = row.try_get("sfunc")?;
        let sfunc_args: String = row.try_get("sfunc_args")?;
        let finalfunc: Option<String> = row.try_get("finalfunc")?;
        let finalfunc_args: Option<String> = row.try_get("finalfunc_args")?;
        let combinefunc: Option<String> = row.try_get("combinefunc")?;
        let combinefunc_args: Option<String> = row.try_get("combinefunc_args")?;
        let stype: String = row.try_get("stype")?;

        let mut depends_on = vec![DbObjectId::Schema {
            name: schema.clone(),
        }];
        push_function_dep(&mut depends_on, &sfunc, &sfunc_args);
        if let (Some(ff), Some(ff_args)) = (&finalfunc, &finalfunc_args) {
            push_function_dep(&mut depends_on, ff, ff_args);
        }
        if let (Some(cf), Some(cf_args)) = (&combinefunc, &combinefunc_args) {
            push_function_dep(&mut depends_on, cf, cf_args);
        }
        if let Some((tschema, tname)) = stype.split_once('.') {
            if !is_system_schema(tschema) {
                depends_on.push(DbObjectId::Type {
                    schema: tschema.to_string(),
                    name: tname.to_string(),
                });
            }
        }

        aggregates.push(Aggregate {
            schema,
            name: row.try_get("aggregate_name")?,
            arguments: row.try_get("arguments")?,
            sfunc,
            stype,
            finalfunc,
            combinefunc,
            initcond: row.try_get("initcond")?,
            owner: row.try_get("owner")?,
            comment: row.try_get("comment")?,
            depends_on,
        });
    }

    Ok(aggregates)
}
