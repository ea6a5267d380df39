//! Fetch text-search parsers, dictionaries, templates and configurations.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;

#[derive(Debug, Clone)]
pub struct TsParser {
    pub schema: String,
    pub name: String,
    pub start: String,
    pub gettoken: String,
    pub end: String,
    pub lextypes: String,
    pub headline: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl TsParser {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::TextSearchParser {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for TsParser {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for TsParser {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

#[derive(Debug, Clone)]
pub struct TsDictionary {
    pub schema: String,
    pub name: String,
    /// Schema-qualified template name.
    pub template: String,
    pub options: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl TsDictionary {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::TextSearchDictionary {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for TsDictionary {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for TsDictionary {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

#[derive(Debug, Clone)]
pub struct TsTemplate {
    pub schema: String,
    pub name: String,
    pub init: Option<String>,
    pub lexize: String,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl TsTemplate {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::TextSearchTemplate {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for TsTemplate {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for TsTemplate {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

#[derive(Debug, Clone)]
pub struct TsConfiguration {
    pub schema: String,
    pub name: String,
    /// Schema-qualified parser name.
    pub parser: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl TsConfiguration {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::TextSearchConfiguration {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for TsConfiguration {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for TsConfiguration {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch_parsers(conn: &mut PgConnection) -> Result<Vec<TsParser>> {
    info!("Fetching text search parsers...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            p.prsname AS parser_name,
            p.prsstart::text AS start_fn,
            p.prstoken::text AS gettoken_fn,
            p.prsend::text AS end_fn,
            p.prslextype::text AS lextypes_fn,
            NULLIF(p.prsheadline::text, '-') AS headline_fn,
            d.description AS comment
        FROM pg_ts_parser p
        JOIN pg_namespace n ON p.prsnamespace = n.oid
        LEFT JOIN pg_description d ON d.objoid = p.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = p.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, p.prsname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            Ok(TsParser {
                depends_on: vec![DbObjectId::Schema {
                    name: schema.clone(),
                }],
                schema,
                name: row.try_get("parser_name")?,
                start: row.try_get("start_fn")?,
                gettoken: row.try_get("gettoken_fn")?,
                end: row.try_get("end_fn")?,
                lextypes: row.try_get("lextypes_fn")?,
                headline: row.try_get("headline_fn")?,
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}

pub async fn fetch_dictionaries(conn: &mut PgConnection) -> Result<Vec<TsDictionary>> {
    info!("Fetching text search dictionaries...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            dic.dictname AS dictionary_name,
            tn.nspname || '.' || t.tmplname AS template,
            tn.nspname AS template_schema,
            t.tmplname AS template_name,
            dic.dictinitoption AS options,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_ts_dict dic
        JOIN pg_namespace n ON dic.dictnamespace = n.oid
        JOIN pg_roles r ON dic.dictowner = r.oid
        JOIN pg_ts_template t ON dic.dicttemplate = t.oid
        JOIN pg_namespace tn ON t.tmplnamespace = tn.oid
        LEFT JOIN pg_description d ON d.objoid = dic.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = dic.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, dic.dictname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            let template_schema: String = row.try_get("template_schema")?;
            let template_name: String = row.try_get("template_name")?;
            let mut depends_on = vec![DbObjectId::Schema {
                name: schema.clone(),
            }];
            if !is_system_schema(&template_schema) {
                depends_on.push(DbObjectId::TextSearchTemplate {
                    schema: template_schema,
                    name: template_name,
                });
            }
            Ok(TsDictionary {
                schema,
                name: row.try_get("dictionary_name")?,
                template: row.try_get("template")?,
                options: row.try_get("options")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
                depends_on,
            })
        })
        .collect()
}

pub async fn fetch_templates(conn: &mut PgConnection) -> Result<Vec<TsTemplate>> {
    info!("Fetching text search templates...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            t.tmplname AS template_name,
            NULLIF(t.tmplinit::text, '-') AS init_fn,
            t.tmpllexize::text AS lexize_fn,
            d.description AS comment
        FROM pg_ts_template t
        JOIN pg_namespace n ON t.tmplnamespace = n.oid
        LEFT JOIN pg_description d ON d.objoid = t.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = t.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, t.tmplname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            Ok(TsTemplate {
                depends_on: vec![DbObjectId::Schema {
                    name: schema.clone(),
                }],
                schema,
                name: row.try_get("template_name")?,
                init: row.try_get("init_fn")?,
                lexize: row.try_get("lexize_fn")?,
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}

pub async fn fetch_configurations(conn: &mut PgConnection) -> Result<Vec<TsConfiguration>> {
    info!("Fetching text search configurations...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.cfgname AS config_name,
            pn.nspname || '.' || p.prsname AS parser,
            pn.nspname AS parser_schema,
            p.prsname AS parser_name,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_ts_config c
        JOIN pg_namespace n ON c.cfgnamespace = n.oid
        JOIN pg_roles r ON c.cfgowner = r.oid
        JOIN pg_ts_parser p ON c.cfgparser = p.oid
        JOIN pg_namespace pn ON p.prsnamespace = pn.oid
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.cfgname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            let parser_schema: String = row.try_get("parser_schema")?;
            let parser_name: String = row.try_get("parser_name")?;
            let mut depends_on = vec![DbObjectId::Schema {
                name: schema.clone(),
            }];
            if !is_system_schema(&parser_schema) {
                depends_on.push(DbObjectId::TextSearchParser {
                    schema: parser_schema,
                    name: parser_name,
                });
            }
            Ok(TsConfiguration {
                schema,
                name: row.try_get("config_name")?,
                parser: row.try_get("parser")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
                depends_on,
            })
        })
        .collect()
}
