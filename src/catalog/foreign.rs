//! Fetch foreign-data objects: wrappers, servers, user mappings and
//! foreign tables.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use std::collections::BTreeMap;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::table::Column;

#[derive(Debug, Clone)]
pub struct ForeignDataWrapper {
    pub name: String,
    pub handler: Option<String>,
    pub validator: Option<String>,
    pub options: BTreeMap<String, String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl ForeignDataWrapper {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::ForeignDataWrapper {
            name: self.name.clone(),
        }
    }
}

impl DependsOn for ForeignDataWrapper {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for ForeignDataWrapper {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

#[derive(Debug, Clone)]
pub struct ForeignServer {
    pub name: String,
    pub wrapper: String,
    pub server_type: Option<String>,
    pub version: Option<String>,
    pub options: BTreeMap<String, String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl ForeignServer {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::ForeignServer {
            name: self.name.clone(),
        }
    }
}

impl DependsOn for ForeignServer {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for ForeignServer {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

#[derive(Debug, Clone)]
pub struct UserMapping {
    pub user: String,
    pub server: String,
    pub options: BTreeMap<String, String>,
    pub depends_on: Vec<DbObjectId>,
}

impl UserMapping {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::UserMapping {
            user: self.user.clone(),
            server: self.server.clone(),
        }
    }
}

impl DependsOn for UserMapping {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

#[derive(Debug, Clone)]
pub struct ForeignTable {
    pub schema: String,
    pub name: String,
    pub server: String,
    pub columns: Vec<Column>,
    pub options: BTreeMap<String, String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl ForeignTable {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::ForeignTable {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for ForeignTable {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for ForeignTable {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

/// Decode a text[] of "key=value" FDW options into a map.
pub fn decode_options(raw: Vec<String>) -> BTreeMap<String, String> {
    raw.into_iter()
        .filter_map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect()
}

pub async fn fetch_wrappers(conn: &mut PgConnection) -> Result<Vec<ForeignDataWrapper>> {
    info!("Fetching foreign data wrappers...");
    let rows = sqlx::query(
        r#"
        SELECT
            w.fdwname AS wrapper_name,
            NULLIF(w.fdwhandler::text, '-') AS handler,
            NULLIF(w.fdwvalidator::text, '-') AS validator,
            COALESCE(w.fdwoptions, ARRAY[]::text[]) AS options,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_foreign_data_wrapper w
        JOIN pg_roles r ON w.fdwowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = w.oid AND d.objsubid = 0
        WHERE NOT EXISTS (
            SELECT 1 FROM pg_depend dep
            WHERE dep.objid = w.oid AND dep.deptype = 'e'
        )
        ORDER BY w.fdwname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(ForeignDataWrapper {
                name: row.try_get("wrapper_name")?,
                handler: row.try_get("handler")?,
                validator: row.try_get("validator")?,
                options: decode_options(row.try_get("options")?),
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
                depends_on: Vec::new(),
            })
        })
        .collect()
}

pub async fn fetch_servers(conn: &mut PgConnection) -> Result<Vec<ForeignServer>> {
    info!("Fetching foreign servers...");
    let rows = sqlx::query(
        r#"
        SELECT
            s.srvname AS server_name,
            w.fdwname AS wrapper_name,
            s.srvtype AS server_type,
            s.srvversion AS version,
            COALESCE(s.srvoptions, ARRAY[]::text[]) AS options,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_foreign_server s
        JOIN pg_foreign_data_wrapper w ON s.srvfdw = w.oid
        JOIN pg_roles r ON s.srvowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = s.oid AND d.objsubid = 0
        WHERE NOT EXISTS (
            SELECT 1 FROM pg_depend dep
            WHERE dep.objid = s.oid AND dep.deptype = 'e'
        )
        ORDER BY s.srvname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let wrapper: String = row.try_get("wrapper_name")?;
            Ok(ForeignServer {
                name: row.try_get("server_name")?,
                depends_on: vec![DbObjectId::ForeignDataWrapper {
                    name: wrapper.clone(),
                }],
                wrapper,
                server_type: row.try_get("server_type")?,
                version: row.try_get("version")?,
                options: decode_options(row.try_get("options")?),
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}

pub async fn fetch_user_mappings(conn: &mut PgConnection) -> Result<Vec<UserMapping>> {
    info!("Fetching user mappings...");
    let rows = sqlx::query(
        r#"
        SELECT
            COALESCE(r.rolname, 'PUBLIC') AS user_name,
            s.srvname AS server_name,
            COALESCE(u.umoptions, ARRAY[]::text[]) AS options
        FROM pg_user_mapping u
        JOIN pg_foreign_server s ON u.umserver = s.oid
        LEFT JOIN pg_roles r ON u.umuser = r.oid
        ORDER BY user_name, s.srvname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let server: String = row.try_get("server_name")?;
            Ok(UserMapping {
                user: row.try_get("user_name")?,
                depends_on: vec![DbObjectId::ForeignServer {
                    name: server.clone(),
                }],
                server,
                options: decode_options(row.try_get("options")?),
            })
        })
        .collect()
}

pub async fn fetch_foreign_tables(conn: &mut PgConnection) -> Result<Vec<ForeignTable>> {
    info!("Fetching foreign tables...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.relname AS table_name,
            s.srvname AS server_name,
            COALESCE(ft.ftoptions, ARRAY[]::text[]) AS options,
            r.rolname AS owner,
            d.description AS comment,
            ARRAY(
                SELECT a.attname || E'\x01' ||
                       pg_catalog.format_type(a.atttypid, a.atttypmod) || E'\x01' ||
                       CASE WHEN a.attnotnull THEN 't' ELSE 'f' END
                FROM pg_attribute a
                WHERE a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
                ORDER BY a.attnum
            ) AS columns
        FROM pg_foreign_table ft
        JOIN pg_class c ON ft.ftrelid = c.oid
        JOIN pg_namespace n ON c.relnamespace = n.oid
        JOIN pg_foreign_server s ON ft.ftserver = s.oid
        JOIN pg_roles r ON c.relowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.relname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            let server: String = row.try_get("server_name")?;
            let raw_columns: Vec<String> = row.try_get("columns")?;
            let columns = raw_columns
                .iter()
                .filter_map(|raw| {
                    let mut parts = raw.splitn(3, '\x01');
                    Some(Column {
                        name: parts.next()?.to_string(),
                        data_type: parts.next()?.to_string(),
                        not_null: parts.next()? == "t",
                        default: None,
                        collation: None,
                        identity: None,
                        generated: None,
                        statistics: None,
                        storage: None,
                        comment: None,
                        oldname: None,
                        depends_on: Vec::new(),
                    })
                })
                .collect();
            Ok(ForeignTable {
                depends_on: vec![
                    DbObjectId::Schema {
                        name: schema.clone(),
                    },
                    DbObjectId::ForeignServer {
                        name: server.clone(),
                    },
                ],
                schema,
                name: row.try_get("table_name")?,
                server,
                columns,
                options: decode_options(row.try_get("options")?),
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_options() {
        let opts = decode_options(vec![
            "host=remote.example.com".to_string(),
            "port=5432".to_string(),
            "nonsense".to_string(),
        ]);
        assert_eq!(opts.get("host").map(String::as_str), Some("remote.example.com"));
        assert_eq!(opts.get("port").map(String::as_str), Some("5432"));
        assert_eq!(opts.len(), 2);
    }
}
