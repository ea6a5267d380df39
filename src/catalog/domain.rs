//! Fetch domains and their check constraints.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainCheck {
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone)]
pub struct Domain {
    pub schema: String,
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub check_constraints: Vec<DomainCheck>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Domain {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Domain {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Domain {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Domain {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Domain>> {
    info!("Fetching domains...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            t.typname AS domain_name,
            pg_catalog.format_type(t.typbasetype, t.typtypmod) AS data_type,
            bn.nspname AS base_schema,
            bt.typname AS base_name,
            t.typnotnull AS not_null,
            t.typdefault AS default_value,
            r.rolname AS owner,
            d.description AS comment,
            ARRAY(
                SELECT c.conname || E'\x01' || pg_catalog.pg_get_expr(c.conbin, 0)
                FROM pg_constraint c
                WHERE c.contypid = t.oid AND c.contype = 'c'
                ORDER BY c.conname
            ) AS checks
        FROM pg_type t
        JOIN pg_namespace n ON t.typnamespace = n.oid
        JOIN pg_roles r ON t.typowner = r.oid
        LEFT JOIN pg_type bt ON t.typbasetype = bt.oid
        LEFT JOIN pg_namespace bn ON bt.typnamespace = bn.oid
        LEFT JOIN pg_description d ON d.objoid = t.oid AND d.objsubid = 0
        WHERE t.typtype = 'd'
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = t.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, t.typname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut domains = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let base_schema: Option<String> = row.try_get("base_schema")?;
        let base_name: Option<String> = row.try_get("base_name")?;

        let mut depends_on = vec![DbObjectId::Schema {
            name: schema.clone(),
        }];
        if let (Some(bs), Some(bn)) = (base_schema, base_name) {
            if !is_system_schema(&bs) {
                depends_on.push(DbObjectId::Type {
                    schema: bs,
                    name: bn,
                });
            }
        }

        let raw_checks: Vec<String> = row.try_get("checks")?;
        let check_constraints = raw_checks
            .iter()
            .filter_map(|raw| {
                let (name, expression) = raw.split_once('\x01')?;
                Some(DomainCheck {
                    name: name.to_string(),
                    expression: expression.to_string(),
                })
            })
            .collect();

        domains.push(Domain {
            schema,
            name: row.try_get("domain_name")?,
            data_type: row.try_get("data_type")?,
            not_null: row.try_get("not_null")?,
            default: row.try_get("default_value")?,
            check_constraints,
            owner: row.try_get("owner")?,
            comment: row.try_get("comment")?,
            depends_on,
        });
    }

    Ok(domains)
}
