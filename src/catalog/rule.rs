//! Fetch rewrite rules from pg_rewrite.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct Rule {
    pub schema: String,
    pub table_name: String,
    pub name: String,
    /// Full `CREATE RULE` statement from pg_get_ruledef, kept verbatim.
    pub definition: String,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Rule {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Rule {
            schema: self.schema.clone(),
            table: self.table_name.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for Rule {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Rule {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Rule>> {
    info!("Fetching rules...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.relname AS table_name,
            rw.rulename AS rule_name,
            pg_catalog.pg_get_ruledef(rw.oid, true) AS definition,
            d.description AS comment,
            ARRAY(
                SELECT DISTINCT rn.nspname || '.' || rc.relname || '.' || rc.relkind
                FROM pg_depend dep
                JOIN pg_class rc ON dep.refclassid = 'pg_class'::regclass
                                AND dep.refobjid = rc.oid
                JOIN pg_namespace rn ON rc.relnamespace = rn.oid
                WHERE dep.objid = rw.oid
                  AND rc.oid <> c.oid
                  AND rn.nspname NOT IN ('pg_catalog', 'information_schema')
            ) AS relation_deps
        FROM pg_rewrite rw
        JOIN pg_class c ON rw.ev_class = c.oid
        JOIN pg_namespace n ON c.relnamespace = n.oid
        LEFT JOIN pg_description d ON d.objoid = rw.oid AND d.objsubid = 0
        WHERE rw.rulename <> '_RETURN'
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = c.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, c.relname, rw.rulename
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut rules = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let table_name: String = row.try_get("table_name")?;
        let definition: Option<String> = row.try_get("definition")?;
        let rule_name: String = row.try_get("rule_name")?;

        let Some(definition) = definition else {
            tracing::warn!(
                "skipping rule {} on {}.{}: no definition available",
                rule_name,
                schema,
                table_name
            );
            continue;
        };

        let mut depends_on = vec![DbObjectId::Table {
            schema: schema.clone(),
            name: table_name.clone(),
        }];
        let relation_deps: Vec<String> = row.try_get("relation_deps")?;
        for raw in relation_deps {
            let mut parts = raw.rsplitn(2, '.');
            let kind = parts.next().unwrap_or_default();
            if let Some(qualified) = parts.next() {
                if let Some((rschema, rname)) = qualified.split_once('.') {
                    let dep = match kind {
                        "v" => DbObjectId::View {
                            schema: rschema.to_string(),
                            name: rname.to_string(),
                        },
                        _ => DbObjectId::Table {
                            schema: rschema.to_string(),
                            name: rname.to_string(),
                        },
                    };
                    if !depends_on.contains(&dep) {
                        depends_on.push(dep);
                    }
                }
            }
        }

        rules.push(Rule {
            schema,
            table_name,
            name: rule_name,
            definition,
            comment: row.try_get("comment")?,
            depends_on,
        });
    }

    Ok(rules)
}
