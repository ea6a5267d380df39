//! Fetch table constraints: CHECK, PRIMARY KEY, UNIQUE and FOREIGN KEY.
//!
//! Every constraint is a standalone object keyed by (schema, table, name);
//! the YAML layer nests them under their table.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintType {
    Check {
        expression: String,
        columns: Vec<String>,
    },
    PrimaryKey {
        columns: Vec<String>,
    },
    Unique {
        columns: Vec<String>,
    },
    ForeignKey {
        columns: Vec<String>,
        referenced_schema: String,
        referenced_table: String,
        referenced_columns: Vec<String>,
        on_delete: Option<String>,
        on_update: Option<String>,
        deferrable: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub constraint_type: ConstraintType,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Constraint {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Constraint {
            schema: self.schema.clone(),
            table: self.table.clone(),
            name: self.name.clone(),
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self.constraint_type, ConstraintType::ForeignKey { .. })
    }
}

impl DependsOn for Constraint {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Constraint {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

fn referential_action(code: &str) -> Option<String> {
    match code {
        "r" => Some("restrict".to_string()),
        "c" => Some("cascade".to_string()),
        "n" => Some("set null".to_string()),
        "d" => Some("set default".to_string()),
        _ => None, // 'a' = NO ACTION, the default
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Constraint>> {
    info!("Fetching constraints...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            cl.relname AS table_name,
            c.conname AS constraint_name,
            c.contype::text AS contype,
            pg_catalog.pg_get_expr(c.conbin, c.conrelid) AS check_expression,
            ARRAY(
                SELECT a.attname
                FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
                ORDER BY k.ord
            ) AS columns,
            ref_n.nspname AS referenced_schema,
            ref_cl.relname AS referenced_table,
            ARRAY(
                SELECT a.attname
                FROM unnest(c.confkey) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = c.confrelid AND a.attnum = k.attnum
                ORDER BY k.ord
            ) AS referenced_columns,
            c.confdeltype::text AS on_delete,
            c.confupdtype::text AS on_update,
            c.condeferrable AS deferrable,
            ref_con.conname AS referenced_constraint,
            d.description AS comment
        FROM pg_constraint c
        JOIN pg_class cl ON c.conrelid = cl.oid
        JOIN pg_namespace n ON cl.relnamespace = n.oid
        LEFT JOIN pg_class ref_cl ON c.confrelid = ref_cl.oid
        LEFT JOIN pg_namespace ref_n ON ref_cl.relnamespace = ref_n.oid
        LEFT JOIN pg_constraint ref_con
            ON ref_con.conindid = c.conindid
           AND ref_con.conrelid = c.confrelid
           AND ref_con.contype IN ('p', 'u')
        LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0
        WHERE c.contype IN ('c', 'p', 'u', 'f')
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = cl.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, cl.relname, c.conname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut constraints = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let table: String = row.try_get("table_name")?;
        let name: String = row.try_get("constraint_name")?;
        let contype: String = row.try_get("contype")?;
        let columns: Vec<String> = row.try_get("columns")?;

        let mut depends_on = vec![DbObjectId::Table {
            schema: schema.clone(),
            name: table.clone(),
        }];

        let constraint_type = match contype.as_str() {
            "c" => ConstraintType::Check {
                expression: row
                    .try_get::<Option<String>, _>("check_expression")?
                    .unwrap_or_default(),
                columns,
            },
            "p" => ConstraintType::PrimaryKey { columns },
            "u" => ConstraintType::Unique { columns },
            "f" => {
                let referenced_schema: String = row.try_get("referenced_schema")?;
                let referenced_table: String = row.try_get("referenced_table")?;
                depends_on.push(DbObjectId::Table {
                    schema: referenced_schema.clone(),
                    name: referenced_table.clone(),
                });
                if let Some(ref_constraint) =
                    row.try_get::<Option<String>, _>("referenced_constraint")?
                {
                    depends_on.push(DbObjectId::Constraint {
                        schema: referenced_schema.clone(),
                        table: referenced_table.clone(),
                        name: ref_constraint,
                    });
                }
                let on_delete: String = row.try_get("on_delete")?;
                let on_update: String = row.try_get("on_update")?;
                ConstraintType::ForeignKey {
                    columns,
                    referenced_schema,
                    referenced_table,
                    referenced_columns: row.try_get("referenced_columns")?,
                    on_delete: referential_action(&on_delete),
                    on_update: referential_action(&on_update),
                    deferrable: row.try_get("deferrable")?,
                }
            }
            other => anyhow::bail!("unexpected constraint type {:?}", other),
        };

        constraints.push(Constraint {
            schema,
            table,
            name,
            constraint_type,
            comment: row.try_get("comment")?,
            depends_on,
        });
    }

    Ok(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referential_action_codes() {
        assert_eq!(referential_action("r").as_deref(), Some("restrict"));
        assert_eq!(referential_action("c").as_deref(), Some("cascade"));
        assert_eq!(referential_action("n").as_deref(), Some("set null"));
        assert_eq!(referential_action("d").as_deref(), Some("set default"));
        assert_eq!(referential_action("a"), None);
    }

    #[test]
    fn test_foreign_key_identification() {
        let fk = Constraint {
            schema: "public".into(),
            table: "t1".into(),
            name: "t1_c2_fkey".into(),
            constraint_type: ConstraintType::ForeignKey {
                columns: vec!["c2".into()],
                referenced_schema: "s1".into(),
                referenced_table: "t2".into(),
                referenced_columns: vec!["c21".into()],
                on_delete: None,
                on_update: None,
                deferrable: false,
            },
            comment: None,
            depends_on: vec![],
        };
        assert!(fk.is_foreign_key());

        let pk = Constraint {
            schema: "public".into(),
            table: "t1".into(),
            name: "t1_pkey".into(),
            constraint_type: ConstraintType::PrimaryKey {
                columns: vec!["c1".into()],
            },
            comment: None,
            depends_on: vec![],
        };
        assert!(!pk.is_foreign_key());
    }
}
