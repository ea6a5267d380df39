//! Fetch operators, operator classes and operator families.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;

#[derive(Debug, Clone)]
pub struct Operator {
    pub schema: String,
    pub name: String,
    pub left: Option<String>,
    pub right: Option<String>,
    /// Schema-qualified implementation function.
    pub function: String,
    pub commutator: Option<String>,
    pub negator: Option<String>,
    pub restrict: Option<String>,
    pub join: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Operator {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Operator {
            schema: self.schema.clone(),
            name: self.name.clone(),
            left: self.left.clone(),
            right: self.right.clone(),
        }
    }
}

impl DependsOn for Operator {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Operator {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

#[derive(Debug, Clone)]
pub struct OperatorClass {
    pub schema: String,
    pub name: String,
    pub method: String,
    pub type_name: String,
    pub default: bool,
    pub family: Option<String>,
    /// "strategy_number operator" entries in strategy order.
    pub operators: Vec<String>,
    /// "support_number function" entries in support order.
    pub functions: Vec<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl OperatorClass {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::OperatorClass {
            schema: self.schema.clone(),
            name: self.name.clone(),
            method: self.method.clone(),
        }
    }
}

impl DependsOn for OperatorClass {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for OperatorClass {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

#[derive(Debug, Clone)]
pub struct OperatorFamily {
    pub schema: String,
    pub name: String,
    pub method: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl OperatorFamily {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::OperatorFamily {
            schema: self.schema.clone(),
            name: self.name.clone(),
            method: self.method.clone(),
        }
    }
}

impl DependsOn for OperatorFamily {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for OperatorFamily {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch_operators(conn: &mut PgConnection) -> Result<Vec<Operator>> {
    info!("Fetching operators...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            o.oprname AS operator_name,
            CASE WHEN o.oprleft <> 0
                 THEN pg_catalog.format_type(o.oprleft, NULL) END AS left_type,
            CASE WHEN o.oprright <> 0
                 THEN pg_catalog.format_type(o.oprright, NULL) END AS right_type,
            fn.nspname || '.' || p.proname AS function,
            pg_catalog.pg_get_function_identity_arguments(p.oid) AS function_args,
            CASE WHEN o.oprcom <> 0 THEN com.oprname END AS commutator,
            CASE WHEN o.oprnegate <> 0 THEN neg.oprname END AS negator,
            NULLIF(o.oprrest::text, '-') AS restrict,
            NULLIF(o.oprjoin::text, '-') AS join,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_operator o
        JOIN pg_namespace n ON o.oprnamespace = n.oid
        JOIN pg_roles r ON o.oprowner = r.oid
        JOIN pg_proc p ON o.oprcode = p.oid
        JOIN pg_namespace fn ON p.pronamespace = fn.oid
        LEFT JOIN pg_operator com ON o.oprcom = com.oid
        LEFT JOIN pg_operator neg ON o.oprnegate = neg.oid
        LEFT JOIN pg_description d ON d.objoid = o.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = o.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, o.oprname, left_type, right_type
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut operators = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let function: String = row.try_get("function")?;
        let function_args: String = row.try_get("function_args")?;

        let mut depends_on = vec![DbObjectId::Schema {
            name: schema.clone(),
        }];
        if let Some((fschema, fname)) = function.split_once('.') {
            if !is_system_schema(fschema) {
                depends_on.push(DbObjectId::Function {
                    schema: fschema.to_string(),
                    name: fname.to_string(),
                    arguments: function_args,
                });
            }
        }
        for operand in [
            row.try_get::<Option<String>, _>("left_type")?,
            row.try_get::<Option<String>, _>("right_type")?,
        ]
        .into_iter()
        .flatten()
        {
            if let Some((tschema, tname)) = operand.split_once('.') {
                if !is_system_schema(tschema) {
                    let dep = DbObjectId::Type {
                        schema: tschema.to_string(),
                        name: tname.to_string(),
                    };
                    if !depends_on.contains(&dep) {
                        depends_on.push(dep);
                    }
                }
            }
        }

        operators.push(Operator {
            schema,
            name: row.try_get("operator_name")?,
            left: row.try_get("left_type")?,
            right: row.try_get("right_type")?,
            function,
            commutator: row.try_get("commutator")?,
            negator: row.try_get("negator")?,
            restrict: row.try_get("restrict")?,
            join: row.try_get("join")?,
            owner: row.try_get("owner")?,
            comment: row.try_get("comment")?,
            depends_on,
        });
    }

    Ok(operators)
}

pub async fn fetch_operator_classes(conn: &mut PgConnection) -> Result<Vec<OperatorClass>> {
    info!("Fetching operator classes...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            oc.opcname AS class_name,
            am.amname AS method,
            pg_catalog.format_type(oc.opcintype, NULL) AS type_name,
            oc.opcdefault AS is_default,
            CASE WHEN of.opfname <> oc.opcname THEN of.opfname END AS family,
            ARRAY(
                SELECT ao.amopstrategy || ' ' || o.oprname
                FROM pg_amop ao
                JOIN pg_operator o ON ao.amopopr = o.oid
                WHERE ao.amopfamily = oc.opcfamily
                ORDER BY ao.amopstrategy
            ) AS operators,
            ARRAY(
                SELECT ap.amprocnum || ' ' || p.proname
                FROM pg_amproc ap
                JOIN pg_proc p ON ap.amproc = p.oid
                WHERE ap.amprocfamily = oc.opcfamily
                ORDER BY ap.amprocnum
            ) AS functions,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_opclass oc
        JOIN pg_namespace n ON oc.opcnamespace = n.oid
        JOIN pg_am am ON oc.opcmethod = am.oid
        JOIN pg_roles r ON oc.opcowner = r.oid
        LEFT JOIN pg_opfamily of ON oc.opcfamily = of.oid
        LEFT JOIN pg_description d ON d.objoid = oc.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = oc.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, oc.opcname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            let method: String = row.try_get("method")?;
            let family: Option<String> = row.try_get("family")?;
            let mut depends_on = vec![DbObjectId::Schema {
                name: schema.clone(),
            }];
            if let Some(family) = &family {
                depends_on.push(DbObjectId::OperatorFamily {
                    schema: schema.clone(),
                    name: family.clone(),
                    method: method.clone(),
                });
            }
            Ok(OperatorClass {
                schema,
                name: row.try_get("class_name")?,
                method,
                type_name: row.try_get("type_name")?,
                default: row.try_get("is_default")?,
                family,
                operators: row.try_get("operators")?,
                functions: row.try_get("functions")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
                depends_on,
            })
        })
        .collect()
}

pub async fn fetch_operator_families(conn: &mut PgConnection) -> Result<Vec<OperatorFamily>> {
    info!("Fetching operator families...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            of.opfname AS family_name,
            am.amname AS method,
            r.rolname AS owner,
            d.description AS comment
        FROM pg_opfamily of
        JOIN pg_namespace n ON of.opfnamespace = n.oid
        JOIN pg_am am ON of.opfmethod = am.oid
        JOIN pg_roles r ON of.opfowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = of.oid AND d.objsubid = 0
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = of.oid AND dep.deptype = 'e'
          )
          -- implicitly-created families are covered by their class
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend adep
              WHERE adep.objid = of.oid AND adep.deptype = 'a'
          )
        ORDER BY n.nspname, of.opfname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            Ok(OperatorFamily {
                depends_on: vec![DbObjectId::Schema {
                    name: schema.clone(),
                }],
                schema,
                name: row.try_get("family_name")?,
                method: row.try_get("method")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
            })
        })
        .collect()
}
