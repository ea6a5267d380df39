//! Fetch access privileges by exploding ACL arrays from the system catalogs.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use std::collections::BTreeMap;
use tracing::info;

use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GranteeType {
    Role(String),
    Public,
}

impl GranteeType {
    pub fn as_str(&self) -> &str {
        match self {
            GranteeType::Role(name) => name.as_str(),
            GranteeType::Public => "PUBLIC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ObjectType {
    Table { schema: String, name: String },
    View { schema: String, name: String },
    MaterializedView { schema: String, name: String },
    ForeignTable { schema: String, name: String },
    Schema { name: String },
    Function { schema: String, name: String, arguments: String },
    Sequence { schema: String, name: String },
    Type { schema: String, name: String },
    Domain { schema: String, name: String },
    Language { name: String },
    ForeignDataWrapper { name: String },
    ForeignServer { name: String },
}

impl ObjectType {
    pub fn db_object_id(&self) -> DbObjectId {
        match self {
            ObjectType::Table { schema, name } => DbObjectId::Table {
                schema: schema.clone(),
                name: name.clone(),
            },
            ObjectType::View { schema, name } => DbObjectId::View {
                schema: schema.clone(),
                name: name.clone(),
            },
            ObjectType::MaterializedView { schema, name } => DbObjectId::MaterializedView {
                schema: schema.clone(),
                name: name.clone(),
            },
            ObjectType::ForeignTable { schema, name } => DbObjectId::ForeignTable {
                schema: schema.clone(),
                name: name.clone(),
            },
            ObjectType::Schema { name } => DbObjectId::Schema { name: name.clone() },
            ObjectType::Function {
                schema,
                name,
                arguments,
            } => DbObjectId::Function {
                schema: schema.clone(),
                name: name.clone(),
                arguments: arguments.clone(),
            },
            ObjectType::Sequence { schema, name } => DbObjectId::Sequence {
                schema: schema.clone(),
                name: name.clone(),
            },
            ObjectType::Type { schema, name } => DbObjectId::Type {
                schema: schema.clone(),
                name: name.clone(),
            },
            ObjectType::Domain { schema, name } => DbObjectId::Domain {
                schema: schema.clone(),
                name: name.clone(),
            },
            ObjectType::Language { name } => DbObjectId::Language { name: name.clone() },
            ObjectType::ForeignDataWrapper { name } => {
                DbObjectId::ForeignDataWrapper { name: name.clone() }
            }
            ObjectType::ForeignServer { name } => DbObjectId::ForeignServer { name: name.clone() },
        }
    }

    /// The privilege set meaning "all" for this object class.
    pub fn all_privileges(&self) -> &'static [&'static str] {
        match self {
            ObjectType::Table { .. }
            | ObjectType::View { .. }
            | ObjectType::MaterializedView { .. }
            | ObjectType::ForeignTable { .. } => &[
                "SELECT",
                "INSERT",
                "UPDATE",
                "DELETE",
                "TRUNCATE",
                "REFERENCES",
                "TRIGGER",
            ],
            ObjectType::Schema { .. } => &["USAGE", "CREATE"],
            ObjectType::Function { .. } => &["EXECUTE"],
            ObjectType::Sequence { .. } => &["SELECT", "UPDATE", "USAGE"],
            ObjectType::Type { .. }
            | ObjectType::Domain { .. }
            | ObjectType::Language { .. }
            | ObjectType::ForeignDataWrapper { .. }
            | ObjectType::ForeignServer { .. } => &["USAGE"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Grant {
    pub grantee: GranteeType,
    pub object: ObjectType,
    pub privileges: Vec<String>,
    pub with_grant_option: bool,
    pub depends_on: Vec<DbObjectId>,
    /// Owner role of the object; owner grants are implicit and skipped.
    pub object_owner: String,
}

impl Grant {
    pub fn id(&self) -> String {
        let object_str = match &self.object {
            ObjectType::Table { schema, name } => format!("table:{}.{}", schema, name),
            ObjectType::View { schema, name } => format!("view:{}.{}", schema, name),
            ObjectType::MaterializedView { schema, name } => {
                format!("matview:{}.{}", schema, name)
            }
            ObjectType::ForeignTable { schema, name } => {
                format!("foreign_table:{}.{}", schema, name)
            }
            ObjectType::Schema { name } => format!("schema:{}", name),
            ObjectType::Function {
                schema,
                name,
                arguments,
            } => format!("function:{}.{}({})", schema, name, arguments),
            ObjectType::Sequence { schema, name } => format!("sequence:{}.{}", schema, name),
            ObjectType::Type { schema, name } => format!("type:{}.{}", schema, name),
            ObjectType::Domain { schema, name } => format!("domain:{}.{}", schema, name),
            ObjectType::Language { name } => format!("language:{}", name),
            ObjectType::ForeignDataWrapper { name } => format!("fdw:{}", name),
            ObjectType::ForeignServer { name } => format!("server:{}", name),
        };
        format!("{}@{}", self.grantee.as_str(), object_str)
    }
}

impl DependsOn for Grant {
    fn id(&self) -> DbObjectId {
        DbObjectId::Grant { id: self.id() }
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

struct AclRow {
    object: ObjectType,
    owner: String,
    grantee: GranteeType,
    privilege: String,
    grantable: bool,
}

/// Fold exploded ACL rows into one Grant per (object, grantee, grantable).
fn fold_acl_rows(rows: Vec<AclRow>) -> Vec<Grant> {
    let mut grouped: BTreeMap<(ObjectType, GranteeType, bool), (String, Vec<String>)> =
        BTreeMap::new();
    for row in rows {
        let entry = grouped
            .entry((row.object, row.grantee, row.grantable))
            .or_insert_with(|| (row.owner.clone(), Vec::new()));
        if !entry.1.contains(&row.privilege) {
            entry.1.push(row.privilege);
        }
    }

    grouped
        .into_iter()
        .map(|((object, grantee, grantable), (owner, privileges))| {
            let depends_on = vec![object.db_object_id()];
            Grant {
                grantee,
                object,
                privileges,
                with_grant_option: grantable,
                depends_on,
                object_owner: owner,
            }
        })
        .collect()
}

async fn fetch_relation_acls(conn: &mut PgConnection) -> Result<Vec<AclRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.relname AS object_name,
            c.relkind::text AS relkind,
            r.rolname AS owner,
            COALESCE(g.rolname, 'PUBLIC') AS grantee,
            acl.privilege_type AS privilege,
            acl.is_grantable AS grantable
        FROM pg_class c
        JOIN pg_namespace n ON c.relnamespace = n.oid
        JOIN pg_roles r ON c.relowner = r.oid
        CROSS JOIN LATERAL aclexplode(c.relacl) AS acl
        LEFT JOIN pg_roles g ON acl.grantee = g.oid
        WHERE c.relkind IN ('r', 'p', 'v', 'm', 'S', 'f')
          AND c.relacl IS NOT NULL
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

    let mut acl_rows = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let name: String = row.try_get("object_name")?;
        let relkind: String = row.try_get("relkind")?;
        let grantee: String = row.try_get("grantee")?;

        let object = match relkind.as_str() {
            "r" | "p" => ObjectType::Table { schema, name },
            "v" => ObjectType::View { schema, name },
            "m" => ObjectType::MaterializedView { schema, name },
            "S" => ObjectType::Sequence { schema, name },
            "f" => ObjectType::ForeignTable { schema, name },
            _ => continue,
        };
        acl_rows.push(AclRow {
            object,
            owner: row.try_get("owner")?,
            grantee: if grantee == "PUBLIC" {
                GranteeType::Public
            } else {
                GranteeType::Role(grantee)
            },
            privilege: row.try_get("privilege")?,
            grantable: row.try_get("grantable")?,
        });
    }
    Ok(acl_rows)
}

async fn fetch_namespace_acls(conn: &mut PgConnection) -> Result<Vec<AclRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS object_name,
            r.rolname AS owner,
            COALESCE(g.rolname, 'PUBLIC') AS grantee,
            acl.privilege_type AS privilege,
            acl.is_grantable AS grantable
        FROM pg_namespace n
        JOIN pg_roles r ON n.nspowner = r.oid
        CROSS JOIN LATERAL aclexplode(n.nspacl) AS acl
        LEFT JOIN pg_roles g ON acl.grantee = g.oid
        WHERE n.nspacl IS NOT NULL
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND n.nspname NOT LIKE 'pg_temp_%'
          AND n.nspname NOT LIKE 'pg_toast_temp_%'
        ORDER BY n.nspname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut acl_rows = Vec::new();
    for row in rows {
        let grantee: String = row.try_get("grantee")?;
        acl_rows.push(AclRow {
            object: ObjectType::Schema {
                name: row.try_get("object_name")?,
            },
            owner: row.try_get("owner")?,
            grantee: if grantee == "PUBLIC" {
                GranteeType::Public
            } else {
                GranteeType::Role(grantee)
            },
            privilege: row.try_get("privilege")?,
            grantable: row.try_get("grantable")?,
        });
    }
    Ok(acl_rows)
}

async fn fetch_function_acls(conn: &mut PgConnection) -> Result<Vec<AclRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            p.proname AS object_name,
            pg_catalog.pg_get_function_identity_arguments(p.oid) AS arguments,
            r.rolname AS owner,
            COALESCE(g.rolname, 'PUBLIC') AS grantee,
            acl.privilege_type AS privilege,
            acl.is_grantable AS grantable
        FROM pg_proc p
        JOIN pg_namespace n ON p.pronamespace = n.oid
        JOIN pg_roles r ON p.proowner = r.oid
        CROSS JOIN LATERAL aclexplode(p.proacl) AS acl
        LEFT JOIN pg_roles g ON acl.grantee = g.oid
        WHERE p.proacl IS NOT NULL
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = p.oid AND dep.deptype = 'e'
          )
        ORDER BY n.nspname, p.proname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut acl_rows = Vec::new();
    for row in rows {
        let grantee: String = row.try_get("grantee")?;
        acl_rows.push(AclRow {
            object: ObjectType::Function {
                schema: row.try_get("schema_name")?,
                name: row.try_get("object_name")?,
                arguments: row.try_get("arguments")?,
            },
            owner: row.try_get("owner")?,
            grantee: if grantee == "PUBLIC" {
                GranteeType::Public
            } else {
                GranteeType::Role(grantee)
            },
            privilege: row.try_get("privilege")?,
            grantable: row.try_get("grantable")?,
        });
    }
    Ok(acl_rows)
}

async fn fetch_type_acls(conn: &mut PgConnection) -> Result<Vec<AclRow>> {
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            t.typname AS object_name,
            t.typtype::text AS typtype,
            r.rolname AS owner,
            COALESCE(g.rolname, 'PUBLIC') AS grantee,
            acl.privilege_type AS privilege,
            acl.is_grantable AS grantable
        FROM pg_type t
        JOIN pg_namespace n ON t.typnamespace = n.oid
        JOIN pg_roles r ON t.typowner = r.oid
        CROSS JOIN LATERAL aclexplode(t.typacl) AS acl
        LEFT JOIN pg_roles g ON acl.grantee = g.oid
        WHERE t.typacl IS NOT NULL
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

    let mut acl_rows = Vec::new();
    for row in rows {
        let grantee: String = row.try_get("grantee")?;
        let typtype: String = row.try_get("typtype")?;
        let schema: String = row.try_get("schema_name")?;
        let name: String = row.try_get("object_name")?;
        acl_rows.push(AclRow {
            object: if typtype == "d" {
                ObjectType::Domain { schema, name }
            } else {
                ObjectType::Type { schema, name }
            },
            owner: row.try_get("owner")?,
            grantee: if grantee == "PUBLIC" {
                GranteeType::Public
            } else {
                GranteeType::Role(grantee)
            },
            privilege: row.try_get("privilege")?,
            grantable: row.try_get("grantable")?,
        });
    }
    Ok(acl_rows)
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Grant>> {
    info!("Fetching privileges...");
    let mut acl_rows = fetch_relation_acls(&mut *conn).await?;
    acl_rows.extend(fetch_namespace_acls(&mut *conn).await?);
    acl_rows.extend(fetch_function_acls(&mut *conn).await?);
    acl_rows.extend(fetch_type_acls(&mut *conn).await?);
    Ok(fold_acl_rows(acl_rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_collects_privileges_per_grantee() {
        let object = ObjectType::Table {
            schema: "public".into(),
            name: "t1".into(),
        };
        let rows = vec![
            AclRow {
                object: object.clone(),
                owner: "postgres".into(),
                grantee: GranteeType::Role("alice".into()),
                privilege: "SELECT".into(),
                grantable: false,
            },
            AclRow {
                object: object.clone(),
                owner: "postgres".into(),
                grantee: GranteeType::Role("alice".into()),
                privilege: "INSERT".into(),
                grantable: false,
            },
            AclRow {
                object,
                owner: "postgres".into(),
                grantee: GranteeType::Public,
                privilege: "SELECT".into(),
                grantable: false,
            },
        ];

        let grants = fold_acl_rows(rows);
        assert_eq!(grants.len(), 2);
        let alice = grants
            .iter()
            .find(|g| g.grantee == GranteeType::Role("alice".into()))
            .unwrap();
        assert_eq!(alice.privileges, vec!["SELECT", "INSERT"]);
    }

    #[test]
    fn test_grant_id_format() {
        let grant = Grant {
            grantee: GranteeType::Role("alice".into()),
            object: ObjectType::Table {
                schema: "public".into(),
                name: "films".into(),
            },
            privileges: vec!["SELECT".into()],
            with_grant_option: false,
            depends_on: vec![],
            object_owner: "postgres".into(),
        };
        assert_eq!(grant.id(), "alice@table:public.films");
    }

    #[test]
    fn test_all_privileges_sets() {
        let table = ObjectType::Table {
            schema: "s".into(),
            name: "t".into(),
        };
        assert_eq!(table.all_privileges().len(), 7);
        let func = ObjectType::Function {
            schema: "s".into(),
            name: "f".into(),
            arguments: String::new(),
        };
        assert_eq!(func.all_privileges(), &["EXECUTE"]);
    }
}
