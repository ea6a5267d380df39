//! SQL rendering for grant / revoke operations

use crate::catalog::grant::{Grant, GranteeType, ObjectType};
use crate::catalog::id::DbObjectId;
use crate::diff::operations::GrantOperation;
use crate::render::{RenderedSql, SqlRenderer, qualified, quote_ident};

fn object_clause(object: &ObjectType) -> String {
    match object {
        ObjectType::Table { schema, name }
        | ObjectType::View { schema, name }
        | ObjectType::MaterializedView { schema, name } => {
            format!("TABLE {}", qualified(schema, name))
        }
        ObjectType::ForeignTable { schema, name } => {
            format!("FOREIGN TABLE {}", qualified(schema, name))
        }
        ObjectType::Schema { name } => format!("SCHEMA {}", quote_ident(name)),
        ObjectType::Function {
            schema,
            name,
            arguments,
        } => format!("FUNCTION {}({})", qualified(schema, name), arguments),
        ObjectType::Sequence { schema, name } => {
            format!("SEQUENCE {}", qualified(schema, name))
        }
        ObjectType::Type { schema, name } => format!("TYPE {}", qualified(schema, name)),
        ObjectType::Domain { schema, name } => format!("DOMAIN {}", qualified(schema, name)),
        ObjectType::Language { name } => format!("LANGUAGE {}", quote_ident(name)),
        ObjectType::ForeignDataWrapper { name } => {
            format!("FOREIGN DATA WRAPPER {}", quote_ident(name))
        }
        ObjectType::ForeignServer { name } => {
            format!("FOREIGN SERVER {}", quote_ident(name))
        }
    }
}

fn grantee_clause(grantee: &GranteeType) -> String {
    match grantee {
        GranteeType::Role(name) => quote_ident(name),
        GranteeType::Public => "PUBLIC".to_string(),
    }
}

fn privilege_list(grant: &Grant) -> String {
    let all = grant.object.all_privileges();
    let covers_all = all
        .iter()
        .all(|p| grant.privileges.iter().any(|g| g.eq_ignore_ascii_case(p)));
    if covers_all {
        "ALL".to_string()
    } else {
        grant.privileges.join(", ")
    }
}

pub fn render_grant_statement(grant: &Grant) -> String {
    let mut sql = format!(
        "GRANT {} ON {} TO {}",
        privilege_list(grant),
        object_clause(&grant.object),
        grantee_clause(&grant.grantee)
    );
    if grant.with_grant_option {
        sql.push_str(" WITH GRANT OPTION");
    }
    sql.push(';');
    sql
}

pub fn render_revoke_statement(grant: &Grant) -> String {
    format!(
        "REVOKE {} ON {} FROM {};",
        privilege_list(grant),
        object_clause(&grant.object),
        grantee_clause(&grant.grantee)
    )
}

impl SqlRenderer for GrantOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            GrantOperation::Grant { grant } => {
                vec![RenderedSql::new(render_grant_statement(grant))]
            }
            GrantOperation::Revoke { grant } => {
                vec![RenderedSql::new(render_revoke_statement(grant))]
            }
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            GrantOperation::Grant { grant } | GrantOperation::Revoke { grant } => {
                DbObjectId::Grant { id: grant.id() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_grant(privileges: Vec<&str>) -> Grant {
        Grant {
            grantee: GranteeType::Role("alice".into()),
            object: ObjectType::Table {
                schema: "public".into(),
                name: "films".into(),
            },
            privileges: privileges.into_iter().map(String::from).collect(),
            with_grant_option: false,
            depends_on: vec![],
            object_owner: "postgres".into(),
        }
    }

    #[test]
    fn test_render_single_grant() {
        let grant = make_grant(vec!["SELECT"]);
        assert_eq!(
            render_grant_statement(&grant),
            "GRANT SELECT ON TABLE \"public\".\"films\" TO \"alice\";"
        );
    }

    #[test]
    fn test_full_privilege_set_renders_all() {
        let grant = make_grant(vec![
            "SELECT",
            "INSERT",
            "UPDATE",
            "DELETE",
            "TRUNCATE",
            "REFERENCES",
            "TRIGGER",
        ]);
        assert_eq!(
            render_grant_statement(&grant),
            "GRANT ALL ON TABLE \"public\".\"films\" TO \"alice\";"
        );
    }

    #[test]
    fn test_render_revoke() {
        let grant = make_grant(vec!["SELECT", "INSERT"]);
        assert_eq!(
            render_revoke_statement(&grant),
            "REVOKE SELECT, INSERT ON TABLE \"public\".\"films\" FROM \"alice\";"
        );
    }

    #[test]
    fn test_public_grantee() {
        let mut grant = make_grant(vec!["SELECT"]);
        grant.grantee = GranteeType::Public;
        assert!(render_grant_statement(&grant).ends_with("TO PUBLIC;"));
    }
}
