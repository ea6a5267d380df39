//! SQL rendering for foreign-data object operations

use std::collections::BTreeMap;

use crate::catalog::id::DbObjectId;
use crate::diff::operations::ForeignOperation;
use crate::render::{RenderedSql, SqlRenderer, escape_string, qualified, quote_ident};

fn options_clause(options: &BTreeMap<String, String>) -> String {
    if options.is_empty() {
        return String::new();
    }
    let entries = options
        .iter()
        .map(|(key, value)| format!("{} {}", key, escape_string(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" OPTIONS ({})", entries)
}

impl SqlRenderer for ForeignOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            ForeignOperation::CreateWrapper { wrapper } => {
                let mut sql = format!(
                    "CREATE FOREIGN DATA WRAPPER {}",
                    quote_ident(&wrapper.name)
                );
                if let Some(handler) = &wrapper.handler {
                    sql.push_str(&format!(" HANDLER {}", handler));
                }
                if let Some(validator) = &wrapper.validator {
                    sql.push_str(&format!(" VALIDATOR {}", validator));
                }
                sql.push_str(&options_clause(&wrapper.options));
                sql.push(';');
                vec![RenderedSql::new(sql)]
            }
            ForeignOperation::DropWrapper { name } => vec![RenderedSql::destructive(format!(
                "DROP FOREIGN DATA WRAPPER {};",
                quote_ident(name)
            ))],
            ForeignOperation::CreateServer { server } => {
                let mut sql = format!("CREATE SERVER {}", quote_ident(&server.name));
                if let Some(server_type) = &server.server_type {
                    sql.push_str(&format!(" TYPE {}", escape_string(server_type)));
                }
                if let Some(version) = &server.version {
                    sql.push_str(&format!(" VERSION {}", escape_string(version)));
                }
                sql.push_str(&format!(
                    " FOREIGN DATA WRAPPER {}",
                    quote_ident(&server.wrapper)
                ));
                sql.push_str(&options_clause(&server.options));
                sql.push(';');
                vec![RenderedSql::new(sql)]
            }
            ForeignOperation::DropServer { name } => vec![RenderedSql::destructive(format!(
                "DROP SERVER {};",
                quote_ident(name)
            ))],
            ForeignOperation::CreateUserMapping { mapping } => {
                let user = if mapping.user == "PUBLIC" {
                    "PUBLIC".to_string()
                } else {
                    quote_ident(&mapping.user)
                };
                vec![RenderedSql::new(format!(
                    "CREATE USER MAPPING FOR {} SERVER {}{};",
                    user,
                    quote_ident(&mapping.server),
                    options_clause(&mapping.options)
                ))]
            }
            ForeignOperation::DropUserMapping { user, server } => {
                let user = if user == "PUBLIC" {
                    "PUBLIC".to_string()
                } else {
                    quote_ident(user)
                };
                vec![RenderedSql::destructive(format!(
                    "DROP USER MAPPING FOR {} SERVER {};",
                    user,
                    quote_ident(server)
                ))]
            }
            ForeignOperation::CreateForeignTable { table } => {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| {
                        let mut def = format!("    {} {}", quote_ident(&c.name), c.data_type);
                        if c.not_null {
                            def.push_str(" NOT NULL");
                        }
                        def
                    })
                    .collect::<Vec<_>>()
                    .join(",\n");
                vec![RenderedSql::new(format!(
                    "CREATE FOREIGN TABLE {} (\n{}\n) SERVER {}{};",
                    qualified(&table.schema, &table.name),
                    columns,
                    quote_ident(&table.server),
                    options_clause(&table.options)
                ))]
            }
            ForeignOperation::DropForeignTable { schema, name } => {
                vec![RenderedSql::destructive(format!(
                    "DROP FOREIGN TABLE {};",
                    qualified(schema, name)
                ))]
            }
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            ForeignOperation::CreateWrapper { wrapper } => wrapper.id(),
            ForeignOperation::DropWrapper { name } => {
                DbObjectId::ForeignDataWrapper { name: name.clone() }
            }
            ForeignOperation::CreateServer { server } => server.id(),
            ForeignOperation::DropServer { name } => {
                DbObjectId::ForeignServer { name: name.clone() }
            }
            ForeignOperation::CreateUserMapping { mapping } => mapping.id(),
            ForeignOperation::DropUserMapping { user, server } => DbObjectId::UserMapping {
                user: user.clone(),
                server: server.clone(),
            },
            ForeignOperation::CreateForeignTable { table } => table.id(),
            ForeignOperation::DropForeignTable { schema, name } => DbObjectId::ForeignTable {
                schema: schema.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(
            self,
            ForeignOperation::DropWrapper { .. }
                | ForeignOperation::DropServer { .. }
                | ForeignOperation::DropUserMapping { .. }
                | ForeignOperation::DropForeignTable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::foreign::ForeignServer;

    #[test]
    fn test_create_server_with_options() {
        let mut options = BTreeMap::new();
        options.insert("host".to_string(), "remote.example.com".to_string());
        options.insert("port".to_string(), "5432".to_string());
        let op = ForeignOperation::CreateServer {
            server: Box::new(ForeignServer {
                name: "remote".into(),
                wrapper: "postgres_fdw".into(),
                server_type: None,
                version: None,
                options,
                owner: None,
                comment: None,
                depends_on: vec![],
            }),
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "CREATE SERVER \"remote\" FOREIGN DATA WRAPPER \"postgres_fdw\" OPTIONS (host 'remote.example.com', port '5432');"
        );
    }
}
