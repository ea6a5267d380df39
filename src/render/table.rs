//! SQL rendering for table operations.
//!
//! CREATE TABLE renders columns only; primary keys and all other
//! constraints are separate steps, which keeps FK-after-referenced-key
//! ordering a pure scheduling property.

use crate::catalog::id::DbObjectId;
use crate::catalog::table::{Column, Table};
use crate::diff::operations::{ColumnAction, TableOperation};
use crate::render::{RenderedSql, SqlRenderer, qualified, quote_ident};

fn render_column_definition(column: &Column) -> String {
    let mut def = format!("    {} {}", quote_ident(&column.name), column.data_type);
    if let Some(collation) = &column.collation {
        def.push_str(&format!(" COLLATE \"{}\"", collation));
    }
    if let Some(expr) = &column.generated {
        def.push_str(&format!(" GENERATED ALWAYS AS ({}) STORED", expr));
    }
    if let Some(identity) = &column.identity {
        def.push_str(&format!(
            " GENERATED {} AS IDENTITY",
            identity.to_uppercase()
        ));
    }
    if let Some(default) = &column.default {
        def.push_str(&format!(" DEFAULT {}", default));
    }
    if column.not_null {
        def.push_str(" NOT NULL");
    }
    def
}

/// Render a complete CREATE TABLE statement (columns only).
pub fn render_create_table(table: &Table) -> String {
    let mut sql = String::new();
    if table.unlogged {
        sql.push_str("CREATE UNLOGGED TABLE ");
    } else {
        sql.push_str("CREATE TABLE ");
    }
    sql.push_str(&qualified(&table.schema, &table.name));

    if let Some(parent) = &table.partition_of {
        let parent = parent
            .split_once('.')
            .map(|(s, n)| qualified(s, n))
            .unwrap_or_else(|| parent.clone());
        sql.push_str(&format!(" PARTITION OF {}", parent));
        if let Some(bound) = &table.partition_bound {
            sql.push_str(&format!(" {}", bound));
        }
        sql.push(';');
        return sql;
    }

    sql.push_str(" (\n");
    let column_definitions: Vec<String> =
        table.columns.iter().map(render_column_definition).collect();
    sql.push_str(&column_definitions.join(",\n"));
    sql.push_str("\n)");

    if !table.inherits.is_empty() {
        let parents = table
            .inherits
            .iter()
            .map(|p| {
                p.split_once('.')
                    .map(|(s, n)| qualified(s, n))
                    .unwrap_or_else(|| p.clone())
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" INHERITS ({})", parents));
    }
    if let Some(partition_by) = &table.partition_by {
        sql.push_str(&format!(" {}", partition_by));
    }
    if !table.options.is_empty() {
        sql.push_str(&format!(" WITH ({})", table.options.join(", ")));
    }
    if let Some(tablespace) = &table.tablespace {
        sql.push_str(&format!(" TABLESPACE {}", quote_ident(tablespace)));
    }
    sql.push(';');
    sql
}

impl SqlRenderer for TableOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            TableOperation::Create { table } => {
                vec![RenderedSql::new(render_create_table(table))]
            }
            TableOperation::Drop { schema, name } => vec![RenderedSql::destructive(format!(
                "DROP TABLE {};",
                qualified(schema, name)
            ))],
            TableOperation::Alter {
                schema,
                name,
                actions,
            } => actions
                .iter()
                .map(|action| render_column_action(action, schema, name))
                .collect(),
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            TableOperation::Create { table } => table.id(),
            TableOperation::Drop { schema, name }
            | TableOperation::Alter { schema, name, .. } => DbObjectId::Table {
                schema: schema.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, TableOperation::Drop { .. })
    }
}

fn render_column_action(action: &ColumnAction, schema: &str, table: &str) -> RenderedSql {
    let prefix = format!("ALTER TABLE {}", qualified(schema, table));
    match action {
        ColumnAction::Add { column } => {
            let definition = render_column_definition(column);
            RenderedSql::new(format!(
                "{} ADD COLUMN {};",
                prefix,
                definition.trim_start()
            ))
        }
        ColumnAction::Drop { name } => RenderedSql::destructive(format!(
            "{} DROP COLUMN {};",
            prefix,
            quote_ident(name)
        )),
        ColumnAction::Rename { old, new } => RenderedSql::new(format!(
            "{} RENAME COLUMN {} TO {};",
            prefix,
            quote_ident(old),
            quote_ident(new)
        )),
        ColumnAction::SetNotNull { name } => RenderedSql::new(format!(
            "{} ALTER COLUMN {} SET NOT NULL;",
            prefix,
            quote_ident(name)
        )),
        ColumnAction::DropNotNull { name } => RenderedSql::new(format!(
            "{} ALTER COLUMN {} DROP NOT NULL;",
            prefix,
            quote_ident(name)
        )),
        ColumnAction::SetDefault { name, default } => RenderedSql::new(format!(
            "{} ALTER COLUMN {} SET DEFAULT {};",
            prefix,
            quote_ident(name),
            default
        )),
        ColumnAction::DropDefault { name } => RenderedSql::new(format!(
            "{} ALTER COLUMN {} DROP DEFAULT;",
            prefix,
            quote_ident(name)
        )),
        ColumnAction::DropGenerated { name } => RenderedSql::destructive(format!(
            "{} ALTER COLUMN {} DROP EXPRESSION;",
            prefix,
            quote_ident(name)
        )),
        ColumnAction::AlterType { name, new_type } => RenderedSql::destructive(format!(
            "{} ALTER COLUMN {} TYPE {};",
            prefix,
            quote_ident(name),
            new_type
        )),
        ColumnAction::SetStatistics { name, value } => RenderedSql::new(format!(
            "{} ALTER COLUMN {} SET STATISTICS {};",
            prefix,
            quote_ident(name),
            value.unwrap_or(-1)
        )),
        ColumnAction::SetStorage { name, storage } => RenderedSql::new(format!(
            "{} ALTER COLUMN {} SET STORAGE {};",
            prefix,
            quote_ident(name),
            storage.to_uppercase()
        )),
        ColumnAction::AddIdentity { name, kind } => RenderedSql::new(format!(
            "{} ALTER COLUMN {} ADD GENERATED {} AS IDENTITY;",
            prefix,
            quote_ident(name),
            kind.to_uppercase()
        )),
        ColumnAction::DropIdentity { name } => RenderedSql::new(format!(
            "{} ALTER COLUMN {} DROP IDENTITY;",
            prefix,
            quote_ident(name)
        )),
        ColumnAction::SetTablespace { tablespace } => RenderedSql::new(format!(
            "{} SET TABLESPACE {};",
            prefix,
            quote_ident(tablespace.as_deref().unwrap_or("pg_default"))
        )),
        ColumnAction::SetLogged => RenderedSql::new(format!("{} SET LOGGED;", prefix)),
        ColumnAction::SetUnlogged => RenderedSql::new(format!("{} SET UNLOGGED;", prefix)),
        ColumnAction::SetOption { option } => {
            RenderedSql::new(format!("{} SET ({});", prefix, option))
        }
        ColumnAction::ResetOption { option } => {
            RenderedSql::new(format!("{} RESET ({});", prefix, option))
        }
        ColumnAction::Inherit { parent } => {
            let parent = parent
                .split_once('.')
                .map(|(s, n)| qualified(s, n))
                .unwrap_or_else(|| quote_ident(parent));
            RenderedSql::new(format!("{} INHERIT {};", prefix, parent))
        }
        ColumnAction::NoInherit { parent } => {
            let parent = parent
                .split_once('.')
                .map(|(s, n)| qualified(s, n))
                .unwrap_or_else(|| quote_ident(parent));
            RenderedSql::new(format!("{} NO INHERIT {};", prefix, parent))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::table::make_test_column;
    use crate::render::Safety;

    fn make_table(columns: Vec<Column>) -> Table {
        Table::new("public".to_string(), "users".to_string(), columns, vec![])
    }

    #[test]
    fn test_render_create_table() {
        let table = make_table(vec![
            make_test_column("id", "integer", true),
            make_test_column("name", "text", false),
        ]);
        let op = TableOperation::Create {
            table: Box::new(table),
        };
        let rendered = op.to_sql();
        assert_eq!(rendered.len(), 1);
        assert_eq!(
            rendered[0].sql,
            "CREATE TABLE \"public\".\"users\" (\n    \"id\" integer NOT NULL,\n    \"name\" text\n);"
        );
        assert_eq!(rendered[0].safety, Safety::Safe);
    }

    #[test]
    fn test_render_create_table_no_primary_key_inline() {
        let table = make_table(vec![make_test_column("id", "integer", true)]);
        let sql = render_create_table(&table);
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_render_drop_table() {
        let op = TableOperation::Drop {
            schema: "public".to_string(),
            name: "old_table".to_string(),
        };
        let rendered = op.to_sql();
        assert_eq!(rendered[0].sql, "DROP TABLE \"public\".\"old_table\";");
        assert_eq!(rendered[0].safety, Safety::Destructive);
    }

    #[test]
    fn test_render_add_column_with_default() {
        let mut column = make_test_column("status", "text", false);
        column.default = Some("'active'".to_string());
        let op = TableOperation::Alter {
            schema: "app".to_string(),
            name: "items".to_string(),
            actions: vec![ColumnAction::Add { column }],
        };
        let rendered = op.to_sql();
        assert_eq!(
            rendered[0].sql,
            "ALTER TABLE \"app\".\"items\" ADD COLUMN \"status\" text DEFAULT 'active';"
        );
    }

    #[test]
    fn test_render_alter_type_is_destructive() {
        let op = TableOperation::Alter {
            schema: "public".to_string(),
            name: "t".to_string(),
            actions: vec![ColumnAction::AlterType {
                name: "c".to_string(),
                new_type: "text".to_string(),
            }],
        };
        let rendered = op.to_sql();
        assert_eq!(
            rendered[0].sql,
            "ALTER TABLE \"public\".\"t\" ALTER COLUMN \"c\" TYPE text;"
        );
        assert_eq!(rendered[0].safety, Safety::Destructive);
    }

    #[test]
    fn test_render_rename_column() {
        let op = TableOperation::Alter {
            schema: "public".to_string(),
            name: "t".to_string(),
            actions: vec![ColumnAction::Rename {
                old: "a".to_string(),
                new: "b".to_string(),
            }],
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "ALTER TABLE \"public\".\"t\" RENAME COLUMN \"a\" TO \"b\";"
        );
    }

    #[test]
    fn test_render_multiple_actions() {
        let op = TableOperation::Alter {
            schema: "public".to_string(),
            name: "users".to_string(),
            actions: vec![
                ColumnAction::Add {
                    column: make_test_column("email", "text", true),
                },
                ColumnAction::SetNotNull {
                    name: "name".to_string(),
                },
            ],
        };
        let rendered = op.to_sql();
        assert_eq!(rendered.len(), 2);
        assert!(rendered[0].sql.contains("ADD COLUMN"));
        assert!(rendered[1].sql.contains("SET NOT NULL"));
    }
}
