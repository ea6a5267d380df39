pub mod cast;
pub mod constraint;
pub mod extension;
pub mod foreign;
pub mod function;
pub mod generic;
pub mod grant;
pub mod index;
pub mod schema;
pub mod sequence;
pub mod table;
pub mod text_search;
pub mod trigger;
pub mod types;
pub mod view;

use crate::catalog::id::DbObjectId;
use crate::diff::operations::MigrationStep;

/// Trait for rendering SQL from operations
pub trait SqlRenderer {
    fn to_sql(&self) -> Vec<RenderedSql>;
    fn db_object_id(&self) -> DbObjectId;
    fn is_destructive(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Safety {
    Safe,
    Destructive,
}

#[derive(Debug, Clone)]
pub struct RenderedSql {
    pub safety: Safety,
    pub sql: String,
}

impl RenderedSql {
    pub fn new(sql: String) -> Self {
        Self {
            sql,
            safety: Safety::Safe,
        }
    }

    pub fn destructive(sql: String) -> Self {
        Self {
            sql,
            safety: Safety::Destructive,
        }
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn escape_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `schema.name` with both parts quoted.
pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Generic helper for rendering comment SQL
pub fn render_comment_sql(
    object_type: &str,
    identifier: &str,
    comment: Option<&str>,
) -> RenderedSql {
    let sql = match comment {
        Some(comment_text) => format!(
            "COMMENT ON {} {} IS {};",
            object_type,
            identifier,
            escape_string(comment_text)
        ),
        None => format!("COMMENT ON {} {} IS NULL;", object_type, identifier),
    };

    RenderedSql {
        sql,
        safety: Safety::Safe,
    }
}

impl SqlRenderer for MigrationStep {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            MigrationStep::Schema(op) => op.to_sql(),
            MigrationStep::Extension(op) => op.to_sql(),
            MigrationStep::Language(op) => op.to_sql(),
            MigrationStep::Collation(op) => op.to_sql(),
            MigrationStep::Conversion(op) => op.to_sql(),
            MigrationStep::Cast(op) => op.to_sql(),
            MigrationStep::EventTrigger(op) => op.to_sql(),
            MigrationStep::Type(op) => op.to_sql(),
            MigrationStep::Domain(op) => op.to_sql(),
            MigrationStep::Sequence(op) => op.to_sql(),
            MigrationStep::Table(op) => op.to_sql(),
            MigrationStep::Constraint(op) => op.to_sql(),
            MigrationStep::Index(op) => op.to_sql(),
            MigrationStep::Trigger(op) => op.to_sql(),
            MigrationStep::Rule(op) => op.to_sql(),
            MigrationStep::View(op) => op.to_sql(),
            MigrationStep::Function(op) => op.to_sql(),
            MigrationStep::Aggregate(op) => op.to_sql(),
            MigrationStep::Operator(op) => op.to_sql(),
            MigrationStep::OperatorClass(op) => op.to_sql(),
            MigrationStep::OperatorFamily(op) => op.to_sql(),
            MigrationStep::TextSearch(op) => op.to_sql(),
            MigrationStep::Foreign(op) => op.to_sql(),
            MigrationStep::Grant(op) => op.to_sql(),
            MigrationStep::Owner(op) => op.to_sql(),
            MigrationStep::Rename(op) => op.to_sql(),
            MigrationStep::Comment(op) => op.to_sql(),
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            MigrationStep::Schema(op) => op.db_object_id(),
            MigrationStep::Extension(op) => op.db_object_id(),
            MigrationStep::Language(op) => op.db_object_id(),
            MigrationStep::Collation(op) => op.db_object_id(),
            MigrationStep::Conversion(op) => op.db_object_id(),
            MigrationStep::Cast(op) => op.db_object_id(),
            MigrationStep::EventTrigger(op) => op.db_object_id(),
            MigrationStep::Type(op) => op.db_object_id(),
            MigrationStep::Domain(op) => op.db_object_id(),
            MigrationStep::Sequence(op) => op.db_object_id(),
            MigrationStep::Table(op) => op.db_object_id(),
            MigrationStep::Constraint(op) => op.db_object_id(),
            MigrationStep::Index(op) => op.db_object_id(),
            MigrationStep::Trigger(op) => op.db_object_id(),
            MigrationStep::Rule(op) => op.db_object_id(),
            MigrationStep::View(op) => op.db_object_id(),
            MigrationStep::Function(op) => op.db_object_id(),
            MigrationStep::Aggregate(op) => op.db_object_id(),
            MigrationStep::Operator(op) => op.db_object_id(),
            MigrationStep::OperatorClass(op) => op.db_object_id(),
            MigrationStep::OperatorFamily(op) => op.db_object_id(),
            MigrationStep::TextSearch(op) => op.db_object_id(),
            MigrationStep::Foreign(op) => op.db_object_id(),
            MigrationStep::Grant(op) => op.db_object_id(),
            MigrationStep::Owner(op) => op.db_object_id(),
            MigrationStep::Rename(op) => op.db_object_id(),
            MigrationStep::Comment(op) => op.db_object_id(),
        }
    }

    fn is_destructive(&self) -> bool {
        self.is_drop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("weird\"name"), "\"weird\"\"name\"");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("it's"), "'it''s'");
    }

    #[test]
    fn test_render_comment_sql_null_clears() {
        let rendered = render_comment_sql("TABLE", "\"public\".\"t\"", None);
        assert_eq!(rendered.sql, "COMMENT ON TABLE \"public\".\"t\" IS NULL;");
    }
}
