//! SQL rendering for extension and language operations

use crate::catalog::id::DbObjectId;
use crate::diff::operations::{ExtensionOperation, LanguageOperation};
use crate::render::{RenderedSql, SqlRenderer, escape_string, quote_ident};

impl SqlRenderer for ExtensionOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            ExtensionOperation::Create { extension } => {
                let mut sql = format!(
                    "CREATE EXTENSION IF NOT EXISTS {}",
                    quote_ident(&extension.name)
                );
                if extension.schema != "pg_catalog" && !extension.schema.is_empty() {
                    sql.push_str(&format!(" SCHEMA {}", quote_ident(&extension.schema)));
                }
                if let Some(version) = &extension.version {
                    sql.push_str(&format!(" VERSION {}", escape_string(version)));
                }
                sql.push(';');
                vec![RenderedSql::new(sql)]
            }
            ExtensionOperation::Drop { name } => vec![RenderedSql::destructive(format!(
                "DROP EXTENSION {};",
                quote_ident(name)
            ))],
            ExtensionOperation::Update { name, version } => vec![RenderedSql::new(format!(
                "ALTER EXTENSION {} UPDATE TO {};",
                quote_ident(name),
                escape_string(version)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            ExtensionOperation::Create { extension } => DbObjectId::Extension {
                name: extension.name.clone(),
            },
            ExtensionOperation::Drop { name } | ExtensionOperation::Update { name, .. } => {
                DbObjectId::Extension { name: name.clone() }
            }
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, ExtensionOperation::Drop { .. })
    }
}

impl SqlRenderer for LanguageOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            LanguageOperation::Create { language } => {
                let trusted = if language.trusted { "TRUSTED " } else { "" };
                vec![RenderedSql::new(format!(
                    "CREATE {}LANGUAGE {};",
                    trusted,
                    quote_ident(&language.name)
                ))]
            }
            LanguageOperation::Drop { name } => vec![RenderedSql::destructive(format!(
                "DROP LANGUAGE {};",
                quote_ident(name)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            LanguageOperation::Create { language } => DbObjectId::Language {
                name: language.name.clone(),
            },
            LanguageOperation::Drop { name } => DbObjectId::Language { name: name.clone() },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, LanguageOperation::Drop { .. })
    }
}
