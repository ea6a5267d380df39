//! SQL rendering for text-search object operations

use crate::catalog::id::DbObjectId;
use crate::diff::operations::TextSearchOperation;
use crate::render::{RenderedSql, SqlRenderer, qualified};

impl SqlRenderer for TextSearchOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            TextSearchOperation::CreateParser { parser } => {
                let mut parts = vec![
                    format!("START = {}", parser.start),
                    format!("GETTOKEN = {}", parser.gettoken),
                    format!("END = {}", parser.end),
                    format!("LEXTYPES = {}", parser.lextypes),
                ];
                if let Some(headline) = &parser.headline {
                    parts.push(format!("HEADLINE = {}", headline));
                }
                vec![RenderedSql::new(format!(
                    "CREATE TEXT SEARCH PARSER {} (\n    {}\n);",
                    qualified(&parser.schema, &parser.name),
                    parts.join(",\n    ")
                ))]
            }
            TextSearchOperation::DropParser { schema, name } => vec![RenderedSql::destructive(
                format!("DROP TEXT SEARCH PARSER {};", qualified(schema, name)),
            )],
            TextSearchOperation::CreateDictionary { dictionary } => {
                let mut parts = vec![format!("TEMPLATE = {}", dictionary.template)];
                if let Some(options) = &dictionary.options {
                    parts.push(options.clone());
                }
                vec![RenderedSql::new(format!(
                    "CREATE TEXT SEARCH DICTIONARY {} (\n    {}\n);",
                    qualified(&dictionary.schema, &dictionary.name),
                    parts.join(",\n    ")
                ))]
            }
            TextSearchOperation::DropDictionary { schema, name } => {
                vec![RenderedSql::destructive(format!(
                    "DROP TEXT SEARCH DICTIONARY {};",
                    qualified(schema, name)
                ))]
            }
            TextSearchOperation::CreateTemplate { template } => {
                let mut parts = Vec::new();
                if let Some(init) = &template.init {
                    parts.push(format!("INIT = {}", init));
                }
                parts.push(format!("LEXIZE = {}", template.lexize));
                vec![RenderedSql::new(format!(
                    "CREATE TEXT SEARCH TEMPLATE {} (\n    {}\n);",
                    qualified(&template.schema, &template.name),
                    parts.join(",\n    ")
                ))]
            }
            TextSearchOperation::DropTemplate { schema, name } => {
                vec![RenderedSql::destructive(format!(
                    "DROP TEXT SEARCH TEMPLATE {};",
                    qualified(schema, name)
                ))]
            }
            TextSearchOperation::CreateConfiguration { configuration } => {
                vec![RenderedSql::new(format!(
                    "CREATE TEXT SEARCH CONFIGURATION {} (PARSER = {});",
                    qualified(&configuration.schema, &configuration.name),
                    configuration.parser
                ))]
            }
            TextSearchOperation::DropConfiguration { schema, name } => {
                vec![RenderedSql::destructive(format!(
                    "DROP TEXT SEARCH CONFIGURATION {};",
                    qualified(schema, name)
                ))]
            }
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            TextSearchOperation::CreateParser { parser } => parser.id(),
            TextSearchOperation::DropParser { schema, name } => DbObjectId::TextSearchParser {
                schema: schema.clone(),
                name: name.clone(),
            },
            TextSearchOperation::CreateDictionary { dictionary } => dictionary.id(),
            TextSearchOperation::DropDictionary { schema, name } => {
                DbObjectId::TextSearchDictionary {
                    schema: schema.clone(),
                    name: name.clone(),
                }
            }
            TextSearchOperation::CreateTemplate { template } => template.id(),
            TextSearchOperation::DropTemplate { schema, name } => {
                DbObjectId::TextSearchTemplate {
                    schema: schema.clone(),
                    name: name.clone(),
                }
            }
            TextSearchOperation::CreateConfiguration { configuration } => configuration.id(),
            TextSearchOperation::DropConfiguration { schema, name } => {
                DbObjectId::TextSearchConfiguration {
                    schema: schema.clone(),
                    name: name.clone(),
                }
            }
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(
            self,
            TextSearchOperation::DropParser { .. }
                | TextSearchOperation::DropDictionary { .. }
                | TextSearchOperation::DropTemplate { .. }
                | TextSearchOperation::DropConfiguration { .. }
        )
    }
}
