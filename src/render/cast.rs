//! SQL rendering for cast, collation, conversion and event-trigger operations

use crate::catalog::id::DbObjectId;
use crate::diff::operations::{
    CastOperation, CollationOperation, ConversionOperation, EventTriggerOperation,
};
use crate::render::{RenderedSql, SqlRenderer, escape_string, qualified, quote_ident};

impl SqlRenderer for CastOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            CastOperation::Create { cast } => {
                let with_clause = match (&cast.function, cast.method.as_deref()) {
                    (Some(func), _) => {
                        let args = cast.function_arguments.as_deref().unwrap_or("");
                        format!("WITH FUNCTION {}({})", func, args)
                    }
                    (None, Some("inout")) => "WITH INOUT".to_string(),
                    _ => "WITHOUT FUNCTION".to_string(),
                };
                let context = match cast.context.as_deref() {
                    Some("assignment") => " AS ASSIGNMENT",
                    Some("implicit") => " AS IMPLICIT",
                    _ => "",
                };
                vec![RenderedSql::new(format!(
                    "CREATE CAST ({} AS {}) {}{};",
                    cast.source, cast.target, with_clause, context
                ))]
            }
            CastOperation::Drop { source, target } => vec![RenderedSql::destructive(format!(
                "DROP CAST ({} AS {});",
                source, target
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            CastOperation::Create { cast } => DbObjectId::Cast {
                source: cast.source.clone(),
                target: cast.target.clone(),
            },
            CastOperation::Drop { source, target } => DbObjectId::Cast {
                source: source.clone(),
                target: target.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, CastOperation::Drop { .. })
    }
}

impl SqlRenderer for CollationOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            CollationOperation::Create { collation } => {
                let mut parts = Vec::new();
                if let Some(lc_collate) = &collation.lc_collate {
                    parts.push(format!("LC_COLLATE = {}", escape_string(lc_collate)));
                }
                if let Some(lc_ctype) = &collation.lc_ctype {
                    parts.push(format!("LC_CTYPE = {}", escape_string(lc_ctype)));
                }
                if let Some(provider) = &collation.provider {
                    parts.push(format!("PROVIDER = {}", provider));
                }
                vec![RenderedSql::new(format!(
                    "CREATE COLLATION {} ({});",
                    qualified(&collation.schema, &collation.name),
                    parts.join(", ")
                ))]
            }
            CollationOperation::Drop { schema, name } => vec![RenderedSql::destructive(
                format!("DROP COLLATION {};", qualified(schema, name)),
            )],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            CollationOperation::Create { collation } => DbObjectId::Collation {
                schema: collation.schema.clone(),
                name: collation.name.clone(),
            },
            CollationOperation::Drop { schema, name } => DbObjectId::Collation {
                schema: schema.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, CollationOperation::Drop { .. })
    }
}

impl SqlRenderer for ConversionOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            ConversionOperation::Create { conversion } => {
                let default = if conversion.default { "DEFAULT " } else { "" };
                vec![RenderedSql::new(format!(
                    "CREATE {}CONVERSION {} FOR {} TO {} FROM {};",
                    default,
                    qualified(&conversion.schema, &conversion.name),
                    escape_string(&conversion.source_encoding),
                    escape_string(&conversion.dest_encoding),
                    conversion.function
                ))]
            }
            ConversionOperation::Drop { schema, name } => vec![RenderedSql::destructive(
                format!("DROP CONVERSION {};", qualified(schema, name)),
            )],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            ConversionOperation::Create { conversion } => DbObjectId::Conversion {
                schema: conversion.schema.clone(),
                name: conversion.name.clone(),
            },
            ConversionOperation::Drop { schema, name } => DbObjectId::Conversion {
                schema: schema.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, ConversionOperation::Drop { .. })
    }
}

impl SqlRenderer for EventTriggerOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            EventTriggerOperation::Create { trigger } => {
                let mut sql = format!(
                    "CREATE EVENT TRIGGER {} ON {}",
                    quote_ident(&trigger.name),
                    trigger.event
                );
                if !trigger.tags.is_empty() {
                    let tags = trigger
                        .tags
                        .iter()
                        .map(|t| escape_string(t))
                        .collect::<Vec<_>>()
                        .join(", ");
                    sql.push_str(&format!("\n    WHEN TAG IN ({})", tags));
                }
                sql.push_str(&format!("\n    EXECUTE FUNCTION {}();", trigger.function));
                vec![RenderedSql::new(sql)]
            }
            EventTriggerOperation::Drop { name } => vec![RenderedSql::destructive(format!(
                "DROP EVENT TRIGGER {};",
                quote_ident(name)
            ))],
            EventTriggerOperation::SetEnabled { name, enabled } => {
                let action = if *enabled { "ENABLE" } else { "DISABLE" };
                vec![RenderedSql::new(format!(
                    "ALTER EVENT TRIGGER {} {};",
                    quote_ident(name),
                    action
                ))]
            }
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            EventTriggerOperation::Create { trigger } => DbObjectId::EventTrigger {
                name: trigger.name.clone(),
            },
            EventTriggerOperation::Drop { name }
            | EventTriggerOperation::SetEnabled { name, .. } => {
                DbObjectId::EventTrigger { name: name.clone() }
            }
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, EventTriggerOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::cast::Cast;

    #[test]
    fn test_create_cast_with_function() {
        let op = CastOperation::Create {
            cast: Box::new(Cast {
                source: "text".to_string(),
                target: "integer".to_string(),
                function: Some("public.text_to_int".to_string()),
                function_arguments: Some("text".to_string()),
                context: Some("implicit".to_string()),
                method: None,
                comment: None,
                depends_on: vec![],
            }),
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "CREATE CAST (text AS integer) WITH FUNCTION public.text_to_int(text) AS IMPLICIT;"
        );
    }

    #[test]
    fn test_drop_cast() {
        let op = CastOperation::Drop {
            source: "text".to_string(),
            target: "integer".to_string(),
        };
        assert_eq!(op.to_sql()[0].sql, "DROP CAST (text AS integer);");
    }
}
