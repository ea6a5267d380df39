//! SQL rendering for trigger and rule operations

use crate::catalog::id::DbObjectId;
use crate::diff::operations::{RuleOperation, TriggerOperation};
use crate::render::{RenderedSql, SqlRenderer, qualified, quote_ident};

impl SqlRenderer for TriggerOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            TriggerOperation::Create { trigger } => {
                let events = trigger
                    .events
                    .iter()
                    .map(|e| e.to_uppercase())
                    .collect::<Vec<_>>()
                    .join(" OR ");
                let mut sql = format!(
                    "CREATE TRIGGER {}\n    {} {} ON {}\n    FOR EACH {}",
                    quote_ident(&trigger.name),
                    trigger.timing.to_uppercase(),
                    events,
                    qualified(&trigger.schema, &trigger.table_name),
                    trigger.level.to_uppercase()
                );
                if let Some(condition) = &trigger.condition {
                    sql.push_str(&format!("\n    WHEN ({})", condition));
                }
                sql.push_str(&format!(
                    "\n    EXECUTE FUNCTION {}();",
                    trigger.function
                ));
                vec![RenderedSql::new(sql)]
            }
            TriggerOperation::Drop {
                schema,
                table,
                name,
            } => vec![RenderedSql::destructive(format!(
                "DROP TRIGGER {} ON {};",
                quote_ident(name),
                qualified(schema, table)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            TriggerOperation::Create { trigger } => trigger.id(),
            TriggerOperation::Drop {
                schema,
                table,
                name,
            } => DbObjectId::Trigger {
                schema: schema.clone(),
                table: table.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, TriggerOperation::Drop { .. })
    }
}

impl SqlRenderer for RuleOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            RuleOperation::Create { rule } => {
                let mut definition = rule.definition.trim_end().to_string();
                if !definition.ends_with(';') {
                    definition.push(';');
                }
                vec![RenderedSql::new(definition)]
            }
            RuleOperation::Drop {
                schema,
                table,
                name,
            } => vec![RenderedSql::destructive(format!(
                "DROP RULE {} ON {};",
                quote_ident(name),
                qualified(schema, table)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            RuleOperation::Create { rule } => rule.id(),
            RuleOperation::Drop {
                schema,
                table,
                name,
            } => DbObjectId::Rule {
                schema: schema.clone(),
                table: table.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, RuleOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::triggers::Trigger;

    #[test]
    fn test_render_create_trigger() {
        let op = TriggerOperation::Create {
            trigger: Box::new(Trigger {
                schema: "public".into(),
                table_name: "t1".into(),
                name: "audit_t1".into(),
                timing: "before".into(),
                events: vec!["insert".into(), "update".into()],
                level: "row".into(),
                function: "public.audit_fn".into(),
                function_arguments: String::new(),
                condition: None,
                comment: None,
                depends_on: vec![],
            }),
        };
        let sql = &op.to_sql()[0].sql;
        assert!(sql.starts_with("CREATE TRIGGER \"audit_t1\""));
        assert!(sql.contains("BEFORE INSERT OR UPDATE ON \"public\".\"t1\""));
        assert!(sql.contains("FOR EACH ROW"));
        assert!(sql.ends_with("EXECUTE FUNCTION public.audit_fn();"));
    }

    #[test]
    fn test_render_drop_trigger() {
        let op = TriggerOperation::Drop {
            schema: "public".into(),
            table: "t1".into(),
            name: "audit_t1".into(),
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "DROP TRIGGER \"audit_t1\" ON \"public\".\"t1\";"
        );
    }
}
