use crate::catalog::rule::Rule;
use crate::catalog::triggers::Trigger;
use crate::diff::comment_utils::{comment_on_create, diff_comment};
use crate::diff::operations::{MigrationStep, RuleOperation, TriggerOperation};
use crate::render::{qualified, quote_ident};

fn trigger_identifier(trigger: &Trigger) -> String {
    format!(
        "{} ON {}",
        quote_ident(&trigger.name),
        qualified(&trigger.schema, &trigger.table_name)
    )
}

fn definition_equal(o: &Trigger, n: &Trigger) -> bool {
    o.timing == n.timing
        && o.events == n.events
        && o.level == n.level
        && o.function == n.function
        && o.condition == n.condition
}

pub fn diff(old: Option<&Trigger>, new: Option<&Trigger>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Trigger(TriggerOperation::Create {
                trigger: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "TRIGGER",
                &trigger_identifier(n),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Trigger(TriggerOperation::Drop {
            schema: o.schema.clone(),
            table: o.table_name.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if !definition_equal(o, n) {
                steps.push(MigrationStep::Trigger(TriggerOperation::Drop {
                    schema: o.schema.clone(),
                    table: o.table_name.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Trigger(TriggerOperation::Create {
                    trigger: Box::new(n.clone()),
                }));
            }
            steps.extend(diff_comment(
                "TRIGGER",
                &trigger_identifier(n),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_rule(old: Option<&Rule>, new: Option<&Rule>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Rule(RuleOperation::Create {
                rule: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "RULE",
                &format!(
                    "{} ON {}",
                    quote_ident(&n.name),
                    qualified(&n.schema, &n.table_name)
                ),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Rule(RuleOperation::Drop {
            schema: o.schema.clone(),
            table: o.table_name.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.definition != n.definition {
                steps.push(MigrationStep::Rule(RuleOperation::Drop {
                    schema: o.schema.clone(),
                    table: o.table_name.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Rule(RuleOperation::Create {
                    rule: Box::new(n.clone()),
                }));
            }
            steps.extend(diff_comment(
                "RULE",
                &format!(
                    "{} ON {}",
                    quote_ident(&n.name),
                    qualified(&n.schema, &n.table_name)
                ),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trigger(function: &str) -> Trigger {
        Trigger {
            schema: "public".into(),
            table_name: "t1".into(),
            name: "trg".into(),
            timing: "before".into(),
            events: vec!["insert".into()],
            level: "row".into(),
            function: function.into(),
            function_arguments: String::new(),
            condition: None,
            comment: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_function_change_recreates_trigger() {
        let old = make_trigger("public.f1");
        let new = make_trigger("public.f2");
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 2);
        assert!(steps[0].is_drop());
        assert!(steps[1].is_create());
    }

    #[test]
    fn test_identical_triggers_produce_nothing() {
        let t = make_trigger("public.f1");
        assert!(diff(Some(&t), Some(&t)).is_empty());
    }
}
