use crate::catalog::aggregate::Aggregate;
use crate::catalog::function::Function;
use crate::catalog::operator::{Operator, OperatorClass, OperatorFamily};
use crate::diff::comment_utils::{comment_on_create, diff_comment, diff_owner};
use crate::diff::operations::{
    AggregateOperation, FunctionOperation, MigrationStep, OperatorClassOperation,
    OperatorFamilyOperation, OperatorOperation, RenameOperation,
};
use crate::render::{qualified, quote_ident};

fn function_identifier(function: &Function) -> String {
    format!(
        "{}({})",
        qualified(&function.schema, &function.name),
        function.arguments
    )
}

pub fn rename_step(old: &Function, new: &Function) -> MigrationStep {
    MigrationStep::Rename(RenameOperation {
        object_type: new.kind.sql_keyword().to_string(),
        old_identifier: format!(
            "{}({})",
            qualified(&old.schema, &old.name),
            old.arguments
        ),
        new_name: new.name.clone(),
        object_id: new.id(),
    })
}

fn attributes_equal(o: &Function, n: &Function) -> bool {
    o.parameters == n.parameters
        && o.returns == n.returns
        && o.language == n.language
        && o.source == n.source
        && o.kind == n.kind
        && o.volatility == n.volatility
        && o.strict == n.strict
        && o.security_definer == n.security_definer
}

pub fn diff(old: Option<&Function>, new: Option<&Function>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = function_identifier(n);
            let mut steps = vec![MigrationStep::Function(FunctionOperation::Create {
                function: Box::new(n.clone()),
            })];
            steps.extend(diff_owner(
                n.kind.sql_keyword(),
                &identifier,
                n.id(),
                &None,
                &n.owner,
            ));
            steps.extend(comment_on_create(
                n.kind.sql_keyword(),
                &identifier,
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Function(FunctionOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
            arguments: o.arguments.clone(),
            kind: o.kind,
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if !attributes_equal(o, n) {
                if o.returns != n.returns || o.kind != n.kind {
                    // return type changes need a drop first
                    steps.push(MigrationStep::Function(FunctionOperation::Drop {
                        schema: o.schema.clone(),
                        name: o.name.clone(),
                        arguments: o.arguments.clone(),
                        kind: o.kind,
                    }));
                    steps.push(MigrationStep::Function(FunctionOperation::Create {
                        function: Box::new(n.clone()),
                    }));
                } else {
                    steps.push(MigrationStep::Function(FunctionOperation::CreateOrReplace {
                        function: Box::new(n.clone()),
                    }));
                }
            }
            let identifier = function_identifier(n);
            steps.extend(diff_owner(
                n.kind.sql_keyword(),
                &identifier,
                n.id(),
                &o.owner,
                &n.owner,
            ));
            steps.extend(diff_comment(
                n.kind.sql_keyword(),
                &identifier,
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

fn aggregate_identifier(aggregate: &Aggregate) -> String {
    format!(
        "{}({})",
        qualified(&aggregate.schema, &aggregate.name),
        aggregate.arguments
    )
}

fn aggregate_equal(o: &Aggregate, n: &Aggregate) -> bool {
    o.sfunc == n.sfunc
        && o.stype == n.stype
        && o.finalfunc == n.finalfunc
        && o.combinefunc == n.combinefunc
        && o.initcond == n.initcond
}

pub fn diff_aggregate(old: Option<&Aggregate>, new: Option<&Aggregate>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = aggregate_identifier(n);
            let mut steps = vec![MigrationStep::Aggregate(AggregateOperation::Create {
                aggregate: Box::new(n.clone()),
            })];
            steps.extend(diff_owner("AGGREGATE", &identifier, n.id(), &None, &n.owner));
            steps.extend(comment_on_create(
                "AGGREGATE",
                &identifier,
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Aggregate(AggregateOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
            arguments: o.arguments.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if !aggregate_equal(o, n) {
                steps.push(MigrationStep::Aggregate(AggregateOperation::Drop {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                    arguments: o.arguments.clone(),
                }));
                steps.push(MigrationStep::Aggregate(AggregateOperation::Create {
                    aggregate: Box::new(n.clone()),
                }));
            }
            let identifier = aggregate_identifier(n);
            steps.extend(diff_owner(
                "AGGREGATE",
                &identifier,
                n.id(),
                &o.owner,
                &n.owner,
            ));
            steps.extend(diff_comment(
                "AGGREGATE",
                &identifier,
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

fn operator_identifier(operator: &Operator) -> String {
    format!(
        "{}.{} ({}, {})",
        quote_ident(&operator.schema),
        operator.name,
        operator.left.as_deref().unwrap_or("NONE"),
        operator.right.as_deref().unwrap_or("NONE")
    )
}

pub fn diff_operator(old: Option<&Operator>, new: Option<&Operator>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Operator(OperatorOperation::Create {
                operator: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "OPERATOR",
                &operator_identifier(n),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Operator(OperatorOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
            left: o.left.clone(),
            right: o.right.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.function != n.function
                || o.commutator != n.commutator
                || o.negator != n.negator
                || o.restrict != n.restrict
                || o.join != n.join
            {
                steps.push(MigrationStep::Operator(OperatorOperation::Drop {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                    left: o.left.clone(),
                    right: o.right.clone(),
                }));
                steps.push(MigrationStep::Operator(OperatorOperation::Create {
                    operator: Box::new(n.clone()),
                }));
            }
            steps.extend(diff_comment(
                "OPERATOR",
                &operator_identifier(n),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_operator_class(
    old: Option<&OperatorClass>,
    new: Option<&OperatorClass>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => vec![MigrationStep::OperatorClass(OperatorClassOperation::Create {
            class: Box::new(n.clone()),
        })],
        (Some(o), None) => vec![MigrationStep::OperatorClass(OperatorClassOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
            method: o.method.clone(),
        })],
        (Some(o), Some(n)) => {
            if o.type_name != n.type_name
                || o.default != n.default
                || o.operators != n.operators
                || o.functions != n.functions
            {
                vec![
                    MigrationStep::OperatorClass(OperatorClassOperation::Drop {
                        schema: o.schema.clone(),
                        name: o.name.clone(),
                        method: o.method.clone(),
                    }),
                    MigrationStep::OperatorClass(OperatorClassOperation::Create {
                        class: Box::new(n.clone()),
                    }),
                ]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

pub fn diff_operator_family(
    old: Option<&OperatorFamily>,
    new: Option<&OperatorFamily>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => vec![MigrationStep::OperatorFamily(
            OperatorFamilyOperation::Create {
                family: Box::new(n.clone()),
            },
        )],
        (Some(o), None) => vec![MigrationStep::OperatorFamily(OperatorFamilyOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
            method: o.method.clone(),
        })],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::function::FunctionKind;

    fn make_function(source: &str) -> Function {
        Function {
            schema: "public".into(),
            name: "f".into(),
            arguments: "integer".into(),
            parameters: "n integer".into(),
            returns: Some("integer".into()),
            language: "sql".into(),
            source: source.into(),
            kind: FunctionKind::Function,
            volatility: None,
            strict: false,
            security_definer: false,
            owner: None,
            comment: None,
            oldname: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_source_change_replaces_in_place() {
        let old = make_function("SELECT 1");
        let new = make_function("SELECT 2");
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            &steps[0],
            MigrationStep::Function(FunctionOperation::CreateOrReplace { .. })
        ));
    }

    #[test]
    fn test_return_type_change_drops_first() {
        let old = make_function("SELECT 1");
        let mut new = make_function("SELECT 't'");
        new.returns = Some("text".into());
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 2);
        assert!(steps[0].is_drop());
    }
}
