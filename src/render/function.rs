//! SQL rendering for function, aggregate and operator operations

use crate::catalog::function::{Function, FunctionKind};
use crate::catalog::id::DbObjectId;
use crate::diff::operations::{
    AggregateOperation, FunctionOperation, OperatorClassOperation, OperatorFamilyOperation,
    OperatorOperation,
};
use crate::render::{RenderedSql, SqlRenderer, escape_string, qualified, quote_ident};

/// Dollar-quote the function body, picking a tag that does not collide
/// with the body text.
fn dollar_quote(body: &str) -> String {
    let mut tag = String::new();
    loop {
        let delimiter = format!("${}$", tag);
        if !body.contains(&delimiter) {
            return format!("{}{}{}", delimiter, body, delimiter);
        }
        tag.push('x');
    }
}

fn render_create_function(function: &Function, or_replace: bool) -> String {
    let keyword = match (function.kind, or_replace) {
        (FunctionKind::Procedure, true) => "CREATE OR REPLACE PROCEDURE",
        (FunctionKind::Procedure, false) => "CREATE PROCEDURE",
        (FunctionKind::Function, true) => "CREATE OR REPLACE FUNCTION",
        (FunctionKind::Function, false) => "CREATE FUNCTION",
    };
    let mut sql = format!(
        "{} {}({})",
        keyword,
        qualified(&function.schema, &function.name),
        function.parameters
    );
    if let Some(returns) = &function.returns {
        sql.push_str(&format!("\n    RETURNS {}", returns));
    }
    sql.push_str(&format!("\n    LANGUAGE {}", function.language));
    if let Some(volatility) = &function.volatility {
        sql.push_str(&format!(" {}", volatility.to_uppercase()));
    }
    if function.strict {
        sql.push_str(" STRICT");
    }
    if function.security_definer {
        sql.push_str(" SECURITY DEFINER");
    }
    sql.push_str(&format!("\nAS {};", dollar_quote(&function.source)));
    sql
}

impl SqlRenderer for FunctionOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            FunctionOperation::Create { function } => {
                vec![RenderedSql::new(render_create_function(function, false))]
            }
            FunctionOperation::CreateOrReplace { function } => {
                vec![RenderedSql::new(render_create_function(function, true))]
            }
            FunctionOperation::Drop {
                schema,
                name,
                arguments,
                kind,
            } => vec![RenderedSql::destructive(format!(
                "DROP {} {}({});",
                kind.sql_keyword(),
                qualified(schema, name),
                arguments
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            FunctionOperation::Create { function }
            | FunctionOperation::CreateOrReplace { function } => function.id(),
            FunctionOperation::Drop {
                schema,
                name,
                arguments,
                ..
            } => DbObjectId::Function {
                schema: schema.clone(),
                name: name.clone(),
                arguments: arguments.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, FunctionOperation::Drop { .. })
    }
}

impl SqlRenderer for AggregateOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            AggregateOperation::Create { aggregate } => {
                let mut parts = vec![
                    format!("SFUNC = {}", aggregate.sfunc),
                    format!("STYPE = {}", aggregate.stype),
                ];
                if let Some(finalfunc) = &aggregate.finalfunc {
                    parts.push(format!("FINALFUNC = {}", finalfunc));
                }
                if let Some(combinefunc) = &aggregate.combinefunc {
                    parts.push(format!("COMBINEFUNC = {}", combinefunc));
                }
                if let Some(initcond) = &aggregate.initcond {
                    parts.push(format!("INITCOND = {}", escape_string(initcond)));
                }
                vec![RenderedSql::new(format!(
                    "CREATE AGGREGATE {}({}) (\n    {}\n);",
                    qualified(&aggregate.schema, &aggregate.name),
                    aggregate.arguments,
                    parts.join(",\n    ")
                ))]
            }
            AggregateOperation::Drop {
                schema,
                name,
                arguments,
            } => vec![RenderedSql::destructive(format!(
                "DROP AGGREGATE {}({});",
                qualified(schema, name),
                arguments
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            AggregateOperation::Create { aggregate } => aggregate.id(),
            AggregateOperation::Drop {
                schema,
                name,
                arguments,
            } => DbObjectId::Aggregate {
                schema: schema.clone(),
                name: name.clone(),
                arguments: arguments.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, AggregateOperation::Drop { .. })
    }
}

fn operator_signature(left: &Option<String>, right: &Option<String>) -> String {
    format!(
        "({}, {})",
        left.as_deref().unwrap_or("NONE"),
        right.as_deref().unwrap_or("NONE")
    )
}

impl SqlRenderer for OperatorOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            OperatorOperation::Create { operator } => {
                let mut parts = vec![format!("FUNCTION = {}", operator.function)];
                if let Some(left) = &operator.left {
                    parts.push(format!("LEFTARG = {}", left));
                }
                if let Some(right) = &operator.right {
                    parts.push(format!("RIGHTARG = {}", right));
                }
                if let Some(commutator) = &operator.commutator {
                    parts.push(format!("COMMUTATOR = {}", commutator));
                }
                if let Some(negator) = &operator.negator {
                    parts.push(format!("NEGATOR = {}", negator));
                }
                if let Some(restrict) = &operator.restrict {
                    parts.push(format!("RESTRICT = {}", restrict));
                }
                if let Some(join) = &operator.join {
                    parts.push(format!("JOIN = {}", join));
                }
                vec![RenderedSql::new(format!(
                    "CREATE OPERATOR {}.{} (\n    {}\n);",
                    quote_ident(&operator.schema),
                    operator.name,
                    parts.join(",\n    ")
                ))]
            }
            OperatorOperation::Drop {
                schema,
                name,
                left,
                right,
            } => vec![RenderedSql::destructive(format!(
                "DROP OPERATOR {}.{} {};",
                quote_ident(schema),
                name,
                operator_signature(left, right)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            OperatorOperation::Create { operator } => operator.id(),
            OperatorOperation::Drop {
                schema,
                name,
                left,
                right,
            } => DbObjectId::Operator {
                schema: schema.clone(),
                name: name.clone(),
                left: left.clone(),
                right: right.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, OperatorOperation::Drop { .. })
    }
}

impl SqlRenderer for OperatorClassOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            OperatorClassOperation::Create { class } => {
                let default = if class.default { "DEFAULT " } else { "" };
                let mut items: Vec<String> = class
                    .operators
                    .iter()
                    .map(|op| format!("OPERATOR {}", op))
                    .collect();
                items.extend(
                    class
                        .functions
                        .iter()
                        .map(|f| format!("FUNCTION {}", f)),
                );
                vec![RenderedSql::new(format!(
                    "CREATE OPERATOR CLASS {} {}FOR TYPE {} USING {} AS\n    {};",
                    qualified(&class.schema, &class.name),
                    default,
                    class.type_name,
                    class.method,
                    items.join(",\n    ")
                ))]
            }
            OperatorClassOperation::Drop {
                schema,
                name,
                method,
            } => vec![RenderedSql::destructive(format!(
                "DROP OPERATOR CLASS {} USING {};",
                qualified(schema, name),
                method
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            OperatorClassOperation::Create { class } => class.id(),
            OperatorClassOperation::Drop {
                schema,
                name,
                method,
            } => DbObjectId::OperatorClass {
                schema: schema.clone(),
                name: name.clone(),
                method: method.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, OperatorClassOperation::Drop { .. })
    }
}

impl SqlRenderer for OperatorFamilyOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            OperatorFamilyOperation::Create { family } => vec![RenderedSql::new(format!(
                "CREATE OPERATOR FAMILY {} USING {};",
                qualified(&family.schema, &family.name),
                family.method
            ))],
            OperatorFamilyOperation::Drop {
                schema,
                name,
                method,
            } => vec![RenderedSql::destructive(format!(
                "DROP OPERATOR FAMILY {} USING {};",
                qualified(schema, name),
                method
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            OperatorFamilyOperation::Create { family } => family.id(),
            OperatorFamilyOperation::Drop {
                schema,
                name,
                method,
            } => DbObjectId::OperatorFamily {
                schema: schema.clone(),
                name: name.clone(),
                method: method.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, OperatorFamilyOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_function() -> Function {
        Function {
            schema: "public".into(),
            name: "add_one".into(),
            arguments: "integer".into(),
            parameters: "n integer".into(),
            returns: Some("integer".into()),
            language: "sql".into(),
            source: "SELECT n + 1".into(),
            kind: FunctionKind::Function,
            volatility: Some("immutable".into()),
            strict: false,
            security_definer: false,
            owner: None,
            comment: None,
            oldname: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_render_create_function() {
        let op = FunctionOperation::Create {
            function: Box::new(make_function()),
        };
        let sql = &op.to_sql()[0].sql;
        assert!(sql.starts_with("CREATE FUNCTION \"public\".\"add_one\"(n integer)"));
        assert!(sql.contains("RETURNS integer"));
        assert!(sql.contains("LANGUAGE sql IMMUTABLE"));
        assert!(sql.contains("$$SELECT n + 1$$"));
    }

    #[test]
    fn test_dollar_quote_avoids_collision() {
        let quoted = dollar_quote("SELECT '$$'");
        assert!(quoted.starts_with("$x$"));
        assert!(quoted.ends_with("$x$"));
    }

    #[test]
    fn test_drop_function_includes_arguments() {
        let op = FunctionOperation::Drop {
            schema: "public".into(),
            name: "add_one".into(),
            arguments: "integer".into(),
            kind: FunctionKind::Function,
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "DROP FUNCTION \"public\".\"add_one\"(integer);"
        );
    }
}
