//! SQL rendering for type and domain operations

use crate::catalog::custom_type::TypeDefinition;
use crate::catalog::id::DbObjectId;
use crate::diff::operations::{DomainOperation, TypeOperation};
use crate::render::{RenderedSql, SqlRenderer, escape_string, qualified, quote_ident};

impl SqlRenderer for TypeOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            TypeOperation::Create { type_ } => {
                let name = qualified(&type_.schema, &type_.name);
                let sql = match &type_.definition {
                    TypeDefinition::Enum { labels } => {
                        let labels = labels
                            .iter()
                            .map(|l| escape_string(l))
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!("CREATE TYPE {} AS ENUM ({});", name, labels)
                    }
                    TypeDefinition::Composite { attributes } => {
                        let attrs = attributes
                            .iter()
                            .map(|a| {
                                let mut def =
                                    format!("    {} {}", quote_ident(&a.name), a.data_type);
                                if let Some(collation) = &a.collation {
                                    def.push_str(&format!(" COLLATE \"{}\"", collation));
                                }
                                def
                            })
                            .collect::<Vec<_>>()
                            .join(",\n");
                        format!("CREATE TYPE {} AS (\n{}\n);", name, attrs)
                    }
                    TypeDefinition::Range {
                        subtype,
                        subtype_opclass,
                        canonical,
                        subtype_diff,
                    } => {
                        let mut parts = vec![format!("SUBTYPE = {}", subtype)];
                        if let Some(opclass) = subtype_opclass {
                            parts.push(format!("SUBTYPE_OPCLASS = {}", opclass));
                        }
                        if let Some(canonical) = canonical {
                            parts.push(format!("CANONICAL = {}", canonical));
                        }
                        if let Some(diff) = subtype_diff {
                            parts.push(format!("SUBTYPE_DIFF = {}", diff));
                        }
                        format!("CREATE TYPE {} AS RANGE ({});", name, parts.join(", "))
                    }
                    TypeDefinition::Base {
                        input,
                        output,
                        internallength,
                        alignment,
                        storage,
                    } => {
                        let mut parts =
                            vec![format!("INPUT = {}", input), format!("OUTPUT = {}", output)];
                        if let Some(len) = internallength {
                            parts.push(format!("INTERNALLENGTH = {}", len));
                        }
                        if let Some(alignment) = alignment {
                            parts.push(format!("ALIGNMENT = {}", alignment));
                        }
                        if let Some(storage) = storage {
                            parts.push(format!("STORAGE = {}", storage));
                        }
                        format!("CREATE TYPE {} ({});", name, parts.join(", "))
                    }
                };
                vec![RenderedSql::new(sql)]
            }
            TypeOperation::Drop { schema, name } => vec![RenderedSql::destructive(format!(
                "DROP TYPE {};",
                qualified(schema, name)
            ))],
            TypeOperation::AddEnumValue {
                schema,
                name,
                value,
                before,
            } => {
                let position = match before {
                    Some(label) => format!(" BEFORE {}", escape_string(label)),
                    None => String::new(),
                };
                vec![RenderedSql::new(format!(
                    "ALTER TYPE {} ADD VALUE {}{};",
                    qualified(schema, name),
                    escape_string(value),
                    position
                ))]
            }
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            TypeOperation::Create { type_ } => DbObjectId::Type {
                schema: type_.schema.clone(),
                name: type_.name.clone(),
            },
            TypeOperation::Drop { schema, name }
            | TypeOperation::AddEnumValue { schema, name, .. } => DbObjectId::Type {
                schema: schema.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, TypeOperation::Drop { .. })
    }
}

impl SqlRenderer for DomainOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            DomainOperation::Create { domain } => {
                let mut sql = format!(
                    "CREATE DOMAIN {} AS {}",
                    qualified(&domain.schema, &domain.name),
                    domain.data_type
                );
                if let Some(default) = &domain.default {
                    sql.push_str(&format!(" DEFAULT {}", default));
                }
                if domain.not_null {
                    sql.push_str(" NOT NULL");
                }
                for check in &domain.check_constraints {
                    sql.push_str(&format!(
                        "\n    CONSTRAINT {} CHECK {}",
                        quote_ident(&check.name),
                        check.expression
                    ));
                }
                sql.push(';');
                vec![RenderedSql::new(sql)]
            }
            DomainOperation::Drop { schema, name } => vec![RenderedSql::destructive(format!(
                "DROP DOMAIN {};",
                qualified(schema, name)
            ))],
            DomainOperation::SetDefault {
                schema,
                name,
                default,
            } => {
                let action = match default {
                    Some(default) => format!("SET DEFAULT {}", default),
                    None => "DROP DEFAULT".to_string(),
                };
                vec![RenderedSql::new(format!(
                    "ALTER DOMAIN {} {};",
                    qualified(schema, name),
                    action
                ))]
            }
            DomainOperation::SetNotNull {
                schema,
                name,
                not_null,
            } => {
                let action = if *not_null {
                    "SET NOT NULL"
                } else {
                    "DROP NOT NULL"
                };
                vec![RenderedSql::new(format!(
                    "ALTER DOMAIN {} {};",
                    qualified(schema, name),
                    action
                ))]
            }
            DomainOperation::AddCheck {
                schema,
                name,
                check,
            } => vec![RenderedSql::new(format!(
                "ALTER DOMAIN {} ADD CONSTRAINT {} CHECK {};",
                qualified(schema, name),
                quote_ident(&check.name),
                check.expression
            ))],
            DomainOperation::DropCheck {
                schema,
                name,
                check_name,
            } => vec![RenderedSql::destructive(format!(
                "ALTER DOMAIN {} DROP CONSTRAINT {};",
                qualified(schema, name),
                quote_ident(check_name)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            DomainOperation::Create { domain } => DbObjectId::Domain {
                schema: domain.schema.clone(),
                name: domain.name.clone(),
            },
            DomainOperation::Drop { schema, name }
            | DomainOperation::SetDefault { schema, name, .. }
            | DomainOperation::SetNotNull { schema, name, .. }
            | DomainOperation::AddCheck { schema, name, .. }
            | DomainOperation::DropCheck { schema, name, .. } => DbObjectId::Domain {
                schema: schema.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, DomainOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::custom_type::CustomType;

    #[test]
    fn test_create_enum_type() {
        let op = TypeOperation::Create {
            type_: Box::new(CustomType {
                schema: "public".to_string(),
                name: "mood".to_string(),
                definition: TypeDefinition::Enum {
                    labels: vec!["sad".to_string(), "ok".to_string(), "happy".to_string()],
                },
                owner: None,
                comment: None,
                depends_on: vec![],
            }),
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "CREATE TYPE \"public\".\"mood\" AS ENUM ('sad', 'ok', 'happy');"
        );
    }

    #[test]
    fn test_add_enum_value_before() {
        let op = TypeOperation::AddEnumValue {
            schema: "public".to_string(),
            name: "mood".to_string(),
            value: "meh".to_string(),
            before: Some("ok".to_string()),
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "ALTER TYPE \"public\".\"mood\" ADD VALUE 'meh' BEFORE 'ok';"
        );
    }
}
