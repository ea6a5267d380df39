/// A globally unique identifier for any database object pgyaml models.
///
/// This is the external key: it pairs objects between the current and
/// desired catalogs during diff, identifies nodes in the scheduler graph,
/// and (formatted) becomes the YAML map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DbObjectId {
    Schema {
        name: String,
    },

    Extension {
        name: String,
    },

    Language {
        name: String,
    },

    Collation {
        schema: String,
        name: String,
    },
    Conversion {
        schema: String,
        name: String,
    },
    /// Casts are identified by the (source, target) type pair.
    Cast {
        source: String,
        target: String,
    },
    EventTrigger {
        name: String,
    },

    Type {
        schema: String,
        name: String,
    },
    Domain {
        schema: String,
        name: String,
    },
    Sequence {
        schema: String,
        name: String,
    },

    Table {
        schema: String,
        name: String,
    },
    Column {
        schema: String,
        table: String,
        column: String,
    },
    Constraint {
        schema: String,
        table: String,
        name: String,
    },
    Index {
        schema: String,
        name: String,
    },
    Trigger {
        schema: String,
        table: String,
        name: String,
    },
    Rule {
        schema: String,
        table: String,
        name: String,
    },

    View {
        schema: String,
        name: String,
    },
    MaterializedView {
        schema: String,
        name: String,
    },

    /// Functions are keyed by their identity argument list, e.g.
    /// `("public", "foo", "integer, text")`.
    Function {
        schema: String,
        name: String,
        arguments: String,
    },
    Aggregate {
        schema: String,
        name: String,
        arguments: String,
    },

    Operator {
        schema: String,
        name: String,
        left: Option<String>,
        right: Option<String>,
    },
    OperatorClass {
        schema: String,
        name: String,
        method: String,
    },
    OperatorFamily {
        schema: String,
        name: String,
        method: String,
    },

    TextSearchParser {
        schema: String,
        name: String,
    },
    TextSearchDictionary {
        schema: String,
        name: String,
    },
    TextSearchTemplate {
        schema: String,
        name: String,
    },
    TextSearchConfiguration {
        schema: String,
        name: String,
    },

    ForeignDataWrapper {
        name: String,
    },
    ForeignServer {
        name: String,
    },
    UserMapping {
        user: String,
        server: String,
    },
    ForeignTable {
        schema: String,
        name: String,
    },

    Grant {
        id: String, // "grantee@object_type:object_name"
    },
    Comment {
        object_id: Box<DbObjectId>,
    },
}

impl DbObjectId {
    /// Get the schema name for this object, if applicable.
    /// Returns None for database-wide objects (extensions, languages, casts,
    /// event triggers, foreign-data wrappers, servers, user mappings and
    /// grants). Comment delegates to the commented object.
    pub fn schema(&self) -> Option<&str> {
        match self {
            DbObjectId::Schema { name } => Some(name.as_str()),
            DbObjectId::Collation { schema, .. }
            | DbObjectId::Conversion { schema, .. }
            | DbObjectId::Type { schema, .. }
            | DbObjectId::Domain { schema, .. }
            | DbObjectId::Sequence { schema, .. }
            | DbObjectId::Table { schema, .. }
            | DbObjectId::Column { schema, .. }
            | DbObjectId::Constraint { schema, .. }
            | DbObjectId::Index { schema, .. }
            | DbObjectId::Trigger { schema, .. }
            | DbObjectId::Rule { schema, .. }
            | DbObjectId::View { schema, .. }
            | DbObjectId::MaterializedView { schema, .. }
            | DbObjectId::Function { schema, .. }
            | DbObjectId::Aggregate { schema, .. }
            | DbObjectId::Operator { schema, .. }
            | DbObjectId::OperatorClass { schema, .. }
            | DbObjectId::OperatorFamily { schema, .. }
            | DbObjectId::TextSearchParser { schema, .. }
            | DbObjectId::TextSearchDictionary { schema, .. }
            | DbObjectId::TextSearchTemplate { schema, .. }
            | DbObjectId::TextSearchConfiguration { schema, .. }
            | DbObjectId::ForeignTable { schema, .. } => Some(schema.as_str()),
            DbObjectId::Extension { .. }
            | DbObjectId::Language { .. }
            | DbObjectId::Cast { .. }
            | DbObjectId::EventTrigger { .. }
            | DbObjectId::ForeignDataWrapper { .. }
            | DbObjectId::ForeignServer { .. }
            | DbObjectId::UserMapping { .. }
            | DbObjectId::Grant { .. } => None,
            DbObjectId::Comment { object_id } => object_id.schema(),
        }
    }

    /// Lower-case noun used in YAML map keys and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            DbObjectId::Schema { .. } => "schema",
            DbObjectId::Extension { .. } => "extension",
            DbObjectId::Language { .. } => "language",
            DbObjectId::Collation { .. } => "collation",
            DbObjectId::Conversion { .. } => "conversion",
            DbObjectId::Cast { .. } => "cast",
            DbObjectId::EventTrigger { .. } => "event trigger",
            DbObjectId::Type { .. } => "type",
            DbObjectId::Domain { .. } => "domain",
            DbObjectId::Sequence { .. } => "sequence",
            DbObjectId::Table { .. } => "table",
            DbObjectId::Column { .. } => "column",
            DbObjectId::Constraint { .. } => "constraint",
            DbObjectId::Index { .. } => "index",
            DbObjectId::Trigger { .. } => "trigger",
            DbObjectId::Rule { .. } => "rule",
            DbObjectId::View { .. } => "view",
            DbObjectId::MaterializedView { .. } => "materialized view",
            DbObjectId::Function { .. } => "function",
            DbObjectId::Aggregate { .. } => "aggregate",
            DbObjectId::Operator { .. } => "operator",
            DbObjectId::OperatorClass { .. } => "operator class",
            DbObjectId::OperatorFamily { .. } => "operator family",
            DbObjectId::TextSearchParser { .. } => "text search parser",
            DbObjectId::TextSearchDictionary { .. } => "text search dictionary",
            DbObjectId::TextSearchTemplate { .. } => "text search template",
            DbObjectId::TextSearchConfiguration { .. } => "text search configuration",
            DbObjectId::ForeignDataWrapper { .. } => "foreign data wrapper",
            DbObjectId::ForeignServer { .. } => "server",
            DbObjectId::UserMapping { .. } => "user mapping",
            DbObjectId::ForeignTable { .. } => "foreign table",
            DbObjectId::Grant { .. } => "grant",
            DbObjectId::Comment { .. } => "comment",
        }
    }
}

pub trait DependsOn {
    fn id(&self) -> DbObjectId;
    fn depends_on(&self) -> &[DbObjectId];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_method() {
        assert_eq!(
            DbObjectId::Schema {
                name: "public".to_string()
            }
            .schema(),
            Some("public")
        );

        assert_eq!(
            DbObjectId::Table {
                schema: "app".to_string(),
                name: "users".to_string()
            }
            .schema(),
            Some("app")
        );

        assert_eq!(
            DbObjectId::Cast {
                source: "text".to_string(),
                target: "integer".to_string()
            }
            .schema(),
            None
        );

        assert_eq!(
            DbObjectId::Comment {
                object_id: Box::new(DbObjectId::View {
                    schema: "reports".to_string(),
                    name: "totals".to_string()
                })
            }
            .schema(),
            Some("reports")
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            DbObjectId::MaterializedView {
                schema: "s".into(),
                name: "m".into()
            }
            .kind(),
            "materialized view"
        );
        assert_eq!(
            DbObjectId::TextSearchDictionary {
                schema: "s".into(),
                name: "d".into()
            }
            .kind(),
            "text search dictionary"
        );
    }
}
