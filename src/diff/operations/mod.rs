//! Hierarchical migration operations.
//!
//! Every change record the differ can emit is a `MigrationStep` variant
//! wrapping a per-kind operation enum; rendering lives in `crate::render`
//! behind the `SqlRenderer` trait. Owner changes, renames and comments are
//! uniform across kinds and use the generic operations at the bottom.

use crate::catalog::id::DbObjectId;

// Re-export SqlRenderer from render module
pub use crate::render::SqlRenderer;

pub use cast::*;
pub use constraint::*;
pub use extension::*;
pub use foreign::*;
pub use function::*;
pub use generic::*;
pub use grant::*;
pub use index::*;
pub use schema::*;
pub use sequence::*;
pub use table::*;
pub use text_search::*;
pub use trigger::*;
pub use types::*;
pub use view::*;

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Drop,
    Alter,
}

/// Main migration step.
#[derive(Debug, Clone)]
pub enum MigrationStep {
    Schema(SchemaOperation),
    Extension(ExtensionOperation),
    Language(LanguageOperation),
    Collation(CollationOperation),
    Conversion(ConversionOperation),
    Cast(CastOperation),
    EventTrigger(EventTriggerOperation),
    Type(TypeOperation),
    Domain(DomainOperation),
    Sequence(SequenceOperation),
    Table(TableOperation),
    Constraint(ConstraintOperation),
    Index(IndexOperation),
    Trigger(TriggerOperation),
    Rule(RuleOperation),
    View(ViewOperation),
    Function(FunctionOperation),
    Aggregate(AggregateOperation),
    Operator(OperatorOperation),
    OperatorClass(OperatorClassOperation),
    OperatorFamily(OperatorFamilyOperation),
    TextSearch(TextSearchOperation),
    Foreign(ForeignOperation),
    Grant(GrantOperation),
    Owner(OwnerOperation),
    Rename(RenameOperation),
    Comment(CommentStep),
}

impl MigrationStep {
    pub fn id(&self) -> DbObjectId {
        self.db_object_id()
    }

    pub fn is_drop(&self) -> bool {
        self.operation_kind() == OperationKind::Drop
    }

    pub fn is_create(&self) -> bool {
        self.operation_kind() == OperationKind::Create
    }

    pub fn operation_kind(&self) -> OperationKind {
        match self {
            MigrationStep::Schema(op) => op.operation_kind(),
            MigrationStep::Extension(op) => op.operation_kind(),
            MigrationStep::Language(op) => op.operation_kind(),
            MigrationStep::Collation(op) => op.operation_kind(),
            MigrationStep::Conversion(op) => op.operation_kind(),
            MigrationStep::Cast(op) => op.operation_kind(),
            MigrationStep::EventTrigger(op) => op.operation_kind(),
            MigrationStep::Type(op) => op.operation_kind(),
            MigrationStep::Domain(op) => op.operation_kind(),
            MigrationStep::Sequence(op) => op.operation_kind(),
            MigrationStep::Table(op) => op.operation_kind(),
            MigrationStep::Constraint(op) => op.operation_kind(),
            MigrationStep::Index(op) => op.operation_kind(),
            MigrationStep::Trigger(op) => op.operation_kind(),
            MigrationStep::Rule(op) => op.operation_kind(),
            MigrationStep::View(op) => op.operation_kind(),
            MigrationStep::Function(op) => op.operation_kind(),
            MigrationStep::Aggregate(op) => op.operation_kind(),
            MigrationStep::Operator(op) => op.operation_kind(),
            MigrationStep::OperatorClass(op) => op.operation_kind(),
            MigrationStep::OperatorFamily(op) => op.operation_kind(),
            MigrationStep::TextSearch(op) => op.operation_kind(),
            MigrationStep::Foreign(op) => op.operation_kind(),
            MigrationStep::Grant(_) => OperationKind::Alter,
            MigrationStep::Owner(_) => OperationKind::Alter,
            MigrationStep::Rename(_) => OperationKind::Alter,
            MigrationStep::Comment(_) => OperationKind::Alter,
        }
    }

    /// Relationship steps close cycles (FKs, sequence ownership) and run in
    /// a second phase after all primary object creation.
    pub fn is_relationship(&self) -> bool {
        match self {
            MigrationStep::Sequence(SequenceOperation::AlterOwnership { .. }) => true,
            MigrationStep::Constraint(ConstraintOperation::Create(constraint)) => {
                constraint.is_foreign_key()
            }
            _ => false,
        }
    }

    /// Step-level dependencies for steps that aren't in the catalog's
    /// forward_deps (dynamically generated grant steps).
    pub fn dependencies(&self) -> Vec<DbObjectId> {
        match self {
            MigrationStep::Grant(GrantOperation::Grant { grant })
            | MigrationStep::Grant(GrantOperation::Revoke { grant }) => grant.depends_on.clone(),
            _ => vec![],
        }
    }

    /// Kind label for diagnostics (cycle errors).
    pub fn kind_name(&self) -> &'static str {
        match self {
            MigrationStep::Schema(_) => "Schema",
            MigrationStep::Extension(_) => "Extension",
            MigrationStep::Language(_) => "Language",
            MigrationStep::Collation(_) => "Collation",
            MigrationStep::Conversion(_) => "Conversion",
            MigrationStep::Cast(_) => "Cast",
            MigrationStep::EventTrigger(_) => "EventTrigger",
            MigrationStep::Type(_) => "Type",
            MigrationStep::Domain(_) => "Domain",
            MigrationStep::Sequence(_) => "Sequence",
            MigrationStep::Table(_) => "Table",
            MigrationStep::Constraint(_) => "Constraint",
            MigrationStep::Index(_) => "Index",
            MigrationStep::Trigger(_) => "Trigger",
            MigrationStep::Rule(_) => "Rule",
            MigrationStep::View(_) => "View",
            MigrationStep::Function(_) => "Function",
            MigrationStep::Aggregate(_) => "Aggregate",
            MigrationStep::Operator(_) => "Operator",
            MigrationStep::OperatorClass(_) => "OperatorClass",
            MigrationStep::OperatorFamily(_) => "OperatorFamily",
            MigrationStep::TextSearch(_) => "TextSearch",
            MigrationStep::Foreign(_) => "Foreign",
            MigrationStep::Grant(_) => "Grant",
            MigrationStep::Owner(_) => "Owner",
            MigrationStep::Rename(_) => "Rename",
            MigrationStep::Comment(_) => "Comment",
        }
    }
}
