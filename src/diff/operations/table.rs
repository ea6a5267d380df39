//! Table operations

use super::OperationKind;
use crate::catalog::table::{Column, Table};

#[derive(Debug, Clone)]
pub enum TableOperation {
    Create {
        table: Box<Table>,
    },
    Drop {
        schema: String,
        name: String,
    },
    Alter {
        schema: String,
        name: String,
        actions: Vec<ColumnAction>,
    },
}

impl TableOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
            Self::Alter { .. } => OperationKind::Alter,
        }
    }
}

/// Actions within ALTER TABLE. Mostly column-level; the tail entries are
/// table-level toggles that share the same statement prefix.
#[derive(Debug, Clone)]
pub enum ColumnAction {
    Add { column: Column },
    Drop { name: String },
    Rename { old: String, new: String },
    SetNotNull { name: String },
    DropNotNull { name: String },
    SetDefault { name: String, default: String },
    DropDefault { name: String },
    DropGenerated { name: String },
    AlterType { name: String, new_type: String },
    SetStatistics { name: String, value: Option<i32> },
    SetStorage { name: String, storage: String },
    AddIdentity { name: String, kind: String },
    DropIdentity { name: String },
    SetTablespace { tablespace: Option<String> },
    SetLogged,
    SetUnlogged,
    SetOption { option: String },
    ResetOption { option: String },
    Inherit { parent: String },
    NoInherit { parent: String },
}
