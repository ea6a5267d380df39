//! Foreign-data object operations

use super::OperationKind;
use crate::catalog::foreign::{ForeignDataWrapper, ForeignServer, ForeignTable, UserMapping};

#[derive(Debug, Clone)]
pub enum ForeignOperation {
    CreateWrapper { wrapper: Box<ForeignDataWrapper> },
    DropWrapper { name: String },
    CreateServer { server: Box<ForeignServer> },
    DropServer { name: String },
    CreateUserMapping { mapping: Box<UserMapping> },
    DropUserMapping { user: String, server: String },
    CreateForeignTable { table: Box<ForeignTable> },
    DropForeignTable { schema: String, name: String },
}

impl ForeignOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::CreateWrapper { .. }
            | Self::CreateServer { .. }
            | Self::CreateUserMapping { .. }
            | Self::CreateForeignTable { .. } => OperationKind::Create,
            Self::DropWrapper { .. }
            | Self::DropServer { .. }
            | Self::DropUserMapping { .. }
            | Self::DropForeignTable { .. } => OperationKind::Drop,
        }
    }
}
