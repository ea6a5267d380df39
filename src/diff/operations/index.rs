//! Index operations

use super::OperationKind;
use crate::catalog::index::Index;

#[derive(Debug, Clone)]
pub enum IndexOperation {
    Create {
        index: Box<Index>,
    },
    Drop {
        schema: String,
        name: String,
    },
    SetTablespace {
        schema: String,
        name: String,
        tablespace: String,
    },
}

impl IndexOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
            Self::SetTablespace { .. } => OperationKind::Alter,
        }
    }
}
