//! Sequence operations

use super::OperationKind;
use crate::catalog::sequence::Sequence;

#[derive(Debug, Clone)]
pub enum SequenceOperation {
    Create {
        sequence: Box<Sequence>,
    },
    Drop {
        schema: String,
        name: String,
    },
    /// Re-state all attributes from the desired sequence.
    Alter {
        sequence: Box<Sequence>,
    },
    /// `ALTER SEQUENCE ... OWNED BY ...`; runs in the relationship phase
    /// because it closes the table ↔ sequence cycle.
    AlterOwnership {
        schema: String,
        name: String,
        /// "schema.table.column"; None resets to OWNED BY NONE.
        owned_by: Option<String>,
    },
}

impl SequenceOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
            Self::Alter { .. } | Self::AlterOwnership { .. } => OperationKind::Alter,
        }
    }
}
