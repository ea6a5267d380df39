//! Constraint operations

use super::OperationKind;
use crate::catalog::constraint::Constraint;

#[derive(Debug, Clone)]
pub enum ConstraintOperation {
    Create(Constraint),
    Drop {
        schema: String,
        table: String,
        name: String,
    },
}

impl ConstraintOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create(_) => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}
