//! Schema operations

use super::OperationKind;
use crate::catalog::schema::Schema;

#[derive(Debug, Clone)]
pub enum SchemaOperation {
    Create { schema: Box<Schema> },
    Drop { name: String },
}

impl SchemaOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}
