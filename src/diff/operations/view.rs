//! View and materialized-view operations

use super::OperationKind;
use crate::catalog::view::View;

#[derive(Debug, Clone)]
pub enum ViewOperation {
    Create {
        view: Box<View>,
    },
    /// `CREATE OR REPLACE VIEW` for definition changes (plain views only;
    /// materialized views drop and recreate).
    Replace {
        view: Box<View>,
    },
    Drop {
        schema: String,
        name: String,
        materialized: bool,
    },
}

impl ViewOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Replace { .. } => OperationKind::Alter,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}
