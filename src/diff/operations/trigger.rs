//! Trigger and rule operations

use super::OperationKind;
use crate::catalog::rule::Rule;
use crate::catalog::triggers::Trigger;

#[derive(Debug, Clone)]
pub enum TriggerOperation {
    Create {
        trigger: Box<Trigger>,
    },
    Drop {
        schema: String,
        table: String,
        name: String,
    },
}

impl TriggerOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RuleOperation {
    Create {
        rule: Box<Rule>,
    },
    Drop {
        schema: String,
        table: String,
        name: String,
    },
}

impl RuleOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}
