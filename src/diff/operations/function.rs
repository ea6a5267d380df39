//! Function and aggregate operations

use super::OperationKind;
use crate::catalog::aggregate::Aggregate;
use crate::catalog::function::{Function, FunctionKind};

#[derive(Debug, Clone)]
pub enum FunctionOperation {
    Create {
        function: Box<Function>,
    },
    /// `CREATE OR REPLACE` for source/attribute changes that keep the
    /// signature.
    CreateOrReplace {
        function: Box<Function>,
    },
    Drop {
        schema: String,
        name: String,
        arguments: String,
        kind: FunctionKind,
    },
}

impl FunctionOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::CreateOrReplace { .. } => OperationKind::Alter,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AggregateOperation {
    Create {
        aggregate: Box<Aggregate>,
    },
    Drop {
        schema: String,
        name: String,
        arguments: String,
    },
}

impl AggregateOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OperatorOperation {
    Create {
        operator: Box<crate::catalog::operator::Operator>,
    },
    Drop {
        schema: String,
        name: String,
        left: Option<String>,
        right: Option<String>,
    },
}

impl OperatorOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OperatorClassOperation {
    Create {
        class: Box<crate::catalog::operator::OperatorClass>,
    },
    Drop {
        schema: String,
        name: String,
        method: String,
    },
}

impl OperatorClassOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OperatorFamilyOperation {
    Create {
        family: Box<crate::catalog::operator::OperatorFamily>,
    },
    Drop {
        schema: String,
        name: String,
        method: String,
    },
}

impl OperatorFamilyOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}
