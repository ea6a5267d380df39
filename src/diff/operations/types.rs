//! Type and domain operations

use super::OperationKind;
use crate::catalog::custom_type::CustomType;
use crate::catalog::domain::{Domain, DomainCheck};

#[derive(Debug, Clone)]
pub enum TypeOperation {
    Create {
        type_: Box<CustomType>,
    },
    Drop {
        schema: String,
        name: String,
    },
    /// `ALTER TYPE ... ADD VALUE` for enum label additions.
    AddEnumValue {
        schema: String,
        name: String,
        value: String,
        /// Existing label to insert before; None appends at the end.
        before: Option<String>,
    },
}

impl TypeOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
            Self::AddEnumValue { .. } => OperationKind::Alter,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DomainOperation {
    Create {
        domain: Box<Domain>,
    },
    Drop {
        schema: String,
        name: String,
    },
    SetDefault {
        schema: String,
        name: String,
        /// None drops the default.
        default: Option<String>,
    },
    SetNotNull {
        schema: String,
        name: String,
        not_null: bool,
    },
    AddCheck {
        schema: String,
        name: String,
        check: DomainCheck,
    },
    DropCheck {
        schema: String,
        name: String,
        check_name: String,
    },
}

impl DomainOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
            _ => OperationKind::Alter,
        }
    }
}
