//! Extension and procedural-language operations

use super::OperationKind;
use crate::catalog::extension::Extension;
use crate::catalog::language::Language;

#[derive(Debug, Clone)]
pub enum ExtensionOperation {
    Create { extension: Box<Extension> },
    Drop { name: String },
    /// `ALTER EXTENSION ... UPDATE TO 'version'`
    Update { name: String, version: String },
}

impl ExtensionOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
            Self::Update { .. } => OperationKind::Alter,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LanguageOperation {
    Create { language: Box<Language> },
    Drop { name: String },
}

impl LanguageOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Drop { .. } => OperationKind::Drop,
        }
    }
}
