//! Text-search object operations

use super::OperationKind;
use crate::catalog::text_search::{TsConfiguration, TsDictionary, TsParser, TsTemplate};

#[derive(Debug, Clone)]
pub enum TextSearchOperation {
    CreateParser { parser: Box<TsParser> },
    DropParser { schema: String, name: String },
    CreateDictionary { dictionary: Box<TsDictionary> },
    DropDictionary { schema: String, name: String },
    CreateTemplate { template: Box<TsTemplate> },
    DropTemplate { schema: String, name: String },
    CreateConfiguration { configuration: Box<TsConfiguration> },
    DropConfiguration { schema: String, name: String },
}

impl TextSearchOperation {
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::CreateParser { .. }
            | Self::CreateDictionary { .. }
            | Self::CreateTemplate { .. }
            | Self::CreateConfiguration { .. } => OperationKind::Create,
            Self::DropParser { .. }
            | Self::DropDictionary { .. }
            | Self::DropTemplate { .. }
            | Self::DropConfiguration { .. } => OperationKind::Drop,
        }
    }
}
