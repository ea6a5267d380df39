use crate::catalog::text_search::{TsConfiguration, TsDictionary, TsParser, TsTemplate};
use crate::diff::comment_utils::{comment_on_create, diff_comment};
use crate::diff::operations::{MigrationStep, TextSearchOperation};
use crate::render::qualified;

pub fn diff_parser(old: Option<&TsParser>, new: Option<&TsParser>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::TextSearch(TextSearchOperation::CreateParser {
                parser: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "TEXT SEARCH PARSER",
                &qualified(&n.schema, &n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::TextSearch(TextSearchOperation::DropParser {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.start != n.start
                || o.gettoken != n.gettoken
                || o.end != n.end
                || o.lextypes != n.lextypes
                || o.headline != n.headline
            {
                steps.push(MigrationStep::TextSearch(TextSearchOperation::DropParser {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::TextSearch(TextSearchOperation::CreateParser {
                    parser: Box::new(n.clone()),
                }));
            }
            steps.extend(diff_comment(
                "TEXT SEARCH PARSER",
                &qualified(&n.schema, &n.name),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_template(old: Option<&TsTemplate>, new: Option<&TsTemplate>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::TextSearch(
                TextSearchOperation::CreateTemplate {
                    template: Box::new(n.clone()),
                },
            )];
            steps.extend(comment_on_create(
                "TEXT SEARCH TEMPLATE",
                &qualified(&n.schema, &n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::TextSearch(TextSearchOperation::DropTemplate {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.init != n.init || o.lexize != n.lexize {
                steps.push(MigrationStep::TextSearch(TextSearchOperation::DropTemplate {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::TextSearch(
                    TextSearchOperation::CreateTemplate {
                        template: Box::new(n.clone()),
                    },
                ));
            }
            steps.extend(diff_comment(
                "TEXT SEARCH TEMPLATE",
                &qualified(&n.schema, &n.name),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_dictionary(
    old: Option<&TsDictionary>,
    new: Option<&TsDictionary>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::TextSearch(
                TextSearchOperation::CreateDictionary {
                    dictionary: Box::new(n.clone()),
                },
            )];
            steps.extend(comment_on_create(
                "TEXT SEARCH DICTIONARY",
                &qualified(&n.schema, &n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::TextSearch(
            TextSearchOperation::DropDictionary {
                schema: o.schema.clone(),
                name: o.name.clone(),
            },
        )],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.template != n.template || o.options != n.options {
                steps.push(MigrationStep::TextSearch(
                    TextSearchOperation::DropDictionary {
                        schema: o.schema.clone(),
                        name: o.name.clone(),
                    },
                ));
                steps.push(MigrationStep::TextSearch(
                    TextSearchOperation::CreateDictionary {
                        dictionary: Box::new(n.clone()),
                    },
                ));
            }
            steps.extend(diff_comment(
                "TEXT SEARCH DICTIONARY",
                &qualified(&n.schema, &n.name),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_configuration(
    old: Option<&TsConfiguration>,
    new: Option<&TsConfiguration>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::TextSearch(
                TextSearchOperation::CreateConfiguration {
                    configuration: Box::new(n.clone()),
                },
            )];
            steps.extend(comment_on_create(
                "TEXT SEARCH CONFIGURATION",
                &qualified(&n.schema, &n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::TextSearch(
            TextSearchOperation::DropConfiguration {
                schema: o.schema.clone(),
                name: o.name.clone(),
            },
        )],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.parser != n.parser {
                steps.push(MigrationStep::TextSearch(
                    TextSearchOperation::DropConfiguration {
                        schema: o.schema.clone(),
                        name: o.name.clone(),
                    },
                ));
                steps.push(MigrationStep::TextSearch(
                    TextSearchOperation::CreateConfiguration {
                        configuration: Box::new(n.clone()),
                    },
                ));
            }
            steps.extend(diff_comment(
                "TEXT SEARCH CONFIGURATION",
                &qualified(&n.schema, &n.name),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}
