use crate::catalog::foreign::{ForeignDataWrapper, ForeignServer, ForeignTable, UserMapping};
use crate::diff::comment_utils::{comment_on_create, diff_comment, diff_owner};
use crate::diff::operations::{ForeignOperation, MigrationStep};
use crate::render::{qualified, quote_ident};

pub fn diff_wrapper(
    old: Option<&ForeignDataWrapper>,
    new: Option<&ForeignDataWrapper>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = quote_ident(&n.name);
            let mut steps = vec![MigrationStep::Foreign(ForeignOperation::CreateWrapper {
                wrapper: Box::new(n.clone()),
            })];
            steps.extend(diff_owner(
                "FOREIGN DATA WRAPPER",
                &identifier,
                n.id(),
                &None,
                &n.owner,
            ));
            steps.extend(comment_on_create(
                "FOREIGN DATA WRAPPER",
                &identifier,
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Foreign(ForeignOperation::DropWrapper {
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.handler != n.handler || o.validator != n.validator || o.options != n.options {
                steps.push(MigrationStep::Foreign(ForeignOperation::DropWrapper {
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Foreign(ForeignOperation::CreateWrapper {
                    wrapper: Box::new(n.clone()),
                }));
            }
            let identifier = quote_ident(&n.name);
            steps.extend(diff_owner(
                "FOREIGN DATA WRAPPER",
                &identifier,
                n.id(),
                &o.owner,
                &n.owner,
            ));
            steps.extend(diff_comment(
                "FOREIGN DATA WRAPPER",
                &identifier,
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_server(
    old: Option<&ForeignServer>,
    new: Option<&ForeignServer>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = quote_ident(&n.name);
            let mut steps = vec![MigrationStep::Foreign(ForeignOperation::CreateServer {
                server: Box::new(n.clone()),
            })];
            steps.extend(diff_owner("SERVER", &identifier, n.id(), &None, &n.owner));
            steps.extend(comment_on_create("SERVER", &identifier, n.id(), &n.comment));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Foreign(ForeignOperation::DropServer {
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.wrapper != n.wrapper
                || o.server_type != n.server_type
                || o.version != n.version
                || o.options != n.options
            {
                steps.push(MigrationStep::Foreign(ForeignOperation::DropServer {
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Foreign(ForeignOperation::CreateServer {
                    server: Box::new(n.clone()),
                }));
            }
            let identifier = quote_ident(&n.name);
            steps.extend(diff_owner("SERVER", &identifier, n.id(), &o.owner, &n.owner));
            steps.extend(diff_comment(
                "SERVER",
                &identifier,
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_user_mapping(
    old: Option<&UserMapping>,
    new: Option<&UserMapping>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => vec![MigrationStep::Foreign(ForeignOperation::CreateUserMapping {
            mapping: Box::new(n.clone()),
        })],
        (Some(o), None) => vec![MigrationStep::Foreign(ForeignOperation::DropUserMapping {
            user: o.user.clone(),
            server: o.server.clone(),
        })],
        (Some(o), Some(n)) => {
            if o.options != n.options {
                vec![
                    MigrationStep::Foreign(ForeignOperation::DropUserMapping {
                        user: o.user.clone(),
                        server: o.server.clone(),
                    }),
                    MigrationStep::Foreign(ForeignOperation::CreateUserMapping {
                        mapping: Box::new(n.clone()),
                    }),
                ]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

pub fn diff_foreign_table(
    old: Option<&ForeignTable>,
    new: Option<&ForeignTable>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = qualified(&n.schema, &n.name);
            let mut steps = vec![MigrationStep::Foreign(ForeignOperation::CreateForeignTable {
                table: Box::new(n.clone()),
            })];
            steps.extend(diff_owner(
                "FOREIGN TABLE",
                &identifier,
                n.id(),
                &None,
                &n.owner,
            ));
            steps.extend(comment_on_create(
                "FOREIGN TABLE",
                &identifier,
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Foreign(ForeignOperation::DropForeignTable {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.server != n.server || o.columns != n.columns || o.options != n.options {
                steps.push(MigrationStep::Foreign(ForeignOperation::DropForeignTable {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Foreign(ForeignOperation::CreateForeignTable {
                    table: Box::new(n.clone()),
                }));
            }
            let identifier = qualified(&n.schema, &n.name);
            steps.extend(diff_owner(
                "FOREIGN TABLE",
                &identifier,
                n.id(),
                &o.owner,
                &n.owner,
            ));
            steps.extend(diff_comment(
                "FOREIGN TABLE",
                &identifier,
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}
