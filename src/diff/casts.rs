//! Diffs for casts, collations, conversions and event triggers. These
//! kinds have no in-place ALTER worth modeling: a definition change drops
//! and recreates.

use crate::catalog::cast::Cast;
use crate::catalog::collation::Collation;
use crate::catalog::conversion::Conversion;
use crate::catalog::event_trigger::EventTrigger;
use crate::diff::comment_utils::{comment_on_create, diff_comment};
use crate::diff::operations::{
    CastOperation, CollationOperation, ConversionOperation, EventTriggerOperation, MigrationStep,
};
use crate::render::{qualified, quote_ident};

fn cast_identifier(cast: &Cast) -> String {
    format!("({} AS {})", cast.source, cast.target)
}

pub fn diff(old: Option<&Cast>, new: Option<&Cast>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Cast(CastOperation::Create {
                cast: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "CAST",
                &cast_identifier(n),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Cast(CastOperation::Drop {
            source: o.source.clone(),
            target: o.target.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.function != n.function || o.context != n.context || o.method != n.method {
                steps.push(MigrationStep::Cast(CastOperation::Drop {
                    source: o.source.clone(),
                    target: o.target.clone(),
                }));
                steps.push(MigrationStep::Cast(CastOperation::Create {
                    cast: Box::new(n.clone()),
                }));
            }
            steps.extend(diff_comment(
                "CAST",
                &cast_identifier(n),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_collation(old: Option<&Collation>, new: Option<&Collation>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Collation(CollationOperation::Create {
                collation: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "COLLATION",
                &qualified(&n.schema, &n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Collation(CollationOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.lc_collate != n.lc_collate
                || o.lc_ctype != n.lc_ctype
                || o.provider != n.provider
            {
                steps.push(MigrationStep::Collation(CollationOperation::Drop {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Collation(CollationOperation::Create {
                    collation: Box::new(n.clone()),
                }));
            }
            steps.extend(diff_comment(
                "COLLATION",
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

pub fn diff_conversion(old: Option<&Conversion>, new: Option<&Conversion>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Conversion(ConversionOperation::Create {
                conversion: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "CONVERSION",
                &qualified(&n.schema, &n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Conversion(ConversionOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.source_encoding != n.source_encoding
                || o.dest_encoding != n.dest_encoding
                || o.function != n.function
                || o.default != n.default
            {
                steps.push(MigrationStep::Conversion(ConversionOperation::Drop {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Conversion(ConversionOperation::Create {
                    conversion: Box::new(n.clone()),
                }));
            }
            steps.extend(diff_comment(
                "CONVERSION",
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

pub fn diff_event_trigger(
    old: Option<&EventTrigger>,
    new: Option<&EventTrigger>,
) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::EventTrigger(EventTriggerOperation::Create {
                trigger: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "EVENT TRIGGER",
                &quote_ident(&n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::EventTrigger(EventTriggerOperation::Drop {
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.event != n.event || o.tags != n.tags || o.function != n.function {
                steps.push(MigrationStep::EventTrigger(EventTriggerOperation::Drop {
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::EventTrigger(EventTriggerOperation::Create {
                    trigger: Box::new(n.clone()),
                }));
            } else if o.enabled != n.enabled {
                steps.push(MigrationStep::EventTrigger(
                    EventTriggerOperation::SetEnabled {
                        name: n.name.clone(),
                        enabled: n.enabled,
                    },
                ));
            }
            steps.extend(diff_comment(
                "EVENT TRIGGER",
                &quote_ident(&n.name),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}
