use crate::catalog::table::Column;
use crate::diff::operations::ColumnAction;

/// Diff a single column. Equality is by name; position is never compared
/// here (Postgres cannot reorder columns anyway).
pub fn diff(old: Option<&Column>, new: Option<&Column>) -> Vec<ColumnAction> {
    match (old, new) {
        (None, Some(n)) => {
            vec![ColumnAction::Add { column: n.clone() }]
        }
        (Some(o), None) => {
            vec![ColumnAction::Drop {
                name: o.name.clone(),
            }]
        }
        (Some(o), Some(n)) => {
            let mut changes = Vec::new();

            if o.data_type != n.data_type || o.collation != n.collation {
                let new_type = match &n.collation {
                    Some(collation) => {
                        format!("{} COLLATE \"{}\"", n.data_type, collation)
                    }
                    None => n.data_type.clone(),
                };
                changes.push(ColumnAction::AlterType {
                    name: n.name.clone(),
                    new_type,
                });
            }

            if o.generated != n.generated {
                match (&o.generated, &n.generated) {
                    (Some(_), None) => {
                        changes.push(ColumnAction::DropGenerated {
                            name: n.name.clone(),
                        });
                    }
                    // a generation expression cannot be added or changed in
                    // place; recreate the column
                    _ => {
                        changes.push(ColumnAction::Drop {
                            name: n.name.clone(),
                        });
                        changes.extend(diff(None, Some(n)));
                        return changes;
                    }
                }
            }

            match (&o.default, &n.default) {
                (Some(_), None) => {
                    changes.push(ColumnAction::DropDefault {
                        name: n.name.clone(),
                    });
                }
                (None, Some(d)) => {
                    changes.push(ColumnAction::SetDefault {
                        name: n.name.clone(),
                        default: d.clone(),
                    });
                }
                (Some(od), Some(nd)) if od != nd => {
                    changes.push(ColumnAction::SetDefault {
                        name: n.name.clone(),
                        default: nd.clone(),
                    });
                }
                _ => {}
            }

            match (o.not_null, n.not_null) {
                (false, true) => {
                    changes.push(ColumnAction::SetNotNull {
                        name: n.name.clone(),
                    });
                }
                (true, false) => {
                    changes.push(ColumnAction::DropNotNull {
                        name: n.name.clone(),
                    });
                }
                _ => {}
            }

            match (&o.identity, &n.identity) {
                (None, Some(kind)) => {
                    changes.push(ColumnAction::AddIdentity {
                        name: n.name.clone(),
                        kind: kind.clone(),
                    });
                }
                (Some(_), None) => {
                    changes.push(ColumnAction::DropIdentity {
                        name: n.name.clone(),
                    });
                }
                (Some(old_kind), Some(new_kind)) if old_kind != new_kind => {
                    changes.push(ColumnAction::DropIdentity {
                        name: n.name.clone(),
                    });
                    changes.push(ColumnAction::AddIdentity {
                        name: n.name.clone(),
                        kind: new_kind.clone(),
                    });
                }
                _ => {}
            }

            if o.statistics != n.statistics {
                changes.push(ColumnAction::SetStatistics {
                    name: n.name.clone(),
                    value: n.statistics,
                });
            }

            if o.storage != n.storage {
                if let Some(storage) = &n.storage {
                    changes.push(ColumnAction::SetStorage {
                        name: n.name.clone(),
                        storage: storage.clone(),
                    });
                }
            }

            // comments need schema/table context; handled in the table diff
            changes
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::table::make_test_column;

    #[test]
    fn test_identical_columns_yield_nothing() {
        let c = make_test_column("a", "integer", true);
        assert!(diff(Some(&c), Some(&c)).is_empty());
    }

    #[test]
    fn test_type_change() {
        let old = make_test_column("c", "integer", false);
        let new = make_test_column("c", "text", false);
        let changes = diff(Some(&old), Some(&new));
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            ColumnAction::AlterType { name, new_type } => {
                assert_eq!(name, "c");
                assert_eq!(new_type, "text");
            }
            other => panic!("expected AlterType, got {:?}", other),
        }
    }

    #[test]
    fn test_default_change_emits_single_set() {
        let mut old = make_test_column("c", "integer", false);
        old.default = Some("1".to_string());
        let mut new = old.clone();
        new.default = Some("2".to_string());
        let changes = diff(Some(&old), Some(&new));
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], ColumnAction::SetDefault { default, .. } if default == "2"));
    }

    #[test]
    fn test_not_null_transitions() {
        let nullable = make_test_column("c", "integer", false);
        let required = make_test_column("c", "integer", true);

        let set = diff(Some(&nullable), Some(&required));
        assert!(matches!(set[0], ColumnAction::SetNotNull { .. }));

        let dropped = diff(Some(&required), Some(&nullable));
        assert!(matches!(dropped[0], ColumnAction::DropNotNull { .. }));
    }

    #[test]
    fn test_generation_expression_change_recreates_column() {
        let mut old = make_test_column("c", "integer", false);
        old.generated = Some("a + 1".to_string());
        let mut new = old.clone();
        new.generated = Some("a + 2".to_string());

        let changes = diff(Some(&old), Some(&new));
        assert!(matches!(changes[0], ColumnAction::Drop { .. }));
        assert!(matches!(changes[1], ColumnAction::Add { .. }));
    }

    #[test]
    fn test_statistics_change() {
        let old = make_test_column("c", "integer", false);
        let mut new = old.clone();
        new.statistics = Some(500);
        let changes = diff(Some(&old), Some(&new));
        assert!(
            matches!(changes[0], ColumnAction::SetStatistics { value: Some(500), .. })
        );
    }
}
