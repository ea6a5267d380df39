//! Grant diffing: set-difference over (grantee, privilege, grantable)
//! triples. Triples only in the current catalog REVOKE; triples only in
//! the desired catalog GRANT. Owner grants are implicit and skipped.

use crate::catalog::grant::{Grant, GranteeType};
use crate::diff::operations::{GrantOperation, MigrationStep};
use std::collections::BTreeMap;

fn is_owner_grant(grant: &Grant) -> bool {
    match &grant.grantee {
        GranteeType::Role(role_name) => role_name == &grant.object_owner,
        GranteeType::Public => false,
    }
}

/// Privileges of `from` not present in `minus`, as a grant record.
fn privilege_difference(from: &Grant, minus: Option<&Grant>) -> Option<Grant> {
    let remaining: Vec<String> = match minus {
        Some(other) => from
            .privileges
            .iter()
            .filter(|p| !other.privileges.iter().any(|q| q.eq_ignore_ascii_case(p)))
            .cloned()
            .collect(),
        None => from.privileges.clone(),
    };
    if remaining.is_empty() {
        return None;
    }
    let mut grant = from.clone();
    grant.privileges = remaining;
    Some(grant)
}

pub fn diff(old_grant: Option<&Grant>, new_grant: Option<&Grant>) -> Vec<MigrationStep> {
    if old_grant.map(is_owner_grant).unwrap_or(false)
        || new_grant.map(is_owner_grant).unwrap_or(false)
    {
        return Vec::new();
    }

    let mut steps = Vec::new();
    if let Some(new) = new_grant {
        if let Some(to_grant) = privilege_difference(new, old_grant) {
            steps.push(MigrationStep::Grant(GrantOperation::Grant {
                grant: to_grant,
            }));
        }
    }
    if let Some(old) = old_grant {
        if let Some(to_revoke) = privilege_difference(old, new_grant) {
            steps.push(MigrationStep::Grant(GrantOperation::Revoke {
                grant: to_revoke,
            }));
        }
    }
    steps
}

/// Compare grant lists keyed by (grant id, grantable flag).
pub fn diff_grants(old_grants: &[Grant], new_grants: &[Grant]) -> Vec<MigrationStep> {
    let mut old_map = BTreeMap::new();
    let mut new_map = BTreeMap::new();

    for grant in old_grants {
        old_map.insert((grant.id(), grant.with_grant_option), grant);
    }
    for grant in new_grants {
        new_map.insert((grant.id(), grant.with_grant_option), grant);
    }

    let all_ids: std::collections::BTreeSet<_> =
        old_map.keys().chain(new_map.keys()).cloned().collect();

    all_ids
        .into_iter()
        .flat_map(|id| {
            let old = old_map.get(&id).copied();
            let new = new_map.get(&id).copied();
            diff(old, new)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::grant::ObjectType;

    fn make_grant(grantee: &str, privileges: Vec<&str>) -> Grant {
        Grant {
            grantee: GranteeType::Role(grantee.into()),
            object: ObjectType::Table {
                schema: "public".into(),
                name: "t1".into(),
            },
            privileges: privileges.into_iter().map(String::from).collect(),
            with_grant_option: false,
            depends_on: vec![],
            object_owner: "postgres".into(),
        }
    }

    #[test]
    fn test_new_grant_emits_single_grant_no_revoke() {
        let steps = diff_grants(&[], &[make_grant("alice", vec!["SELECT"])]);
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            &steps[0],
            MigrationStep::Grant(GrantOperation::Grant { grant }) if grant.privileges == ["SELECT"]
        ));
    }

    #[test]
    fn test_privilege_set_difference() {
        let old = make_grant("alice", vec!["SELECT", "INSERT"]);
        let new = make_grant("alice", vec!["SELECT", "UPDATE"]);
        let steps = diff_grants(&[old], &[new]);
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().any(|s| matches!(
            s,
            MigrationStep::Grant(GrantOperation::Grant { grant }) if grant.privileges == ["UPDATE"]
        )));
        assert!(steps.iter().any(|s| matches!(
            s,
            MigrationStep::Grant(GrantOperation::Revoke { grant }) if grant.privileges == ["INSERT"]
        )));
    }

    #[test]
    fn test_owner_grants_skipped() {
        let grant = make_grant("postgres", vec!["SELECT"]);
        assert!(diff_grants(&[], &[grant]).is_empty());
    }

    #[test]
    fn test_identical_grants_produce_nothing() {
        let grant = make_grant("alice", vec!["SELECT"]);
        assert!(diff_grants(&[grant.clone()], &[grant]).is_empty());
    }
}
