// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{DomainError, MAX_HIERARCHY_DEPTH, descendants, subtree, validate_parent_assignment};
use std::collections::HashMap;

// 1 -> 2 -> 3, 1 -> 4, 5 standalone
fn sample_tree() -> HashMap<i64, Option<i64>> {
    HashMap::from([
        (1, None),
        (2, Some(1)),
        (3, Some(2)),
        (4, Some(1)),
        (5, None),
    ])
}

#[test]
fn test_clearing_parent_is_always_allowed() {
    assert!(validate_parent_assignment(3, None, &sample_tree()).is_ok());
}

#[test]
fn test_self_parenting_is_circular() {
    let result = validate_parent_assignment(2, Some(2), &sample_tree());
    assert_eq!(
        result,
        Err(DomainError::CircularAgencyHierarchy {
            agency_id: 2,
            parent_id: 2
        })
    );
}

#[test]
fn test_parenting_under_descendant_is_circular() {
    let result = validate_parent_assignment(1, Some(3), &sample_tree());
    assert!(matches!(
        result,
        Err(DomainError::CircularAgencyHierarchy { .. })
    ));
}

#[test]
fn test_moving_to_sibling_branch_is_allowed() {
    assert!(validate_parent_assignment(3, Some(4), &sample_tree()).is_ok());
    assert!(validate_parent_assignment(5, Some(3), &sample_tree()).is_ok());
}

#[test]
fn test_overlong_chain_is_rejected() {
    let mut parents: HashMap<i64, Option<i64>> = HashMap::new();
    parents.insert(0, None);
    let length = i64::try_from(MAX_HIERARCHY_DEPTH).unwrap() + 1;
    for id in 1..=length {
        parents.insert(id, Some(id - 1));
    }
    let result = validate_parent_assignment(1000, Some(length), &parents);
    assert!(matches!(result, Err(DomainError::HierarchyTooDeep { .. })));
}

#[test]
fn test_descendants_are_transitive() {
    let tree = sample_tree();
    assert_eq!(descendants(1, &tree).into_iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    assert_eq!(descendants(2, &tree).into_iter().collect::<Vec<_>>(), vec![3]);
    assert!(descendants(5, &tree).is_empty());
}

#[test]
fn test_subtree_includes_root() {
    let tree = sample_tree();
    assert_eq!(subtree(2, &tree).into_iter().collect::<Vec<_>>(), vec![2, 3]);
}
