// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Agency parent/child hierarchy rules.
//!
//! The hierarchy is stored as a parent pointer on each agency. These helpers
//! operate on a snapshot of that pointer table so they stay free of I/O.

use crate::error::DomainError;
use std::collections::{BTreeSet, HashMap};

/// Longest parent chain that will be walked before the data is treated as
/// corrupt.
pub const MAX_HIERARCHY_DEPTH: usize = 16;

/// Checks that `new_parent` may become the parent of `agency_id`.
///
/// `parents` maps every agency id to its current parent (if any).
///
/// # Errors
///
/// Returns `DomainError::CircularAgencyHierarchy` if the agency would become
/// its own ancestor, and `DomainError::HierarchyTooDeep` if the chain above
/// `new_parent` is longer than `MAX_HIERARCHY_DEPTH`.
pub fn validate_parent_assignment<S: std::hash::BuildHasher>(
    agency_id: i64,
    new_parent: Option<i64>,
    parents: &HashMap<i64, Option<i64>, S>,
) -> Result<(), DomainError> {
    let Some(parent_id) = new_parent else {
        return Ok(());
    };

    let mut cursor = Some(parent_id);
    let mut depth = 0;
    while let Some(current) = cursor {
        if current == agency_id {
            return Err(DomainError::CircularAgencyHierarchy {
                agency_id,
                parent_id,
            });
        }
        depth += 1;
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(DomainError::HierarchyTooDeep {
                agency_id,
                max_depth: MAX_HIERARCHY_DEPTH,
            });
        }
        cursor = parents.get(&current).copied().flatten();
    }

    Ok(())
}

/// Returns every transitive child of `agency_id`, excluding the agency itself.
#[must_use]
pub fn descendants<S: std::hash::BuildHasher>(
    agency_id: i64,
    parents: &HashMap<i64, Option<i64>, S>,
) -> BTreeSet<i64> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for (&child, &parent) in parents {
        if let Some(parent) = parent {
            children.entry(parent).or_default().push(child);
        }
    }

    let mut found = BTreeSet::new();
    let mut stack = vec![agency_id];
    while let Some(current) = stack.pop() {
        if let Some(kids) = children.get(&current) {
            for &kid in kids {
                if kid != agency_id && found.insert(kid) {
                    stack.push(kid);
                }
            }
        }
    }
    found
}

/// Returns `agency_id` together with all of its descendants.
#[must_use]
pub fn subtree<S: std::hash::BuildHasher>(
    agency_id: i64,
    parents: &HashMap<i64, Option<i64>, S>,
) -> BTreeSet<i64> {
    let mut ids = descendants(agency_id, parents);
    ids.insert(agency_id);
    ids
}
