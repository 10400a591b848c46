//! # Permission Pruner
//!
//! Removes invisible places and their subtrees from a `lft`-ordered node
//! sequence while keeping the surviving nested-set bounds usable for later
//! containment checks.

use palaver_core::traits::{actions, CapabilityOracle, Target};
use palaver_core::models::PlaceNode;

/// Filter out places the viewer cannot see.
///
/// Scans in nested-set order tracking the last kept node and an `rgt`
/// threshold (`until`) below which nodes belong to an already-removed
/// subtree. Descendants of a removed parent are dropped on the threshold
/// alone, so one denial prunes a whole subtree with a single oracle call.
///
/// When a node is removed, the previous kept node's `rgt` shrinks by the
/// removed width while it still is a parent; a parent that collapses to a
/// leaf has its flag flipped. Returns a new vector; an empty result is a
/// valid state, not an error.
pub fn filter_by_permissions(
    nodes: Vec<PlaceNode>,
    oracle: &dyn CapabilityOracle,
) -> Vec<PlaceNode> {
    let mut kept: Vec<PlaceNode> = Vec::with_capacity(nodes.len());
    let mut previous: Option<usize> = None;
    let mut until: Option<i64> = None;
    let mut removed = 0usize;

    for node in nodes {
        let in_removed_subtree = until.is_some_and(|threshold| node.place.rgt < threshold);

        if in_removed_subtree || !oracle.can(actions::VIEW_PLACE, Target::Place(&node)) {
            if let Some(index) = previous {
                if kept[index].parent {
                    kept[index].place.rgt -= (node.place.rgt - node.place.lft) + 1;

                    if kept[index].place.rgt - kept[index].place.lft <= 1 {
                        kept[index].parent = false;
                    }
                }
            }

            if node.parent {
                until = Some(node.place.rgt);
            }

            removed += 1;
            continue;
        }

        previous = Some(kept.len());
        kept.push(node);
    }

    if removed > 0 {
        tracing::debug!(removed, kept = kept.len(), "pruned invisible places");
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{node, uid, StubOracle};

    #[test]
    fn empty_input_is_a_valid_empty_state() {
        let oracle = StubOracle::default();
        assert!(filter_by_permissions(Vec::new(), &oracle).is_empty());
    }

    #[test]
    fn denied_leaf_shrinks_the_parent_bound() {
        // A(1,6) with children B(2,3) and C(4,5); deny B.
        let nodes = vec![node(1, 1, 6, 0), node(2, 2, 3, 1), node(3, 4, 5, 1)];
        let oracle = StubOracle::deny_places([uid(2)]);

        let kept = filter_by_permissions(nodes, &oracle);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].id(), uid(1));
        assert_eq!(kept[0].place.rgt, 4);
        assert!(kept[0].parent);
        assert_eq!(kept[1].id(), uid(3));
        assert_eq!(kept[1].place.rgt, 5);
    }

    #[test]
    fn denied_subtree_is_skipped_without_extra_oracle_calls() {
        // A(1,6) holding subtree B(2,5) with grandchild C(3,4); deny B.
        let nodes = vec![node(1, 1, 6, 0), node(2, 2, 5, 1), node(3, 3, 4, 2)];
        let oracle = StubOracle::deny_places([uid(2)]);

        let kept = filter_by_permissions(nodes, &oracle);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id(), uid(1));
        // A lost both descendants and collapsed to a leaf.
        assert_eq!(kept[0].place.rgt, 2);
        assert!(!kept[0].parent);
        // A and B were checked; C rode the threshold.
        assert_eq!(oracle.place_checks(), 2);
    }

    #[test]
    fn bounds_stay_consistent_with_remaining_descendants() {
        // rgt - lft == 2 * strict descendants + 1 for every survivor.
        let nodes = vec![node(1, 1, 8, 0), node(2, 2, 5, 1), node(3, 3, 4, 2), node(4, 6, 7, 1)];
        let oracle = StubOracle::deny_places([uid(2)]);

        let kept = filter_by_permissions(nodes, &oracle);

        assert_eq!(kept.len(), 2);
        for place in &kept {
            let descendants = kept
                .iter()
                .filter(|other| {
                    other.place.lft > place.place.lft && other.place.rgt < place.place.rgt
                })
                .count() as i64;
            assert_eq!(place.place.rgt - place.place.lft, 2 * descendants + 1);
        }
    }

    #[test]
    fn denying_the_root_empties_the_forest() {
        let nodes = vec![node(1, 1, 4, 0), node(2, 2, 3, 1)];
        let oracle = StubOracle::deny_places([uid(1)]);

        assert!(filter_by_permissions(nodes, &oracle).is_empty());
        assert_eq!(oracle.place_checks(), 1);
    }
}
