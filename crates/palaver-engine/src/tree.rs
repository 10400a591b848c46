//! # Tree Builder
//!
//! Turns a flat, `lft`-ordered sequence of place nodes into top-level
//! buckets with one materialized level of children.
//!
//! Everything below the top level is collapsed into the nearest top-level
//! ancestor's flat child list, and each collapsed node's `bucket_id` is
//! back-filled to that ancestor. Aggregation and display never address
//! intermediate ancestors individually, so two tiers is all the engine
//! materializes.

use std::collections::HashMap;

use uuid::Uuid;

use palaver_core::models::{DiscussionView, PlaceNode};
use serde::{Deserialize, Serialize};

/// A top-level place together with its flattened children and, once the
/// bucketer has run, its capped discussion list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub node: PlaceNode,
    pub children: Vec<PlaceNode>,
    pub discussions: Vec<DiscussionView>,
}

/// The materialized forest: ordered top-level buckets plus a lookup from
/// top-level place id to its position in `roots`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceForest {
    pub roots: Vec<Bucket>,
    pub index: HashMap<Uuid, usize>,
}

impl PlaceForest {
    /// Ids of every place in the forest, roots and children alike.
    pub fn place_ids(&self) -> Vec<Uuid> {
        self.roots
            .iter()
            .flat_map(|root| {
                std::iter::once(root.node.id()).chain(root.children.iter().map(PlaceNode::id))
            })
            .collect()
    }
}

/// Partition `lft`-ordered nodes into top-level buckets.
///
/// The gauge is set from the first row; a row whose depth matches the gauge
/// starts a new bucket (and resets the gauge), any deeper row joins the
/// most recent bucket's child list. Empty input yields an empty forest.
pub fn sort(nodes: Vec<PlaceNode>) -> PlaceForest {
    let mut forest = PlaceForest::default();
    let mut gauge: Option<i64> = None;

    for mut node in nodes {
        let starts_bucket = match gauge {
            None => true,
            Some(depth) => node.place.depth == depth,
        };

        if starts_bucket {
            gauge = Some(node.place.depth);
            forest.index.insert(node.id(), forest.roots.len());
            forest.roots.push(Bucket {
                node,
                children: Vec::new(),
                discussions: Vec::new(),
            });
        } else if let Some(root) = forest.roots.last_mut() {
            node.bucket_id = Some(root.node.id());
            root.children.push(node);
        }
    }

    forest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{node, uid};

    #[test]
    fn empty_input_builds_empty_forest() {
        let forest = sort(Vec::new());
        assert!(forest.roots.is_empty());
        assert!(forest.index.is_empty());
    }

    #[test]
    fn partitions_roots_and_children_by_gauge_depth() {
        let nodes = vec![
            node(1, 1, 6, 0),
            node(2, 2, 3, 1),
            node(3, 4, 5, 1),
            node(4, 7, 8, 0),
        ];
        let forest = sort(nodes);

        assert_eq!(forest.roots.len(), 2);
        assert_eq!(forest.roots[0].node.id(), uid(1));
        assert_eq!(forest.roots[0].children.len(), 2);
        assert_eq!(forest.roots[1].node.id(), uid(4));
        assert!(forest.roots[1].children.is_empty());
        assert_eq!(forest.index[&uid(1)], 0);
        assert_eq!(forest.index[&uid(4)], 1);
    }

    #[test]
    fn deeper_levels_collapse_into_the_top_level_bucket() {
        // Grandchild at depth 2 lands in the root's flat child list with
        // the root, not its true parent, as its bucket.
        let nodes = vec![node(1, 1, 6, 0), node(2, 2, 5, 1), node(3, 3, 4, 2)];
        let forest = sort(nodes);

        assert_eq!(forest.roots.len(), 1);
        let children = &forest.roots[0].children;
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].id(), uid(3));
        assert_eq!(children[1].bucket(), uid(1));
    }

    #[test]
    fn flattening_reproduces_the_partition() {
        let nodes = vec![
            node(1, 1, 4, 0),
            node(2, 2, 3, 1),
            node(5, 5, 6, 0),
            node(7, 7, 10, 0),
            node(8, 8, 9, 1),
        ];
        let ids: Vec<_> = nodes.iter().map(PlaceNode::id).collect();
        let forest = sort(nodes);

        assert_eq!(forest.place_ids(), ids);
    }
}
