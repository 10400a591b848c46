//! # Discussion Aggregator
//!
//! Per-place discussion counts from one grouped query, cascaded into the
//! two materialized tiers of the forest.

use std::collections::HashMap;

use uuid::Uuid;

use palaver_core::traits::ForumRepo;

use crate::tree::PlaceForest;

/// Count non-draft discussions for each of the given places.
///
/// Every id gets an entry, defaulting to 0 when the grouped count has no
/// row for it.
pub async fn tally_discussions(
    repo: &dyn ForumRepo,
    place_ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, i64>> {
    let mut totals: HashMap<Uuid, i64> = place_ids.iter().map(|id| (*id, 0)).collect();

    if place_ids.is_empty() {
        return Ok(totals);
    }

    for (place_id, count) in repo.count_discussions(place_ids).await? {
        totals.insert(place_id, count);
    }

    Ok(totals)
}

/// Cascade per-place counts upward through the forest.
///
/// Every node's count lands on its bucket root, and every child-tier node
/// additionally receives the counts of all nodes whose interval it
/// contains (a node contains itself). Root counts stay on the root alone.
pub fn cascade_totals(forest: &mut PlaceForest, totals: &HashMap<Uuid, i64>) {
    for root in &mut forest.roots {
        let count_of = |id: &Uuid| totals.get(id).copied().unwrap_or(0);

        root.node.totals.discussions += count_of(&root.node.id());

        let spans: Vec<(Uuid, i64, i64, i64)> = root
            .children
            .iter()
            .map(|child| {
                (
                    child.id(),
                    child.place.lft,
                    child.place.rgt,
                    count_of(&child.id()),
                )
            })
            .collect();

        for (id, lft, rgt, count) in spans {
            root.node.totals.discussions += count;

            for child in &mut root.children {
                if child.id() == id || (child.place.lft <= lft && child.place.rgt >= rgt) {
                    child.totals.discussions += count;
                }
            }
        }
    }
}
