//! # Discussion Bucketer
//!
//! Merges enriched discussions into their top-level buckets: recency
//! ordering with id tie-break, a per-bucket cap, cascaded totals and the
//! clamped "remaining" overflow count.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use palaver_core::models::{DiscussionView, Place};
use palaver_core::traits::{actions, CapabilityOracle, Target};

use crate::tally;
use crate::tree::PlaceForest;

/// Distribute discussions into the forest's buckets.
///
/// A discussion is dropped silently when the viewer cannot see it or when
/// its place is absent from the pruned forest. Within a bucket the list is
/// ordered by `(updated_at, id)` descending with duplicate ids removed,
/// then capped at `limit`; capped-out discussions still count toward the
/// totals, which is what `totals.remaining` reports (clamped at zero).
pub fn refine(
    views: Vec<DiscussionView>,
    forest: &mut PlaceForest,
    totals: &HashMap<Uuid, i64>,
    oracle: &dyn CapabilityOracle,
    limit: usize,
) {
    // Place id -> (owning bucket, place row) over the visible forest.
    let mut visible: HashMap<Uuid, (Uuid, Place)> = HashMap::new();
    for root in &forest.roots {
        visible.insert(root.node.id(), (root.node.id(), root.node.place.clone()));
        for child in &root.children {
            visible.insert(child.id(), (root.node.id(), child.place.clone()));
        }
    }

    let mut ordered: HashMap<Uuid, Vec<DiscussionView>> = HashMap::new();

    for mut view in views {
        if !oracle.can(actions::VIEW_DISCUSSION, Target::Discussion(&view)) {
            continue;
        }

        let Some((bucket, place)) = visible.get(&view.discussion.place_id) else {
            continue;
        };

        view.place = Some(place.clone());
        ordered.entry(*bucket).or_default().push(view);
    }

    // Newest first; equal timestamps fall back to the higher id.
    for list in ordered.values_mut() {
        list.sort_by(|a, b| {
            (b.discussion.updated_at, b.discussion.id)
                .cmp(&(a.discussion.updated_at, a.discussion.id))
        });
        let mut seen = HashSet::new();
        list.retain(|view| seen.insert(view.discussion.id));
    }

    tally::cascade_totals(forest, totals);

    for root in &mut forest.roots {
        if let Some(mut list) = ordered.remove(&root.node.id()) {
            list.truncate(limit);

            let shown = list.len() as i64;
            root.node.totals.remaining = (root.node.totals.discussions - shown).max(0);
            root.discussions = list;
        }
    }
}
