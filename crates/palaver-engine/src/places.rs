//! # PlaceService
//!
//! The read-path entry points: the cached raw tree, the per-viewer index
//! view, the single-place view and select-list option generation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use palaver_core::error::Result;
use palaver_core::models::{PlaceNode, PlaceOption};
use palaver_core::traits::{actions, CapabilityOracle, ForumRepo, Target};

use crate::cache::{self, Memo};
use crate::tree::Bucket;
use crate::{bucket, enrich, prune, tally, tree};

/// A single-place view: the place's bucket plus enough numbers for the
/// caller to paginate.
#[derive(Debug, Clone, Serialize)]
pub struct PlacePage {
    pub bucket: Bucket,
    pub total_results: i64,
    pub page: usize,
    pub per_page: usize,
}

/// What gets memoized under `place_{id}`: the place and its raw
/// descendants, enriched but not yet permission-filtered.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPlace {
    node: PlaceNode,
    children: Vec<PlaceNode>,
}

/// Parameters for [`PlaceService::options`].
#[derive(Debug, Clone)]
pub struct OptionsParams {
    /// Pre-loaded nodes to build from; `None` loads the cached tree.
    pub places: Option<Vec<PlaceNode>>,
    /// Ids to disable outright.
    pub disable: Vec<Uuid>,
    /// Disable places that are not postable.
    pub postable: bool,
    /// Whether disabling a place also disables its descendants.
    pub cascade: bool,
    pub selected: Option<Uuid>,
    /// Depth padding unit for labels.
    pub padder: String,
    /// Hide places (and their descendants) the viewer cannot see.
    pub permissions: bool,
    /// Extra capability to require on every place (e.g. "start: discussion").
    pub action: Option<String>,
}

impl Default for OptionsParams {
    fn default() -> Self {
        Self {
            places: None,
            disable: Vec::new(),
            postable: false,
            cascade: true,
            selected: None,
            padder: "---".to_string(),
            permissions: false,
            action: None,
        }
    }
}

pub struct PlaceService {
    repo: Arc<dyn ForumRepo>,
    memo: Memo,
}

impl PlaceService {
    pub fn new(repo: Arc<dyn ForumRepo>, memo: Memo) -> Self {
        Self { repo, memo }
    }

    /// All enriched places in nested-set order, before any permission
    /// filtering. Memoized under `"places"`.
    pub async fn all(&self) -> Result<Vec<PlaceNode>> {
        let repo = self.repo.clone();

        self.memo
            .remember(cache::PLACES_KEY, || async move {
                let rows = repo.load_places().await?;
                Ok(enrich::enrich_places(repo.as_ref(), rows).await?)
            })
            .await
    }

    /// The index view: every visible top-level bucket with its newest
    /// discussions and cascaded totals.
    pub async fn index(
        &self,
        oracle: &dyn CapabilityOracle,
        per_place: usize,
    ) -> Result<Vec<Bucket>> {
        let places = prune::filter_by_permissions(self.all().await?, oracle);
        let mut forest = tree::sort(places);

        // One discussion query per top-level bucket. Not ideal, but there
        // shouldn't be a whole lot of root level places.
        let mut views = Vec::new();
        for root in &forest.roots {
            let mut ids = vec![root.node.id()];
            ids.extend(root.children.iter().map(PlaceNode::id));

            // Over-fetch so permission-filtered rows don't starve the cap.
            let discussions = self
                .repo
                .discussions_in(&ids, (per_place * 3) as i64, 0)
                .await?;
            views.extend(enrich::enrich_discussions(self.repo.as_ref(), discussions).await?);
        }

        let ids = forest.place_ids();
        let totals = tally::tally_discussions(self.repo.as_ref(), &ids).await?;
        bucket::refine(views, &mut forest, &totals, oracle, per_place);

        Ok(forest.roots)
    }

    /// A single place with a page of its discussions (its own and its
    /// descendants'). `None` when the place is missing or invisible to
    /// the viewer; both look the same from the outside.
    pub async fn one(
        &self,
        id: Uuid,
        oracle: &dyn CapabilityOracle,
        page: usize,
        per_page: usize,
    ) -> Result<Option<PlacePage>> {
        let repo = self.repo.clone();

        let cached: Option<CachedPlace> = self
            .memo
            .remember(&cache::place_key(id), || async move {
                let Some(place) = repo.load_place(id).await? else {
                    return Ok(None);
                };

                let child_rows = repo.load_descendants(place.lft, place.rgt).await?;

                let mut nodes =
                    enrich::enrich_places(repo.as_ref(), std::iter::once(place).chain(child_rows).collect())
                        .await?;
                let node = nodes.remove(0);

                Ok(Some(CachedPlace {
                    node,
                    children: nodes,
                }))
            })
            .await?;

        let Some(CachedPlace { node, children }) = cached else {
            return Ok(None);
        };

        let mut nodes = vec![node];
        nodes.extend(children);

        let pruned = prune::filter_by_permissions(nodes, oracle);
        let mut forest = tree::sort(pruned);

        if forest.roots.is_empty() {
            return Ok(None);
        }

        let ids = forest.place_ids();
        let totals = tally::tally_discussions(self.repo.as_ref(), &ids).await?;
        let total_results: i64 = totals.values().sum();

        let skip = page.saturating_sub(1) * per_page;
        let discussions = self
            .repo
            .discussions_in(&ids, per_page as i64, skip as i64)
            .await?;
        let views = enrich::enrich_discussions(self.repo.as_ref(), discussions).await?;

        bucket::refine(views, &mut forest, &totals, oracle, per_page);

        let bucket = forest.roots.swap_remove(0);

        Ok(Some(PlacePage {
            bucket,
            total_results,
            page,
            per_page,
        }))
    }

    /// Build a select list over the place tree.
    ///
    /// Disabling cascades to strict descendants when asked; hiding always
    /// cascades, so an invisible subtree disappears wholesale.
    pub async fn options(
        &self,
        oracle: &dyn CapabilityOracle,
        params: OptionsParams,
    ) -> Result<Vec<PlaceOption>> {
        let places = match params.places {
            Some(places) => places,
            None => self.all().await?,
        };

        let mut disabling: Option<(i64, i64)> = None;
        let mut hiding: Option<(i64, i64)> = None;
        let mut options = Vec::new();

        for node in &places {
            let mut disabled = params.postable && !node.place.postable;
            let selected = params.selected == Some(node.id());

            let denied_action = params
                .action
                .as_deref()
                .is_some_and(|action| !oracle.can(action, Target::Place(node)));

            if params.disable.contains(&node.id()) || denied_action {
                if params.cascade {
                    disabling = Some((node.place.lft, node.place.rgt));
                }

                disabled = true;
            } else if strictly_inside(node, disabling) {
                disabled = true;
            } else if strictly_inside(node, hiding) {
                continue;
            }

            if params.permissions && !oracle.can(actions::VIEW_PLACE, Target::Place(node)) {
                hiding = Some((node.place.lft, node.place.rgt));
                continue;
            }

            options.push(PlaceOption {
                id: node.id(),
                label: pad_label(&node.place.name, node.place.depth, &params.padder),
                disabled,
                selected,
            });
        }

        Ok(options)
    }
}

fn strictly_inside(node: &PlaceNode, span: Option<(i64, i64)>) -> bool {
    span.is_some_and(|(lft, rgt)| node.place.lft > lft && node.place.rgt < rgt)
}

fn pad_label(name: &str, depth: i64, padder: &str) -> String {
    if depth <= 0 {
        return name.to_string();
    }
    format!("{} {}", padder.repeat(depth as usize), name)
}
