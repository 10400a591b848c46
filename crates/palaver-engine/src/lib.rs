//! palaver/crates/palaver-engine/src/lib.rs
//!
//! The place-tree materialization and discussion-aggregation engine.
//!
//! The pipeline, leaves first: storage rows are enriched in bulk
//! ([`enrich`]), pruned per viewer ([`prune`]), materialized into
//! two-tier buckets ([`tree`]), annotated with cascaded counts
//! ([`tally`]) and capped recency-ordered discussion lists ([`bucket`]).
//! [`places::PlaceService`] and [`discussions::DiscussionService`] drive
//! the pipeline and wrap its raw inputs in the TTL cache ([`cache`]).
//!
//! Everything here is request-scoped: no component keeps state between
//! calls except the injected cache store.

pub mod bucket;
pub mod cache;
pub mod discussions;
pub mod enrich;
pub mod places;
pub mod prune;
pub mod tally;
pub mod tree;
pub mod users;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::Memo;
pub use discussions::DiscussionService;
pub use places::{OptionsParams, PlacePage, PlaceService};
pub use tree::{Bucket, PlaceForest};
pub use users::UserService;
