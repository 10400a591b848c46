//! # Core Traits (Ports)
//!
//! The engine is written against these contracts only; storage, cache and
//! permission adapters plug in behind them.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Discussion, DiscussionView, Moderator, Participant, Permission, Place, PlaceNode, User,
};

/// What a capability check is being asked about.
pub enum Target<'a> {
    Place(&'a PlaceNode),
    Discussion(&'a DiscussionView),
}

/// Action names the engine itself uses. Callers may pass arbitrary actions
/// (e.g. when building place option lists).
pub mod actions {
    pub const VIEW_PLACE: &str = "view: place";
    pub const VIEW_DISCUSSION: &str = "view: discussion";
}

/// Answers "can the current viewer do `action` on `target`?".
///
/// Implementations are constructed per request for a concrete viewer.
/// Denial is silent everywhere in the engine: filtered, never an error.
pub trait CapabilityOracle: Send + Sync {
    fn can(&self, action: &str, target: Target<'_>) -> bool;
}

/// Data persistence contract for places, discussions, users and their join
/// rows.
///
/// Bulk methods exist so the engine never issues one query per row; an
/// implementation must resolve each of them with a single statement.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ForumRepo: Send + Sync {
    // Place operations. Rows come back in `lft` order with `depth` computed.
    async fn load_places(&self) -> anyhow::Result<Vec<Place>>;
    async fn load_place(&self, id: Uuid) -> anyhow::Result<Option<Place>>;
    /// Strict descendants of the given interval, in `lft` order.
    async fn load_descendants(&self, lft: i64, rgt: i64) -> anyhow::Result<Vec<Place>>;
    async fn save_place(&self, place: &Place) -> anyhow::Result<()>;

    // Discussion operations.
    /// Non-draft discussion counts grouped by place id.
    async fn count_discussions(&self, place_ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, i64)>>;
    /// Discussions in any of the given places, newest `updated_at` first.
    async fn discussions_in(
        &self,
        place_ids: &[Uuid],
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Discussion>>;
    async fn get_discussion(&self, id: Uuid) -> anyhow::Result<Option<Discussion>>;
    /// Insert-or-update keyed on id.
    async fn save_discussion(&self, discussion: &Discussion) -> anyhow::Result<()>;

    // User operations.
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn users_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>>;
    async fn users_by_usernames(&self, usernames: &[String]) -> anyhow::Result<Vec<User>>;
    async fn save_user(&self, user: &User) -> anyhow::Result<()>;

    // Participant operations.
    async fn participants_for(&self, discussion_id: Uuid) -> anyhow::Result<Vec<Participant>>;
    /// Participants of any of the given discussions, user details joined.
    async fn participants_in(&self, discussion_ids: &[Uuid])
        -> anyhow::Result<Vec<Participant>>;
    /// Insert `(discussion_id, user_id)` rows.
    async fn insert_participants(&self, rows: &[(Uuid, Uuid)]) -> anyhow::Result<()>;
    async fn delete_participants_not_in(
        &self,
        discussion_id: Uuid,
        user_ids: &[Uuid],
    ) -> anyhow::Result<()>;
    async fn delete_participants(&self, discussion_id: Uuid) -> anyhow::Result<()>;

    // Place relation operations, user details joined where applicable.
    async fn moderators_in(&self, place_ids: &[Uuid]) -> anyhow::Result<Vec<Moderator>>;
    async fn permissions_in(&self, place_ids: &[Uuid]) -> anyhow::Result<Vec<Permission>>;
}

/// Cache storage contract: opaque JSON values with per-entry TTL.
///
/// Readers may observe a stale value within the TTL window; writers call
/// `forget` after their mutation commits.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<serde_json::Value>;
    async fn put(&self, key: &str, value: serde_json::Value, ttl: Duration);
    async fn forget(&self, key: &str);
}
