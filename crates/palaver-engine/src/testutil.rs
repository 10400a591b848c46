//! Shared fixtures for the engine's unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use palaver_core::models::{Discussion, DiscussionView, Place, PlaceNode, User};
use palaver_core::traits::{actions, CacheStore, CapabilityOracle, Target};

/// Deterministic id: tests name entities by small numbers.
pub fn uid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}

pub fn place_row(n: u128, lft: i64, rgt: i64, depth: i64) -> Place {
    Place {
        id: uid(n),
        name: format!("Place {n}"),
        slug: format!("place-{n}"),
        lft,
        rgt,
        depth,
        postable: true,
        user_post_increment: true,
        total_discussions: 0,
    }
}

pub fn node(n: u128, lft: i64, rgt: i64, depth: i64) -> PlaceNode {
    PlaceNode::from_place(place_row(n, lft, rgt, depth))
}

pub fn user(n: u128, username: &str) -> User {
    User {
        id: uid(n),
        username: username.to_string(),
        email: None,
        admin: false,
        total_discussions: 0,
        created_at: at(0),
    }
}

pub fn discussion_at(n: u128, place_id: Uuid, updated_seconds: i64) -> Discussion {
    Discussion {
        id: uid(n),
        place_id,
        user_id: uid(1),
        last_reply_user_id: None,
        title: format!("Discussion {n}"),
        body: String::new(),
        private: false,
        draft: false,
        replies: 0,
        views: 0,
        created_at: at(updated_seconds),
        updated_at: at(updated_seconds),
    }
}

pub fn view_at(n: u128, place_id: Uuid, updated_seconds: i64) -> DiscussionView {
    DiscussionView::bare(discussion_at(n, place_id, updated_seconds))
}

/// Oracle stub: denies listed ids, counts place checks so tests can assert
/// subtree skips.
#[derive(Default)]
pub struct StubOracle {
    deny_places: HashSet<Uuid>,
    deny_discussions: HashSet<Uuid>,
    place_checks: AtomicUsize,
}

impl StubOracle {
    pub fn deny_places<I: IntoIterator<Item = Uuid>>(ids: I) -> Self {
        Self {
            deny_places: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn deny_discussions<I: IntoIterator<Item = Uuid>>(ids: I) -> Self {
        Self {
            deny_discussions: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn place_checks(&self) -> usize {
        self.place_checks.load(Ordering::SeqCst)
    }
}

impl CapabilityOracle for StubOracle {
    fn can(&self, action: &str, target: Target<'_>) -> bool {
        match target {
            Target::Place(node) => {
                if action == actions::VIEW_PLACE {
                    self.place_checks.fetch_add(1, Ordering::SeqCst);
                }
                !self.deny_places.contains(&node.id())
            }
            Target::Discussion(view) => !self.deny_discussions.contains(&view.discussion.id),
        }
    }
}

/// Plain map-backed cache store; TTL is accepted and ignored.
#[derive(Default)]
pub struct MapCacheStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

#[async_trait]
impl CacheStore for MapCacheStore {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn put(&self, key: &str, value: serde_json::Value, _ttl: Duration) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    async fn forget(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}
