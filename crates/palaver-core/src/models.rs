//! # Domain Models
//!
//! These structs represent the core entities of Palaver.
//! We use UUID v7 for time-ordered, globally unique identification; recency
//! tie-breaks on `id` rely on that ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A place is a category or sub-category in the board hierarchy, encoded as
/// a nested set: `lft < rgt`, and a place's interval strictly contains the
/// intervals of all of its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub name: String,
    /// The URL slug (e.g., "general" for /general/)
    pub slug: String,
    pub lft: i64,
    pub rgt: i64,
    /// Number of ancestors; computed by the storage layer, never stored.
    pub depth: i64,
    /// Whether discussions may be started here.
    pub postable: bool,
    /// Whether starting a discussion here bumps the author's counter.
    pub user_post_increment: bool,
    /// Persisted running counter, bumped when a discussion goes public.
    pub total_discussions: i64,
}

/// Per-place discussion totals computed during aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub discussions: i64,
    /// Discussions counted but not shown in the capped bucket list.
    /// Never negative.
    pub remaining: i64,
}

/// An enriched, in-memory view of a [`Place`].
///
/// Nodes are transient: the pruning pass hands back adjusted copies and the
/// stored rows are never written through. `bucket_id` is back-filled by the
/// tree builder for every node below the top level and names the top-level
/// ancestor, not the true immediate parent (the two-tier collapse).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceNode {
    pub place: Place,
    /// `rgt - lft > 1`; maintained by the pruner as subtrees shrink.
    pub parent: bool,
    /// `depth > 0`.
    pub child: bool,
    pub bucket_id: Option<Uuid>,
    pub totals: Totals,
    pub moderators: Vec<Moderator>,
    pub permissions: Vec<Permission>,
}

impl PlaceNode {
    /// Derive a node from a stored row. Relationship lists start empty and
    /// are filled by the batch enricher.
    pub fn from_place(place: Place) -> Self {
        Self {
            parent: place.rgt - place.lft > 1,
            child: place.depth > 0,
            bucket_id: None,
            totals: Totals::default(),
            moderators: Vec::new(),
            permissions: Vec::new(),
            place,
        }
    }

    pub fn id(&self) -> Uuid {
        self.place.id
    }

    /// The top-level bucket this node aggregates into: itself when top
    /// level, otherwise the back-filled top-level ancestor.
    pub fn bucket(&self) -> Uuid {
        self.bucket_id.unwrap_or(self.place.id)
    }

    /// Non-strict interval containment: a place contains itself.
    pub fn contains(&self, other: &PlaceNode) -> bool {
        self.place.lft <= other.place.lft && self.place.rgt >= other.place.rgt
    }
}

/// A single conversation within a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: Uuid,
    pub place_id: Uuid,
    /// The author.
    pub user_id: Uuid,
    /// Whoever replied last, if anyone has.
    pub last_reply_user_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    /// Private discussions are visible to the author and participants only.
    pub private: bool,
    /// Drafts are invisible to everyone but the author and excluded from
    /// all counts.
    pub draft: bool,
    pub replies: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discussion {
    /// URL slug derived from the title.
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }

    /// Reply count in a readable format (e.g., "1.2K").
    pub fn short_replies(&self) -> String {
        shorten(self.replies)
    }

    /// View count in a readable format.
    pub fn short_views(&self) -> String {
        shorten(self.views)
    }
}

/// A discussion with its related entities attached by the batch enricher.
///
/// `participants` is `None` when the discussion has no participant rows at
/// all; it is never `Some` of an empty list. Callers branch on that
/// distinction. `place` is attached by the bucketer once the owning place
/// is known to be visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionView {
    pub discussion: Discussion,
    pub author: Option<User>,
    pub recent: Option<User>,
    pub participants: Option<Vec<Participant>>,
    pub place: Option<Place>,
}

impl DiscussionView {
    /// A bare view with no relations attached.
    pub fn bare(discussion: Discussion) -> Self {
        Self {
            discussion,
            author: None,
            recent: None,
            participants: None,
            place: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub admin: bool,
    pub total_discussions: i64,
    pub created_at: DateTime<Utc>,
}

/// Membership row for a private discussion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub discussion_id: Uuid,
    pub user_id: Uuid,
    /// The user record, when bulk-joined by the enricher.
    pub details: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moderator {
    pub id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub details: Option<User>,
}

/// Grants `action` on a place to `user_id`; a `None` user grants everyone.
/// A place with no rows for an action is open. Interpretation belongs to
/// the capability oracle; the engine only carries the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub place_id: Uuid,
    pub action: String,
    pub user_id: Option<Uuid>,
}

/// Caller input for starting or editing a discussion.
#[derive(Debug, Clone, Default)]
pub struct DiscussionInput {
    pub place: Uuid,
    pub user: Uuid,
    pub title: Option<String>,
    pub body: String,
    /// Comma-separated usernames; non-empty input makes the discussion
    /// private.
    pub participants: String,
    pub draft: bool,
    /// Set when the caller is publishing a brand-new discussion rather
    /// than drafting it.
    pub start: bool,
}

/// One entry of a place select list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOption {
    pub id: Uuid,
    /// Place name left-padded once per depth level.
    pub label: String,
    pub disabled: bool,
    pub selected: bool,
}

/// Lowercased, dash-separated form of a title.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut previous_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Shorten large counters for display: 999, 1.5K, 20M, 1.1B.
fn shorten(number: i64) -> String {
    if number < 1_000 {
        return number.to_string();
    }
    let formatted = if number < 1_000_000 {
        format!("{:.1}K", number as f64 / 1_000.0)
    } else if number < 1_000_000_000 {
        format!("{:.1}M", number as f64 / 1_000_000.0)
    } else {
        format!("{:.1}B", number as f64 / 1_000_000_000.0)
    };
    formatted.replace(".0", "")
}
