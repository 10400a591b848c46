//! Shared fixtures for the whole-pipeline tests: a seeded SQLite board
//! with two known users and a small nested-set tree.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fake::faker::internet::en::Username;
use fake::Fake;
use palaver_cache_memory::MemoryCacheStore;
use palaver_core::models::{Discussion, Place, User};
use palaver_core::traits::{actions, ForumRepo};
use palaver_db_sqlite::SqliteForumRepo;
use palaver_engine::Memo;
use uuid::Uuid;

pub struct SeededBoard {
    pub repo: Arc<SqliteForumRepo>,
    pub memo: Memo,
    pub alice: User,
    pub bram: User,
    pub general: Place,
    pub announcements: Place,
    pub support: Place,
    pub meta: Place,
}

fn place(name: &str, lft: i64, rgt: i64) -> Place {
    Place {
        id: Uuid::now_v7(),
        name: name.to_string(),
        slug: name.to_lowercase(),
        lft,
        rgt,
        depth: 0,
        postable: true,
        user_post_increment: true,
        total_discussions: 0,
    }
}

fn user(username: &str) -> User {
    User {
        id: Uuid::now_v7(),
        username: username.to_string(),
        email: None,
        admin: false,
        total_discussions: 0,
        created_at: Utc::now(),
    }
}

/// A discussion updated `minutes_ago` minutes in the past, so tests can
/// line up recency ordering deterministically.
pub fn discussion(place: &Place, author: &User, title: &str, minutes_ago: i64) -> Discussion {
    let stamp = Utc::now() - chrono::Duration::minutes(minutes_ago);
    Discussion {
        id: Uuid::now_v7(),
        place_id: place.id,
        user_id: author.id,
        last_reply_user_id: None,
        title: title.to_string(),
        body: format!("{title} body"),
        private: false,
        draft: false,
        replies: 0,
        views: 0,
        created_at: stamp,
        updated_at: stamp,
    }
}

pub async fn seeded_board() -> anyhow::Result<SeededBoard> {
    seeded_board_with_ttl(Duration::from_secs(60)).await
}

/// General(1,6) holding Announcements(2,3) and Support(4,5), plus a
/// second root Meta(7,8). Viewing Announcements is granted to bram alone.
pub async fn seeded_board_with_ttl(ttl: Duration) -> anyhow::Result<SeededBoard> {
    let repo = Arc::new(SqliteForumRepo::new("sqlite::memory:").await?);
    let memo = Memo::new(Arc::new(MemoryCacheStore::new()), ttl);

    let alice = user("alice");
    let bram = user("bram");
    repo.insert_user(&alice).await?;
    repo.insert_user(&bram).await?;

    // A couple of bystanders so bulk fetches have something to skip.
    for _ in 0..2 {
        let filler: String = Username().fake();
        repo.insert_user(&user(&filler)).await?;
    }

    let general = place("General", 1, 6);
    let announcements = place("Announcements", 2, 3);
    let support = place("Support", 4, 5);
    let meta = place("Meta", 7, 8);

    for p in [&general, &announcements, &support, &meta] {
        repo.insert_place(p).await?;
    }

    repo.insert_permission(announcements.id, actions::VIEW_PLACE, Some(bram.id))
        .await?;

    Ok(SeededBoard {
        repo,
        memo,
        alice,
        bram,
        general,
        announcements,
        support,
        meta,
    })
}

impl SeededBoard {
    pub async fn save(&self, discussion: &Discussion) -> anyhow::Result<()> {
        self.repo.save_discussion(discussion).await
    }
}
