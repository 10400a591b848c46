//! Demo data for a fresh database.

use chrono::{Duration, Utc};
use palaver_core::models::{Discussion, Place, User};
use palaver_core::traits::ForumRepo;
use palaver_db_sqlite::SqliteForumRepo;
use uuid::Uuid;

fn place(name: &str, slug: &str, lft: i64, rgt: i64) -> Place {
    Place {
        id: Uuid::now_v7(),
        name: name.to_string(),
        slug: slug.to_string(),
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

pub async fn seed_if_empty(repo: &SqliteForumRepo) -> anyhow::Result<()> {
    if !repo.load_places().await?.is_empty() {
        return Ok(());
    }

    tracing::info!("empty database, seeding demo board");

    let alice = user("alice");
    let bram = user("bram");
    repo.insert_user(&alice).await?;
    repo.insert_user(&bram).await?;

    // General(1,6) holding Announcements(2,3) and Support(4,5), plus a
    // second root, Meta(7,8).
    let general = place("General", "general", 1, 6);
    let announcements = place("Announcements", "announcements", 2, 3);
    let support = place("Support", "support", 4, 5);
    let meta = place("Meta", "meta", 7, 8);

    for p in [&general, &announcements, &support, &meta] {
        repo.insert_place(p).await?;
    }

    let topics = [
        (&announcements, &alice, "Welcome to Palaver"),
        (&support, &bram, "How do drafts work?"),
        (&support, &alice, "Nested places explained"),
        (&meta, &bram, "Board feedback"),
    ];

    for (offset, (owner, author, title)) in topics.iter().enumerate() {
        let stamp = Utc::now() - Duration::minutes((topics.len() - offset) as i64);
        repo.save_discussion(&Discussion {
            id: Uuid::now_v7(),
            place_id: owner.id,
            user_id: author.id,
            last_reply_user_id: None,
            title: (*title).to_string(),
            body: format!("{title}: seeded discussion body."),
            private: false,
            draft: false,
            replies: 0,
            views: 0,
            created_at: stamp,
            updated_at: stamp,
        })
        .await?;
    }

    Ok(())
}
