//! # palaver-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational
//! model and the `palaver-core` domain models.
//!
//! Place `depth` is never stored: every place select computes it from the
//! nested-set encoding by counting enclosing intervals, and rows always
//! come back in `lft` order because the engine's tree builder and pruner
//! both require pre-order input.

use std::str::FromStr;

use async_trait::async_trait;
use palaver_core::models::{Discussion, Moderator, Participant, Permission, Place, User};
use palaver_core::traits::ForumRepo;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS places (
    id                  BLOB PRIMARY KEY,
    name                TEXT NOT NULL,
    slug                TEXT NOT NULL,
    lft                 INTEGER NOT NULL,
    rgt                 INTEGER NOT NULL,
    postable            INTEGER NOT NULL DEFAULT 1,
    user_post_increment INTEGER NOT NULL DEFAULT 1,
    total_discussions   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS discussions (
    id                 BLOB PRIMARY KEY,
    place_id           BLOB NOT NULL,
    user_id            BLOB NOT NULL,
    last_reply_user_id BLOB,
    title              TEXT NOT NULL,
    body               TEXT NOT NULL,
    private            INTEGER NOT NULL DEFAULT 0,
    draft              INTEGER NOT NULL DEFAULT 0,
    replies            INTEGER NOT NULL DEFAULT 0,
    views              INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id                BLOB PRIMARY KEY,
    username          TEXT NOT NULL UNIQUE,
    email             TEXT,
    admin             INTEGER NOT NULL DEFAULT 0,
    total_discussions INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS participants (
    id            BLOB PRIMARY KEY,
    discussion_id BLOB NOT NULL,
    user_id       BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS moderators (
    id       BLOB PRIMARY KEY,
    place_id BLOB NOT NULL,
    user_id  BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS permissions (
    id       BLOB PRIMARY KEY,
    place_id BLOB NOT NULL,
    action   TEXT NOT NULL,
    user_id  BLOB
);

CREATE INDEX IF NOT EXISTS idx_discussions_place ON discussions (place_id, draft, updated_at);
CREATE INDEX IF NOT EXISTS idx_participants_discussion ON participants (discussion_id);
"#;

const PLACE_SELECT: &str = "SELECT node.id, node.name, node.slug, node.lft, node.rgt, \
    node.postable, node.user_post_increment, node.total_discussions, \
    (COUNT(parent.id) - 1) AS depth \
    FROM places AS node \
    CROSS JOIN places AS parent";

pub struct SqliteForumRepo {
    pool: SqlitePool,
}

// Helpers for UUID conversion; ids are stored as 16-byte blobs.
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn place_from_row(row: &SqliteRow) -> Place {
    Place {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        name: row.get("name"),
        slug: row.get("slug"),
        lft: row.get("lft"),
        rgt: row.get("rgt"),
        depth: row.get("depth"),
        postable: row.get("postable"),
        user_post_increment: row.get("user_post_increment"),
        total_discussions: row.get("total_discussions"),
    }
}

fn discussion_from_row(row: &SqliteRow) -> Discussion {
    Discussion {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        place_id: blob_to_uuid(row.get::<Vec<u8>, _>("place_id").as_slice()),
        user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
        last_reply_user_id: row
            .get::<Option<Vec<u8>>, _>("last_reply_user_id")
            .map(|blob| blob_to_uuid(&blob)),
        title: row.get("title"),
        body: row.get("body"),
        private: row.get("private"),
        draft: row.get("draft"),
        replies: row.get("replies"),
        views: row.get("views"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        username: row.get("username"),
        email: row.get("email"),
        admin: row.get("admin"),
        total_discussions: row.get("total_discussions"),
        created_at: row.get("created_at"),
    }
}

/// Joined user columns are aliased `detail_*`; a NULL `detail_id` means the
/// join found nothing.
fn details_from_row(row: &SqliteRow) -> Option<User> {
    row.get::<Option<Vec<u8>>, _>("detail_id").map(|id| User {
        id: blob_to_uuid(&id),
        username: row.get("detail_username"),
        email: row.get("detail_email"),
        admin: row.get("detail_admin"),
        total_discussions: row.get("detail_total_discussions"),
        created_at: row.get("detail_created_at"),
    })
}

impl SqliteForumRepo {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // An in-memory database lives and dies with its connection; the
        // pool must stay at one so the schema outlives the first checkout.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::debug!(url, "sqlite forum repository ready");

        Ok(Self { pool })
    }

    // Seeding helpers for binaries and test harnesses. `depth` is derived
    // on read, so inserts ignore it.
    pub async fn insert_place(&self, place: &Place) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO places (id, name, slug, lft, rgt, postable, user_post_increment, total_discussions) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(place.id))
        .bind(&place.name)
        .bind(&place.slug)
        .bind(place.lft)
        .bind(place.rgt)
        .bind(place.postable)
        .bind(place.user_post_increment)
        .bind(place.total_discussions)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, admin, total_discussions, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(user.id))
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.admin)
        .bind(user.total_discussions)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_moderator(&self, place_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO moderators (id, place_id, user_id) VALUES (?, ?, ?)")
            .bind(uuid_to_blob(Uuid::now_v7()))
            .bind(uuid_to_blob(place_id))
            .bind(uuid_to_blob(user_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_permission(
        &self,
        place_id: Uuid,
        action: &str,
        user_id: Option<Uuid>,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO permissions (id, place_id, action, user_id) VALUES (?, ?, ?, ?)")
            .bind(uuid_to_blob(Uuid::now_v7()))
            .bind(uuid_to_blob(place_id))
            .bind(action)
            .bind(user_id.map(uuid_to_blob))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ForumRepo for SqliteForumRepo {
    /// Every place in pre-order, depth computed by counting the intervals
    /// that enclose each node.
    async fn load_places(&self) -> anyhow::Result<Vec<Place>> {
        let sql = format!(
            "{PLACE_SELECT} WHERE node.lft BETWEEN parent.lft AND parent.rgt \
             GROUP BY node.id ORDER BY node.lft"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(place_from_row).collect())
    }

    async fn load_place(&self, id: Uuid) -> anyhow::Result<Option<Place>> {
        let sql = format!(
            "{PLACE_SELECT} WHERE node.id = ? AND node.lft BETWEEN parent.lft AND parent.rgt \
             GROUP BY node.id"
        );
        let row = sqlx::query(&sql)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(place_from_row))
    }

    async fn load_descendants(&self, lft: i64, rgt: i64) -> anyhow::Result<Vec<Place>> {
        let sql = format!(
            "{PLACE_SELECT} WHERE node.lft > ? AND node.rgt < ? \
             AND node.lft BETWEEN parent.lft AND parent.rgt \
             GROUP BY node.id ORDER BY node.lft"
        );
        let rows = sqlx::query(&sql)
            .bind(lft)
            .bind(rgt)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(place_from_row).collect())
    }

    async fn save_place(&self, place: &Place) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE places SET name = ?, slug = ?, lft = ?, rgt = ?, postable = ?, \
             user_post_increment = ?, total_discussions = ? WHERE id = ?",
        )
        .bind(&place.name)
        .bind(&place.slug)
        .bind(place.lft)
        .bind(place.rgt)
        .bind(place.postable)
        .bind(place.user_post_increment)
        .bind(place.total_discussions)
        .bind(uuid_to_blob(place.id))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Grouped non-draft counts; places with no discussions simply have no
    /// row here.
    async fn count_discussions(&self, place_ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, i64)>> {
        if place_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT place_id, COUNT(*) AS aggregate FROM discussions \
             WHERE draft = 0 AND place_id IN ({}) GROUP BY place_id",
            placeholders(place_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in place_ids {
            query = query.bind(uuid_to_blob(*id));
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| {
                (
                    blob_to_uuid(row.get::<Vec<u8>, _>("place_id").as_slice()),
                    row.get::<i64, _>("aggregate"),
                )
            })
            .collect())
    }

    async fn discussions_in(
        &self,
        place_ids: &[Uuid],
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Discussion>> {
        if place_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT * FROM discussions WHERE place_id IN ({}) \
             ORDER BY updated_at DESC LIMIT ? OFFSET ?",
            placeholders(place_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in place_ids {
            query = query.bind(uuid_to_blob(*id));
        }
        let rows = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(discussion_from_row).collect())
    }

    async fn get_discussion(&self, id: Uuid) -> anyhow::Result<Option<Discussion>> {
        let row = sqlx::query("SELECT * FROM discussions WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(discussion_from_row))
    }

    /// Insert-or-update keyed on id; `created_at` is only written on first
    /// insert.
    async fn save_discussion(&self, discussion: &Discussion) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO discussions (id, place_id, user_id, last_reply_user_id, title, body, \
             private, draft, replies, views, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             place_id = excluded.place_id, user_id = excluded.user_id, \
             last_reply_user_id = excluded.last_reply_user_id, title = excluded.title, \
             body = excluded.body, private = excluded.private, draft = excluded.draft, \
             replies = excluded.replies, views = excluded.views, updated_at = excluded.updated_at",
        )
        .bind(uuid_to_blob(discussion.id))
        .bind(uuid_to_blob(discussion.place_id))
        .bind(uuid_to_blob(discussion.user_id))
        .bind(discussion.last_reply_user_id.map(uuid_to_blob))
        .bind(&discussion.title)
        .bind(&discussion.body)
        .bind(discussion.private)
        .bind(discussion.draft)
        .bind(discussion.replies)
        .bind(discussion.views)
        .bind(discussion.created_at)
        .bind(discussion.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT * FROM users WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(uuid_to_blob(*id));
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn users_by_usernames(&self, usernames: &[String]) -> anyhow::Result<Vec<User>> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT * FROM users WHERE username IN ({})",
            placeholders(usernames.len())
        );
        let mut query = sqlx::query(&sql);
        for username in usernames {
            query = query.bind(username);
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn save_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET username = ?, email = ?, admin = ?, total_discussions = ? \
             WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.admin)
        .bind(user.total_discussions)
        .bind(uuid_to_blob(user.id))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn participants_for(&self, discussion_id: Uuid) -> anyhow::Result<Vec<Participant>> {
        let rows = sqlx::query("SELECT * FROM participants WHERE discussion_id = ?")
            .bind(uuid_to_blob(discussion_id))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Participant {
                id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
                discussion_id: blob_to_uuid(row.get::<Vec<u8>, _>("discussion_id").as_slice()),
                user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
                details: None,
            })
            .collect())
    }

    async fn participants_in(
        &self,
        discussion_ids: &[Uuid],
    ) -> anyhow::Result<Vec<Participant>> {
        if discussion_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT p.id, p.discussion_id, p.user_id, \
             u.id AS detail_id, u.username AS detail_username, u.email AS detail_email, \
             u.admin AS detail_admin, u.total_discussions AS detail_total_discussions, \
             u.created_at AS detail_created_at \
             FROM participants AS p LEFT JOIN users AS u ON u.id = p.user_id \
             WHERE p.discussion_id IN ({})",
            placeholders(discussion_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in discussion_ids {
            query = query.bind(uuid_to_blob(*id));
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| Participant {
                id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
                discussion_id: blob_to_uuid(row.get::<Vec<u8>, _>("discussion_id").as_slice()),
                user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
                details: details_from_row(row),
            })
            .collect())
    }

    async fn insert_participants(&self, rows: &[(Uuid, Uuid)]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        for (discussion_id, user_id) in rows {
            sqlx::query("INSERT INTO participants (id, discussion_id, user_id) VALUES (?, ?, ?)")
                .bind(uuid_to_blob(Uuid::now_v7()))
                .bind(uuid_to_blob(*discussion_id))
                .bind(uuid_to_blob(*user_id))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_participants_not_in(
        &self,
        discussion_id: Uuid,
        user_ids: &[Uuid],
    ) -> anyhow::Result<()> {
        if user_ids.is_empty() {
            return self.delete_participants(discussion_id).await;
        }

        let sql = format!(
            "DELETE FROM participants WHERE discussion_id = ? AND user_id NOT IN ({})",
            placeholders(user_ids.len())
        );
        let mut query = sqlx::query(&sql).bind(uuid_to_blob(discussion_id));
        for id in user_ids {
            query = query.bind(uuid_to_blob(*id));
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_participants(&self, discussion_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM participants WHERE discussion_id = ?")
            .bind(uuid_to_blob(discussion_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn moderators_in(&self, place_ids: &[Uuid]) -> anyhow::Result<Vec<Moderator>> {
        if place_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT m.id, m.place_id, m.user_id, \
             u.id AS detail_id, u.username AS detail_username, u.email AS detail_email, \
             u.admin AS detail_admin, u.total_discussions AS detail_total_discussions, \
             u.created_at AS detail_created_at \
             FROM moderators AS m LEFT JOIN users AS u ON u.id = m.user_id \
             WHERE m.place_id IN ({})",
            placeholders(place_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in place_ids {
            query = query.bind(uuid_to_blob(*id));
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| Moderator {
                id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
                place_id: blob_to_uuid(row.get::<Vec<u8>, _>("place_id").as_slice()),
                user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
                details: details_from_row(row),
            })
            .collect())
    }

    async fn permissions_in(&self, place_ids: &[Uuid]) -> anyhow::Result<Vec<Permission>> {
        if place_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT * FROM permissions WHERE place_id IN ({})",
            placeholders(place_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in place_ids {
            query = query.bind(uuid_to_blob(*id));
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| Permission {
                id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
                place_id: blob_to_uuid(row.get::<Vec<u8>, _>("place_id").as_slice()),
                action: row.get("action"),
                user_id: row
                    .get::<Option<Vec<u8>>, _>("user_id")
                    .map(|blob| blob_to_uuid(&blob)),
            })
            .collect())
    }
}
