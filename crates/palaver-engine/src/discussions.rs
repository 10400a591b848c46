//! # DiscussionService
//!
//! Starting and editing discussions: counter increments on publication,
//! participant synchronization for private discussions, and the cache
//! invalidation that follows every write.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use palaver_core::error::{AppError, Result};
use palaver_core::models::{Discussion, DiscussionInput, DiscussionView};
use palaver_core::traits::ForumRepo;

use crate::cache::{self, Memo};
use crate::enrich;

const UNTITLED: &str = "Untitled Discussion";

pub struct DiscussionService {
    repo: Arc<dyn ForumRepo>,
    memo: Memo,
}

impl DiscussionService {
    pub fn new(repo: Arc<dyn ForumRepo>, memo: Memo) -> Self {
        Self { repo, memo }
    }

    /// Start a new discussion. Same path as [`edit`](Self::edit) with no
    /// existing record.
    pub async fn start(&self, input: DiscussionInput) -> Result<Discussion> {
        self.edit(None, input).await
    }

    /// Create or update a discussion.
    ///
    /// The place's (and possibly the author's) discussion counter is
    /// bumped only when the discussion becomes publicly visible: a brand
    /// new one submitted with `start`, or an existing draft saved without
    /// the draft flag. A failed save aborts before any increment,
    /// participant sync or cache invalidation.
    pub async fn edit(
        &self,
        existing: Option<Discussion>,
        input: DiscussionInput,
    ) -> Result<Discussion> {
        let increment = match &existing {
            Some(discussion) => discussion.draft && !input.draft,
            None => input.start,
        };

        let mut place = self
            .repo
            .load_place(input.place)
            .await?
            .ok_or_else(|| AppError::NotFound("place".into(), input.place.to_string()))?;

        let names: Vec<String> = input
            .participants
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        let now = Utc::now();
        let discussion = match existing {
            Some(mut discussion) => {
                discussion.place_id = input.place;
                discussion.user_id = input.user;
                discussion.title = resolve_title(&input, Some(&discussion.title));
                discussion.body = input.body.clone();
                discussion.private = !names.is_empty();
                discussion.draft = input.draft;
                discussion.updated_at = now;
                discussion
            }
            None => Discussion {
                id: Uuid::now_v7(),
                place_id: input.place,
                user_id: input.user,
                last_reply_user_id: None,
                title: resolve_title(&input, None),
                body: input.body.clone(),
                private: !names.is_empty(),
                draft: input.draft,
                replies: 0,
                views: 0,
                created_at: now,
                updated_at: now,
            },
        };

        self.repo
            .save_discussion(&discussion)
            .await
            .map_err(|e| AppError::ValidationError(format!("{e:#}")))?;

        if increment {
            place.total_discussions += 1;
            self.repo.save_place(&place).await?;

            if place.user_post_increment {
                if let Some(mut user) = self.repo.get_user(input.user).await? {
                    user.total_discussions += 1;
                    self.repo.save_user(&user).await?;
                }
            }
        }

        self.sync_participants(&discussion, &names).await?;

        // Write-then-invalidate: the mutation is committed, now drop every
        // snapshot it could have staled.
        self.memo.forget(&cache::discussion_key(discussion.id)).await;
        self.memo.forget(&cache::place_key(discussion.place_id)).await;
        self.memo.forget(cache::PLACES_KEY).await;
        self.memo.forget(&cache::user_key(discussion.user_id)).await;

        tracing::info!(discussion = %discussion.id, place = %discussion.place_id, "discussion saved");

        Ok(discussion)
    }

    /// Reconcile the participant table with the submitted username list:
    /// rows not in the set are deleted, present ones are left untouched,
    /// only the net-new rows are inserted.
    async fn sync_participants(&self, discussion: &Discussion, names: &[String]) -> Result<()> {
        let mut pending: Vec<Uuid> = if names.is_empty() {
            Vec::new()
        } else {
            self.repo
                .users_by_usernames(names)
                .await?
                .into_iter()
                .map(|user| user.id)
                .collect()
        };

        let current = self.repo.participants_for(discussion.id).await?;

        if !current.is_empty() {
            if pending.is_empty() {
                self.repo.delete_participants(discussion.id).await?;
            } else {
                self.repo
                    .delete_participants_not_in(discussion.id, &pending)
                    .await?;
            }

            let already: HashSet<Uuid> = current.iter().map(|p| p.user_id).collect();
            pending.retain(|id| !already.contains(id));
        }

        if !pending.is_empty() {
            let rows: Vec<(Uuid, Uuid)> =
                pending.into_iter().map(|user| (discussion.id, user)).collect();
            self.repo.insert_participants(&rows).await?;
        }

        Ok(())
    }

    /// A single discussion, memoized under `discussion_{id}`.
    pub async fn find(&self, id: Uuid) -> Result<Option<Discussion>> {
        let repo = self.repo.clone();

        self.memo
            .remember(&cache::discussion_key(id), || async move {
                Ok(repo.get_discussion(id).await?)
            })
            .await
    }

    /// Batch-enrich a list of discussions with authors, recent posters
    /// and participants.
    pub async fn enrich(&self, discussions: Vec<Discussion>) -> Result<Vec<DiscussionView>> {
        Ok(enrich::enrich_discussions(self.repo.as_ref(), discussions).await?)
    }

    /// The participant usernames of a discussion, comma separated.
    pub async fn participants_to_string(&self, discussion: &Discussion) -> Result<String> {
        let participants = self.repo.participants_for(discussion.id).await?;
        let ids: Vec<Uuid> = participants.iter().map(|p| p.user_id).collect();

        if ids.is_empty() {
            return Ok(String::new());
        }

        let users = self.repo.users_by_ids(&ids).await?;
        Ok(users
            .into_iter()
            .map(|user| user.username)
            .collect::<Vec<_>>()
            .join(", "))
    }
}

/// Drafts with a blank title fall back to a stand-in; otherwise the
/// submitted title wins, then whatever the discussion already had.
fn resolve_title(input: &DiscussionInput, existing: Option<&str>) -> String {
    let submitted = input
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty());

    if input.draft {
        return submitted.unwrap_or(UNTITLED).to_string();
    }

    submitted
        .map(String::from)
        .or_else(|| existing.map(String::from))
        .unwrap_or_default()
}
