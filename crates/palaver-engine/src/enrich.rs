//! # Batch Enricher
//!
//! Attaches related entities to collections in O(1) queries per relation:
//! collect distinct foreign keys in one pass, bulk-fetch each relation,
//! index by key, attach in a second pass. Nothing in this module fetches
//! per row.

use std::collections::HashMap;

use uuid::Uuid;

use palaver_core::models::{Discussion, DiscussionView, Participant, Place, PlaceNode, User};
use palaver_core::traits::ForumRepo;

/// Load authors, recent posters and participants for a set of discussions.
///
/// The three bulk fetches are independent reads and run concurrently; the
/// recent-poster fetch is skipped entirely when no discussion has one. A
/// discussion with no participant rows gets `participants: None`, never an
/// empty list.
pub async fn enrich_discussions(
    repo: &dyn ForumRepo,
    discussions: Vec<Discussion>,
) -> anyhow::Result<Vec<DiscussionView>> {
    if discussions.is_empty() {
        return Ok(Vec::new());
    }

    let mut author_ids = Vec::new();
    let mut discussion_ids = Vec::new();
    let mut recent_ids = Vec::new();

    for discussion in &discussions {
        author_ids.push(discussion.user_id);
        discussion_ids.push(discussion.id);

        if let Some(recent) = discussion.last_reply_user_id {
            recent_ids.push(recent);
        }
    }

    author_ids.sort_unstable();
    author_ids.dedup();
    recent_ids.sort_unstable();
    recent_ids.dedup();

    let (authors, participants, recently) = tokio::try_join!(
        repo.users_by_ids(&author_ids),
        repo.participants_in(&discussion_ids),
        async {
            if recent_ids.is_empty() {
                Ok(Vec::new())
            } else {
                repo.users_by_ids(&recent_ids).await
            }
        },
    )?;

    let authors: HashMap<Uuid, User> = authors.into_iter().map(|u| (u.id, u)).collect();
    let recently: HashMap<Uuid, User> = recently.into_iter().map(|u| (u.id, u)).collect();

    let mut participants_by_discussion: HashMap<Uuid, Vec<Participant>> = HashMap::new();
    for participant in participants {
        participants_by_discussion
            .entry(participant.discussion_id)
            .or_default()
            .push(participant);
    }

    Ok(discussions
        .into_iter()
        .map(|discussion| {
            let author = authors.get(&discussion.user_id).cloned();
            let recent = discussion
                .last_reply_user_id
                .and_then(|id| recently.get(&id).cloned());
            let participants = participants_by_discussion.get(&discussion.id).cloned();

            DiscussionView {
                discussion,
                author,
                recent,
                participants,
                place: None,
            }
        })
        .collect())
}

/// Derive enriched nodes from place rows, with permissions and moderators
/// bulk-attached.
pub async fn enrich_places(
    repo: &dyn ForumRepo,
    places: Vec<Place>,
) -> anyhow::Result<Vec<PlaceNode>> {
    if places.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = places.iter().map(|p| p.id).collect();

    let (permissions, moderators) =
        tokio::try_join!(repo.permissions_in(&ids), repo.moderators_in(&ids))?;

    let mut permissions_by_place: HashMap<Uuid, Vec<_>> = HashMap::new();
    for permission in permissions {
        permissions_by_place
            .entry(permission.place_id)
            .or_default()
            .push(permission);
    }

    let mut moderators_by_place: HashMap<Uuid, Vec<_>> = HashMap::new();
    for moderator in moderators {
        moderators_by_place
            .entry(moderator.place_id)
            .or_default()
            .push(moderator);
    }

    Ok(places
        .into_iter()
        .map(|place| {
            let mut node = PlaceNode::from_place(place);
            node.permissions = permissions_by_place.remove(&node.id()).unwrap_or_default();
            node.moderators = moderators_by_place.remove(&node.id()).unwrap_or_default();
            node
        })
        .collect())
}
