//! # palaver-auth-simple
//!
//! Permission-row implementation of `CapabilityOracle`.
//!
//! Place rules read the rows the batch enricher attached to each node: no
//! rows for an action means the place is open, otherwise some row must
//! grant the viewer (or everyone). Discussion rules come from the record
//! itself: drafts belong to their author, private discussions to their
//! author and participants.

use palaver_core::models::{DiscussionView, PlaceNode, User};
use palaver_core::traits::{CapabilityOracle, Target};
use uuid::Uuid;

pub struct SimpleCapabilityOracle {
    viewer: Option<User>,
}

impl SimpleCapabilityOracle {
    pub fn new(viewer: Option<User>) -> Self {
        Self { viewer }
    }

    pub fn anonymous() -> Self {
        Self { viewer: None }
    }

    fn viewer_id(&self) -> Option<Uuid> {
        self.viewer.as_ref().map(|user| user.id)
    }

    fn is_admin(&self) -> bool {
        self.viewer.as_ref().is_some_and(|user| user.admin)
    }

    fn can_place(&self, action: &str, node: &PlaceNode) -> bool {
        let mut restricted = false;

        for permission in &node.permissions {
            if permission.action != action {
                continue;
            }

            match permission.user_id {
                None => return true,
                Some(granted) if Some(granted) == self.viewer_id() => return true,
                Some(_) => restricted = true,
            }
        }

        !restricted
    }

    fn can_discussion(&self, view: &DiscussionView) -> bool {
        let discussion = &view.discussion;

        if discussion.draft {
            return self.viewer_id() == Some(discussion.user_id);
        }

        if !discussion.private {
            return true;
        }

        let Some(viewer) = self.viewer_id() else {
            return false;
        };

        viewer == discussion.user_id
            || view
                .participants
                .as_ref()
                .is_some_and(|rows| rows.iter().any(|p| p.user_id == viewer))
    }
}

impl CapabilityOracle for SimpleCapabilityOracle {
    fn can(&self, action: &str, target: Target<'_>) -> bool {
        if self.is_admin() {
            return true;
        }

        match target {
            Target::Place(node) => self.can_place(action, node),
            Target::Discussion(view) => self.can_discussion(view),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use palaver_core::models::{Discussion, Participant, Permission, Place};
    use palaver_core::traits::actions;

    fn user(n: u128, admin: bool) -> User {
        User {
            id: Uuid::from_u128(n),
            username: format!("user-{n}"),
            email: None,
            admin,
            total_discussions: 0,
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    fn node_with_permissions(permissions: Vec<Permission>) -> PlaceNode {
        let mut node = PlaceNode::from_place(Place {
            id: Uuid::from_u128(1),
            name: "General".into(),
            slug: "general".into(),
            lft: 1,
            rgt: 2,
            depth: 0,
            postable: true,
            user_post_increment: true,
            total_discussions: 0,
        });
        node.permissions = permissions;
        node
    }

    fn view(private: bool, draft: bool, author: Uuid) -> DiscussionView {
        DiscussionView::bare(Discussion {
            id: Uuid::from_u128(50),
            place_id: Uuid::from_u128(1),
            user_id: author,
            last_reply_user_id: None,
            title: "t".into(),
            body: "b".into(),
            private,
            draft,
            replies: 0,
            views: 0,
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
            updated_at: Utc.timestamp_opt(0, 0).unwrap(),
        })
    }

    fn grant(action: &str, user_id: Option<Uuid>) -> Permission {
        Permission {
            id: Uuid::now_v7(),
            place_id: Uuid::from_u128(1),
            action: action.into(),
            user_id,
        }
    }

    #[test]
    fn places_without_rows_are_open() {
        let oracle = SimpleCapabilityOracle::anonymous();
        let node = node_with_permissions(Vec::new());

        assert!(oracle.can(actions::VIEW_PLACE, Target::Place(&node)));
    }

    #[test]
    fn restricted_places_need_a_matching_grant() {
        let member = user(2, false);
        let node = node_with_permissions(vec![grant(actions::VIEW_PLACE, Some(member.id))]);

        let as_member = SimpleCapabilityOracle::new(Some(member));
        let as_stranger = SimpleCapabilityOracle::new(Some(user(3, false)));

        assert!(as_member.can(actions::VIEW_PLACE, Target::Place(&node)));
        assert!(!as_stranger.can(actions::VIEW_PLACE, Target::Place(&node)));
    }

    #[test]
    fn grants_are_scoped_per_action() {
        let viewer = user(2, false);
        let node = node_with_permissions(vec![grant("start: discussion", Some(user(9, false).id))]);
        let oracle = SimpleCapabilityOracle::new(Some(viewer));

        // The view action has no rows, so viewing stays open.
        assert!(oracle.can(actions::VIEW_PLACE, Target::Place(&node)));
        assert!(!oracle.can("start: discussion", Target::Place(&node)));
    }

    #[test]
    fn admins_bypass_every_rule() {
        let oracle = SimpleCapabilityOracle::new(Some(user(1, true)));
        let node = node_with_permissions(vec![grant(actions::VIEW_PLACE, Some(Uuid::from_u128(9)))]);
        let hidden = view(true, false, Uuid::from_u128(9));

        assert!(oracle.can(actions::VIEW_PLACE, Target::Place(&node)));
        assert!(oracle.can(actions::VIEW_DISCUSSION, Target::Discussion(&hidden)));
    }

    #[test]
    fn private_discussions_admit_author_and_participants_only() {
        let author = user(2, false);
        let member = user(3, false);
        let mut private = view(true, false, author.id);
        private.participants = Some(vec![Participant {
            id: Uuid::now_v7(),
            discussion_id: private.discussion.id,
            user_id: member.id,
            details: None,
        }]);

        let as_author = SimpleCapabilityOracle::new(Some(author));
        let as_member = SimpleCapabilityOracle::new(Some(member));
        let as_stranger = SimpleCapabilityOracle::new(Some(user(4, false)));
        let as_nobody = SimpleCapabilityOracle::anonymous();

        assert!(as_author.can(actions::VIEW_DISCUSSION, Target::Discussion(&private)));
        assert!(as_member.can(actions::VIEW_DISCUSSION, Target::Discussion(&private)));
        assert!(!as_stranger.can(actions::VIEW_DISCUSSION, Target::Discussion(&private)));
        assert!(!as_nobody.can(actions::VIEW_DISCUSSION, Target::Discussion(&private)));
    }

    #[test]
    fn drafts_are_visible_to_their_author_alone() {
        let author = user(2, false);
        let draft = view(false, true, author.id);

        let as_author = SimpleCapabilityOracle::new(Some(author));
        let as_stranger = SimpleCapabilityOracle::new(Some(user(3, false)));

        assert!(as_author.can(actions::VIEW_DISCUSSION, Target::Discussion(&draft)));
        assert!(!as_stranger.can(actions::VIEW_DISCUSSION, Target::Discussion(&draft)));
    }
}
