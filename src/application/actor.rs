use serde::{Deserialize, Serialize};

use crate::domain::entities::{PostRecord, UserRecord};

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(user_id: i64, is_admin: bool) -> Self {
        Self { user_id, is_admin }
    }

    pub fn admin(user_id: i64) -> Self {
        Self::new(user_id, true)
    }

    pub fn author(user_id: i64) -> Self {
        Self::new(user_id, false)
    }
}

impl From<&UserRecord> for Actor {
    fn from(user: &UserRecord) -> Self {
        Self::new(user.id, user.is_admin)
    }
}

/// Authors may manage their own posts; administrators may manage any post.
pub fn check_permission(post: &PostRecord, actor: &Actor) -> bool {
    actor.is_admin || post.author_id == actor.user_id
}
