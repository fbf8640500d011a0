use std::sync::Arc;

use time::OffsetDateTime;
use tracing::warn;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    /// Stamp `last_login`. Never fails the login flow.
    pub async fn record_login(&self, user_id: i64) {
        if let Err(err) = self
            .users
            .touch_last_login(user_id, OffsetDateTime::now_utc())
            .await
        {
            warn!(user_id, error = %err, "failed to record last login");
        }
    }

    /// The account for `email`, unless it is missing or deactivated.
    pub async fn active_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let user = self.users.find_by_email(email.trim()).await?;
        Ok(user.filter(|user| user.is_active))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        self.users.find_by_id(id).await
    }
}
