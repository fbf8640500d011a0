use crate::application::actor::Actor;
use crate::application::pagination::{PageRequest, Paginated};
use crate::application::repos::{PostListScope, PostQueryFilter};
use crate::domain::entities::PostRecord;

use super::service::PostPublisher;
use super::types::{AdminPostFilter, PublishError};

impl PostPublisher {
    /// Any post the actor may edit, drafts included.
    pub async fn preview_post(&self, actor: &Actor, id: i64) -> Result<PostRecord, PublishError> {
        self.authorized_post(actor, id).await
    }

    /// Admin listing across every author, newest first.
    pub async fn list_admin_posts(
        &self,
        filter: AdminPostFilter,
        page: PageRequest,
    ) -> Result<Paginated<PostRecord>, PublishError> {
        let scope = PostListScope::Admin {
            status: filter.status,
        };
        let query = PostQueryFilter {
            category_id: None,
            search: filter
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };

        let (items, total) = tokio::try_join!(
            self.reader.list_posts(scope, &query, page),
            self.reader.count_posts(scope, &query),
        )?;

        Ok(Paginated::new(items, total, page))
    }
}
