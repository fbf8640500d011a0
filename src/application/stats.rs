//! Dashboard statistics, cached until the next post or category write.

use std::sync::Arc;

use crate::application::error::AppError;
use crate::application::repos::{CategoriesRepo, PostListScope, PostQueryFilter, PostsRepo};
use crate::cache::{CacheKey, CacheLayer};
use crate::domain::entities::DashboardStats;
use crate::domain::types::PostStatus;

#[derive(Clone)]
pub struct StatisticsService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    cache: CacheLayer,
}

impl StatisticsService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        cache: CacheLayer,
    ) -> Self {
        Self {
            posts,
            categories,
            cache,
        }
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        self.cache
            .get_or_load(CacheKey::DashboardStats, || self.count())
            .await
    }

    async fn count(&self) -> Result<DashboardStats, AppError> {
        let filter = PostQueryFilter::default();
        let published = PostListScope::Admin {
            status: Some(PostStatus::Published),
        };
        let drafts = PostListScope::Admin {
            status: Some(PostStatus::Draft),
        };

        let (published_count, draft_count, category_count) = tokio::try_join!(
            self.posts.count_posts(published, &filter),
            self.posts.count_posts(drafts, &filter),
            self.categories.count_categories(),
        )?;

        Ok(DashboardStats {
            published_count,
            draft_count,
            category_count,
        })
    }
}
