//! Public read side: published posts only.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{PageRequest, Paginated};
use crate::application::repos::{
    CategoriesRepo, PostListScope, PostQueryFilter, PostsRepo, RepoError,
};
use crate::domain::entities::{CategoryRecord, PostRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown category `{slug}`")]
    UnknownCategory { slug: String },
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A page of posts from a single category.
#[derive(Debug, Clone)]
pub struct CategoryFeed {
    pub category: CategoryRecord,
    pub posts: Paginated<PostRecord>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
}

impl FeedService {
    pub fn new(posts: Arc<dyn PostsRepo>, categories: Arc<dyn CategoriesRepo>) -> Self {
        Self { posts, categories }
    }

    pub async fn published_posts(
        &self,
        page: PageRequest,
    ) -> Result<Paginated<PostRecord>, FeedError> {
        self.page(PostQueryFilter::default(), page).await
    }

    pub async fn posts_in_category(
        &self,
        category_slug: &str,
        page: PageRequest,
    ) -> Result<CategoryFeed, FeedError> {
        let category = self
            .categories
            .find_by_slug(category_slug)
            .await?
            .ok_or_else(|| FeedError::UnknownCategory {
                slug: category_slug.to_string(),
            })?;

        let filter = PostQueryFilter {
            category_id: Some(category.id),
            search: None,
        };
        let posts = self.page(filter, page).await?;
        Ok(CategoryFeed { category, posts })
    }

    /// A published post by slug. Drafts are reported as missing.
    pub async fn published_post(&self, slug: &str) -> Result<PostRecord, FeedError> {
        self.posts
            .find_by_slug(slug)
            .await?
            .filter(PostRecord::is_published)
            .ok_or(FeedError::NotFound)
    }

    async fn page(
        &self,
        filter: PostQueryFilter,
        page: PageRequest,
    ) -> Result<Paginated<PostRecord>, FeedError> {
        let (items, total) = tokio::try_join!(
            self.posts.list_posts(PostListScope::Public, &filter, page),
            self.posts.count_posts(PostListScope::Public, &filter),
        )?;
        Ok(Paginated::new(items, total, page))
    }
}
