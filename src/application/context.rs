//! Wiring of services over a set of repositories.

use std::sync::Arc;

use crate::application::categories::CategoryDirectory;
use crate::application::feed::FeedService;
use crate::application::posts::PostPublisher;
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, PostsRepo, PostsWriteRepo, UsersRepo,
};
use crate::application::sanitize::{HtmlSanitizer, SanitizerPolicy};
use crate::application::stats::StatisticsService;
use crate::application::users::UserService;
use crate::cache::{CacheConfig, CacheLayer, CacheStore, MemoryCacheStore};
use crate::config::Settings;

/// Repository handles the services are built from.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostsRepo>,
    pub posts_write: Arc<dyn PostsWriteRepo>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub categories_write: Arc<dyn CategoriesWriteRepo>,
    pub users: Arc<dyn UsersRepo>,
}

impl Repositories {
    /// Use one adapter for every repository trait.
    pub fn from_shared<R>(repo: Arc<R>) -> Self
    where
        R: PostsRepo + PostsWriteRepo + CategoriesRepo + CategoriesWriteRepo + UsersRepo + 'static,
    {
        Self {
            posts: repo.clone(),
            posts_write: repo.clone(),
            categories: repo.clone(),
            categories_write: repo.clone(),
            users: repo,
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub sanitizer: Arc<HtmlSanitizer>,
    pub cache: CacheLayer,
    pub categories: CategoryDirectory,
    pub posts: PostPublisher,
    pub stats: StatisticsService,
    pub feed: FeedService,
    pub users: UserService,
}

impl AppContext {
    /// Build every service with an in-process cache sized from `settings`.
    pub fn build(repos: Repositories, settings: &Settings) -> Self {
        let config = CacheConfig::from(&settings.cache);
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(&config));
        Self::build_with_cache_store(repos, settings, store)
    }

    pub fn build_with_cache_store(
        repos: Repositories,
        settings: &Settings,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        let cache = CacheLayer::new(store, CacheConfig::from(&settings.cache));
        let sanitizer = Arc::new(HtmlSanitizer::new(SanitizerPolicy::from(
            &settings.sanitizer,
        )));

        let categories = CategoryDirectory::new(
            repos.categories.clone(),
            repos.categories_write.clone(),
            cache.clone(),
        );
        let posts = PostPublisher::new(
            repos.posts.clone(),
            repos.posts_write.clone(),
            categories.clone(),
            sanitizer.clone(),
            cache.clone(),
        );
        let stats = StatisticsService::new(
            repos.posts.clone(),
            repos.categories.clone(),
            cache.clone(),
        );
        let feed = FeedService::new(repos.posts.clone(), repos.categories.clone());
        let users = UserService::new(repos.users);

        Self {
            sanitizer,
            cache,
            categories,
            posts,
            stats,
            feed,
            users,
        }
    }
}
