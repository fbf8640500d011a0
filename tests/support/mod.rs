#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quire::application::context::{AppContext, Repositories};
use quire::application::pagination::PageRequest;
use quire::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, CreatePostParams, CreateUserParams,
    PostListScope, PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError, UpdateCategoryParams,
    UpdatePostParams, UsersRepo,
};
use quire::cache::{CacheConfig, CacheError, CacheStore, MemoryCacheStore};
use quire::config::Settings;
use quire::domain::entities::{CategoryRecord, CategoryWithCounts, PostRecord, UserRecord};
use quire::domain::types::PostStatus;
use time::OffsetDateTime;

#[derive(Default)]
struct State {
    posts: Vec<PostRecord>,
    categories: Vec<CategoryRecord>,
    users: Vec<UserRecord>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory stand-in for the Postgres adapter.
///
/// Unique constraints are reported with the same constraint names as the
/// schema, and category deletion happens under one lock so it is atomic.
#[derive(Default)]
pub struct MemoryRepos {
    state: Mutex<State>,
    /// Hide posts from slug lookups so writes reach the uniqueness check.
    pub hide_post_slugs: AtomicBool,
    pub fail_post_writes: AtomicBool,
    pub fail_category_reads: AtomicBool,
    pub fail_last_login: AtomicBool,
}

impl MemoryRepos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_user(&self, username: &str, is_admin: bool) -> UserRecord {
        let mut state = self.state.lock().unwrap();
        let user = UserRecord {
            id: state.next_id(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            is_admin,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
        };
        state.users.push(user.clone());
        user
    }

    pub fn seed_category(&self, name: &str, slug: &str) -> CategoryRecord {
        let mut state = self.state.lock().unwrap();
        let category = CategoryRecord {
            id: state.next_id(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: None,
            created_at: OffsetDateTime::now_utc(),
        };
        state.categories.push(category.clone());
        category
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.state
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn posts(&self) -> Vec<PostRecord> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn categories(&self) -> Vec<CategoryRecord> {
        self.state.lock().unwrap().categories.clone()
    }

    pub fn user(&self, id: i64) -> Option<UserRecord> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }

    fn check_post_write(&self) -> Result<(), RepoError> {
        if self.fail_post_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection refused".to_string()));
        }
        Ok(())
    }
}

fn visible(post: &PostRecord, scope: PostListScope, filter: &PostQueryFilter) -> bool {
    let in_scope = match scope {
        PostListScope::Public => post.status == PostStatus::Published,
        PostListScope::Admin { status } => status.is_none_or(|s| s == post.status),
    };
    let in_category = filter.category_id.is_none_or(|id| id == post.category_id);
    let matches_search = filter.search.as_ref().is_none_or(|needle| {
        post.title
            .to_lowercase()
            .contains(&needle.to_lowercase())
    });
    in_scope && in_category && matches_search
}

fn duplicate(constraint: &str) -> RepoError {
    RepoError::Duplicate {
        constraint: constraint.to_string(),
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn list_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut posts: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .posts
            .iter()
            .filter(|p| visible(p, scope, filter))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn count_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
    ) -> Result<u64, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .posts
            .iter()
            .filter(|p| visible(p, scope, filter))
            .count() as u64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.post(id))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        if self.hide_post_slugs.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.check_post_write()?;
        let mut state = self.state.lock().unwrap();
        if state.posts.iter().any(|p| p.slug == params.slug) {
            return Err(duplicate("posts_slug_key"));
        }
        if !state.categories.iter().any(|c| c.id == params.category_id) {
            return Err(RepoError::InvalidInput {
                message: "posts_category_id_fkey".to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: state.next_id(),
            title: params.title,
            slug: params.slug,
            content: params.content.into_inner(),
            description: params.description,
            thumbnail: params.thumbnail,
            status: params.status,
            category_id: params.category_id,
            author_id: params.author_id,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        self.check_post_write()?;
        let mut state = self.state.lock().unwrap();
        if state
            .posts
            .iter()
            .any(|p| p.slug == params.slug && p.id != params.id)
        {
            return Err(duplicate("posts_slug_key"));
        }
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == params.id)
            .ok_or(RepoError::NotFound)?;

        post.title = params.title;
        post.slug = params.slug;
        post.content = params.content.into_inner();
        post.description = params.description;
        post.thumbnail = params.thumbnail;
        post.status = params.status;
        post.category_id = params.category_id;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        self.check_post_write()?;
        let mut state = self.state.lock().unwrap();
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryRepos {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut categories = self.categories();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCounts>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<_> = state
            .categories
            .iter()
            .map(|category| {
                let posts = state.posts.iter().filter(|p| p.category_id == category.id);
                let (published, total) = posts.fold((0, 0), |(published, total), post| {
                    (published + u64::from(post.is_published()), total + 1)
                });
                CategoryWithCounts {
                    category: category.clone(),
                    published_count: published,
                    total_count: total,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(rows)
    }

    async fn list_with_published_posts(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        if self.fail_category_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        let state = self.state.lock().unwrap();
        let mut categories: Vec<_> = state
            .categories
            .iter()
            .filter(|c| {
                state
                    .posts
                    .iter()
                    .any(|p| p.category_id == c.id && p.is_published())
            })
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn count_categories(&self) -> Result<u64, RepoError> {
        Ok(self.state.lock().unwrap().categories.len() as u64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.categories().into_iter().find(|c| c.id == id))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.categories().into_iter().find(|c| c.slug == slug))
    }
}

#[async_trait]
impl CategoriesWriteRepo for MemoryRepos {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        if state.categories.iter().any(|c| c.name == params.name) {
            return Err(duplicate("categories_name_key"));
        }
        if state.categories.iter().any(|c| c.slug == params.slug) {
            return Err(duplicate("categories_slug_key"));
        }
        let category = CategoryRecord {
            id: state.next_id(),
            name: params.name,
            slug: params.slug,
            description: params.description,
            created_at: OffsetDateTime::now_utc(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let others = state.categories.iter().filter(|c| c.id != params.id);
        for other in others {
            if other.name == params.name {
                return Err(duplicate("categories_name_key"));
            }
            if other.slug == params.slug {
                return Err(duplicate("categories_slug_key"));
            }
        }
        let category = state
            .categories
            .iter_mut()
            .find(|c| c.id == params.id)
            .ok_or(RepoError::NotFound)?;
        category.name = params.name;
        category.slug = params.slug;
        category.description = params.description;
        Ok(category.clone())
    }

    async fn delete_category_reassigning(
        &self,
        id: i64,
        fallback_id: i64,
    ) -> Result<u64, RepoError> {
        let mut state = self.state.lock().unwrap();
        if !state.categories.iter().any(|c| c.id == id) {
            return Err(RepoError::NotFound);
        }
        let mut moved = 0;
        for post in state.posts.iter_mut().filter(|p| p.category_id == id) {
            post.category_id = fallback_id;
            moved += 1;
        }
        state.categories.retain(|c| c.id != id);
        Ok(moved)
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email == params.email) {
            return Err(duplicate("users_email_key"));
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            is_admin: params.is_admin,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.user(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn touch_last_login(&self, id: i64, at: OffsetDateTime) -> Result<(), RepoError> {
        if self.fail_last_login.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)?;
        user.last_login = Some(at);
        Ok(())
    }
}

/// Memory cache store that records deletions and can be told to fail them.
pub struct RecordingCacheStore {
    inner: MemoryCacheStore,
    pub fail_deletes: AtomicBool,
    deleted: Mutex<Vec<String>>,
}

impl RecordingCacheStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCacheStore::new(&CacheConfig::default()),
            fail_deletes: AtomicBool::new(false),
            deleted: Mutex::new(Vec::new()),
        })
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.deleted.lock().unwrap().clear();
    }

    pub async fn contains(&self, key: &str) -> bool {
        matches!(self.inner.get(key).await, Ok(Some(_)))
    }
}

#[async_trait]
impl CacheStore for RecordingCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CacheError::backend("cache unavailable"));
        }
        self.deleted.lock().unwrap().push(key.to_string());
        self.inner.delete(key).await
    }
}

pub fn context(repos: &Arc<MemoryRepos>) -> AppContext {
    AppContext::build(Repositories::from_shared(repos.clone()), &Settings::default())
}

pub fn context_with_store(repos: &Arc<MemoryRepos>, store: Arc<RecordingCacheStore>) -> AppContext {
    AppContext::build_with_cache_store(
        Repositories::from_shared(repos.clone()),
        &Settings::default(),
        store,
    )
}
