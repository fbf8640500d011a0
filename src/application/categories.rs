//! Category directory: the protected default category, admin CRUD and cached pickers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::actor::Actor;
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, RepoError, UpdateCategoryParams,
};
use crate::cache::{CacheKey, CacheLayer, WriteEvent};
use crate::domain::categories::{
    CHOICE_PLACEHOLDER_LABEL, CategoryForm, DEFAULT_CATEGORY_DESCRIPTION, DEFAULT_CATEGORY_NAME,
    DEFAULT_CATEGORY_SLUG, ValidatedCategory, is_default_name, is_default_slug,
};
use crate::domain::entities::{CategoryChoice, CategoryRecord, CategoryWithCounts};
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async};
use crate::domain::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("category validation failed: {0}")]
    Validation(FieldErrors),
    #[error("a category with this {field} already exists")]
    Duplicate { field: &'static str },
    #[error("the default category cannot be modified or deleted")]
    Protected,
    #[error("only administrators can manage categories")]
    Forbidden,
    #[error("category not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl CategoryError {
    /// Per-field messages for form redisplay, when the failure is field-specific.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            CategoryError::Validation(errors) => Some(errors.clone()),
            CategoryError::Duplicate { field } => Some(FieldErrors::single(
                *field,
                format!("A category with this {field} already exists."),
            )),
            _ => None,
        }
    }
}

/// Category shown in the public navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavCategory {
    pub name: String,
    pub slug: String,
}

#[derive(Clone)]
pub struct CategoryDirectory {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    cache: CacheLayer,
}

impl CategoryDirectory {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        cache: CacheLayer,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    pub fn is_default(&self, category: &CategoryRecord) -> bool {
        category.is_default()
    }

    /// Fetch the default category, creating it on first use.
    ///
    /// Concurrent first uses may race on the insert; the loser re-reads the
    /// winner's row.
    pub async fn get_or_create_default(&self) -> Result<CategoryRecord, CategoryError> {
        if let Some(existing) = self.reader.find_by_slug(DEFAULT_CATEGORY_SLUG).await? {
            return Ok(existing);
        }

        let params = CreateCategoryParams {
            name: DEFAULT_CATEGORY_NAME.to_string(),
            slug: DEFAULT_CATEGORY_SLUG.to_string(),
            description: Some(DEFAULT_CATEGORY_DESCRIPTION.to_string()),
        };

        match self.writer.create_category(params).await {
            Ok(created) => {
                info!(category_id = created.id, "default category created");
                self.cache
                    .record(WriteEvent::CategoryCreated {
                        category_id: created.id,
                    })
                    .await;
                Ok(created)
            }
            Err(RepoError::Duplicate { .. }) => self
                .reader
                .find_by_slug(DEFAULT_CATEGORY_SLUG)
                .await?
                .ok_or_else(|| {
                    CategoryError::Repo(RepoError::Integrity {
                        message: "default category conflicts with an existing name".to_string(),
                    })
                }),
            Err(err) => Err(err.into()),
        }
    }

    /// Map a submitted category id to a concrete one. `None` and non-positive ids
    /// select the default category.
    pub async fn resolve(&self, category_id: Option<i64>) -> Result<i64, CategoryError> {
        match category_id {
            Some(id) if id > 0 => Ok(id),
            _ => Ok(self.get_or_create_default().await?.id),
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CategoryRecord>, CategoryError> {
        self.reader.find_by_id(id).await.map_err(CategoryError::from)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, CategoryError> {
        self.reader
            .find_by_slug(slug)
            .await
            .map_err(CategoryError::from)
    }

    pub async fn list_with_counts(&self) -> Result<Vec<CategoryWithCounts>, CategoryError> {
        self.reader
            .list_with_counts()
            .await
            .map_err(CategoryError::from)
    }

    pub async fn create_category(
        &self,
        actor: &Actor,
        form: CategoryForm,
    ) -> Result<CategoryRecord, CategoryError> {
        ensure_admin(actor)?;
        let validated = form.validate().map_err(CategoryError::Validation)?;
        ensure_not_reserved(&validated)?;

        let slug = match validated.slug {
            Some(slug) => slug,
            None => self.derive_unique_slug(&validated.name, None).await?,
        };

        let params = CreateCategoryParams {
            name: validated.name,
            slug,
            description: validated.description,
        };

        let created = self
            .writer
            .create_category(params)
            .await
            .map_err(map_write_error)?;

        info!(
            category_id = created.id,
            slug = %created.slug,
            actor = actor.user_id,
            "category created"
        );
        self.cache
            .record(WriteEvent::CategoryCreated {
                category_id: created.id,
            })
            .await;
        Ok(created)
    }

    pub async fn update_category(
        &self,
        actor: &Actor,
        id: i64,
        form: CategoryForm,
    ) -> Result<CategoryRecord, CategoryError> {
        ensure_admin(actor)?;
        let existing = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(CategoryError::NotFound)?;
        if existing.is_default() {
            return Err(CategoryError::Protected);
        }

        let validated = form.validate().map_err(CategoryError::Validation)?;
        ensure_not_reserved(&validated)?;
        let slug = match validated.slug {
            Some(slug) => slug,
            None => self.derive_unique_slug(&validated.name, Some(id)).await?,
        };

        let params = UpdateCategoryParams {
            id,
            name: validated.name,
            slug,
            description: validated.description,
        };

        let updated = self
            .writer
            .update_category(params)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => CategoryError::NotFound,
                other => map_write_error(other),
            })?;

        info!(category_id = id, actor = actor.user_id, "category updated");
        self.cache
            .record(WriteEvent::CategoryUpdated { category_id: id })
            .await;
        Ok(updated)
    }

    /// Delete a category, moving its posts to the default category in the same transaction.
    ///
    /// Returns how many posts were moved.
    pub async fn delete_category(&self, actor: &Actor, id: i64) -> Result<u64, CategoryError> {
        ensure_admin(actor)?;
        let category = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(CategoryError::NotFound)?;
        if category.is_default() {
            warn!(
                category_id = id,
                actor = actor.user_id,
                "refused to delete the default category"
            );
            return Err(CategoryError::Protected);
        }

        let fallback = self.get_or_create_default().await?;
        let reassigned = self
            .writer
            .delete_category_reassigning(id, fallback.id)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => CategoryError::NotFound,
                other => {
                    error!(category_id = id, error = %other, "category deletion failed");
                    CategoryError::Repo(other)
                }
            })?;

        info!(
            category_id = id,
            reassigned,
            fallback_id = fallback.id,
            actor = actor.user_id,
            "category deleted"
        );
        self.cache
            .record(WriteEvent::CategoryDeleted {
                category_id: id,
                reassigned,
            })
            .await;
        Ok(reassigned)
    }

    /// Picker entries: the placeholder, the default category, then the rest by name.
    pub async fn category_choices(&self) -> Result<Vec<CategoryChoice>, CategoryError> {
        self.cache
            .get_or_load(CacheKey::CategoryChoices, || async {
                let categories = self.reader.list_categories().await?;
                Ok::<_, CategoryError>(build_choices(categories))
            })
            .await
    }

    /// Names of categories that have published posts. Empty when storage is unavailable.
    pub async fn available_categories(&self) -> Vec<String> {
        let loaded = self
            .cache
            .get_or_load(CacheKey::AvailableCategories, || async {
                let categories = self.reader.list_with_published_posts().await?;
                Ok::<_, RepoError>(categories.into_iter().map(|c| c.name).collect::<Vec<_>>())
            })
            .await;

        loaded.unwrap_or_else(|err| {
            error!(error = %err, "failed to load available categories");
            Vec::new()
        })
    }

    /// Navigation entries for categories with published posts. Empty when storage is unavailable.
    pub async fn nav_categories(&self) -> Vec<NavCategory> {
        let loaded = self
            .cache
            .get_or_load(CacheKey::NavCategories, || async {
                let categories = self.reader.list_with_published_posts().await?;
                Ok::<_, RepoError>(
                    categories
                        .into_iter()
                        .map(|c| NavCategory {
                            name: c.name,
                            slug: c.slug,
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .await;

        loaded.unwrap_or_else(|err| {
            error!(error = %err, "failed to load navigation categories");
            Vec::new()
        })
    }

    async fn derive_unique_slug(
        &self,
        name: &str,
        own_id: Option<i64>,
    ) -> Result<String, CategoryError> {
        let reader = Arc::clone(&self.reader);
        let result = generate_unique_slug_async(name, move |candidate| {
            let reader = Arc::clone(&reader);
            async move {
                if is_default_slug(&candidate) {
                    return Ok(false);
                }
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none_or(|c| Some(c.id) == own_id))
            }
        })
        .await;

        match result {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Slug(SlugError::Exhausted { .. })) => {
                Err(CategoryError::Duplicate { field: "slug" })
            }
            Err(SlugAsyncError::Slug(_)) => Err(CategoryError::Validation(FieldErrors::single(
                "slug",
                "could not derive a slug from the name; please enter one",
            ))),
            Err(SlugAsyncError::Predicate(err)) => Err(CategoryError::Repo(err)),
        }
    }
}

fn ensure_not_reserved(category: &ValidatedCategory) -> Result<(), CategoryError> {
    if is_default_name(&category.name) {
        return Err(CategoryError::Duplicate { field: "name" });
    }
    if category.slug.as_deref().is_some_and(is_default_slug) {
        return Err(CategoryError::Duplicate { field: "slug" });
    }
    Ok(())
}

fn ensure_admin(actor: &Actor) -> Result<(), CategoryError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(CategoryError::Forbidden)
    }
}

fn map_write_error(err: RepoError) -> CategoryError {
    if err.is_duplicate_on("slug") {
        CategoryError::Duplicate { field: "slug" }
    } else if err.is_duplicate_on("name") {
        CategoryError::Duplicate { field: "name" }
    } else {
        CategoryError::Repo(err)
    }
}

fn build_choices(mut categories: Vec<CategoryRecord>) -> Vec<CategoryChoice> {
    categories.sort_by(|a, b| {
        b.is_default()
            .cmp(&a.is_default())
            .then_with(|| a.name.cmp(&b.name))
    });

    std::iter::once(CategoryChoice {
        id: 0,
        name: CHOICE_PLACEHOLDER_LABEL.to_string(),
    })
    .chain(categories.into_iter().map(|category| CategoryChoice {
        id: category.id,
        name: category.name,
    }))
    .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;
    use crate::cache::{CacheConfig, MemoryCacheStore};

    fn category(id: i64, name: &str, slug: &str) -> CategoryRecord {
        CategoryRecord {
            id,
            name: name.into(),
            slug: slug.into(),
            description: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[derive(Default)]
    struct StubCategoriesRepo {
        records: Vec<CategoryRecord>,
        fail: bool,
    }

    #[async_trait]
    impl CategoriesRepo for StubCategoriesRepo {
        async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            Ok(self.records.clone())
        }

        async fn list_with_counts(&self) -> Result<Vec<CategoryWithCounts>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_with_published_posts(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            if self.fail {
                return Err(RepoError::Timeout);
            }
            Ok(self.records.clone())
        }

        async fn count_categories(&self) -> Result<u64, RepoError> {
            Ok(self.records.len() as u64)
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self.records.iter().find(|c| c.id == id).cloned())
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self.records.iter().find(|c| c.slug == slug).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        deleted: Mutex<Vec<(i64, i64)>>,
    }

    #[async_trait]
    impl CategoriesWriteRepo for RecordingWriter {
        async fn create_category(
            &self,
            _params: CreateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn update_category(
            &self,
            _params: UpdateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn delete_category_reassigning(
            &self,
            id: i64,
            fallback_id: i64,
        ) -> Result<u64, RepoError> {
            self.deleted.lock().unwrap().push((id, fallback_id));
            Ok(2)
        }
    }

    fn directory(reader: StubCategoriesRepo, writer: Arc<RecordingWriter>) -> CategoryDirectory {
        let config = CacheConfig::default();
        let cache = CacheLayer::new(Arc::new(MemoryCacheStore::new(&config)), config);
        CategoryDirectory::new(Arc::new(reader), writer, cache)
    }

    #[test]
    fn choices_put_default_first_after_placeholder() {
        let choices = build_choices(vec![
            category(3, "Rust", "rust"),
            category(1, "Uncategorized", "uncategorized"),
            category(2, "Art", "art"),
        ]);
        let names: Vec<_> = choices.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Select Category", "Uncategorized", "Art", "Rust"]);
        assert_eq!(choices[0].id, 0);
    }

    #[tokio::test]
    async fn default_category_is_protected() {
        let writer = Arc::new(RecordingWriter::default());
        let directory = directory(
            StubCategoriesRepo {
                records: vec![category(1, "Uncategorized", "uncategorized")],
                fail: false,
            },
            writer.clone(),
        );

        let err = directory
            .delete_category(&Actor::admin(1), 1)
            .await
            .expect_err("protected");
        assert!(matches!(err, CategoryError::Protected));
        assert!(writer.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_admins_cannot_delete() {
        let writer = Arc::new(RecordingWriter::default());
        let directory = directory(
            StubCategoriesRepo {
                records: vec![category(2, "Art", "art")],
                fail: false,
            },
            writer.clone(),
        );

        let err = directory
            .delete_category(&Actor::author(5), 2)
            .await
            .expect_err("forbidden");
        assert!(matches!(err, CategoryError::Forbidden));
        assert!(writer.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_moves_posts_to_default() {
        let writer = Arc::new(RecordingWriter::default());
        let directory = directory(
            StubCategoriesRepo {
                records: vec![
                    category(1, "Uncategorized", "uncategorized"),
                    category(2, "Art", "art"),
                ],
                fail: false,
            },
            writer.clone(),
        );

        let moved = directory
            .delete_category(&Actor::admin(1), 2)
            .await
            .expect("deleted");
        assert_eq!(moved, 2);
        assert_eq!(*writer.deleted.lock().unwrap(), vec![(2, 1)]);
    }

    #[tokio::test]
    async fn available_categories_degrade_to_empty() {
        let directory = directory(
            StubCategoriesRepo {
                records: vec![category(2, "Art", "art")],
                fail: true,
            },
            Arc::new(RecordingWriter::default()),
        );
        assert!(directory.available_categories().await.is_empty());
        assert!(directory.nav_categories().await.is_empty());
    }

    #[tokio::test]
    async fn resolve_passes_explicit_ids_through() {
        let directory = directory(
            StubCategoriesRepo {
                records: vec![category(1, "Uncategorized", "uncategorized")],
                fail: false,
            },
            Arc::new(RecordingWriter::default()),
        );
        assert_eq!(directory.resolve(Some(42)).await.unwrap(), 42);
        assert_eq!(directory.resolve(Some(0)).await.unwrap(), 1);
        assert_eq!(directory.resolve(None).await.unwrap(), 1);
    }
}
