use tracing::{error, info, warn};

use crate::application::actor::{Actor, check_permission};
use crate::application::repos::{CreatePostParams, RepoError, UpdatePostParams};
use crate::application::sanitize::SanitizedHtml;
use crate::cache::WriteEvent;
use crate::domain::entities::PostRecord;
use crate::domain::posts::{PostForm, ValidatedPost};
use crate::domain::types::PublishAction;
use crate::domain::validation::FieldErrors;

use super::service::PostPublisher;
use super::types::{INVALID_CATEGORY_MESSAGE, PublishError, PublishOutcome};

const UNPUBLISH_MESSAGE: &str =
    "Published posts cannot be saved as drafts; use Update to keep them published.";

impl PostPublisher {
    /// Create a post when `post_id` is `None`, otherwise update it.
    pub async fn submit(
        &self,
        actor: &Actor,
        post_id: Option<i64>,
        form: PostForm,
        action: PublishAction,
    ) -> Result<PublishOutcome, PublishError> {
        match post_id {
            None => self.create_post(actor, form, action).await,
            Some(id) => self.update_post(actor, id, form, action).await,
        }
    }

    pub async fn create_post(
        &self,
        actor: &Actor,
        form: PostForm,
        action: PublishAction,
    ) -> Result<PublishOutcome, PublishError> {
        let validated = form.validate().map_err(PublishError::Validation)?;
        let category_id = self.resolve_category(validated.category_id).await?;
        let content = self.sanitize(&validated, None);
        let status = action.initial_status();

        self.ensure_slug_free(&validated.slug, None).await?;

        let params = CreatePostParams {
            title: validated.title,
            slug: validated.slug,
            content,
            description: validated.description,
            thumbnail: validated.thumbnail,
            status,
            category_id,
            author_id: actor.user_id,
        };
        let slug = params.slug.clone();

        let post = self
            .writer
            .create_post(params)
            .await
            .map_err(|err| persistence_failure(err, &slug, "create"))?;

        info!(
            post_id = post.id,
            slug = %post.slug,
            status = post.status.as_str(),
            author = actor.user_id,
            "post created"
        );
        self.cache
            .record(WriteEvent::PostCreated { post_id: post.id })
            .await;

        Ok(outcome(&post))
    }

    pub async fn update_post(
        &self,
        actor: &Actor,
        id: i64,
        form: PostForm,
        action: PublishAction,
    ) -> Result<PublishOutcome, PublishError> {
        let existing = self.authorized_post(actor, id).await?;

        let validated = form.validate().map_err(PublishError::Validation)?;
        let status = action.next_status(existing.status).map_err(|_| {
            PublishError::Validation(FieldErrors::single("status", UNPUBLISH_MESSAGE))
        })?;
        let category_id = self.resolve_category(validated.category_id).await?;
        let content = self.sanitize(&validated, Some(id));

        self.ensure_slug_free(&validated.slug, Some(id)).await?;

        let params = UpdatePostParams {
            id,
            title: validated.title,
            slug: validated.slug,
            content,
            description: validated.description,
            thumbnail: validated.thumbnail,
            status,
            category_id,
        };
        let slug = params.slug.clone();

        let post = self
            .writer
            .update_post(params)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PublishError::NotFound,
                other => persistence_failure(other, &slug, "update"),
            })?;

        info!(
            post_id = post.id,
            slug = %post.slug,
            from = existing.status.as_str(),
            to = post.status.as_str(),
            action = action.as_str(),
            actor = actor.user_id,
            "post updated"
        );
        self.cache
            .record(WriteEvent::PostUpdated { post_id: post.id })
            .await;

        Ok(outcome(&post))
    }

    pub async fn delete_post(&self, actor: &Actor, id: i64) -> Result<(), PublishError> {
        let post = self.authorized_post(actor, id).await?;

        self.writer.delete_post(id).await.map_err(|err| match err {
            RepoError::NotFound => PublishError::NotFound,
            other => {
                error!(post_id = id, error = %other, "post deletion failed");
                PublishError::Repo(other)
            }
        })?;

        info!(
            post_id = id,
            slug = %post.slug,
            actor = actor.user_id,
            admin = actor.is_admin,
            "post deleted"
        );
        self.cache.record(WriteEvent::PostDeleted { post_id: id }).await;
        Ok(())
    }

    /// Fetch a post the actor may modify.
    pub(crate) async fn authorized_post(
        &self,
        actor: &Actor,
        id: i64,
    ) -> Result<PostRecord, PublishError> {
        let post = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(PublishError::NotFound)?;

        if !check_permission(&post, actor) {
            warn!(
                post_id = id,
                actor = actor.user_id,
                author = post.author_id,
                "post access denied"
            );
            return Err(PublishError::Forbidden);
        }
        Ok(post)
    }

    async fn resolve_category(&self, requested: Option<i64>) -> Result<i64, PublishError> {
        if let Some(id) = requested.filter(|id| *id > 0) {
            if self.categories.find_by_id(id).await?.is_none() {
                return Err(PublishError::Validation(FieldErrors::single(
                    "category_id",
                    INVALID_CATEGORY_MESSAGE,
                )));
            }
        }
        Ok(self.categories.resolve(requested).await?)
    }

    fn sanitize(&self, post: &ValidatedPost, post_id: Option<i64>) -> SanitizedHtml {
        let content = self
            .sanitizer
            .clean_with_context(&post.raw_content, "post");
        if content.is_empty() && !post.raw_content.is_empty() {
            warn!(
                post_id,
                slug = %post.slug,
                input_len = post.raw_content.len(),
                "post content was empty after sanitization"
            );
        }
        content
    }

    async fn ensure_slug_free(&self, slug: &str, own_id: Option<i64>) -> Result<(), PublishError> {
        match self.reader.find_by_slug(slug).await? {
            Some(other) if Some(other.id) != own_id => Err(PublishError::DuplicateSlug {
                slug: slug.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn persistence_failure(err: RepoError, slug: &str, operation: &'static str) -> PublishError {
    if err.is_duplicate_on("slug") {
        return PublishError::DuplicateSlug {
            slug: slug.to_string(),
        };
    }
    error!(operation, slug, error = %err, "failed to persist post");
    PublishError::Repo(err)
}

fn outcome(post: &PostRecord) -> PublishOutcome {
    PublishOutcome {
        post_id: post.id,
        slug: post.slug.clone(),
        status: post.status,
    }
}
