//! Post editor form and its validation rules.

use serde::Deserialize;

use crate::domain::slug::{MAX_SLUG_LEN, is_valid_slug, normalize_slug};
use crate::domain::validation::{
    FieldErrors, char_len, check_max_len, check_required, is_filename_safe, optional_text,
};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_THUMBNAIL_LEN: usize = 500;
pub const MAX_DESCRIPTION_LEN: usize = 160;
pub const MAX_CONTENT_LEN: usize = 100_000;

/// Raw post editor input as submitted by an author.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// `None` or `0` selects the default category.
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// A post form that passed validation. Content is still unsanitised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPost {
    pub title: String,
    pub slug: String,
    pub raw_content: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub category_id: Option<i64>,
}

impl PostForm {
    /// Check every field and report all failures at once.
    pub fn validate(self) -> Result<ValidatedPost, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim().to_string();
        if check_required(&mut errors, "title", &title) {
            check_max_len(&mut errors, "title", &title, MAX_TITLE_LEN);
        }

        let slug = normalize_slug(&self.slug);
        if check_required(&mut errors, "slug", &slug) {
            if char_len(&slug) > MAX_SLUG_LEN {
                errors.push("slug", format!("must be at most {MAX_SLUG_LEN} characters"));
            } else if !is_valid_slug(&slug) {
                errors.push(
                    "slug",
                    "may only contain lowercase letters, digits and hyphens",
                );
            }
        }

        let thumbnail = optional_text(self.thumbnail);
        if let Some(thumbnail) = thumbnail.as_deref() {
            if char_len(thumbnail) > MAX_THUMBNAIL_LEN {
                errors.push(
                    "thumbnail",
                    format!("must be at most {MAX_THUMBNAIL_LEN} characters"),
                );
            } else if !is_filename_safe(thumbnail) {
                errors.push(
                    "thumbnail",
                    "may only contain letters, digits, underscores, hyphens and dots",
                );
            }
        }

        let description = optional_text(self.description);
        if let Some(description) = description.as_deref() {
            check_max_len(&mut errors, "description", description, MAX_DESCRIPTION_LEN);
        }

        let raw_content = self.content.trim().to_string();
        if check_required(&mut errors, "content", &raw_content) {
            check_max_len(&mut errors, "content", &raw_content, MAX_CONTENT_LEN);
        }

        errors.into_result(ValidatedPost {
            title,
            slug,
            raw_content,
            description,
            thumbnail,
            category_id: self.category_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> PostForm {
        PostForm {
            title: "  Hello World ".into(),
            slug: " Hello-World ".into(),
            content: "<p>hi</p>".into(),
            description: Some("   ".into()),
            thumbnail: Some("cover.png".into()),
            category_id: None,
        }
    }

    #[test]
    fn valid_form_is_trimmed_and_lowercased() {
        let post = form().validate().expect("valid");
        assert_eq!(post.title, "Hello World");
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.description, None);
        assert_eq!(post.thumbnail.as_deref(), Some("cover.png"));
    }

    #[test]
    fn reports_every_failing_field() {
        let errors = PostForm {
            title: String::new(),
            slug: "not a slug!".into(),
            content: "  ".into(),
            description: Some("d".repeat(MAX_DESCRIPTION_LEN + 1)),
            thumbnail: Some("../secret.png".into()),
            category_id: None,
        }
        .validate()
        .expect_err("invalid");

        for field in ["title", "slug", "content", "description", "thumbnail"] {
            assert!(errors.has_field(field), "missing error for {field}");
        }
    }

    #[test]
    fn length_limits_are_inclusive() {
        let mut at_limit = form();
        at_limit.title = "t".repeat(MAX_TITLE_LEN);
        at_limit.slug = "s".repeat(MAX_SLUG_LEN);
        at_limit.content = "c".repeat(MAX_CONTENT_LEN);
        assert!(at_limit.validate().is_ok());

        let mut over = form();
        over.title = "t".repeat(MAX_TITLE_LEN + 1);
        over.slug = "s".repeat(MAX_SLUG_LEN + 1);
        over.content = "c".repeat(MAX_CONTENT_LEN + 1);
        let errors = over.validate().expect_err("too long");
        assert_eq!(errors.len(), 3);
    }
}
