//! Category form rules and the protected default category.

use serde::Deserialize;

use crate::domain::slug::{MAX_SLUG_LEN, is_valid_slug, normalize_slug};
use crate::domain::validation::{
    FieldErrors, char_len, check_max_len, check_required, optional_text,
};

pub const DEFAULT_CATEGORY_NAME: &str = "Uncategorized";
pub const DEFAULT_CATEGORY_SLUG: &str = "uncategorized";
pub const DEFAULT_CATEGORY_DESCRIPTION: &str =
    "Default category for posts without a specific category.";

pub const MAX_CATEGORY_NAME_LEN: usize = 50;
pub const MAX_CATEGORY_DESCRIPTION_LEN: usize = 200;

/// Placeholder entry at the top of the category picker.
pub const CHOICE_PLACEHOLDER_LABEL: &str = "Select Category";

pub fn is_default_slug(slug: &str) -> bool {
    slug == DEFAULT_CATEGORY_SLUG
}

/// The default category's name is reserved so its lazy insert cannot collide.
pub fn is_default_name(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(DEFAULT_CATEGORY_NAME)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    /// Blank means "derive from the name".
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl CategoryForm {
    pub fn validate(self) -> Result<ValidatedCategory, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim().to_string();
        if check_required(&mut errors, "name", &name) {
            check_max_len(&mut errors, "name", &name, MAX_CATEGORY_NAME_LEN);
        }

        let slug = normalize_slug(&self.slug);
        let slug = if slug.is_empty() {
            None
        } else {
            if char_len(&slug) > MAX_SLUG_LEN {
                errors.push("slug", format!("must be at most {MAX_SLUG_LEN} characters"));
            } else if !is_valid_slug(&slug) {
                errors.push(
                    "slug",
                    "may only contain lowercase letters, digits and hyphens",
                );
            }
            Some(slug)
        };

        let description = optional_text(self.description);
        if let Some(description) = description.as_deref() {
            check_max_len(
                &mut errors,
                "description",
                description,
                MAX_CATEGORY_DESCRIPTION_LEN,
            );
        }

        errors.into_result(ValidatedCategory {
            name,
            slug,
            description,
        })
    }
}
