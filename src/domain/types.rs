//! Post lifecycle enumerations and the transitions between them.

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Lifecycle state of a post (mirrors Postgres enum `post_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "post_status", rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl TryFrom<&str> for PostStatus {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(DomainError::validation(format!(
                "invalid status `{other}`, expected `draft` or `published`"
            ))),
        }
    }
}

/// The editor button that triggered a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
    #[default]
    Save,
    Publish,
    Update,
}

impl PublishAction {
    /// Parse an action name; anything unrecognised falls back to [`PublishAction::Save`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "publish" => PublishAction::Publish,
            "update" => PublishAction::Update,
            _ => PublishAction::Save,
        }
    }

    /// Resolve the action from the submit buttons present in a form.
    ///
    /// `publish` wins over `save`, which wins over `update`.
    pub fn from_form_flags(publish: bool, save: bool, update: bool) -> Self {
        if publish {
            PublishAction::Publish
        } else if save {
            PublishAction::Save
        } else if update {
            PublishAction::Update
        } else {
            PublishAction::Save
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PublishAction::Save => "save",
            PublishAction::Publish => "publish",
            PublishAction::Update => "update",
        }
    }

    /// Status of a post created with this action.
    pub fn initial_status(self) -> PostStatus {
        match self {
            PublishAction::Publish => PostStatus::Published,
            PublishAction::Save | PublishAction::Update => PostStatus::Draft,
        }
    }

    /// Status of an existing post after this action is applied.
    ///
    /// Published posts never move back to draft.
    pub fn next_status(self, current: PostStatus) -> Result<PostStatus, DomainError> {
        match (self, current) {
            (PublishAction::Publish, _) => Ok(PostStatus::Published),
            (PublishAction::Update, status) => Ok(status),
            (PublishAction::Save, PostStatus::Draft) => Ok(PostStatus::Draft),
            (PublishAction::Save, PostStatus::Published) => Err(DomainError::InvalidTransition {
                from: current,
                action: self,
            }),
        }
    }
}
