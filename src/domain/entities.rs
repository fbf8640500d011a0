//! Domain entities mirrored from persistent storage.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::categories::is_default_slug;
use crate::domain::types::PostStatus;
use crate::util::timezone::localized_datetime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub status: PostStatus,
    pub category_id: i64,
    pub author_id: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    pub fn local_created_at(&self, tz: Tz) -> DateTime<Tz> {
        localized_datetime(self.created_at, tz)
    }

    pub fn local_updated_at(&self, tz: Tz) -> DateTime<Tz> {
        localized_datetime(self.updated_at, tz)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

impl CategoryRecord {
    pub fn is_default(&self) -> bool {
        is_default_slug(&self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

/// Category row annotated with how many posts reference it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryWithCounts {
    pub category: CategoryRecord,
    pub published_count: u64,
    pub total_count: u64,
}

/// One entry of the category picker shown in the post editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChoice {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub published_count: u64,
    pub draft_count: u64,
    pub category_count: u64,
}
