//! Write events and the cache entries each one makes stale.

use std::collections::BTreeSet;

use super::keys::CacheKey;

/// A successful mutation of posts or categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEvent {
    PostCreated { post_id: i64 },
    PostUpdated { post_id: i64 },
    PostDeleted { post_id: i64 },
    CategoryCreated { category_id: i64 },
    CategoryUpdated { category_id: i64 },
    CategoryDeleted { category_id: i64, reassigned: u64 },
}

impl WriteEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WriteEvent::PostCreated { .. } => "post_created",
            WriteEvent::PostUpdated { .. } => "post_updated",
            WriteEvent::PostDeleted { .. } => "post_deleted",
            WriteEvent::CategoryCreated { .. } => "category_created",
            WriteEvent::CategoryUpdated { .. } => "category_updated",
            WriteEvent::CategoryDeleted { .. } => "category_deleted",
        }
    }

    /// Cache entries that may no longer match storage after this write.
    ///
    /// A post write can change a category's published count, its status and
    /// the dashboard counters; a category write changes names, the picker and
    /// the category count. Both therefore touch every derived view.
    pub fn affected_keys(&self) -> BTreeSet<CacheKey> {
        match self {
            WriteEvent::PostCreated { .. }
            | WriteEvent::PostUpdated { .. }
            | WriteEvent::PostDeleted { .. } => BTreeSet::from([
                CacheKey::AvailableCategories,
                CacheKey::NavCategories,
                CacheKey::CategoryChoices,
                CacheKey::DashboardStats,
            ]),
            WriteEvent::CategoryCreated { .. }
            | WriteEvent::CategoryUpdated { .. }
            | WriteEvent::CategoryDeleted { .. } => CacheKey::ALL.into_iter().collect(),
        }
    }
}
