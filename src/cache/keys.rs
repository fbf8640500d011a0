//! Named cache entries derived from post and category data.

use std::fmt;
use std::time::Duration;

use super::config::CacheConfig;

/// Every derived view the cache holds. Each one is rebuilt from storage on miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheKey {
    /// Names of categories with at least one published post (public blog sidebar).
    AvailableCategories,
    /// Category picker entries for the post editor.
    CategoryChoices,
    /// Categories shown in the site navigation.
    NavCategories,
    /// Published/draft/category counters for the admin dashboard.
    DashboardStats,
}

impl CacheKey {
    pub const ALL: [CacheKey; 4] = [
        CacheKey::AvailableCategories,
        CacheKey::CategoryChoices,
        CacheKey::NavCategories,
        CacheKey::DashboardStats,
    ];

    /// Storage key used by the backing store.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::AvailableCategories => "blog_available_categories",
            CacheKey::CategoryChoices => "blog_category_choices",
            CacheKey::NavCategories => "nav_available_categories",
            CacheKey::DashboardStats => "blog_dashboard_stats",
        }
    }

    pub fn ttl(self, config: &CacheConfig) -> Duration {
        match self {
            CacheKey::AvailableCategories | CacheKey::NavCategories => {
                config.available_categories_ttl
            }
            CacheKey::CategoryChoices => config.category_ttl,
            CacheKey::DashboardStats => config.stats_ttl,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
