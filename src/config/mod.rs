//! Configuration layer: typed settings with layered precedence (files → environment).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::Path,
    str::FromStr,
    time::Duration,
};

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::util::timezone::parse_timezone;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quire";
const ENV_PREFIX: &str = "QUIRE";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_CAPACITY: u64 = 256;
const DEFAULT_STATS_TTL_SECS: u64 = 300;
const DEFAULT_CATEGORY_TTL_SECS: u64 = 300;
const DEFAULT_AVAILABLE_CATEGORIES_TTL_SECS: u64 = 600;
const MAX_TTL_SECS: u64 = 86_400;
pub(crate) const DEFAULT_STATIC_IMAGE_PREFIX: &str = "/static/images/";
pub(crate) const DEFAULT_TRUSTED_IMAGE_ORIGIN: &str = "https://jake.tw";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_POSTS_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 50;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub sanitizer: SanitizerSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub capacity: NonZeroUsize,
    pub stats_ttl: Duration,
    pub category_ttl: Duration,
    pub available_categories_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct SanitizerSettings {
    pub static_image_prefix: String,
    pub trusted_image_origins: Vec<String>,
    pub allow_data_images: bool,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub timezone: Tz,
    pub posts_per_page: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings: `config/default.toml`, then `quire.toml`, then `config_file`, then
/// `QUIRE__SECTION__KEY` environment variables. Later sources win.
pub fn load(config_file: Option<&Path>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("sanitizer.trusted_image_origins")
            .try_parsing(true),
    );

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Settings::from_raw(raw)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            database: DatabaseSettings {
                url: None,
                max_connections: NonZeroU32::new(DEFAULT_DB_MAX_CONNECTIONS)
                    .unwrap_or(NonZeroU32::MIN),
            },
            cache: CacheSettings {
                capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY as usize)
                    .unwrap_or(NonZeroUsize::MIN),
                stats_ttl: Duration::from_secs(DEFAULT_STATS_TTL_SECS),
                category_ttl: Duration::from_secs(DEFAULT_CATEGORY_TTL_SECS),
                available_categories_ttl: Duration::from_secs(
                    DEFAULT_AVAILABLE_CATEGORIES_TTL_SECS,
                ),
            },
            sanitizer: SanitizerSettings {
                static_image_prefix: DEFAULT_STATIC_IMAGE_PREFIX.to_string(),
                trusted_image_origins: vec![DEFAULT_TRUSTED_IMAGE_ORIGIN.to_string()],
                allow_data_images: true,
            },
            site: SiteSettings {
                timezone: chrono_tz::UTC,
                posts_per_page: NonZeroU32::new(DEFAULT_POSTS_PER_PAGE)
                    .unwrap_or(NonZeroU32::MIN),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    sanitizer: RawSanitizerSettings,
    site: RawSiteSettings,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
            sanitizer,
            site,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            sanitizer: build_sanitizer_settings(sanitizer)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.trim()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS.into()),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity_value = cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
    let capacity = usize::try_from(capacity_value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| LoadError::invalid("cache.capacity", "must be greater than zero"))?;

    Ok(CacheSettings {
        capacity,
        stats_ttl: ttl(
            cache.stats_ttl_seconds.unwrap_or(DEFAULT_STATS_TTL_SECS),
            "cache.stats_ttl_seconds",
        )?,
        category_ttl: ttl(
            cache
                .category_ttl_seconds
                .unwrap_or(DEFAULT_CATEGORY_TTL_SECS),
            "cache.category_ttl_seconds",
        )?,
        available_categories_ttl: ttl(
            cache
                .available_categories_ttl_seconds
                .unwrap_or(DEFAULT_AVAILABLE_CATEGORIES_TTL_SECS),
            "cache.available_categories_ttl_seconds",
        )?,
    })
}

fn build_sanitizer_settings(
    sanitizer: RawSanitizerSettings,
) -> Result<SanitizerSettings, LoadError> {
    let static_image_prefix = sanitizer
        .static_image_prefix
        .map(|prefix| prefix.trim().to_string())
        .unwrap_or_else(|| DEFAULT_STATIC_IMAGE_PREFIX.to_string());
    if !static_image_prefix.starts_with('/') || !static_image_prefix.ends_with('/') {
        return Err(LoadError::invalid(
            "sanitizer.static_image_prefix",
            "must be an absolute path ending with `/`",
        ));
    }

    let origins = sanitizer
        .trusted_image_origins
        .unwrap_or_else(|| vec![DEFAULT_TRUSTED_IMAGE_ORIGIN.to_string()]);
    let mut trusted_image_origins = Vec::with_capacity(origins.len());
    for origin in origins {
        let origin = origin.trim().trim_end_matches('/').to_string();
        if origin.is_empty() {
            continue;
        }
        match Url::parse(&origin) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
                trusted_image_origins.push(origin);
            }
            _ => {
                return Err(LoadError::invalid(
                    "sanitizer.trusted_image_origins",
                    format!("`{origin}` is not an http(s) origin"),
                ));
            }
        }
    }

    Ok(SanitizerSettings {
        static_image_prefix,
        trusted_image_origins,
        allow_data_images: sanitizer.allow_data_images.unwrap_or(true),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let timezone_name = site
        .timezone
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone = parse_timezone(&timezone_name).ok_or_else(|| {
        LoadError::invalid(
            "site.timezone",
            format!("unknown timezone `{timezone_name}`"),
        )
    })?;

    let posts_per_page = non_zero_u32(
        site.posts_per_page.unwrap_or(DEFAULT_POSTS_PER_PAGE.into()),
        "site.posts_per_page",
    )?;
    if posts_per_page.get() > MAX_PER_PAGE {
        return Err(LoadError::invalid(
            "site.posts_per_page",
            format!("must not exceed {MAX_PER_PAGE}"),
        ));
    }

    Ok(SiteSettings {
        timezone,
        posts_per_page,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    capacity: Option<u64>,
    stats_ttl_seconds: Option<u64>,
    category_ttl_seconds: Option<u64>,
    available_categories_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSanitizerSettings {
    static_image_prefix: Option<String>,
    trusted_image_origins: Option<Vec<String>>,
    allow_data_images: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    timezone: Option<String>,
    posts_per_page: Option<u64>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn ttl(seconds: u64, key: &'static str) -> Result<Duration, LoadError> {
    if seconds == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    if seconds > MAX_TTL_SECS {
        return Err(LoadError::invalid(key, "must not exceed one day (86400 seconds)"));
    }
    Ok(Duration::from_secs(seconds))
}
