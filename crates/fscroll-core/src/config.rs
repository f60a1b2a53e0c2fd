#![forbid(unsafe_code)]

//! Windowing configuration.
//!
//! [`ScrollConfig`] is fixed at startup. Every constructor validates the
//! page/window relationship, so holding a `ScrollConfig` means the invariants
//! below hold for the rest of the process.
//!
//! # Invariants
//!
//! 1. `items_per_page`, `max_live_items`, and `item_height` are positive.
//! 2. `max_live_items >= 2 * items_per_page`.
//! 3. `max_live_items % items_per_page == 0`.
//! 4. `max_live_items >= 3 * items_per_page`.
//!
//! # Sources
//!
//! | Source | Entry point | Keys |
//! |--------|-------------|------|
//! | Code | [`ScrollConfig::new`] | - |
//! | Environment | [`ScrollConfig::from_env`] | `FSCROLL_ITEMS_PER_PAGE`, `FSCROLL_MAX_LIVE_ITEMS`, `FSCROLL_ITEM_HEIGHT` |
//! | JSON | [`ScrollConfig::from_json_str`], [`ScrollConfig::from_file`] | `items_per_page`, `max_live_items`, `item_height` |
//!
//! Missing keys fall back to the defaults (10 items per page, 30 live items,
//! 200 units per item).

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Default number of items requested per page.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;
/// Default upper bound on simultaneously live items.
pub const DEFAULT_MAX_LIVE_ITEMS: usize = 30;
/// Default height of one item container, in provider units.
pub const DEFAULT_ITEM_HEIGHT: u32 = 200;

/// Environment variable overriding [`ScrollConfig::items_per_page`].
pub const ENV_ITEMS_PER_PAGE: &str = "FSCROLL_ITEMS_PER_PAGE";
/// Environment variable overriding [`ScrollConfig::max_live_items`].
pub const ENV_MAX_LIVE_ITEMS: &str = "FSCROLL_MAX_LIVE_ITEMS";
/// Environment variable overriding [`ScrollConfig::item_height`].
pub const ENV_ITEM_HEIGHT: &str = "FSCROLL_ITEM_HEIGHT";

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Fatal configuration error. Never recovered at runtime.
#[derive(Debug)]
pub enum ConfigError {
    /// `items_per_page` was zero.
    ZeroItemsPerPage,
    /// `max_live_items` was zero.
    ZeroMaxLiveItems,
    /// `item_height` was zero.
    ZeroItemHeight,
    /// The window cannot hold two pages.
    WindowTooSmall {
        max_live_items: usize,
        items_per_page: usize,
    },
    /// The window is not a whole number of pages.
    NotPageMultiple {
        max_live_items: usize,
        items_per_page: usize,
    },
    /// The window cannot hold a page on each side of the current one.
    NoRoomAroundPage {
        max_live_items: usize,
        items_per_page: usize,
    },
    /// A configuration value could not be parsed.
    InvalidValue { key: String, value: String },
    /// A configuration file could not be read.
    Io(std::io::Error),
    /// A configuration document was not valid JSON for this schema.
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroItemsPerPage => write!(f, "items_per_page must be positive"),
            Self::ZeroMaxLiveItems => write!(f, "max_live_items must be positive"),
            Self::ZeroItemHeight => write!(f, "item_height must be positive"),
            Self::WindowTooSmall {
                max_live_items,
                items_per_page,
            } => write!(
                f,
                "max_live_items ({max_live_items}) must be at least twice items_per_page ({items_per_page})"
            ),
            Self::NotPageMultiple {
                max_live_items,
                items_per_page,
            } => write!(
                f,
                "max_live_items ({max_live_items}) must be a multiple of items_per_page ({items_per_page})"
            ),
            Self::NoRoomAroundPage {
                max_live_items,
                items_per_page,
            } => write!(
                f,
                "max_live_items ({max_live_items}) must be at least three times items_per_page ({items_per_page})"
            ),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value for {key}: {value:?}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "invalid configuration document: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScrollConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Validated windowing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollConfig {
    items_per_page: usize,
    max_live_items: usize,
    item_height: u32,
    half_window: usize,
}

/// Unvalidated configuration document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDocument {
    items_per_page: Option<usize>,
    max_live_items: Option<usize>,
    item_height: Option<u32>,
}

impl ScrollConfig {
    /// Create a configuration with the default item height.
    pub fn new(items_per_page: usize, max_live_items: usize) -> Result<Self, ConfigError> {
        Self::with_item_height(items_per_page, max_live_items, DEFAULT_ITEM_HEIGHT)
    }

    /// Create a configuration with an explicit item height.
    pub fn with_item_height(
        items_per_page: usize,
        max_live_items: usize,
        item_height: u32,
    ) -> Result<Self, ConfigError> {
        if items_per_page == 0 {
            return Err(ConfigError::ZeroItemsPerPage);
        }
        if max_live_items == 0 {
            return Err(ConfigError::ZeroMaxLiveItems);
        }
        if item_height == 0 {
            return Err(ConfigError::ZeroItemHeight);
        }
        if max_live_items < items_per_page.saturating_mul(2) {
            return Err(ConfigError::WindowTooSmall {
                max_live_items,
                items_per_page,
            });
        }
        if max_live_items % items_per_page != 0 {
            return Err(ConfigError::NotPageMultiple {
                max_live_items,
                items_per_page,
            });
        }
        if max_live_items < items_per_page.saturating_mul(3) {
            return Err(ConfigError::NoRoomAroundPage {
                max_live_items,
                items_per_page,
            });
        }

        let half_window = (max_live_items / items_per_page / 2) * items_per_page;
        Ok(Self {
            items_per_page,
            max_live_items,
            item_height,
            half_window,
        })
    }

    /// Load overrides from `FSCROLL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (environment-shaped).
    ///
    /// Split out from [`from_env`](Self::from_env) so callers and tests can
    /// supply values without touching process state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let items_per_page = parse_or(&lookup, ENV_ITEMS_PER_PAGE, DEFAULT_ITEMS_PER_PAGE)?;
        let max_live_items = parse_or(&lookup, ENV_MAX_LIVE_ITEMS, DEFAULT_MAX_LIVE_ITEMS)?;
        let item_height = parse_or(&lookup, ENV_ITEM_HEIGHT, DEFAULT_ITEM_HEIGHT)?;
        let config = Self::with_item_height(items_per_page, max_live_items, item_height)?;
        tracing::debug!(
            items_per_page,
            max_live_items,
            item_height,
            "configuration loaded from environment"
        );
        Ok(config)
    }

    /// Parse a JSON document. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let doc: ConfigDocument = serde_json::from_str(json)?;
        Self::with_item_height(
            doc.items_per_page.unwrap_or(DEFAULT_ITEMS_PER_PAGE),
            doc.max_live_items.unwrap_or(DEFAULT_MAX_LIVE_ITEMS),
            doc.item_height.unwrap_or(DEFAULT_ITEM_HEIGHT),
        )
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.display(), "configuration loaded from file");
        Ok(config)
    }

    /// Items per remote page.
    #[must_use]
    pub const fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// Maximum number of simultaneously live items.
    #[must_use]
    pub const fn max_live_items(&self) -> usize {
        self.max_live_items
    }

    /// Height of one item container.
    #[must_use]
    pub const fn item_height(&self) -> u32 {
        self.item_height
    }

    /// Items kept live before the start of the target page in a seek window.
    ///
    /// `floor(max_live_items / items_per_page / 2) * items_per_page`.
    #[must_use]
    pub const fn half_window(&self) -> usize {
        self.half_window
    }

    /// Height of one full page, in provider units.
    #[must_use]
    pub fn page_height(&self) -> f64 {
        self.items_per_page as f64 * f64::from(self.item_height)
    }

    /// First sequence index owned by `page`.
    #[must_use]
    pub const fn page_start(&self, page: usize) -> usize {
        page.saturating_mul(self.items_per_page)
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            max_live_items: DEFAULT_MAX_LIVE_ITEMS,
            item_height: DEFAULT_ITEM_HEIGHT,
            half_window: (DEFAULT_MAX_LIVE_ITEMS / DEFAULT_ITEMS_PER_PAGE / 2)
                * DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}
