//! File category classification for watch mode.
//!
//! Maps a changed path to the task that owns it.
//!
//! | Category | Watched path         | Re-runs   | Browser        |
//! |----------|----------------------|-----------|----------------|
//! | Scripts  | `src/js/`            | scripts   | full reload    |
//! | Styles   | `src/scss/`          | styles    | CSS injection  |
//! | Markup   | `src/views/`         | markup    | full reload    |
//! | Images   | `src/img/`           | images    | -              |
//! | Config   | `sitepipe.toml`      | all       | full reload    |
//! | Unknown  | anything else        | -         | -              |

use crate::{config::SiteConfig, pipeline::Task};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Scripts,
    Styles,
    Markup,
    Images,
    Config,
    Unknown,
}

/// Categories the watcher registers, in registration order.
pub const WATCH_CATEGORIES: &[FileCategory] = &[
    FileCategory::Scripts,
    FileCategory::Styles,
    FileCategory::Markup,
    FileCategory::Images,
    FileCategory::Config,
];

impl FileCategory {
    /// Get the short name for this category (used in logs)
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scripts => "scripts",
            Self::Styles => "styles",
            Self::Markup => "markup",
            Self::Images => "images",
            Self::Config => "config",
            Self::Unknown => "unknown",
        }
    }

    /// Task re-run when a file of this category changes.
    pub const fn task(self) -> Option<Task> {
        match self {
            Self::Scripts => Some(Task::Scripts),
            Self::Styles => Some(Task::Styles),
            Self::Markup => Some(Task::Markup),
            Self::Images => Some(Task::Images),
            Self::Config | Self::Unknown => None,
        }
    }

    /// Watched path for this category.
    pub fn path(self, config: &SiteConfig) -> Option<PathBuf> {
        match self {
            Self::Scripts => Some(config.scripts.watch.clone()),
            Self::Styles => Some(config.styles.watch.clone()),
            Self::Markup => Some(config.markup.watch.clone()),
            Self::Images => Some(config.images.source.clone()),
            Self::Config => Some(config.config_path.clone()),
            Self::Unknown => None,
        }
    }

    /// Returns true if this category represents a directory (vs a single file)
    pub const fn is_directory(self) -> bool {
        !matches!(self, Self::Config | Self::Unknown)
    }
}

/// Categorize a changed path.
///
/// When watched directories nest, the deepest one wins.
pub fn categorize_path(path: &Path, config: &SiteConfig) -> FileCategory {
    if path == config.config_path {
        return FileCategory::Config;
    }

    WATCH_CATEGORIES
        .iter()
        .filter(|cat| cat.is_directory())
        .filter_map(|&cat| cat.path(config).map(|dir| (cat, dir)))
        .filter(|(_, dir)| path.starts_with(dir))
        .max_by_key(|(_, dir)| dir.components().count())
        .map_or(FileCategory::Unknown, |(cat, _)| cat)
}
