//! `[build]` section configuration.
//!
//! Project root, build mode and the output directory shared by every task.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// Build mode.
///
/// Development output is readable and carries source maps; production output
/// is compressed, prefixed and minified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Dev,
    Prod,
}

impl Mode {
    pub const fn is_prod(self) -> bool {
        matches!(self, Self::Prod)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `[build]` section in sitepipe.toml.
///
/// # Example
/// ```toml
/// [build]
/// mode = "prod"
/// output = "dist"
/// clean = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root", skip_serializing_if = "Option::is_none")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub mode: Mode,

    /// Directory every artifact is written to and the dev server serves.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Remove the output directory before building.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use super::*;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.mode, Mode::Dev);
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert!(!config.build.clean);
        assert!(config.build.root.is_none());
    }

    #[test]
    fn test_build_config_prod() {
        let config: SiteConfig = toml::from_str(
            r#"
            [build]
            mode = "prod"
            output = "dist"
            clean = true
        "#,
        )
        .unwrap();

        assert!(config.build.mode.is_prod());
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert!(config.build.clean);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str(
            r#"
            [build]
            mode = "staging"
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Dev.to_string(), "dev");
        assert_eq!(Mode::Prod.to_string(), "prod");
    }
}
