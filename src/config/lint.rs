//! `[lint]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[lint]` section in sitepipe.toml - static analysis of script sources.
///
/// # Example
/// ```toml
/// [lint]
/// command = ["npx", "eslint"]
/// extensions = ["js", "mjs"]
/// exclude = ["node_modules", "vendor"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct LintConfig {
    #[serde(default = "defaults::lint::command")]
    #[educe(Default = defaults::lint::command())]
    pub command: Vec<String>,

    /// Report formatter name passed to the linter.
    #[serde(default = "defaults::lint::format")]
    #[educe(Default = defaults::lint::format())]
    pub format: String,

    #[serde(default = "defaults::lint::extensions")]
    #[educe(Default = defaults::lint::extensions())]
    pub extensions: Vec<String>,

    /// Directory names skipped anywhere in the tree. The output directory is
    /// always skipped.
    #[serde(default = "defaults::lint::exclude")]
    #[educe(Default = defaults::lint::exclude())]
    pub exclude: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_lint_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.lint.command, vec!["eslint"]);
        assert_eq!(config.lint.format, "stylish");
        assert_eq!(config.lint.extensions, vec!["js"]);
        assert_eq!(config.lint.exclude, vec!["node_modules"]);
    }
}
