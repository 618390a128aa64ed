//! `[styles]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[styles]` section in sitepipe.toml - stylesheet compilation.
///
/// # Example
/// ```toml
/// [styles]
/// entry = "src/scss/styles.scss"
/// output = "css"                 # relative to [build.output]
/// command = ["npx", "sass"]
/// load_paths = ["node_modules", "vendor/scss"]
///
/// [styles.postcss]
/// plugins = ["autoprefixer", "cssnano"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct StylesConfig {
    /// Entry stylesheet; its stem names the compiled file.
    #[serde(default = "defaults::styles::entry")]
    #[educe(Default = defaults::styles::entry())]
    pub entry: PathBuf,

    /// Output subdirectory under `[build.output]`.
    #[serde(default = "defaults::styles::output")]
    #[educe(Default = defaults::styles::output())]
    pub output: PathBuf,

    /// Stylesheet compiler command.
    #[serde(default = "defaults::styles::command")]
    #[educe(Default = defaults::styles::command())]
    pub command: Vec<String>,

    /// Extra import search paths.
    #[serde(default = "defaults::styles::load_paths")]
    #[educe(Default = defaults::styles::load_paths())]
    pub load_paths: Vec<PathBuf>,

    /// Directory whose changes re-run this task.
    #[serde(default = "defaults::styles::watch")]
    #[educe(Default = defaults::styles::watch())]
    pub watch: PathBuf,

    /// Production post-processing.
    #[serde(default)]
    pub postcss: PostcssConfig,
}

/// `[styles.postcss]` - vendor prefixing and minification, production only.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct PostcssConfig {
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    #[serde(default = "defaults::styles::postcss::command")]
    #[educe(Default = defaults::styles::postcss::command())]
    pub command: Vec<String>,

    #[serde(default = "defaults::styles::postcss::plugins")]
    #[educe(Default = defaults::styles::postcss::plugins())]
    pub plugins: Vec<String>,

    /// Browserslist query handed to the plugins.
    #[serde(default = "defaults::styles::postcss::browsers")]
    #[educe(Default = defaults::styles::postcss::browsers())]
    pub browsers: String,
}
