//! `[scripts]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[scripts]` section in sitepipe.toml - bundling and minification.
///
/// # Example
/// ```toml
/// [scripts]
/// entry = "src/js/index.js"
/// bundle = "scripts.js"
/// target = "es2017"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ScriptsConfig {
    /// Entry module the bundle starts from.
    #[serde(default = "defaults::scripts::entry")]
    #[educe(Default = defaults::scripts::entry())]
    pub entry: PathBuf,

    /// Bundle file name; artifact names derive from its stem.
    #[serde(default = "defaults::scripts::bundle")]
    #[educe(Default = defaults::scripts::bundle())]
    pub bundle: String,

    /// Output subdirectory under `[build.output]`.
    #[serde(default = "defaults::scripts::output")]
    #[educe(Default = defaults::scripts::output())]
    pub output: PathBuf,

    /// Bundler command.
    #[serde(default = "defaults::scripts::command")]
    #[educe(Default = defaults::scripts::command())]
    pub command: Vec<String>,

    /// Language level the bundle is down-leveled to.
    #[serde(default = "defaults::scripts::target")]
    #[educe(Default = defaults::scripts::target())]
    pub target: String,

    /// Directory whose changes re-run this task.
    #[serde(default = "defaults::scripts::watch")]
    #[educe(Default = defaults::scripts::watch())]
    pub watch: PathBuf,
}
