//! `[markup]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[markup]` section in sitepipe.toml - template rendering.
///
/// # Example
/// ```toml
/// [markup]
/// pages = "src/views/pages"   # every template here becomes a page
/// basedir = "src/views"       # root for absolute includes
/// command = ["npx", "pug"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct MarkupConfig {
    #[serde(default = "defaults::markup::pages")]
    #[educe(Default = defaults::markup::pages())]
    pub pages: PathBuf,

    #[serde(default = "defaults::markup::basedir")]
    #[educe(Default = defaults::markup::basedir())]
    pub basedir: PathBuf,

    #[serde(default = "defaults::markup::command")]
    #[educe(Default = defaults::markup::command())]
    pub command: Vec<String>,

    /// Template file extension, without the dot.
    #[serde(default = "defaults::markup::extension")]
    #[educe(Default = defaults::markup::extension())]
    pub extension: String,

    /// Directory whose changes re-run this task (layouts and partials included).
    #[serde(default = "defaults::markup::watch")]
    #[educe(Default = defaults::markup::watch())]
    pub watch: PathBuf,
}
