//! `[sitemap]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[sitemap]` section in sitepipe.toml.
///
/// # Example
/// ```toml
/// [sitemap]
/// enable = true                       # also generate after `build`
/// site_url = "https://example.org"
/// changefreq = "weekly"
/// priority = 0.5
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SitemapConfig {
    /// Generate the sitemap as part of every build.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub enable: bool,

    /// Absolute site URL every `<loc>` is built from.
    #[serde(default = "defaults::sitemap::site_url")]
    #[educe(Default = defaults::sitemap::site_url())]
    pub site_url: String,

    /// Output path, relative to `[build.output]`.
    #[serde(default = "defaults::sitemap::path")]
    #[educe(Default = defaults::sitemap::path())]
    pub path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changefreq: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f32>,
}
