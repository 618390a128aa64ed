//! `[images]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[images]` section in sitepipe.toml - image optimization.
///
/// Optimizer commands that are not installed are skipped and the image is
/// copied unchanged.
///
/// # Example
/// ```toml
/// [images]
/// source = "src/img"
/// output = "assets/img"
/// optimization_level = 3
/// svg = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ImagesConfig {
    /// Raw image directory; doubles as the watch directory.
    #[serde(default = "defaults::images::source")]
    #[educe(Default = defaults::images::source())]
    pub source: PathBuf,

    /// Output subdirectory under `[build.output]`.
    #[serde(default = "defaults::images::output")]
    #[educe(Default = defaults::images::output())]
    pub output: PathBuf,

    #[serde(default = "defaults::images::gifsicle")]
    #[educe(Default = defaults::images::gifsicle())]
    pub gifsicle: Vec<String>,

    #[serde(default = "defaults::images::jpegtran")]
    #[educe(Default = defaults::images::jpegtran())]
    pub jpegtran: Vec<String>,

    #[serde(default = "defaults::images::optipng")]
    #[educe(Default = defaults::images::optipng())]
    pub optipng: Vec<String>,

    /// PNG optimization level (0-7).
    #[serde(default = "defaults::images::optimization_level")]
    #[educe(Default = defaults::images::optimization_level())]
    pub optimization_level: u8,

    /// Interlace GIFs.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub interlaced: bool,

    /// Progressive JPEGs.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub progressive: bool,

    /// Rewrite SVGs through usvg; when false they are copied.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub svg: bool,
}
