//! Minification for rendered HTML and generated XML.
//!
//! Minification follows the build mode: production output is minified,
//! development output is passed through untouched.

use crate::config::SiteConfig;
use std::borrow::Cow;

/// Content type for minification.
pub enum MinifyType<'a> {
    Html(&'a [u8]),
    Xml(&'a [u8]),
}

/// Minify content based on type and build mode.
///
/// Returns `Cow::Borrowed` in development mode, `Cow::Owned` in production.
pub fn minify<'a>(content: MinifyType<'a>, config: &SiteConfig) -> Cow<'a, [u8]> {
    if !config.is_prod() {
        match content {
            MinifyType::Html(html) => Cow::Borrowed(html),
            MinifyType::Xml(xml) => Cow::Borrowed(xml),
        }
    } else {
        match content {
            MinifyType::Html(html) => Cow::Owned(minify_html_inner(html)),
            MinifyType::Xml(xml) => Cow::Owned(minify_xml_inner(xml)),
        }
    }
}

fn minify_html_inner(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    minify_html::minify(html, &cfg)
}

/// Minify XML by dropping indentation and blank lines.
fn minify_xml_inner(xml: &[u8]) -> Vec<u8> {
    String::from_utf8_lossy(xml)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<String>()
        .into_bytes()
}
