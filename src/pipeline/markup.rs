//! Template pages to HTML.
//!
//! Every template under `[markup] pages` becomes one HTML file, keeping its
//! directory: `pages/blog/post.pug` → `public/blog/post.html`. Templates
//! outside `pages` (layouts, partials) are only ever included.

use crate::{
    config::SiteConfig,
    exec,
    utils::{
        exec::SILENT_FILTER,
        fs::{collect_with_extension, has_extension},
        minify::{MinifyType, minify},
    },
};
use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Render every page. Returns the written HTML files.
pub fn render_pages(config: &SiteConfig) -> Result<Vec<PathBuf>> {
    let pages = collect_pages(config);
    if pages.is_empty() {
        return Ok(Vec::new());
    }
    SiteConfig::check_command_installed("[markup.command]", &config.markup.command)?;

    pages
        .par_iter()
        .map(|page| render_page(page, config))
        .collect()
}

/// Re-render after a change to `changed`.
///
/// Edits to pages re-render just those pages. Anything else under the
/// template tree may be included from any page, so everything is rendered.
pub fn rerender(changed: &[PathBuf], config: &SiteConfig) -> Result<Vec<PathBuf>> {
    if !changed.iter().all(|path| is_page(path, config)) {
        return render_pages(config);
    }
    SiteConfig::check_command_installed("[markup.command]", &config.markup.command)?;

    changed
        .par_iter()
        .filter(|page| page.is_file())
        .map(|page| render_page(page, config))
        .collect()
}

/// Render one page. Returns the HTML file written.
pub fn render_page(page: &Path, config: &SiteConfig) -> Result<PathBuf> {
    let html = html_output_path(page, config)?;
    let out_dir = html.parent().unwrap_or(&config.build.output);
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let pretty = if config.is_prod() { "" } else { "--pretty" };
    exec!(
        filter=&SILENT_FILTER;
        config.get_root();
        &config.markup.command;
        "--basedir", &config.markup.basedir,
        "--out", out_dir,
        pretty,
        "--silent",
        page,
    )?;

    if config.is_prod() {
        let content =
            fs::read(&html).with_context(|| format!("Missing render output {}", html.display()))?;
        let minified = minify(MinifyType::Html(&content), config);
        fs::write(&html, &*minified)?;
    }

    Ok(html)
}

/// Whether `path` is a page template (renders to its own HTML file).
pub fn is_page(path: &Path, config: &SiteConfig) -> bool {
    path.starts_with(&config.markup.pages) && has_extension(path, &config.markup.extension)
}

/// `pages/a/b.pug` → `<output>/a/b.html`
pub fn html_output_path(page: &Path, config: &SiteConfig) -> Result<PathBuf> {
    let Ok(relative) = page.strip_prefix(&config.markup.pages) else {
        bail!(
            "{} is not inside {}",
            page.display(),
            config.markup.pages.display()
        );
    };
    Ok(config.build.output.join(relative).with_extension("html"))
}

fn collect_pages(config: &SiteConfig) -> Vec<PathBuf> {
    collect_with_extension(&config.markup.pages, &config.markup.extension)
}
