//! Image optimization.
//!
//! Each file under `[images] source` is optimized into the same relative
//! path under `<output>/<images.output>`. Formats map to optimizers:
//!
//! | format | optimizer | flags |
//! |--------|-----------|-------|
//! | gif    | gifsicle  | `--interlace` |
//! | jpeg   | jpegtran  | `-copy none -optimize -progressive` |
//! | png    | optipng   | `-o<level>` |
//! | svg    | usvg      | in-process rewrite |
//!
//! Anything else is copied. A missing optimizer degrades to a copy with a
//! single warning per tool.

use crate::{
    config::SiteConfig,
    exec, log,
    logger::ProgressBars,
    utils::{
        exec::{SILENT_FILTER, command_exists},
        fs::{collect_all_files, ensure_parent, is_up_to_date, rel_display},
    },
};
use anyhow::{Context, Result, bail};
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Tools already reported missing.
static WARNED: LazyLock<Mutex<FxHashSet<&'static str>>> =
    LazyLock::new(|| Mutex::new(FxHashSet::default()));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optimizer {
    Gifsicle,
    Jpegtran,
    Optipng,
    Svg,
    Copy,
}

impl Optimizer {
    const fn name(self) -> &'static str {
        match self {
            Self::Gifsicle => "gifsicle",
            Self::Jpegtran => "jpegtran",
            Self::Optipng => "optipng",
            Self::Svg => "svg",
            Self::Copy => "copy",
        }
    }

    fn command(self, config: &SiteConfig) -> Option<&[String]> {
        match self {
            Self::Gifsicle => Some(&config.images.gifsicle),
            Self::Jpegtran => Some(&config.images.jpegtran),
            Self::Optipng => Some(&config.images.optipng),
            Self::Svg | Self::Copy => None,
        }
    }
}

/// Pick the optimizer for `path` by extension.
pub fn optimizer_for(path: &Path, config: &SiteConfig) -> Optimizer {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match ext.as_str() {
        "gif" => Optimizer::Gifsicle,
        "jpg" | "jpeg" => Optimizer::Jpegtran,
        "png" => Optimizer::Optipng,
        "svg" if config.images.svg => Optimizer::Svg,
        _ => Optimizer::Copy,
    }
}

/// Optimize every source image. Returns the written files.
pub fn optimize_images(config: &SiteConfig) -> Result<Vec<PathBuf>> {
    let files = collect_all_files(&config.images.source);
    process(&files, config, config.build.clean)
}

/// Optimize only `paths` (changed files during watch).
///
/// Paths that no longer exist or lie outside the image source are skipped.
pub fn optimize_paths(paths: &[PathBuf], config: &SiteConfig) -> Result<Vec<PathBuf>> {
    let files: Vec<_> = paths
        .iter()
        .filter(|p| p.is_file() && p.starts_with(&config.images.source))
        .cloned()
        .collect();
    process(&files, config, true)
}

/// `<source>/a/b.png` → `<output>/<images.output>/a/b.png`
pub fn image_output_path(src: &Path, config: &SiteConfig) -> Result<PathBuf> {
    let Ok(relative) = src.strip_prefix(&config.images.source) else {
        bail!(
            "{} is not inside {}",
            src.display(),
            config.images.source.display()
        );
    };
    Ok(config.images_dir().join(relative))
}

fn process(files: &[PathBuf], config: &SiteConfig, force: bool) -> Result<Vec<PathBuf>> {
    let progress = ProgressBars::new_filtered(&[("images", files.len())]);

    let results: Vec<Result<Option<PathBuf>>> = files
        .par_iter()
        .map(|src| {
            let result = optimize_one(src, config, force);
            if let Some(progress) = &progress {
                progress.inc(0);
            }
            result
        })
        .collect();

    drop(progress);

    let mut written = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(Some(path)) => written.push(path),
            Ok(None) => {}
            Err(e) => errors.push(format!("{e:#}")),
        }
    }

    if !errors.is_empty() {
        bail!("{} images failed:\n{}", errors.len(), errors.join("\n"));
    }
    Ok(written)
}

/// Returns `None` when the output is already up to date.
fn optimize_one(src: &Path, config: &SiteConfig, force: bool) -> Result<Option<PathBuf>> {
    let dst = image_output_path(src, config)?;
    if !force && is_up_to_date(src, &dst) {
        return Ok(None);
    }
    ensure_parent(&dst)?;

    let optimizer = match optimizer_for(src, config) {
        tool @ (Optimizer::Gifsicle | Optimizer::Jpegtran | Optimizer::Optipng) => {
            let available = tool.command(config).is_some_and(command_exists);
            if available {
                tool
            } else {
                warn_missing(tool);
                Optimizer::Copy
            }
        }
        other => other,
    };

    let root = config.get_root();
    let images = &config.images;
    let level = format!("-o{}", images.optimization_level);

    match optimizer {
        Optimizer::Gifsicle => {
            let interlace = if images.interlaced { "--interlace" } else { "" };
            exec!(filter=&SILENT_FILTER; root; &images.gifsicle; interlace, "-o", &dst, src)?;
        }
        Optimizer::Jpegtran => {
            let progressive = if images.progressive { "-progressive" } else { "" };
            exec!(
                filter=&SILENT_FILTER;
                root;
                &images.jpegtran;
                "-copy", "none", "-optimize", progressive, "-outfile", &dst, src
            )?;
        }
        Optimizer::Optipng => {
            exec!(
                filter=&SILENT_FILTER;
                root;
                &images.optipng;
                "-quiet", "-clobber", &level, "-out", &dst, src
            )?;
        }
        Optimizer::Svg => {
            let content = fs::read(src)?;
            let optimized = optimize_svg(&content)
                .with_context(|| format!("Invalid SVG {}", rel_display(src, root)))?;
            fs::write(&dst, optimized)?;
        }
        Optimizer::Copy => {
            fs::copy(src, &dst)?;
        }
    }

    Ok(Some(dst))
}

/// Rewrite an SVG through usvg with no indentation.
pub fn optimize_svg(content: &[u8]) -> Result<Vec<u8>> {
    let tree = usvg::Tree::from_data(content, &usvg::Options::default())
        .context("Failed to parse SVG")?;

    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };

    Ok(tree.to_string(&write_options).into_bytes())
}

fn warn_missing(tool: Optimizer) {
    if WARNED.lock().insert(tool.name()) {
        log!("images"; "`{}` not found, copying unoptimized", tool.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
        <!-- comment -->
        <rect width="10" height="10" fill="red"/>
    </svg>"#;

    fn config(dir: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.build.root = Some(dir.to_path_buf());
        config.build.output = dir.join("public");
        config.images.source = dir.join("src/img");
        config.images.gifsicle = vec!["no-such-gifsicle-c41".into()];
        config.images.jpegtran = vec!["no-such-jpegtran-c41".into()];
        config.images.optipng = vec!["no-such-optipng-c41".into()];
        config
    }

    #[test]
    fn test_optimizer_for() {
        let config = SiteConfig::default();
        assert_eq!(optimizer_for(Path::new("a.gif"), &config), Optimizer::Gifsicle);
        assert_eq!(optimizer_for(Path::new("a.JPG"), &config), Optimizer::Jpegtran);
        assert_eq!(optimizer_for(Path::new("a.jpeg"), &config), Optimizer::Jpegtran);
        assert_eq!(optimizer_for(Path::new("a.png"), &config), Optimizer::Optipng);
        assert_eq!(optimizer_for(Path::new("a.svg"), &config), Optimizer::Svg);
        assert_eq!(optimizer_for(Path::new("a.webp"), &config), Optimizer::Copy);
        assert_eq!(optimizer_for(Path::new("noext"), &config), Optimizer::Copy);
    }

    #[test]
    fn test_svg_disabled_copies() {
        let mut config = SiteConfig::default();
        config.images.svg = false;
        assert_eq!(optimizer_for(Path::new("a.svg"), &config), Optimizer::Copy);
    }

    #[test]
    fn test_image_output_path() {
        let config = config(Path::new("/site"));
        assert_eq!(
            image_output_path(Path::new("/site/src/img/icons/a.png"), &config).unwrap(),
            PathBuf::from("/site/public/assets/img/icons/a.png")
        );
        assert!(image_output_path(Path::new("/elsewhere/a.png"), &config).is_err());
    }

    #[test]
    fn test_optimize_svg_strips_comments() {
        let out = String::from_utf8(optimize_svg(SVG.as_bytes()).unwrap()).unwrap();
        assert!(out.contains("<svg"));
        assert!(!out.contains("comment"));
        assert!(optimize_svg(b"not svg").is_err());
    }

    #[test]
    fn test_missing_tool_falls_back_to_copy() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(&config.images.source).unwrap();
        fs::write(config.images.source.join("photo.png"), b"fake png").unwrap();
        fs::write(config.images.source.join("data.webp"), b"webp").unwrap();

        let written = optimize_images(&config).unwrap();

        assert_eq!(written.len(), 2);
        let out = config.images_dir();
        assert_eq!(fs::read(out.join("photo.png")).unwrap(), b"fake png");
        assert_eq!(fs::read(out.join("data.webp")).unwrap(), b"webp");
    }

    #[test]
    fn test_up_to_date_outputs_skipped() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(config.images.source.join("icons")).unwrap();
        fs::write(config.images.source.join("icons/logo.svg"), SVG).unwrap();

        assert_eq!(optimize_images(&config).unwrap().len(), 1);
        assert!(optimize_images(&config).unwrap().is_empty());

        let mut clean = config.clone();
        clean.build.clean = true;
        assert_eq!(optimize_images(&clean).unwrap().len(), 1);
    }

    #[test]
    fn test_optimize_paths_filters() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(&config.images.source).unwrap();
        let kept = config.images.source.join("a.txt");
        fs::write(&kept, "a").unwrap();

        let written = optimize_paths(
            &[
                kept,
                config.images.source.join("deleted.png"),
                dir.path().join("outside.png"),
            ],
            &config,
        )
        .unwrap();

        assert_eq!(written, vec![config.images_dir().join("a.txt")]);
    }

    #[test]
    fn test_invalid_svg_reports_error() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(&config.images.source).unwrap();
        fs::write(config.images.source.join("broken.svg"), "<svg").unwrap();

        let err = optimize_images(&config).unwrap_err();
        assert!(err.to_string().contains("1 images failed"));
    }
}
