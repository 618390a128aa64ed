//! Stylesheet pipeline.
//!
//! ```text
//! src/scss/styles.scss ──sass──► public/css/styles.css (+ .map in dev)
//!                                      │
//!                          prod only:  └──postcss (autoprefixer, cssnano)──► in place
//! ```

use crate::{
    config::SiteConfig,
    utils::{
        exec::{self, EMPTY_FILTER},
        fs::ensure_parent,
    },
};
use anyhow::{Result, bail};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Compile the entry stylesheet. Returns the written files.
pub fn compile_styles(config: &SiteConfig) -> Result<Vec<PathBuf>> {
    let styles = &config.styles;
    if !styles.entry.is_file() {
        bail!("Stylesheet entry not found: {}", styles.entry.display());
    }
    SiteConfig::check_command_installed("[styles.command]", &styles.command)?;

    let output = css_output_path(config);
    ensure_parent(&output)?;

    exec::exec(
        Some(config.get_root()),
        &exec::internal::to_cmd_vec(&styles.command),
        &sass_args(config, &output),
        &[],
        &EMPTY_FILTER,
    )?;

    let mut artifacts = vec![output.clone()];
    if config.is_prod() {
        if styles.postcss.enable {
            postprocess(config, &output)?;
        }
    } else {
        artifacts.push(source_map_path(&output));
    }

    Ok(artifacts)
}

/// `<output>/<styles.output>/<entry stem>.css`
pub fn css_output_path(config: &SiteConfig) -> PathBuf {
    let stem = config.styles.entry.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push(".css");
    config.styles_dir().join(name)
}

fn source_map_path(css: &Path) -> PathBuf {
    let mut name = css.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}

fn sass_args(config: &SiteConfig, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = config
        .styles
        .load_paths
        .iter()
        .map(|p| {
            let mut arg = OsString::from("--load-path=");
            arg.push(p);
            arg
        })
        .collect();

    if config.is_prod() {
        args.push("--style=compressed".into());
        args.push("--no-source-map".into());
    } else {
        args.push("--style=expanded".into());
        args.push("--source-map".into());
    }

    args.push(config.styles.entry.clone().into());
    args.push(output.into());
    args
}

/// Vendor prefixing and minification, rewriting `css` in place.
fn postprocess(config: &SiteConfig, css: &Path) -> Result<()> {
    let postcss = &config.styles.postcss;
    SiteConfig::check_command_installed("[styles.postcss.command]", &postcss.command)?;

    exec::exec(
        Some(config.get_root()),
        &exec::internal::to_cmd_vec(&postcss.command),
        &postcss_args(config, css),
        &[(OsString::from("BROWSERSLIST"), OsString::from(&postcss.browsers))],
        &EMPTY_FILTER,
    )?;
    Ok(())
}

fn postcss_args(config: &SiteConfig, css: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![css.into(), "--replace".into(), "--no-map".into()];
    for plugin in &config.styles.postcss.plugins {
        args.push("--use".into());
        args.push(plugin.into());
    }
    args
}
