//! Script linting.
//!
//! Runs the linter over every script source in the project. Lint problems
//! are a report, not an error: the caller decides whether they fail a run.

use crate::{
    config::SiteConfig,
    log,
    utils::{
        exec::{exec_unchecked, strip_ansi},
        fs::has_extension,
    },
};
use anyhow::{Result, bail};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

/// Outcome of one lint run.
#[derive(Debug, Default)]
pub struct LintReport {
    /// Number of files linted.
    pub files: usize,
    pub clean: bool,
    /// Formatted diagnostics, empty when clean.
    pub report: String,
}

impl LintReport {
    pub fn log(&self) {
        if self.clean {
            log!("lint"; "{} files clean", self.files);
        } else {
            log!("lint"; "{}", self.report);
        }
    }
}

/// Lint all script sources.
pub fn lint_sources(config: &SiteConfig) -> Result<LintReport> {
    let sources = collect_sources(config);
    if sources.is_empty() {
        return Ok(LintReport {
            clean: true,
            ..Default::default()
        });
    }
    SiteConfig::check_command_installed("[lint.command]", &config.lint.command)?;

    let mut args: Vec<OsString> = vec!["--format".into(), config.lint.format.clone().into()];
    args.extend(sources.iter().map(OsString::from));

    let output = exec_unchecked(Some(config.get_root()), &config.lint.command, &args)?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report = strip_ansi(stdout.trim()).into_owned();

    // 0: clean, 1: lint problems, anything else: the linter itself failed
    match output.status.code() {
        Some(0) => Ok(LintReport {
            files: sources.len(),
            clean: true,
            report,
        }),
        Some(1) => Ok(LintReport {
            files: sources.len(),
            clean: false,
            report,
        }),
        _ => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Linter failed with {}\n{}",
                output.status,
                strip_ansi(stderr.trim())
            )
        }
    }
}

/// Script files under the project root.
///
/// Skips hidden directories, the output directory and `[lint] exclude`.
pub fn collect_sources(config: &SiteConfig) -> Vec<PathBuf> {
    let root = config.get_root();
    let output = config.build.output.as_path();

    let mut sources: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(e, output, &config.lint.exclude))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            config
                .lint
                .extensions
                .iter()
                .any(|ext| has_extension(e.path(), ext))
        })
        .map(DirEntry::into_path)
        .collect();
    sources.sort();
    sources
}

fn is_excluded(entry: &DirEntry, output: &Path, exclude: &[String]) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || exclude.iter().any(|e| *e == name) || entry.path() == output
}
