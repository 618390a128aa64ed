//! Task graph: the six pipelines and how they are scheduled.
//!
//! - **scripts**: entry module → bundle → down-level → minify → source maps
//! - **styles**: entry stylesheet → CSS → (prod) prefix + minify
//! - **markup**: template pages → HTML
//! - **images**: raw images → optimized images
//! - **lint**: script sources → diagnostic report
//! - **sitemap**: rendered HTML → `sitemap.xml`
//!
//! # Scheduling
//!
//! ```text
//! run_tasks([scripts, styles, markup, images, sitemap])
//!     │
//!     ├── scripts ─┐
//!     ├── styles  ─┤  rayon, independent outputs
//!     ├── markup  ─┤
//!     ├── images  ─┘
//!     │
//!     └── sitemap     after everything else (reads rendered HTML)
//! ```

pub mod images;
pub mod lint;
pub mod markup;
pub mod scripts;
pub mod sitemap;
pub mod styles;

use crate::{config::SiteConfig, log};
use anyhow::{Result, bail};
use rayon::prelude::*;
use std::{
    fmt,
    path::PathBuf,
    time::{Duration, Instant},
};

/// A unit of work in the task graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Task {
    Scripts,
    Styles,
    Markup,
    Images,
    Lint,
    Sitemap,
}

/// What an open browser should do after a task re-ran successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    /// Reload the whole page.
    Page,
    /// Swap stylesheets in place, keeping page state.
    Css,
    None,
}

impl Task {
    /// Tasks run by `build` and before `serve`.
    pub const DEFAULT: [Self; 4] = [Self::Scripts, Self::Styles, Self::Markup, Self::Images];

    pub fn default_set() -> Vec<Self> {
        Self::DEFAULT.to_vec()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Scripts => "scripts",
            Self::Styles => "styles",
            Self::Markup => "markup",
            Self::Images => "images",
            Self::Lint => "lint",
            Self::Sitemap => "sitemap",
        }
    }

    pub const fn reload(self) -> Reload {
        match self {
            Self::Scripts | Self::Markup => Reload::Page,
            Self::Styles => Reload::Css,
            Self::Images | Self::Lint | Self::Sitemap => Reload::None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one successful task run.
#[derive(Debug)]
pub struct TaskReport {
    pub task: Task,
    /// Files written (source maps included).
    pub artifacts: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Run a single task.
pub fn run_task(task: Task, config: &SiteConfig) -> Result<TaskReport> {
    let start = Instant::now();

    let artifacts = match task {
        Task::Scripts => scripts::bundle_scripts(config)?,
        Task::Styles => styles::compile_styles(config)?,
        Task::Markup => markup::render_pages(config)?,
        Task::Images => images::optimize_images(config)?,
        Task::Sitemap => vec![sitemap::build_sitemap(config)?],
        Task::Lint => {
            let report = lint::lint_sources(config)?;
            report.log();
            if !report.clean {
                bail!("lint found problems in {} files", report.files);
            }
            Vec::new()
        }
    };

    Ok(TaskReport {
        task,
        artifacts,
        elapsed: start.elapsed(),
    })
}

/// Run tasks concurrently; sitemap runs last.
///
/// Every task runs even if a sibling fails. Each failure is logged with the
/// underlying tool's output and the call fails if any task did.
pub fn run_tasks(tasks: &[Task], config: &SiteConfig) -> Result<Vec<TaskReport>> {
    let (parallel, after) = schedule(tasks);

    let mut results: Vec<_> = parallel
        .par_iter()
        .map(|&task| (task, run_task(task, config)))
        .collect();
    results.extend(after.into_iter().map(|task| (task, run_task(task, config))));

    let mut reports = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (task, result) in results {
        match result {
            Ok(report) => {
                log!(task.name(); "{} in {}ms", summarize(&report.artifacts), report.elapsed.as_millis());
                reports.push(report);
            }
            Err(e) => {
                failed += 1;
                log!("error"; "{task}: {e:#}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} tasks failed", tasks_len(tasks));
    }
    Ok(reports)
}

/// Split requested tasks into a parallel batch and the ordered tail.
///
/// Duplicates are dropped. Sitemap reads markup output, so it never runs
/// alongside other tasks.
fn schedule(tasks: &[Task]) -> (Vec<Task>, Vec<Task>) {
    let mut unique = tasks.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique.into_iter().partition(|&t| t != Task::Sitemap)
}

fn tasks_len(tasks: &[Task]) -> usize {
    let (parallel, after) = schedule(tasks);
    parallel.len() + after.len()
}

/// Short human summary of written artifacts for log lines.
pub fn summarize(artifacts: &[PathBuf]) -> String {
    match artifacts {
        [] => "nothing to do".to_string(),
        [one] => format!(
            "wrote {}",
            one.file_name().unwrap_or_default().to_string_lossy()
        ),
        many => format!("wrote {} files", many.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set() {
        assert_eq!(
            Task::DEFAULT,
            [Task::Scripts, Task::Styles, Task::Markup, Task::Images]
        );
        assert!(!Task::DEFAULT.contains(&Task::Lint));
        assert!(!Task::DEFAULT.contains(&Task::Sitemap));
        assert_eq!(Task::default_set(), Task::DEFAULT.to_vec());
    }

    #[test]
    fn test_reload_kinds() {
        assert_eq!(Task::Scripts.reload(), Reload::Page);
        assert_eq!(Task::Markup.reload(), Reload::Page);
        assert_eq!(Task::Styles.reload(), Reload::Css);
        assert_eq!(Task::Images.reload(), Reload::None);
        assert_eq!(Task::Lint.reload(), Reload::None);
    }

    #[test]
    fn test_schedule_runs_sitemap_last() {
        let (parallel, after) = schedule(&[Task::Sitemap, Task::Markup, Task::Styles]);
        assert_eq!(parallel, vec![Task::Styles, Task::Markup]);
        assert_eq!(after, vec![Task::Sitemap]);
    }

    #[test]
    fn test_schedule_dedups() {
        let (parallel, after) = schedule(&[Task::Images, Task::Images, Task::Lint]);
        assert_eq!(parallel, vec![Task::Images, Task::Lint]);
        assert!(after.is_empty());
        assert_eq!(tasks_len(&[Task::Images, Task::Images]), 1);
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(&[]), "nothing to do");
        assert_eq!(summarize(&[PathBuf::from("/out/css/styles.css")]), "wrote styles.css");
        assert_eq!(
            summarize(&[PathBuf::from("a.js"), PathBuf::from("a.js.map")]),
            "wrote 2 files"
        );
    }

    #[test]
    fn test_run_tasks_keeps_going_after_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.build.root = Some(dir.path().to_path_buf());
        config.build.output = dir.path().join("public");
        config.config_path = dir.path().join("sitepipe.toml");
        // No entry stylesheet: styles fails before any tool runs
        config.styles.entry = dir.path().join("src/scss/styles.scss");
        // Empty image source: images succeeds with nothing to do
        config.images.source = dir.path().join("src/img");

        let err = run_tasks(&[Task::Styles, Task::Images], &config).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 tasks failed");
    }
}
