//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── clean output (--clean)
//!     │
//!     ├── run_tasks(scripts, styles, markup, images)   parallel
//!     │
//!     └── sitemap                                     [sitemap] enable
//! ```

use crate::{
    config::SiteConfig,
    log,
    pipeline::{Task, run_tasks},
};
use anyhow::{Context, Result};
use std::{fs, time::Instant};

/// Tasks `build` runs for this config.
pub fn build_tasks(config: &SiteConfig) -> Vec<Task> {
    let mut tasks = Task::default_set();
    if config.sitemap.enable {
        tasks.push(Task::Sitemap);
    }
    tasks
}

/// Build the entire site.
///
/// If `config.build.clean` is true, clears the output directory first.
pub fn build_site(config: &SiteConfig) -> Result<()> {
    let output = &config.build.output;
    let start = Instant::now();

    if config.build.clean && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clean {}", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    log!("build"; "{} build into {}", config.build.mode, output.display());
    run_tasks(&build_tasks(config), config)?;
    log!("build"; "done in {}ms", start.elapsed().as_millis());

    Ok(())
}
