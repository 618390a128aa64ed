//! File system watcher for live reload.
//!
//! Monitors each task's source directory and the config file, re-runs the
//! owning task and tells connected browsers what to reload.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Event Loop                              │
//! │                                                              │
//! │  ┌──────────┐    ┌──────────┐    ┌────────────────────────┐  │
//! │  │ notify   │───▶│ Debouncer│───▶│    handle_changes()    │  │
//! │  │ events   │    │ (300ms)  │    │                        │  │
//! │  └──────────┘    └──────────┘    │  ┌──────────────────┐  │  │
//! │                                  │  │ Full Rebuild     │  │  │
//! │                                  │  │ (config)         │  │  │
//! │                                  │  └──────────────────┘  │  │
//! │                                  │  ┌──────────────────┐  │  │
//! │                                  │  │ Per-task re-run  │  │  │
//! │                                  │  │ → broadcast      │  │  │
//! │                                  │  └──────────────────┘  │  │
//! │                                  └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::{
    build::build_site,
    config::{SiteConfig, cfg, reload_config},
    log,
    logger::WatchStatus,
    pipeline::{self, Reload, Task, TaskReport, images, markup, summarize},
    reload::hub,
    utils::{
        category::{FileCategory, WATCH_CATEGORIES, categorize_path},
        fs::{rel_display, wait_until_stable},
    },
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

const DEBOUNCE_MS: u64 = 300;
const REBUILD_COOLDOWN_MS: u64 = 800;

/// Polls before giving up on a file that is still being written.
const STABLE_RETRIES: usize = 10;

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with debouncing and rebuild cooldown.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    last_rebuild: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            last_rebuild: None,
        }
    }

    fn in_cooldown(&self) -> bool {
        self.last_rebuild
            .is_some_and(|t| t.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS))
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    fn mark_rebuild(&mut self) {
        self.last_rebuild = Some(Instant::now());
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Change Planning
// =============================================================================

/// What one batch of changes requires.
#[derive(Debug, Default, PartialEq, Eq)]
struct ChangePlan {
    config_changed: bool,
    /// Affected tasks with the paths that triggered them.
    tasks: BTreeMap<Task, Vec<PathBuf>>,
}

fn plan_changes(paths: &[PathBuf], config: &SiteConfig) -> ChangePlan {
    let mut plan = ChangePlan::default();

    for path in paths {
        match categorize_path(path, config) {
            FileCategory::Config => plan.config_changed = true,
            category => {
                if let Some(task) = category.task() {
                    plan.tasks.entry(task).or_default().push(path.clone());
                }
            }
        }
    }

    plan
}

// =============================================================================
// Event Handler
// =============================================================================

/// Re-run `task` for the changed `paths`, incrementally where it can.
fn rerun(task: Task, paths: &[PathBuf], config: &SiteConfig) -> Result<TaskReport> {
    let start = Instant::now();

    let artifacts = match task {
        Task::Images => {
            for path in paths.iter().filter(|p| p.is_file()) {
                // Best effort: a file still growing is picked up by the next event
                let _ = wait_until_stable(path, STABLE_RETRIES);
            }
            images::optimize_paths(paths, config)?
        }
        Task::Markup => markup::rerender(paths, config)?,
        _ => return pipeline::run_task(task, config),
    };

    Ok(TaskReport {
        task,
        artifacts,
        elapsed: start.elapsed(),
    })
}

/// Reload config and rebuild everything. Returns true if a rebuild ran.
fn try_full_rebuild() -> bool {
    match reload_config() {
        Ok(false) => {
            log!("watch"; "config unchanged");
            false
        }
        Ok(true) => {
            log!("watch"; "config changed, rebuilding...");
            match build_site(&cfg()) {
                Ok(()) => {
                    hub().broadcast(Reload::Page);
                }
                Err(e) => WatchStatus::error("build", &e),
            }
            true
        }
        Err(e) => {
            WatchStatus::error("config", &e);
            false
        }
    }
}

/// Process file changes. Returns true if a full rebuild ran (for cooldown).
///
/// When the config did not actually change (or fails to load), the source
/// changes of the same batch still re-run their tasks.
fn handle_changes(paths: &[PathBuf]) -> bool {
    let plan = plan_changes(paths, &cfg());

    if plan.config_changed && try_full_rebuild() {
        return true;
    }

    let config = cfg();
    let root = config.get_root();
    for (task, changed) in &plan.tasks {
        let trigger = changed
            .iter()
            .map(|p| rel_display(p, root))
            .collect::<Vec<_>>()
            .join(", ");
        log!("watch"; "{trigger} changed");

        match rerun(*task, changed, &config) {
            Ok(report) => {
                let message = format!(
                    "{} in {}ms",
                    summarize(&report.artifacts),
                    report.elapsed.as_millis()
                );
                WatchStatus::success(task.name(), &message);
                let reached = hub().broadcast(task.reload());
                if reached > 0 {
                    log!("reload"; "notified {reached} clients");
                }
            }
            Err(e) => WatchStatus::error(task.name(), &e),
        }
    }

    false
}

// =============================================================================
// Watcher Setup
// =============================================================================

/// Format absolute path as relative to root, with trailing slash for directories.
fn format_rel(path: &Path, root: &Path, is_dir: bool) -> String {
    let suffix = if is_dir { "/" } else { "" };
    let rel = rel_display(path, root);
    let rel = if rel.is_empty() { "." } else { rel.as_str() };
    format!("{rel}{suffix}")
}

/// Paths to register and how.
///
/// The config file is watched through its directory so that it is picked up
/// when created later or replaced by an editor's atomic save.
fn watch_targets(config: &SiteConfig) -> Vec<(PathBuf, RecursiveMode)> {
    let mut targets: Vec<(PathBuf, RecursiveMode)> = Vec::new();

    for &cat in WATCH_CATEGORIES {
        let Some(path) = cat.path(config) else {
            continue;
        };
        let target = if cat.is_directory() {
            (path, RecursiveMode::Recursive)
        } else {
            match path.parent() {
                Some(parent) => (parent.to_path_buf(), RecursiveMode::NonRecursive),
                None => continue,
            }
        };
        if target.0.exists() && !targets.iter().any(|(p, _)| *p == target.0) {
            targets.push(target);
        }
    }

    targets
}

/// Register every watch target. Returns the registered paths.
fn setup_watchers(watcher: &mut impl Watcher, config: &SiteConfig) -> Result<Vec<PathBuf>> {
    update_watchers(watcher, &[], config)
}

/// Move registrations from `watched` to the targets of `config`.
///
/// All-or-nothing: if any new path fails to register, the ones added so far
/// are removed and `watched` stays in effect.
fn update_watchers(
    watcher: &mut impl Watcher,
    watched: &[PathBuf],
    config: &SiteConfig,
) -> Result<Vec<PathBuf>> {
    let targets = watch_targets(config);
    let mut added: Vec<PathBuf> = Vec::new();

    for (path, mode) in &targets {
        if watched.contains(path) {
            continue;
        }
        if let Err(e) = watcher.watch(path, *mode) {
            unwatch_all(watcher, &added);
            return Err(e).with_context(|| format!("Failed to watch {}", path.display()));
        }
        added.push(path.clone());
    }

    let next: Vec<PathBuf> = targets.into_iter().map(|(path, _)| path).collect();
    let stale: Vec<PathBuf> = watched
        .iter()
        .filter(|path| !next.contains(path))
        .cloned()
        .collect();
    unwatch_all(watcher, &stale);

    let root = config.get_root();
    let summary: Vec<_> = next
        .iter()
        .map(|path| format_rel(path, root, true))
        .collect();
    if !summary.is_empty() {
        log!("watch"; "{}", summary.join(", "));
    }
    Ok(next)
}

fn unwatch_all(watcher: &mut impl Watcher, watched: &[PathBuf]) {
    for path in watched {
        let _ = watcher.unwatch(path);
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

// =============================================================================
// Public API
// =============================================================================

/// Start blocking file watcher with debouncing and live rebuild.
pub fn watch_for_changes_blocking() -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    let mut watched = setup_watchers(&mut watcher, &cfg())?;

    let mut debouncer = Debouncer::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) && !debouncer.in_cooldown() => {
                debouncer.add(event);
            }
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                if handle_changes(&debouncer.take()) {
                    debouncer.mark_rebuild();
                    // Watch directories may have moved with the new config
                    match update_watchers(&mut watcher, &watched, &cfg()) {
                        Ok(next) => watched = next,
                        Err(e) => log!("watch"; "{e:#}, keeping previous watch paths"),
                    }
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.config_path = PathBuf::from("/p/sitepipe.toml");
        config.scripts.watch = PathBuf::from("/p/src/js");
        config.styles.watch = PathBuf::from("/p/src/scss");
        config.markup.watch = PathBuf::from("/p/src/views");
        config.images.source = PathBuf::from("/p/src/img");
        config
    }

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("/p/src/js/.index.js.swp")));
        assert!(is_temp_file(Path::new("/p/src/js/index.js~")));
        assert!(is_temp_file(Path::new("/p/src/js/#index.js#")));
        assert!(is_temp_file(Path::new("/p/src/scss/a.tmp")));
        assert!(!is_temp_file(Path::new("/p/src/scss/_vars.scss")));
    }

    #[test]
    fn test_plan_groups_by_task() {
        let c = config();
        let plan = plan_changes(
            &[
                PathBuf::from("/p/src/scss/_vars.scss"),
                PathBuf::from("/p/src/scss/styles.scss"),
                PathBuf::from("/p/src/views/pages/index.pug"),
                PathBuf::from("/p/README.md"),
            ],
            &c,
        );

        assert!(!plan.config_changed);
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[&Task::Styles].len(), 2);
        assert_eq!(
            plan.tasks[&Task::Markup],
            vec![PathBuf::from("/p/src/views/pages/index.pug")]
        );
    }

    #[test]
    fn test_plan_config_change() {
        let c = config();
        let plan = plan_changes(
            &[PathBuf::from("/p/sitepipe.toml"), PathBuf::from("/p/src/js/a.js")],
            &c,
        );
        assert!(plan.config_changed);
    }

    #[test]
    fn test_plan_empty() {
        assert_eq!(plan_changes(&[], &config()), ChangePlan::default());
    }

    #[test]
    fn test_debouncer_batches_and_filters() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), Duration::from_secs(60));

        debouncer.add(
            Event::new(EventKind::Modify(ModifyKind::Any))
                .add_path(PathBuf::from("/p/src/js/b.js"))
                .add_path(PathBuf::from("/p/src/js/.b.js.swp"))
                .add_path(PathBuf::from("/p/src/js/a.js")),
        );
        assert_eq!(debouncer.timeout(), Duration::from_millis(DEBOUNCE_MS));
        // Not ready until the debounce window has passed
        assert!(!debouncer.ready());

        debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS));
        assert!(debouncer.ready());
        assert_eq!(
            debouncer.take(),
            vec![PathBuf::from("/p/src/js/a.js"), PathBuf::from("/p/src/js/b.js")]
        );
        assert!(!debouncer.ready());
    }

    #[test]
    fn test_debouncer_cooldown() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.in_cooldown());
        debouncer.mark_rebuild();
        assert!(debouncer.in_cooldown());
    }

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(&Event::new(EventKind::Create(CreateKind::File))));
        assert!(is_relevant(&Event::new(EventKind::Modify(ModifyKind::Any))));
        assert!(!is_relevant(&Event::new(EventKind::Remove(RemoveKind::File))));
    }

    #[test]
    fn test_format_rel() {
        let root = Path::new("/p");
        assert_eq!(format_rel(Path::new("/p/src/js"), root, true), "src/js/");
        assert_eq!(format_rel(Path::new("/p/sitepipe.toml"), root, false), "sitepipe.toml");
        assert_eq!(format_rel(root, root, true), "./");
    }

    /// Watcher that records registrations and refuses one path.
    struct RecordingWatcher {
        watched: Vec<PathBuf>,
        refuse: Option<PathBuf>,
    }

    impl Watcher for RecordingWatcher {
        fn new<F: notify::EventHandler>(_: F, _: notify::Config) -> notify::Result<Self> {
            Ok(Self {
                watched: Vec::new(),
                refuse: None,
            })
        }

        fn watch(&mut self, path: &Path, _: RecursiveMode) -> notify::Result<()> {
            if self.refuse.as_deref() == Some(path) {
                return Err(notify::Error::generic("refused"));
            }
            self.watched.push(path.to_path_buf());
            Ok(())
        }

        fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
            self.watched.retain(|p| p != path);
            Ok(())
        }

        fn kind() -> notify::WatcherKind {
            notify::WatcherKind::NullWatcher
        }
    }

    fn project(root: &Path) -> SiteConfig {
        let mut config = config();
        config.build.root = Some(root.to_path_buf());
        config.config_path = root.join("sitepipe.toml");
        config.scripts.watch = root.join("src/js");
        config.styles.watch = root.join("src/scss");
        config.markup.watch = root.join("src/views");
        config.images.source = root.join("src/img");
        for dir in ["src/js", "src/scss", "src/views"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        config
    }

    #[test]
    fn test_watch_targets_cover_missing_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        let config = project(root);

        let targets = watch_targets(&config);
        let paths: Vec<_> = targets.iter().map(|(p, _)| p.clone()).collect();

        // src/img does not exist; the config is watched through its directory
        assert_eq!(
            paths,
            vec![
                root.join("src/js"),
                root.join("src/scss"),
                root.join("src/views"),
                root.to_path_buf(),
            ]
        );
        assert_eq!(targets[3].1, RecursiveMode::NonRecursive);
        assert_eq!(targets[0].1, RecursiveMode::Recursive);
    }

    #[test]
    fn test_update_watchers_moves_registrations() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        let mut config = project(root);
        let mut watcher = RecordingWatcher::new(|_: notify::Result<Event>| {}, notify::Config::default()).unwrap();

        let watched = setup_watchers(&mut watcher, &config).unwrap();
        assert_eq!(watched.len(), 4);

        std::fs::create_dir_all(root.join("assets/scss")).unwrap();
        config.styles.watch = root.join("assets/scss");
        let watched = update_watchers(&mut watcher, &watched, &config).unwrap();

        assert!(watched.contains(&root.join("assets/scss")));
        assert!(!watcher.watched.contains(&root.join("src/scss")));
        assert!(watcher.watched.contains(&root.join("assets/scss")));
        assert_eq!(watcher.watched.len(), 4);
    }

    #[test]
    fn test_update_watchers_failure_keeps_previous_set() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        let mut config = project(root);
        let mut watcher = RecordingWatcher::new(|_: notify::Result<Event>| {}, notify::Config::default()).unwrap();
        let watched = setup_watchers(&mut watcher, &config).unwrap();
        let before = watcher.watched.clone();

        std::fs::create_dir_all(root.join("a/js")).unwrap();
        std::fs::create_dir_all(root.join("b/scss")).unwrap();
        config.scripts.watch = root.join("a/js");
        config.styles.watch = root.join("b/scss");
        watcher.refuse = Some(root.join("b/scss"));

        assert!(update_watchers(&mut watcher, &watched, &config).is_err());
        assert_eq!(watcher.watched, before);
    }

    #[cfg(unix)]
    #[test]
    fn test_source_changes_survive_unchanged_config() {
        use crate::{
            cli::Cli,
            config::{GLOBAL_CONFIG_LOCK, init_config},
        };
        use clap::Parser;

        let _guard = GLOBAL_CONFIG_LOCK.lock();
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let marker = root.join("styles_ran");
        std::fs::create_dir_all(root.join("src/scss")).unwrap();
        std::fs::write(root.join("src/scss/styles.scss"), "a { color: red; }").unwrap();
        std::fs::write(
            root.join("sitepipe.toml"),
            format!(
                "[styles]\ncommand = [\"sh\", \"-c\", 'touch \"$0\"', '{}']\n",
                marker.display()
            ),
        )
        .unwrap();

        let root_arg = root.to_string_lossy().into_owned();
        let cli: &'static Cli =
            Box::leak(Box::new(Cli::parse_from(["sitepipe", "--root", &root_arg, "serve"])));
        let config = SiteConfig::load(cli).unwrap();
        let changed = vec![config.config_path.clone(), config.styles.entry.clone()];
        init_config(config);

        // Config saved with identical bytes alongside a stylesheet edit
        assert!(!handle_changes(&changed));
        assert!(marker.exists());

        // A broken config still lets the stylesheet edit through
        std::fs::remove_file(&marker).unwrap();
        std::fs::write(root.join("sitepipe.toml"), "[styles\n").unwrap();
        assert!(!handle_changes(&changed));
        assert!(marker.exists());
    }
}
