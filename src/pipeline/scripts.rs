//! Script pipeline: bundle, down-level, minify.
//!
//! Two artifacts are written per bundle, each with an external source map.
//! Their names depend on the mode:
//!
//! | mode | unminified    | minified      |
//! |------|---------------|---------------|
//! | dev  | `scripts-min.js` | `scripts.js`  |
//! | prod | `scripts.js`     | `scripts-min.js` |

use crate::{
    config::{Mode, SiteConfig},
    exec,
    utils::fs::ensure_parent,
};
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// File names for one bundle.
#[derive(Debug, PartialEq, Eq)]
pub struct ArtifactNames {
    pub unminified: String,
    pub minified: String,
}

/// Artifact names for `bundle` (e.g. `scripts.js`) in `mode`.
pub fn artifact_names(bundle: &str, mode: Mode) -> ArtifactNames {
    let stem = bundle.strip_suffix(".js").unwrap_or(bundle);
    let plain = format!("{stem}.js");
    let suffixed = format!("{stem}-min.js");

    match mode {
        Mode::Dev => ArtifactNames {
            unminified: suffixed,
            minified: plain,
        },
        Mode::Prod => ArtifactNames {
            unminified: plain,
            minified: suffixed,
        },
    }
}

/// Bundle the entry module. Returns the written files.
pub fn bundle_scripts(config: &SiteConfig) -> Result<Vec<PathBuf>> {
    let scripts = &config.scripts;
    if !scripts.entry.is_file() {
        bail!("Script entry not found: {}", scripts.entry.display());
    }
    SiteConfig::check_command_installed("[scripts.command]", &scripts.command)?;

    let names = artifact_names(&scripts.bundle, config.build.mode);
    let dir = config.scripts_dir();
    let unminified = dir.join(&names.unminified);
    let minified = dir.join(&names.minified);
    ensure_parent(&unminified)?;

    let root = config.get_root();
    let target = format!("--target={}", scripts.target);

    exec!(
        root;
        &scripts.command;
        &scripts.entry,
        "--bundle",
        &target,
        "--sourcemap",
        outfile(&unminified),
        "--log-level=warning",
    )?;

    exec!(
        root;
        &scripts.command;
        &unminified,
        "--minify",
        &target,
        "--sourcemap",
        outfile(&minified),
        "--allow-overwrite",
        "--log-level=warning",
    )?;

    Ok(vec![
        map_path(&unminified),
        unminified,
        map_path(&minified),
        minified,
    ])
}

fn outfile(path: &Path) -> String {
    format!("--outfile={}", path.display())
}

fn map_path(js: &Path) -> PathBuf {
    let mut name = js.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names_dev() {
        let names = artifact_names("scripts.js", Mode::Dev);
        assert_eq!(names.unminified, "scripts-min.js");
        assert_eq!(names.minified, "scripts.js");
    }

    #[test]
    fn test_artifact_names_prod() {
        let names = artifact_names("scripts.js", Mode::Prod);
        assert_eq!(names.unminified, "scripts.js");
        assert_eq!(names.minified, "scripts-min.js");
    }

    #[test]
    fn test_artifact_names_without_extension() {
        assert_eq!(
            artifact_names("app", Mode::Prod),
            ArtifactNames {
                unminified: "app.js".into(),
                minified: "app-min.js".into(),
            }
        );
    }

    #[test]
    fn test_map_path() {
        assert_eq!(
            map_path(Path::new("/public/js/scripts.js")),
            PathBuf::from("/public/js/scripts.js.map")
        );
        assert_eq!(outfile(Path::new("/public/js/a.js")), "--outfile=/public/js/a.js");
    }

    #[cfg(unix)]
    #[test]
    fn test_both_passes_keep_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        let log = root.join("calls.log");
        std::fs::create_dir_all(root.join("src/js")).unwrap();
        std::fs::write(root.join("src/js/index.js"), "export const a = 1;").unwrap();

        let mut config = SiteConfig::default();
        config.build.root = Some(root.to_path_buf());
        config.build.output = root.join("public");
        config.scripts.entry = root.join("src/js/index.js");
        // Records each invocation's arguments, one line per call
        config.scripts.command = vec![
            "sh".into(),
            "-c".into(),
            r#"echo "$*" >> "$0""#.into(),
            log.to_string_lossy().into_owned(),
        ];

        let artifacts = bundle_scripts(&config).unwrap();
        assert_eq!(artifacts.len(), 4);

        let calls = std::fs::read_to_string(&log).unwrap();
        let calls: Vec<&str> = calls.lines().collect();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("--bundle"));
        assert!(calls[1].contains("--minify"));
        for call in calls {
            assert!(call.contains("--target=es2015"), "missing target: {call}");
        }
    }

    #[test]
    fn test_missing_entry() {
        let mut config = SiteConfig::default();
        config.scripts.entry = PathBuf::from("/nonexistent/index.js");
        let err = bundle_scripts(&config).unwrap_err();
        assert!(err.to_string().contains("Script entry not found"));
    }
}
