//! Project scaffolding.
//!
//! Creates a minimal project that builds out of the box: one stylesheet, one
//! script, a layout and a page that extends it.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Starter files, relative to the project root.
const SCAFFOLD: &[(&str, &str)] = &[
    (
        "src/scss/styles.scss",
        "$accent: #0366d6;\n\nbody {\n  font-family: system-ui, sans-serif;\n  margin: 2rem auto;\n  max-width: 48rem;\n}\n\na {\n  color: $accent;\n}\n",
    ),
    (
        "src/js/index.js",
        "document.addEventListener(\"DOMContentLoaded\", () => {\n  document.documentElement.classList.add(\"js\");\n});\n",
    ),
    (
        "src/views/layout.pug",
        "doctype html\nhtml(lang=\"en\")\n  head\n    meta(charset=\"utf-8\")\n    title= title\n    link(rel=\"stylesheet\", href=\"/css/styles.css\")\n  body\n    block content\n    script(src=\"/js/scripts.js\")\n",
    ),
    (
        "src/views/pages/index.pug",
        "extends /layout\n\nblock content\n  h1 Hello\n  p Edit src/views/pages/index.pug and save.\n",
    ),
];

/// Directories created even when empty.
const EMPTY_DIRS: &[&str] = &["src/img"];

/// Create a new project at the config root.
pub fn new_site(config: &SiteConfig) -> Result<()> {
    let root = config.get_root();
    if config.config_path.exists() {
        bail!(
            "{} already exists. Remove it manually or init in a different path.",
            config.config_path.display()
        );
    }

    for (file, _) in SCAFFOLD {
        let path = root.join(file);
        if path.exists() {
            bail!(
                "Path `{}` already exists. Try `sitepipe init <NAME>` instead.",
                path.display()
            );
        }
    }

    init_default_config(&config.config_path)?;
    init_site_structure(root)?;
    init_ignored_files(root, config)?;

    log!("init"; "created project in {}", root.display());
    Ok(())
}

fn init_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(&SiteConfig::default())?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn init_site_structure(root: &Path) -> Result<()> {
    for (file, content) in SCAFFOLD {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    for dir in EMPTY_DIRS {
        fs::create_dir_all(root.join(dir))?;
    }
    Ok(())
}

/// Write `.gitignore` unless one exists.
fn init_ignored_files(root: &Path, config: &SiteConfig) -> Result<()> {
    let path = root.join(".gitignore");
    if path.exists() {
        return Ok(());
    }

    let output = config
        .build
        .output
        .strip_prefix(root)
        .unwrap_or(&config.build.output);
    let content = format!("node_modules/\n{}/\n", output.display());
    fs::write(&path, content)?;
    Ok(())
}
