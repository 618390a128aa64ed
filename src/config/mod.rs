//! Project configuration management for `sitepipe.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[build]`   | Root, mode (dev/prod), output directory          |
//! | `[styles]`  | Stylesheet compiler and production post-process  |
//! | `[scripts]` | Bundler, target and artifact naming              |
//! | `[markup]`  | Template renderer and page directory             |
//! | `[images]`  | Per-format optimizer commands                    |
//! | `[lint]`    | Linter command and source selection              |
//! | `[sitemap]` | Site URL and sitemap output                      |
//! | `[serve]`   | Development server (port, interface, watch)      |
//!
//! Every section is optional; an empty file (or no file) builds the
//! conventional `src/` layout into `public/`.
//!
//! # Example
//!
//! ```toml
//! [build]
//! mode = "prod"
//!
//! [styles]
//! command = ["npx", "sass"]
//!
//! [sitemap]
//! enable = true
//! site_url = "https://example.org"
//!
//! [serve]
//! port = 8080
//! ```

mod build;
pub mod defaults;
mod error;
mod handle;
mod images;
mod lint;
mod markup;
mod scripts;
mod serve;
mod sitemap;
mod styles;

pub use build::Mode;
pub use handle::{cfg, init_config, reload_config};
#[cfg(test)]
pub use handle::GLOBAL_CONFIG_LOCK;

use build::BuildConfig;
use error::ConfigError;
use images::ImagesConfig;
use lint::LintConfig;
use markup::MarkupConfig;
use scripts::ScriptsConfig;
use serve::ServeConfig;
use sitemap::SitemapConfig;
use styles::StylesConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "sitepipe.toml";

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing sitepipe.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub styles: StylesConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub markup: MarkupConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub lint: LintConfig,

    #[serde(default)]
    pub sitemap: SitemapConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Load the config named by the CLI and apply CLI overrides.
    ///
    /// A missing config file yields the defaults; `config_path` still points
    /// at where the file would be.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let root = match &cli.command {
            Commands::Init { name: Some(name) } => root.join(name),
            _ => root.to_path_buf(),
        };
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli, &root);
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Get CLI arguments reference, if loaded through [`SiteConfig::load`].
    pub const fn get_cli(&self) -> Option<&'static Cli> {
        self.cli
    }

    pub const fn is_prod(&self) -> bool {
        self.build.mode.is_prod()
    }

    /// Directory compiled stylesheets are written to.
    pub fn styles_dir(&self) -> PathBuf {
        self.build.output.join(&self.styles.output)
    }

    /// Directory bundled scripts are written to.
    pub fn scripts_dir(&self) -> PathBuf {
        self.build.output.join(&self.scripts.output)
    }

    /// Directory optimized images are written to.
    pub fn images_dir(&self) -> PathBuf {
        self.build.output.join(&self.images.output)
    }

    /// Update configuration with CLI arguments
    fn update_with_cli(&mut self, cli: &'static Cli, root: &Path) {
        self.cli = Some(cli);

        if cli.prod {
            self.build.mode = Mode::Prod;
        }
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        match &cli.command {
            Commands::Build { build_args } => {
                self.build.clean |= build_args.clean;
                Self::update_option(&mut self.sitemap.site_url, build_args.site_url.as_ref());
            }
            Commands::Serve {
                build_args,
                interface,
                port,
                watch,
            } => {
                self.build.clean |= build_args.clean;
                Self::update_option(&mut self.sitemap.site_url, build_args.site_url.as_ref());
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
            Commands::Run { site_url, .. } => {
                Self::update_option(&mut self.sitemap.site_url, site_url.as_ref());
            }
            Commands::Init { .. } => {}
        }

        self.update_path_with_root(root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve every source and output path against the root.
    fn update_path_with_root(&mut self, root: &Path, config_file: &Path) {
        let root = normalize_path(root);
        let join = |path: &Path| normalize_path(&root.join(path));

        self.config_path = join(config_file);

        self.build.output = join(&self.build.output);

        self.styles.entry = join(&self.styles.entry);
        self.styles.watch = join(&self.styles.watch);
        self.styles.load_paths = self.styles.load_paths.iter().map(|p| join(p)).collect();

        self.scripts.entry = join(&self.scripts.entry);
        self.scripts.watch = join(&self.scripts.watch);

        self.markup.pages = join(&self.markup.pages);
        self.markup.basedir = join(&self.markup.basedir);
        self.markup.watch = join(&self.markup.watch);

        self.images.source = join(&self.images.source);

        self.sitemap.path = self.build.output.join(&self.sitemap.path);

        self.build.root = Some(root);
    }

    /// Validate settings that would otherwise fail deep inside a task.
    pub fn validate(&self) -> Result<()> {
        let url = &self.sitemap.site_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!(ConfigError::Validation(
                "[sitemap.site_url] must start with http:// or https://".into()
            ));
        }

        if self
            .sitemap
            .priority
            .is_some_and(|priority| !(0.0..=1.0).contains(&priority))
        {
            bail!(ConfigError::Validation(
                "[sitemap.priority] must be between 0.0 and 1.0".into()
            ));
        }

        if self.images.optimization_level > 7 {
            bail!(ConfigError::Validation(
                "[images.optimization_level] must be between 0 and 7".into()
            ));
        }

        for (field, command) in [
            ("[styles.command]", &self.styles.command),
            ("[styles.postcss.command]", &self.styles.postcss.command),
            ("[scripts.command]", &self.scripts.command),
            ("[markup.command]", &self.markup.command),
            ("[images.gifsicle]", &self.images.gifsicle),
            ("[images.jpegtran]", &self.images.jpegtran),
            ("[images.optipng]", &self.images.optipng),
            ("[lint.command]", &self.lint.command),
        ] {
            if command.is_empty() {
                bail!(ConfigError::Validation(format!(
                    "{field} must have at least one element"
                )));
            }
        }

        let output = &self.build.output;
        if self.get_root() == output.as_path() {
            bail!(ConfigError::Validation(
                "[build.output] must not be the project root".into()
            ));
        }

        Ok(())
    }

    /// Check if a command is installed and available
    pub fn check_command_installed(field: &str, command: &[String]) -> Result<()> {
        let Some(cmd) = command.first() else {
            bail!(ConfigError::Validation(format!(
                "{field} must have at least one element"
            )));
        };

        which::which(cmd)
            .with_context(|| format!("`{cmd}` not found ({field}). Please install it first."))?;

        Ok(())
    }
}

/// Normalize a path to absolute, using canonicalize if the path exists
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
