//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::pipeline::Task;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sitepipe static site build pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file name (default: sitepipe.toml)
    #[arg(short = 'C', long, default_value = crate::config::CONFIG_FILE)]
    pub config: PathBuf,

    /// Build for production: compressed styles, post-processing, minified markup
    #[arg(long, global = true)]
    pub prod: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Clean output directory completely before building
    #[arg(long)]
    pub clean: bool,

    /// Override the sitemap site URL.
    ///
    /// Useful for CI deployments where the production URL differs from the
    /// one in sitepipe.toml.
    #[arg(long = "site-url")]
    pub site_url: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Scaffold a new project
    Init {
        /// the name(path) of project directory, related to `root`
        name: Option<PathBuf>,
    },

    /// Run scripts, styles, markup and images once
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, then serve the output. Re-run tasks and reload on change
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Run individual tasks (e.g. `run lint`, `run markup sitemap`)
    Run {
        #[arg(value_enum, required = true)]
        tasks: Vec<Task>,

        /// Override the sitemap site URL
        #[arg(long = "site-url")]
        site_url: Option<String>,
    },
}

impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from(["sitepipe", "build", "--clean"]);
        assert!(matches!(cli.command, Commands::Build { .. }));
        assert!(!cli.is_init());
        assert!(!cli.prod);
        assert_eq!(cli.config, PathBuf::from("sitepipe.toml"));
        let Commands::Build { build_args } = cli.command else {
            panic!("expected build");
        };
        assert!(build_args.clean);
    }

    #[test]
    fn test_parse_prod_after_subcommand() {
        let cli = Cli::parse_from(["sitepipe", "build", "--prod"]);
        assert!(cli.prod);
    }

    #[test]
    fn test_parse_serve_watch_flag() {
        let cli = Cli::parse_from(["sitepipe", "serve", "-p", "8000", "--watch", "false"]);
        let Commands::Serve { port, watch, .. } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(port, Some(8000));
        assert_eq!(watch, Some(false));
    }

    #[test]
    fn test_parse_run_tasks() {
        let cli = Cli::parse_from(["sitepipe", "run", "markup", "sitemap"]);
        let Commands::Run { tasks, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(tasks, vec![Task::Markup, Task::Sitemap]);
    }

    #[test]
    fn test_run_requires_task() {
        assert!(Cli::try_parse_from(["sitepipe", "run"]).is_err());
        assert!(Cli::try_parse_from(["sitepipe", "run", "deploy"]).is_err());
    }
}
