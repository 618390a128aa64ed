//! sitepipe - A static site build pipeline with a live-reloading dev server.

mod build;
mod cli;
mod config;
mod init;
mod logger;
mod pipeline;
mod reload;
mod serve;
mod utils;
mod watch;

use anyhow::Result;
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::{SiteConfig, cfg, init_config};
use init::new_site;
use pipeline::run_tasks;
use serve::serve_site;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    init_config(load_config(cli)?);

    match &cli.command {
        Commands::Init { .. } => new_site(&cfg()),
        Commands::Build { .. } => build_site(&cfg()),
        Commands::Run { tasks, .. } => run_tasks(tasks, &cfg()).map(|_| ()),
        Commands::Serve { .. } => {
            // A broken source should not keep the server from starting
            if let Err(e) = build_site(&cfg()) {
                log!("error"; "{e:#}");
            }
            serve_site()
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<SiteConfig> {
    let config = SiteConfig::load(cli)?;

    if !cli.is_init() {
        config.validate()?;
    }

    Ok(config)
}
