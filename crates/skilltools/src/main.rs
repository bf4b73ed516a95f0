use std::path::PathBuf;

use crate::config::Settings;
use crate::prelude::*;
use clap::Parser;
use skilltools_core::format::DeploymentType;

mod atlassian;
mod check;
mod config;
mod convert;
mod error;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Jira and Confluence skills for coding agents, for Cloud and Data Center sites"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Path to the YAML config file
    #[clap(long, env = "SKILLTOOLS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Deployment type of the site (cloud, datacenter)
    #[clap(long, global = true)]
    deployment: Option<DeploymentType>,

    /// Site URL, e.g. https://acme.atlassian.net
    #[clap(long, global = true)]
    base_url: Option<String>,

    /// Whether to display additional information.
    #[clap(long, env = "SKILLTOOLS_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Jira operations
    #[clap(subcommand)]
    Jira(crate::atlassian::jira::Commands),

    /// Confluence operations
    #[clap(subcommand)]
    Confluence(crate::atlassian::confluence::Commands),

    /// Convert between Markdown and Atlassian content formats
    Convert(crate::convert::App),

    /// Show the resolved configuration and test connectivity
    Check,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();
    init_logging(app.global.verbose);
    color_eyre::install()?;

    let global = &app.global;

    match app.command {
        SubCommands::Jira(cmd) => {
            let settings = Settings::load(global)?;
            crate::atlassian::jira::run(cmd, &settings).await
        }
        SubCommands::Confluence(cmd) => {
            let settings = Settings::load(global)?;
            crate::atlassian::confluence::run(cmd, &settings).await
        }
        // Reads the config only when no format is named on the command line.
        SubCommands::Convert(sub_app) => crate::convert::run(sub_app, global),
        SubCommands::Check => crate::check::run(&Settings::load(global)?).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
