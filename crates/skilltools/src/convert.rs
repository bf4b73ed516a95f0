use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::Global;
use crate::prelude::{println, *};
use skilltools_core::format::{convert_markdown, render_markdown};

#[derive(Debug, clap::Parser)]
#[command(name = "convert")]
#[command(about = "Convert between Markdown and the site's rich text format")]
#[command(after_help = "EXAMPLES:
  # Markdown to ADF (Cloud) or storage XHTML (Data Center), per the config:
  skilltools convert to-target notes.md --pretty

  # Force a target format:
  echo '# Title' | skilltools convert to-target --target datacenter

  # ADF or storage back to Markdown:
  skilltools convert to-markdown page.json --source cloud")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Convert Markdown to ADF JSON or storage XHTML
    #[clap(name = "to-target")]
    ToTarget(ToTargetOptions),

    /// Convert ADF JSON or storage XHTML to Markdown
    #[clap(name = "to-markdown")]
    ToMarkdown(ToMarkdownOptions),
}

#[derive(Debug, clap::Args, Clone)]
pub struct ToTargetOptions {
    /// Markdown file (reads stdin when omitted or "-")
    pub file: Option<PathBuf>,

    /// Deployment type to convert for (default: the configured one)
    #[arg(long)]
    pub target: Option<String>,

    /// Pretty-print ADF JSON
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct ToMarkdownOptions {
    /// ADF or storage file (reads stdin when omitted or "-")
    pub file: Option<PathBuf>,

    /// Deployment type the input came from (default: the configured one)
    #[arg(long)]
    pub source: Option<String>,
}

/// Read a whole file, or stdin for `None` and `-`.
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .wrap_err("Failed to read stdin")?;
            Ok(input)
        }
    }
}

/// Format name from the flag, else the configured deployment's name.
///
/// The config is only read when no name is given.
fn format_name(explicit: Option<&str>, global: &Global) -> Result<String> {
    match explicit {
        Some(name) => Ok(name.to_string()),
        None => {
            let settings = Settings::load(global)?;
            let (deployment, _) = settings.deployment()?;
            Ok(deployment.as_str().to_string())
        }
    }
}

pub fn run(app: App, global: &Global) -> Result<()> {
    match app.command {
        Commands::ToTarget(options) => {
            let name = format_name(options.target.as_deref(), global)?;
            let markdown = read_input(options.file.as_deref())?;
            let target = convert_markdown(&markdown, &name)?;
            log::debug!("converted {} bytes for {}", markdown.len(), target.deployment());
            println!("{}", target.to_string_pretty(options.pretty));
        }
        Commands::ToMarkdown(options) => {
            let name = format_name(options.source.as_deref(), global)?;
            let raw = read_input(options.file.as_deref())?;
            println!("{}", render_markdown(&raw, &name)?);
        }
    }

    Ok(())
}
