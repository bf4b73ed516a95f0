pub mod create;
pub mod get;
pub mod search;

use colored::Colorize;
use skilltools_core::atlassian::confluence::{PageOutput, SearchOutput};

use crate::config::Settings;
use crate::prelude::{println, *};

/// Confluence commands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Search Confluence pages using CQL, scoped by the configured default scope
    #[clap(name = "search")]
    Search(search::SearchOptions),

    /// Get a Confluence page as Markdown
    #[clap(name = "get")]
    Get(get::GetOptions),

    /// Create a Confluence page from Markdown
    #[clap(name = "create")]
    Create(create::CreateOptions),
}

/// Run Confluence commands
pub async fn run(cmd: Commands, settings: &Settings) -> Result<()> {
    if settings.verbose {
        println!("Running Confluence command...");
    }

    match cmd {
        Commands::Search(options) => search::handler(options, settings).await,
        Commands::Get(options) => get::handler(options, settings).await,
        Commands::Create(options) => create::handler(options, settings).await,
    }
}

fn display_search(output: &SearchOutput) {
    if output.pages.is_empty() {
        println!("No pages found.");
        return;
    }

    println!(
        "Found {} of {} page(s) for {}\n",
        output.pages.len(),
        output.total,
        output.cql.bright_black()
    );

    let mut table = new_table();
    table.add_row(prettytable::row![
        "ID".bold().cyan(),
        "Title".bold().cyan(),
        "Space".bold().cyan(),
        "URL".bold().cyan()
    ]);

    for page in &output.pages {
        table.add_row(prettytable::row![
            &page.id,
            page.title.bold().to_string(),
            page.space.as_deref().unwrap_or("-"),
            page.url.as_deref().unwrap_or("N/A")
        ]);
    }

    table.printstd();
}

fn display_page(page: &PageOutput) {
    std::println!("\n{}\n", page.title.bold().bright_white());

    let mut table = new_table();
    table.add_row(prettytable::row!["ID".bold().cyan(), &page.id]);
    if let Some(space) = &page.space {
        table.add_row(prettytable::row!["Space".bold().cyan(), space]);
    }
    if let Some(version) = page.version {
        table.add_row(prettytable::row!["Version".bold().cyan(), version]);
    }
    if let Some(updated) = &page.updated {
        table.add_row(prettytable::row![
            "Updated".bold().cyan(),
            updated.bright_black().to_string()
        ]);
    }
    if let Some(url) = &page.url {
        table.add_row(prettytable::row!["URL".bold().cyan(), url]);
    }
    table.printstd();

    if page.content.is_empty() {
        std::println!("\n{}", "(empty page)".bright_black());
    } else {
        std::println!("\n{}", page.content);
    }
}
