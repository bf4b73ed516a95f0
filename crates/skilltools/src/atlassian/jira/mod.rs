pub mod create;
pub mod get;
pub mod search;

use colored::Colorize;
use skilltools_core::atlassian::jira::{IssueOutput, SearchOutput};

use crate::config::Settings;
use crate::prelude::{println, *};

/// Jira commands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Search Jira issues using JQL, scoped by the configured default scope
    #[clap(name = "search")]
    Search(search::SearchOptions),

    /// Get detailed information about a Jira issue
    #[clap(name = "get")]
    Get(get::GetOptions),

    /// Create a new Jira issue, filling unset fields from project defaults
    #[clap(name = "create")]
    Create(create::CreateOptions),
}

/// Run Jira commands
pub async fn run(cmd: Commands, settings: &Settings) -> Result<()> {
    if settings.verbose {
        println!("Running Jira command...");
    }

    match cmd {
        Commands::Search(options) => search::handler(options, settings).await,
        Commands::Get(options) => get::handler(options, settings).await,
        Commands::Create(options) => create::handler(options, settings).await,
    }
}

/// Display search results as a table
fn display_search(output: &SearchOutput) {
    if output.issues.is_empty() {
        println!("No issues found.");
        return;
    }

    println!(
        "Found {} of {} issue(s) for {}\n",
        output.issues.len(),
        output.total,
        output.jql.bright_black()
    );

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Key".bold().cyan(),
        "Summary".bold().cyan(),
        "Status".bold().cyan(),
        "Type".bold().cyan(),
        "Assignee".bold().cyan()
    ]);

    for issue in &output.issues {
        table.add_row(prettytable::row![
            issue.key.bold().to_string(),
            &issue.summary,
            issue.status.green().to_string(),
            issue.issue_type.as_deref().unwrap_or("-"),
            issue.assignee.as_deref().unwrap_or("Unassigned")
        ]);
    }

    table.printstd();
}

/// Display an issue's details as a formatted CLI table.
///
/// The description and comments are already Markdown.
fn display_issue(issue: &IssueOutput) {
    std::println!(
        "\n{} - {}\n",
        issue.key.bold().cyan(),
        issue.summary.bright_white()
    );

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Status".bold().cyan(),
        issue.status.green().to_string()
    ]);

    if let Some(priority) = &issue.priority {
        table.add_row(prettytable::row![
            "Priority".bold().cyan(),
            priority.bright_yellow().to_string()
        ]);
    }

    if let Some(issue_type) = &issue.issue_type {
        table.add_row(prettytable::row![
            "Type".bold().cyan(),
            issue_type.bright_blue().to_string()
        ]);
    }

    let assignee = match &issue.assignee {
        Some(name) => name.bright_magenta().to_string(),
        None => "Unassigned".bright_black().to_string(),
    };
    table.add_row(prettytable::row!["Assignee".bold().cyan(), assignee]);

    if let Some(reporter) = &issue.reporter {
        table.add_row(prettytable::row!["Reporter".bold().cyan(), reporter]);
    }

    for (label, value) in [("Created", &issue.created), ("Updated", &issue.updated)] {
        if let Some(value) = value {
            table.add_row(prettytable::row![
                label.bold().cyan(),
                value.bright_black().to_string()
            ]);
        }
    }

    table.add_row(prettytable::row!["URL".bold().cyan(), &issue.url]);
    table.printstd();

    if !issue.labels.is_empty() {
        std::println!(
            "\n{}: {}",
            "Labels".bold().cyan(),
            issue.labels.join(", ").bright_green()
        );
    }

    if let Some(description) = &issue.description {
        std::println!("\n{}:", "Description".bold().cyan());
        std::println!("{}\n", description);
    }

    if !issue.comments.is_empty() {
        std::println!("\n{}", "Comments:".bold().cyan());
        for (index, comment) in issue.comments.iter().enumerate() {
            std::println!(
                "\n{} {} {}",
                format!("{}.", index + 1).green(),
                comment
                    .author
                    .as_deref()
                    .unwrap_or("Unknown")
                    .bright_magenta(),
                format!("[{}]", comment.created.as_deref().unwrap_or("-")).blue()
            );
            std::println!("{}", comment.body);
        }
    }
}
