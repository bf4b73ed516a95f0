use crate::atlassian::AtlassianClient;
use crate::config::Settings;
use crate::prelude::{println, *};
use skilltools_core::atlassian::confluence::{
    transform_search_results, ConfluenceSearchResponse, SearchOutput,
};
use skilltools_core::query::{
    effective_max_results, effective_query, select_scope, DEFAULT_MAX_RESULTS,
};

/// Options for searching Confluence pages
#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Full-text search inside the configured default scope:
  skilltools confluence search \"text ~ 'runbook'\"

  # Search another space for this call only:
  skilltools confluence search \"title ~ 'onboarding'\" --scope \"space = HR\"

  # Ignore the default scope:
  skilltools confluence search \"type = page AND creator = currentUser()\" --no-scope")]
pub struct SearchOptions {
    /// CQL query (e.g., "text ~ 'keyword'")
    pub cql: Option<String>,

    /// Scope to use instead of confluence.default_scope
    #[arg(long, conflicts_with = "no_scope")]
    pub scope: Option<String>,

    /// Do not apply the configured default scope
    #[arg(long)]
    pub no_scope: bool,

    /// Maximum number of results to return
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run a CQL search against the v1 content search endpoint
pub async fn search_pages_data(
    client: &AtlassianClient,
    cql: &str,
    limit: usize,
) -> Result<SearchOutput> {
    let response: ConfluenceSearchResponse = client
        .get_json(
            &client.confluence_url("/content/search"),
            &[
                ("cql", cql.to_string()),
                ("limit", limit.to_string()),
                ("expand", "space".to_string()),
            ],
        )
        .await?;

    Ok(transform_search_results(
        response,
        cql,
        client.base_url(),
        client.deployment(),
    ))
}

/// Handle the search command
pub async fn handler(options: SearchOptions, settings: &Settings) -> Result<()> {
    let confluence = &settings.config.confluence;
    let scope = select_scope(
        options.scope.as_deref(),
        options.no_scope,
        confluence.default_scope.as_deref(),
    );
    let cql = effective_query(options.cql.as_deref(), scope);
    let limit = effective_max_results(
        options.max_results,
        confluence.max_results,
        DEFAULT_MAX_RESULTS,
    );

    let data = if cql.is_empty() {
        log::info!("empty CQL after scoping; skipping the request");
        SearchOutput {
            cql,
            pages: vec![],
            total: 0,
        }
    } else {
        let client = AtlassianClient::from_settings(settings)?;
        search_pages_data(&client, &cql, limit).await?
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        super::display_search(&data);
    }

    Ok(())
}
