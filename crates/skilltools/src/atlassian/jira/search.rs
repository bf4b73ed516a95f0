use crate::atlassian::AtlassianClient;
use crate::config::Settings;
use crate::prelude::{eprintln, println, *};
use skilltools_core::atlassian::jira::{
    transform_search_response, JiraSearchResponse, SearchOutput, ISSUE_FIELDS,
};
use skilltools_core::format::DeploymentType;
use skilltools_core::query::{
    effective_max_results, effective_query, select_scope, DEFAULT_MAX_RESULTS,
};

/// Options for searching Jira issues
#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Search inside the configured default scope:
  skilltools jira search \"status = Open\"

  # List everything in the default scope:
  skilltools jira search

  # Use another scope for this search only:
  skilltools jira search \"assignee = currentUser()\" --scope \"project = OPS\"

  # Ignore the default scope:
  skilltools jira search \"reporter = currentUser()\" --no-scope

NOTES:
  - The query is combined with the scope as (scope) AND (query)
  - Without a query and without a scope nothing is searched
  - Results default to jira.max_results from the config, or 10")]
pub struct SearchOptions {
    /// JQL query (e.g., "status = Open")
    pub jql: Option<String>,

    /// Scope to use instead of jira.default_scope
    #[arg(long, conflicts_with = "no_scope")]
    pub scope: Option<String>,

    /// Do not apply the configured default scope
    #[arg(long)]
    pub no_scope: bool,

    /// Maximum number of results to return
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    /// Pagination token from a previous Cloud search
    #[arg(long)]
    pub next_page: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run a JQL search. Cloud uses `search/jql` with token paging, Data Center `search`.
pub async fn search_issues_data(
    client: &AtlassianClient,
    jql: &str,
    max_results: usize,
    next_page: Option<String>,
) -> Result<SearchOutput> {
    let mut query = vec![
        ("jql", jql.to_string()),
        ("maxResults", max_results.to_string()),
        ("fields", ISSUE_FIELDS.to_string()),
    ];

    let url = match client.deployment() {
        DeploymentType::Cloud => {
            if let Some(token) = next_page {
                query.push(("nextPageToken", token));
            }
            client.jira_url("/search/jql")
        }
        DeploymentType::DataCenter => {
            if next_page.is_some() {
                log::warn!("--next-page is only supported on Cloud; ignoring it");
            }
            client.jira_url("/search")
        }
    };

    let response: JiraSearchResponse = client.get_json(&url, &query).await?;
    Ok(transform_search_response(response, jql))
}

/// Handle the search command
pub async fn handler(options: SearchOptions, settings: &Settings) -> Result<()> {
    let jira = &settings.config.jira;
    let scope = select_scope(
        options.scope.as_deref(),
        options.no_scope,
        jira.default_scope.as_deref(),
    );
    let jql = effective_query(options.jql.as_deref(), scope);
    let max_results =
        effective_max_results(options.max_results, jira.max_results, DEFAULT_MAX_RESULTS);

    let data = if jql.is_empty() {
        log::info!("empty JQL after scoping; skipping the request");
        SearchOutput {
            jql,
            issues: vec![],
            total: 0,
            next_page_token: None,
        }
    } else {
        let client = AtlassianClient::from_settings(settings)?;
        search_issues_data(&client, &jql, max_results, options.next_page).await?
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    super::display_search(&data);

    if let Some(token) = &data.next_page_token {
        eprintln!("{}", next_page_hint(&data.jql, max_results, token));
    }

    Ok(())
}

/// Command that fetches the page after `token`. The JQL already carries the scope.
fn next_page_hint(jql: &str, max_results: usize, token: &str) -> String {
    format!(
        "\nTo fetch the next page, run:\n  \
         skilltools jira search --no-scope '{jql}' -n {max_results} --next-page {token}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_hint_reuses_scoped_jql() {
        let hint = next_page_hint("(project = OPS) AND (status = Open)", 25, "tok-2");

        assert!(hint.starts_with("\nTo fetch the next page, run:\n"));
        assert!(hint.ends_with(
            "skilltools jira search --no-scope '(project = OPS) AND (status = Open)' \
             -n 25 --next-page tok-2"
        ));
    }
}
