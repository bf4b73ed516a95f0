//! JQL / CQL scoping
//!
//! A configured scope (for example `project = DEMO`) is combined with the
//! query typed on the command line so every search stays inside it.

/// Results per page when neither the command line nor the config says otherwise.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Largest page Jira and Confluence hand out in one request.
pub const API_MAX_RESULTS: usize = 100;

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Combine a user query with a configured scope.
///
/// Both values are trimmed first, and whitespace-only values count as absent.
///
/// - query and scope: `(scope) AND (query)`
/// - scope only: the trimmed scope
/// - query only: the trimmed query
/// - neither: an empty string, which callers treat as "nothing to search"
pub fn effective_query(user_query: Option<&str>, scope: Option<&str>) -> String {
    match (present(user_query), present(scope)) {
        (Some(query), Some(scope)) => format!("({scope}) AND ({query})"),
        (None, Some(scope)) => scope.to_string(),
        (Some(query), None) => query.to_string(),
        (None, None) => String::new(),
    }
}

/// Scope for one search: `--no-scope` drops it, `--scope` replaces the
/// configured one.
pub fn select_scope<'a>(
    cli_scope: Option<&'a str>,
    disabled: bool,
    configured: Option<&'a str>,
) -> Option<&'a str> {
    if disabled {
        return None;
    }
    present(cli_scope).or(present(configured))
}

/// Page size for a search: the flag beats the config, which beats `fallback`.
///
/// The result is kept within `1..=API_MAX_RESULTS`.
pub fn effective_max_results(
    cli: Option<usize>,
    configured: Option<usize>,
    fallback: usize,
) -> usize {
    cli.or(configured)
        .unwrap_or(fallback)
        .clamp(1, API_MAX_RESULTS)
}
