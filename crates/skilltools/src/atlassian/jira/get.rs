use crate::atlassian::AtlassianClient;
use crate::config::Settings;
use crate::prelude::{println, *};
use skilltools_core::atlassian::jira::{
    transform_issue_response, IssueOutput, JiraCommentsResponse, JiraIssueResponse, ISSUE_FIELDS,
};

/// Options for getting a Jira issue
#[derive(Debug, clap::Args, Clone)]
pub struct GetOptions {
    /// Issue key (e.g., PROJ-123)
    pub key: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Fetch an issue and its comments; rich text comes back as Markdown.
pub async fn get_issue_data(client: &AtlassianClient, key: &str) -> Result<IssueOutput> {
    let key = key.trim().to_uppercase();
    let encoded = urlencoding::encode(&key);

    let issue: JiraIssueResponse = client
        .get_json(
            &client.jira_url(&format!("/issue/{encoded}")),
            &[("fields", ISSUE_FIELDS.to_string())],
        )
        .await
        .wrap_err_with(|| format!("Failed to fetch issue {key}"))?;

    let comments: JiraCommentsResponse = client
        .get_json(&client.jira_url(&format!("/issue/{encoded}/comment")), &[])
        .await
        .wrap_err_with(|| format!("Failed to fetch comments for {key}"))?;

    Ok(transform_issue_response(
        issue,
        comments.comments,
        client.base_url(),
    ))
}

/// Handle the get command
pub async fn handler(options: GetOptions, settings: &Settings) -> Result<()> {
    let client = AtlassianClient::from_settings(settings)?;
    let issue = get_issue_data(&client, &options.key).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else {
        super::display_issue(&issue);
    }

    Ok(())
}
