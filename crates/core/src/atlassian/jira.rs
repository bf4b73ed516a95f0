//! Transformation functions for Jira API requests and responses

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::defaults::{FieldMap, ISSUE_TYPE, LABELS, PRIORITY};
use crate::format::{self, DeploymentType, TargetDocument};

/// Issue type used when neither the command line nor the project defaults name one.
///
/// Jira refuses to create an issue without a type.
pub const FALLBACK_ISSUE_TYPE: &str = "Task";

/// Fields requested from the search and issue endpoints
pub const ISSUE_FIELDS: &str =
    "summary,status,assignee,reporter,priority,issuetype,labels,created,updated,description";

/// Any Jira entity that is only shown by name (status, priority, issue type)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraNamed {
    #[serde(default)]
    pub name: String,
}

/// Jira user field
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraUser {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,
}

impl JiraUser {
    /// Prefer the display name over the email address
    fn label(&self) -> Option<String> {
        self.display_name
            .clone()
            .or_else(|| self.email_address.clone())
    }
}

/// Fields of an issue as returned by search and get
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueFields {
    #[serde(default)]
    pub summary: String,
    /// ADF object on Cloud, plain string on Data Center
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub status: Option<JiraNamed>,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    #[serde(default)]
    pub reporter: Option<JiraUser>,
    #[serde(default)]
    pub priority: Option<JiraNamed>,
    #[serde(default)]
    pub issuetype: Option<JiraNamed>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueResponse {
    pub key: String,
    pub fields: JiraIssueFields,
}

/// Search response; Cloud pages with `nextPageToken`, Data Center with `startAt`
#[derive(Debug, Deserialize, Clone)]
pub struct JiraSearchResponse {
    #[serde(default)]
    pub issues: Vec<JiraIssueResponse>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct JiraComment {
    #[serde(default)]
    pub author: Option<JiraUser>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct JiraCommentsResponse {
    #[serde(default)]
    pub comments: Vec<JiraComment>,
}

/// Response of `POST /issue`
#[derive(Debug, Deserialize, Clone)]
pub struct JiraCreateResponse {
    pub id: String,
    pub key: String,
}

/// One row of search output
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SearchOutput {
    /// The JQL that was actually sent, scope included
    pub jql: String,
    pub issues: Vec<IssueSummary>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CommentOutput {
    pub author: Option<String>,
    pub created: Option<String>,
    /// Comment body as Markdown
    pub body: String,
}

/// Detailed view of one issue
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueOutput {
    pub key: String,
    pub url: String,
    pub summary: String,
    pub status: String,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub labels: Vec<String>,
    /// Description as Markdown
    pub description: Option<String>,
    pub comments: Vec<CommentOutput>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    pub url: String,
}

/// Render a rich-text field (description, comment body) as Markdown.
///
/// Cloud returns ADF objects; Data Center returns wiki-markup strings, which
/// are shown as they are.
pub fn field_markdown(value: Option<&Value>) -> Option<String> {
    let rendered = match value? {
        Value::String(text) => text.trim().to_string(),
        adf @ Value::Object(_) => format::to_markdown(&TargetDocument::Adf(adf.clone())),
        _ => return None,
    };
    (!rendered.is_empty()).then_some(rendered)
}

fn name_of(named: Option<JiraNamed>) -> Option<String> {
    named.map(|n| n.name).filter(|name| !name.is_empty())
}

/// Convert a search response into output rows
pub fn transform_search_response(response: JiraSearchResponse, jql: &str) -> SearchOutput {
    let issues: Vec<IssueSummary> = response
        .issues
        .into_iter()
        .map(|issue| IssueSummary {
            key: issue.key,
            summary: issue.fields.summary,
            status: name_of(issue.fields.status).unwrap_or_else(|| "Unknown".to_string()),
            assignee: issue.fields.assignee.as_ref().and_then(JiraUser::label),
            priority: name_of(issue.fields.priority),
            issue_type: name_of(issue.fields.issuetype),
        })
        .collect();

    let total = response
        .total
        .map(|total| total as usize)
        .unwrap_or(issues.len());

    SearchOutput {
        jql: jql.to_string(),
        issues,
        total,
        next_page_token: response.next_page_token,
    }
}

/// Convert an issue and its comments into the detailed view
pub fn transform_issue_response(
    issue: JiraIssueResponse,
    comments: Vec<JiraComment>,
    base_url: &str,
) -> IssueOutput {
    let fields = issue.fields;

    IssueOutput {
        url: browse_url(base_url, &issue.key),
        key: issue.key,
        summary: fields.summary,
        status: name_of(fields.status).unwrap_or_else(|| "Unknown".to_string()),
        priority: name_of(fields.priority),
        issue_type: name_of(fields.issuetype),
        assignee: fields.assignee.as_ref().and_then(JiraUser::label),
        reporter: fields.reporter.as_ref().and_then(JiraUser::label),
        created: fields.created,
        updated: fields.updated,
        labels: fields.labels,
        description: field_markdown(fields.description.as_ref()),
        comments: comments
            .into_iter()
            .map(|comment| CommentOutput {
                author: comment.author.as_ref().and_then(JiraUser::label),
                created: comment.created,
                body: field_markdown(comment.body.as_ref()).unwrap_or_default(),
            })
            .collect(),
    }
}

pub fn browse_url(base_url: &str, key: &str) -> String {
    format!("{}/browse/{}", base_url.trim_end_matches('/'), key)
}

pub fn transform_create_response(response: JiraCreateResponse, base_url: &str) -> CreatedIssue {
    CreatedIssue {
        url: browse_url(base_url, &response.key),
        id: response.id,
        key: response.key,
    }
}

/// Build the `fields` object of a create-issue request.
///
/// `resolved` holds the explicit fields merged with the project defaults.
/// Cloud (API v3) takes the description as ADF; Data Center (API v2) as a
/// plain string.
pub fn build_issue_fields(
    project: &str,
    summary: &str,
    description: Option<&str>,
    resolved: &FieldMap,
    deployment: DeploymentType,
) -> Value {
    let mut fields = Map::new();
    fields.insert("project".into(), json!({ "key": project }));
    fields.insert("summary".into(), json!(summary));

    let issue_type = resolved
        .get(ISSUE_TYPE)
        .and_then(|value| value.as_text())
        .unwrap_or(FALLBACK_ISSUE_TYPE);
    fields.insert("issuetype".into(), json!({ "name": issue_type }));

    if let Some(priority) = resolved.get(PRIORITY).and_then(|value| value.as_text()) {
        fields.insert("priority".into(), json!({ "name": priority }));
    }

    if let Some(labels) = resolved.get(LABELS) {
        let labels: Vec<String> = labels
            .as_list()
            .into_iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        if !labels.is_empty() {
            fields.insert("labels".into(), json!(labels));
        }
    }

    if let Some(description) = description.filter(|text| !text.trim().is_empty()) {
        let value = match deployment {
            DeploymentType::Cloud => {
                format::adf::from_document(&format::markdown::parse(description))
            }
            DeploymentType::DataCenter => json!(description),
        };
        fields.insert("description".into(), value);
    }

    json!({ "fields": fields })
}
