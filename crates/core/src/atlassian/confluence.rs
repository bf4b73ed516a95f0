//! Pure transformation functions for Confluence API requests and responses
//!
//! Both Cloud and Data Center expose the v1 content API; they differ in the
//! REST root and in the body representation (`atlas_doc_format` holding ADF
//! JSON as a string, or `storage` holding XHTML).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::defaults::{FieldMap, LABELS, PARENT_PAGE};
use crate::format::{self, DeploymentType, TargetDocument};

// ============================================================================
// Domain Models (Input from API)
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PageLinks {
    #[serde(default)]
    pub webui: Option<String>,
    /// Site root for `webui`, e.g. `https://acme.atlassian.net/wiki`
    #[serde(default)]
    pub base: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpaceRef {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VersionRef {
    pub number: u64,
    #[serde(default)]
    pub when: Option<String>,
}

/// One representation of a page body
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BodyValue {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PageBody {
    #[serde(default)]
    pub storage: Option<BodyValue>,
    #[serde(default)]
    pub atlas_doc_format: Option<BodyValue>,
}

/// Content entity as returned by search, get and create
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConfluencePageResponse {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub space: Option<SpaceRef>,
    #[serde(default)]
    pub version: Option<VersionRef>,
    #[serde(default)]
    pub body: Option<PageBody>,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfluenceSearchResponse {
    #[serde(default)]
    pub results: Vec<ConfluencePageResponse>,
    #[serde(default)]
    pub size: usize,
    #[serde(default, rename = "totalSize")]
    pub total_size: Option<usize>,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

// ============================================================================
// Output Models
// ============================================================================

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub space: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SearchOutput {
    /// The CQL that was actually sent, scope included
    pub cql: String,
    pub pages: Vec<PageSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PageOutput {
    pub id: String,
    pub title: String,
    pub space: Option<String>,
    pub version: Option<u64>,
    pub updated: Option<String>,
    pub url: Option<String>,
    /// Page body as Markdown
    pub content: String,
}

// ============================================================================
// Pure Transformation Functions
// ============================================================================

/// Where `webui` links are relative to when the response does not say.
///
/// Cloud serves Confluence under `/wiki`.
pub fn web_base(base_url: &str, deployment: DeploymentType) -> String {
    let base = base_url.trim_end_matches('/');
    match deployment {
        DeploymentType::Cloud if !base.ends_with("/wiki") => format!("{base}/wiki"),
        _ => base.to_string(),
    }
}

fn page_url(links: &PageLinks, fallback_base: &str) -> Option<String> {
    let webui = links.webui.as_deref()?;
    if webui.starts_with("http://") || webui.starts_with("https://") {
        return Some(webui.to_string());
    }
    let base = links.base.as_deref().unwrap_or(fallback_base);
    Some(format!("{}{}", base.trim_end_matches('/'), webui))
}

/// Convert a search response into output rows
pub fn transform_search_results(
    response: ConfluenceSearchResponse,
    cql: &str,
    base_url: &str,
    deployment: DeploymentType,
) -> SearchOutput {
    let fallback = response
        .links
        .base
        .clone()
        .unwrap_or_else(|| web_base(base_url, deployment));

    let pages: Vec<PageSummary> = response
        .results
        .into_iter()
        .map(|page| PageSummary {
            url: page_url(&page.links, &fallback),
            id: page.id,
            title: page.title,
            space: page.space.map(|space| space.key),
        })
        .collect();

    SearchOutput {
        cql: cql.to_string(),
        total: response.total_size.unwrap_or(response.size.max(pages.len())),
        pages,
    }
}

/// Render the body representation `deployment` asked for as Markdown.
pub fn body_markdown(body: Option<&PageBody>, deployment: DeploymentType) -> String {
    let raw = body.and_then(|body| match deployment {
        DeploymentType::Cloud => body.atlas_doc_format.as_ref(),
        DeploymentType::DataCenter => body.storage.as_ref(),
    });

    match raw {
        Some(raw) => format::render_raw(&raw.value, deployment),
        None => String::new(),
    }
}

/// Convert a fetched page into the detailed view
pub fn transform_page_response(
    page: ConfluencePageResponse,
    base_url: &str,
    deployment: DeploymentType,
) -> PageOutput {
    let fallback = web_base(base_url, deployment);

    PageOutput {
        content: body_markdown(page.body.as_ref(), deployment),
        url: page_url(&page.links, &fallback),
        id: page.id,
        title: page.title,
        space: page.space.map(|space| space.key),
        version: page.version.as_ref().map(|version| version.number),
        updated: page.version.and_then(|version| version.when),
    }
}

/// Build the body of a create-page request.
///
/// `resolved` holds the explicit fields merged with the space defaults;
/// `parent_page` becomes the single ancestor and `labels` page labels.
pub fn build_create_page_payload(
    space: &str,
    title: &str,
    markdown: &str,
    resolved: &FieldMap,
    deployment: DeploymentType,
) -> Value {
    let body = match format::to_target(markdown, deployment) {
        TargetDocument::Adf(adf) => json!({
            "atlas_doc_format": {
                "value": adf.to_string(),
                "representation": "atlas_doc_format"
            }
        }),
        TargetDocument::Storage(xhtml) => json!({
            "storage": {
                "value": xhtml,
                "representation": "storage"
            }
        }),
    };

    let mut payload = json!({
        "type": "page",
        "title": title,
        "space": { "key": space },
        "body": body,
    });

    if let Some(parent) = resolved
        .get(PARENT_PAGE)
        .and_then(|value| value.as_text())
        .map(str::trim)
        .filter(|parent| !parent.is_empty())
    {
        payload["ancestors"] = json!([{ "id": parent }]);
    }

    if let Some(labels) = resolved.get(LABELS) {
        let labels: Vec<Value> = labels
            .as_list()
            .iter()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .map(|label| json!({ "prefix": "global", "name": label }))
            .collect();
        if !labels.is_empty() {
            payload["metadata"] = json!({ "labels": labels });
        }
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::FieldValue;

    // Helper to create a page response for testing
    fn create_page_response(id: &str, title: &str, webui: Option<&str>) -> ConfluencePageResponse {
        ConfluencePageResponse {
            id: id.to_string(),
            title: title.to_string(),
            page_type: Some("page".to_string()),
            space: Some(SpaceRef {
                key: "ENG".to_string(),
                name: None,
            }),
            version: None,
            body: None,
            links: PageLinks {
                webui: webui.map(|s| s.to_string()),
                base: None,
            },
        }
    }

    #[test]
    fn test_transform_search_results_basic() {
        // Arrange
        let response = ConfluenceSearchResponse {
            results: vec![
                create_page_response("1", "Runbook", Some("/spaces/ENG/pages/1")),
                create_page_response("2", "Orphan", None),
            ],
            size: 2,
            total_size: Some(7),
            links: PageLinks::default(),
        };

        // Act
        let output = transform_search_results(
            response,
            "space = ENG",
            "https://acme.atlassian.net",
            DeploymentType::Cloud,
        );

        // Assert
        assert_eq!(output.cql, "space = ENG");
        assert_eq!(output.total, 7);
        assert_eq!(
            output.pages[0].url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/ENG/pages/1")
        );
        assert_eq!(output.pages[0].space.as_deref(), Some("ENG"));
        assert_eq!(output.pages[1].url, None);
    }

    #[test]
    fn test_transform_search_results_prefers_response_base() {
        // Arrange
        let response: ConfluenceSearchResponse = serde_json::from_value(json!({
            "results": [{"id": "9", "title": "T", "_links": {"webui": "/display/OPS/T"}}],
            "size": 1,
            "_links": {"base": "https://wiki.acme.io/confluence"}
        }))
        .unwrap();

        // Act
        let output = transform_search_results(
            response,
            "",
            "https://wiki.acme.io",
            DeploymentType::DataCenter,
        );

        // Assert
        assert_eq!(output.total, 1);
        assert_eq!(
            output.pages[0].url.as_deref(),
            Some("https://wiki.acme.io/confluence/display/OPS/T")
        );
    }

    #[test]
    fn test_transform_page_response_storage() {
        // Arrange
        let page: ConfluencePageResponse = serde_json::from_value(json!({
            "id": "42",
            "title": "Deploy",
            "space": {"key": "OPS"},
            "version": {"number": 3, "when": "2024-05-01T10:00:00.000Z"},
            "body": {"storage": {"value": "<h1>Deploy</h1><p>Run <code>make</code></p>", "representation": "storage"}},
            "_links": {"webui": "/pages/viewpage.action?pageId=42"}
        }))
        .unwrap();

        // Act
        let output =
            transform_page_response(page, "https://wiki.acme.io/", DeploymentType::DataCenter);

        // Assert
        assert_eq!(output.content, "# Deploy\n\nRun `make`");
        assert_eq!(output.version, Some(3));
        assert_eq!(output.updated.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(
            output.url.as_deref(),
            Some("https://wiki.acme.io/pages/viewpage.action?pageId=42")
        );
    }

    #[test]
    fn test_body_markdown_cloud_adf_string() {
        let adf = json!({
            "type": "doc", "version": 1,
            "content": [{"type": "bulletList", "content": [
                {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "a"}]}]}
            ]}]
        });
        let body = PageBody {
            storage: None,
            atlas_doc_format: Some(BodyValue {
                value: adf.to_string(),
            }),
        };

        assert_eq!(body_markdown(Some(&body), DeploymentType::Cloud), "- a");
        assert_eq!(body_markdown(Some(&body), DeploymentType::DataCenter), "");
        assert_eq!(body_markdown(None, DeploymentType::Cloud), "");
    }

    #[test]
    fn test_build_create_page_payload_storage() {
        // Arrange
        let mut resolved = FieldMap::new();
        resolved.insert(PARENT_PAGE.to_string(), "12345".into());
        resolved.insert(
            LABELS.to_string(),
            FieldValue::List(vec!["runbook".to_string(), "".to_string()]),
        );

        // Act
        let payload = build_create_page_payload(
            "ENG",
            "On-call",
            "```python\nprint(1)\n```",
            &resolved,
            DeploymentType::DataCenter,
        );

        // Assert
        assert_eq!(payload["type"], "page");
        assert_eq!(payload["space"]["key"], "ENG");
        assert_eq!(payload["ancestors"], json!([{"id": "12345"}]));
        assert_eq!(
            payload["metadata"]["labels"],
            json!([{"prefix": "global", "name": "runbook"}])
        );
        let value = payload["body"]["storage"]["value"].as_str().unwrap();
        assert!(value.contains(r#"<ac:parameter ac:name="language">python</ac:parameter>"#));
    }

    #[test]
    fn test_build_create_page_payload_cloud_without_defaults() {
        let payload = build_create_page_payload(
            "ENG",
            "Notes",
            "# Hi",
            &FieldMap::new(),
            DeploymentType::Cloud,
        );

        assert!(payload.get("ancestors").is_none());
        assert!(payload.get("metadata").is_none());
        let value = payload["body"]["atlas_doc_format"]["value"].as_str().unwrap();
        let adf: Value = serde_json::from_str(value).unwrap();
        assert_eq!(adf["content"][0]["type"], "heading");
    }

    #[test]
    fn test_web_base() {
        assert_eq!(
            web_base("https://acme.atlassian.net/", DeploymentType::Cloud),
            "https://acme.atlassian.net/wiki"
        );
        assert_eq!(
            web_base("https://acme.atlassian.net/wiki", DeploymentType::Cloud),
            "https://acme.atlassian.net/wiki"
        );
        assert_eq!(
            web_base("https://wiki.acme.io", DeploymentType::DataCenter),
            "https://wiki.acme.io"
        );
    }
}
