//! Markdown ⇄ Atlassian content conversion
//!
//! Cloud products store rich text as ADF (a JSON tree), Data Center and
//! Server as XHTML storage format. Both directions go through the
//! [`document::Document`] model, so every target shares one Markdown parser
//! and one Markdown renderer.
//!
//! Conversions are total: malformed Markdown or content the model cannot
//! represent degrades to plain text. The only failure is an unknown
//! deployment name.

pub mod adf;
pub mod document;
pub mod markdown;
pub mod storage;

#[cfg(test)]
mod roundtrip_proptests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use document::{Block, Document, Inline};

/// Errors raised by the converter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unsupported deployment type '{0}' (expected 'cloud' or 'datacenter')")]
    UnsupportedDeployment(String),
}

/// Which flavour of Atlassian product a site runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeploymentType {
    Cloud,
    DataCenter,
}

impl DeploymentType {
    /// Cloud sites live under `atlassian.net`; everything else is self-hosted.
    pub fn infer_from_url(base_url: &str) -> Self {
        let host = base_url
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split(['/', ':'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if host == "atlassian.net" || host.ends_with(".atlassian.net") {
            DeploymentType::Cloud
        } else {
            DeploymentType::DataCenter
        }
    }

    /// Jira REST root: v3 speaks ADF, v2 speaks plain text and wiki markup.
    pub fn jira_api_root(&self) -> &'static str {
        match self {
            DeploymentType::Cloud => "/rest/api/3",
            DeploymentType::DataCenter => "/rest/api/2",
        }
    }

    /// Confluence body representation name for this deployment.
    pub fn confluence_representation(&self) -> &'static str {
        match self {
            DeploymentType::Cloud => "atlas_doc_format",
            DeploymentType::DataCenter => "storage",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentType::Cloud => "cloud",
            DeploymentType::DataCenter => "datacenter",
        }
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentType {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cloud" => Ok(DeploymentType::Cloud),
            "datacenter" | "data-center" | "data_center" | "dc" | "server" => {
                Ok(DeploymentType::DataCenter)
            }
            _ => Err(FormatError::UnsupportedDeployment(value.to_string())),
        }
    }
}

impl TryFrom<String> for DeploymentType {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeploymentType> for String {
    fn from(value: DeploymentType) -> Self {
        value.as_str().to_string()
    }
}

/// Converted content, tagged with the representation it is in.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetDocument {
    Adf(Value),
    Storage(String),
}

impl TargetDocument {
    pub fn deployment(&self) -> DeploymentType {
        match self {
            TargetDocument::Adf(_) => DeploymentType::Cloud,
            TargetDocument::Storage(_) => DeploymentType::DataCenter,
        }
    }

    /// Serialize for printing or for an API body.
    ///
    /// Storage is returned verbatim; ADF as compact or pretty JSON.
    pub fn to_string_pretty(&self, pretty: bool) -> String {
        match self {
            TargetDocument::Storage(xhtml) => xhtml.clone(),
            TargetDocument::Adf(value) if pretty => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            TargetDocument::Adf(value) => value.to_string(),
        }
    }
}

/// Convert Markdown into the representation `deployment` stores.
pub fn to_target(markdown: &str, deployment: DeploymentType) -> TargetDocument {
    let document = markdown::parse(markdown);
    match deployment {
        DeploymentType::Cloud => TargetDocument::Adf(adf::from_document(&document)),
        DeploymentType::DataCenter => TargetDocument::Storage(storage::from_document(&document)),
    }
}

/// [`to_target`] with the deployment given by name.
///
/// The name is validated before any parsing happens.
pub fn convert_markdown(markdown: &str, deployment: &str) -> Result<TargetDocument, FormatError> {
    let deployment = deployment.parse::<DeploymentType>()?;
    Ok(to_target(markdown, deployment))
}

/// Convert stored content back to Markdown.
pub fn to_markdown(target: &TargetDocument) -> String {
    let document = match target {
        TargetDocument::Adf(value) => adf::to_document(value),
        TargetDocument::Storage(xhtml) => storage::to_document(xhtml),
    };
    markdown::render(&document)
}

/// Render raw fetched content as Markdown.
///
/// Cloud content is ADF JSON text; when it does not parse, the raw text is
/// shown as a single paragraph instead.
pub fn render_markdown(raw: &str, deployment: &str) -> Result<String, FormatError> {
    let deployment = deployment.parse::<DeploymentType>()?;
    Ok(render_raw(raw, deployment))
}

pub fn render_raw(raw: &str, deployment: DeploymentType) -> String {
    match deployment {
        DeploymentType::Cloud => match serde_json::from_str::<Value>(raw) {
            Ok(value) => to_markdown(&TargetDocument::Adf(value)),
            Err(_) => literal_paragraph(raw),
        },
        DeploymentType::DataCenter => to_markdown(&TargetDocument::Storage(raw.to_string())),
    }
}

fn literal_paragraph(raw: &str) -> String {
    let text = document::collapse_whitespace(raw);
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    markdown::render(&Document::new(vec![Block::Paragraph(vec![Inline::text(
        text,
    )])]))
}

/// Canonical form of a Markdown document, used to compare round trips.
pub fn normalize(markdown: &str) -> String {
    markdown::render(&markdown::parse(markdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deployment_type_parsing() {
        assert_eq!("cloud".parse(), Ok(DeploymentType::Cloud));
        assert_eq!("Cloud".parse(), Ok(DeploymentType::Cloud));
        assert_eq!("datacenter".parse(), Ok(DeploymentType::DataCenter));
        assert_eq!("data-center".parse(), Ok(DeploymentType::DataCenter));
        assert_eq!("DC".parse(), Ok(DeploymentType::DataCenter));
        assert_eq!("server".parse(), Ok(DeploymentType::DataCenter));
        assert_eq!(
            "unknown".parse::<DeploymentType>(),
            Err(FormatError::UnsupportedDeployment("unknown".to_string()))
        );
    }

    #[test]
    fn test_deployment_type_infer_from_url() {
        assert_eq!(
            DeploymentType::infer_from_url("https://acme.atlassian.net"),
            DeploymentType::Cloud
        );
        assert_eq!(
            DeploymentType::infer_from_url("https://ACME.atlassian.net/wiki"),
            DeploymentType::Cloud
        );
        assert_eq!(
            DeploymentType::infer_from_url("https://jira.acme.io:8443"),
            DeploymentType::DataCenter
        );
        assert_eq!(
            DeploymentType::infer_from_url("https://atlassian.net.evil.io"),
            DeploymentType::DataCenter
        );
    }

    #[test]
    fn test_deployment_type_serde() {
        let parsed: DeploymentType = serde_json::from_value(json!("server")).unwrap();
        assert_eq!(parsed, DeploymentType::DataCenter);
        assert_eq!(serde_json::to_value(parsed).unwrap(), json!("datacenter"));
        assert!(serde_json::from_value::<DeploymentType>(json!("mainframe")).is_err());
    }

    #[test]
    fn test_code_block_to_adf_keeps_language() {
        let target = to_target("```python\nprint(1)\n```", DeploymentType::Cloud);

        let TargetDocument::Adf(value) = target else {
            panic!("expected ADF");
        };
        let node = &value["content"][0];
        assert_eq!(node["type"], "codeBlock");
        assert_eq!(node["attrs"]["language"], "python");
        assert_eq!(node["content"][0]["text"], "print(1)");
    }

    #[test]
    fn test_code_block_to_storage_keeps_language() {
        let target = to_target("```python\nprint(1)\n```", DeploymentType::DataCenter);

        let TargetDocument::Storage(xhtml) = target else {
            panic!("expected storage");
        };
        assert!(xhtml.contains(r#"<ac:structured-macro ac:name="code">"#));
        assert!(xhtml.contains(r#"<ac:parameter ac:name="language">python</ac:parameter>"#));
        assert!(xhtml.contains("<![CDATA[print(1)]]>"));
        assert!(!xhtml.contains("```"));
    }

    #[test]
    fn test_convert_markdown_rejects_unknown_deployment() {
        let result = convert_markdown("# Title", "unknown");
        assert_eq!(
            result,
            Err(FormatError::UnsupportedDeployment("unknown".to_string()))
        );
    }

    #[test]
    fn test_round_trip_both_deployments() {
        let markdown = "# Release notes\n\n\
                        Some **bold**, *italic* and `code` with a [link](https://example.com).\n\n\
                        - first\n- second **item**\n\n\
                        1. one\n2. two\n\n\
                        > quoted *text*\n\n\
                        ```rust\nfn main() {}\n```";

        for deployment in [DeploymentType::Cloud, DeploymentType::DataCenter] {
            let target = to_target(markdown, deployment);
            assert_eq!(target.deployment(), deployment);
            assert_eq!(to_markdown(&target), normalize(markdown), "{deployment}");
        }
    }

    #[test]
    fn test_round_trip_normalizes_whitespace() {
        let markdown = "Heading\n\n\n* a\n* b\n\n\n\nline one\nline two   \n";

        for deployment in [DeploymentType::Cloud, DeploymentType::DataCenter] {
            let back = to_markdown(&to_target(markdown, deployment));
            assert_eq!(back, "Heading\n\n- a\n- b\n\nline one line two");
        }
    }

    #[test]
    fn test_round_trip_drops_empty_list_items() {
        let markdown = "- a\n- \n- b";

        assert_eq!(normalize(markdown), "- a\n- b");
        assert_eq!(normalize(&normalize(markdown)), normalize(markdown));
        for deployment in [DeploymentType::Cloud, DeploymentType::DataCenter] {
            let back = to_markdown(&to_target(markdown, deployment));
            assert_eq!(back, "- a\n- b", "{deployment}");
        }
    }

    #[test]
    fn test_round_trip_link_without_text() {
        let markdown = "see [](https://x.io)";

        for deployment in [DeploymentType::Cloud, DeploymentType::DataCenter] {
            let back = to_markdown(&to_target(markdown, deployment));
            assert_eq!(back, "see [https://x.io](https://x.io)", "{deployment}");
            assert_eq!(back, normalize(markdown));
        }
    }

    #[test]
    fn test_adjacent_emphasis_from_storage_round_trips() {
        // Arrange
        let raw = "<p><strong>a</strong><em>b</em>c</p>";

        // Act
        let markdown = render_markdown(raw, "datacenter").unwrap();
        let back = to_target(&markdown, DeploymentType::DataCenter);

        // Assert
        assert_eq!(markdown, "__a__*b*c");
        assert_eq!(normalize(&markdown), markdown);
        assert_eq!(back.to_string_pretty(false), raw);
    }

    #[test]
    fn test_unterminated_fence_is_literal_text() {
        let markdown = "```python\nprint(1)";

        for deployment in [DeploymentType::Cloud, DeploymentType::DataCenter] {
            let back = to_markdown(&to_target(markdown, deployment));
            assert_eq!(back, normalize(markdown));
            assert!(back.contains("print(1)"));
        }
    }

    #[test]
    fn test_render_markdown_from_raw_adf() {
        let raw = json!({
            "type": "doc",
            "version": 1,
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "Hi"}]}
            ]
        })
        .to_string();

        assert_eq!(render_markdown(&raw, "cloud"), Ok("Hi".to_string()));
    }

    #[test]
    fn test_render_markdown_invalid_adf_degrades() {
        assert_eq!(
            render_markdown("not {json", "cloud"),
            Ok("not {json".to_string())
        );
        assert_eq!(render_markdown("   ", "cloud"), Ok(String::new()));
    }

    #[test]
    fn test_render_markdown_from_storage() {
        let raw = "<h1>Title</h1><p>Body <em>text</em></p>";
        assert_eq!(
            render_markdown(raw, "datacenter"),
            Ok("# Title\n\nBody *text*".to_string())
        );
    }

    #[test]
    fn test_target_document_serialization() {
        let adf = to_target("hi", DeploymentType::Cloud);
        assert!(adf.to_string_pretty(false).starts_with("{\""));
        assert!(adf.to_string_pretty(true).contains('\n'));

        let storage = to_target("hi", DeploymentType::DataCenter);
        assert_eq!(storage.to_string_pretty(true), "<p>hi</p>");
    }
}
