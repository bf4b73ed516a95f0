use std::path::PathBuf;

use colored::Colorize;

use crate::atlassian::AtlassianClient;
use crate::config::Settings;
use crate::prelude::{println, *};
use skilltools_core::atlassian::confluence::{
    build_create_page_payload, transform_page_response, ConfluencePageResponse, PageOutput,
};
use skilltools_core::defaults::{resolve_defaults, FieldMap, FieldValue, LABELS, PARENT_PAGE};

/// Options for creating a Confluence page
#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Create a page under the space's default parent:
  skilltools confluence create \"Release notes\" --space ENG --body-file notes.md

  # Pick the parent and labels explicitly:
  skilltools confluence create \"Runbook\" --space OPS --parent 12345 --labels ops,oncall \\
    --body \"# Runbook\\n\\nSteps...\"

NOTES:
  - Without --body or --body-file the page body is read from stdin
  - Explicit flags always win over confluence.space_defaults")]
pub struct CreateOptions {
    /// Page title
    pub title: String,

    /// Space key
    #[arg(short, long, env = "CONFLUENCE_SPACE")]
    pub space: String,

    /// Page body in Markdown
    #[arg(short, long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the Markdown body from a file
    #[arg(long)]
    pub body_file: Option<PathBuf>,

    /// Parent page ID (default: space default)
    #[arg(long)]
    pub parent: Option<String>,

    /// Comma-separated labels (default: space default)
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CreateOptions {
    fn explicit_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        if let Some(parent) = &self.parent {
            fields.insert(PARENT_PAGE.to_string(), FieldValue::from(parent.as_str()));
        }
        if !self.labels.is_empty() {
            fields.insert(LABELS.to_string(), FieldValue::List(self.labels.clone()));
        }
        fields
    }

    fn markdown(&self) -> Result<String> {
        if let Some(path) = &self.body_file {
            return std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()));
        }
        if let Some(body) = &self.body {
            return Ok(body.clone());
        }
        crate::convert::read_input(None)
    }
}

/// Create a page after filling gaps from the space's defaults
pub async fn create_page_data(
    client: &AtlassianClient,
    settings: &Settings,
    options: &CreateOptions,
) -> Result<PageOutput> {
    let space = options.space.trim();
    let defaults = settings.config.confluence.defaults_for_space(space);
    let resolved = resolve_defaults(&options.explicit_fields(), &defaults);
    log::debug!("resolved fields for {space}: {resolved:?}");

    let markdown = options.markdown()?;
    let payload = build_create_page_payload(
        space,
        &options.title,
        &markdown,
        &resolved,
        client.deployment(),
    );

    let page: ConfluencePageResponse = client
        .post_json(&client.confluence_url("/content"), &payload)
        .await
        .wrap_err_with(|| format!("Failed to create page in space {space}"))?;

    Ok(transform_page_response(
        page,
        client.base_url(),
        client.deployment(),
    ))
}

/// Handle the create command
pub async fn handler(options: CreateOptions, settings: &Settings) -> Result<()> {
    let client = AtlassianClient::from_settings(settings)?;
    let page = create_page_data(&client, settings, &options).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        println!(
            "{} {} (id {}) {}",
            "Created".green().bold(),
            page.title.bold().cyan(),
            page.id,
            page.url.as_deref().unwrap_or_default().bright_black()
        );
    }

    Ok(())
}
