use crate::atlassian::AtlassianClient;
use crate::config::Settings;
use crate::prelude::{println, *};
use skilltools_core::atlassian::confluence::{
    transform_page_response, ConfluencePageResponse, PageOutput,
};

/// Options for getting a Confluence page
#[derive(Debug, clap::Args, Clone)]
pub struct GetOptions {
    /// Page ID
    pub id: String,

    /// Print only the Markdown body
    #[arg(long, conflicts_with = "json")]
    pub raw: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Fetch a page in the deployment's native body format and render it as Markdown
pub async fn get_page_data(client: &AtlassianClient, id: &str) -> Result<PageOutput> {
    let id = id.trim();
    let representation = client.deployment().confluence_representation();

    let page: ConfluencePageResponse = client
        .get_json(
            &client.confluence_url(&format!("/content/{}", urlencoding::encode(id))),
            &[("expand", format!("body.{representation},version,space"))],
        )
        .await
        .wrap_err_with(|| format!("Failed to fetch page {id}"))?;

    Ok(transform_page_response(
        page,
        client.base_url(),
        client.deployment(),
    ))
}

/// Handle the get command
pub async fn handler(options: GetOptions, settings: &Settings) -> Result<()> {
    let client = AtlassianClient::from_settings(settings)?;
    let page = get_page_data(&client, &options.id).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else if options.raw {
        println!("{}", page.content);
    } else {
        super::display_page(&page);
    }

    Ok(())
}
