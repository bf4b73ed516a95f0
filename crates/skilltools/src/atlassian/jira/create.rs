use std::path::PathBuf;

use colored::Colorize;

use crate::atlassian::AtlassianClient;
use crate::config::Settings;
use crate::prelude::{println, *};
use skilltools_core::atlassian::jira::{
    build_issue_fields, transform_create_response, CreatedIssue, JiraCreateResponse,
};
use skilltools_core::defaults::{
    resolve_defaults, FieldMap, FieldValue, ISSUE_TYPE, LABELS, PRIORITY,
};

/// Options for creating a Jira issue
#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # Create an issue; type and priority come from jira.project_defaults.DEMO:
  skilltools jira create \"Login fails on Safari\" --project DEMO

  # Override the defaults and pass a Markdown description:
  skilltools jira create \"Flaky test\" --project DEMO --issue-type Bug --priority High \\
    --description \"Fails with:\\n\\n\\`\\`\\`text\\ntimeout\\n\\`\\`\\`\"

NOTES:
  - Explicit flags always win over project defaults
  - Cloud descriptions are sent as ADF, Data Center descriptions as text")]
pub struct CreateOptions {
    /// Issue summary
    pub summary: String,

    /// Project key
    #[arg(short, long, env = "JIRA_PROJECT")]
    pub project: String,

    /// Issue type (default: project default, then Task)
    #[arg(short = 't', long)]
    pub issue_type: Option<String>,

    /// Priority (default: project default)
    #[arg(long)]
    pub priority: Option<String>,

    /// Description in Markdown
    #[arg(short, long, conflicts_with = "description_file")]
    pub description: Option<String>,

    /// Read the Markdown description from a file
    #[arg(long)]
    pub description_file: Option<PathBuf>,

    /// Comma-separated labels
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CreateOptions {
    /// Fields given on the command line
    fn explicit_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        if let Some(issue_type) = &self.issue_type {
            fields.insert(ISSUE_TYPE.to_string(), FieldValue::from(issue_type.as_str()));
        }
        if let Some(priority) = &self.priority {
            fields.insert(PRIORITY.to_string(), FieldValue::from(priority.as_str()));
        }
        if !self.labels.is_empty() {
            fields.insert(LABELS.to_string(), FieldValue::List(self.labels.clone()));
        }
        fields
    }

    fn description(&self) -> Result<Option<String>> {
        match &self.description_file {
            Some(path) => std::fs::read_to_string(path)
                .map(Some)
                .wrap_err_with(|| format!("Failed to read {}", path.display())),
            None => Ok(self.description.clone()),
        }
    }
}

/// Create an issue after filling gaps from the project's defaults
pub async fn create_issue_data(
    client: &AtlassianClient,
    settings: &Settings,
    options: &CreateOptions,
) -> Result<CreatedIssue> {
    let project = options.project.trim().to_uppercase();
    let defaults = settings.config.jira.defaults_for_project(&project);
    let resolved = resolve_defaults(&options.explicit_fields(), &defaults);
    log::debug!("resolved fields for {project}: {resolved:?}");

    let description = options.description()?;
    let payload = build_issue_fields(
        &project,
        &options.summary,
        description.as_deref(),
        &resolved,
        client.deployment(),
    );

    let response: JiraCreateResponse = client
        .post_json(&client.jira_url("/issue"), &payload)
        .await
        .wrap_err("Failed to create issue")?;

    Ok(transform_create_response(response, client.base_url()))
}

/// Handle the create command
pub async fn handler(options: CreateOptions, settings: &Settings) -> Result<()> {
    let client = AtlassianClient::from_settings(settings)?;
    let created = create_issue_data(&client, settings, &options).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!(
            "{} {} {}",
            "Created".green().bold(),
            created.key.bold().cyan(),
            created.url.bright_black()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, clap::Parser)]
    struct Harness {
        #[command(flatten)]
        options: CreateOptions,
    }

    #[test]
    fn test_explicit_fields_from_flags() {
        let harness = Harness::parse_from([
            "create",
            "Broken build",
            "--project",
            "demo",
            "--priority",
            "High",
            "--labels",
            "ci,build",
        ]);

        let fields = harness.options.explicit_fields();

        assert_eq!(fields.get(PRIORITY), Some(&FieldValue::from("High")));
        assert_eq!(
            fields.get(LABELS),
            Some(&FieldValue::List(vec!["ci".to_string(), "build".to_string()]))
        );
        assert!(fields.get(ISSUE_TYPE).is_none());
    }

    #[test]
    fn test_description_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desc.md");
        std::fs::write(&path, "# Context\n\nDetails").unwrap();

        let harness = Harness::parse_from([
            "create",
            "x",
            "--project",
            "DEMO",
            "--description-file",
            path.to_str().unwrap(),
        ]);

        assert_eq!(
            harness.options.description().unwrap().as_deref(),
            Some("# Context\n\nDetails")
        );
    }
}
