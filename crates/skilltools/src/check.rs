use colored::Colorize;
use serde_json::Value;

use crate::atlassian::{AtlassianClient, Credentials};
use crate::config::{DeploymentSource, Settings};
use crate::prelude::{println, *};
use skilltools_core::config::SkillConfig;

fn row(label: &str, value: impl std::fmt::Display) {
    println!("{:>18}  {}", label.bold().cyan(), value);
}

fn scope_line(skill: &SkillConfig) -> String {
    match skill.default_scope.as_deref() {
        Some(scope) => scope.to_string(),
        None => "(none)".bright_black().to_string(),
    }
}

/// Name shown for the account that answered a connectivity probe
fn account_name(body: &Value) -> String {
    ["displayName", "name", "username", "email"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .unwrap_or("unknown user")
        .to_string()
}

async fn probe(client: &AtlassianClient, product: &str, url: String) -> bool {
    match client.get_json::<Value>(&url, &[]).await {
        Ok(body) => {
            row(product, format!("{} as {}", "ok".green(), account_name(&body)));
            true
        }
        Err(err) => {
            row(product, format!("{} {}", "failed".red(), err));
            false
        }
    }
}

/// Print the resolved configuration and try both products
pub async fn run(settings: &Settings) -> Result<()> {
    let found = if settings.file_found {
        "found".green()
    } else {
        "not found".yellow()
    };
    row("Config file", format!("{} ({found})", settings.path.display()));

    let base_url = settings.base_url()?;
    row("Base URL", base_url);

    let (deployment, source) = settings.deployment()?;
    let source = match source {
        DeploymentSource::Configured => "configured",
        DeploymentSource::InferredFromUrl => "inferred from the base URL",
    };
    row("Deployment", format!("{deployment} ({source})"));

    let credentials = Credentials::resolve(&settings.config, deployment)?;
    row("Credentials", credentials.describe());

    row("Jira scope", scope_line(&settings.config.jira));
    row("Confluence scope", scope_line(&settings.config.confluence));
    std::println!();

    let client = AtlassianClient::new(base_url.to_string(), deployment, &credentials)?;
    let jira_ok = probe(&client, "Jira", client.jira_url("/myself")).await;
    let confluence_ok = probe(
        &client,
        "Confluence",
        client.confluence_url("/user/current"),
    )
    .await;

    if !jira_ok && !confluence_ok {
        return Err(eyre!("Could not reach Jira or Confluence at {}", base_url));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_name_fallbacks() {
        assert_eq!(
            account_name(&json!({"displayName": "Ada", "name": "ada"})),
            "Ada"
        );
        assert_eq!(account_name(&json!({"username": "ada"})), "ada");
        assert_eq!(account_name(&json!({})), "unknown user");
    }

    #[test]
    fn test_scope_line_with_scope() {
        let skill = SkillConfig {
            default_scope: Some("project = OPS".to_string()),
            ..SkillConfig::default()
        };
        assert_eq!(scope_line(&skill), "project = OPS");
    }
}
