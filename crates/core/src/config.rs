//! Configuration model and layering
//!
//! The shell reads a YAML file and the process environment; this module turns
//! both into [`Config`] values and merges them. The merged value is built once
//! per invocation and handed to every command by reference.
//!
//! Precedence for each scalar: command line, then environment, then file.
//! Per-project and per-space defaults only come from the file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults::{FieldMap, FieldValue, ISSUE_TYPE, LABELS, PARENT_PAGE, PRIORITY};
use crate::format::{DeploymentType, FormatError};

pub const ENV_DEPLOYMENT: &str = "ATLASSIAN_DEPLOYMENT";
pub const ENV_BASE_URL: &str = "ATLASSIAN_BASE_URL";
pub const ENV_EMAIL: &str = "ATLASSIAN_EMAIL";
pub const ENV_API_TOKEN: &str = "ATLASSIAN_API_TOKEN";
pub const ENV_PAT: &str = "ATLASSIAN_PAT";
pub const ENV_JIRA_SCOPE: &str = "JIRA_DEFAULT_SCOPE";
pub const ENV_JIRA_MAX_RESULTS: &str = "JIRA_MAX_RESULTS";
pub const ENV_CONFLUENCE_SCOPE: &str = "CONFLUENCE_DEFAULT_SCOPE";
pub const ENV_CONFLUENCE_MAX_RESULTS: &str = "CONFLUENCE_MAX_RESULTS";
pub const ENV_CONFIG_PATH: &str = "SKILLTOOLS_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid config file: {0}")]
    Parse(String),

    #[error("{name} must be a positive number, got '{value}'")]
    InvalidNumber { name: String, value: String },

    #[error(transparent)]
    Deployment(#[from] FormatError),
}

/// Defaults applied to new Jira issues in one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDefaults {
    pub issue_type: Option<String>,
    pub priority: Option<String>,
}

impl ProjectDefaults {
    pub fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        if let Some(issue_type) = &self.issue_type {
            fields.insert(ISSUE_TYPE.to_string(), FieldValue::from(issue_type.as_str()));
        }
        if let Some(priority) = &self.priority {
            fields.insert(PRIORITY.to_string(), FieldValue::from(priority.as_str()));
        }
        fields
    }
}

/// Defaults applied to new Confluence pages in one space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceDefaults {
    pub parent_page: Option<String>,
    pub labels: Vec<String>,
}

impl SpaceDefaults {
    pub fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        if let Some(parent) = &self.parent_page {
            fields.insert(PARENT_PAGE.to_string(), FieldValue::from(parent.as_str()));
        }
        if !self.labels.is_empty() {
            fields.insert(LABELS.to_string(), FieldValue::List(self.labels.clone()));
        }
        fields
    }
}

/// Settings for one skill (Jira or Confluence).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    /// Query fragment every search is combined with
    pub default_scope: Option<String>,
    pub max_results: Option<usize>,
    pub project_defaults: BTreeMap<String, ProjectDefaults>,
    pub space_defaults: BTreeMap<String, SpaceDefaults>,
}

impl SkillConfig {
    /// Creation defaults for a Jira project, matching the key case-insensitively.
    pub fn defaults_for_project(&self, key: &str) -> FieldMap {
        lookup(&self.project_defaults, key)
            .map(ProjectDefaults::to_fields)
            .unwrap_or_default()
    }

    /// Creation defaults for a Confluence space, matching the key case-insensitively.
    pub fn defaults_for_space(&self, key: &str) -> FieldMap {
        lookup(&self.space_defaults, key)
            .map(SpaceDefaults::to_fields)
            .unwrap_or_default()
    }

    fn layered(file: SkillConfig, env: SkillConfig) -> SkillConfig {
        SkillConfig {
            default_scope: first_present([env.default_scope, file.default_scope]),
            max_results: first_present([env.max_results, file.max_results]),
            project_defaults: file.project_defaults,
            space_defaults: file.space_defaults,
        }
    }
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, key: &str) -> Option<&'a T> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

/// Complete configuration for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub deployment: Option<DeploymentType>,
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    /// Personal access token (Data Center)
    pub pat: Option<String>,
    pub jira: SkillConfig,
    pub confluence: SkillConfig,
}

impl Config {
    /// Parse the YAML config file. An empty file is an empty layer.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Build the environment layer from `(name, value)` pairs.
    ///
    /// Unrelated variables are ignored and empty values count as unset.
    pub fn from_env_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        let get = |name: &str| vars.get(name).map(|value| value.trim().to_string());

        let deployment = get(ENV_DEPLOYMENT)
            .map(|value| value.parse::<DeploymentType>())
            .transpose()?;

        let config = Config {
            deployment,
            base_url: get(ENV_BASE_URL),
            email: get(ENV_EMAIL),
            api_token: get(ENV_API_TOKEN),
            pat: get(ENV_PAT),
            jira: SkillConfig {
                default_scope: get(ENV_JIRA_SCOPE),
                max_results: parse_count(ENV_JIRA_MAX_RESULTS, get(ENV_JIRA_MAX_RESULTS))?,
                ..SkillConfig::default()
            },
            confluence: SkillConfig {
                default_scope: get(ENV_CONFLUENCE_SCOPE),
                max_results: parse_count(
                    ENV_CONFLUENCE_MAX_RESULTS,
                    get(ENV_CONFLUENCE_MAX_RESULTS),
                )?,
                ..SkillConfig::default()
            },
        };

        Ok(config.normalized())
    }

    /// Merge the file layer with the environment layer; the environment wins.
    pub fn layered(file: Config, env: Config) -> Config {
        Config {
            deployment: first_present([env.deployment, file.deployment]),
            base_url: first_present([env.base_url, file.base_url]),
            email: first_present([env.email, file.email]),
            api_token: first_present([env.api_token, file.api_token]),
            pat: first_present([env.pat, file.pat]),
            jira: SkillConfig::layered(file.jira, env.jira),
            confluence: SkillConfig::layered(file.confluence, env.confluence),
        }
    }

    /// Apply command-line overrides, which beat every other layer.
    pub fn with_overrides(
        mut self,
        deployment: Option<DeploymentType>,
        base_url: Option<String>,
    ) -> Self {
        if let Some(deployment) = deployment {
            self.deployment = Some(deployment);
        }
        if let Some(url) = base_url {
            self.base_url = Some(url);
        }
        self.normalized()
    }

    /// The configured deployment, or the one implied by the base URL.
    pub fn resolved_deployment(&self) -> Option<DeploymentType> {
        self.deployment.or_else(|| {
            self.base_url
                .as_deref()
                .map(DeploymentType::infer_from_url)
        })
    }

    fn normalized(mut self) -> Self {
        self.base_url = self
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }
}

/// First value that is set, in precedence order.
pub fn first_present<T, const N: usize>(candidates: [Option<T>; N]) -> Option<T> {
    candidates.into_iter().flatten().next()
}

fn parse_count(name: &str, value: Option<String>) -> Result<Option<usize>, ConfigError> {
    value
        .map(|value| {
            value
                .parse::<usize>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or_else(|| ConfigError::InvalidNumber {
                    name: name.to_string(),
                    value: value.clone(),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    const SAMPLE: &str = r#"
deployment: cloud
base_url: https://acme.atlassian.net/
email: me@acme.io
api_token: file-token
jira:
  default_scope: project = DEMO
  max_results: 25
  project_defaults:
    DEMO:
      issue_type: Bug
      priority: Medium
confluence:
  default_scope: space = ENG
  space_defaults:
    ENG:
      parent_page: "12345"
      labels: [runbook, ops]
"#;

    #[test]
    fn test_from_yaml_str_full_file() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.deployment, Some(DeploymentType::Cloud));
        assert_eq!(config.base_url.as_deref(), Some("https://acme.atlassian.net"));
        assert_eq!(config.jira.default_scope.as_deref(), Some("project = DEMO"));
        assert_eq!(config.jira.max_results, Some(25));
        assert_eq!(config.confluence.max_results, None);
        assert_eq!(
            config.jira.project_defaults["DEMO"].issue_type.as_deref(),
            Some("Bug")
        );
        assert_eq!(
            config.confluence.space_defaults["ENG"].labels,
            vec!["runbook".to_string(), "ops".to_string()]
        );
    }

    #[test]
    fn test_from_yaml_str_empty_and_invalid() {
        assert_eq!(Config::from_yaml_str("  \n").unwrap(), Config::default());
        assert!(matches!(
            Config::from_yaml_str("jira: [not, a, map]"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_yaml_str("deployment: mainframe"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_env_vars() {
        let config = Config::from_env_vars(env(&[
            (ENV_DEPLOYMENT, "dc"),
            (ENV_BASE_URL, "https://jira.acme.io/"),
            (ENV_PAT, "secret"),
            (ENV_JIRA_SCOPE, "project = OPS"),
            (ENV_CONFLUENCE_MAX_RESULTS, "40"),
            (ENV_EMAIL, ""),
            ("PATH", "/usr/bin"),
        ]))
        .unwrap();

        assert_eq!(config.deployment, Some(DeploymentType::DataCenter));
        assert_eq!(config.base_url.as_deref(), Some("https://jira.acme.io"));
        assert_eq!(config.pat.as_deref(), Some("secret"));
        assert_eq!(config.email, None);
        assert_eq!(config.jira.default_scope.as_deref(), Some("project = OPS"));
        assert_eq!(config.confluence.max_results, Some(40));
    }

    #[test]
    fn test_from_env_vars_rejects_bad_values() {
        assert_eq!(
            Config::from_env_vars(env(&[(ENV_JIRA_MAX_RESULTS, "lots")])),
            Err(ConfigError::InvalidNumber {
                name: ENV_JIRA_MAX_RESULTS.to_string(),
                value: "lots".to_string()
            })
        );
        assert!(matches!(
            Config::from_env_vars(env(&[(ENV_JIRA_MAX_RESULTS, "0")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert_eq!(
            Config::from_env_vars(env(&[(ENV_DEPLOYMENT, "unknown")])),
            Err(ConfigError::Deployment(FormatError::UnsupportedDeployment(
                "unknown".to_string()
            )))
        );
    }

    #[test]
    fn test_layered_env_beats_file() {
        let file = Config::from_yaml_str(SAMPLE).unwrap();
        let env = Config::from_env_vars(env(&[
            (ENV_API_TOKEN, "env-token"),
            (ENV_JIRA_MAX_RESULTS, "5"),
        ]))
        .unwrap();

        let config = Config::layered(file, env);

        assert_eq!(config.api_token.as_deref(), Some("env-token"));
        assert_eq!(config.email.as_deref(), Some("me@acme.io"));
        assert_eq!(config.jira.max_results, Some(5));
        assert_eq!(config.jira.default_scope.as_deref(), Some("project = DEMO"));
        assert!(config.jira.project_defaults.contains_key("DEMO"));
    }

    #[test]
    fn test_with_overrides_beats_everything() {
        let config = Config::from_yaml_str(SAMPLE)
            .unwrap()
            .with_overrides(
                Some(DeploymentType::DataCenter),
                Some("https://wiki.acme.io/".to_string()),
            );

        assert_eq!(config.deployment, Some(DeploymentType::DataCenter));
        assert_eq!(config.base_url.as_deref(), Some("https://wiki.acme.io"));

        let untouched = Config::from_yaml_str(SAMPLE).unwrap().with_overrides(None, None);
        assert_eq!(untouched.deployment, Some(DeploymentType::Cloud));
    }

    #[test]
    fn test_resolved_deployment_infers_from_url() {
        let cloud = Config {
            base_url: Some("https://acme.atlassian.net".to_string()),
            ..Config::default()
        };
        let dc = Config {
            base_url: Some("https://jira.acme.io".to_string()),
            ..Config::default()
        };

        assert_eq!(cloud.resolved_deployment(), Some(DeploymentType::Cloud));
        assert_eq!(dc.resolved_deployment(), Some(DeploymentType::DataCenter));
        assert_eq!(Config::default().resolved_deployment(), None);
    }

    #[test]
    fn test_defaults_lookup() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();

        let project = config.jira.defaults_for_project("demo");
        assert_eq!(project.get(ISSUE_TYPE), Some(&FieldValue::from("Bug")));
        assert_eq!(project.get(PRIORITY), Some(&FieldValue::from("Medium")));

        let space = config.confluence.defaults_for_space("ENG");
        assert_eq!(space.get(PARENT_PAGE), Some(&FieldValue::from("12345")));
        assert_eq!(
            space.get(LABELS),
            Some(&FieldValue::List(vec!["runbook".to_string(), "ops".to_string()]))
        );

        assert!(config.jira.defaults_for_project("NOPE").is_empty());
    }

    #[test]
    fn test_first_present() {
        assert_eq!(first_present([None, Some(2), Some(3)]), Some(2));
        assert_eq!(first_present::<u8, 2>([None, None]), None);
    }
}
