use std::path::{Path, PathBuf};

use crate::prelude::*;
use skilltools_core::config::Config;
use skilltools_core::format::DeploymentType;

/// Where the deployment type came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentSource {
    Configured,
    InferredFromUrl,
}

/// Configuration for one invocation: the merged [`Config`] plus where the
/// file layer was looked up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub path: PathBuf,
    pub file_found: bool,
    pub verbose: bool,
}

impl Settings {
    /// Load the file and environment layers and apply CLI overrides.
    pub fn load(global: &crate::Global) -> Result<Self> {
        let path = match &global.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };

        let (file, file_found) = read_config_file(&path)?;
        let env = Config::from_env_vars(env_vars())
            .wrap_err("Invalid configuration in environment variables")?;

        let config = Config::layered(file, env)
            .with_overrides(global.deployment, global.base_url.clone());

        log::debug!(
            "config file {} ({})",
            path.display(),
            if file_found { "loaded" } else { "not found" }
        );

        Ok(Self {
            config,
            path,
            file_found,
            verbose: global.verbose,
        })
    }

    pub fn base_url(&self) -> Result<&str> {
        self.config
            .base_url
            .as_deref()
            .ok_or_else(|| Error::MissingBaseUrl(self.path.display().to_string()).into())
    }

    /// Deployment type, inferred from the base URL when not configured.
    pub fn deployment(&self) -> Result<(DeploymentType, DeploymentSource)> {
        if let Some(deployment) = self.config.deployment {
            return Ok((deployment, DeploymentSource::Configured));
        }
        let deployment = self.config.resolved_deployment().ok_or_else(|| {
            eyre!("Unknown deployment type: set ATLASSIAN_DEPLOYMENT or ATLASSIAN_BASE_URL, or pass --deployment")
        })?;
        log::debug!("deployment inferred from base URL: {deployment}");
        Ok((deployment, DeploymentSource::InferredFromUrl))
    }
}

/// `$XDG_CONFIG_HOME/skilltools/config.yaml` or the platform equivalent
pub fn default_config_path() -> Result<PathBuf> {
    dirs_next::config_dir()
        .map(|dir| dir.join("skilltools").join("config.yaml"))
        .ok_or_eyre("Could not determine the configuration directory")
}

/// Read and parse the config file; a missing file is an empty layer.
fn read_config_file(path: &Path) -> Result<(Config, bool)> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let config = Config::from_yaml_str(&text)
                .wrap_err_with(|| format!("Failed to parse {}", path.display()))?;
            Ok((config, true))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((Config::default(), false)),
        Err(e) => Err(eyre!("Failed to read {}: {}", path.display(), e)),
    }
}

/// Process environment, skipping variables that are not valid UTF-8
fn env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_config_file_missing_is_empty_layer() {
        let dir = tempfile::tempdir().unwrap();

        let (config, found) = read_config_file(&dir.path().join("config.yaml")).unwrap();

        assert!(!found);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_read_config_file_parses_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url: https://jira.acme.io\njira:\n  default_scope: project = OPS"
        )
        .unwrap();

        let (config, found) = read_config_file(file.path()).unwrap();

        assert!(found);
        assert_eq!(config.base_url.as_deref(), Some("https://jira.acme.io"));
        assert_eq!(config.jira.default_scope.as_deref(), Some("project = OPS"));
    }

    #[test]
    fn test_read_config_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_results: [").unwrap();

        let error = read_config_file(file.path()).unwrap_err();

        assert!(error.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_settings_deployment_sources() {
        let mut settings = Settings {
            config: Config {
                base_url: Some("https://acme.atlassian.net".to_string()),
                ..Config::default()
            },
            path: PathBuf::from("config.yaml"),
            file_found: false,
            verbose: false,
        };

        assert_eq!(
            settings.deployment().unwrap(),
            (DeploymentType::Cloud, DeploymentSource::InferredFromUrl)
        );

        settings.config.deployment = Some(DeploymentType::DataCenter);
        assert_eq!(
            settings.deployment().unwrap(),
            (DeploymentType::DataCenter, DeploymentSource::Configured)
        );

        settings.config = Config::default();
        assert!(settings.deployment().is_err());
        assert!(settings.base_url().is_err());
    }
}
