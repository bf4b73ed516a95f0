use crate::config::Settings;
use crate::prelude::*;
use serde::de::DeserializeOwned;
use skilltools_core::atlassian::flatten_error_body;
use skilltools_core::config::Config;
use skilltools_core::format::DeploymentType;

pub mod confluence;
pub mod jira;

/// How requests authenticate against the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Email and API token (Cloud), or username and password (Data Center)
    Basic { email: String, api_token: String },
    /// Personal access token (Data Center)
    Bearer { token: String },
}

impl Credentials {
    /// Pick credentials for `deployment` from the merged configuration.
    ///
    /// Data Center prefers a personal access token and falls back to Basic.
    pub fn resolve(config: &Config, deployment: DeploymentType) -> Result<Self, Error> {
        let basic = match (&config.email, &config.api_token) {
            (Some(email), Some(api_token)) => Some(Credentials::Basic {
                email: email.clone(),
                api_token: api_token.clone(),
            }),
            _ => None,
        };

        match deployment {
            DeploymentType::Cloud => basic.ok_or_else(|| {
                Error::MissingCredentials(
                    "ATLASSIAN_EMAIL and ATLASSIAN_API_TOKEN (or email/api_token in the config file)"
                        .to_string(),
                )
            }),
            DeploymentType::DataCenter => config
                .pat
                .clone()
                .map(|token| Credentials::Bearer { token })
                .or(basic)
                .ok_or_else(|| {
                    Error::MissingCredentials(
                        "ATLASSIAN_PAT (or pat in the config file)".to_string(),
                    )
                }),
        }
    }

    pub fn authorization_header(&self) -> String {
        use base64::Engine;

        match self {
            Credentials::Basic { email, api_token } => {
                let auth_string = format!("{email}:{api_token}");
                let auth_encoded = base64::engine::general_purpose::STANDARD.encode(auth_string);
                format!("Basic {auth_encoded}")
            }
            Credentials::Bearer { token } => format!("Bearer {token}"),
        }
    }

    /// Human-readable description with the secret masked
    pub fn describe(&self) -> String {
        match self {
            Credentials::Basic { email, api_token } => {
                format!("basic auth as {email} (token {})", mask_secret(api_token))
            }
            Credentials::Bearer { token } => {
                format!("personal access token {}", mask_secret(token))
            }
        }
    }
}

/// Show at most the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "*".repeat(count.max(4));
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

/// Authenticated client bound to one site
#[derive(Debug, Clone)]
pub struct AtlassianClient {
    http: reqwest::Client,
    base_url: String,
    deployment: DeploymentType,
}

impl AtlassianClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.base_url()?.to_string();
        let (deployment, _) = settings.deployment()?;
        let credentials = Credentials::resolve(&settings.config, deployment)?;
        Self::new(base_url, deployment, &credentials)
    }

    /// Create an HTTP client with the authorization header preset
    pub fn new(
        base_url: String,
        deployment: DeploymentType,
        credentials: &Credentials,
    ) -> Result<Self> {
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&credentials.authorization_header())
                .map_err(|e| eyre!("Invalid header value: {}", e))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            deployment,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn deployment(&self) -> DeploymentType {
        self.deployment
    }

    /// Jira REST URL for `path` (e.g. `/issue/KEY-1`)
    pub fn jira_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.deployment.jira_api_root(), path)
    }

    /// Confluence REST URL for `path` (e.g. `/content/search`)
    pub fn confluence_url(&self, path: &str) -> String {
        let web_base =
            skilltools_core::atlassian::confluence::web_base(&self.base_url, self.deployment);
        format!("{web_base}/rest/api{path}")
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        log::debug!("GET {url} {query:?}");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request to {}: {}", url, e))?;
        read_json(response).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        log::debug!("POST {url}");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request to {}: {}", url, e))?;
        read_json(response).await
    }
}

/// Check the status, then parse the body. Failures are reported as-is.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| eyre!("Failed to read response body: {}", e))?;

    if !status.is_success() {
        log::debug!("error body: {body}");
        return Err(Error::Api {
            status: status.as_u16(),
            message: format_api_error(&body),
        }
        .into());
    }

    serde_json::from_str(&body).map_err(|e| eyre!("Failed to parse response: {}", e))
}

/// Readable message for an error response body
pub fn format_api_error(body: &str) -> String {
    match flatten_error_body(body) {
        Some(message) => message,
        None if body.trim().is_empty() => "(empty response body)".to_string(),
        None => body.trim().to_string(),
    }
}
