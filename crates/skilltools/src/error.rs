#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Missing credentials: set {0}")]
    MissingCredentials(String),

    #[error("No Atlassian site configured: set ATLASSIAN_BASE_URL, add base_url to {0}, or pass --base-url")]
    MissingBaseUrl(String),

    #[error("Atlassian API error [{status}]: {message}")]
    Api { status: u16, message: String },
}
