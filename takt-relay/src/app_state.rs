use std::time::Duration;

use crate::config::Settings;

/// Shared handler state: one upstream HTTP client plus the fallback Redmine
/// URL for requests that do not name their own.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub default_upstream: Option<String>,
}

impl AppState {
    pub fn new(config: &Settings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_seconds))
            .danger_accept_invalid_certs(config.upstream.accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            default_upstream: config.upstream.default_url.clone(),
        })
    }
}
