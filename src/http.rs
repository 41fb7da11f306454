use std::time::Duration;

use anyhow::Context;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP client shared by every fetcher.
///
/// Non-2xx responses are reported as errors by `ureq`, so callers only see bodies of successful
/// requests.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Self {
        let cfg = ureq::Agent::config_builder()
            .timeout_global(Some(TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(cfg),
            user_agent: user_agent.to_string(),
        }
    }

    pub fn get_text(&self, url: &str) -> anyhow::Result<String> {
        let body = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .with_context(|| format!("failed request for URL {url}"))?
            .into_body()
            .read_to_string()
            .with_context(|| format!("failed to read response body from {url}"))?;
        Ok(body)
    }
}
