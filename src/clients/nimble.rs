use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::{Client, StatusCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Content focus of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    General,
    News,
    Shopping,
    Social,
    Location,
    Geo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// Parameters of the `nimble_search` tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// The search query.
    pub query: String,
    /// Number of results to return.
    #[serde(default = "default_num_results")]
    pub num_results: u32,
    /// Extract full page content for every result (slower). When false only
    /// titles, descriptions and URLs are returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_search: Option<bool>,
    /// Ask for an LLM-generated answer summary alongside the results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_answer: Option<bool>,
    /// Kind of content to search for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<Focus>,
    /// Restrict results to recent content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// Earliest publication date, YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Latest publication date, YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Only return results from these domains.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_domains: Vec<String>,
    /// Never return results from these domains.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_domains: Vec<String>,
}

fn default_num_results() -> u32 {
    3
}

/// Parameters of the `nimble_extract` tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractParams {
    /// Page URLs to extract.
    pub urls: Vec<String>,
    /// Render JavaScript before extracting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<bool>,
}

/// Client for the Nimble search and extract REST endpoints.
pub struct NimbleClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry_delay: Duration,
}

impl NimbleClient {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry_delay: RETRY_DELAY,
        }
    }

    /// Base back-off after a 429; attempt `n` waits `n` times this long.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub async fn search(&self, params: &SearchParams) -> Result<Value> {
        if params.query.trim().is_empty() {
            return Err(anyhow!("search query cannot be empty"));
        }
        self.post("search", &serde_json::to_value(params)?).await
    }

    pub async fn extract(&self, params: &ExtractParams) -> Result<Value> {
        if params.urls.is_empty() {
            return Err(anyhow!("at least one URL is required"));
        }
        self.post("extract", &serde_json::to_value(params)?).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::trace!("request {url}: {body}");

        for attempt in 1..=MAX_ATTEMPTS {
            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Basic {}", self.api_key))
                .json(body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let text = response.text().await?;
                tracing::trace!("response {url}: {text}");
                return Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)));
            }

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_ATTEMPTS {
                tracing::warn!("nimble {path} rate limited, retrying (attempt {attempt})");
                tokio::time::sleep(self.retry_delay * attempt).await;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Nimble {path} request failed: {status} {text}"));
        }

        Err(anyhow!("Nimble {path} request failed after {MAX_ATTEMPTS} attempts"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_search_params_defaults_and_skips() {
        let params: SearchParams = serde_json::from_value(json!({
            "query": "rust async",
            "focus": "news",
            "time_range": "week"
        }))
        .unwrap();
        assert_eq!(params.num_results, 3);
        assert_eq!(params.focus, Some(Focus::News));

        let body = serde_json::to_value(&params).unwrap();
        assert_eq!(
            body,
            json!({"query": "rust async", "num_results": 3, "focus": "news", "time_range": "week"})
        );
    }

    #[test]
    fn test_rejects_unknown_focus() {
        let parsed = serde_json::from_value::<SearchParams>(json!({"query": "x", "focus": "video"}));
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_local_validation() {
        let client = NimbleClient::new(Client::new(), "https://example.test/", "key");
        assert_eq!(client.base_url, "https://example.test");

        let err = client
            .extract(&ExtractParams { urls: vec![], render: None })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("URL"));
    }

    async fn search_against(server: &MockServer) -> Result<Value> {
        let client = NimbleClient::new(Client::new(), &server.uri(), "key")
            .with_retry_delay(Duration::from_millis(10));
        let params: SearchParams = serde_json::from_value(json!({"query": "rust"})).unwrap();
        client.search(&params).await
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_rate_limit_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("Authorization", "Basic key"))
            .and(body_partial_json(json!({"query": "rust", "num_results": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": ["a"]})))
            .mount(&server)
            .await;

        let body = search_against(&server).await.unwrap();
        assert_eq!(body, json!({"results": ["a"]}));
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = search_against(&server).await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("slow down"));
        assert_eq!(request_count(&server).await, MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = search_against(&server).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Nimble search request failed: 500 Internal Server Error upstream down"
        );
        assert_eq!(request_count(&server).await, 1);
    }
}
