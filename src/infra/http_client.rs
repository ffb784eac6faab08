use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value as JsonValue;

use crate::app::ports::{ApiPage, PageSourcePort};
use crate::config::ApiConfig;
use crate::error::{PipelineError, Result};

/// Fetches dataset pages over HTTP with token authentication
pub struct ReqwestPageSource {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestPageSource {
    pub fn new(config: &ApiConfig, api_key: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Token {key}"))
                .map_err(|e| PipelineError::Config(format!("invalid API key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl PageSourcePort for ReqwestPageSource {
    async fn fetch_page(&self, page: u32) -> Result<ApiPage> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("page", page)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body: JsonValue = resp.json().await?;
        ApiPage::from_json(body)
    }
}
