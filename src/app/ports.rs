use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::Result;

/// One page of the paginated dataset API
#[derive(Debug, Clone)]
pub struct ApiPage {
    /// Total record count across all pages
    pub count: u64,
    pub next: Option<String>,
    pub results: Vec<JsonValue>,
    /// Full response body, archived unchanged
    pub raw: JsonValue,
}

#[derive(Deserialize)]
struct PageEnvelope {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<JsonValue>,
}

impl ApiPage {
    pub fn from_json(raw: JsonValue) -> Result<Self> {
        let envelope = PageEnvelope::deserialize(&raw)?;
        Ok(Self {
            count: envelope.count,
            next: envelope.next,
            results: envelope.results,
            raw,
        })
    }
}

// Ingest-side ports
#[async_trait]
pub trait PageSourcePort: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<ApiPage>;
}
