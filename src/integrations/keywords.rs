//! Keywords AI trace ingestion
//!
//! Spans for one turn go out as a single `POST {base_url}/v1/traces/ingest`
//! with a JSON array body. There is no retry: a failed turn is logged by the
//! caller and never resent.

use crate::spans::Span;
use anyhow::{Context, Result};
use std::time::Duration;

/// Destination for compiled span batches
#[allow(async_fn_in_trait)]
pub trait SpanSink {
    async fn send(&self, spans: &[Span]) -> Result<()>;
}

/// HTTP client for the trace ingest endpoint
#[derive(Debug, Clone)]
pub struct IngestClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl IngestClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: ingest_url(base_url),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub fn ingest_url(base_url: &str) -> String {
    format!("{}/v1/traces/ingest", base_url.trim_end_matches('/'))
}

impl SpanSink for IngestClient {
    async fn send(&self, spans: &[Span]) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(spans)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.endpoint))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Keywords AI returned status {}: {}", status, body.trim());
        }

        tracing::debug!("Sent {} spans ({})", spans.len(), status);
        Ok(())
    }
}
