//! World Bank Indicators API client
//!
//! Endpoint: `{base}/country/{entity}/indicator/{code}?format=json&date={range}&per_page={n}`
//!
//! The response is a two-element array: paging metadata, then a list of
//! `{date, value}` points ordered most recent first. The first point with a
//! non-null value is the observation.

use async_trait::async_trait;
use esg_common::config::EngineConfig;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("esg-engine/", env!("CARGO_PKG_VERSION"));

/// Data source name recorded in report provenance
pub const WORLD_BANK_SOURCE: &str = "World Bank Open Data";

/// One request that did not produce a usable answer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Http(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Most recent non-null data point of one indicator for one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Year of the data point, when the source reports one
    pub year: Option<i32>,
    pub value: f64,
}

/// Source of indicator values
///
/// `Ok(None)` means the source answered but had no non-null value in the
/// requested window.
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    /// Name recorded in report provenance
    fn name(&self) -> &str;

    async fn latest_value(
        &self,
        entity_id: &str,
        indicator_code: &str,
    ) -> Result<Option<Observation>, FetchFailure>;
}

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// reqwest-backed World Bank client
pub struct WorldBankClient {
    http_client: Client,
    base_url: String,
    date_range: String,
    per_page: u32,
    rate_limiter: Option<DirectRateLimiter>,
}

impl WorldBankClient {
    pub fn new(config: &EngineConfig) -> Result<Self, FetchFailure> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FetchFailure::Network(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            date_range: config.date_range.clone(),
            per_page: config.per_page,
            rate_limiter,
        })
    }

    /// Request URL for one (entity, indicator) pair
    pub fn indicator_url(&self, entity_id: &str, indicator_code: &str) -> String {
        format!(
            "{}/country/{}/indicator/{}?format=json&date={}&per_page={}",
            self.base_url, entity_id, indicator_code, self.date_range, self.per_page
        )
    }
}

#[async_trait]
impl IndicatorSource for WorldBankClient {
    fn name(&self) -> &str {
        WORLD_BANK_SOURCE
    }

    async fn latest_value(
        &self,
        entity_id: &str,
        indicator_code: &str,
    ) -> Result<Option<Observation>, FetchFailure> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.indicator_url(entity_id, indicator_code);
        debug!(entity = entity_id, indicator = indicator_code, url = %url, "Requesting indicator");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Http(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| FetchFailure::Parse(e.to_string()))?;

        parse_observation(&payload)
    }
}

/// Extract the first non-null data point from a World Bank payload
///
/// A `null` data list is a valid "no data" answer. A one-element array is the
/// API's error envelope (`[{"message": [...]}]`) and counts as malformed.
pub fn parse_observation(payload: &Value) -> Result<Option<Observation>, FetchFailure> {
    let parts = payload
        .as_array()
        .ok_or_else(|| FetchFailure::Malformed("expected a JSON array".to_string()))?;

    if parts.len() < 2 {
        let message = parts
            .first()
            .and_then(|meta| meta.get("message"))
            .map(|m| m.to_string())
            .unwrap_or_else(|| "missing data element".to_string());
        return Err(FetchFailure::Malformed(message));
    }

    let points = match &parts[1] {
        Value::Null => return Ok(None),
        Value::Array(points) => points,
        _ => {
            return Err(FetchFailure::Malformed(
                "data element is not a list".to_string(),
            ))
        }
    };

    let observation = points.iter().find_map(|point| {
        let value = point.get("value").and_then(Value::as_f64)?;
        let year = point
            .get("date")
            .and_then(Value::as_str)
            .and_then(|d| d.trim().parse::<i32>().ok());
        Some(Observation { year, value })
    });

    Ok(observation)
}
