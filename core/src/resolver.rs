/// Place-name resolution against a geocoding search API
///
/// The default backend is the Open-Meteo geocoding API (free, no API key
/// required). Any service returning `{"results": [{"latitude", "longitude"}]}`
/// works.
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::model::Coordinate;
use crate::{AdvisorError, Result};

/// Turns a free-text place name into coordinates
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, location: &str) -> Result<Coordinate>;
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeoLocation>>,
}

#[derive(Debug, Deserialize)]
struct GeoLocation {
    latitude: f64,
    longitude: f64,
}

pub struct OpenMeteoResolver {
    config: ResolverConfig,
    http_client: reqwest::Client,
}

impl OpenMeteoResolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| AdvisorError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ResolverConfig::default())
    }
}

#[async_trait]
impl LocationResolver for OpenMeteoResolver {
    async fn resolve(&self, location: &str) -> Result<Coordinate> {
        debug!(target: "resolver", location=%location, "Geocoding location");

        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&[
                ("name", location),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(target: "resolver", location=%location, error=%e, "Geocoding request failed");
                AdvisorError::Resolution(format!("geocoding request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(target: "resolver", location=%location, status=%status, "Geocoding API returned error");
            return Err(AdvisorError::Resolution(format!(
                "geocoding API returned status: {}",
                status
            )));
        }

        let geo_response: GeocodingResponse = response.json().await.map_err(|e| {
            warn!(target: "resolver", error=%e, "Failed to parse geocoding response");
            AdvisorError::Resolution(format!("failed to parse geocoding response: {}", e))
        })?;

        let first = geo_response
            .results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| {
                AdvisorError::Resolution(format!("no results found for city: {}", location))
            })?;

        Coordinate::new(first.latitude, first.longitude)
    }
}
