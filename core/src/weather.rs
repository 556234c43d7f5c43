/// Current-weather lookups
///
/// `OpenMeteoWeatherClient` talks to the Open-Meteo forecast API (free, no API
/// key required). Other backends plug in through `WeatherClient`.
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::WeatherConfig;
use crate::model::{Coordinate, CurrentWeather};
use crate::{AdvisorError, Result};

#[async_trait]
pub trait WeatherClient: Send + Sync {
    async fn current_weather(&self, coordinate: Coordinate) -> Result<CurrentWeather>;
}

/// Weather response from Open-Meteo
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: i32,
    wind_speed_10m: f64,
    weather_code: i32,
}

pub struct OpenMeteoWeatherClient {
    config: WeatherConfig,
    http_client: reqwest::Client,
}

impl OpenMeteoWeatherClient {
    pub fn new(config: WeatherConfig) -> Result<Self> {
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
}

#[async_trait]
impl WeatherClient for OpenMeteoWeatherClient {
    async fn current_weather(&self, coordinate: Coordinate) -> Result<CurrentWeather> {
        debug!(target: "weather", lat=%coordinate.latitude, lon=%coordinate.longitude, "Fetching weather data");

        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code".to_string(),
                ),
                ("temperature_unit", "celsius".to_string()),
                ("wind_speed_unit", "ms".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(target: "weather", error=%e, "Weather API request failed");
                AdvisorError::WeatherService(format!("weather API request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(target: "weather", status=%status, "Weather API returned error");
            return Err(AdvisorError::WeatherService(format!(
                "weather API returned status: {}",
                status
            )));
        }

        let forecast: ForecastResponse = response.json().await.map_err(|e| {
            warn!(target: "weather", error=%e, "Failed to parse weather response");
            AdvisorError::WeatherService(format!("failed to parse weather response: {}", e))
        })?;

        Ok(CurrentWeather {
            temperature_c: forecast.current.temperature_2m,
            condition: weather_code_to_description(forecast.current.weather_code),
            humidity_pct: forecast.current.relative_humidity_2m,
            wind_speed_ms: forecast.current.wind_speed_10m,
        })
    }
}

/// Convert WMO weather code to human-readable description
pub fn weather_code_to_description(code: i32) -> String {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "foggy",
        51 | 53 | 55 => "drizzle",
        56 | 57 => "freezing drizzle",
        61 | 63 | 65 => "rain",
        66 | 67 => "freezing rain",
        71 | 73 | 75 => "snow",
        77 => "snow grains",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorm",
        96 | 99 => "thunderstorm with hail",
        _ => "unknown",
    }
    .to_string()
}
