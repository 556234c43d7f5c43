/// Domain types shared by the resolver, weather client, generator and orchestrator
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AdvisorError, Result};

/// One place name in an advisory request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRequest {
    pub location: String,
}

impl CityRequest {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub cities: Vec<CityRequest>,
}

impl AdvisoryRequest {
    pub fn from_locations<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cities: locations.into_iter().map(CityRequest::new).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryResponse {
    pub advice: String,
}

/// A piece of a streamed advisory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryChunk {
    pub text: String,
    pub is_complete: bool,
}

impl AdvisoryChunk {
    pub fn fragment(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_complete: false,
        }
    }

    pub fn terminal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_complete: true,
        }
    }
}

/// Geographic position produced by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside -90..90 / -180..180.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(AdvisorError::Resolution(format!(
                "coordinate out of range: ({}, {})",
                latitude, longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Current conditions as reported by a weather client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_pct: i32,
    pub wind_speed_ms: f64,
}

/// Current conditions for one requested city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub location: String,
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_pct: i32,
    pub wind_speed_ms: f64,
}

impl WeatherObservation {
    pub fn new(location: impl Into<String>, weather: CurrentWeather) -> Self {
        Self {
            location: location.into(),
            temperature_c: weather.temperature_c,
            condition: weather.condition,
            humidity_pct: weather.humidity_pct,
            wind_speed_ms: weather.wind_speed_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    ResolutionFailed,
    WeatherFailed,
}

impl FailureReason {
    /// Classify a lookup error by the stage that produced it.
    pub fn of(error: &AdvisorError) -> Self {
        match error.root() {
            AdvisorError::WeatherService(_) => FailureReason::WeatherFailed,
            _ => FailureReason::ResolutionFailed,
        }
    }
}

/// A city the streaming path had to skip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCity {
    pub location: String,
    pub reason: FailureReason,
}

impl fmt::Display for FailedCity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            FailureReason::ResolutionFailed => f.write_str(&self.location),
            FailureReason::WeatherFailed => write!(f, "{} (weather failed)", self.location),
        }
    }
}
