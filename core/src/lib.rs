// Weather Advisor Core Library
// Turns a batch of place names into a generated weather advisory

pub mod config;
pub mod generator;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod prompt;
pub mod resolver;
pub mod weather;

// Export core types
pub use config::{AdvisorConfig, GeneratorConfig, ResolverConfig, WeatherConfig};
pub use generator::{AdviceGenerator, FragmentStream, GeminiGenerator, GenerationEvent};
pub use metrics::{MetricsCollector, Outcome, PrometheusMetrics, RequestTimer};
pub use model::{
    AdvisoryChunk, AdvisoryRequest, AdvisoryResponse, CityRequest, Coordinate, CurrentWeather,
    FailedCity, FailureReason, WeatherObservation,
};
pub use orchestrator::{ChunkSink, Orchestrator, StreamCompletion};
pub use prompt::{build_prompt, format_observation, PromptTemplate};
pub use resolver::{LocationResolver, OpenMeteoResolver};
pub use weather::{OpenMeteoWeatherClient, WeatherClient};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Weather service error: {0}")]
    WeatherService(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Relay error: {0}")]
    Relay(String),

    /// A per-city lookup failure, tagged with the city that caused it.
    #[error("lookup failed for {location}: {source}")]
    City {
        location: String,
        #[source]
        source: Box<AdvisorError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorError {
    pub fn for_city(location: impl Into<String>, source: AdvisorError) -> Self {
        AdvisorError::City {
            location: location.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, skipping any city tagging.
    pub fn root(&self) -> &AdvisorError {
        match self {
            AdvisorError::City { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
