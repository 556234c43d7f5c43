/// Environment-driven configuration for the advisor collaborators
use serde::{Deserialize, Serialize};
use std::fmt;

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn default_user_agent() -> String {
    env_string("USER_AGENT").unwrap_or_else(|| "weather-advisor/0.1".to_string())
}

/// Configuration for the place-name resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Geocoding search endpoint (default: Open-Meteo)
    pub endpoint: String,
    /// Timeout for a single lookup in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: env_string("GEOCODING_ENDPOINT")
                .unwrap_or_else(|| "https://geocoding-api.open-meteo.com/v1/search".to_string()),
            timeout_ms: env_parse("GEOCODING_TIMEOUT_MS").unwrap_or(10_000),
            user_agent: default_user_agent(),
        }
    }
}

/// Configuration for the weather client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast endpoint (default: Open-Meteo)
    pub endpoint: String,
    pub timeout_ms: u64,
    pub user_agent: String,
    /// gRPC address of a remote WeatherService; takes precedence over `endpoint` when set
    pub service_addr: Option<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: env_string("WEATHER_ENDPOINT")
                .unwrap_or_else(|| "https://api.open-meteo.com/v1/forecast".to_string()),
            timeout_ms: env_parse("WEATHER_TIMEOUT_MS").unwrap_or(10_000),
            user_agent: default_user_agent(),
            service_addr: env_string("WEATHER_SERVICE_ADDR"),
        }
    }
}

/// Configuration for the Gemini text generator
#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub base_url: String,
    /// Model used for single-shot advice
    pub model: String,
    /// Model used for streamed advice
    pub stream_model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Overall timeout for single-shot requests; streams are only bounded on connect
    pub request_timeout_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: env_string("GEMINI_BASE_URL").unwrap_or_else(|| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            model: env_string("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            stream_model: env_string("GEMINI_STREAM_MODEL")
                .unwrap_or_else(|| "gemini-2.5-pro".to_string()),
            api_key: env_string("GEMINI_API_KEY"),
            request_timeout_ms: env_parse("GEMINI_TIMEOUT_MS").unwrap_or(60_000),
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("stream_model", &self.stream_model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Top-level configuration for an advisor process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// gRPC listen address
    pub listen_addr: String,
    /// Max in-flight city lookups on the streaming path
    pub lookup_concurrency: usize,
    pub resolver: ResolverConfig,
    pub weather: WeatherConfig,
    pub generator: GeneratorConfig,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            listen_addr: env_string("ADVISOR_ADDR").unwrap_or_else(|| "0.0.0.0:8082".to_string()),
            lookup_concurrency: env_parse::<usize>("ADVISOR_LOOKUP_CONCURRENCY")
                .filter(|n| *n > 0)
                .unwrap_or(4),
            resolver: ResolverConfig::default(),
            weather: WeatherConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        Self::default()
    }
}
