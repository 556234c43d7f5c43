//! Prompt assembly for advisory generation.
//!
//! The prompt is built only from observations; there are no timestamps or
//! other varying inputs, so identical observations always produce the same
//! bytes.

use crate::model::WeatherObservation;

/// Which instructions to wrap around the weather data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// Single-shot advice; also asks for places to visit
    Complete,
    /// Streamed advice
    Streaming,
}

impl PromptTemplate {
    fn instructions(self) -> &'static str {
        match self {
            PromptTemplate::Complete => {
                "Include: summary, clothing advice, activity suggestions, places to visit if good weather, warnings. Keep it concise."
            }
            PromptTemplate::Streaming => {
                "Include: summary, clothing advice, activity suggestions, warnings. Keep it concise."
            }
        }
    }
}

const PREAMBLE: &str = "Weather advisor. Based on this data provide practical advice:";

/// One summary line for a city
pub fn format_observation(obs: &WeatherObservation) -> String {
    format!(
        "City: {}, Temp: {:.1}°C, Condition: {}, Humidity: {}%, Wind: {:.1} m/s",
        obs.location, obs.temperature_c, obs.condition, obs.humidity_pct, obs.wind_speed_ms
    )
}

pub fn build_prompt(template: PromptTemplate, observations: &[WeatherObservation]) -> String {
    let data = observations
        .iter()
        .map(format_observation)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{} {} {}", PREAMBLE, data, template.instructions())
}
