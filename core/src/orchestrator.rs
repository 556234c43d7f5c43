/// Advisory orchestration
///
/// Resolves every requested city to a weather observation, builds a prompt and
/// asks the generator for advice. The unary path fails fast on the first city
/// that cannot be looked up; the streaming path skips failed cities and only
/// reports them when nothing could be collected.
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::generator::{AdviceGenerator, GenerationEvent};
use crate::metrics::{MetricsCollector, Outcome, RequestTimer};
use crate::model::{
    AdvisoryChunk, AdvisoryRequest, AdvisoryResponse, CityRequest, FailedCity, FailureReason,
    WeatherObservation,
};
use crate::prompt::{build_prompt, PromptTemplate};
use crate::resolver::LocationResolver;
use crate::weather::WeatherClient;
use crate::{AdvisorError, Result};

/// Transport-side destination for streamed chunks
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Deliver one chunk. Fails with `AdvisorError::Relay` once the caller is gone.
    async fn send(&self, chunk: AdvisoryChunk) -> Result<()>;

    /// Resolves when the caller has gone away.
    async fn closed(&self);
}

#[async_trait]
impl ChunkSink for mpsc::Sender<AdvisoryChunk> {
    async fn send(&self, chunk: AdvisoryChunk) -> Result<()> {
        mpsc::Sender::send(self, chunk)
            .await
            .map_err(|_| AdvisorError::Relay("receiver dropped".into()))
    }

    async fn closed(&self) {
        mpsc::Sender::closed(self).await
    }
}

/// How a successful stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCompletion {
    /// No city produced weather data; a single diagnostic chunk was sent
    Diagnostic,
    /// Generated advice was relayed, followed by the terminal chunk
    Advice { fragments: usize },
}

/// Observations and failures, both in request order
#[derive(Debug, Default)]
struct Collected {
    observations: Vec<WeatherObservation>,
    failures: Vec<FailedCity>,
}

pub struct Orchestrator {
    resolver: Arc<dyn LocationResolver>,
    weather: Arc<dyn WeatherClient>,
    generator: Arc<dyn AdviceGenerator>,
    metrics: Arc<dyn MetricsCollector>,
    lookup_concurrency: usize,
}

impl Orchestrator {
    pub fn new(
        resolver: Arc<dyn LocationResolver>,
        weather: Arc<dyn WeatherClient>,
        generator: Arc<dyn AdviceGenerator>,
        metrics: Arc<dyn MetricsCollector>,
    ) -> Self {
        Self {
            resolver,
            weather,
            generator,
            metrics,
            lookup_concurrency: 4,
        }
    }

    /// Max in-flight city lookups on the streaming path (at least 1)
    pub fn with_lookup_concurrency(mut self, n: usize) -> Self {
        self.lookup_concurrency = n.max(1);
        self
    }

    /// Unary advice: every city must resolve or the whole request fails.
    pub async fn get_advice(&self, request: &AdvisoryRequest) -> Result<AdvisoryResponse> {
        let mut timer = RequestTimer::start(self.metrics.as_ref());
        let result = self.advise(request).await;
        if let Err(e) = &result {
            warn!(target: "orchestrator", error=%e, "GetAdvice failed");
        }
        timer.complete(Outcome::of(&result));
        result
    }

    /// Streamed advice relayed into `sink`.
    ///
    /// Exactly one chunk with `is_complete = true` is sent on success and it is
    /// always the last one. On error nothing further is sent.
    pub async fn stream_advice<S>(
        &self,
        request: &AdvisoryRequest,
        sink: &S,
    ) -> Result<StreamCompletion>
    where
        S: ChunkSink + ?Sized,
    {
        let mut timer = RequestTimer::start(self.metrics.as_ref());
        let result = self.relay(request, sink).await;
        match &result {
            Ok(completion) => {
                info!(target: "orchestrator", cities=request.cities.len(), ?completion, "StreamAdvice finished")
            }
            Err(e) => warn!(target: "orchestrator", error=%e, "StreamAdvice aborted"),
        }
        timer.complete(Outcome::of(&result));
        result
    }

    async fn advise(&self, request: &AdvisoryRequest) -> Result<AdvisoryResponse> {
        let mut observations = Vec::with_capacity(request.cities.len());
        for city in &request.cities {
            let obs = self
                .lookup(city)
                .await
                .map_err(|e| AdvisorError::for_city(&city.location, e))?;
            observations.push(obs);
        }

        let prompt = build_prompt(PromptTemplate::Complete, &observations);
        let advice = self.generator.generate_once(&prompt).await?;
        Ok(AdvisoryResponse { advice })
    }

    async fn relay<S>(&self, request: &AdvisoryRequest, sink: &S) -> Result<StreamCompletion>
    where
        S: ChunkSink + ?Sized,
    {
        let collected = tokio::select! {
            biased;
            _ = sink.closed() => return Err(disconnected("collecting weather data")),
            collected = self.collect(&request.cities) => collected,
        };

        if collected.observations.is_empty() {
            sink.send(AdvisoryChunk::terminal(diagnostic_message(&collected.failures)))
                .await?;
            return Ok(StreamCompletion::Diagnostic);
        }

        if !collected.failures.is_empty() {
            debug!(target: "orchestrator", skipped=collected.failures.len(), "Generating advice without failed cities");
        }

        let prompt = build_prompt(PromptTemplate::Streaming, &collected.observations);
        let mut events = tokio::select! {
            biased;
            _ = sink.closed() => return Err(disconnected("starting generation")),
            events = self.generator.generate_stream(&prompt) => events?,
        };

        let mut fragments = 0;
        loop {
            let event = tokio::select! {
                biased;
                _ = sink.closed() => return Err(disconnected("relaying advice")),
                event = events.next() => event,
            };
            let Some(event) = event else { break };
            match event? {
                GenerationEvent::Fragment(text) => {
                    sink.send(AdvisoryChunk::fragment(text)).await?;
                    fragments += 1;
                }
                GenerationEvent::End => {
                    sink.send(AdvisoryChunk::terminal(String::new())).await?;
                    return Ok(StreamCompletion::Advice { fragments });
                }
            }
        }

        Err(AdvisorError::Generation(
            "stream ended without a completion marker".into(),
        ))
    }

    /// Look up every city, keeping request order whatever order lookups finish in.
    async fn collect(&self, cities: &[CityRequest]) -> Collected {
        let lookups: Vec<_> = cities.iter().map(|city| self.lookup(city)).collect();
        let results: Vec<Result<WeatherObservation>> = stream::iter(lookups)
            .buffered(self.lookup_concurrency)
            .collect()
            .await;

        let mut collected = Collected::default();
        for (city, result) in cities.iter().zip(results) {
            match result {
                Ok(obs) => collected.observations.push(obs),
                Err(e) => {
                    let reason = FailureReason::of(&e);
                    warn!(target: "orchestrator", location=%city.location, ?reason, error=%e, "Skipping city");
                    collected.failures.push(FailedCity {
                        location: city.location.clone(),
                        reason,
                    });
                }
            }
        }
        collected
    }

    async fn lookup(&self, city: &CityRequest) -> Result<WeatherObservation> {
        let location = city.location.trim();
        if location.is_empty() {
            return Err(AdvisorError::Resolution("empty location".into()));
        }

        let coordinate = self.resolver.resolve(location).await?;
        debug!(target: "orchestrator", location=%location, lat=%coordinate.latitude, lon=%coordinate.longitude, "Resolved city");

        let weather = self.weather.current_weather(coordinate).await.map_err(|e| match e {
            AdvisorError::WeatherService(_) => e,
            other => AdvisorError::WeatherService(other.to_string()),
        })?;
        Ok(WeatherObservation::new(city.location.clone(), weather))
    }
}

fn disconnected(stage: &str) -> AdvisorError {
    AdvisorError::Relay(format!("caller disconnected while {}", stage))
}

/// Text of the single terminal chunk sent when no city produced weather data
pub fn diagnostic_message(failures: &[FailedCity]) -> String {
    let mut message = String::from("I could not get any weather data for any of the cities");
    if !failures.is_empty() {
        let list = failures
            .iter()
            .map(FailedCity::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        message.push_str(&format!("\nFailed to get weather data for: {}", list));
    }
    message.push_str("\nPlease check the city names and try again.");
    message
}
