//! AdvisorService integration test module

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use advisor_core::{
    AdviceGenerator, AdvisorError, Coordinate, CurrentWeather, FragmentStream, GenerationEvent,
    LocationResolver, Orchestrator, PrometheusMetrics, Result, WeatherClient,
};
use advisor_proto::advisor_service_server::AdvisorServiceServer;
use advisor_proto::weather_service_server::{WeatherService, WeatherServiceServer};
use advisor_server::AdvisorGrpcService;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

pub use advisor_proto::{
    advisor_service_client::AdvisorServiceClient, AdvisorRequest, CityData, StreamAdviceResponse,
    WeatherRequest, WeatherResponse,
};

mod e2e_advice;
mod service_test;

/// Knows Paris and Oslo; everything else is unresolvable
pub struct StaticResolver;

#[async_trait]
impl LocationResolver for StaticResolver {
    async fn resolve(&self, location: &str) -> Result<Coordinate> {
        match location {
            "Paris" => Coordinate::new(48.8566, 2.3522),
            "Oslo" => Coordinate::new(59.9139, 10.7522),
            other => Err(AdvisorError::Resolution(format!(
                "no results found for city: {}",
                other
            ))),
        }
    }
}

/// Has weather for Paris only
pub struct ParisWeather;

#[async_trait]
impl WeatherClient for ParisWeather {
    async fn current_weather(&self, coordinate: Coordinate) -> Result<CurrentWeather> {
        if coordinate.latitude == 48.8566 {
            Ok(CurrentWeather {
                temperature_c: 22.5,
                condition: "clear sky".into(),
                humidity_pct: 40,
                wind_speed_ms: 3.2,
            })
        } else {
            Err(AdvisorError::WeatherService("upstream unavailable".into()))
        }
    }
}

pub struct ScriptedGenerator {
    fragments: Vec<String>,
    fail_stream: bool,
    pub prompts: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            fail_stream: false,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Emits the fragments, then a generation error instead of the end marker
    pub fn failing(fragments: &[&str]) -> Self {
        Self {
            fail_stream: true,
            ..Self::new(fragments)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl AdviceGenerator for ScriptedGenerator {
    async fn generate_once(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.fragments.concat())
    }

    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut events: Vec<Result<GenerationEvent>> = self
            .fragments
            .iter()
            .map(|f| Ok(GenerationEvent::Fragment(f.clone())))
            .collect();
        if self.fail_stream {
            events.push(Err(AdvisorError::Generation("model overloaded".into())));
        } else {
            events.push(Ok(GenerationEvent::End));
        }
        Ok(futures::stream::iter(events).boxed())
    }
}

pub struct TestContext {
    pub generator: Arc<ScriptedGenerator>,
    pub metrics: Arc<PrometheusMetrics>,
    pub service: AdvisorGrpcService,
}

pub fn context(generator: ScriptedGenerator) -> TestContext {
    let generator = Arc::new(generator);
    let metrics = Arc::new(PrometheusMetrics::new().unwrap());
    let orchestrator = Orchestrator::new(
        Arc::new(StaticResolver),
        Arc::new(ParisWeather),
        generator.clone(),
        metrics.clone(),
    );
    TestContext {
        generator,
        metrics,
        service: AdvisorGrpcService::new(Arc::new(orchestrator)),
    }
}

pub fn request(locations: &[&str]) -> AdvisorRequest {
    AdvisorRequest {
        cities: locations
            .iter()
            .map(|l| CityData {
                location: l.to_string(),
            })
            .collect(),
    }
}

async fn ephemeral_listener() -> (SocketAddr, TcpListenerStream) {
    // Bind to 127.0.0.1:0 for an ephemeral port
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().unwrap();
    (addr, TcpListenerStream::new(listener))
}

/// Start an AdvisorService gRPC server on an ephemeral localhost port
pub async fn start_advisor_server(
    service: AdvisorGrpcService,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let (addr, incoming) = ephemeral_listener().await;
    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(AdvisorServiceServer::new(service))
            .serve_with_incoming(incoming)
            .await
            .expect("server exited cleanly");
    });
    (addr, handle)
}

/// Start a WeatherService gRPC server on an ephemeral localhost port
pub async fn start_weather_server<S: WeatherService>(
    service: S,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let (addr, incoming) = ephemeral_listener().await;
    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(WeatherServiceServer::new(service))
            .serve_with_incoming(incoming)
            .await
            .expect("server exited cleanly");
    });
    (addr, handle)
}

pub async fn new_client(addr: SocketAddr) -> AdvisorServiceClient<tonic::transport::Channel> {
    let endpoint = format!("http://{}", addr);
    AdvisorServiceClient::connect(endpoint)
        .await
        .expect("connect client")
}
