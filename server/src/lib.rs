use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use advisor_core::{
    AdvisorConfig, AdvisorError, AdvisoryChunk, AdvisoryRequest, ChunkSink, CityRequest,
    GeminiGenerator, MetricsCollector, OpenMeteoResolver, OpenMeteoWeatherClient, Orchestrator,
    WeatherClient, WeatherConfig,
};
use advisor_proto::{
    advisor_service_server::{AdvisorService, AdvisorServiceServer},
    AdvisorRequest, AdvisorResponse, StreamAdviceResponse,
};

pub mod weather_rpc;

pub use weather_rpc::RemoteWeatherClient;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Advisor(#[from] AdvisorError),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

type ChunkResult = std::result::Result<StreamAdviceResponse, Status>;

/// Buffered chunks per stream before the relay waits on the client
const STREAM_BUFFER: usize = 32;

pub fn to_domain_request(req: AdvisorRequest) -> AdvisoryRequest {
    AdvisoryRequest {
        cities: req
            .cities
            .into_iter()
            .map(|c| CityRequest::new(c.location))
            .collect(),
    }
}

fn to_proto_chunk(chunk: AdvisoryChunk) -> StreamAdviceResponse {
    StreamAdviceResponse {
        chunk: chunk.text,
        is_complete: chunk.is_complete,
    }
}

/// Map an advisor failure to the gRPC status the caller sees
pub fn status_from_error(err: &AdvisorError) -> Status {
    let message = err.to_string();
    match err.root() {
        AdvisorError::Resolution(_) => Status::not_found(message),
        AdvisorError::WeatherService(_) => Status::unavailable(message),
        AdvisorError::Relay(_) => Status::cancelled(message),
        AdvisorError::Config(_) => Status::failed_precondition(message),
        AdvisorError::Generation(_)
        | AdvisorError::Metrics(_)
        | AdvisorError::Serialization(_)
        | AdvisorError::City { .. } => Status::internal(message),
    }
}

/// Relays orchestrator chunks into the outbound gRPC stream
struct GrpcChunkSink {
    tx: mpsc::Sender<ChunkResult>,
}

#[async_trait::async_trait]
impl ChunkSink for GrpcChunkSink {
    async fn send(&self, chunk: AdvisoryChunk) -> advisor_core::Result<()> {
        self.tx
            .send(Ok(to_proto_chunk(chunk)))
            .await
            .map_err(|_| AdvisorError::Relay("failed to send chunk: stream closed".into()))
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

#[derive(Clone)]
pub struct AdvisorGrpcService {
    orchestrator: Arc<Orchestrator>,
}

impl AdvisorGrpcService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[tonic::async_trait]
impl AdvisorService for AdvisorGrpcService {
    async fn get_advice(
        &self,
        request: Request<AdvisorRequest>,
    ) -> std::result::Result<Response<AdvisorResponse>, Status> {
        let req = to_domain_request(request.into_inner());
        info!(target: "advisor_server", cities = req.cities.len(), "GetAdvice");

        let resp = self
            .orchestrator
            .get_advice(&req)
            .await
            .map_err(|e| status_from_error(&e))?;

        Ok(Response::new(AdvisorResponse {
            advice: resp.advice,
        }))
    }

    type StreamAdviceStream =
        std::pin::Pin<Box<dyn futures_core::Stream<Item = ChunkResult> + Send>>;

    async fn stream_advice(
        &self,
        request: Request<AdvisorRequest>,
    ) -> std::result::Result<Response<Self::StreamAdviceStream>, Status> {
        let req = to_domain_request(request.into_inner());
        info!(target: "advisor_server", cities = req.cities.len(), "StreamAdvice");

        let (tx, rx) = mpsc::channel::<ChunkResult>(STREAM_BUFFER);
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            let sink = GrpcChunkSink { tx: tx.clone() };
            match orchestrator.stream_advice(&req, &sink).await {
                Ok(_) => {}
                // The client is gone; there is nobody left to tell
                Err(AdvisorError::Relay(reason)) => {
                    warn!(target: "advisor_server", reason = %reason, "StreamAdvice client went away")
                }
                Err(err) => {
                    let _ = tx.send(Err(status_from_error(&err))).await;
                }
            }
        });

        let outbound = ReceiverStream::new(rx);
        Ok(Response::new(Box::pin(outbound) as Self::StreamAdviceStream))
    }
}

/// Pick the weather backend: the remote WeatherService when an address is configured,
/// Open-Meteo otherwise.
pub async fn weather_client_from_config(cfg: &WeatherConfig) -> Result<Arc<dyn WeatherClient>> {
    match &cfg.service_addr {
        Some(addr) => {
            info!(target: "advisor_server", %addr, "Using remote WeatherService");
            Ok(Arc::new(RemoteWeatherClient::connect(addr.clone()).await?))
        }
        None => {
            info!(target: "advisor_server", endpoint = %cfg.endpoint, "Using Open-Meteo weather");
            Ok(Arc::new(OpenMeteoWeatherClient::new(cfg.clone())?))
        }
    }
}

/// Wire the production collaborators into an orchestrator
pub fn build_orchestrator(
    config: &AdvisorConfig,
    weather: Arc<dyn WeatherClient>,
    metrics: Arc<dyn MetricsCollector>,
) -> Result<Orchestrator> {
    let resolver = OpenMeteoResolver::new(config.resolver.clone())?;
    let generator = GeminiGenerator::new(config.generator.clone())?;
    Ok(Orchestrator::new(
        Arc::new(resolver),
        weather,
        Arc::new(generator),
        metrics,
    )
    .with_lookup_concurrency(config.lookup_concurrency))
}

pub async fn start_server<F>(
    addr: std::net::SocketAddr,
    orchestrator: Arc<Orchestrator>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let svc = AdvisorGrpcService::new(orchestrator);
    info!(target: "advisor_server", %addr, "Starting AdvisorService gRPC server");
    tonic::transport::Server::builder()
        .add_service(AdvisorServiceServer::new(svc))
        .serve_with_shutdown(addr, shutdown)
        .await?;
    Ok(())
}
