/// `WeatherClient` backed by a remote `WeatherService` over gRPC
use advisor_core::{AdvisorError, Coordinate, CurrentWeather, WeatherClient};
use advisor_proto::{weather_service_client::WeatherServiceClient, WeatherRequest};
use tonic::transport::Channel;
use tracing::{debug, warn};

use crate::Result;

#[derive(Clone)]
pub struct RemoteWeatherClient {
    client: WeatherServiceClient<Channel>,
}

impl RemoteWeatherClient {
    pub async fn connect(addr: String) -> Result<Self> {
        let client = WeatherServiceClient::connect(addr).await?;
        Ok(Self { client })
    }

    pub fn from_channel(channel: Channel) -> Self {
        Self {
            client: WeatherServiceClient::new(channel),
        }
    }
}

#[async_trait::async_trait]
impl WeatherClient for RemoteWeatherClient {
    async fn current_weather(&self, coordinate: Coordinate) -> advisor_core::Result<CurrentWeather> {
        debug!(target: "weather", lat=%coordinate.latitude, lon=%coordinate.longitude, "GetCurrentWeather");

        // Channel clones are cheap and share the underlying connection
        let mut client = self.client.clone();
        let resp = client
            .get_current_weather(WeatherRequest {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
            })
            .await
            .map_err(|status| {
                warn!(target: "weather", code=?status.code(), message=%status.message(), "WeatherService call failed");
                AdvisorError::WeatherService(format!(
                    "weather request failed: {}",
                    status.message()
                ))
            })?
            .into_inner();

        Ok(CurrentWeather {
            temperature_c: resp.temperature,
            condition: resp.description,
            humidity_pct: resp.humidity,
            wind_speed_ms: resp.wind_speed,
        })
    }
}
