use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{UpstreamError, truncate_body},
    model::{Coordinates, WeatherObservation},
};

use super::{ProviderId, WeatherProvider};

const BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Point the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        coords: Coordinates,
        extra: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let url = format!("{}/data/2.5/{endpoint}", self.base_url);
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .query(extra)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(ProviderId::OpenWeather, e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(ProviderId::OpenWeather, e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: ProviderId::OpenWeather,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            UpstreamError::decode(
                ProviderId::OpenWeather,
                format!("failed to parse {endpoint} JSON: {e}"),
            )
        })
    }

    async fn fetch_current(&self, coords: Coordinates) -> Result<OwCurrentResponse, UpstreamError> {
        self.get_json("weather", coords, &[]).await
    }

    /// Precipitation probability of the nearest 3-hour forecast slot, in percent.
    async fn fetch_rain_probability(&self, coords: Coordinates) -> Result<u8, UpstreamError> {
        let parsed: OwForecastResponse = self.get_json("forecast", coords, &[("cnt", "1")]).await?;

        let entry = parsed.list.first().ok_or_else(|| {
            UpstreamError::decode(ProviderId::OpenWeather, "forecast response contained no data")
        })?;

        Ok((entry.pop.clamp(0.0, 1.0) * 100.0).round() as u8)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, coords: Coordinates) -> Result<WeatherObservation, UpstreamError> {
        let current = self.fetch_current(coords).await?;

        let rain_probability_pct = match self.fetch_rain_probability(coords).await {
            Ok(pct) => pct,
            Err(err) => {
                tracing::warn!(error = %err, "rain probability unavailable, reporting 0");
                0
            }
        };

        let description = current
            .weather
            .first()
            .map(|w| w.description.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let location = if current.name.is_empty() {
            format!("{:.2}, {:.2}", coords.lat, coords.lon)
        } else {
            current.name
        };

        Ok(WeatherObservation {
            location,
            temperature_c: current.main.temp,
            description,
            humidity_pct: current.main.humidity,
            rain_probability_pct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn coords() -> Coordinates {
        Coordinates::new(18.52, 73.85).unwrap()
    }

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new("OW_KEY".into()).with_base_url(&server.uri())
    }

    async fn mount_current(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("appid", "OW_KEY"))
            .and(query_param("units", "metric"))
            .and(query_param("lat", "18.52"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Pune",
                "main": { "temp": 31.46, "feels_like": 33.0, "humidity": 48 },
                "weather": [{ "description": "light rain" }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn current_combines_weather_and_forecast() {
        let server = MockServer::start().await;
        mount_current(&server).await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("cnt", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [{ "pop": 0.83 }]
            })))
            .mount(&server)
            .await;

        let obs = provider(&server).current(coords()).await.unwrap();
        assert_eq!(obs.location, "Pune");
        assert_eq!(obs.temperature_c, 31.46);
        assert_eq!(obs.description, "light rain");
        assert_eq!(obs.humidity_pct, 48);
        assert_eq!(obs.rain_probability_pct, 83);
    }

    #[tokio::test]
    async fn forecast_failure_reports_zero_rain_probability() {
        let server = MockServer::start().await;
        mount_current(&server).await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let obs = provider(&server).current(coords()).await.unwrap();
        assert_eq!(obs.rain_probability_pct, 0);
    }

    #[tokio::test]
    async fn unauthorized_is_reported_with_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("{\"cod\":401,\"message\":\"Invalid API key\"}"),
            )
            .mount(&server)
            .await;

        let err = provider(&server).current(coords()).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn unreachable_host_is_classified() {
        let provider = OpenWeatherProvider::new("OW_KEY".into()).with_base_url("http://127.0.0.1:9");
        let err = provider.current(coords()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unreachable { .. }));
    }
}
