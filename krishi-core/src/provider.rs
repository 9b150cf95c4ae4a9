use crate::{
    Config,
    error::UpstreamError,
    model::{Coordinates, MarketReport, PestImage, Prediction, WeatherObservation},
    provider::{
        gemini::GeminiProvider, market::MarketApiProvider, openweather::OpenWeatherProvider,
        roboflow::RoboflowDetector,
    },
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod gemini;
pub mod market;
pub mod openweather;
pub mod roboflow;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Gemini,
    OpenWeather,
    Market,
    Roboflow,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::OpenWeather => "openweather",
            ProviderId::Market => "market",
            ProviderId::Roboflow => "roboflow",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::Gemini,
            ProviderId::OpenWeather,
            ProviderId::Market,
            ProviderId::Roboflow,
        ]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "gemini" => Ok(ProviderId::Gemini),
            "openweather" => Ok(ProviderId::OpenWeather),
            "market" => Ok(ProviderId::Market),
            "roboflow" => Ok(ProviderId::Roboflow),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: gemini, openweather, market, roboflow."
            )),
        }
    }
}

/// Generative model answering farming questions.
#[async_trait]
pub trait AdvisorProvider: Send + Sync + Debug {
    /// Send a prompt and return the model's text reply.
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, coords: Coordinates) -> Result<WeatherObservation, UpstreamError>;
}

#[async_trait]
pub trait MarketProvider: Send + Sync + Debug {
    async fn prices(&self, commodity: &str) -> Result<MarketReport, UpstreamError>;
}

#[async_trait]
pub trait PestDetector: Send + Sync + Debug {
    async fn detect(&self, image: &PestImage) -> Result<Vec<Prediction>, UpstreamError>;
}

fn missing_key(id: ProviderId) -> anyhow::Error {
    anyhow::anyhow!(
        "No API key configured for provider '{id}'.\n\
             Hint: run `krishi configure {id}` or set the matching environment variable."
    )
}

pub fn advisor_from_config(config: &Config) -> anyhow::Result<Box<dyn AdvisorProvider>> {
    let cfg = config
        .provider_config(ProviderId::Gemini)
        .ok_or_else(|| missing_key(ProviderId::Gemini))?;
    let model = cfg.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);

    Ok(Box::new(GeminiProvider::new(cfg.api_key.clone(), model.to_owned())))
}

pub fn weather_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config
        .provider_api_key(ProviderId::OpenWeather)
        .ok_or_else(|| missing_key(ProviderId::OpenWeather))?;

    Ok(Box::new(OpenWeatherProvider::new(api_key.to_owned())))
}

pub fn market_from_config(config: &Config) -> anyhow::Result<Box<dyn MarketProvider>> {
    let cfg = config
        .provider_config(ProviderId::Market)
        .ok_or_else(|| missing_key(ProviderId::Market))?;
    let url = cfg.url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("Market provider needs an API URL.\nHint: set MARKET_API_URL.")
    })?;

    Ok(Box::new(MarketApiProvider::new(cfg.api_key.clone(), url.to_owned())?))
}

pub fn detector_from_config(config: &Config) -> anyhow::Result<Box<dyn PestDetector>> {
    let cfg = config
        .provider_config(ProviderId::Roboflow)
        .ok_or_else(|| missing_key(ProviderId::Roboflow))?;
    let model = cfg.model.as_deref().ok_or_else(|| {
        anyhow::anyhow!("Roboflow provider needs a model id.\nHint: set ROBOFLOW_MODEL.")
    })?;

    Ok(Box::new(RoboflowDetector::new(cfg.api_key.clone(), model.to_owned())?))
}

/// Every configured provider. A `None` slot means that concern answers
/// with mock or sample data.
#[derive(Debug, Clone, Default)]
pub struct Providers {
    pub advisor: Option<Arc<dyn AdvisorProvider>>,
    pub weather: Option<Arc<dyn WeatherProvider>>,
    pub market: Option<Arc<dyn MarketProvider>>,
    pub detector: Option<Arc<dyn PestDetector>>,
}

impl Providers {
    pub fn from_config(config: &Config) -> Self {
        Self {
            advisor: optional(config, ProviderId::Gemini, advisor_from_config),
            weather: optional(config, ProviderId::OpenWeather, weather_from_config),
            market: optional(config, ProviderId::Market, market_from_config),
            detector: optional(config, ProviderId::Roboflow, detector_from_config),
        }
    }
}

fn optional<T: ?Sized>(
    config: &Config,
    id: ProviderId,
    build: fn(&Config) -> anyhow::Result<Box<T>>,
) -> Option<Arc<T>> {
    if !config.is_provider_configured(id) {
        tracing::info!(provider = %id, "provider not configured, using mock data");
        return None;
    }

    match build(config) {
        Ok(provider) => {
            tracing::info!(provider = %id, "provider configured");
            Some(Arc::from(provider))
        }
        Err(err) => {
            tracing::warn!(provider = %id, error = %err, "failed to build provider, using mock data");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ProviderConfig};

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn weather_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = weather_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider"));
    }

    #[test]
    fn market_from_config_requires_url() {
        let mut cfg = Config::default();
        cfg.upsert_provider(ProviderId::Market, ProviderConfig::with_key("KEY"));

        let err = market_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("MARKET_API_URL"));
    }

    #[test]
    fn providers_from_empty_config_are_all_mock() {
        let providers = Providers::from_config(&Config::default());
        assert!(providers.advisor.is_none());
        assert!(providers.weather.is_none());
        assert!(providers.market.is_none());
        assert!(providers.detector.is_none());
    }

    #[test]
    fn providers_skip_partial_credentials() {
        let mut cfg = Config::default();
        cfg.upsert_provider(ProviderId::Gemini, ProviderConfig::with_key("G"));
        cfg.upsert_provider(ProviderId::Market, ProviderConfig::with_key("M"));
        cfg.upsert_provider(ProviderId::Roboflow, ProviderConfig::with_key("R"));

        let providers = Providers::from_config(&cfg);
        assert!(providers.advisor.is_some());
        assert!(providers.market.is_none());
        assert!(providers.detector.is_none());
    }

    #[test]
    fn providers_from_full_config() {
        let mut cfg = Config::default();
        cfg.upsert_provider(ProviderId::Gemini, ProviderConfig::with_key("G"));
        cfg.upsert_provider(ProviderId::OpenWeather, ProviderConfig::with_key("O"));
        cfg.upsert_provider(
            ProviderId::Market,
            ProviderConfig {
                url: Some("https://market.example/prices".into()),
                ..ProviderConfig::with_key("M")
            },
        );
        cfg.upsert_provider(
            ProviderId::Roboflow,
            ProviderConfig {
                model: Some("crop-pests/3".into()),
                ..ProviderConfig::with_key("R")
            },
        );

        let providers = Providers::from_config(&cfg);
        assert!(providers.advisor.is_some());
        assert!(providers.weather.is_some());
        assert!(providers.market.is_some());
        assert!(providers.detector.is_some());
    }
}
