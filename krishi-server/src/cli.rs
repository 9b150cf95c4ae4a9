use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use krishi_core::{
    ChatQuery, ChatRequest, Config, Coordinates, ProviderConfig, ProviderId, Providers, advisor,
    market, provider::DEFAULT_GEMINI_MODEL, weather,
};
use serde::Serialize;

use crate::{app, telemetry};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "krishi", version, about = "Krishi Mitra farming advisor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API server.
    Serve {
        /// Interface to bind; overrides HOST and the config file.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind; overrides PORT and the config file.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name: "gemini", "openweather", "market" or "roboflow".
        provider: String,
    },

    /// Print current weather and alerts for a location.
    #[command(allow_negative_numbers = true)]
    Weather { lat: f64, lon: f64 },

    /// Print mandi prices for a commodity.
    Market { commodity: String },

    /// Ask the farming advisor a question.
    #[command(allow_negative_numbers = true)]
    Ask {
        /// The question; prompted for when omitted.
        message: Option<String>,

        #[arg(long)]
        crop: Option<String>,

        /// Answer language tag, e.g. "hi-IN".
        #[arg(long)]
        lang: Option<String>,

        #[arg(long, requires = "lon")]
        lat: Option<f64>,

        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { host, port } => {
                let mut config = Config::load()?;
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }

                telemetry::init_tracing(&config.server.log_level);
                app::serve(&config).await
            }
            Command::Configure { provider } => configure(&provider),
            Command::Weather { lat, lon } => {
                let providers = one_shot_providers()?;
                let coords = Coordinates::new(lat, lon)?;
                let report = weather::report(providers.weather.as_deref(), coords).await?;
                print_json(&report.data)
            }
            Command::Market { commodity } => {
                let providers = one_shot_providers()?;
                let report = market::lookup(providers.market.as_deref(), commodity.trim()).await;
                if let Some(warning) = &report.warning {
                    eprintln!("warning: {warning}");
                }
                print_json(&report.data)
            }
            Command::Ask {
                message,
                crop,
                lang,
                lat,
                lon,
            } => {
                let providers = one_shot_providers()?;
                let advisor = providers.advisor.as_deref().ok_or_else(|| {
                    anyhow!("Gemini is not configured.\nHint: run `krishi configure gemini`")
                })?;

                let message = match message {
                    Some(message) => message,
                    None => Text::new("Your question:").prompt()?,
                };

                let query = ChatQuery::try_from(ChatRequest {
                    message: Some(message),
                    lang,
                    crop,
                    lat,
                    lon,
                })?;

                let outcome = advisor::advise(advisor, &query).await?;
                print_json(outcome.advice())
            }
        }
    }
}

/// Load config for a one-shot command. Logs go to stderr at `warn`
/// unless RUST_LOG / LOG_LEVEL say otherwise.
fn one_shot_providers() -> anyhow::Result<Providers> {
    let config = Config::load()?;
    telemetry::init_tracing("warn");
    Ok(Providers::from_config(&config))
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let provider_id = ProviderId::try_from(provider)?;

    // Only the file layer: environment overrides must not be written back.
    let mut config = Config::load_file()?;
    let existing = config.provider_config(provider_id).cloned();

    let api_key = Password::new(&format!("{provider_id} API key:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    let mut provider_config = ProviderConfig::with_key(api_key.trim());

    match provider_id {
        ProviderId::Gemini => {
            let current = existing
                .and_then(|p| p.model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
            let model = Text::new("Gemini model:").with_default(&current).prompt()?;
            provider_config.model = Some(model.trim().to_string());
        }
        ProviderId::Roboflow => {
            let current = existing.and_then(|p| p.model);
            let mut prompt = Text::new("Roboflow model id (project/version):");
            if let Some(current) = current.as_deref() {
                prompt = prompt.with_default(current);
            }
            provider_config.model = Some(prompt.prompt()?.trim().to_string());
        }
        ProviderId::Market => {
            let current = existing.and_then(|p| p.url);
            let mut prompt = Text::new("Market API URL:");
            if let Some(current) = current.as_deref() {
                prompt = prompt.with_default(current);
            }
            provider_config.url = Some(prompt.prompt()?.trim().to_string());
        }
        ProviderId::OpenWeather => {}
    }

    config.upsert_provider(provider_id, provider_config);
    let path = config.save().context("failed to save configuration")?;

    println!("Saved {provider_id} credentials to {}", path.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
