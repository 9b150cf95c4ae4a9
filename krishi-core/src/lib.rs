//! Core library for the Krishi Mitra farming advisor.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over the upstream services (language model, weather,
//!   market prices, pest detection)
//! - Shared domain models and input validation
//! - The mock data served when a service is not configured
//!
//! It is used by `krishi-server`, both by the HTTP handlers and the one-shot CLI commands.

pub mod advisor;
pub mod config;
pub mod error;
pub mod feedback;
pub mod market;
pub mod model;
pub mod pest;
pub mod provider;
pub mod weather;

pub use config::{Config, ProviderConfig, ServerConfig};
pub use error::{UpstreamError, ValidationError};
pub use model::{
    Advice, AdviceOutcome, ChatQuery, ChatRequest, Coordinates, DataSource, FeedbackRequest,
    FeedbackSubmission, MarketReport, MarketRequest, PestImage, PestReport, Sourced,
    WeatherReport, WeatherRequest,
};
pub use provider::{ProviderId, Providers};
