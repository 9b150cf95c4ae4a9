pub mod chat;
pub mod feedback;
pub mod market;
pub mod pest;
pub mod weather;

use krishi_core::{DataSource, Sourced};
use serde::Serialize;

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            ok: true,
            data,
            source: None,
            warning: None,
        }
    }
}

impl<T> From<Sourced<T>> for ApiResponse<T> {
    fn from(sourced: Sourced<T>) -> Self {
        Self {
            ok: true,
            data: sourced.data,
            source: Some(sourced.source),
            warning: sourced.warning,
        }
    }
}
