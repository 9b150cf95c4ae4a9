use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use krishi_core::{Coordinates, UpstreamError, WeatherReport, WeatherRequest, weather};

use crate::{AppState, error::ApiError, extractors::JsonBody};

use super::ApiResponse;

pub async fn post_weather(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<WeatherRequest>,
) -> Result<Json<ApiResponse<WeatherReport>>, ApiError> {
    let coords = Coordinates::try_from(body)?;

    let report = weather::report(state.providers.weather.as_deref(), coords)
        .await
        .map_err(weather_error)?;

    Ok(Json(report.into()))
}

fn weather_error(err: UpstreamError) -> ApiError {
    if let Some(api_err) = ApiError::from_transport(&err, "weather service") {
        return api_err;
    }

    match err.status().map(|s| s.as_u16()) {
        Some(401 | 403) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Invalid API key",
            "Please check your OPENWEATHER_API_KEY environment variable",
        ),
        Some(429) => ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "API rate limit exceeded",
            "Please try again later",
        ),
        Some(400) => ApiError::bad_request(
            "Invalid coordinates",
            "Please check the latitude and longitude values",
        ),
        Some(404) => ApiError::new(
            StatusCode::NOT_FOUND,
            "Location not found",
            "No weather data available for the provided coordinates",
        ),
        _ => ApiError::internal(err.to_string()),
    }
}
