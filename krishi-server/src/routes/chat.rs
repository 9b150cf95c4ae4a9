use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use krishi_core::{Advice, ChatQuery, ChatRequest, ProviderId, UpstreamError, advisor};

use crate::{AppState, error::ApiError, extractors::JsonBody};

use super::ApiResponse;

pub async fn post_chat(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ChatRequest>,
) -> Result<Json<ApiResponse<Advice>>, ApiError> {
    let query = ChatQuery::try_from(body)?;

    let advisor = state
        .providers
        .advisor
        .as_deref()
        .ok_or(UpstreamError::NotConfigured(ProviderId::Gemini))
        .map_err(chat_error)?;

    let outcome = advisor::advise(advisor, &query).await.map_err(chat_error)?;
    tracing::info!(outcome = outcome.kind(), "advice ready");

    Ok(Json(ApiResponse::data(outcome.into_advice())))
}

fn invalid_configuration() -> ApiError {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Invalid API configuration",
        "Please check your GEMINI_API_KEY and GEMINI_MODEL environment variables",
    )
}

fn chat_error(err: UpstreamError) -> ApiError {
    if let Some(api_err) = ApiError::from_transport(&err, "the advisory service") {
        return api_err;
    }

    if matches!(err, UpstreamError::NotConfigured(_)) {
        return invalid_configuration();
    }

    let body = err.body().to_lowercase();
    match err.status().map(|s| s.as_u16()) {
        Some(status) if status == 429 || body.contains("quota") => ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "API quota exceeded",
            "Please try again later",
        ),
        Some(401 | 403 | 404) => invalid_configuration(),
        Some(400) if body.contains("api key") => invalid_configuration(),
        _ => ApiError::internal(err.to_string()),
    }
}
