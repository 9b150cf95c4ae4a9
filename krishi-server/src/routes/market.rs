use axum::Json;
use axum::extract::State;
use krishi_core::{MarketReport, MarketRequest, market};

use crate::{AppState, error::ApiError, extractors::JsonBody};

use super::ApiResponse;

pub async fn post_market(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MarketRequest>,
) -> Result<Json<ApiResponse<MarketReport>>, ApiError> {
    let commodity = body.commodity()?;
    let report = market::lookup(state.providers.market.as_deref(), &commodity).await;
    Ok(Json(report.into()))
}
