use axum::Json;
use krishi_core::{FeedbackRequest, FeedbackSubmission};
use serde::Serialize;

use crate::{error::ApiError, extractors::JsonBody};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReceipt {
    pub ok: bool,
    pub message: &'static str,
    pub feedback_type: String,
}

/// Feedback is validated and logged; nothing is persisted.
pub async fn post_feedback(
    JsonBody(body): JsonBody<FeedbackRequest>,
) -> Result<Json<FeedbackReceipt>, ApiError> {
    let submission = FeedbackSubmission::try_from(body)?;

    tracing::info!(
        kind = %submission.kind,
        rating = ?submission.rating,
        message = %submission.message,
        user_info = ?submission.user_info,
        "feedback received"
    );

    Ok(Json(FeedbackReceipt {
        ok: true,
        message: "Feedback received",
        feedback_type: submission.kind.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_util::{json_post, read_body};
    use crate::AppState;
    use crate::app::build_router;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    async fn post(body: serde_json::Value) -> axum::http::Response<axum::body::Body> {
        build_router(AppState::default())
            .oneshot(json_post("/api/feedback", body))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn valid_feedback_is_acknowledged() {
        let resp = post(serde_json::json!({
            "type": "suggestion",
            "message": "Add Marathi voice input",
            "rating": 4,
            "userInfo": { "district": "Nashik" }
        }))
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = read_body(resp).await;
        assert_eq!(
            body,
            serde_json::json!({
                "ok": true,
                "message": "Feedback received",
                "feedbackType": "suggestion"
            })
        );
    }

    #[tokio::test]
    async fn half_star_rating_is_accepted() {
        let resp = post(serde_json::json!({ "type": "general", "message": "ok", "rating": 3.5 })).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_body(resp).await["feedbackType"], "general");
    }

    #[tokio::test]
    async fn rating_is_optional() {
        let resp = post(serde_json::json!({ "type": "bug", "message": "Map does not load" })).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_feedback_returns_400() {
        for body in [
            serde_json::json!({ "message": "no type" }),
            serde_json::json!({ "type": "bug" }),
            serde_json::json!({ "type": "praise", "message": "great app" }),
            serde_json::json!({ "type": "general", "message": "ok", "rating": 0 }),
            serde_json::json!({ "type": "general", "message": "ok", "rating": 6 }),
        ] {
            let resp = post(body.clone()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(read_body(resp).await["error"], "Invalid feedback");
        }
    }
}
