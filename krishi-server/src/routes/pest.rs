use axum::Json;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use krishi_core::{PestImage, PestReport, ValidationError, pest};

use crate::{AppState, error::ApiError};

use super::ApiResponse;

const IMAGE_FIELD: &str = "image";

pub async fn post_pest(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<PestReport>>, ApiError> {
    let mut multipart = multipart
        .map_err(|rejection| ApiError::bad_request("Invalid upload", rejection.body_text()))?;

    let image = read_image(&mut multipart).await?;
    let report = pest::detect(state.providers.detector.as_deref(), &image).await;

    Ok(Json(report.into()))
}

/// First `image` field of the form; other fields are skipped.
async fn read_image(multipart: &mut Multipart) -> Result<PestImage, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(upload_error)?;

        return Ok(PestImage::new(filename, content_type, bytes.to_vec())?);
    }

    Err(ValidationError::MissingImage.into())
}

fn upload_error(err: MultipartError) -> ApiError {
    ApiError::bad_request("Invalid upload", err.body_text())
}

#[cfg(test)]
mod tests {
    use crate::routes::test_util::{multipart_post, read_body};
    use crate::AppState;
    use crate::app::build_router;
    use axum::http::StatusCode;
    use krishi_core::Providers;
    use krishi_core::model::MAX_IMAGE_BYTES;
    use krishi_core::provider::roboflow::RoboflowDetector;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state_with_roboflow(server: &MockServer) -> AppState {
        let detector = RoboflowDetector::new("RF_KEY".into(), "crop-pests/3".into())
            .unwrap()
            .with_base_url(&server.uri());
        AppState {
            providers: Providers {
                detector: Some(Arc::new(detector)),
                ..Default::default()
            },
        }
    }

    async fn upload(
        state: AppState,
        field: &str,
        content_type: &str,
        data: &[u8],
    ) -> axum::http::Response<axum::body::Body> {
        build_router(state)
            .oneshot(multipart_post("/api/pest", field, "leaf.jpg", content_type, data))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn mock_detection_follows_size_parity() {
        let resp = upload(AppState::default(), "image", "image/jpeg", &[1, 2, 3, 4]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_body(resp).await;
        assert_eq!(body["source"], "mock");
        assert_eq!(body["data"]["filename"], "leaf.jpg");
        assert_eq!(body["data"]["size"], 4);
        assert_eq!(body["data"]["detections"][0]["label"], "aphid");
        assert_eq!(body["data"]["detections"][0]["bbox"]["x"], 120);

        let resp = upload(AppState::default(), "image", "image/png", &[1, 2, 3]).await;
        let body = read_body(resp).await;
        assert_eq!(body["data"]["detections"][0]["label"], "leaf spot");
        assert_eq!(body["data"]["detections"][0]["confidence"], 0.92);
    }

    #[tokio::test]
    async fn missing_image_field_returns_400() {
        let resp = upload(AppState::default(), "photo", "image/jpeg", &[1, 2]).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_body(resp).await["error"], "Image file required");
    }

    #[tokio::test]
    async fn non_image_upload_returns_400() {
        let resp = upload(AppState::default(), "image", "application/pdf", b"%PDF-1.4").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_body(resp).await["error"], "Invalid file type");
    }

    #[tokio::test]
    async fn oversized_image_returns_400() {
        let data = vec![0u8; MAX_IMAGE_BYTES + 1];
        let resp = upload(AppState::default(), "image", "image/jpeg", &data).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_multipart_body_returns_400() {
        let resp = build_router(AppState::default())
            .oneshot(crate::routes::test_util::json_post(
                "/api/pest",
                serde_json::json!({ "image": "leaf.jpg" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn detector_output_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crop-pests/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{
                    "class": "spider mite", "confidence": 0.6549,
                    "x": 300.0, "y": 220.0, "width": 80.0, "height": 51.0
                }]
            })))
            .mount(&server)
            .await;

        let resp = upload(state_with_roboflow(&server), "image", "image/jpeg", &[9; 16]).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = read_body(resp).await;
        assert_eq!(body["source"], "roboflow");
        let detection = &body["data"]["detections"][0];
        assert_eq!(detection["label"], "spider mite");
        assert_eq!(detection["confidence"], 0.65);
        assert_eq!(detection["bbox"], serde_json::json!({ "x": 260, "y": 195, "width": 80, "height": 51 }));
        assert!(body["data"]["suggestions"][0].as_str().unwrap().starts_with("Spider mites"));
    }

    #[tokio::test]
    async fn detector_errors_degrade_to_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let resp = upload(state_with_roboflow(&server), "image", "image/jpeg", &[9; 15]).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = read_body(resp).await;
        assert_eq!(body["source"], "fallback");
        assert_eq!(body["warning"], "Using mock data due to API error");
        assert_eq!(body["data"]["detections"][0]["label"], "leaf spot");
    }
}
