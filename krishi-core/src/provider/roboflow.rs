use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;

use crate::{
    error::{UpstreamError, truncate_body},
    model::{PestImage, Prediction},
};

use super::{PestDetector, ProviderId};

const BASE_URL: &str = "https://detect.roboflow.com";

pub const DETECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Roboflow hosted object-detection model.
#[derive(Debug, Clone)]
pub struct RoboflowDetector {
    api_key: String,
    model_id: String,
    base_url: String,
    http: Client,
}

impl RoboflowDetector {
    pub fn new(api_key: String, model_id: String) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(DETECTION_TIMEOUT).build()?;
        Ok(Self {
            api_key,
            model_id,
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[async_trait]
impl PestDetector for RoboflowDetector {
    async fn detect(&self, image: &PestImage) -> Result<Vec<Prediction>, UpstreamError> {
        let url = format!("{}/{}", self.base_url, self.model_id);

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(&image.content_type)
            .map_err(|e| UpstreamError::from_reqwest(ProviderId::Roboflow, e))?;
        let form = Form::new().part("file", part);

        let res = self
            .http
            .post(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(ProviderId::Roboflow, e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(ProviderId::Roboflow, e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: ProviderId::Roboflow,
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: DetectResponse = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::decode(ProviderId::Roboflow, e.to_string()))?;

        Ok(parsed.predictions)
    }
}
