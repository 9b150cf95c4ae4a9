use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound for uploaded pest images.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::InvalidLatitude(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }
}

/// Where the `data` of a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Sample,
    Mock,
    OpenWeather,
    Api,
    Roboflow,
    Fallback,
}

/// A payload tagged with its origin, plus a warning when it is a fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub data: T,
    pub source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> Sourced<T> {
    pub fn new(data: T, source: DataSource) -> Self {
        Self {
            data,
            source,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Chat

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub lang: Option<String>,
    pub crop: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// A validated chat question.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatQuery {
    pub message: String,
    pub lang: Option<String>,
    pub crop: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl TryFrom<ChatRequest> for ChatQuery {
    type Error = ValidationError;

    fn try_from(req: ChatRequest) -> Result<Self, Self::Error> {
        let message = req
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or(ValidationError::MissingMessage)?;

        if let Some(lat) = req.lat {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ValidationError::InvalidLatitude(lat));
            }
        }
        if let Some(lon) = req.lon {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ValidationError::InvalidLongitude(lon));
            }
        }

        let coordinates = match (req.lat, req.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)?),
            _ => None,
        };

        Ok(Self {
            message,
            lang: non_blank(req.lang),
            crop: non_blank(req.crop),
            coordinates,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub advice_text: String,
    pub fertilizer: String,
    pub pest_flags: Vec<String>,
    pub suggestions: Vec<String>,
}

/// How the model's reply was turned into [`Advice`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdviceOutcome {
    /// The reply was exactly the requested JSON document.
    Parsed(Advice),
    /// A JSON object was found inside the reply; missing fields were filled in.
    ExtractedPartial(Advice),
    /// No usable JSON; the raw reply became the advice text.
    RawFallback(Advice),
}

impl AdviceOutcome {
    pub fn advice(&self) -> &Advice {
        match self {
            AdviceOutcome::Parsed(a)
            | AdviceOutcome::ExtractedPartial(a)
            | AdviceOutcome::RawFallback(a) => a,
        }
    }

    pub fn into_advice(self) -> Advice {
        match self {
            AdviceOutcome::Parsed(a)
            | AdviceOutcome::ExtractedPartial(a)
            | AdviceOutcome::RawFallback(a) => a,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AdviceOutcome::Parsed(_) => "parsed",
            AdviceOutcome::ExtractedPartial(_) => "extracted",
            AdviceOutcome::RawFallback(_) => "raw",
        }
    }
}

// ---------------------------------------------------------------------------
// Weather

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherRequest {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl TryFrom<WeatherRequest> for Coordinates {
    type Error = ValidationError;

    fn try_from(req: WeatherRequest) -> Result<Self, Self::Error> {
        match (req.lat, req.lon) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => Err(ValidationError::MissingCoordinates),
        }
    }
}

/// Raw conditions as reported by a weather provider.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub location: String,
    pub temperature_c: f64,
    pub description: String,
    pub humidity_pct: u8,
    pub rain_probability_pct: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: String,
    pub temp: f64,
    pub description: String,
    pub humidity: u8,
    pub rain_probability: u8,
    pub alerts: Vec<WeatherAlert>,
}

// ---------------------------------------------------------------------------
// Market

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketRequest {
    pub commodity: Option<String>,
}

impl MarketRequest {
    pub fn commodity(self) -> Result<String, ValidationError> {
        self.commodity
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ValidationError::MissingCommodity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    #[default]
    #[serde(other)]
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandiPrice {
    pub market: String,
    pub min: f64,
    pub max: f64,
    pub modal: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub commodity: String,
    pub mandi_prices: Vec<MandiPrice>,
    pub trend: Trend,
}

// ---------------------------------------------------------------------------
// Pest detection

/// An uploaded image that passed validation.
#[derive(Debug, Clone)]
pub struct PestImage {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PestImage {
    pub fn new(
        filename: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::MissingImage);
        }

        let content_type = content_type.unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(ValidationError::NotAnImage(content_type));
        }

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge {
                size: bytes.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }

        Ok(Self {
            filename: filename
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| "upload".to_string()),
            content_type,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A box as reported by a detection model: `x`/`y` are the box center.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Top-left anchored box in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PestReport {
    pub filename: String,
    pub size: usize,
    pub detections: Vec<Detection>,
    pub suggestions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Feedback

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub rating: Option<f64>,
    pub user_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Bug,
    Feature,
    General,
    Complaint,
    Suggestion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSubmission {
    pub kind: FeedbackKind,
    pub message: String,
    pub rating: Option<f64>,
    pub user_info: Option<serde_json::Value>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_reject_out_of_range() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert_eq!(
            Coordinates::new(90.5, 0.0),
            Err(ValidationError::InvalidLatitude(90.5))
        );
        assert_eq!(
            Coordinates::new(0.0, -180.1),
            Err(ValidationError::InvalidLongitude(-180.1))
        );
    }

    #[test]
    fn weather_request_requires_both_coordinates() {
        let req = WeatherRequest {
            lat: Some(18.5),
            lon: None,
        };
        assert_eq!(
            Coordinates::try_from(req),
            Err(ValidationError::MissingCoordinates)
        );
    }

    #[test]
    fn weather_request_accepts_zero() {
        let req = WeatherRequest {
            lat: Some(0.0),
            lon: Some(0.0),
        };
        assert_eq!(
            Coordinates::try_from(req),
            Ok(Coordinates { lat: 0.0, lon: 0.0 })
        );
    }

    #[test]
    fn chat_query_rejects_blank_message() {
        let req = ChatRequest {
            message: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(
            ChatQuery::try_from(req),
            Err(ValidationError::MissingMessage)
        );
        assert_eq!(
            ChatQuery::try_from(ChatRequest::default()),
            Err(ValidationError::MissingMessage)
        );
    }

    #[test]
    fn chat_query_validates_lone_coordinate() {
        let req = ChatRequest {
            message: Some("When to sow?".into()),
            lat: Some(120.0),
            ..Default::default()
        };
        assert_eq!(
            ChatQuery::try_from(req),
            Err(ValidationError::InvalidLatitude(120.0))
        );
    }

    #[test]
    fn chat_query_keeps_location_only_with_both_values() {
        let req = ChatRequest {
            message: Some("When to sow?".into()),
            lat: Some(19.0),
            crop: Some("  ".into()),
            ..Default::default()
        };
        let query = ChatQuery::try_from(req).unwrap();
        assert_eq!(query.coordinates, None);
        assert_eq!(query.crop, None);
    }

    #[test]
    fn market_request_trims_commodity() {
        let req = MarketRequest {
            commodity: Some("  Onion ".into()),
        };
        assert_eq!(req.commodity().unwrap(), "Onion");
        assert_eq!(
            MarketRequest::default().commodity(),
            Err(ValidationError::MissingCommodity)
        );
    }

    #[test]
    fn pest_image_validation() {
        let err = PestImage::new(Some("a.txt".into()), Some("text/plain".into()), vec![1]);
        assert!(matches!(err, Err(ValidationError::NotAnImage(_))));

        let err = PestImage::new(Some("a.png".into()), Some("image/png".into()), vec![]);
        assert!(matches!(err, Err(ValidationError::MissingImage)));

        let err = PestImage::new(
            Some("a.png".into()),
            Some("image/png".into()),
            vec![0; MAX_IMAGE_BYTES + 1],
        );
        assert!(matches!(err, Err(ValidationError::ImageTooLarge { .. })));

        let ok = PestImage::new(None, Some("image/jpeg".into()), vec![0; 4]).unwrap();
        assert_eq!(ok.filename, "upload");
        assert_eq!(ok.size(), 4);
    }

    #[test]
    fn trend_defaults_unknown_values_to_stable() {
        let trend: Trend = serde_json::from_str("\"volatile\"").unwrap();
        assert_eq!(trend, Trend::Stable);
        let trend: Trend = serde_json::from_str("\"rising\"").unwrap();
        assert_eq!(trend, Trend::Rising);
        let trend: Trend = serde_json::from_str("\"falling\"").unwrap();
        assert_eq!(trend, Trend::Falling);
    }

    #[test]
    fn trend_serializes_lowercase() {
        for (trend, wire) in [
            (Trend::Rising, "\"rising\""),
            (Trend::Falling, "\"falling\""),
            (Trend::Stable, "\"stable\""),
        ] {
            assert_eq!(serde_json::to_string(&trend).unwrap(), wire);
        }
        assert_eq!(Trend::default(), Trend::Stable);
    }

    #[test]
    fn weather_report_uses_camel_case() {
        let report = WeatherReport {
            location: "Pune".into(),
            temp: 30.1,
            description: "haze".into(),
            humidity: 40,
            rain_probability: 10,
            alerts: vec![],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["rainProbability"], 10);
    }

    #[test]
    fn sourced_skips_missing_warning() {
        let value = serde_json::to_value(Sourced::new(1, DataSource::Mock)).unwrap();
        assert_eq!(value, serde_json::json!({ "data": 1, "source": "mock" }));
    }
}
