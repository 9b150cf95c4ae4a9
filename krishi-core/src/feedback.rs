use std::str::FromStr;

use crate::{
    error::ValidationError,
    model::{FeedbackKind, FeedbackRequest, FeedbackSubmission},
};

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Bug => "bug",
            FeedbackKind::Feature => "feature",
            FeedbackKind::General => "general",
            FeedbackKind::Complaint => "complaint",
            FeedbackKind::Suggestion => "suggestion",
        }
    }
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bug" => Ok(FeedbackKind::Bug),
            "feature" => Ok(FeedbackKind::Feature),
            "general" => Ok(FeedbackKind::General),
            "complaint" => Ok(FeedbackKind::Complaint),
            "suggestion" => Ok(FeedbackKind::Suggestion),
            other => Err(ValidationError::InvalidFeedbackType(other.to_string())),
        }
    }
}

impl TryFrom<FeedbackRequest> for FeedbackSubmission {
    type Error = ValidationError;

    fn try_from(req: FeedbackRequest) -> Result<Self, Self::Error> {
        let (Some(kind), Some(message)) = (
            req.kind.filter(|k| !k.trim().is_empty()),
            req.message.filter(|m| !m.trim().is_empty()),
        ) else {
            return Err(ValidationError::MissingFeedbackFields);
        };

        let kind: FeedbackKind = kind.parse()?;

        let rating = match req.rating {
            None => None,
            Some(r) if (1.0..=5.0).contains(&r) => Some(r),
            Some(r) => return Err(ValidationError::InvalidRating(r)),
        };

        Ok(Self {
            kind,
            message,
            rating,
            user_info: req.user_info,
        })
    }
}
