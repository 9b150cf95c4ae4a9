//! Prompt construction and recovery of structured advice from model replies.

use serde_json::{Map, Value};

use crate::{
    error::UpstreamError,
    model::{Advice, AdviceOutcome, ChatQuery},
    provider::AdvisorProvider,
};

const FALLBACK_FERTILIZER: &str =
    "Please consult with a local agricultural expert for specific fertilizer recommendations.";
const FALLBACK_PEST_FLAG: &str = "Unable to identify specific pests from the response";
const FALLBACK_SUGGESTION: &str =
    "Review the advice above and consult local agricultural resources";

/// Build the model prompt. Context lines follow the question in the order
/// crop, location, language, each only when present.
pub fn build_prompt(query: &ChatQuery) -> String {
    let mut prompt = String::from(
        "You are an expert agricultural advisor. Please provide farming advice based on the following information:\n\n",
    );
    prompt.push_str(&format!("Question: {}\n\n", query.message));

    if let Some(crop) = &query.crop {
        prompt.push_str(&format!("Crop: {crop}\n"));
    }
    if let Some(coords) = &query.coordinates {
        prompt.push_str(&format!(
            "Location: Latitude {}, Longitude {}\n",
            coords.lat, coords.lon
        ));
    }
    if let Some(lang) = &query.lang {
        prompt.push_str(&format!("Language preference: {lang}\n"));
    }

    prompt.push_str("\nPlease provide your response in the following JSON format:\n");
    prompt.push_str("- advice_text: Detailed farming advice\n");
    prompt.push_str("- fertilizer: Recommended fertilizer or soil amendment\n");
    prompt.push_str("- pest_flags: Array of potential pests/diseases to watch for\n");
    prompt.push_str("- suggestions: Array of actionable farming suggestions\n\n");
    prompt.push_str(
        "Consider the location, crop type, and season when providing advice. Be specific and practical.",
    );

    prompt
}

/// Advice used when the reply carries no usable structure.
pub fn fallback_advice(advice_text: impl Into<String>) -> Advice {
    Advice {
        advice_text: advice_text.into(),
        fertilizer: FALLBACK_FERTILIZER.to_string(),
        pest_flags: vec![FALLBACK_PEST_FLAG.to_string()],
        suggestions: vec![FALLBACK_SUGGESTION.to_string()],
    }
}

/// Turn a model reply into advice, preferring the strictest reading that works.
pub fn recover_advice(text: &str) -> AdviceOutcome {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text.trim()) {
        if let Some(advice) = strict(&obj) {
            return AdviceOutcome::Parsed(advice);
        }
    }

    if let Some(obj) = extract_object(text) {
        return AdviceOutcome::ExtractedPartial(lenient(&obj, text));
    }

    AdviceOutcome::RawFallback(fallback_advice(text))
}

/// The span from the first `{` to the last `}`, if it parses as an object.
fn extract_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn strict(obj: &Map<String, Value>) -> Option<Advice> {
    let advice_text = non_empty_str(obj.get("advice_text"))?;
    let fertilizer = non_empty_str(obj.get("fertilizer"))?;
    let pest_flags = string_array(obj.get("pest_flags"))?;
    let suggestions = string_array(obj.get("suggestions"))?;

    Some(Advice {
        advice_text,
        fertilizer,
        pest_flags,
        suggestions,
    })
}

fn lenient(obj: &Map<String, Value>, raw: &str) -> Advice {
    let fallback = fallback_advice(raw);

    Advice {
        advice_text: non_empty_str(obj.get("advice_text")).unwrap_or(fallback.advice_text),
        fertilizer: non_empty_str(obj.get("fertilizer")).unwrap_or(fallback.fertilizer),
        pest_flags: string_array(obj.get("pest_flags")).unwrap_or(fallback.pest_flags),
        suggestions: string_array(obj.get("suggestions")).unwrap_or(fallback.suggestions),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Array items are stringified when they are not strings already.
fn string_array(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    )
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

/// Ask the model and recover whatever advice its reply holds.
pub async fn advise(
    provider: &dyn AdvisorProvider,
    query: &ChatQuery,
) -> Result<AdviceOutcome, UpstreamError> {
    let prompt = build_prompt(query);
    tracing::debug!(prompt = %preview(&prompt), "sending prompt to advisor");

    let reply = provider.generate(&prompt).await?;
    tracing::debug!(reply = %preview(&reply), "advisor replied");

    let outcome = recover_advice(&reply);
    if !matches!(outcome, AdviceOutcome::Parsed(_)) {
        tracing::warn!(outcome = outcome.kind(), "advisor reply was not the requested JSON");
    }

    Ok(outcome)
}
