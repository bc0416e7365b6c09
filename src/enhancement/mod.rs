//! Optional qualitative enhancement of a CV analysis by a vision model.
//!
//! The pipeline only sees the [`Enhancer`] trait. Whatever goes wrong behind
//! it, [`EnhancementStage`] falls back to neutral labels so a CV-only result
//! is always delivered.

pub mod null;
pub mod openrouter;
pub mod record;
pub mod service;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::common::roof_image::RoofImage;
use crate::error::EnhancementError;
use crate::pipeline::result::round_to;
use crate::pipeline::AnalysisResult;

pub use null::NullEnhancer;
pub use openrouter::OpenRouterEnhancer;
pub use record::AnalysisRecord;
pub use service::{EnhancementStage, EnhancerService};

pub const SHADING_KEY: &str = "shading_assessment";
pub const ORIENTATION_KEY: &str = "roof_orientation";
pub const ELAPSED_KEY: &str = "ai_time";

pub const NEUTRAL_SHADING: &str = "moderate";
pub const NEUTRAL_ORIENTATION: &str = "good";

/// The interchangeable vision backends an enhancement can be requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VisionModel {
    #[default]
    #[serde(rename = "qwen2.5-vl-72b")]
    Qwen25Vl72b,
    #[serde(rename = "qwen2.5-vl-32b")]
    Qwen25Vl32b,
    #[serde(rename = "qwen2.5-vl-3b")]
    Qwen25Vl3b,
}

impl VisionModel {
    pub const ALL: [VisionModel; 3] = [
        VisionModel::Qwen25Vl72b,
        VisionModel::Qwen25Vl32b,
        VisionModel::Qwen25Vl3b,
    ];

    /// Short name used in config files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            VisionModel::Qwen25Vl72b => "qwen2.5-vl-72b",
            VisionModel::Qwen25Vl32b => "qwen2.5-vl-32b",
            VisionModel::Qwen25Vl3b => "qwen2.5-vl-3b",
        }
    }

    /// Identifier sent to the backend.
    pub fn model_id(&self) -> &'static str {
        match self {
            VisionModel::Qwen25Vl72b => "qwen/qwen2.5-vl-72b-instruct:free",
            VisionModel::Qwen25Vl32b => "qwen/qwen2.5-vl-32b-instruct:free",
            VisionModel::Qwen25Vl3b => "qwen/qwen2.5-vl-3b-instruct:free",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VisionModel::Qwen25Vl72b => "Qwen 2.5 VL 72B",
            VisionModel::Qwen25Vl32b => "Qwen 2.5 VL 32B",
            VisionModel::Qwen25Vl3b => "Qwen 2.5 VL 3B",
        }
    }
}

impl fmt::Display for VisionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for VisionModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisionModel::ALL
            .into_iter()
            .find(|model| model.key() == s || model.model_id() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = VisionModel::ALL.iter().map(|m| m.key()).collect();
                format!("unknown model '{s}', expected one of: {}", known.join(", "))
            })
    }
}

/// Everything a backend needs to enhance one analysis.
#[derive(Debug, Clone)]
pub struct EnhancementRequest {
    pub image: Arc<[u8]>,
    pub mime_type: &'static str,
    pub prior: AnalysisResult,
    pub model: VisionModel,
}

impl EnhancementRequest {
    pub fn new(image: &RoofImage, prior: AnalysisResult, model: VisionModel) -> Self {
        Self {
            image: image.bytes(),
            mime_type: image.mime_type(),
            prior,
            model,
        }
    }
}

/// Fields returned by a backend, merged over the CV result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enhancement {
    fields: Map<String, Value>,
}

impl Enhancement {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Stand-in labels used whenever the backend cannot be reached or understood.
    pub fn neutral() -> Self {
        let mut fields = Map::new();
        fields.insert(SHADING_KEY.to_string(), Value::from(NEUTRAL_SHADING));
        fields.insert(ORIENTATION_KEY.to_string(), Value::from(NEUTRAL_ORIENTATION));
        Self { fields }
    }

    /// Parse a model reply. The reply must be a JSON object, optionally inside
    /// a markdown code fence.
    pub fn parse(content: &str) -> Result<Self, EnhancementError> {
        let trimmed = content.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.strip_suffix("```"))
            .unwrap_or(trimmed)
            .trim();

        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(other) => Err(EnhancementError::MalformedPayload(format!(
                "expected a JSON object, got {other}"
            ))),
            Err(e) => Err(EnhancementError::MalformedPayload(e.to_string())),
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.fields.insert(
            ELAPSED_KEY.to_string(),
            Value::from(round_to(elapsed.as_secs_f64(), 2)),
        );
        self
    }

    pub fn shading_assessment(&self) -> Option<&str> {
        self.fields.get(SHADING_KEY).and_then(Value::as_str)
    }

    pub fn roof_orientation(&self) -> Option<&str> {
        self.fields.get(ORIENTATION_KEY).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

/// A backend able to add qualitative labels (shading, orientation, ...) to an analysis.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, request: &EnhancementRequest)
        -> Result<Enhancement, EnhancementError>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_round_trip() {
        for model in VisionModel::ALL {
            assert_eq!(model.key().parse::<VisionModel>(), Ok(model));
            assert_eq!(model.model_id().parse::<VisionModel>(), Ok(model));
        }
        assert!("gpt-4".parse::<VisionModel>().is_err());
        assert_eq!(VisionModel::default(), VisionModel::Qwen25Vl72b);
    }

    #[test]
    fn neutral_labels() {
        let neutral = Enhancement::neutral();
        assert_eq!(neutral.shading_assessment(), Some("moderate"));
        assert_eq!(neutral.roof_orientation(), Some("good"));
        assert_eq!(neutral.fields().len(), 2);
    }

    #[test]
    fn parses_plain_and_fenced_objects() {
        let plain = Enhancement::parse(r#"{"shading_assessment": "low", "roof_orientation": "south"}"#)
            .unwrap();
        assert_eq!(plain.shading_assessment(), Some("low"));

        let fenced = Enhancement::parse(
            "```json\n{\"shading_assessment\": \"heavy\", \"tilt\": 20}\n```",
        )
        .unwrap();
        assert_eq!(fenced.shading_assessment(), Some("heavy"));
        assert_eq!(fenced.roof_orientation(), None);
        assert_eq!(fenced.fields()["tilt"], 20);
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(
            Enhancement::parse("The roof looks sunny."),
            Err(EnhancementError::MalformedPayload(_))
        ));
        assert!(matches!(
            Enhancement::parse("[1, 2, 3]"),
            Err(EnhancementError::MalformedPayload(_))
        ));
    }

    #[test]
    fn elapsed_is_recorded_in_seconds() {
        let enhancement = Enhancement::neutral().with_elapsed(Duration::from_millis(1234));
        assert_eq!(enhancement.fields()[ELAPSED_KEY], 1.23);
    }
}
