use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::metrics::ImageMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofCondition {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl RoofCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoofCondition::Excellent => "excellent",
            RoofCondition::Good => "good",
            RoofCondition::Fair => "fair",
            RoofCondition::Poor => "poor",
        }
    }

    /// Capitalized label for human-readable notes.
    pub fn title(&self) -> &'static str {
        match self {
            RoofCondition::Excellent => "Excellent",
            RoofCondition::Good => "Good",
            RoofCondition::Fair => "Fair",
            RoofCondition::Poor => "Poor",
        }
    }
}

impl fmt::Display for RoofCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoofCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excellent" => Ok(RoofCondition::Excellent),
            "good" => Ok(RoofCondition::Good),
            "fair" => Ok(RoofCondition::Fair),
            "poor" => Ok(RoofCondition::Poor),
            other => Err(format!("unknown roof condition '{other}'")),
        }
    }
}

/// The three signals the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySignals {
    pub sharpness: f64,
    pub contrast: f64,
    pub brightness: f64,
}

impl From<&ImageMetrics> for QualitySignals {
    fn from(metrics: &ImageMetrics) -> Self {
        Self {
            sharpness: metrics.sharpness,
            contrast: metrics.contrast,
            brightness: metrics.brightness,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub condition: RoofCondition,
    pub multiplier: f64,
}

impl Classification {
    const fn new(condition: RoofCondition, multiplier: f64) -> Self {
        Self {
            condition,
            multiplier,
        }
    }
}

struct ConditionRule {
    matches: fn(&QualitySignals) -> bool,
    classify: fn(&QualitySignals) -> Classification,
}

const FALLBACK: Classification = Classification::new(RoofCondition::Poor, 0.50);

// Evaluated top to bottom; the first matching rule wins.
const RULES: [ConditionRule; 4] = [
    ConditionRule {
        matches: |s| s.sharpness > 800.0 && s.contrast > 50.0 && s.brightness > 130.0,
        classify: |_| Classification::new(RoofCondition::Excellent, 1.00),
    },
    ConditionRule {
        matches: |s| s.sharpness > 500.0 && s.contrast > 40.0,
        classify: |s| {
            if s.brightness > 120.0 {
                Classification::new(RoofCondition::Excellent, 0.95)
            } else {
                Classification::new(RoofCondition::Good, 0.85)
            }
        },
    },
    ConditionRule {
        matches: |s| s.sharpness > 300.0 && s.contrast > 30.0,
        classify: |_| Classification::new(RoofCondition::Good, 0.80),
    },
    ConditionRule {
        matches: |s| s.sharpness > 150.0 && s.contrast > 20.0,
        classify: |_| Classification::new(RoofCondition::Fair, 0.65),
    },
];

/// Maps image quality signals to a roof condition and its multiplier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionClassifier;

impl ConditionClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, signals: QualitySignals) -> Classification {
        RULES
            .iter()
            .find(|rule| (rule.matches)(&signals))
            .map(|rule| (rule.classify)(&signals))
            .unwrap_or(FALLBACK)
    }
}
