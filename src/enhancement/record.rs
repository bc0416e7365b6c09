use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::time::Duration;

use super::{Enhancement, ORIENTATION_KEY, SHADING_KEY};
use crate::pipeline::result::round_to;
use crate::pipeline::{AnalysisResult, RoofCondition};

const TOTAL_TIME_KEY: &str = "total_analysis_time";

/// The CV result as a flat field map, with any enhancement fields merged on
/// top. Typed accessors read the merged view and fall back to the CV result.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    base: AnalysisResult,
    fields: Map<String, Value>,
}

impl AnalysisRecord {
    pub fn cv_only(base: &AnalysisResult) -> Self {
        Self {
            base: base.clone(),
            fields: Self::flatten(base),
        }
    }

    pub fn enhanced(base: &AnalysisResult, enhancement: Enhancement) -> Self {
        let mut record = Self::cv_only(base);
        for (key, value) in enhancement.into_fields() {
            record.fields.insert(key, value);
        }
        record
    }

    fn flatten(base: &AnalysisResult) -> Map<String, Value> {
        match serde_json::to_value(base) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }

    pub fn base(&self) -> &AnalysisResult {
        &self.base
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn shading_assessment(&self) -> Option<&str> {
        self.get_str(SHADING_KEY)
    }

    pub fn roof_orientation(&self) -> Option<&str> {
        self.get_str(ORIENTATION_KEY)
    }

    pub fn roof_condition(&self) -> RoofCondition {
        self.get_str("roof_condition")
            .and_then(|s| s.to_ascii_lowercase().parse().ok())
            .unwrap_or(self.base.roof_condition)
    }

    pub fn system_size_kw(&self) -> f64 {
        self.fields
            .get("system_size_kw")
            .and_then(Value::as_f64)
            .filter(|kw| kw.is_finite())
            .unwrap_or(self.base.system_size_kw)
    }

    pub fn usable_area_percent(&self) -> u32 {
        self.fields
            .get("usable_area_percent")
            .and_then(Value::as_u64)
            .map(|p| p.min(100) as u32)
            .unwrap_or(self.base.usable_area_percent)
    }

    pub fn confidence(&self) -> u32 {
        self.fields
            .get("confidence")
            .and_then(Value::as_u64)
            .map(|c| c.min(u32::MAX as u64) as u32)
            .unwrap_or(self.base.confidence)
    }

    pub fn set_total_time(&mut self, total: Duration) {
        self.fields.insert(
            TOTAL_TIME_KEY.to_string(),
            Value::from(round_to(total.as_secs_f64(), 2)),
        );
    }

    pub fn total_time(&self) -> Option<f64> {
        self.fields.get(TOTAL_TIME_KEY).and_then(Value::as_f64)
    }
}

impl Serialize for AnalysisRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze;
    use image::{DynamicImage, GrayImage, Luma};

    fn base() -> AnalysisResult {
        analyze(&DynamicImage::ImageLuma8(GrayImage::from_pixel(
            100,
            100,
            Luma([128]),
        )))
        .unwrap()
    }

    #[test]
    fn cv_only_record_mirrors_result() {
        let base = base();
        let record = AnalysisRecord::cv_only(&base);

        assert_eq!(record.get_str("roof_condition"), Some("poor"));
        assert_eq!(record.fields()["usable_area_percent"], 15);
        assert_eq!(record.fields()["system_size_kw"], 2.0);
        assert_eq!(record.fields()["image_size"], "100x100");
        assert_eq!(record.fields()["image_metrics"]["roof_area_m2"], 6.0);
        assert!(record.fields().contains_key("raw_metrics"));
        assert_eq!(record.shading_assessment(), None);
        assert_eq!(record.system_size_kw(), 2.0);
    }

    #[test]
    fn enhancement_overrides_on_collision() {
        let base = base();
        let mut fields = Map::new();
        fields.insert("roof_condition".into(), "Good".into());
        fields.insert("system_size_kw".into(), 7.5.into());
        fields.insert("notes".into(), Value::Null);
        fields.insert("usable_area_percent".into(), 40.into());

        let record = AnalysisRecord::enhanced(&base, Enhancement::from_fields(fields));
        assert_eq!(record.roof_condition(), RoofCondition::Good);
        assert_eq!(record.system_size_kw(), 7.5);
        assert_eq!(record.usable_area_percent(), 40);
        assert_eq!(record.fields()["notes"], Value::Null);
        assert_eq!(record.base().system_size_kw, 2.0);
    }

    #[test]
    fn unusable_overrides_fall_back_to_cv_values() {
        let base = base();
        let mut fields = Map::new();
        fields.insert("roof_condition".into(), "splendid".into());
        fields.insert("system_size_kw".into(), "lots".into());
        fields.insert("usable_area_percent".into(), (-5).into());

        let record = AnalysisRecord::enhanced(&base, Enhancement::from_fields(fields));
        assert_eq!(record.roof_condition(), RoofCondition::Poor);
        assert_eq!(record.system_size_kw(), 2.0);
        assert_eq!(record.usable_area_percent(), 15);
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut record = AnalysisRecord::enhanced(&base(), Enhancement::neutral());
        record.set_total_time(Duration::from_millis(456));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["shading_assessment"], "moderate");
        assert_eq!(json["total_analysis_time"], 0.46);
        assert_eq!(record.total_time(), Some(0.46));
    }
}
