use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::coordinator::Assessment;
use crate::enhancement::AnalysisRecord;
use crate::error::AppError;
use crate::finance::FinancialMetrics;

const CURRENCY: &str = "INR";

#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub total_time: Option<f64>,
    pub confidence: u32,
}

/// Downloadable summary of one assessment.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub timestamp: String,
    pub performance: Performance,
    pub analysis: AnalysisRecord,
    pub metrics: FinancialMetrics,
    pub currency: &'static str,
    #[serde(skip)]
    generated_at: DateTime<Local>,
}

impl Report {
    pub fn new(assessment: &Assessment) -> Self {
        Self::generated_at(assessment, Local::now())
    }

    pub fn generated_at(assessment: &Assessment, generated_at: DateTime<Local>) -> Self {
        Self {
            timestamp: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            performance: Performance {
                total_time: assessment.analysis.total_time(),
                confidence: assessment.analysis.confidence(),
            },
            analysis: assessment.analysis.clone(),
            metrics: assessment.metrics.clone(),
            currency: CURRENCY,
            generated_at,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "solar_report_{}.json",
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report into `dir` under its default file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, AppError> {
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::AnalysisMethod;
    use crate::enhancement::{Enhancement, VisionModel};
    use crate::finance::FinancialCalculator;
    use crate::pipeline::analyze;
    use chrono::TimeZone;
    use image::{DynamicImage, GrayImage, Luma};
    use std::time::Duration;

    fn assessment() -> Assessment {
        let base = analyze(&DynamicImage::ImageLuma8(GrayImage::from_pixel(
            50,
            40,
            Luma([128]),
        )))
        .unwrap();
        let mut analysis = AnalysisRecord::enhanced(&base, Enhancement::neutral());
        analysis.set_total_time(Duration::from_millis(1500));

        Assessment {
            metrics: FinancialCalculator::default().calculate(analysis.system_size_kw()),
            system_kw: analysis.system_size_kw(),
            analysis,
            method: AnalysisMethod::CvWithAi,
            model: VisionModel::default(),
            total_time: Duration::from_millis(1500),
        }
    }

    #[test]
    fn report_layout() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let report = Report::generated_at(&assessment(), at);

        assert_eq!(report.file_name(), "solar_report_20240309_140507.json");

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["timestamp"], "2024-03-09 14:05:07");
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["performance"]["total_time"], 1.5);
        assert_eq!(json["performance"]["confidence"], 60);
        assert_eq!(json["analysis"]["roof_condition"], "poor");
        assert_eq!(json["analysis"]["shading_assessment"], "moderate");
        assert_eq!(json["metrics"]["system_kw"], 2.0);
        assert!(json.get("generated_at").is_none());
    }

    #[test]
    fn writes_into_directory() {
        let dir = std::env::temp_dir().join(format!("solar-report-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let report = Report::new(&assessment());
        let path = report.write_to(&dir).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"currency\": \"INR\""));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
