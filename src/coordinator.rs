use crate::{
    common::roof_image::RoofImage,
    config::Settings,
    enhancement::{AnalysisRecord, EnhancementStage, Enhancer, OpenRouterEnhancer, VisionModel},
    error::AppError,
    finance::{FinancialCalculator, FinancialMetrics, Recommendation},
    pipeline::AnalysisPipeline,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisMethod {
    #[serde(rename = "CV Only")]
    CvOnly,
    #[serde(rename = "CV + AI")]
    CvWithAi,
}

impl AnalysisMethod {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMethod::CvOnly => "CV Only",
            AnalysisMethod::CvWithAi => "CV + AI",
        }
    }
}

/// Everything produced for one photo: the (possibly enhanced) analysis, the
/// capped system size and its financials.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub analysis: AnalysisRecord,
    /// System size after the caller's cap, in kW.
    pub system_kw: f64,
    pub metrics: FinancialMetrics,
    pub method: AnalysisMethod,
    pub model: VisionModel,
    pub total_time: Duration,
}

impl Assessment {
    pub fn recommendation(&self) -> Recommendation {
        Recommendation::assess(self.analysis.roof_condition(), self.metrics.payback_years)
    }
}

/// Drives analysis, optional enhancement, the sizing cap and the financials.
pub struct Coordinator {
    pipeline: Arc<AnalysisPipeline>,
    enhancement: Option<EnhancementStage>,
    calculator: FinancialCalculator,
    max_system_kw: f64,
    model: VisionModel,
}

impl Coordinator {
    pub fn builder(settings: Settings) -> CoordinatorBuilder {
        CoordinatorBuilder::new(settings)
    }

    pub fn enhancement_enabled(&self) -> bool {
        self.enhancement.is_some()
    }

    #[instrument(skip_all, fields(image_id = %image.id()))]
    pub async fn assess(&mut self, image: RoofImage) -> Result<Assessment, AppError> {
        let start = Instant::now();

        let pipeline = self.pipeline.clone();
        let pixels = image.pixels();
        let base = tokio::task::spawn_blocking(move || pipeline.analyze(&pixels)).await??;

        let (mut analysis, method) = match self.enhancement.as_mut() {
            Some(stage) => (
                stage.enhance(&image, &base).await,
                AnalysisMethod::CvWithAi,
            ),
            None => (AnalysisRecord::cv_only(&base), AnalysisMethod::CvOnly),
        };

        let system_kw = analysis.system_size_kw().min(self.max_system_kw);
        let metrics = self.calculator.calculate(system_kw);

        let total_time = start.elapsed();
        analysis.set_total_time(total_time);
        info!(
            method = method.label(),
            system_kw,
            total_ms = total_time.as_millis() as u64,
            "assessment complete"
        );

        Ok(Assessment {
            analysis,
            system_kw,
            metrics,
            method,
            model: self.model,
            total_time,
        })
    }
}

pub struct CoordinatorBuilder {
    settings: Settings,
    pipeline: Option<AnalysisPipeline>,
    enhancer: Option<Box<dyn Enhancer>>,
}

impl CoordinatorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            pipeline: None,
            enhancer: None,
        }
    }

    // Sets the sizing cap, this will override the configured value.
    pub fn max_system_kw(mut self, max_system_kw: f64) -> Self {
        self.settings = self.settings.with_max_system_kw(max_system_kw);
        self
    }

    // Selects the vision model, this will override the configured value.
    pub fn model(mut self, model: VisionModel) -> Self {
        self.settings = self.settings.with_model(model);
        self
    }

    pub fn pipeline(mut self, pipeline: AnalysisPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    // Injects an enhancement backend instead of the configured HTTP one.
    pub fn enhancer(mut self, enhancer: Box<dyn Enhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn build(self) -> Result<Coordinator, AppError> {
        self.settings.validate().map_err(AppError::InvalidConfig)?;

        let enhancement_settings = &self.settings.enhancement;
        let enhancer: Option<Box<dyn Enhancer>> = match self.enhancer {
            _ if !enhancement_settings.enabled => None,
            Some(enhancer) => Some(enhancer),
            None => match OpenRouterEnhancer::new(enhancement_settings) {
                Ok(enhancer) => Some(Box::new(enhancer)),
                Err(e) => {
                    warn!(error = %e, "enhancement disabled, running CV only");
                    None
                }
            },
        };

        let enhancement = enhancer.map(|enhancer| {
            EnhancementStage::new(
                enhancer,
                enhancement_settings.model,
                Some(enhancement_settings.timeout()),
            )
        });

        Ok(Coordinator {
            pipeline: Arc::new(self.pipeline.unwrap_or_default()),
            enhancement,
            calculator: FinancialCalculator::new(self.settings.finance.clone()),
            max_system_kw: self.settings.sizing.max_system_kw,
            model: enhancement_settings.model,
        })
    }
}
