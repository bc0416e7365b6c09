pub mod common;
pub mod config;
pub mod coordinator;
pub mod enhancement;
pub mod error;
pub mod finance;
pub mod pipeline;
pub mod report;

pub use error::{AppError, EnhancementError, ExtractionError};

pub use common::roof_image::RoofImage;
pub use config::Settings;
pub use coordinator::{AnalysisMethod, Assessment, Coordinator, CoordinatorBuilder};
pub use pipeline::{analyze, AnalysisPipeline, AnalysisResult, ImageMetrics, RoofCondition};
