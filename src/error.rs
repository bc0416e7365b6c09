use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Extraction Error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// Image decode/processing failure; aborts the analysis for that image.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

// Remote enhancement failure. Always recovered by the enhancement stage.
#[derive(Error, Debug)]
pub enum EnhancementError {
    #[error("Enhancement unavailable: {0}")]
    Unavailable(String),
    #[error("No API key configured for the vision backend")]
    MissingApiKey,
    #[error("Request to vision backend failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Vision backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Vision backend returned no message content")]
    EmptyResponse,
    #[error("Malformed enhancement payload: {0}")]
    MalformedPayload(String),
}
