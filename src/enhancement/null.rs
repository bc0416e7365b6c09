use async_trait::async_trait;

use super::{Enhancement, EnhancementRequest, Enhancer};
use crate::error::EnhancementError;

/// Backend that is never available. Every request falls back to neutral labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEnhancer;

#[async_trait]
impl Enhancer for NullEnhancer {
    async fn enhance(&self, _request: &EnhancementRequest) -> Result<Enhancement, EnhancementError> {
        Err(EnhancementError::Unavailable(
            "no enhancement backend configured".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
