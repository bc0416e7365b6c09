use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};
use tracing::{info, instrument, warn};

use super::{AnalysisRecord, Enhancement, EnhancementRequest, Enhancer, VisionModel};
use crate::common::roof_image::RoofImage;
use crate::pipeline::AnalysisResult;

/// Exposes an [`Enhancer`] as a tower `Service` so it can be layered.
#[derive(Clone)]
pub struct EnhancerService {
    inner: Arc<dyn Enhancer>,
}

impl EnhancerService {
    pub fn new(inner: Box<dyn Enhancer>) -> Self {
        Self {
            inner: Arc::from(inner),
        }
    }
}

impl Service<EnhancementRequest> for EnhancerService {
    type Response = Enhancement;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: EnhancementRequest) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move { inner.enhance(&request).await.map_err(BoxError::from) })
    }
}

/// Runs the enhancement after a CV analysis. Never fails: timeouts and
/// backend errors yield the neutral labels instead.
pub struct EnhancementStage {
    service: BoxService<EnhancementRequest, Enhancement, BoxError>,
    backend: &'static str,
    model: VisionModel,
}

impl EnhancementStage {
    pub fn new(enhancer: Box<dyn Enhancer>, model: VisionModel, timeout: Option<Duration>) -> Self {
        let backend = enhancer.name();
        let service = ServiceBuilder::new()
            .option_layer(timeout.map(TimeoutLayer::new))
            .service(EnhancerService::new(enhancer));

        Self {
            service: BoxService::new(service),
            backend,
            model,
        }
    }

    pub fn model(&self) -> VisionModel {
        self.model
    }

    #[instrument(skip_all, fields(backend = self.backend, model = %self.model))]
    pub async fn enhance(&mut self, image: &RoofImage, prior: &AnalysisResult) -> AnalysisRecord {
        let request = EnhancementRequest::new(image, prior.clone(), self.model);
        let start = Instant::now();

        let outcome = match self.service.ready().await {
            Ok(service) => service.call(request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(enhancement) => {
                let elapsed = start.elapsed();
                info!(elapsed_ms = elapsed.as_millis() as u64, "enhancement applied");
                AnalysisRecord::enhanced(prior, enhancement.with_elapsed(elapsed))
            }
            Err(e) if e.is::<Elapsed>() => {
                warn!("enhancement timed out, using neutral defaults");
                AnalysisRecord::enhanced(prior, Enhancement::neutral())
            }
            Err(e) => {
                warn!(error = %e, "enhancement unavailable, using neutral defaults");
                AnalysisRecord::enhanced(prior, Enhancement::neutral())
            }
        }
    }
}
