use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Enhancement, EnhancementRequest, Enhancer, ORIENTATION_KEY, SHADING_KEY};
use crate::config::EnhancementSettings;
use crate::error::EnhancementError;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Vision backend reached through an OpenAI-compatible chat-completions API.
pub struct OpenRouterEnhancer {
    client: Client,
    endpoint: String,
    api_key: String,
    max_tokens: u32,
    referer: String,
    title: String,
}

impl OpenRouterEnhancer {
    pub fn new(settings: &EnhancementSettings) -> Result<Self, EnhancementError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(EnhancementError::MissingApiKey)?;

        Ok(Self {
            client: Client::builder().build()?,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            api_key,
            max_tokens: settings.max_tokens,
            referer: settings.referer.clone(),
            title: settings.title.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, request: &EnhancementRequest) -> Result<Value, EnhancementError> {
        let prior = serde_json::to_string(&request.prior)
            .map_err(|e| EnhancementError::MalformedPayload(e.to_string()))?;
        let prompt = format!(
            "Enhance this roof analysis: {prior}. Return JSON with {SHADING_KEY} and {ORIENTATION_KEY}."
        );
        let data_url = format!(
            "data:{};base64,{}",
            request.mime_type,
            STANDARD.encode(&request.image)
        );

        Ok(json!({
            "model": request.model.model_id(),
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "max_tokens": self.max_tokens
        }))
    }
}

#[async_trait]
impl Enhancer for OpenRouterEnhancer {
    async fn enhance(&self, request: &EnhancementRequest) -> Result<Enhancement, EnhancementError> {
        let body = self.request_body(request)?;
        debug!(model = request.model.model_id(), "requesting enhancement");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnhancementError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| EnhancementError::MalformedPayload(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(EnhancementError::EmptyResponse)?;

        Enhancement::parse(&content)
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::roof_image::RoofImage;
    use crate::enhancement::VisionModel;
    use crate::pipeline::analyze;
    use image::{DynamicImage, GrayImage, Luma};

    fn settings(api_key: Option<&str>) -> EnhancementSettings {
        EnhancementSettings {
            api_key: api_key.map(str::to_string),
            base_url: "https://example.test/api/v1/".to_string(),
            ..EnhancementSettings::default()
        }
    }

    #[test]
    fn requires_api_key() {
        assert!(matches!(
            OpenRouterEnhancer::new(&settings(None)),
            Err(EnhancementError::MissingApiKey)
        ));
        assert!(matches!(
            OpenRouterEnhancer::new(&settings(Some("  "))),
            Err(EnhancementError::MissingApiKey)
        ));
    }

    #[test]
    fn builds_chat_completion_request() {
        let enhancer = OpenRouterEnhancer::new(&settings(Some("secret"))).unwrap();
        assert_eq!(
            enhancer.endpoint(),
            "https://example.test/api/v1/chat/completions"
        );

        let pixels = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([100])));
        let prior = analyze(&pixels).unwrap();
        let image = RoofImage::from_image(pixels).unwrap();
        let request = EnhancementRequest::new(&image, prior, VisionModel::Qwen25Vl3b);

        let body = enhancer.request_body(&request).unwrap();
        assert_eq!(body["model"], "qwen/qwen2.5-vl-3b-instruct:free");
        assert_eq!(body["max_tokens"], 300);

        let content = &body["messages"][0]["content"];
        let prompt = content[0]["text"].as_str().unwrap();
        assert!(prompt.starts_with("Enhance this roof analysis: {"));
        assert!(prompt.contains("\"roof_condition\":\"poor\""));

        let url = content[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn decodes_completion_payload() {
        let payload = r#"{"choices":[{"message":{"content":"{\"shading_assessment\":\"low\"}"}}]}"#;
        let completion: ChatCompletion = serde_json::from_str(payload).unwrap();
        let content = completion.choices[0].message.content.as_deref().unwrap();
        assert_eq!(
            Enhancement::parse(content).unwrap().shading_assessment(),
            Some("low")
        );
    }
}
