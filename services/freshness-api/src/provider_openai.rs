use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::AppConfig;
use crate::provider::{InferenceError, ProviderInfo, VisionProvider};

const SYSTEM_PROMPT: &str = r#"You grade the freshness of fruit and vegetables for shoppers.
Respond in English with JSON only, no prose.

Analyze every individual item in the photo separately. When several items share a type,
number them: "Apple #1", "Apple #2".

Return exactly this shape:
{
  "fruits": [
    {
      "item": "Apple #1",
      "freshness": 85,
      "recommendation": "buy",
      "details": "What you see on this specific item",
      "confidence": 90,
      "characteristics": {"color": "...", "texture": "...", "blemishes": "...", "ripeness": "..."},
      "position": {"x": 25, "y": 30, "width": 12, "height": 15},
      "storageRecommendation": "...",
      "daysRemaining": 7,
      "nutritionInfo": {"calories": "...", "vitamins": "...", "fiber": "...", "minerals": "...", "benefits": "..."},
      "selectionTips": "...",
      "seasonInfo": "...",
      "commonUses": "...",
      "ripeTiming": "...",
      "pairings": "...",
      "medicinalUses": "..."
    }
  ]
}

freshness and confidence are plain integers from 0 to 100.
recommendation is one of "buy" (fresh), "check" (inspect first) or "avoid" (poor quality).
position values are percentages of the image: x, y of the item centre, width and height of its box."#;

const USER_PROMPT: &str = "Identify every individual fruit or vegetable in this image and grade each one.";

pub struct OpenAiVisionProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiVisionProvider {
    pub fn new(base_url: String, api_key: Option<String>, model: String, timeout: Duration) -> Self {
        Self {
            base_url,
            api_key,
            model,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Replaces the HTTP client, e.g. to set proxy or TLS options.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.openai_base_url.clone(),
            cfg.openai_api_key.clone(),
            cfg.model.clone(),
            cfg.inference_timeout,
        )
    }

    fn request_body(&self, image_data_url: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": [
                    {"type": "text", "text": USER_PROMPT},
                    {"type": "image_url", "image_url": {"url": image_data_url, "detail": "high"}}
                ]}
            ],
            "response_format": {"type": "json_object"},
            "max_tokens": 4000,
            "temperature": 0.1
        })
    }
}

#[async_trait]
impl VisionProvider for OpenAiVisionProvider {
    async fn infer(&self, image_data_url: &str) -> Result<String, InferenceError> {
        let Some(api_key) = &self.api_key else {
            return Err(InferenceError::Unavailable("OPENAI_API_KEY is not configured".to_string()));
        };

        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.request_body(image_data_url);

        let call = async {
            let resp = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await?
                .error_for_status()?;
            resp.json::<serde_json::Value>().await
        };

        let json = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => return Err(InferenceError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) if e.is_timeout() => return Err(InferenceError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) => return Err(InferenceError::Provider(e.to_string())),
            Ok(Ok(v)) => v,
        };

        // Extract content
        let content = json["choices"][0]["message"]["content"].as_str().unwrap_or("");
        if content.trim().is_empty() {
            return Err(InferenceError::Provider("empty response from model".to_string()));
        }
        debug!(model=%self.model, bytes=content.len(), "vision model answered");
        Ok(content.to_string())
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "openai".to_string(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            configured: self.api_key.is_some(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}
