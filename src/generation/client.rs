use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::GenerationError;
use crate::storage::config::GenerationConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    #[serde(default)]
    text: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    image_url: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_caption(&self, prompt: &str) -> Result<String, GenerationError>;

    async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Calls the hosted `generate-caption` and `generate-image` functions once per
/// request. No retries.
pub struct HttpContentGenerator {
    base_url: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    image_width: u32,
    image_height: u32,
    client: reqwest::Client,
}

impl HttpContentGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_tokens: config.caption_max_tokens,
            temperature: config.caption_temperature,
            image_width: config.image_width,
            image_height: config.image_height,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn caption_request(&self, prompt: &str) -> Result<CaptionRequest, GenerationError> {
        Ok(CaptionRequest {
            prompt: required_prompt(prompt)?,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }

    pub fn image_request(&self, prompt: &str) -> Result<ImageRequest, GenerationError> {
        Ok(ImageRequest {
            prompt: required_prompt(prompt)?,
            width: self.image_width,
            height: self.image_height,
        })
    }

    async fn post<B: Serialize>(&self, function: &str, body: &B) -> Result<String, GenerationError> {
        let url = format!("{}/{}", self.base_url, function);
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::info!("{} response status: {}", function, status);

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("Status {}: {}", status, body));
            tracing::error!("{} failed: {}", function, message);
            return Err(GenerationError::Remote(message));
        }

        Ok(body)
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate_caption(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = self.caption_request(prompt)?;
        let body = self.post("generate-caption", &request).await?;

        let response: CaptionResponse = serde_json::from_str(&body)?;
        match response.error {
            Some(error) => Err(GenerationError::Remote(error)),
            None => Ok(response.text),
        }
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = self.image_request(prompt)?;
        let body = self.post("generate-image", &request).await?;

        let response: ImageResponse = serde_json::from_str(&body)?;
        match response.error {
            Some(error) => Err(GenerationError::Remote(error)),
            None => Ok(response.image_url),
        }
    }
}

fn required_prompt(prompt: &str) -> Result<String, GenerationError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }
    Ok(prompt.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Config;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator_for(server: &MockServer) -> HttpContentGenerator {
        HttpContentGenerator::new(&Config::default().generation).with_base_url(server.uri())
    }

    #[test]
    fn caption_request_uses_configured_limits() {
        let mut config = Config::default().generation;
        config.caption_max_tokens = 64;
        let generator = HttpContentGenerator::new(&config);

        let request = generator.caption_request("  bakery opening  ").unwrap();

        assert_eq!(request.prompt, "bakery opening");
        assert_eq!(request.max_tokens, 64);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["maxTokens"], json!(64));
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let generator = HttpContentGenerator::new(&Config::default().generation)
            .with_base_url("http://localhost:8080/".to_string());

        assert_eq!(generator.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let generator = generator_for(&server);

        let caption = generator.generate_caption("   ").await;
        let image = generator.generate_image("").await;

        assert!(matches!(caption, Err(GenerationError::EmptyPrompt)));
        assert!(matches!(image, Err(GenerationError::EmptyPrompt)));
    }

    #[tokio::test]
    async fn generates_caption() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-caption"))
            .and(body_json(json!({
                "prompt": "fresh croissants",
                "maxTokens": 256,
                "temperature": 0.7,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "Warm and flaky!"})))
            .expect(1)
            .mount(&server)
            .await;

        let caption = generator_for(&server).generate_caption("fresh croissants").await.unwrap();

        assert_eq!(caption, "Warm and flaky!");
    }

    #[tokio::test]
    async fn generates_image_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-image"))
            .and(body_json(json!({"prompt": "latte art", "width": 1024, "height": 1024})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"imageUrl": "https://images.test/latte.svg"})),
            )
            .mount(&server)
            .await;

        let url = generator_for(&server).generate_image("latte art").await.unwrap();

        assert_eq!(url, "https://images.test/latte.svg");
    }

    #[tokio::test]
    async fn error_field_in_response_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-caption"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"text": "", "error": "Prompt is required"})),
            )
            .mount(&server)
            .await;

        let result = generator_for(&server).generate_caption("anything").await;

        match result {
            Err(GenerationError::Remote(message)) => assert_eq!(message, "Prompt is required"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn error_field_with_success_status_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-image"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"imageUrl": "", "error": "quota exceeded"})),
            )
            .mount(&server)
            .await;

        let result = generator_for(&server).generate_image("anything").await;

        assert!(matches!(result, Err(GenerationError::Remote(m)) if m == "quota exceeded"));
    }

    #[tokio::test]
    async fn non_json_failure_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let result = generator_for(&server).generate_caption("anything").await;

        assert!(matches!(result, Err(GenerationError::Remote(m)) if m.contains("502")));
    }

    #[tokio::test]
    async fn sends_api_key_as_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        let mut config = Config::default().generation;
        config.api_key = Some("secret".to_string());
        let generator = HttpContentGenerator::new(&config).with_base_url(server.uri());

        let caption = generator.generate_caption("hello").await.unwrap();

        assert_eq!(caption, "ok");
    }
}
