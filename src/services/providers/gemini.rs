use async_trait::async_trait;
use base64::Engine;
use garde::Validate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{prompt, ContentProvider, GenerationError};
use crate::models::content::{ContentRequest, GeneratedContent};
use crate::models::provider::ProviderConfig;
use crate::services::registry::ProviderError;

pub const GEMINI_PROVIDER_NAME: &str = "gemini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Network limits shared by remote providers.
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    pub base_url: String,
    pub image_fetch_timeout: Duration,
    pub generation_timeout: Duration,
    pub max_image_bytes: usize,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            image_fetch_timeout: Duration::from_secs(15),
            generation_timeout: Duration::from_secs(60),
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiProvider {
    http: Client,
    api_key: String,
    model_name: String,
    options: RemoteOptions,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Image bytes ready to inline into a request.
struct FetchedImage {
    mime_type: &'static str,
    bytes: Vec<u8>,
}

impl GeminiProvider {
    pub fn new(
        http: Client,
        config: ProviderConfig,
        options: RemoteOptions,
    ) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .ok_or_else(|| ProviderError::MissingCredential {
                provider: GEMINI_PROVIDER_NAME.to_string(),
                hint: "GEMINI_API_KEY or GOOGLE_API_KEY".to_string(),
            })?;

        Ok(Self {
            http,
            api_key,
            model_name: config
                .model_name
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            options,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Download the image behind `url` and sniff its format.
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, GenerationError> {
        let fetch_err = |source| GenerationError::ImageFetch {
            url: url.to_string(),
            source,
        };

        let mut response = self
            .http
            .get(url)
            .timeout(self.options.image_fetch_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;

        let limit = self.options.max_image_bytes;
        let too_large = |size| GenerationError::ImageTooLarge {
            url: url.to_string(),
            size,
            limit,
        };
        if let Some(len) = response.content_length() {
            if len as usize > limit {
                return Err(too_large(len as usize));
            }
        }

        // Chunked bodies carry no length, so the cap is enforced while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(fetch_err)? {
            if bytes.len() + chunk.len() > limit {
                return Err(too_large(bytes.len() + chunk.len()));
            }
            bytes.extend_from_slice(&chunk);
        }

        let format = image::guess_format(&bytes)
            .map_err(|_| GenerationError::UnsupportedImage(url.to_string()))?;

        Ok(FetchedImage {
            mime_type: format.to_mime_type(),
            bytes,
        })
    }

    fn request_body(prompt: &str, image: &FetchedImage) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": base64::engine::general_purpose::STANDARD.encode(&image.bytes)
                        }
                    }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "product_facts": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "blog_snippet_idea": { "type": "STRING" }
                    },
                    "required": ["title", "description", "product_facts", "blog_snippet_idea"],
                    "propertyOrdering": ["title", "description", "product_facts", "blog_snippet_idea"]
                }
            }
        })
    }
}

/// Parse the model's JSON text into content, rejecting anything that does not
/// match the schema exactly.
pub fn parse_generated_content(text: &str) -> Result<GeneratedContent, GenerationError> {
    let content: GeneratedContent = serde_json::from_str(text.trim())?;
    content.validate()?;
    Ok(content)
}

#[async_trait]
impl ContentProvider for GeminiProvider {
    fn name(&self) -> &str {
        GEMINI_PROVIDER_NAME
    }

    async fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<(GeneratedContent, String), GenerationError> {
        // Render first: a bad request should not cost a download.
        let text_prompt = prompt::render_for(request)?;

        tracing::debug!(url = %request.image_url, "Fetching image");
        let image = self.fetch_image(&request.image_url).await?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.options.base_url.trim_end_matches('/'),
            self.model_name
        );

        tracing::debug!(model = %self.model_name, mime_type = image.mime_type, "Calling Gemini");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.options.generation_timeout)
            .json(&Self::request_body(&text_prompt, &image))
            .send()
            .await
            .map_err(GenerationError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let gemini_resp: GeminiResponse = response.json().await.map_err(GenerationError::Http)?;
        let candidate = gemini_resp.candidates.into_iter().next();
        let finish_reason = candidate
            .as_ref()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "NONE".to_string());
        let text: String = candidate
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse { finish_reason });
        }

        let content = parse_generated_content(&text)?;
        Ok((content, self.model_name.clone()))
    }
}
