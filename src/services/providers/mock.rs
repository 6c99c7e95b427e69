use async_trait::async_trait;
use std::time::Duration;

use super::{ContentProvider, GenerationError};
use crate::models::content::{ContentRequest, GeneratedContent};

pub const MOCK_PROVIDER_NAME: &str = "mock";
pub const MOCK_MODEL_NAME: &str = "mock-model-v1.0";

/// Simulated network latency per call.
const DEFAULT_LATENCY: Duration = Duration::from_millis(50);

/// Network-free provider whose output is a pure function of the request.
#[derive(Debug, Clone)]
pub struct MockProvider {
    latency: Duration,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    fn render(request: &ContentRequest) -> Result<GeneratedContent, GenerationError> {
        let inputs = &request.seller_inputs;
        let config = &request.generation_config;

        if inputs.item_name.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "seller_inputs.item_name is blank".to_string(),
            ));
        }
        let primary_material = inputs
            .materials
            .split(',')
            .map(str::trim)
            .find(|m| !m.is_empty())
            .ok_or_else(|| {
                GenerationError::InvalidRequest("seller_inputs.materials is blank".to_string())
            })?;

        let item = inputs.item_name.trim();
        let category = inputs.category.trim();

        Ok(GeneratedContent {
            title: format!("[Mock] Handcrafted {item} - {category} Collection"),
            description: format!(
                "This is a mock description for a {item}. It is made of {} and was inspired by {}. \
                 The request config was: tone={}, lang={}, platform={}.",
                inputs.materials.trim(),
                inputs.inspiration.trim(),
                config.tone,
                config.language,
                config.target_platform,
            ),
            product_facts: vec![
                format!("Fact 1: Made of {primary_material}"),
                format!("Fact 2: Part of the {category} category"),
                "Fact 3: This is mock data".to_string(),
                format!("Fact 4: Written for {}", config.target_platform),
            ],
            blog_snippet_idea: format!(
                "Blog snippet idea for {item}: how {} shaped this piece.",
                inputs.inspiration.trim()
            ),
        })
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    fn name(&self) -> &str {
        MOCK_PROVIDER_NAME
    }

    async fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<(GeneratedContent, String), GenerationError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let content = Self::render(request)?;
        tracing::debug!(item = %request.seller_inputs.item_name, "Mock content generated");
        Ok((content, MOCK_MODEL_NAME.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::{GenerationConfig, SellerInputs};
    use garde::Validate;

    fn request() -> ContentRequest {
        ContentRequest {
            image_url: "http://x/img.png".to_string(),
            seller_inputs: SellerInputs {
                item_name: "Clay Pot".to_string(),
                materials: "terracotta, white paint".to_string(),
                inspiration: "rain".to_string(),
                category: "Pottery".to_string(),
            },
            generation_config: GenerationConfig {
                tone: "evocative".to_string(),
                language: "en-IN".to_string(),
                target_platform: "web".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_deterministic_output() {
        let provider = MockProvider::with_latency(Duration::ZERO);
        let (first, model) = provider.generate_content(&request()).await.unwrap();
        let (second, _) = provider.generate_content(&request()).await.unwrap();

        assert_eq!(model, MOCK_MODEL_NAME);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_output_reflects_every_input() {
        let provider = MockProvider::with_latency(Duration::ZERO);
        let (content, _) = provider.generate_content(&request()).await.unwrap();

        assert!(content.validate().is_ok());
        assert!(content.title.contains("Clay Pot"));
        assert!(content.title.contains("Pottery"));
        assert!(content.description.contains("terracotta, white paint"));
        assert!(content.description.contains("tone=evocative"));
        assert!(content.description.contains("lang=en-IN"));
        assert!(content.description.contains("platform=web"));
        assert!(content.product_facts.len() >= 3);
        assert_eq!(content.product_facts[0], "Fact 1: Made of terracotta");
        assert!(content.blog_snippet_idea.contains("rain"));
    }

    #[tokio::test]
    async fn test_different_inputs_differ() {
        let provider = MockProvider::with_latency(Duration::ZERO);
        let mut other = request();
        other.seller_inputs.item_name = "Brass Lamp".to_string();

        let (a, _) = provider.generate_content(&request()).await.unwrap();
        let (b, _) = provider.generate_content(&other).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_request_fails() {
        let provider = MockProvider::with_latency(Duration::ZERO);
        let mut bad = request();
        bad.seller_inputs.materials = " , ".to_string();

        let err = provider.generate_content(&bad).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
    }
}
