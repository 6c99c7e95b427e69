use garde::Validate;
use serde::{Deserialize, Serialize};

/// What the seller tells us about the item pictured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SellerInputs {
    #[garde(length(min = 1, max = 200))]
    pub item_name: String,

    #[garde(length(min = 1, max = 500))]
    pub materials: String,

    #[garde(length(min = 1, max = 1000))]
    pub inspiration: String,

    #[garde(length(min = 1, max = 100))]
    pub category: String,
}

/// How the generated copy should read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationConfig {
    #[garde(length(min = 1, max = 50))]
    pub tone: String,

    #[garde(length(min = 1, max = 20))]
    pub language: String,

    #[garde(length(min = 1, max = 50))]
    pub target_platform: String,
}

/// A content generation request. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContentRequest {
    #[serde(alias = "image_ref")]
    #[garde(url)]
    pub image_url: String,

    #[garde(dive)]
    pub seller_inputs: SellerInputs,

    #[serde(rename = "config", alias = "generation_config")]
    #[garde(dive)]
    pub generation_config: GenerationConfig,
}

/// Marketing copy produced by a provider. Every field is required; providers
/// that return anything else (extra keys, blanks) are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GeneratedContent {
    #[garde(length(min = 1))]
    pub title: String,

    #[garde(length(min = 1))]
    pub description: String,

    #[garde(length(min = 1), inner(length(min = 1)))]
    pub product_facts: Vec<String>,

    #[garde(length(min = 1))]
    pub blog_snippet_idea: String,
}

/// Response body of the synchronous generate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResponse {
    pub generated_content: GeneratedContent,
    pub ai_model_used: String,
    pub latency_ms: f64,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub provider: String,
    pub model: String,
}
