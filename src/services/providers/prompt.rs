//! Prompt templates and placeholder substitution.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal braces.
//! Rendering fails on the first placeholder without a non-blank value rather
//! than emitting a partially filled prompt.

use crate::models::content::ContentRequest;

pub const CONTEXT_BLOCK: &str = "\
---
CONTEXT:
- Tone: {tone}
- Language: {language}
- Target Platform: {target_platform}
";

pub const SELLER_INPUTS_BLOCK: &str = "\
---
SELLER INPUTS:
- Item Name: {item_name}
- Materials: {materials}
- Inspiration: {inspiration}
- Category: {category}
";

const COPYWRITER_PREAMBLE: &str = "\
You are an expert e-commerce copywriter. Your task is to generate compelling product content
based on an image and a few inputs from the seller.

You must respond in a valid JSON format. Do NOT include any text outside of the JSON object.
The JSON object must match the following schema:

{{
    \"title\": \"string\",
    \"description\": \"string\",
    \"product_facts\": [\"string\", \"string\", \"string\"],
    \"blog_snippet_idea\": \"string\"
}}
";

const IMAGE_BLOCK: &str = "\
---
IMAGE:
- URL: {image_url}
";

const CLOSING: &str = "\
---
Generate the content based on the seller inputs and attached image.
";

/// Full copywriter template used by the Gemini provider.
pub fn ecommerce_template() -> String {
    [
        COPYWRITER_PREAMBLE,
        CONTEXT_BLOCK,
        SELLER_INPUTS_BLOCK,
        IMAGE_BLOCK,
        CLOSING,
    ]
    .join("\n")
}

/// Placeholder values drawn from every required request field.
pub fn request_values(request: &ContentRequest) -> Vec<(&'static str, &str)> {
    let inputs = &request.seller_inputs;
    let config = &request.generation_config;
    vec![
        ("tone", config.tone.as_str()),
        ("language", config.language.as_str()),
        ("target_platform", config.target_platform.as_str()),
        ("item_name", inputs.item_name.as_str()),
        ("materials", inputs.materials.as_str()),
        ("inspiration", inputs.inspiration.as_str()),
        ("category", inputs.category.as_str()),
        ("image_url", request.image_url.as_str()),
    ]
}

/// Substitute `values` into `template`.
pub fn render(template: &str, values: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len() + 256);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(PromptError::Unterminated(name)),
                    }
                }
                let value = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .filter(|value| !value.trim().is_empty())
                    .ok_or(PromptError::MissingValue(name))?;
                out.push_str(value);
            }
            '}' => return Err(PromptError::StrayBrace),
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Render the copywriter template for `request`.
pub fn render_for(request: &ContentRequest) -> Result<String, PromptError> {
    render(&ecommerce_template(), &request_values(request))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("Invalid request: no value for prompt placeholder '{0}'")]
    MissingValue(String),

    #[error("Unterminated prompt placeholder '{{{0}'")]
    Unterminated(String),

    #[error("Unmatched '}}' in prompt template")]
    StrayBrace,
}
