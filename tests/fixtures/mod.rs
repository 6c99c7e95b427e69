//! Request fixtures shared by the integration suites

#![allow(dead_code)]

use serde_json::{json, Value};

/// Seller inputs for a representative craft item
#[derive(Debug, Clone)]
pub struct CraftItemFixture {
    pub item_name: &'static str,
    pub materials: &'static str,
    pub inspiration: &'static str,
    pub category: &'static str,
    pub tone: &'static str,
    pub language: &'static str,
    pub target_platform: &'static str,
}

pub const CRAFT_ITEMS: &[CraftItemFixture] = &[
    CraftItemFixture {
        item_name: "Monsoon Clay Pot",
        materials: "terracotta, natural pigments",
        inspiration: "first rain on dry earth",
        category: "Pottery",
        tone: "evocative",
        language: "en-IN",
        target_platform: "web",
    },
    CraftItemFixture {
        item_name: "Indigo Block-Print Scarf",
        materials: "handloom cotton, indigo dye",
        inspiration: "river at dusk",
        category: "Textiles",
        tone: "warm",
        language: "en",
        target_platform: "instagram",
    },
    CraftItemFixture {
        item_name: "Brass Diya",
        materials: "brass",
        inspiration: "temple evenings",
        category: "Home Decor",
        tone: "festive",
        language: "hi-IN",
        target_platform: "marketplace",
    },
];

/// Smallest byte sequence `image::guess_format` recognises as PNG
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

impl CraftItemFixture {
    /// JSON body for POST /v1/jobs and POST /v1/content/generate
    pub fn request_body(&self, image_url: &str) -> Value {
        json!({
            "image_url": image_url,
            "seller_inputs": {
                "item_name": self.item_name,
                "materials": self.materials,
                "inspiration": self.inspiration,
                "category": self.category,
            },
            "config": {
                "tone": self.tone,
                "language": self.language,
                "target_platform": self.target_platform,
            }
        })
    }
}

/// A body the API must reject: bad image URL and a blank item name
pub fn invalid_request_body() -> Value {
    json!({
        "image_url": "not a url",
        "seller_inputs": {
            "item_name": "",
            "materials": "clay",
            "inspiration": "rain",
            "category": "Pottery",
        },
        "config": {"tone": "warm", "language": "en", "target_platform": "web"}
    })
}

/// Gemini `generateContent` reply wrapping `content` as the model's JSON text
pub fn gemini_reply(content: &Value) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": content.to_string()}]},
            "finishReason": "STOP"
        }]
    })
}

pub fn sample_generated_content() -> Value {
    json!({
        "title": "Monsoon Clay Pot",
        "description": "Hand-thrown terracotta that smells of first rain.",
        "product_facts": ["Natural terracotta", "Hand-painted", "Food safe glaze"],
        "blog_snippet_idea": "What petrichor taught a potter"
    })
}
