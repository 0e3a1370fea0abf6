//! Client for the hosted caption and image generation functions.

pub mod client;

use thiserror::Error;

pub use client::{CaptionRequest, ContentGenerator, HttpContentGenerator, ImageRequest};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Prompt is required")]
    EmptyPrompt,
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid response body: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Generation failed: {0}")]
    Remote(String),
}
