//! Image providers.

mod gemini;

pub use gemini::{
    extract_image, extract_text, GeminiModel, GeminiProvider, GeminiProviderBuilder,
    GeminiResponse,
};
