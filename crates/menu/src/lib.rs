pub mod client;
pub mod prompt;

pub use client::{GeminiClient, LlmClient, LlmError, MockLlm, GEMINI_ENDPOINT};
pub use prompt::{
    build_prompt, Course, Cuisine, MenuOptions, MenuRequest, Servings, GENERATION_FAILED_TEXT,
};
