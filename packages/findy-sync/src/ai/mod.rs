//! Field extraction backed by OpenAI chat completions.

pub mod openai;
pub mod prompt;

pub use openai::OpenAIFieldExtractor;
pub use prompt::DEFAULT_TARGET_FIELDS;
