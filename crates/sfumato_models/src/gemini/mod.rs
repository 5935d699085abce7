//! Google Gemini image generation over the REST API.

mod client;
mod payload;
mod protocol;

pub use client::{
    DEFAULT_BASE_URL, GeminiClientConfig, GeminiClientConfigBuilder, GeminiImageClient,
};
pub use payload::{build_payload, parse_output, reference_caption, strip_data_url};
pub use protocol::{
    Candidate, Content, ErrorBody, ErrorEnvelope, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, GoogleSearch, ImageConfig, InlineData,
    InlineDataPart, Part, PromptFeedback, ResponseContent, ResponsePart, SystemInstruction,
    TextPart, ThinkingConfig, Tool, UsageMetadata,
};
