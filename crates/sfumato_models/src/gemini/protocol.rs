//! Wire types for the `generateContent` REST endpoint.
//!
//! Only the subset used for image generation is modelled. Response types
//! tolerate unknown fields so new server additions do not break parsing.

use serde::{Deserialize, Serialize};

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; a single user turn for image generation
    pub contents: Vec<Content>,
    /// System instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    /// Output configuration
    pub generation_config: GenerationConfig,
    /// Tools, used for search grounding
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Author of the turn
    pub role: String,
    /// Text and inline image parts
    pub parts: Vec<Part>,
}

/// Part of a request turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    /// Text part
    Text(TextPart),
    /// Inline base64 image
    InlineData(InlineDataPart),
}

/// Text part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPart {
    /// Text content
    pub text: String,
}

/// Inline data part.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDataPart {
    /// The payload
    pub inline_data: InlineData,
}

/// Base64 payload with MIME type, used in requests and responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type
    pub mime_type: String,
    /// Base64 bytes
    pub data: String,
}

/// System instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInstruction {
    /// Instruction text parts
    pub parts: Vec<TextPart>,
}

/// Generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Requested part types
    pub response_modalities: Vec<String>,
    /// Image output settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
    /// Reasoning settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

/// Image output settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// Aspect ratio such as `16:9`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Output size such as `2K`; only sent to models that accept it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
}

/// Reasoning settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    /// `low` or `high`
    pub thinking_level: String,
}

/// Tool declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Search grounding
    pub google_search: GoogleSearch,
}

/// Empty marker object enabling search grounding.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GoogleSearch {}

/// Response body of `generateContent`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate responses
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Token accounting
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    /// Present when the prompt itself was blocked
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One candidate.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Response turn
    #[serde(default)]
    pub content: Option<ResponseContent>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Response turn.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ResponseContent {
    /// Parts in order
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// Response part; exactly one of the payload fields is normally set.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    /// Text
    #[serde(default)]
    pub text: Option<String>,
    /// Inline image
    #[serde(default)]
    pub inline_data: Option<InlineData>,
    /// Marks intermediate reasoning output
    #[serde(default)]
    pub thought: Option<bool>,
}

/// Token accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_token_count: Option<i64>,
    /// Candidate tokens
    #[serde(default)]
    pub candidates_token_count: Option<i64>,
    /// Total tokens
    #[serde(default)]
    pub total_token_count: Option<i64>,
}

/// Prompt-level safety feedback.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details
    pub error: ErrorBody,
}

/// Error details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    /// Human readable message
    #[serde(default)]
    pub message: String,
}
