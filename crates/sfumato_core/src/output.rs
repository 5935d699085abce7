//! Remote generation output.

use serde::{Deserialize, Serialize};

/// One image part returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// MIME type reported by the service
    pub mime_type: String,
    /// Base64 payload as returned on the wire
    pub data_base64: String,
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Prompt tokens
    pub input_tokens: Option<i64>,
    /// Candidate tokens
    pub output_tokens: Option<i64>,
    /// Total tokens
    pub total_tokens: Option<i64>,
}

/// Parsed result of a successful generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    /// Image parts, in response order; never empty
    pub images: Vec<ImagePayload>,
    /// Concatenated text parts
    pub model_text: Option<String>,
    /// Token accounting, if reported
    pub token_usage: Option<TokenUsage>,
    /// Attempts spent, including the successful one
    pub attempts: u32,
}
