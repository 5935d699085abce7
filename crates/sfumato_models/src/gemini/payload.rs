//! Translation between generation requests and wire payloads.

use super::protocol::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, GoogleSearch,
    ImageConfig, InlineData, InlineDataPart, Part, SystemInstruction, TextPart, ThinkingConfig,
    Tool,
};
use sfumato_core::{
    GenerationOutput, GenerationRequest, ImagePayload, MAX_REFERENCE_IMAGES, ReferenceLabel,
    ResponseModality, TokenUsage, effective_resolution,
};
use sfumato_error::{GeminiError, GeminiErrorKind};

/// Strip a `data:<mime>;base64,` prefix if present.
pub fn strip_data_url(data: &str) -> &str {
    match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    }
}

/// Text placed before a reference image so the model knows how to use it.
pub fn reference_caption(position: usize, label: ReferenceLabel) -> String {
    let role = match label {
        ReferenceLabel::Person => "keep this person's identity and likeness",
        ReferenceLabel::Object => "include this subject or product",
        ReferenceLabel::Style => "follow this visual style",
    };
    format!("Reference image {} ({}): {}.", position, label, role)
}

/// Build the `generateContent` body for `request`.
///
/// At most [`MAX_REFERENCE_IMAGES`] inline parts are attached, each after a
/// short text part naming its role.
pub fn build_payload(request: &GenerationRequest) -> GenerateContentRequest {
    let mut parts = vec![Part::Text(TextPart {
        text: request.prompt.clone(),
    })];
    for (index, reference) in request
        .references()
        .iter()
        .take(MAX_REFERENCE_IMAGES)
        .enumerate()
    {
        parts.push(Part::Text(TextPart {
            text: reference_caption(index + 1, reference.label.unwrap_or_default()),
        }));
        parts.push(Part::InlineData(InlineDataPart {
            inline_data: InlineData {
                mime_type: reference.mime_type.clone(),
                data: strip_data_url(&reference.data_base64).to_string(),
            },
        }));
    }

    let modalities = request
        .response_modalities
        .clone()
        .unwrap_or_else(|| vec![ResponseModality::Text, ResponseModality::Image]);

    let image_size = request
        .model
        .supports_image_size()
        .then(|| effective_resolution(request.model, request.resolution).to_string());
    let aspect_ratio = request.aspect_ratio.map(|r| r.to_string());
    let image_config = (aspect_ratio.is_some() || image_size.is_some()).then_some(ImageConfig {
        aspect_ratio,
        image_size,
    });

    let system_instruction = request
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|text| SystemInstruction {
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        });

    let tools = if request.uses_search() {
        vec![Tool {
            google_search: GoogleSearch::default(),
        }]
    } else {
        Vec::new()
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
        system_instruction,
        generation_config: GenerationConfig {
            response_modalities: modalities.iter().map(|m| m.to_string()).collect(),
            image_config,
            thinking_config: request.thinking_level.map(|level| ThinkingConfig {
                thinking_level: level.to_string(),
            }),
        },
        tools,
    }
}

/// Extract images, text, and token usage from a successful response.
///
/// # Errors
///
/// Returns [`GeminiErrorKind::NoImage`] when no image part is present.
pub fn parse_output(
    response: GenerateContentResponse,
    attempts: u32,
) -> Result<GenerationOutput, GeminiError> {
    let mut images = Vec::new();
    let mut texts = Vec::new();

    let parts = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts);
    for part in parts {
        if part.thought.unwrap_or(false) {
            continue;
        }
        if let Some(inline) = part.inline_data {
            if inline.mime_type.starts_with("image/") && !inline.data.is_empty() {
                images.push(ImagePayload {
                    mime_type: inline.mime_type,
                    data_base64: inline.data,
                });
            }
        } else if let Some(text) = part.text.filter(|t| !t.trim().is_empty()) {
            texts.push(text);
        }
    }

    let model_text = (!texts.is_empty()).then(|| texts.join("\n"));

    if images.is_empty() {
        let detail = match (&model_text, response.prompt_feedback.and_then(|f| f.block_reason)) {
            (_, Some(reason)) => format!("prompt blocked: {}", reason),
            (Some(text), None) => text.clone(),
            (None, None) => String::new(),
        };
        return Err(GeminiError::new(GeminiErrorKind::NoImage(detail)));
    }

    let token_usage = response.usage_metadata.map(|usage| TokenUsage {
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    });

    Ok(GenerationOutput {
        images,
        model_text,
        token_usage,
        attempts,
    })
}
