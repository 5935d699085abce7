//! Per-job resolution of system prompt and reference images.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sfumato_core::{
    BrandAsset, GenerationRequest, MAX_REFERENCE_IMAGES, ProjectContext, ReferenceImageInput,
    ReferenceLabel,
};
use sfumato_error::SfumatoResult;
use sfumato_interface::ProjectLookup;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Label placed before a project's brand guidelines.
pub const BRAND_GUIDELINES_LABEL: &str = "Brand guidelines:";

/// Appended when a project demands strict brand adherence.
pub const STRICT_BRAND_INSTRUCTION: &str = "Strictly adhere to the brand identity described above. \
Do not introduce colors, typography, logos, or visual styles that conflict with it.";

/// A request ready to send, plus where its original should be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedJob {
    /// Request with effective system prompt and references
    pub request: GenerationRequest,
    /// Project override for the originals directory
    pub output_dir: Option<PathBuf>,
}

/// Effective system prompt, sections joined by blank lines.
///
/// Order: the inline prompt, the project prompt when it differs from the
/// inline one, the labelled brand guidelines, the strict instruction.
///
/// # Examples
///
/// ```
/// use sfumato_core::ProjectContext;
/// use sfumato_queue::compose_system_prompt;
///
/// let project = ProjectContext {
///     id: "p".to_string(),
///     system_prompt: Some("Flat vector art.".to_string()),
///     brand_guidelines: Some("Teal and coral.".to_string()),
///     ..ProjectContext::default()
/// };
/// let prompt = compose_system_prompt(Some("Flat vector art."), Some(&project)).unwrap();
/// assert_eq!(prompt, "Flat vector art.\n\nBrand guidelines:\nTeal and coral.");
/// ```
pub fn compose_system_prompt(
    inline: Option<&str>,
    project: Option<&ProjectContext>,
) -> Option<String> {
    let inline = non_empty(inline);
    let mut sections: Vec<String> = inline.iter().map(|s| s.to_string()).collect();

    if let Some(project) = project {
        if let Some(project_prompt) = non_empty(project.system_prompt.as_deref()) {
            if Some(project_prompt) != inline {
                sections.push(project_prompt.to_string());
            }
        }
        if let Some(guidelines) = non_empty(project.brand_guidelines.as_deref()) {
            sections.push(format!("{}\n{}", BRAND_GUIDELINES_LABEL, guidelines));
        }
        if project.brand_strict_mode {
            sections.push(STRICT_BRAND_INSTRUCTION.to_string());
        }
    }

    (!sections.is_empty()).then(|| sections.join("\n\n"))
}

/// Explicit references capped at [`MAX_REFERENCE_IMAGES`], padded with
/// brand assets labelled as style references while slots remain.
pub fn resolve_references(
    explicit: &[ReferenceImageInput],
    brand_assets: &[BrandAsset],
) -> Vec<ReferenceImageInput> {
    let mut references: Vec<_> = explicit.iter().take(MAX_REFERENCE_IMAGES).cloned().collect();
    let free = MAX_REFERENCE_IMAGES - references.len();
    references.extend(brand_assets.iter().take(free).map(|asset| ReferenceImageInput {
        mime_type: asset.mime_type.clone(),
        data_base64: STANDARD.encode(&asset.data),
        label: Some(ReferenceLabel::Style),
    }));
    references
}

/// Resolve the request a job will actually send.
///
/// A missing project is logged and treated as no project.
pub async fn resolve_job(
    request: &GenerationRequest,
    projects: &dyn ProjectLookup,
) -> SfumatoResult<ResolvedJob> {
    let project = match request.project_id.as_deref() {
        Some(project_id) => {
            let project = projects.project(project_id).await?;
            if project.is_none() {
                warn!(project_id, "Request names an unknown project");
            }
            project
        }
        None => None,
    };

    let explicit = request.references();
    let brand_assets = match &project {
        Some(project) if explicit.len() < MAX_REFERENCE_IMAGES => {
            projects.brand_assets(&project.id).await?
        }
        _ => Vec::new(),
    };

    let mut resolved = request.clone();
    resolved.system_prompt = compose_system_prompt(request.system_prompt.as_deref(), project.as_ref());
    let references = resolve_references(explicit, &brand_assets);
    debug!(
        explicit = explicit.len(),
        brand = references.len().saturating_sub(explicit.len().min(MAX_REFERENCE_IMAGES)),
        "Resolved reference images"
    );
    resolved.reference_images = (!references.is_empty()).then_some(references);

    Ok(ResolvedJob {
        request: resolved,
        output_dir: project.and_then(|p| p.image_output_dir),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
