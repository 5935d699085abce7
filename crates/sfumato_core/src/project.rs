//! Project context consumed during per-job resolution.

use std::path::PathBuf;

/// Project settings that shape a generation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectContext {
    /// Project id
    pub id: String,
    /// Project system prompt
    pub system_prompt: Option<String>,
    /// Brand guidelines text
    pub brand_guidelines: Option<String>,
    /// Demand strict adherence to brand identity
    pub brand_strict_mode: bool,
    /// Override for where originals are written
    pub image_output_dir: Option<PathBuf>,
}

/// Brand image loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandAsset {
    /// MIME type of `data`
    pub mime_type: String,
    /// Raw bytes
    pub data: Vec<u8>,
}
