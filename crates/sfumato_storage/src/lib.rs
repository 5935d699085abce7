//! Artifact storage for Sfumato.
//!
//! Turns a generation response into files on disk (original, thumbnail,
//! reference copies) plus the matching rows in the durable store, with a
//! compensating undo log so a failed persist leaves nothing behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use sfumato_database::SqliteStore;
//! use sfumato_storage::{ArtifactInput, ArtifactStore};
//!
//! let store = SqliteStore::open("/tmp/sfumato/sfumato.db")?;
//! let artifacts = ArtifactStore::new(store, "/tmp/sfumato")?;
//! let image_id = artifacts
//!     .persist_generated_image(ArtifactInput {
//!         request: &request,
//!         image: &output.images[0],
//!         model_text: output.model_text.as_deref(),
//!         generation_ms: 2400,
//!         cost_estimate: 0.134,
//!         output_dir: None,
//!     })
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod lookup;
mod payload;
mod thumbnail;
mod undo;

pub use artifact::{ArtifactInput, ArtifactStore};
pub use lookup::StoreProjectLookup;
pub use payload::{decode_payload, estimated_decoded_len, extension_for_mime, mime_for_extension};
pub use thumbnail::{THUMBNAIL_MAX_EDGE, Thumbnail, render_thumbnail};
pub use undo::{UndoAction, UndoLog};
