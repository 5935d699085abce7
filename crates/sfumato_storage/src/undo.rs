//! Compensating log for multi-step artifact writes.

use sfumato_database::SqliteStore;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A step that reverses one completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// Remove a file that was written
    RemoveFile(PathBuf),
    /// Hard-delete an image row that was inserted
    DeleteImageRow(String),
    /// Delete a reference row that was inserted
    DeleteReferenceRow(String),
}

/// Ordered list of undo actions, replayed newest first on failure.
#[derive(Debug, Default)]
pub struct UndoLog {
    actions: Vec<UndoAction>,
}

impl UndoLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed step.
    pub fn record(&mut self, action: UndoAction) {
        self.actions.push(action);
    }

    /// Recorded steps, oldest first.
    pub fn actions(&self) -> &[UndoAction] {
        &self.actions
    }

    /// Keep everything that was written.
    pub fn commit(mut self) {
        self.actions.clear();
    }

    /// Reverse every recorded step, newest first.
    ///
    /// Undo failures are logged and do not stop the remaining steps.
    pub async fn rollback(mut self, store: &SqliteStore) {
        let actions = std::mem::take(&mut self.actions);
        debug!(steps = actions.len(), "Rolling back artifact writes");
        for action in actions.into_iter().rev() {
            let outcome = match &action {
                UndoAction::RemoveFile(path) => match tokio::fs::remove_file(path).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e.to_string()),
                },
                UndoAction::DeleteImageRow(id) => store
                    .delete_image_hard(id)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                UndoAction::DeleteReferenceRow(id) => store
                    .delete_reference_image(id)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
            };
            if let Err(error) = outcome {
                warn!(?action, %error, "Failed to undo artifact write");
            }
        }
    }
}

impl Drop for UndoLog {
    fn drop(&mut self) {
        if !self.actions.is_empty() {
            warn!(
                pending = self.actions.len(),
                "Undo log dropped without commit or rollback"
            );
        }
    }
}
