//! Diesel row types and their conversions to domain records.

use crate::schema::{images, project_brand_assets, projects, queue_jobs, reference_images, usage_log};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use sfumato_core::{
    GeneratedImage, JobStatus, NewGeneratedImage, QueueJob, ReferenceImage, UsageLogEntry,
};
use sfumato_error::{DatabaseError, DatabaseErrorKind};
use std::str::FromStr;

fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T, DatabaseError> {
    value.parse().map_err(|_| {
        DatabaseError::new(DatabaseErrorKind::Serialization(format!(
            "unrecognized {} value '{}'",
            column, value
        )))
    })
}

fn parse_optional<T: FromStr>(column: &str, value: Option<&str>) -> Result<Option<T>, DatabaseError> {
    value.map(|v| parse_column(column, v)).transpose()
}

/// Database row for the queue_jobs table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = queue_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QueueJobRow {
    pub id: String,
    pub status: String,
    pub request_json: String,
    pub result_id: Option<String>,
    pub error: Option<String>,
    pub priority: i32,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

/// Insertable struct for a new pending job.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = queue_jobs)]
pub struct NewQueueJobRow {
    pub id: String,
    pub status: String,
    pub request_json: String,
    pub priority: i32,
    pub created_at: NaiveDateTime,
}

impl NewQueueJobRow {
    /// Serializes a domain job for insertion.
    pub fn from_job(job: &QueueJob) -> Result<Self, DatabaseError> {
        Ok(Self {
            id: job.id().clone(),
            status: job.status().to_string(),
            request_json: serde_json::to_string(job.request())?,
            priority: *job.priority(),
            created_at: job.created_at().naive_utc(),
        })
    }
}

impl TryFrom<QueueJobRow> for QueueJob {
    type Error = DatabaseError;

    fn try_from(row: QueueJobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = parse_column("status", &row.status)?;
        let request = serde_json::from_str(&row.request_json)?;
        Ok(QueueJob::from_parts(
            row.id,
            status,
            request,
            row.result_id,
            row.error,
            row.priority,
            row.created_at.and_utc(),
            row.started_at.map(|t| t.and_utc()),
            row.completed_at.map(|t| t.and_utc()),
        ))
    }
}

/// Database row for the images table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = images)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ImageRow {
    pub id: String,
    pub project_id: Option<String>,
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: Option<String>,
    pub resolution: String,
    pub thinking_level: Option<String>,
    pub used_search: bool,
    pub model_text: Option<String>,
    pub file_path: String,
    pub thumb_path: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: i64,
    pub parent_id: Option<String>,
    pub generation_ms: i64,
    pub cost_estimate: f64,
    pub is_favorite: bool,
    pub created_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl TryFrom<ImageRow> for GeneratedImage {
    type Error = DatabaseError;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        Ok(GeneratedImage {
            model: parse_column("model", &row.model)?,
            aspect_ratio: parse_optional("aspect_ratio", row.aspect_ratio.as_deref())?,
            resolution: parse_column("resolution", &row.resolution)?,
            thinking_level: parse_optional("thinking_level", row.thinking_level.as_deref())?,
            id: row.id,
            project_id: row.project_id,
            prompt: row.prompt,
            used_search: row.used_search,
            model_text: row.model_text,
            file_path: row.file_path,
            thumb_path: row.thumb_path,
            width: row.width,
            height: row.height,
            file_size: row.file_size,
            parent_id: row.parent_id,
            generation_ms: row.generation_ms,
            cost_estimate: row.cost_estimate,
            is_favorite: row.is_favorite,
            created_at: row.created_at.and_utc(),
            deleted_at: row.deleted_at.map(|t| t.and_utc()),
        })
    }
}

/// Insertable struct for a new image.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = images)]
pub struct NewImageRow {
    pub id: String,
    pub project_id: Option<String>,
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: Option<String>,
    pub resolution: String,
    pub thinking_level: Option<String>,
    pub used_search: bool,
    pub model_text: Option<String>,
    pub file_path: String,
    pub thumb_path: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: i64,
    pub parent_id: Option<String>,
    pub generation_ms: i64,
    pub cost_estimate: f64,
    pub is_favorite: bool,
    pub created_at: NaiveDateTime,
}

impl NewImageRow {
    /// Builds the row for `image`, stamped with `created_at`.
    pub fn new(image: NewGeneratedImage, created_at: DateTime<Utc>) -> Self {
        Self {
            id: image.id,
            project_id: image.project_id,
            prompt: image.prompt,
            model: image.model.to_string(),
            aspect_ratio: image.aspect_ratio.map(|r| r.to_string()),
            resolution: image.resolution.to_string(),
            thinking_level: image.thinking_level.map(|t| t.to_string()),
            used_search: image.used_search,
            model_text: image.model_text,
            file_path: image.file_path,
            thumb_path: image.thumb_path,
            width: image.width,
            height: image.height,
            file_size: image.file_size,
            parent_id: image.parent_id,
            generation_ms: image.generation_ms,
            cost_estimate: image.cost_estimate,
            is_favorite: false,
            created_at: created_at.naive_utc(),
        }
    }
}

/// Database row for the reference_images table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = reference_images)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReferenceImageRow {
    pub id: String,
    pub image_id: String,
    pub file_path: String,
    pub label: String,
    pub position: i32,
}

impl From<&ReferenceImage> for ReferenceImageRow {
    fn from(reference: &ReferenceImage) -> Self {
        Self {
            id: reference.id.clone(),
            image_id: reference.image_id.clone(),
            file_path: reference.file_path.clone(),
            label: reference.label.to_string(),
            position: reference.position,
        }
    }
}

impl TryFrom<ReferenceImageRow> for ReferenceImage {
    type Error = DatabaseError;

    fn try_from(row: ReferenceImageRow) -> Result<Self, Self::Error> {
        Ok(ReferenceImage {
            label: parse_column("label", &row.label)?,
            id: row.id,
            image_id: row.image_id,
            file_path: row.file_path,
            position: row.position,
        })
    }
}

/// Insertable struct for a usage entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = usage_log)]
pub struct NewUsageLogRow {
    pub image_id: Option<String>,
    pub model: String,
    pub resolution: String,
    pub cost_estimate: f64,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl From<&UsageLogEntry> for NewUsageLogRow {
    fn from(entry: &UsageLogEntry) -> Self {
        Self {
            image_id: entry.image_id.clone(),
            model: entry.model.to_string(),
            resolution: entry.resolution.to_string(),
            cost_estimate: entry.cost_estimate,
            input_tokens: entry.input_tokens,
            output_tokens: entry.output_tokens,
            created_at: entry.created_at.naive_utc(),
        }
    }
}

/// Database row for the projects table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub system_prompt: Option<String>,
    pub brand_guidelines: Option<String>,
    pub brand_strict_mode: bool,
    pub image_output_dir: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Insertable struct for a new project.
#[derive(Debug, Clone, Default, Insertable)]
#[diesel(table_name = projects)]
pub struct NewProjectRow {
    pub id: String,
    pub name: String,
    pub system_prompt: Option<String>,
    pub brand_guidelines: Option<String>,
    pub brand_strict_mode: bool,
    pub image_output_dir: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Database row for the project_brand_assets table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable, Serialize)]
#[diesel(table_name = project_brand_assets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BrandAssetRow {
    pub id: String,
    pub project_id: String,
    pub file_path: String,
    pub mime_type: String,
    pub position: i32,
    pub created_at: NaiveDateTime,
}
