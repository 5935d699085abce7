//! Generated image and reference image persistence.

use crate::models::{ImageRow, NewImageRow, ReferenceImageRow};
use crate::schema::{images, reference_images};
use crate::{DatabaseResult, search};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use sfumato_core::{GeneratedImage, ImageQuery, NewGeneratedImage, ReferenceImage};

fn to_images(rows: Vec<ImageRow>) -> DatabaseResult<Vec<GeneratedImage>> {
    rows.into_iter().map(GeneratedImage::try_from).collect()
}

/// Insert an image row.
pub fn insert(
    conn: &mut SqliteConnection,
    image: NewGeneratedImage,
    created_at: DateTime<Utc>,
) -> DatabaseResult<()> {
    diesel::insert_into(images::table)
        .values(NewImageRow::new(image, created_at))
        .execute(conn)?;
    Ok(())
}

/// Image by id, including soft-deleted ones.
pub fn get(conn: &mut SqliteConnection, image_id: &str) -> DatabaseResult<Option<GeneratedImage>> {
    images::table
        .find(image_id)
        .select(ImageRow::as_select())
        .first(conn)
        .optional()?
        .map(GeneratedImage::try_from)
        .transpose()
}

/// Images matching `query`, newest first.
pub fn list(
    conn: &mut SqliteConnection,
    query: &ImageQuery,
    fts_available: bool,
) -> DatabaseResult<Vec<GeneratedImage>> {
    let mut statement = images::table.select(ImageRow::as_select()).into_boxed();

    if !*query.include_deleted() {
        statement = statement.filter(images::deleted_at.is_null());
    }
    if let Some(project_id) = query.project_id() {
        statement = statement.filter(images::project_id.eq(project_id.clone()));
    }
    if *query.favorites_only() {
        statement = statement.filter(images::is_favorite.eq(true));
    }
    if let Some(text) = query.search().as_deref() {
        let indexed = match search::match_expression(text) {
            Some(expression) if fts_available => match search::check_expression(conn, &expression) {
                Ok(()) => Some(expression),
                Err(e) => {
                    tracing::warn!(error = %e, "Full-text query failed, using substring search");
                    None
                }
            },
            _ => None,
        };
        statement = match indexed {
            Some(expression) => statement.filter(search::indexed_filter(&expression)),
            None => {
                let pattern = search::like_pattern(text);
                statement.filter(
                    images::prompt
                        .like(pattern.clone())
                        .escape('\\')
                        .or(images::model_text
                            .assume_not_null()
                            .like(pattern)
                            .escape('\\')),
                )
            }
        };
    }

    let rows = statement
        .order((images::created_at.desc(), images::id.desc()))
        .limit(*query.limit())
        .offset(*query.offset())
        .load(conn)?;
    to_images(rows)
}

/// Live images derived from `parent_id`, oldest first.
pub fn children(
    conn: &mut SqliteConnection,
    parent_id: &str,
) -> DatabaseResult<Vec<GeneratedImage>> {
    let rows = images::table
        .filter(images::parent_id.eq(parent_id))
        .filter(images::deleted_at.is_null())
        .order(images::created_at.asc())
        .select(ImageRow::as_select())
        .load(conn)?;
    to_images(rows)
}

/// Flip the favourite flag. Returns the new value, or `None` if missing.
pub fn toggle_favorite(conn: &mut SqliteConnection, image_id: &str) -> DatabaseResult<Option<bool>> {
    let updated = diesel::update(images::table.find(image_id))
        .set(images::is_favorite.eq(diesel::dsl::not(images::is_favorite)))
        .execute(conn)?;
    if updated == 0 {
        return Ok(None);
    }
    let value = images::table
        .find(image_id)
        .select(images::is_favorite)
        .first(conn)?;
    Ok(Some(value))
}

/// Set the soft-delete marker. Returns false if missing or already deleted.
pub fn soft_delete(
    conn: &mut SqliteConnection,
    image_id: &str,
    at: DateTime<Utc>,
) -> DatabaseResult<bool> {
    let updated = diesel::update(
        images::table
            .filter(images::id.eq(image_id))
            .filter(images::deleted_at.is_null()),
    )
    .set(images::deleted_at.eq(at.naive_utc()))
    .execute(conn)?;
    Ok(updated == 1)
}

/// Remove an image row and its reference rows.
pub fn delete_hard(conn: &mut SqliteConnection, image_id: &str) -> DatabaseResult<bool> {
    let deleted = conn.transaction(|conn| {
        diesel::delete(reference_images::table.filter(reference_images::image_id.eq(image_id)))
            .execute(conn)?;
        diesel::delete(images::table.find(image_id)).execute(conn)
    })?;
    Ok(deleted == 1)
}

/// Insert a reference image row.
pub fn insert_reference(
    conn: &mut SqliteConnection,
    reference: &ReferenceImage,
) -> DatabaseResult<()> {
    diesel::insert_into(reference_images::table)
        .values(ReferenceImageRow::from(reference))
        .execute(conn)?;
    Ok(())
}

/// Remove a reference image row.
pub fn delete_reference(conn: &mut SqliteConnection, reference_id: &str) -> DatabaseResult<bool> {
    let deleted = diesel::delete(reference_images::table.find(reference_id)).execute(conn)?;
    Ok(deleted == 1)
}

/// References of an image in position order.
pub fn references(
    conn: &mut SqliteConnection,
    image_id: &str,
) -> DatabaseResult<Vec<ReferenceImage>> {
    reference_images::table
        .filter(reference_images::image_id.eq(image_id))
        .order(reference_images::position.asc())
        .select(ReferenceImageRow::as_select())
        .load(conn)?
        .into_iter()
        .map(ReferenceImage::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{establish_pool, prepare_schema};
    use sfumato_core::{ImageModel, Resolution};

    fn image(id: &str, prompt: &str, model_text: Option<&str>) -> NewGeneratedImage {
        NewGeneratedImage {
            id: id.to_string(),
            project_id: None,
            prompt: prompt.to_string(),
            model: ImageModel::Gemini25FlashImage,
            aspect_ratio: None,
            resolution: Resolution::OneK,
            thinking_level: None,
            used_search: false,
            model_text: model_text.map(str::to_string),
            file_path: format!("{}.png", id),
            thumb_path: None,
            width: None,
            height: None,
            file_size: 0,
            parent_id: None,
            generation_ms: 0,
            cost_estimate: 0.039,
        }
    }

    #[test]
    fn substring_fallback_searches_prompt_and_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = establish_pool(&dir.path().join("fallback.db")).unwrap();
        let mut conn = pool.get().unwrap();
        prepare_schema(&mut conn).unwrap();

        insert(&mut conn, image("a", "Blue 100% cotton shirt", None), Utc::now()).unwrap();
        insert(&mut conn, image("b", "desk lamp", Some("a shirt on the chair")), Utc::now()).unwrap();
        insert(&mut conn, image("c", "100 red balloons", None), Utc::now()).unwrap();

        let query = ImageQuery::builder().search("shirt").build().unwrap();
        let mut ids: Vec<String> = list(&mut conn, &query, false)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        let query = ImageQuery::builder().search("100%").build().unwrap();
        let hits = list(&mut conn, &query, false).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }
}
