//! Full-text search over prompts and model text.
//!
//! The FTS5 index is optional. When it cannot be created, or a match query
//! fails, callers fall back to substring matching.

use crate::DatabaseResult;
use crate::schema::images;
use diesel::connection::SimpleConnection;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};
use diesel::sqlite::Sqlite;

const SEARCH_INDEX_DDL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS images_fts USING fts5(image_id UNINDEXED, prompt, model_text);

CREATE TRIGGER IF NOT EXISTS images_fts_insert AFTER INSERT ON images BEGIN
    INSERT INTO images_fts(image_id, prompt, model_text)
    VALUES (new.id, new.prompt, coalesce(new.model_text, ''));
END;

CREATE TRIGGER IF NOT EXISTS images_fts_delete AFTER DELETE ON images BEGIN
    DELETE FROM images_fts WHERE image_id = old.id;
END;

CREATE TRIGGER IF NOT EXISTS images_fts_update AFTER UPDATE OF prompt, model_text ON images BEGIN
    DELETE FROM images_fts WHERE image_id = old.id;
    INSERT INTO images_fts(image_id, prompt, model_text)
    VALUES (new.id, new.prompt, coalesce(new.model_text, ''));
END;

INSERT INTO images_fts(image_id, prompt, model_text)
SELECT id, prompt, coalesce(model_text, '') FROM images
WHERE id NOT IN (SELECT image_id FROM images_fts);
"#;

#[derive(QueryableByName)]
struct MatchRow {
    #[diesel(sql_type = Text)]
    #[allow(dead_code)]
    image_id: String,
}

/// Create the FTS5 table and its sync triggers. Failure is logged, not raised.
pub fn ensure_search_index(conn: &mut SqliteConnection) -> bool {
    match conn.batch_execute(SEARCH_INDEX_DDL) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Full-text index unavailable, using substring search");
            false
        }
    }
}

/// Quote each whitespace-separated term so user input cannot inject FTS syntax.
///
/// Terms are ANDed together.
pub fn match_expression(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// Run `expression` against the index once so a malformed query surfaces
/// here rather than in the listing that embeds it.
pub fn check_expression(conn: &mut SqliteConnection, expression: &str) -> DatabaseResult<()> {
    let _: Vec<MatchRow> =
        diesel::sql_query("SELECT image_id FROM images_fts WHERE images_fts MATCH ? LIMIT 1")
            .bind::<Text, _>(expression)
            .load(conn)?;
    Ok(())
}

/// `images.id IN (...)` filter over the FTS5 index.
///
/// The match runs as a subquery so the number of hits never turns into
/// bound parameters.
pub fn indexed_filter(
    expression: &str,
) -> Box<dyn BoxableExpression<images::table, Sqlite, SqlType = Bool>> {
    Box::new(
        sql::<Bool>("images.id IN (SELECT image_id FROM images_fts WHERE images_fts MATCH ")
            .bind::<Text, _>(expression.to_string())
            .sql(")"),
    )
}

/// `LIKE` pattern matching `text` anywhere, with wildcards escaped.
pub fn like_pattern(text: &str) -> String {
    let escaped = text
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
