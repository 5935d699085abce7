//! Project and brand asset rows.
//!
//! Projects are maintained by collaborators; the queue only reads them.

use crate::DatabaseResult;
use crate::models::{BrandAssetRow, NewProjectRow, ProjectRow};
use crate::schema::{project_brand_assets, projects};
use diesel::prelude::*;

/// Insert a project.
pub fn insert(conn: &mut SqliteConnection, project: &NewProjectRow) -> DatabaseResult<()> {
    diesel::insert_into(projects::table)
        .values(project)
        .execute(conn)?;
    Ok(())
}

/// Project by id.
pub fn get(conn: &mut SqliteConnection, project_id: &str) -> DatabaseResult<Option<ProjectRow>> {
    Ok(projects::table
        .find(project_id)
        .select(ProjectRow::as_select())
        .first(conn)
        .optional()?)
}

/// Insert a brand asset.
pub fn insert_asset(conn: &mut SqliteConnection, asset: &BrandAssetRow) -> DatabaseResult<()> {
    diesel::insert_into(project_brand_assets::table)
        .values(asset)
        .execute(conn)?;
    Ok(())
}

/// Brand assets of a project in position order.
pub fn assets(conn: &mut SqliteConnection, project_id: &str) -> DatabaseResult<Vec<BrandAssetRow>> {
    Ok(project_brand_assets::table
        .filter(project_brand_assets::project_id.eq(project_id))
        .order((
            project_brand_assets::position.asc(),
            project_brand_assets::created_at.asc(),
        ))
        .select(BrandAssetRow::as_select())
        .load(conn)?)
}
