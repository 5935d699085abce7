use chrono::{Duration, Utc};
use sfumato_core::{CostWindow, ImageModel, Resolution, UsageLogEntry};
use sfumato_database::SqliteStore;
use tempfile::TempDir;

fn entry(cost: f64, age: Duration) -> UsageLogEntry {
    UsageLogEntry {
        image_id: None,
        model: ImageModel::Gemini3ProImage,
        resolution: Resolution::OneK,
        cost_estimate: cost,
        input_tokens: Some(120),
        output_tokens: Some(1290),
        created_at: Utc::now() - age,
    }
}

#[tokio::test]
async fn empty_log_costs_nothing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = SqliteStore::open(dir.path().join("sfumato.db"))?;
    assert_eq!(store.get_session_cost(CostWindow::All).await?, 0.0);
    Ok(())
}

#[tokio::test]
async fn cost_windows_sum_usage() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = SqliteStore::open(dir.path().join("sfumato.db"))?;
    store.insert_usage_log(entry(0.134, Duration::zero())).await?;
    store.insert_usage_log(entry(0.24, Duration::zero())).await?;
    store.insert_usage_log(entry(0.5, Duration::days(400))).await?;

    let day = store.get_session_cost(CostWindow::Day).await?;
    let month = store.get_session_cost(CostWindow::Month).await?;
    let all = store.get_session_cost(CostWindow::All).await?;

    assert!((day - 0.374).abs() < 1e-9);
    assert!((month - 0.374).abs() < 1e-9);
    assert!((all - 0.874).abs() < 1e-9);
    Ok(())
}
