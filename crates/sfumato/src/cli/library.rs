//! Image library, spend and key command handlers.

use super::commands::OutputFormat;
use chrono::Utc;
use sfumato::Engine;
use sfumato_core::{CostWindow, GeneratedImage, ImageQuery};
use sfumato_error::{ConfigError, JsonError, SfumatoResult};
use sfumato_interface::ConfigProvider;

/// Filters accepted by `images`.
pub struct ImageFilter {
    pub search: Option<String>,
    pub project: Option<String>,
    pub favorites: bool,
    pub limit: i64,
    pub offset: i64,
}

/// List or search images.
pub async fn images(engine: &Engine, filter: ImageFilter, format: OutputFormat) -> SfumatoResult<()> {
    let mut builder = ImageQuery::builder();
    builder
        .favorites_only(filter.favorites)
        .limit(filter.limit)
        .offset(filter.offset);
    if let Some(search) = filter.search {
        builder.search(search);
    }
    if let Some(project) = filter.project {
        builder.project_id(project);
    }
    let query = builder
        .build()
        .map_err(|e| ConfigError::new(format!("Invalid image query: {}", e)))?;

    let images = engine.store().list_images(query).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&images)
                .map_err(|e| JsonError::new(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Human => {
            for image in &images {
                print_image(image);
            }
            println!("Total: {} images", images.len());
        }
    }
    Ok(())
}

/// Toggle the favourite flag.
pub async fn favorite(engine: &Engine, id: &str) -> SfumatoResult<()> {
    let favorite = engine.store().toggle_favorite(id).await?;
    if favorite {
        println!("{} is now a favourite", id);
    } else {
        println!("{} is no longer a favourite", id);
    }
    Ok(())
}

/// Hide an image, or remove its rows and files with `hard`.
pub async fn delete(engine: &Engine, id: &str, hard: bool) -> SfumatoResult<()> {
    let removed = if hard {
        engine.artifacts().delete_image_files(id).await?
    } else {
        engine.store().soft_delete_image(id).await?
    };
    match (removed, hard) {
        (false, _) => println!("No image {}", id),
        (true, true) => println!("Deleted {} and its files", id),
        (true, false) => println!("Moved {} to the trash", id),
    }
    Ok(())
}

/// Report estimated spend for a window against the configured ceilings.
pub async fn usage(engine: &Engine, window: CostWindow) -> SfumatoResult<()> {
    let spent = engine.store().get_session_cost(window).await?;
    match window.start(Utc::now()) {
        Some(start) => println!(
            "Spent since {}: ${:.3}",
            start.format("%Y-%m-%d"),
            spent
        ),
        None => println!("Spent in total: ${:.3}", spent),
    }

    let limits = engine.config().spend_limits();
    if let Some(monthly) = limits.monthly {
        println!("Monthly limit: ${:.2}", monthly);
    }
    if let Some(total) = limits.total {
        println!("Total limit:   ${:.2}", total);
    }
    Ok(())
}

/// Probe the configured API key.
pub async fn validate_key(engine: &Engine) -> SfumatoResult<()> {
    let validation = engine.validate_api_key().await;
    if validation.valid {
        println!("API key is valid: {}", validation.message);
        Ok(())
    } else {
        Err(ConfigError::new(format!("API key rejected: {}", validation.message)).into())
    }
}

fn print_image(image: &GeneratedImage) {
    let star = if image.is_favorite { "*" } else { " " };
    let prompt: String = image.prompt.chars().take(50).collect();
    println!(
        "{} {:<36}  {:<28}  {:>5}  ${:.3}  {}",
        star,
        image.id,
        image.model,
        image.resolution,
        image.cost_estimate,
        prompt
    );
    println!("    {}", image.file_path);
}
