//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the sfumato binary.

mod commands;
mod jobs;
mod library;

pub use commands::{Cli, Commands};
use library::ImageFilter;

use sfumato::Engine;
use sfumato_error::SfumatoResult;

/// Dispatch a parsed command.
pub async fn execute(engine: &Engine, command: Commands) -> SfumatoResult<()> {
    match command {
        Commands::Enqueue(args) => jobs::enqueue(engine, args).await,
        Commands::Run { concurrency } => jobs::run(engine, concurrency).await,
        Commands::Jobs { limit, format } => jobs::list(engine, limit, format).await,
        Commands::Cancel { id } => jobs::cancel(engine, &id).await,
        Commands::Retry { id } => jobs::retry(engine, &id).await,
        Commands::Clear => jobs::clear(engine).await,
        Commands::Images {
            search,
            project,
            favorites,
            limit,
            offset,
            format,
        } => {
            let filter = ImageFilter {
                search,
                project,
                favorites,
                limit,
                offset,
            };
            library::images(engine, filter, format).await
        }
        Commands::Favorite { id } => library::favorite(engine, &id).await,
        Commands::Delete { id, hard } => library::delete(engine, &id, hard).await,
        Commands::Usage { window } => library::usage(engine, window).await,
        Commands::ValidateKey => library::validate_key(engine).await,
    }
}
