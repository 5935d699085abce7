//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use sfumato_core::{AspectRatio, CostWindow, ImageModel, Resolution, ThinkingLevel};
use std::path::PathBuf;

/// Sfumato - durable AI image generation queue
#[derive(Parser, Debug)]
#[command(name = "sfumato")]
#[command(about = "Durable AI image generation queue with spend control", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue a generation request
    Enqueue(EnqueueArgs),

    /// Process pending jobs until the queue is idle
    Run {
        /// Override the configured concurrency
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// List jobs, newest first
    Jobs {
        /// Maximum number of jobs to display
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Cancel a pending job
    Cancel {
        /// Job id
        id: String,
    },

    /// Queue a copy of a failed or cancelled job
    Retry {
        /// Job id
        id: String,
    },

    /// Remove completed, failed and cancelled jobs
    Clear,

    /// List or search generated images
    Images {
        /// Full-text search terms
        #[arg(long)]
        search: Option<String>,

        /// Restrict to one project
        #[arg(long)]
        project: Option<String>,

        /// Only favourites
        #[arg(long)]
        favorites: bool,

        /// Maximum number of images to display
        #[arg(long, default_value = "20")]
        limit: i64,

        /// Number of images to skip
        #[arg(long, default_value = "0")]
        offset: i64,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Toggle the favourite flag of an image
    Favorite {
        /// Image id
        id: String,
    },

    /// Delete an image
    Delete {
        /// Image id
        id: String,

        /// Remove rows and files instead of hiding the image
        #[arg(long)]
        hard: bool,
    },

    /// Show estimated spend
    Usage {
        /// Accounting window
        #[arg(long, default_value_t = CostWindow::Month)]
        window: CostWindow,
    },

    /// Check the configured API key against the remote service
    ValidateKey,
}

/// Arguments for `enqueue`.
#[derive(clap::Args, Debug)]
pub struct EnqueueArgs {
    /// Text prompt
    pub prompt: String,

    /// Model to generate with
    #[arg(long, default_value_t = ImageModel::default())]
    pub model: ImageModel,

    /// Output aspect ratio (e.g. 16:9)
    #[arg(long)]
    pub aspect_ratio: Option<AspectRatio>,

    /// Output resolution (512px, 1K, 2K, 4K)
    #[arg(long)]
    pub resolution: Option<Resolution>,

    /// Thinking level
    #[arg(long)]
    pub thinking: Option<ThinkingLevel>,

    /// Number of images, each its own job (1 to 4)
    #[arg(long)]
    pub batch: Option<u32>,

    /// Higher values are dispatched first
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub priority: i32,

    /// Project whose brand context applies
    #[arg(long)]
    pub project: Option<String>,

    /// Image this one remixes
    #[arg(long)]
    pub parent: Option<String>,

    /// Extra system instruction
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Ground the prompt with web search
    #[arg(long)]
    pub search: bool,

    /// Subject or product reference image
    #[arg(long = "reference", value_name = "FILE")]
    pub references: Vec<PathBuf>,

    /// Identity reference image
    #[arg(long = "person", value_name = "FILE")]
    pub people: Vec<PathBuf>,

    /// Style reference image
    #[arg(long = "style", value_name = "FILE")]
    pub styles: Vec<PathBuf>,

    /// Process the queue until idle after enqueueing
    #[arg(long)]
    pub wait: bool,
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
