//! Remote image generation for Sfumato.
//!
//! [`GeminiImageClient`] implements [`sfumato_interface::ImageGenerator`]
//! against the Gemini `generateContent` endpoint, with bounded exponential
//! backoff for transient failures and optional client-side throttling.
//!
//! ```no_run
//! use sfumato_core::{GenerationRequest, ImageModel};
//! use sfumato_interface::ImageGenerator;
//! use sfumato_models::{GeminiClientConfig, GeminiImageClient};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiImageClient::new(GeminiClientConfig::default())?;
//! let request = GenerationRequest::new(ImageModel::Gemini25FlashImage, "a paper crane");
//! let output = client.generate(&request, "my-api-key").await?;
//! println!("{} image(s) after {} attempt(s)", output.images.len(), output.attempts);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod gemini;
mod retry;

pub use gemini::*;
pub use retry::RetryPolicy;
