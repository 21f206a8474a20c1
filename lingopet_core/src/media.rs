//! External media collaborators used during reviews.
//!
//! Illustration generation, speech and image display are provided by the
//! host. Their transport and retry logic is none of the engine's business:
//! each call eventually resolves or fails, and the engine decides what a
//! failure means for the card.

use crate::{ImageHandle, Result};
use async_trait::async_trait;

/// What to draw for a word
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IllustrationRequest {
    pub headword: String,
    pub context_sentence: String,
    pub scene: Option<String>,
}

/// Image generation backend
#[async_trait]
pub trait Illustrator: Send + Sync {
    /// Produce an illustration; may take arbitrarily long or fail
    async fn illustrate(&self, request: &IllustrationRequest) -> Result<ImageHandle>;
}

/// Text-to-speech backend
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Speak `text`, resolving when speech ends or fails
    async fn narrate(&self, text: &str, rate: f32) -> Result<()>;

    /// Stop any speech in progress
    fn cancel(&self);
}

/// Surface the illustration is drawn on
#[async_trait]
pub trait ImageSurface: Send + Sync {
    /// Resolves once the image has finished loading (or failed to)
    async fn display(&self, image: &ImageHandle) -> Result<()>;
}

/// Surface for hosts that don't render images
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSurface;

#[async_trait]
impl ImageSurface for NoSurface {
    async fn display(&self, _image: &ImageHandle) -> Result<()> {
        Ok(())
    }
}
