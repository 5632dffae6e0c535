//! What the orchestrator hands back.

use std::sync::Arc;

use pristine_pipeline::{Analysis, Dimensions, EncodedImage, OutputFormat, Treatment};
use serde::{Deserialize, Serialize};

use crate::source::ImageSource;

/// Which tier produced a [`ProcessedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The remote transformation service.
    Remote,
    /// The local pixel pipeline.
    Local,
}

/// A successfully processed image. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    /// Identity of the source it was derived from.
    pub source: String,
    /// Treatment applied.
    pub treatment: Treatment,
    /// Tier that produced it.
    pub tier: Tier,
    /// Encoded payload.
    pub image: EncodedImage,
    /// Local pipeline findings; `None` for remote results.
    pub analysis: Option<Analysis>,
}

impl ProcessedImage {
    /// Payload format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.image.format
    }

    /// Payload dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.image.dimensions
    }

    /// Encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.image.bytes
    }

    /// `data:<media type>;base64,<payload>`, ready for display.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        self.image.to_data_uri()
    }
}

/// The displayable result of a render: always *something* to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendition {
    /// The processed image.
    Processed(Arc<ProcessedImage>),
    /// The unmodified source reference.
    Original(ImageSource),
}

impl Rendition {
    /// Whether processing succeeded.
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }

    /// The processed image, if any.
    #[must_use]
    pub const fn processed(&self) -> Option<&Arc<ProcessedImage>> {
        match self {
            Self::Processed(image) => Some(image),
            Self::Original(_) => None,
        }
    }

    /// A reference suitable for an `src` attribute: the data URI, or the
    /// original reference.
    #[must_use]
    pub fn display_src(&self) -> String {
        match self {
            Self::Processed(image) => image.to_data_uri(),
            Self::Original(source) => source.identity(),
        }
    }
}
