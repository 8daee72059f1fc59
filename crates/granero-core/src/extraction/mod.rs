pub mod layout;
pub mod pdftotext;

use crate::error::GraneroError;
use serde::{Deserialize, Serialize};

/// One word of extracted text and where it sits on its page.
///
/// Coordinates are in points from the top-left corner of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedToken {
    /// 1-based page number.
    pub page: usize,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    pub text: String,
}

/// Trait for document text extraction backends.
pub trait TextExtractor: Send + Sync {
    /// Extract the words of a document with their positions.
    fn extract_tokens(&self, document: &[u8]) -> Result<Vec<PositionedToken>, GraneroError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
