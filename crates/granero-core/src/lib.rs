pub mod config;
pub mod error;
pub mod extraction;
pub mod form;
pub mod ingest;
pub mod loss;
pub mod matching;
pub mod model;
pub mod parsing;
pub mod repository;

use config::EngineConfig;
use error::GraneroError;
use extraction::layout::assemble_text;
use extraction::TextExtractor;
use parsing::ExtractionResult;
use tracing::warn;

/// Parse a pest report document into samples without recording anything.
///
/// The document is extracted to positioned words, assembled into lines and
/// read as a sample table. A document without a text layer gives an empty,
/// zero-confidence result rather than an error.
pub fn parse_document(
    document: &[u8],
    extractor: &dyn TextExtractor,
    config: &EngineConfig,
) -> Result<ExtractionResult, GraneroError> {
    let tokens = extractor.extract_tokens(document)?;
    if tokens.is_empty() {
        warn!(backend = extractor.backend_name(), "extractor returned no text");
    }
    let text = assemble_text(&tokens, config.line_gap);
    Ok(parsing::extract_table(&text))
}
