use granero_core::error::GraneroError;
use granero_core::extraction::pdftotext::PdftotextExtractor;
use granero_core::parsing::extract_table;
use std::path::{Path, PathBuf};

use super::{engine_config, has_extension};
use crate::output;

pub fn run(
    input_file: PathBuf,
    config_file: Option<&Path>,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), GraneroError> {
    let parsed = if has_extension(&input_file, "txt") {
        let text = std::fs::read_to_string(&input_file)?;
        extract_table(&text)
    } else {
        let config = engine_config(config_file)?;
        let pdf_bytes = std::fs::read(&input_file)?;
        let extractor = PdftotextExtractor::new();
        granero_core::parse_document(&pdf_bytes, &extractor, &config)?
    };

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&parsed)?;
            std::fs::write(&path, json)?;
            eprintln!(
                "Parsed {} sample(s) (confidence {}), written to {}",
                parsed.samples.len(),
                parsed.confidence,
                path.display()
            );
            for w in &parsed.warnings {
                eprintln!("  warning: {}", w);
            }
            if !parsed.skipped_lines.is_empty() {
                eprintln!(
                    "  {} line(s) skipped during parsing",
                    parsed.skipped_lines.len()
                );
            }
        }
        None => match output_format {
            "json" => output::json::print(&parsed)?,
            _ => println!("{}", output::table::format_extraction(&parsed)),
        },
    }

    Ok(())
}
