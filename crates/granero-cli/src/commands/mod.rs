pub mod config;
pub mod form;
pub mod ingest;
pub mod ledger;
pub mod parse;

use granero_core::config::{builtin, load_config, EngineConfig};
use granero_core::error::GraneroError;
use std::path::Path;

/// The config named on the command line, else the built-in one.
fn engine_config(path: Option<&Path>) -> Result<EngineConfig, GraneroError> {
    match path {
        Some(p) => load_config(p),
        None => Ok(builtin::default_config()),
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
