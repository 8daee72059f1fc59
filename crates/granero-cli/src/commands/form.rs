use granero_core::error::GraneroError;
use granero_core::form::map_form;
use std::path::PathBuf;

use crate::output;

pub fn run(input_file: PathBuf, output_format: &str) -> Result<(), GraneroError> {
    let content = std::fs::read_to_string(&input_file)?;
    let submission: serde_json::Value = serde_json::from_str(&content)?;
    let mapping = map_form(&submission);

    match output_format {
        "json" => output::json::print(&mapping)?,
        _ => println!("{}", output::table::format_form(&mapping)),
    }
    Ok(())
}
