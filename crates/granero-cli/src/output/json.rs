use granero_core::error::GraneroError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), GraneroError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
