//! Command-line helpers: pin type parsing and the terminal confirmation prompt

use std::io::{BufRead, Write};

use blueprint_editor::blueprint_types::PinType;
use blueprint_editor::{ConfirmRequest, ConfirmationPrompt};

/// Parse a pin type as written on the command line: `bool`, `byte`, `int`,
/// `real`, `string`, `name`, `array<T>`, `struct:Name` or `object:Class`
pub fn parse_pin_type(input: &str) -> Result<PinType, String> {
    let input = input.trim();
    if let Some(inner) = input.strip_prefix("array<").and_then(|s| s.strip_suffix('>')) {
        return Ok(PinType::array_of(parse_pin_type(inner)?));
    }
    if let Some(name) = input.strip_prefix("struct:") {
        return Ok(PinType::structure(name));
    }
    if let Some(name) = input.strip_prefix("object:") {
        return Ok(PinType::object(name));
    }
    match input.to_ascii_lowercase().as_str() {
        "bool" | "boolean" => Ok(PinType::Boolean),
        "byte" => Ok(PinType::Byte),
        "int" | "integer" => Ok(PinType::Integer),
        "real" | "float" | "double" => Ok(PinType::Real),
        "string" => Ok(PinType::String),
        "name" => Ok(PinType::Name),
        _ => Err(format!("unknown pin type '{}'", input)),
    }
}

/// Asks on the terminal. Anything but `y`/`yes` declines.
pub struct StdinPrompt;

impl ConfirmationPrompt for StdinPrompt {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "{}\n{}", request.title, request.message);
        let _ = write!(stderr, "Continue? [y/N] ");
        let _ = stderr.flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin_types() {
        assert_eq!(parse_pin_type("int"), Ok(PinType::Integer));
        assert_eq!(parse_pin_type("Real"), Ok(PinType::Real));
        assert_eq!(
            parse_pin_type("array<object:Actor>"),
            Ok(PinType::array_of(PinType::object("Actor")))
        );
        assert_eq!(parse_pin_type("struct:Vector"), Ok(PinType::structure("Vector")));
        assert!(parse_pin_type("exec").is_err());
    }
}
