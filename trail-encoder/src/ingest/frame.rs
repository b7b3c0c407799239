//! Feed frame parser
//!
//! A live feed delivers one observation per text message, serialised as a
//! JSON array `[x, y, type, prop]`.

use crate::types::{check_finite, EncoderError, Observation, Result};
use serde_json::Value;

/// Number of elements in a feed frame
pub const FRAME_LEN: usize = 4;

/// Parse one feed message into an observation
///
/// Coordinates must be JSON numbers or numeric strings and finite. Tags may
/// be strings or numbers; numbers become their decimal text.
pub fn parse_frame(text: &str) -> Result<Observation> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| EncoderError::MalformedFrame(format!("invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(EncoderError::MalformedFrame(format!(
                "expected a {}-element array, got {}",
                FRAME_LEN,
                kind_of(&other)
            )))
        }
    };

    if items.len() != FRAME_LEN {
        return Err(EncoderError::MalformedFrame(format!(
            "expected {} elements, got {}",
            FRAME_LEN,
            items.len()
        )));
    }

    let x = coordinate(&items[0], "x")?;
    let y = coordinate(&items[1], "y")?;
    check_finite(x, y)?;

    Ok(Observation::new(x, y, tag(&items[2], "type")?, tag(&items[3], "prop")?))
}

fn coordinate(value: &Value, name: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        EncoderError::MalformedFrame(format!("{} is not a number: {}", name, value))
    })
}

fn tag(value: &Value, name: &str) -> Result<String> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(EncoderError::MalformedFrame(format!(
            "{} must be a non-empty string or number, got {}",
            name, value
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
