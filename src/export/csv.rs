//! CSV serialization for aggregate rows.
//!
//! The header row lists the field names of the first row in declaration
//! order. Every data field is wrapped in double quotes with embedded quotes
//! doubled; null values become an empty quoted field.

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::{Map, Value};

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn as_object(row: Value) -> Result<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => bail!("CSV rows must serialize to objects, got {}", other),
    }
}

/// Serialize uniform rows to CSV text. Empty input yields an empty string.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let objects = rows
        .iter()
        .map(|row| serde_json::to_value(row).map_err(Into::into).and_then(as_object))
        .collect::<Result<Vec<_>>>()?;

    let Some(first) = objects.first() else {
        return Ok(String::new());
    };

    let headers: Vec<&String> = first.keys().collect();
    let mut lines = Vec::with_capacity(objects.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );

    for object in &objects {
        let fields: Vec<String> = headers
            .iter()
            .map(|h| quote(&field_text(object.get(h.as_str()))))
            .collect();
        lines.push(fields.join(","));
    }

    Ok(lines.join("\n"))
}

/// Parse CSV text into records of fields.
///
/// Handles quoted fields containing commas, doubled quotes and newlines.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    if text.is_empty() {
        return records;
    }

    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            '\r' => {}
            _ => field.push(c),
        }
    }

    record.push(field);
    records.push(record);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DestinationVisits;
    use serde_json::json;

    #[test]
    fn test_comma_and_null_fields() {
        let rows = vec![json!({ "a": "x,y", "b": null })];

        let csv = to_csv(&rows).unwrap();

        assert_eq!(csv, "a,b\n\"x,y\",\"\"");
        assert_eq!(
            parse_csv(&csv),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["x,y".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn test_quotes_are_doubled() {
        let rows = vec![json!({ "name": "The \"Bicol Express\" Tour" })];

        let csv = to_csv(&rows).unwrap();

        assert_eq!(csv, "name\n\"The \"\"Bicol Express\"\" Tour\"");
        assert_eq!(parse_csv(&csv)[1][0], "The \"Bicol Express\" Tour");
    }

    #[test]
    fn test_header_follows_field_order() {
        let rows = vec![DestinationVisits {
            name: "Mt. Isarog".to_string(),
            category: "Nature & Adventure".to_string(),
            municipality: "Pili".to_string(),
            visits: 5,
            confirmed: 2,
            intents: 3,
        }];

        let csv = to_csv(&rows).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("name,category,municipality,visits,confirmed,intents")
        );
        assert_eq!(
            lines.next(),
            Some("\"Mt. Isarog\",\"Nature & Adventure\",\"Pili\",\"5\",\"2\",\"3\"")
        );
    }

    #[test]
    fn test_empty_input() {
        let rows: Vec<DestinationVisits> = Vec::new();
        assert_eq!(to_csv(&rows).unwrap(), "");
        assert!(parse_csv("").is_empty());
    }

    #[test]
    fn test_non_object_rows_rejected() {
        assert!(to_csv(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_embedded_newline_round_trip() {
        let rows = vec![json!({ "note": "line one\nline two", "n": 1 })];

        let parsed = parse_csv(&to_csv(&rows).unwrap());

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], vec!["line one\nline two".to_string(), "1".to_string()]);
    }
}
