//! Dataset loading from CSV, JSON, JSONL and plain-text files.

use crate::config::InputConfig;
use crate::data::dataset::{Dataset, Value};
use crate::error::BiasError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    Csv,
    Json,
    Jsonl,
    Text,
}

impl DatasetFormat {
    /// Pick a format from a file extension. Unknown extensions fall back to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("jsonl") | Some("ndjson") => Self::Jsonl,
            Some("txt") => Self::Text,
            _ => Self::Csv,
        }
    }
}

const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Load a dataset file, enforcing the configured size limit.
pub async fn load_file(path: &Path, input: &InputConfig) -> Result<Dataset, BiasError> {
    let bytes = tokio::fs::read(path).await?;
    let size_mb = bytes.len() as f64 / (1024.0 * 1024.0);
    if size_mb > input.max_file_size_mb as f64 {
        return Err(BiasError::input(format!(
            "File too large ({size_mb:.1}MB). Maximum size is {}MB.",
            input.max_file_size_mb
        )));
    }
    load_bytes(&bytes, DatasetFormat::from_path(path))
}

/// Parse raw bytes in the given format.
pub fn load_bytes(bytes: &[u8], format: DatasetFormat) -> Result<Dataset, BiasError> {
    if bytes.is_empty() {
        return Err(BiasError::input("File is empty"));
    }
    let text = decode(bytes);
    let dataset = match format {
        DatasetFormat::Csv => parse_csv(&text, sniff_delimiter(&text))?,
        DatasetFormat::Json => parse_json(&text)?,
        DatasetFormat::Jsonl => parse_jsonl(&text)?,
        DatasetFormat::Text => parse_text(&text)?,
    };
    if dataset.is_empty() {
        return Err(BiasError::input("Dataset is empty or could not be parsed"));
    }
    Ok(dataset)
}

/// Reject datasets too small for a meaningful analysis.
pub fn validate_for_analysis(dataset: &Dataset, input: &InputConfig) -> Result<(), BiasError> {
    if dataset.is_empty() {
        return Err(BiasError::input("Dataset is empty"));
    }
    if dataset.row_count() < input.min_rows {
        return Err(BiasError::input(format!(
            "Dataset too small ({} rows). Need at least {} rows for meaningful analysis.",
            dataset.row_count(),
            input.min_rows
        )));
    }
    if dataset.column_count() < input.min_columns {
        return Err(BiasError::input(format!(
            "Dataset has only {} column(s). Need at least {} columns for bias analysis.",
            dataset.column_count(),
            input.min_columns
        )));
    }
    Ok(())
}

/// UTF-8 with a Latin-1 fallback.
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Choose the delimiter that splits the header into the most fields.
fn sniff_delimiter(text: &str) -> char {
    let header = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    DELIMITERS
        .iter()
        .copied()
        .max_by_key(|&d| (split_record(header, d).len(), d == ','))
        .unwrap_or(',')
}

/// Split one CSV record, honouring double quotes.
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Join physical lines into records so quoted newlines stay inside a field.
fn records(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut open = false;
    for line in text.lines() {
        if !current.is_empty() || open {
            current.push('\n');
        }
        current.push_str(line);
        open ^= line.matches('"').count() % 2 == 1;
        if !open {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn parse_csv(text: &str, delimiter: char) -> Result<Dataset, BiasError> {
    let mut recs = records(text).into_iter().filter(|r| !r.trim().is_empty());
    let header = recs
        .next()
        .ok_or_else(|| BiasError::input("Empty CSV file"))?;
    let columns: Vec<String> = split_record(&header, delimiter)
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let c = c.trim().to_string();
            if c.is_empty() { format!("column_{i}") } else { c }
        })
        .collect();

    let width = columns.len();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for rec in recs {
        let fields = split_record(&rec, delimiter);
        // Malformed lines are skipped rather than failing the whole file.
        if fields.len() > width {
            skipped += 1;
            continue;
        }
        rows.push(fields.iter().map(|f| Value::parse(f)).collect());
    }
    if skipped > 0 {
        tracing::warn!(skipped, "Skipped malformed CSV lines");
    }
    Ok(Dataset::new(columns, rows))
}

fn rows_from_objects(objects: Vec<serde_json::Map<String, serde_json::Value>>) -> Dataset {
    let mut columns: Vec<String> = Vec::new();
    for obj in &objects {
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    let rows = objects
        .into_iter()
        .map(|mut obj| {
            columns
                .iter()
                .map(|c| obj.remove(c).map(Value::from).unwrap_or(Value::Missing))
                .collect()
        })
        .collect();
    Dataset::new(columns, rows)
}

fn parse_json(text: &str) -> Result<Dataset, BiasError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| BiasError::input(format!("Failed to parse JSON: {e}")))?;
    match value {
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                return Err(BiasError::input("JSON array is empty"));
            }
            let objects = items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(map) => Ok(map),
                    _ => Err(BiasError::input("JSON array must contain objects")),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows_from_objects(objects))
        }
        serde_json::Value::Object(map) => Ok(rows_from_objects(vec![map])),
        _ => Err(BiasError::input("JSON must contain an array or object")),
    }
}

fn parse_jsonl(text: &str) -> Result<Dataset, BiasError> {
    let mut objects = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(serde_json::Value::Object(map)) => objects.push(map),
            Ok(_) => return Err(BiasError::input(format!("Line {} is not an object", i + 1))),
            Err(e) => return Err(BiasError::input(format!("Line {}: {e}", i + 1))),
        }
    }
    Ok(rows_from_objects(objects))
}

fn parse_text(text: &str) -> Result<Dataset, BiasError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let first = lines
        .first()
        .ok_or_else(|| BiasError::input("Text file is empty"))?;
    if first.contains(',') || first.contains('\t') {
        return parse_csv(&lines.join("\n"), sniff_delimiter(text));
    }
    let rows = lines.iter().map(|l| vec![Value::text(*l)]).collect();
    Ok(Dataset::new(vec!["text".to_string()], rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DatasetFormat::from_path(Path::new("a.JSON")), DatasetFormat::Json);
        assert_eq!(DatasetFormat::from_path(Path::new("a.jsonl")), DatasetFormat::Jsonl);
        assert_eq!(DatasetFormat::from_path(Path::new("a.txt")), DatasetFormat::Text);
        assert_eq!(DatasetFormat::from_path(Path::new("a.dat")), DatasetFormat::Csv);
    }

    #[test]
    fn test_parse_csv_with_quotes() {
        let csv = "name,age,note\n\"Smith, J\",30,\"said \"\"hi\"\"\"\nLee,,ok\n";
        let ds = load_bytes(csv.as_bytes(), DatasetFormat::Csv).unwrap();
        assert_eq!(ds.columns, vec!["name", "age", "note"]);
        assert_eq!(ds.rows[0][0], Value::text("Smith, J"));
        assert_eq!(ds.rows[0][1], Value::Number(30.0));
        assert_eq!(ds.rows[0][2], Value::text("said \"hi\""));
        assert_eq!(ds.rows[1][1], Value::Missing);
    }

    #[test]
    fn test_sniff_semicolon() {
        let csv = "a;b;c\n1;2;3\n";
        let ds = load_bytes(csv.as_bytes(), DatasetFormat::Csv).unwrap();
        assert_eq!(ds.column_count(), 3);
    }

    #[test]
    fn test_parse_json_array() {
        let json = r#"[{"gender": "M", "score": 1.5}, {"gender": "F"}]"#;
        let ds = load_bytes(json.as_bytes(), DatasetFormat::Json).unwrap();
        assert_eq!(ds.columns, vec!["gender", "score"]);
        assert_eq!(ds.rows[1][1], Value::Missing);
    }

    #[test]
    fn test_parse_text_lines() {
        let txt = "first line\n\nsecond line\n";
        let ds = load_bytes(txt.as_bytes(), DatasetFormat::Text).unwrap();
        assert_eq!(ds.columns, vec!["text"]);
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        assert!(matches!(
            load_bytes(b"", DatasetFormat::Csv),
            Err(BiasError::Input(_))
        ));
        assert!(matches!(
            load_bytes(b"[]", DatasetFormat::Json),
            Err(BiasError::Input(_))
        ));
    }

    #[test]
    fn test_validate_for_analysis() {
        let input = InputConfig::default();
        let small = Dataset::from_columns(vec![
            ("a", vec![Value::Number(1.0); 3]),
            ("b", vec![Value::Number(1.0); 3]),
        ]);
        let err = validate_for_analysis(&small, &input).unwrap_err();
        assert!(err.to_string().contains("too small"));

        let narrow = Dataset::from_columns(vec![("a", vec![Value::Number(1.0); 10])]);
        assert!(validate_for_analysis(&narrow, &input).is_err());

        let ok = Dataset::from_columns(vec![
            ("a", vec![Value::Number(1.0); 10]),
            ("b", vec![Value::Number(1.0); 10]),
        ]);
        assert!(validate_for_analysis(&ok, &input).is_ok());
    }
}
