//! Form payload captured at submit time.
//!
//! A `FormPayload` is the ordered list of field name/value pairs read from a
//! form when it is submitted. Text and file fields are carried uniformly and
//! converted to a multipart body when the request is built.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

/// Content type used for file fields whose type cannot be guessed.
const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// The value of a single form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl FieldValue {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Create a file value from in-memory bytes.
    pub fn file(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        FieldValue::File {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub fn file_from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = guess_content_type(path);
        Ok(FieldValue::File {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::File { .. } => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FieldValue::File { .. })
    }

    fn into_part(self) -> Result<Part, SubmitError> {
        match self {
            FieldValue::Text(s) => Ok(Part::text(s)),
            FieldValue::File {
                file_name,
                content_type,
                bytes,
            } => Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(&content_type)
                .map_err(|e| SubmitError::Payload {
                    message: format!("invalid content type '{content_type}': {e}"),
                }),
        }
    }
}

/// Ordered mapping of field name to value, as read from a form.
///
/// Duplicate names are kept in insertion order, the same way a browser
/// serializes repeated inputs into multipart data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPayload {
    fields: Vec<(String, FieldValue)>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, FieldValue::text(value));
        self
    }

    /// Append a field of any kind.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// All values stored under `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.fields
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the multipart request body. Content type and boundary are left
    /// to the HTTP client.
    pub fn to_multipart(&self) -> Result<Form, SubmitError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.part(name.clone(), value.clone().into_part()?);
        }
        Ok(form)
    }
}

impl<N: Into<String>> FromIterator<(N, FieldValue)> for FormPayload {
    fn from_iter<I: IntoIterator<Item = (N, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

/// Parse a `name=value` pair as typed on the command line or in a
/// listener line. The value may be empty; the name may not.
pub fn parse_field_pair(pair: &str) -> Option<(String, String)> {
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => DEFAULT_FILE_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_payload_serde_roundtrip() {
        let payload = FormPayload::new()
            .with_text("age", "35")
            .with_field("statement", FieldValue::file("s.pdf", "application/pdf", b"%PDF".to_vec()));
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#"{"kind":"text","value":"35"}"#));
        let back: FormPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_payload_preserves_insertion_order() {
        let payload = FormPayload::new()
            .with_text("age", "35")
            .with_text("maritalStatus", "Married")
            .with_text("annualIncome", "55000");
        let names: Vec<&str> = payload.names().collect();
        assert_eq!(names, vec!["age", "maritalStatus", "annualIncome"]);
    }

    #[test]
    fn test_payload_keeps_duplicate_names() {
        let payload = FormPayload::new()
            .with_text("tag", "a")
            .with_text("tag", "b");
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("tag").and_then(|v| v.as_text()), Some("a"));
        let all: Vec<_> = payload.get_all("tag").filter_map(|v| v.as_text()).collect();
        assert_eq!(all, vec!["a", "b"]);
    }

    #[test]
    fn test_payload_from_iter() {
        let payload: FormPayload = vec![
            ("a", FieldValue::text("1")),
            ("b", FieldValue::file("x.txt", "text/plain", b"hi".to_vec())),
        ]
        .into_iter()
        .collect();
        assert_eq!(payload.len(), 2);
        assert!(payload.get("b").is_some_and(|v| v.is_file()));
        assert!(payload.get("missing").is_none());
    }

    #[test]
    fn test_to_multipart_accepts_text_and_files() {
        let payload = FormPayload::new()
            .with_text("age", "35")
            .with_field("statement", FieldValue::file("s.pdf", "application/pdf", vec![1, 2, 3]));
        let form = payload.to_multipart().unwrap();
        assert!(!form.boundary().is_empty());
    }

    #[test]
    fn test_to_multipart_rejects_bad_content_type() {
        let payload = FormPayload::new()
            .with_field("doc", FieldValue::file("d.bin", "not a mime", vec![0]));
        let err = payload.to_multipart().unwrap_err();
        assert_eq!(err.kind(), "payload");
        assert!(err.to_string().contains("not a mime"));
    }

    #[test]
    fn test_file_from_path_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payslip.PDF");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.4").unwrap();

        let value = FieldValue::file_from_path(&path).unwrap();
        match value {
            FieldValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                assert_eq!(file_name, "payslip.PDF");
                assert_eq!(content_type, "application/pdf");
                assert_eq!(bytes, b"%PDF-1.4");
            }
            FieldValue::Text(_) => panic!("expected a file value"),
        }
    }

    #[test]
    fn test_file_from_missing_path_errors() {
        let result = FieldValue::file_from_path(Path::new("/nonexistent/upload.bin"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_field_pair() {
        assert_eq!(
            parse_field_pair("age=35"),
            Some(("age".to_string(), "35".to_string()))
        );
        assert_eq!(
            parse_field_pair("note=a=b"),
            Some(("note".to_string(), "a=b".to_string()))
        );
        assert_eq!(
            parse_field_pair("empty="),
            Some(("empty".to_string(), String::new()))
        );
        assert_eq!(parse_field_pair("=value"), None);
        assert_eq!(parse_field_pair("novalue"), None);
    }
}
