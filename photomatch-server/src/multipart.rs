//! Multipart form parsing helpers
//!
//! Collects the uploaded query image and any text fields from a
//! multipart/form-data request.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size};

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type from the multipart field (if provided)
    pub content_type: Option<String>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

/// Parsed multipart form fields
#[derive(Debug)]
pub struct MultipartFields {
    /// File field (named "file")
    file: Option<FileField>,
    /// Text fields indexed by name
    text_fields: HashMap<String, String>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request
    ///
    /// The `file` field is checked against the allowed Content-Types (when
    /// `validate_content_type_flag` is set) and against `max_file_size`.
    pub async fn parse(
        multipart: &mut Multipart,
        validate_content_type_flag: bool,
        max_file_size: usize,
    ) -> Result<Self, ApiError> {
        let mut file: Option<FileField> = None;
        let mut text_fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                let content_type = field.content_type().map(|s| s.to_string());
                let file_name = field.file_name().map(|s| s.to_string());

                if validate_content_type_flag {
                    validate_content_type(content_type.as_deref())?;
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                    .to_vec();

                validate_file_size(data.len(), max_file_size)?;

                file = Some(FileField {
                    data,
                    content_type,
                    file_name,
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read field '{}': {}", name, e))
                })?;
                text_fields.insert(name, value);
            }
        }

        Ok(Self { file, text_fields })
    }

    /// Get the file field (required)
    ///
    /// Returns an error if no file was uploaded.
    pub fn require_file(&self) -> Result<&FileField, ApiError> {
        self.file.as_ref().ok_or_else(|| {
            ApiError::bad_request("No file provided. Use 'file' field in multipart form.")
        })
    }

    /// Get a text field value
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.text_fields.get(name).map(|s| s.as_str())
    }

    /// Get a text field parsed as an unsigned number
    ///
    /// Returns:
    /// - `Ok(Some(n))` if the field exists and parses
    /// - `Ok(None)` if the field is missing or blank
    /// - `Err(ApiError)` if the field exists but is not a number
    pub fn get_number<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.get_text(name).map(str::trim) {
            Some(value) if !value.is_empty() => value
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("Invalid {}: '{}'", name, value))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_with(pairs: &[(&str, &str)]) -> MultipartFields {
        MultipartFields {
            file: None,
            text_fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_get_text() {
        let fields = fields_with(&[("name", "test")]);

        assert_eq!(fields.get_text("name"), Some("test"));
        assert_eq!(fields.get_text("missing"), None);
    }

    #[test]
    fn test_get_number() {
        let fields = fields_with(&[("threshold", " 12 "), ("blank", ""), ("bad", "ten")]);

        assert_eq!(fields.get_number::<u32>("threshold").unwrap(), Some(12));
        assert_eq!(fields.get_number::<u32>("blank").unwrap(), None);
        assert_eq!(fields.get_number::<u32>("missing").unwrap(), None);
        assert!(fields.get_number::<u32>("bad").is_err());
        assert!(fields.get_number::<u32>("threshold").is_ok());
    }

    #[test]
    fn test_require_file_missing() {
        let fields = fields_with(&[]);
        assert!(fields.require_file().is_err());
    }
}
