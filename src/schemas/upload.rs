//! Preserved-artifact upload form.

use super::{FieldError, SchemaEnum, ValidationErrors};
use crate::preservation::ArchivedFormat;

/// MIME types accepted for uploaded artifacts.
pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/pdf",
    "text/plain",
];

/// One file part as received from a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub mimetype: String,
    pub bytes: Vec<u8>,
}

/// Raw multipart fields before validation.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub id: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file: UploadedFile,
    pub id: i64,
    pub format: ArchivedFormat,
}

impl UploadFile {
    /// Validate `form`; size, type, id and format are each checked independently.
    pub fn parse(form: UploadForm, max_bytes: usize) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let file = if form.files.len() == 1 {
            form.files.into_iter().next()
        } else {
            errors.push(FieldError::new("file", "File is required."));
            None
        };
        if let Some(file) = &file {
            if file.bytes.len() > max_bytes {
                errors.push(FieldError::new(
                    "file",
                    format!("Max file size is {}MB.", max_bytes / (1024 * 1024)),
                ));
            }
            if !ACCEPTED_MIME_TYPES.contains(&file.mimetype.as_str()) {
                errors.push(FieldError::new(
                    "file",
                    format!(
                        "Only {} files are accepted.",
                        ACCEPTED_MIME_TYPES.join(", ")
                    ),
                ));
            }
        }

        let id = match form.id.as_deref().map(str::trim) {
            None => {
                errors.push(FieldError::new("id", "Required"));
                None
            }
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push(FieldError::new("id", "Expected number, received string"));
                    None
                }
            },
        };

        let format = match form.format.as_deref() {
            None => {
                errors.push(FieldError::new("format", "Required"));
                None
            }
            Some(raw) => {
                let parsed = ArchivedFormat::from_name(raw);
                if parsed.is_none() {
                    errors.push(FieldError::new(
                        "format",
                        format!(
                            "Invalid enum value. Expected {}, received '{raw}'",
                            ArchivedFormat::expected()
                        ),
                    ));
                }
                parsed
            }
        };

        match (file, id, format) {
            (Some(file), Some(id), Some(format)) if errors.is_empty() => {
                Ok(Self { file, id, format })
            }
            _ => Err(errors.into()),
        }
    }
}
