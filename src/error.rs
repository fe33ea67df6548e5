use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("{kind} not found: {}", path.display())]
    FileNotFound { kind: &'static str, path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON root in {} must be an object", path.display())]
    NotAnObject { path: PathBuf },

    #[error("Position for field {field} is malformed: {value}")]
    InvalidPosition { field: String, value: String },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Malformed PDF: {0}")]
    Malformed(String),

    #[error("Template has no first page")]
    MissingPage,

    #[error("Page box is invalid: {0}")]
    InvalidPageBox(String),

    #[error("Font registration failed: {0}")]
    Font(String),

    #[error("Failed to render page: {0}")]
    Render(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CardError>;

/// Fails with [`CardError::FileNotFound`] unless `path` exists.
pub fn require_file(kind: &'static str, path: &std::path::Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(CardError::FileNotFound {
            kind,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_message_names_path() {
        let err = require_file("template PDF", std::path::Path::new("/no/such/sheet.pdf"))
            .unwrap_err();
        assert_eq!(err.to_string(), "template PDF not found: /no/such/sheet.pdf");
    }

    #[test]
    fn existing_file_passes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(require_file("data JSON", file.path()).is_ok());
    }
}
