use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No files provided for scanning")]
    NoFiles,

    #[error("Could not read file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Extraction failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid extraction response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScanError {
    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::NoFiles => "Select at least one document to scan.".to_string(),
            ScanError::FileRead { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                "File not found.".to_string()
            }
            ScanError::FileRead { source, .. } => format!("Could not read file: {}", source),
            ScanError::Transport(e) if e.is_connect() || e.is_timeout() => {
                "Check your internet connection and try again.".to_string()
            }
            ScanError::Transport(_) => "Network error.".to_string(),
            ScanError::Api { status, body } if body.is_empty() => {
                format!("Scan failed ({}): Invalid token or endpoint?", status)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages() {
        assert_eq!(ScanError::NoFiles.user_message(), "Select at least one document to scan.");
        let missing = ScanError::FileRead {
            path: PathBuf::from("/nope.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(missing.user_message(), "File not found.");
        let api = ScanError::Api { status: 401, body: String::new() };
        assert_eq!(api.user_message(), "Scan failed (401): Invalid token or endpoint?");
        let api = ScanError::Api { status: 500, body: "boom".into() };
        assert_eq!(api.user_message(), "Extraction failed (500): boom");
    }
}
