pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod ocr;
pub mod services;
pub mod types;

pub use api::{ApiClient, ExtractionBackend};
pub use config::ScanConfig;
pub use error::{Result, ScanError};
pub use ocr::{normalize_envelope, normalize_extraction, normalize_json};
pub use services::ScanService;
pub use types::{
    DetailValue, Details, ExtractionEnvelope, ExtractionRequest, ExtractionResponse, NormalizedResult, ScanFile,
    ScanSource, SuggestedType,
};

/// Guess a document MIME type from its file extension. Falls back to `application/octet-stream`.
pub fn mime_type_for_path(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "heic" => "image/heic",
        "webp" => "image/webp",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}
