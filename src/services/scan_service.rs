//! Scan pipeline: read documents, issue one extraction request, normalize the answer.

use crate::api::ExtractionBackend;
use crate::error::{Result, ScanError};
use crate::ocr;
use crate::types::{ExtractionRequest, NormalizedResult, ScanFile, ScanSource};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures::future::try_join_all;
use tracing::{info, warn};

pub struct ScanService<B> {
    backend: B,
}

/// Read one document and base64-encode it.
async fn read_encoded(file: &ScanFile) -> Result<String> {
    match &file.source {
        ScanSource::Bytes(bytes) => Ok(BASE64.encode(bytes)),
        ScanSource::Path(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|source| ScanError::FileRead {
                path: path.clone(),
                source,
            })?;
            Ok(BASE64.encode(&bytes))
        }
    }
}

/// Read every file concurrently and build the single extraction request.
/// One file goes out as `file`, several as `files` (input order kept).
pub async fn build_request(files: &[ScanFile], folder_id: Option<&str>) -> Result<ExtractionRequest> {
    let first = files.first().ok_or(ScanError::NoFiles)?;
    let mut encoded = try_join_all(files.iter().map(read_encoded)).await?;

    let (file, files) = if encoded.len() == 1 {
        (encoded.pop(), None)
    } else {
        (None, Some(encoded))
    };
    Ok(ExtractionRequest {
        mime_type: first.mime_type.clone(),
        folder_id: folder_id.map(str::to_string),
        file,
        files,
    })
}

impl<B: ExtractionBackend> ScanService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend the service was built with, e.g. to read [`crate::ApiClient::config`] once the
    /// client has been moved into the service.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Scan and normalize. Only an empty file list is reported as an error; read, network and
    /// decode failures are logged and come back as [`NormalizedResult::empty`].
    pub async fn scan(&self, files: &[ScanFile], folder_id: Option<&str>) -> Result<NormalizedResult> {
        if files.is_empty() {
            return Err(ScanError::NoFiles);
        }
        match self.scan_strict(files, folder_id).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(error = %e, files = files.len(), "[scan] extraction failed, returning empty result");
                Ok(NormalizedResult::empty())
            }
        }
    }

    /// Like [`ScanService::scan`] but every failure is returned to the caller.
    pub async fn scan_strict(&self, files: &[ScanFile], folder_id: Option<&str>) -> Result<NormalizedResult> {
        let request = build_request(files, folder_id).await?;
        info!(
            files = files.len(),
            mime_type = %request.mime_type,
            folder_id = ?request.folder_id,
            "[scan] sending extraction request"
        );
        let envelope = self.backend.extract(&request).await?;
        let result = ocr::normalize_envelope(envelope);
        info!(
            document_type = ?result.document_type,
            fields = result.details.len(),
            confidence = result.confidence,
            "[scan] extraction normalized"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtractionEnvelope;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Mutex;

    enum Reply {
        Envelope(serde_json::Value),
        Status(u16),
    }

    struct RecordingBackend {
        requests: Mutex<Vec<ExtractionRequest>>,
        reply: Reply,
    }

    impl RecordingBackend {
        fn replying(value: serde_json::Value) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Reply::Envelope(value),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Reply::Status(status),
            }
        }

        fn requests(&self) -> Vec<ExtractionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExtractionBackend for RecordingBackend {
        async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionEnvelope> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Reply::Envelope(value) => Ok(serde_json::from_value(value.clone())?),
                Reply::Status(status) => Err(ScanError::Api {
                    status: *status,
                    body: String::new(),
                }),
            }
        }
    }

    fn temp_doc(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[tokio::test]
    async fn two_files_read_before_single_request() {
        let a = temp_doc(b"first page");
        let b = temp_doc(b"second page");
        let service = ScanService::new(RecordingBackend::replying(json!({ "success": true, "data": {} })));
        let files = vec![
            ScanFile::from_path(a.path(), "application/pdf"),
            ScanFile::from_path(b.path(), "application/pdf"),
        ];

        service.scan(&files, Some("folder-1")).await.unwrap();

        let requests = service.backend().requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.file.is_none());
        assert_eq!(
            request.files.as_deref(),
            Some(&[BASE64.encode(b"first page"), BASE64.encode(b"second page")][..])
        );
        assert_eq!(request.mime_type, "application/pdf");
        assert_eq!(request.folder_id.as_deref(), Some("folder-1"));
    }

    #[tokio::test]
    async fn single_file_sent_as_file() {
        let service = ScanService::new(RecordingBackend::replying(json!({
            "success": true,
            "data": {
                "suggestedType": { "id": "rcpt", "name": "Receipt", "confidence": 0.9 },
                "suggestedTitle": "Groceries",
                "extractedDetails": { "storeName": "Market", "amount": 21.4, "currency": "EUR" }
            }
        })));
        let files = vec![ScanFile::from_bytes(b"jpeg-bytes".to_vec(), "image/jpeg")];

        let result = service.scan(&files, None).await.unwrap();

        let requests = service.backend().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].file.as_deref(), Some(BASE64.encode(b"jpeg-bytes").as_str()));
        assert!(requests[0].files.is_none());
        assert!(requests[0].folder_id.is_none());

        assert_eq!(result.document_type.as_deref(), Some("Receipt"));
        assert_eq!(result.title.as_deref(), Some("Groceries"));
        assert_eq!(result.currency.as_deref(), Some("EUR"));
        assert_eq!(result.details.get("vendor").and_then(|v| v.as_str()), Some("Market"));
        assert_eq!(result.confidence, 0.9);
    }

    #[tokio::test]
    async fn no_files_is_rejected_immediately() {
        let service = ScanService::new(RecordingBackend::replying(json!({})));
        assert!(matches!(service.scan(&[], None).await, Err(ScanError::NoFiles)));
        assert!(matches!(service.scan_strict(&[], None).await, Err(ScanError::NoFiles)));
        assert!(service.backend().requests().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_collapses_to_empty_result() {
        let service = ScanService::new(RecordingBackend::failing(503));
        let files = vec![ScanFile::from_bytes(vec![1, 2, 3], "image/png")];

        let result = service.scan(&files, None).await.unwrap();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "rawText": "", "extractedData": {}, "confidence": 0.0 })
        );

        let err = service.scan_strict(&files, None).await.unwrap_err();
        assert!(matches!(err, ScanError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn unreadable_file_collapses_without_request() {
        let service = ScanService::new(RecordingBackend::replying(json!({ "success": true })));
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            ScanFile::from_bytes(b"ok".to_vec(), "image/png"),
            ScanFile::from_path(dir.path().join("missing.png"), "image/png"),
        ];

        let result = service.scan(&files, None).await.unwrap();
        assert_eq!(result, NormalizedResult::empty());
        assert!(service.backend().requests().is_empty());

        let err = service.scan_strict(&files, None).await.unwrap_err();
        assert!(matches!(err, ScanError::FileRead { .. }));
    }

    #[tokio::test]
    async fn malformed_envelope_collapses() {
        let service = ScanService::new(RecordingBackend::replying(json!({ "success": "maybe" })));
        let files = vec![ScanFile::from_bytes(b"x".to_vec(), "image/png")];
        assert_eq!(service.scan(&files, None).await.unwrap(), NormalizedResult::empty());
    }

    #[tokio::test]
    async fn raw_text_fallback_through_pipeline() {
        let service = ScanService::new(RecordingBackend::replying(json!({
            "success": false,
            "data": {
                "extractedDetails": {},
                "rawText": "```json\n{\"documentType\":\"invoice\",\"title\":\"T\",\"amount\":12.5}\n```"
            }
        })));
        let files = vec![ScanFile::from_bytes(b"pdf".to_vec(), "application/pdf")];

        let result = service.scan(&files, None).await.unwrap();
        assert_eq!(result.document_type.as_deref(), Some("invoice"));
        assert_eq!(result.title.as_deref(), Some("T"));
        assert_eq!(result.details.get("amount").and_then(|v| v.as_f64()), Some(12.5));
        assert_eq!(result.confidence, 0.8);
    }
}
