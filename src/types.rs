use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// One value in a details mapping. Mirrors JSON, but keeps nested objects ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<DetailValue>),
    Object(Details),
}

impl DetailValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DetailValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DetailValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DetailValue::Null)
    }
}

impl From<serde_json::Value> for DetailValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => DetailValue::Null,
            Value::Bool(b) => DetailValue::Bool(b),
            Value::Number(n) => DetailValue::Number(n),
            Value::String(s) => DetailValue::Text(s),
            Value::Array(items) => DetailValue::List(items.into_iter().map(DetailValue::from).collect()),
            Value::Object(map) => DetailValue::Object(Details::from(map)),
        }
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        DetailValue::Text(value.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        DetailValue::Text(value)
    }
}

/// Insertion-ordered details mapping (field key -> value).
///
/// Small by nature (a few dozen fields per document), so lookups are linear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Details {
    entries: Vec<(String, DetailValue)>,
}

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&DetailValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace; returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: DetailValue) -> Option<DetailValue> {
        let key = key.into();
        if let Some((_, slot)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Insert only when the key is not present yet. Returns true if inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: DetailValue) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DetailValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, DetailValue)> for Details {
    fn from_iter<I: IntoIterator<Item = (String, DetailValue)>>(iter: I) -> Self {
        let mut details = Details::new();
        for (k, v) in iter {
            details.insert(k, v);
        }
        details
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Details {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, DetailValue::from(v))).collect()
    }
}

impl Serialize for Details {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Details {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DetailsVisitor;

        impl<'de> Visitor<'de> for DetailsVisitor {
            type Value = Details;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of document fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Details, A::Error> {
                let mut details = Details::new();
                while let Some((key, value)) = access.next_entry::<String, DetailValue>()? {
                    details.insert(key, value);
                }
                Ok(details)
            }
        }

        deserializer.deserialize_map(DetailsVisitor)
    }
}

/// Where the bytes of a scanned document come from.
#[derive(Debug, Clone)]
pub enum ScanSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// One document handed to a scan (image, PDF, e-invoice XML).
#[derive(Debug, Clone)]
pub struct ScanFile {
    pub source: ScanSource,
    pub mime_type: String,
}

impl ScanFile {
    pub fn from_bytes(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            source: ScanSource::Bytes(bytes),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            source: ScanSource::Path(path.into()),
            mime_type: mime_type.into(),
        }
    }
}

/// Body of the extraction request. Exactly one of `file` / `files` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedType {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Raw extraction payload as returned by the OCR/AI backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionResponse {
    pub suggested_type: Option<SuggestedType>,
    pub suggested_title: Option<String>,
    pub suggested_description: Option<String>,
    pub suggested_date: Option<String>,
    pub extracted_details: Option<Details>,
    pub raw_text: Option<String>,
}

/// `{ success, data }` wrapper around [`ExtractionResponse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<ExtractionResponse>,
}

/// Fixed-shape scan result consumed by the form renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<DetailValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(rename = "extractedData", default)]
    pub details: Details,
    #[serde(default)]
    pub confidence: f64,
}

impl NormalizedResult {
    /// Result used when nothing could be extracted (or the call failed).
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn details_keep_insertion_order() {
        let details: Details = serde_json::from_value(json!({
            "zeta": 1,
            "alpha": "a",
            "mid": { "b": true, "a": null }
        }))
        .unwrap();
        assert_eq!(details.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        match details.get("mid") {
            Some(DetailValue::Object(inner)) => {
                assert_eq!(inner.keys().collect::<Vec<_>>(), vec!["b", "a"]);
                assert_eq!(inner.get("a"), Some(&DetailValue::Null));
            }
            other => panic!("expected nested object, got {:?}", other),
        }
        let back = serde_json::to_string(&details).unwrap();
        assert_eq!(back, r#"{"zeta":1,"alpha":"a","mid":{"b":true,"a":null}}"#);
    }

    #[test]
    fn insert_if_absent_keeps_first_value() {
        let mut details = Details::new();
        assert!(details.insert_if_absent("vendor", "first".into()));
        assert!(!details.insert_if_absent("vendor", "second".into()));
        assert_eq!(details.get("vendor").and_then(|v| v.as_str()), Some("first"));
        assert_eq!(details.len(), 1);
    }

    #[test]
    fn request_serializes_single_or_multi_file() {
        let single = ExtractionRequest {
            mime_type: "image/jpeg".into(),
            folder_id: None,
            file: Some("AAA=".into()),
            files: None,
        };
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            json!({ "mimeType": "image/jpeg", "file": "AAA=" })
        );

        let multi = ExtractionRequest {
            mime_type: "application/pdf".into(),
            folder_id: Some("f-1".into()),
            file: None,
            files: Some(vec!["AAA=".into(), "BBB=".into()]),
        };
        assert_eq!(
            serde_json::to_value(&multi).unwrap(),
            json!({ "mimeType": "application/pdf", "folderId": "f-1", "files": ["AAA=", "BBB="] })
        );
    }

    #[test]
    fn envelope_tolerates_missing_fields() {
        let env: ExtractionEnvelope = serde_json::from_value(json!({ "data": null })).unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());

        let env: ExtractionEnvelope = serde_json::from_value(json!({
            "success": true,
            "data": { "suggestedTitle": "Coffee", "extractedDetails": { "amount": 3.5 } }
        }))
        .unwrap();
        let data = env.data.unwrap();
        assert_eq!(data.suggested_title.as_deref(), Some("Coffee"));
        assert_eq!(
            data.extracted_details.unwrap().get("amount").and_then(|v| v.as_f64()),
            Some(3.5)
        );
    }

    #[test]
    fn empty_result_shape() {
        assert_eq!(
            serde_json::to_value(NormalizedResult::empty()).unwrap(),
            json!({ "rawText": "", "extractedData": {}, "confidence": 0.0 })
        );
    }
}
