use crate::types::{DetailValue, Details, ExtractionEnvelope, ExtractionResponse, NormalizedResult, SuggestedType};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Confidence given to a document type recovered from raw text when the model did not report one.
const FALLBACK_TYPE_CONFIDENCE: f64 = 0.8;

/// Model field name -> extra keys the form renderer may look the same value up by.
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("bankName", &["bank_name", "vendor"]),
    ("sellerName", &["vendor", "merchant"]),
    ("merchantName", &["vendor", "merchant"]),
    ("storeName", &["vendor", "merchant"]),
    ("receiverName", &["receiver", "recipient"]),
    ("senderName", &["sender"]),
    ("accountNumber", &["account_no", "account_number", "iban"]),
    ("iban", &["account_no", "account_number", "iban"]),
    ("transferType", &["transfer_type", "transaction_type"]),
    ("referenceNumber", &["reference_no", "reference_number", "transaction_id"]),
];

fn code_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json)?").expect("valid code fence regex"))
}

fn uppercase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z]").expect("valid uppercase regex"))
}

/// `bankName` -> `bank_name`. Every ASCII uppercase letter gets a leading `_`.
pub fn snake_case_alias(key: &str) -> String {
    uppercase_re()
        .replace_all(key, |caps: &regex::Captures| format!("_{}", caps[0].to_ascii_lowercase()))
        .into_owned()
}

/// Remove Markdown code-fence markers (```json / ```) that models wrap JSON answers in.
pub fn strip_code_fences(raw: &str) -> String {
    code_fence_re().replace_all(raw, "").trim().to_string()
}

/// Copy of `details` with snake_case and semantic alias keys added.
///
/// Original keys are seeded first, so a value the model returned verbatim is never replaced
/// by an alias derived from some other key.
pub fn normalize_details(details: &Details) -> Details {
    let mut normalized = details.clone();
    for (key, value) in details.iter() {
        let snake = snake_case_alias(key);
        if snake != key {
            normalized.insert_if_absent(snake, value.clone());
        }
        if let Some((_, targets)) = FIELD_ALIASES.iter().find(|(source, _)| *source == key) {
            for target in targets.iter() {
                normalized.insert_if_absent(*target, value.clone());
            }
        }
    }
    debug!(
        original = details.len(),
        normalized = normalized.len(),
        "[ocr] aliased detail keys"
    );
    normalized
}

/// Working copy of the fields a scan result is assembled from.
#[derive(Debug, Default)]
struct Accumulated {
    suggested_type: Option<SuggestedType>,
    title: Option<String>,
    description: Option<String>,
    date: Option<String>,
    details: Details,
    raw_text: String,
}

/// Text form of a scalar detail (`7` -> "7"). Null, lists and objects have none.
fn scalar_text(value: &DetailValue) -> Option<String> {
    match value {
        DetailValue::Text(s) => Some(s.clone()),
        DetailValue::Number(n) => Some(n.to_string()),
        DetailValue::Bool(b) => Some(b.to_string()),
        DetailValue::Null | DetailValue::List(_) | DetailValue::Object(_) => None,
    }
}

/// Recover structured fields from raw text when the backend could only hand back the model's
/// answer as text (often a fenced JSON block). Any parse failure leaves `acc` untouched.
fn apply_raw_text_fallback(acc: &mut Accumulated) {
    let cleaned = strip_code_fences(&acc.raw_text);
    if !cleaned.starts_with('{') {
        debug!("[ocr] raw text is not a JSON object, skipping fallback");
        return;
    }
    let parsed = match serde_json::from_str::<Details>(&cleaned) {
        Ok(details) => details,
        Err(e) => {
            debug!(error = %e, "[ocr] raw text fallback parse failed");
            return;
        }
    };

    if let Some(doc_type) = parsed.get("documentType").and_then(scalar_text) {
        let confidence = parsed
            .get("confidence")
            .and_then(|c| c.as_f64())
            .unwrap_or(FALLBACK_TYPE_CONFIDENCE);
        acc.suggested_type = Some(SuggestedType {
            id: Some(doc_type.clone()),
            name: Some(doc_type),
            confidence: Some(confidence),
        });
    }
    let string_field = |key: &str| parsed.get(key).and_then(|v| v.as_str()).map(str::to_string);
    if let Some(title) = string_field("title") {
        acc.title = Some(title);
    }
    if let Some(description) = string_field("description") {
        acc.description = Some(description);
    }
    if let Some(date) = string_field("date") {
        acc.date = Some(date);
    }
    // The outer text was the model answer; a nested rawText is the document's own OCR text.
    if let Some(inner) = string_field("rawText") {
        acc.raw_text = inner;
    }
    acc.details = parsed;
}

/// Turn a backend extraction response into the fixed result shape. Never fails.
pub fn normalize_extraction(success: bool, response: ExtractionResponse) -> NormalizedResult {
    let mut acc = Accumulated {
        suggested_type: response.suggested_type,
        title: response.suggested_title,
        description: response.suggested_description,
        date: response.suggested_date,
        details: response.extracted_details.unwrap_or_default(),
        raw_text: response.raw_text.unwrap_or_default(),
    };

    if !success && acc.details.is_empty() && !acc.raw_text.trim().is_empty() {
        apply_raw_text_fallback(&mut acc);
    }

    let details = normalize_details(&acc.details);
    let amount = details.get("amount").filter(|v| !v.is_null()).cloned();
    let currency = details.get("currency").and_then(|v| v.as_str()).map(str::to_string);
    let (document_type, confidence) = match acc.suggested_type {
        Some(t) => (t.name.or(t.id), t.confidence.unwrap_or(0.0)),
        None => (None, 0.0),
    };

    NormalizedResult {
        // Downstream never reads OCR text.
        raw_text: String::new(),
        title: acc.title,
        description: acc.description,
        date: acc.date,
        document_type,
        amount,
        currency,
        details,
        confidence: if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 },
    }
}

/// Same as [`normalize_extraction`], reading `success`/`data` from the response envelope.
pub fn normalize_envelope(envelope: ExtractionEnvelope) -> NormalizedResult {
    normalize_extraction(envelope.success, envelope.data.unwrap_or_default())
}

/// Lenient entry point for untyped JSON: anything that is not an envelope yields the empty result.
pub fn normalize_json(value: serde_json::Value) -> NormalizedResult {
    match serde_json::from_value::<ExtractionEnvelope>(value) {
        Ok(envelope) => normalize_envelope(envelope),
        Err(e) => {
            debug!(error = %e, "[ocr] extraction payload is not an envelope");
            NormalizedResult::empty()
        }
    }
}

/// True when `value` carries the `{ success, data }` wrapper rather than a bare response.
pub fn is_envelope(value: &serde_json::Value) -> bool {
    value.get("data").is_some() || value.get("success").is_some()
}

/// Normalize a saved payload of either shape. A bare response object takes `success` from the
/// caller; an envelope uses its own flag.
pub fn normalize_saved(value: serde_json::Value, success: bool) -> serde_json::Result<NormalizedResult> {
    if is_envelope(&value) {
        return Ok(normalize_json(value));
    }
    let response: ExtractionResponse = serde_json::from_value(value)?;
    Ok(normalize_extraction(success, response))
}
