//! Framework-neutral view of an inbound delivery and raw payload resolution.
//!
//! Signatures are computed over bytes, so verification must see exactly what
//! the sender signed. A body that was parsed and re-serialized can differ in
//! whitespace or key order and is never used.

use axum::body::Bytes;

use super::error::WebhookError;

/// The exact bytes of a delivery as captured before any body handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    Bytes(Bytes),
    Text(String),
}

impl RawPayload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => &bytes[..],
            Self::Text(text) => text.as_bytes(),
        }
    }
}

impl From<Bytes> for RawPayload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RawPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for RawPayload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawPayload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// What the transport did with the request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Left as an unparsed string.
    Unparsed(String),
    /// Parsed into JSON by an earlier layer; the original bytes are gone.
    Parsed(serde_json::Value),
    /// Consumed, or not representable as a string.
    Unavailable,
    /// Could not be buffered within the size limit.
    TooLarge { limit: usize },
}

/// How many signature values a delivery carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureHeader<'a> {
    Missing,
    Single(&'a str),
    Multiple(usize),
}

/// One inbound webhook delivery, independent of the web framework.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    signatures: Vec<String>,
    raw: Option<RawPayload>,
    body: RequestBody,
}

impl WebhookRequest {
    pub fn new(body: RequestBody) -> Self {
        Self {
            signatures: Vec::new(),
            raw: None,
            body,
        }
    }

    /// Shorthand for a request whose body was captured raw.
    pub fn from_raw(raw: impl Into<RawPayload>) -> Self {
        Self::new(RequestBody::Unavailable).with_raw(raw)
    }

    /// Add one signature header value. Call repeatedly for repeated headers.
    pub fn with_signature(mut self, value: impl Into<String>) -> Self {
        self.signatures.push(value.into());
        self
    }

    pub fn with_signatures<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signatures.extend(values.into_iter().map(Into::into));
        self
    }

    /// Attach the raw body captured before any parsing.
    pub fn with_raw(mut self, raw: impl Into<RawPayload>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Classify the signature header values.
    ///
    /// A value containing a comma counts as several values: proxies fold
    /// repeated headers into one comma-joined value, and a hex digest never
    /// contains a comma. A lone blank value counts as missing.
    pub fn signature(&self) -> SignatureHeader<'_> {
        let count: usize = self
            .signatures
            .iter()
            .map(|value| value.split(',').count())
            .sum();

        match (self.signatures.as_slice(), count) {
            ([], _) => SignatureHeader::Missing,
            ([value], 1) if value.trim().is_empty() => SignatureHeader::Missing,
            ([value], 1) => SignatureHeader::Single(value.trim()),
            (_, count) => SignatureHeader::Multiple(count),
        }
    }

    /// Pick the bytes that were signed.
    ///
    /// 1. a raw buffer or string captured before body parsing
    /// 2. a body the transport left as an unparsed string
    ///
    /// A body that was too large to buffer fails with
    /// [`WebhookError::PayloadTooLarge`]; anything else fails with
    /// [`WebhookError::RawBodyUnavailable`].
    pub fn resolve_payload(&self) -> Result<&[u8], WebhookError> {
        if let Some(raw) = &self.raw {
            return Ok(raw.as_bytes());
        }

        match &self.body {
            RequestBody::Unparsed(text) => Ok(text.as_bytes()),
            RequestBody::TooLarge { limit } => Err(WebhookError::PayloadTooLarge { limit: *limit }),
            RequestBody::Parsed(_) | RequestBody::Unavailable => {
                Err(WebhookError::RawBodyUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signature_missing() {
        let request = WebhookRequest::new(RequestBody::Unparsed("{}".into()));
        assert_eq!(request.signature(), SignatureHeader::Missing);

        let request = request.with_signature("   ");
        assert_eq!(request.signature(), SignatureHeader::Missing);
    }

    #[test]
    fn test_signature_single() {
        let request = WebhookRequest::new(RequestBody::Unparsed("{}".into()))
            .with_signature(" abc123 ");
        assert_eq!(request.signature(), SignatureHeader::Single("abc123"));
    }

    #[test]
    fn test_signature_repeated_headers() {
        let request = WebhookRequest::new(RequestBody::Unparsed("{}".into()))
            .with_signatures(["abc", "def"]);
        assert_eq!(request.signature(), SignatureHeader::Multiple(2));
    }

    #[test]
    fn test_signature_folded_header() {
        let request = WebhookRequest::new(RequestBody::Unparsed("{}".into()))
            .with_signature("abc, def");
        assert_eq!(request.signature(), SignatureHeader::Multiple(2));
    }

    #[test]
    fn test_signature_blank_among_many_is_still_multiple() {
        let request = WebhookRequest::new(RequestBody::Unparsed("{}".into()))
            .with_signatures(["", "abc"]);
        assert_eq!(request.signature(), SignatureHeader::Multiple(2));
    }

    #[test]
    fn test_resolve_prefers_raw_buffer() {
        let request = WebhookRequest::new(RequestBody::Unparsed("parsed-ish".into()))
            .with_raw(Bytes::from_static(b"raw bytes"));
        assert_eq!(request.resolve_payload().unwrap(), b"raw bytes");
    }

    #[test]
    fn test_resolve_raw_string() {
        let request = WebhookRequest::new(RequestBody::Parsed(json!({"a": 1})))
            .with_raw("{\"a\": 1}");
        assert_eq!(request.resolve_payload().unwrap(), b"{\"a\": 1}");
    }

    #[test]
    fn test_resolve_unparsed_string_body() {
        let request = WebhookRequest::new(RequestBody::Unparsed("{\"a\":1}".into()));
        assert_eq!(request.resolve_payload().unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn test_resolve_empty_unparsed_body() {
        let request = WebhookRequest::new(RequestBody::Unparsed(String::new()));
        assert_eq!(request.resolve_payload().unwrap(), b"");
    }

    #[test]
    fn test_resolve_refuses_parsed_body() {
        let request = WebhookRequest::new(RequestBody::Parsed(json!({"id": "evt_1"})));
        assert!(matches!(
            request.resolve_payload(),
            Err(WebhookError::RawBodyUnavailable)
        ));
    }

    #[test]
    fn test_resolve_refuses_unavailable_body() {
        let request = WebhookRequest::new(RequestBody::Unavailable);
        assert!(matches!(
            request.resolve_payload(),
            Err(WebhookError::RawBodyUnavailable)
        ));
    }

    #[test]
    fn test_resolve_oversized_body() {
        let request = WebhookRequest::new(RequestBody::TooLarge { limit: 16 });
        assert!(matches!(
            request.resolve_payload(),
            Err(WebhookError::PayloadTooLarge { limit: 16 })
        ));
    }
}
