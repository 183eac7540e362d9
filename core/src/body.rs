//! Request body kinds and their encoding rules.
//!
//! The kind is decided once per call; each branch says what goes on the wire
//! and which `Content-Type` (if any) the client supplies when the caller did
//! not set one.

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::WireBody;

pub const APPLICATION_JSON: &str = "application/json";

/// Payload handed to `ApiClient::build_request`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Opaque blob; sent as-is with no content type injected.
    Binary(Vec<u8>),
    /// Multipart container; the transport owns boundary and content type.
    Multipart(MultipartForm),
    /// Already serialized. Defaults to `application/json`.
    Text(String),
    /// Any structured value, serialized to JSON text.
    Structured(Value),
}

impl RequestBody {
    /// Serialize `value` into a `Structured` body.
    ///
    /// A value that serializes to JSON `null` is treated as no body at all.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(value).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(match value {
            Value::Null => RequestBody::Empty,
            other => RequestBody::Structured(other),
        })
    }

    /// Wire form plus the content type to use when the caller gave none.
    pub(crate) fn encode(self) -> Result<(Option<WireBody>, Option<&'static str>), ApiError> {
        match self {
            RequestBody::Empty | RequestBody::Structured(Value::Null) => Ok((None, None)),
            RequestBody::Binary(bytes) => Ok((Some(WireBody::Binary(bytes)), None)),
            RequestBody::Multipart(form) => Ok((Some(WireBody::Multipart(form)), None)),
            RequestBody::Text(text) => Ok((Some(WireBody::Text(text)), Some(APPLICATION_JSON))),
            RequestBody::Structured(value) => {
                let text = serde_json::to_string(&value)
                    .map_err(|e| ApiError::SerializationError(e.to_string()))?;
                Ok((Some(WireBody::Text(text)), Some(APPLICATION_JSON)))
            }
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Structured(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Binary(bytes)
    }
}

impl From<MultipartForm> for RequestBody {
    fn from(form: MultipartForm) -> Self {
        RequestBody::Multipart(form)
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Vec<u8>,
    },
}

/// Ordered multipart/form-data container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(Part::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        });
        self
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Encode the form using `boundary` as the part delimiter.
    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match part {
                Part::Text { name, value } => {
                    let name = escape_quoted(name);
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    let name = escape_quoted(name);
                    let filename = escape_quoted(filename);
                    let content_type: String = content_type
                        .chars()
                        .filter(|c| !matches!(c, '\r' | '\n'))
                        .collect();
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(data);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        out
    }
}

/// Percent-escape the characters that would end a quoted header parameter
/// or the header line itself, the way browsers encode form-data names.
fn escape_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            other => out.push(other),
        }
    }
    out
}
