use super::StatusCode;
use crate::clients::HttpStatusCode;
use crate::error::{self, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use log::warn;
use serde_json::{json, Value};

/// A transport-level response. This is what `*_raw` request functions hand back untouched, for
/// example when downloading an image.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub fn new<B>(status: StatusCode, headers: HeaderMap, body: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The decoded body of a response.
#[derive(Debug, Clone)]
pub enum Payload {
    /// The response declared a JSON content type and decoded cleanly.
    Json(Value),
    /// The response declared some other content type (or none).
    Text(String),
    /// The response declared a JSON content type but the body did not decode. This is an expected
    /// outcome, not an error; the original response is kept for inspection.
    Undecodable {
        error: String,
        response: HttpResponse,
    },
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_undecodable(&self) -> bool {
        matches!(self, Payload::Undecodable { .. })
    }

    /// A JSON rendering of any payload. Undecodable payloads become
    /// `{"error": ..., "response": {"status": ..., "body": ...}}`.
    pub fn to_value(&self) -> Value {
        match self {
            Payload::Json(value) => value.clone(),
            Payload::Text(text) => Value::String(text.clone()),
            Payload::Undecodable { error, response } => json!({
                "error": error,
                "response": {
                    "status": response.status().as_u16(),
                    "body": response.text(),
                },
            }),
        }
    }
}

/// A `(status, payload)` pair: the shape every non-raw request collapses into.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub status: StatusCode,
    pub payload: Payload,
}

impl Normalized {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json(&self) -> Option<&Value> {
        self.payload.as_json()
    }

    pub fn into_parts(self) -> (StatusCode, Payload) {
        (self.status, self.payload)
    }

    /// The JSON payload of a successful response. Anything else becomes
    /// `Error::UnexpectedStatus`, for functions that cannot go on without the document.
    pub fn into_document<S>(self, action: S) -> Result<Value>
    where
        S: Into<String>,
    {
        match self.payload {
            Payload::Json(value) if self.status.is_success() => Ok(value),
            payload => error::UnexpectedStatusSnafu {
                action,
                status: self.status,
                payload,
            }
            .fail(),
        }
    }
}

impl HttpStatusCode for Normalized {
    fn status_code(&self) -> Option<StatusCode> {
        Some(self.status)
    }
}

fn is_structured(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("json")
}

/// Collapse a response into `(status, payload)`. Decode failures are packaged into the payload,
/// never returned as errors.
pub fn normalize(response: HttpResponse) -> Normalized {
    let status = response.status();
    let structured = response.content_type().map(is_structured).unwrap_or(false);
    if !structured {
        return Normalized {
            status,
            payload: Payload::Text(response.text()),
        };
    }
    let decoded: serde_json::Result<Value> = serde_json::from_slice(response.bytes());
    let payload = match decoded {
        Ok(value) => Payload::Json(value),
        Err(e) => {
            warn!(
                "unable to decode a {} response declared as '{}': {}",
                status,
                response.content_type().unwrap_or_default(),
                e
            );
            Payload::Undecodable {
                error: e.to_string(),
                response,
            }
        }
    };
    Normalized { status, payload }
}
