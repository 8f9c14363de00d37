//! Request and response types for the proxy endpoints.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<Value>,
}

impl ChatRequest {
    pub fn prompt(&self) -> Option<&str> {
        trimmed_text(self.prompt.as_ref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageToTextRequest {
    #[serde(default)]
    pub image_data: Option<Value>,
    #[serde(default)]
    pub prompt: Option<Value>,
}

impl ImageToTextRequest {
    pub fn image_data(&self) -> Option<&str> {
        trimmed_text(self.image_data.as_ref())
    }

    pub fn prompt(&self) -> Option<&str> {
        trimmed_text(self.prompt.as_ref())
    }
}

/// Successful reply of both proxy endpoints.
#[derive(Debug, Serialize, PartialEq)]
pub struct CompletionResponse {
    pub response: String,
}

/// Parse a client body. An empty body reads as `{}`; anything unparsable is `None`.
pub fn parse_body<T: DeserializeOwned + Default>(raw: &[u8]) -> Option<T> {
    if raw.is_empty() {
        return Some(T::default());
    }
    serde_json::from_slice(raw).ok()
}

/// A string field, trimmed, only if non-empty. Non-string values count as absent.
fn trimmed_text(value: Option<&Value>) -> Option<&str> {
    value?
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
