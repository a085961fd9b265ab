//! Success envelope returned to API callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{message, meta, data}` envelope; `data` is omitted when absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Response<T> {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Default for Response<T> {
    fn default() -> Self {
        Self {
            message: String::new(),
            meta: Map::new(),
            data: None,
        }
    }
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_data_is_omitted() {
        let v = serde_json::to_value(Response::<u8>::empty().with_message("deleted")).unwrap();
        assert_eq!(v, json!({"message": "deleted", "meta": {}}));
    }

    #[test]
    fn data_and_meta_are_serialized() {
        let v = serde_json::to_value(Response::ok(json!({"id": 1})).with_meta("page", 2)).unwrap();
        assert_eq!(v, json!({"message": "", "meta": {"page": 2}, "data": {"id": 1}}));
    }
}
