//! Index definitions
//!
//! Specs are opaque JSON objects handed back to the database unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DocumentError;

/// One secondary-index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexSpec(Value);

impl IndexSpec {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Index name, when the definition carries one
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .or_else(|| self.0.get("Name"))
            .and_then(Value::as_str)
    }

    /// Decode an ordered index list from an `indexes.json` payload
    pub fn decode_list(payload: &[u8]) -> Result<Vec<IndexSpec>, DocumentError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Encode an ordered index list as an `indexes.json` payload
    pub fn encode_list(specs: &[IndexSpec]) -> Result<Vec<u8>, DocumentError> {
        Ok(serde_json::to_vec(specs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_keeps_order() {
        let payload = br#"[{"name":"b_1","key":{"b":1}},{"name":"a_1","key":{"a":1},"unique":true}]"#;
        let specs = IndexSpec::decode_list(payload).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name(), Some("b_1"));
        assert_eq!(specs[1].name(), Some("a_1"));
        assert_eq!(specs[1].value()["unique"], json!(true));
    }

    #[test]
    fn test_encode_decode_list() {
        let specs = vec![IndexSpec::new(json!({"Key": ["email"], "Unique": true, "Name": "email_1"}))];
        let payload = IndexSpec::encode_list(&specs).unwrap();
        let back = IndexSpec::decode_list(&payload).unwrap();
        assert_eq!(back, specs);
        assert_eq!(back[0].name(), Some("email_1"));
    }

    #[test]
    fn test_decode_rejects_non_list() {
        assert!(IndexSpec::decode_list(b"{\"name\":\"x\"}").is_err());
        assert!(IndexSpec::decode_list(b"not json").is_err());
    }
}
