//! Reversible obfuscation of sensitive string fields.
//!
//! This is base64 of the UTF-8 bytes. It keeps names and emails from being
//! readable at a glance in the storage medium and nothing more: anyone with
//! access to the medium can decode it. There is no confidentiality guarantee.
//! Real protection needs authenticated encryption at rest with managed keys.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("field `{field}` is not valid base64")]
    Base64 {
        field: String,
        #[source]
        source: base64::DecodeError,
    },
    #[error("field `{field}` does not decode to UTF-8")]
    Utf8 {
        field: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

pub fn encode(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}

pub fn decode(field: &str, encoded: &str) -> Result<String, CodecError> {
    let bytes = STANDARD.decode(encoded).map_err(|source| CodecError::Base64 {
        field: field.to_string(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|source| CodecError::Utf8 {
        field: field.to_string(),
        source,
    })
}

/// Applies [`encode`]/[`decode`] to every string stored under one of the
/// configured object keys, at any depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCodec {
    fields: Vec<String>,
}

impl FieldCodec {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    fn is_sensitive(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f == key)
    }

    pub fn obfuscate(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, v) in map.iter_mut() {
                    match v {
                        Value::String(s) if self.is_sensitive(key) => *s = encode(s),
                        other => self.obfuscate(other),
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.obfuscate(v)),
            _ => {}
        }
    }

    pub fn deobfuscate(&self, value: &mut Value) -> Result<(), CodecError> {
        match value {
            Value::Object(map) => {
                for (key, v) in map.iter_mut() {
                    match v {
                        Value::String(s) if self.is_sensitive(key) => *s = decode(key, s)?,
                        other => self.deobfuscate(other)?,
                    }
                }
            }
            Value::Array(items) => {
                for v in items {
                    self.deobfuscate(v)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> FieldCodec {
        FieldCodec::new(["name", "email", "bio"])
    }

    #[test]
    fn obfuscates_nested_sensitive_strings_only() {
        let mut v = json!({
            "data": [
                {"name": "Ada Obi", "email": "ada@example.com", "role": "SEEKER"},
                {"name": "Bola", "bio": null, "meta": {"name": "inner"}}
            ]
        });
        codec().obfuscate(&mut v);

        assert_eq!(v["data"][0]["name"], json!(encode("Ada Obi")));
        assert_eq!(v["data"][0]["email"], json!(encode("ada@example.com")));
        assert_eq!(v["data"][0]["role"], json!("SEEKER"));
        assert_eq!(v["data"][1]["bio"], Value::Null);
        assert_eq!(v["data"][1]["meta"]["name"], json!(encode("inner")));
    }

    #[test]
    fn round_trips_unicode() {
        let original = json!({"name": "Chiamaka Ọkafọ́r", "bio": "Ẹ kú àárọ̀"});
        let mut v = original.clone();
        codec().obfuscate(&mut v);
        assert_ne!(v, original);
        codec().deobfuscate(&mut v).unwrap();
        assert_eq!(v, original);
    }

    #[test]
    fn rejects_values_that_were_never_encoded() {
        let mut v = json!({"email": "plain text!"});
        assert!(codec().deobfuscate(&mut v).is_err());
    }
}
