//! Decoding of fetched documents: optional gzip, optional JSONP wrapper.

use flate2::read::GzDecoder;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::io::Read;
use std::sync::LazyLock;

use crate::error::DocumentError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

static JSONP_WRAPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*[\w.$]+\s*\((.*)\)\s*;?\s*$").unwrap());

/// String literals are matched first so keys are only rewritten outside them.
static UNQUOTED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).unwrap()
});

/// Decompresses a body when it starts with the gzip magic bytes.
pub fn maybe_gunzip(bytes: &[u8]) -> Result<Cow<'_, [u8]>, DocumentError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }
    let mut decoded = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut decoded)?;
    Ok(Cow::Owned(decoded))
}

/// Strips a `callback(...)` wrapper and quotes bare object keys.
pub fn unwrap_jsonp(body: &str) -> Result<String, DocumentError> {
    let inner = JSONP_WRAPPER
        .captures(body)
        .and_then(|captures| captures.get(1))
        .ok_or(DocumentError::NotJsonp)?;
    Ok(UNQUOTED_KEY
        .replace_all(inner.as_str(), |captures: &Captures<'_>| {
            match (captures.get(1), captures.get(2)) {
                (Some(prefix), Some(key)) => format!(r#"{}"{}":"#, prefix.as_str(), key.as_str()),
                _ => captures[0].to_string(),
            }
        })
        .into_owned())
}

/// Parses a JSON or JSONP body, gzip-compressed or not.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DocumentError> {
    let bytes = maybe_gunzip(bytes)?;
    let json_error = match serde_json::from_slice(&bytes) {
        Ok(value) => return Ok(value),
        Err(error) => error,
    };

    let text = String::from_utf8_lossy(&bytes);
    match unwrap_jsonp(&text) {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(DocumentError::NotJsonp) => Err(DocumentError::Json(json_error)),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::{json, Value};
    use std::io::Write;

    #[test]
    fn test_plain_json() {
        let value: Value = decode_json(br#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_jsonp_with_unquoted_keys() {
        let body = br#"callback({vers:0.01,config:{rate:"perhr",regions:[{region:"us-east",sizes:[]}]}});"#;

        let value: Value = decode_json(body).unwrap();

        assert_eq!(value["config"]["rate"], "perhr");
        assert_eq!(value["config"]["regions"][0]["region"], "us-east");
    }

    #[test]
    fn test_string_values_are_not_rewritten() {
        let body = br#"cb({notes:"rate: per hour, region: us-east",escaped:"say \"a, b: c\"",n:1});"#;

        let value: Value = decode_json(body).unwrap();

        assert_eq!(value["notes"], "rate: per hour, region: us-east");
        assert_eq!(value["escaped"], r#"say "a, b: c""#);
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_gzip_body() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"offers": {}}"#).unwrap();
        let compressed = encoder.finish().unwrap();

        let value: Value = decode_json(&compressed).unwrap();

        assert_eq!(value, json!({"offers": {}}));
    }

    #[test]
    fn test_garbage_reports_json_error() {
        let result: Result<Value, _> = decode_json(b"<html>503</html>");
        assert!(matches!(result, Err(DocumentError::Json(_))));
    }

    #[test]
    fn test_unwrap_requires_wrapper() {
        assert!(matches!(
            unwrap_jsonp("{\"a\": 1}"),
            Err(DocumentError::NotJsonp)
        ));
    }
}
