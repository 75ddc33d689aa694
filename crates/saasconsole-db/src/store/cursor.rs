//! Opaque pagination cursors
//!
//! A cursor is the last evaluated key of a page, JSON-encoded and then
//! base64url-encoded without padding so it can travel in a query string.

use super::{Item, StoreError, StoreResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

pub fn encode(key: &Item) -> StoreResult<String> {
    let json = serde_json::to_vec(key)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

pub fn decode(cursor: &str) -> StoreResult<Item> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.trim())
        .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))
}

pub fn encode_opt(key: Option<&Item>) -> StoreResult<Option<String>> {
    key.map(encode).transpose()
}

pub fn decode_opt(cursor: Option<&str>) -> StoreResult<Option<Item>> {
    cursor
        .filter(|c| !c.trim().is_empty())
        .map(decode)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_is_url_safe() {
        let mut key = Item::new();
        key.insert("PK".into(), json!("COMPANY#a/b+c"));
        key.insert("SK".into(), json!("USER#??>>"));
        let cursor = encode(&key).unwrap();
        assert!(!cursor.contains('='));
        assert!(!cursor.contains('+'));
        assert!(!cursor.contains('/'));
        assert_eq!(decode(&cursor).unwrap(), key);
    }

    #[test]
    fn test_garbage_cursor_is_rejected() {
        assert!(matches!(decode("%%%"), Err(StoreError::InvalidCursor(_))));
        // valid base64, not JSON
        assert!(matches!(decode("aGVsbG8"), Err(StoreError::InvalidCursor(_))));
    }

    #[test]
    fn test_blank_cursor_means_first_page() {
        assert!(decode_opt(Some("  ")).unwrap().is_none());
        assert!(decode_opt(None).unwrap().is_none());
    }
}
