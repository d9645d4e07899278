//! Lenient deserializers for backend fields that change type between API versions.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts an id encoded as a string or a number (older endpoints emit
/// integer ids). Empty strings and `null` become `None`.
pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_id))
}

/// Required variant of [`opt_id`].
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opt_id(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing or empty id"))
}

/// Text fields (days, times, labels) that some endpoints send as numbers.
/// Strings are kept as sent; only an empty string becomes `None`.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "opt_id")]
        id: Option<String>,
    }

    #[test]
    fn test_opt_id_accepts_numbers_and_strings() {
        let a: Holder = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        let b: Holder = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        let c: Holder = serde_json::from_str(r#"{"id": ""}"#).unwrap();
        let d: Holder = serde_json::from_str(r#"{}"#).unwrap();

        assert_eq!(a.id.as_deref(), Some("42"));
        assert_eq!(b.id.as_deref(), Some("abc"));
        assert_eq!(c.id, None);
        assert_eq!(d.id, None);
    }

    #[derive(Deserialize)]
    struct Text {
        #[serde(default, deserialize_with = "opt_text")]
        day: Option<String>,
    }

    #[test]
    fn test_opt_text_keeps_strings_verbatim() {
        let padded: Text = serde_json::from_str(r#"{"day": " tuesday"}"#).unwrap();
        let number: Text = serde_json::from_str(r#"{"day": 2}"#).unwrap();
        let empty: Text = serde_json::from_str(r#"{"day": ""}"#).unwrap();

        assert_eq!(padded.day.as_deref(), Some(" tuesday"));
        assert_eq!(number.day.as_deref(), Some("2"));
        assert_eq!(empty.day, None);
    }
}
