//! Custom serde deserializers for query-string flags
//!
//! Query parameters arrive as strings, and the scrapers that call the relay
//! are inconsistent about how they spell a switch (`?headless=1`,
//! `?headless=true`, or a bare `?headless`).

use serde::{Deserialize, Deserializer, de};

/// Deserialize an optional on/off flag.
///
/// Accepts JSON booleans and integers (`0` is off, positive is on) and the
/// strings `1`/`0`, `true`/`false`, `on`/`off` in any casing. An empty string
/// (a bare `?flag` in a query) counts as on. Anything else is an error so
/// typos surface as a 400 instead of silently disabling escalation.
pub fn deserialize_query_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Int(i64),
        String(String),
    }

    let value: Option<RawFlag> = Option::deserialize(deserializer)?;

    match value {
        None => Ok(None),
        Some(RawFlag::Bool(b)) => Ok(Some(b)),
        Some(RawFlag::Int(i)) => Ok(Some(i > 0)),
        Some(RawFlag::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "1" | "true" | "on" => Ok(Some(true)),
            "0" | "false" | "off" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!("invalid flag value: {}", s))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Flags {
        #[serde(default, deserialize_with = "deserialize_query_flag")]
        headless: Option<bool>,
    }

    fn parse(query: &str) -> Result<Flags, String> {
        let uri: Uri = format!("/api/page?{}", query).parse().unwrap();
        Query::<Flags>::try_from_uri(&uri)
            .map(|q| q.0)
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_query_numeric_flags() {
        assert_eq!(parse("headless=1").unwrap().headless, Some(true));
        assert_eq!(parse("headless=0").unwrap().headless, Some(false));
    }

    #[test]
    fn test_query_word_flags_any_case() {
        assert_eq!(parse("headless=TRUE").unwrap().headless, Some(true));
        assert_eq!(parse("headless=Off").unwrap().headless, Some(false));
    }

    #[test]
    fn test_bare_flag_is_on() {
        assert_eq!(parse("headless=").unwrap().headless, Some(true));
    }

    #[test]
    fn test_missing_flag_is_none() {
        assert_eq!(parse("url=x").unwrap().headless, None);
    }

    #[test]
    fn test_unknown_word_rejected() {
        let err = parse("headless=maybe").unwrap_err();
        assert!(err.contains("invalid flag value"));
    }

    #[test]
    fn test_json_forms() {
        let flags: Flags = serde_json::from_value(json!({"headless": true})).unwrap();
        assert_eq!(flags.headless, Some(true));

        let flags: Flags = serde_json::from_value(json!({"headless": -3})).unwrap();
        assert_eq!(flags.headless, Some(false));

        let flags: Flags = serde_json::from_value(json!({"headless": null})).unwrap();
        assert_eq!(flags.headless, None);
    }
}
