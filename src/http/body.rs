//! Body interpretation helpers shared by the request context.
//!
//! All parsers are total: a body that does not fit the declared content type
//! yields an absent or empty result, never an error the caller must handle.

use std::collections::HashMap;

use axum::body::Bytes;

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// The media type of a `Content-Type` value, lowercased, without parameters.
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Parameters of a header value such as
/// `form-data; name="file"; filename="a.txt"`.
///
/// The leading token is skipped. Keys are lowercased, quoted values are
/// unquoted, `;` inside quotes does not split.
pub fn header_params(value: &str) -> Vec<(String, String)> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ';' if !in_quotes => pieces.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    pieces.push(current);

    pieces
        .into_iter()
        .skip(1)
        .filter_map(|piece| {
            let (key, raw) = piece.split_once('=')?;
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                return None;
            }
            Some((key, unquote(raw.trim())))
        })
        .collect()
}

/// Look up one parameter of a header value.
pub fn header_param(value: &str, name: &str) -> Option<String> {
    header_params(value)
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Decode `key=value&...` pairs. Repeated keys keep the last value.
pub fn parse_urlencoded(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Parse a JSON document, `None` on any syntax error.
pub fn parse_json(body: &Bytes) -> Option<serde_json::Value> {
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(error = %err, "Malformed JSON body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn essence_drops_parameters_and_case() {
        assert_eq!(
            mime_essence("Application/JSON; charset=utf-8"),
            "application/json"
        );
        assert_eq!(mime_essence(""), "");
    }

    #[test]
    fn params_respect_quotes() {
        let params = header_params(r#"form-data; name="a;b"; filename="x \"y\".txt""#);
        assert_eq!(
            params,
            vec![
                ("name".to_string(), "a;b".to_string()),
                ("filename".to_string(), r#"x "y".txt"#.to_string()),
            ]
        );
        assert_eq!(
            header_param("multipart/form-data; boundary=abc123", "boundary").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn urlencoded_decodes_and_last_value_wins() {
        let parsed = parse_urlencoded(b"name=John+Doe&email=j%40x.io&name=Jane");
        assert_eq!(parsed.get("name").map(String::as_str), Some("Jane"));
        assert_eq!(parsed.get("email").map(String::as_str), Some("j@x.io"));
    }

    #[test]
    fn json_rejects_invalid_syntax() {
        assert!(parse_json(&Bytes::from_static(b"{\"a\":1}")).is_some());
        assert!(parse_json(&Bytes::from_static(b"{\"a\":")).is_none());
    }
}
