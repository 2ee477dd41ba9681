//! Query-string helpers
//!
//! Values are encoded as `application/x-www-form-urlencoded`, which is what
//! the existing peers emit: space becomes `+` and every byte outside
//! `[A-Za-z0-9*-._]` is percent-encoded (so base64's `+`, `/` and `=` become
//! `%2B`, `%2F` and `%3D`).

use url::form_urlencoded;

/// Decode all `name=value` pairs, ignoring a leading `?`.
pub fn parse(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

/// Decoded value of the first parameter called `name`.
pub fn get(query: &str, name: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Returns true if `name` is present with a non-empty value.
pub fn has_value(query: &str, name: &str) -> bool {
    get(query, name).is_some_and(|value| !value.is_empty())
}

/// Form-encode a single value.
pub fn encode_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Form-encode `pairs` as `a=1&b=2`, preserving order.
pub fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}
