//! Attribute-list parsing for tags such as `#EXT-X-STREAM-INF` and `#EXT-X-KEY`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static ATTRIBUTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Z0-9-]+)=("[^"]*"|[^,]*)"#).unwrap());

/// Parses `KEY=value` pairs. Quoted values keep embedded commas and lose
/// their surrounding quotes. Later duplicates overwrite earlier ones.
pub fn parse_attributes(input: &str) -> HashMap<String, String> {
    ATTRIBUTE_REGEX
        .captures_iter(input)
        .map(|caps| {
            let key = caps[1].to_string();
            let value = unquote(&caps[2]).to_string();
            (key, value)
        })
        .collect()
}

/// Removes one pair of surrounding double quotes, if present.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
