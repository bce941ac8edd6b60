//! Static-regex markup scanning for `<input>` tags.
//!
//! Both the login nonce and the settings form fields are plain input
//! elements, so one tag matcher plus one attribute matcher covers every
//! extraction this tool performs.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static INPUT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<input\b[^>]*>"));

static TAG_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
});

/// Parses a single tag's attributes into a map with lowercased names.
///
/// The first occurrence of a name wins.
fn tag_attributes(tag: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for caps in TAG_ATTR_RE.captures_iter(tag) {
        let name = caps[1].to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or(String::new(), |m| m.as_str().to_string());
        attributes.entry(name).or_insert(value);
    }
    attributes
}

/// Returns the `value` attribute of the first `<input>` whose `name`
/// attribute equals `name`, or `None` when no such input (or no value
/// attribute) exists.
pub(crate) fn input_value_by_name(html: &str, name: &str) -> Option<String> {
    INPUT_TAG_RE
        .find_iter(html)
        .map(|m| tag_attributes(m.as_str()))
        .find(|attrs| attrs.get("name").is_some_and(|n| n == name))
        .and_then(|mut attrs| attrs.remove("value"))
}

/// Returns the `value` attributes of every `<input>` in document order.
///
/// Inputs without a `value` attribute contribute `None`, keeping positions
/// stable for callers that extract by index.
pub(crate) fn input_values(html: &str) -> Vec<Option<String>> {
    INPUT_TAG_RE
        .find_iter(html)
        .map(|m| tag_attributes(m.as_str()).remove("value"))
        .collect()
}
