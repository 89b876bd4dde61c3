use regex::{Captures, Regex};
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("placeholder regex is valid"))
}

/// Replaces `$key` and `${key}` in `text` with `value`
///
/// Only whole placeholder names match: `$key1` is left alone when expanding `key`.
pub fn expand(text: &str, key: &str, value: &str) -> String {
    placeholder()
        .replace_all(text, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            if name == Some(key) {
                value.to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
