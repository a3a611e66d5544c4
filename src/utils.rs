//! Utility functions for parsing uroman data files.

use regex::Regex;
use std::sync::OnceLock;

use crate::Value;

/// Captures the value associated with a `::slot` in a line.
///
/// This function is a Rust port of the Python version's `slot_value_in_double_colon_del_list`.
/// It uses a dynamically generated regex to find the slot and extract its value.
///
/// # Example
/// `slot_value_in_double_colon_del_list("::s1 of course ::s2 ::cost 0.3", "cost")` returns `Some("0.3")`.
pub fn slot_value_in_double_colon_del_list<'a>(line: &'a str, slot: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(rel) = line[search_from..].find("::") {
        let marker_start = search_from + rel;
        let after_marker = marker_start + 2;
        let rest = &line[after_marker..];
        if let Some(tail) = rest.strip_prefix(slot) {
            // Require a slot-name boundary so `::t` doesn't match inside
            // `::t-alt` or `::t-end-of-syllable`.
            let at_boundary = tail.chars().next().is_none_or(|c| c.is_whitespace());
            if at_boundary {
                return Some(match tail.find("::") {
                    Some(end_index) => tail[..end_index].trim(),
                    None => tail.trim(),
                });
            }
        }
        search_from = after_marker;
    }
    None
}

/// Checks if a slot exists in the line, even if it has no value.
pub fn has_value_in_double_colon_del_list(line: &str, slot: &str) -> bool {
    slot_value_in_double_colon_del_list(line, slot).is_some()
}

/// Removes matching quotes from the start and end of a string.
///
/// Handles single quotes, double quotes, and curly double quotes.
pub fn dequote_string(s: &str) -> &str {
    static DEQUOTE_RE: OnceLock<Regex> = OnceLock::new();
    let re = DEQUOTE_RE.get_or_init(|| Regex::new(r#"^\s*(['"“])(.*)(['"”])\s*$"#).unwrap());

    if let Some(m) = re.captures(s) {
        let open_quote = m.get(1).map_or("", |m| m.as_str());
        let content = m.get(2).map_or("", |m| m.as_str());
        let close_quote = m.get(3).map_or("", |m| m.as_str());

        if (open_quote == "'" && close_quote == "'")
            || (open_quote == "\"" && close_quote == "\"")
            || (open_quote == "“" && close_quote == "”")
        {
            return content;
        }
    }
    s
}

pub fn robust_str_to_num(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        Some(Value::Int(i))
    } else if let Ok(f) = s.parse::<f64>() {
        Some(Value::Float(f))
    } else {
        Some(Value::String(s.to_string()))
    }
}
