//! Tag value sanitization.
//!
//! Output is restricted to Unicode alphanumerics and `_ - : .`. Runs of
//! whitespace collapse into a single `_` and any other character becomes `_`,
//! so the result never needs line protocol escaping.

use serde_json::Value;

/// Placeholder for values the client did not send.
pub const UNKNOWN: &str = "unknown";

/// Sanitizes an optional JSON value for use as a tag value.
///
/// `sanitize(Some(&Value::String(sanitize(x))))` is always `sanitize(x)`.
pub fn sanitize(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNKNOWN.to_string(),
        Some(Value::String(s)) => sanitize_str(s),
        Some(other) => sanitize_str(&other.to_string()),
    }
}

/// Sanitizes a string. Empty and whitespace-only input maps to [`UNKNOWN`].
pub fn sanitize_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNKNOWN.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_whitespace = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        out.push(if is_safe(c) { c } else { '_' });
    }
    out
}

fn is_safe(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_values() {
        assert_eq!(sanitize(None), "unknown");
        assert_eq!(sanitize(Some(&Value::Null)), "unknown");
        assert_eq!(sanitize(Some(&json!(""))), "unknown");
        assert_eq!(sanitize(Some(&json!("   \t"))), "unknown");
    }

    #[test]
    fn test_replaces_wire_breaking_characters() {
        assert_eq!(sanitize_str("Pit A"), "Pit_A");
        assert_eq!(sanitize_str("John  \t Smith"), "John_Smith");
        assert_eq!(sanitize_str("a,b=c"), "a_b_c");
        assert_eq!(sanitize_str(r#"say "hi"\"#), "say__hi__");
        assert_eq!(sanitize_str("  padded  "), "padded");
    }

    #[test]
    fn test_keeps_safe_characters() {
        assert_eq!(sanitize_str("s_6_30"), "s_6_30");
        assert_eq!(sanitize_str("2024-05-01"), "2024-05-01");
        assert_eq!(sanitize_str("06:30"), "06:30");
        assert_eq!(sanitize_str("v1.2"), "v1.2");
        assert_eq!(sanitize_str("José"), "José");
    }

    #[test]
    fn test_stringifies_non_strings() {
        assert_eq!(sanitize(Some(&json!(3))), "3");
        assert_eq!(sanitize(Some(&json!(0))), "0");
        assert_eq!(sanitize(Some(&json!(-31.5))), "-31.5");
        assert_eq!(sanitize(Some(&json!(true))), "true");
        assert_eq!(sanitize(Some(&json!({"a": 1}))), "__a_:1_");
    }

    #[test]
    fn test_idempotent_and_never_emits_separators() {
        let inputs = [
            "",
            " ",
            "plain",
            "with space",
            "a,b",
            "k=v",
            "mixed ,= \n\t stuff",
            "tab\tand\nnewline",
            "üñíçødé text",
            "\"quoted\"",
            "back\\slash",
            "___",
            "unknown",
        ];

        for input in inputs {
            let once = sanitize_str(input);
            let twice = sanitize_str(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
            assert!(!once.is_empty());
            assert!(
                !once.contains([' ', ',', '=', '"', '\\']),
                "unsafe output {once:?} for {input:?}"
            );
            assert!(!once.chars().any(char::is_whitespace));
        }
    }
}
