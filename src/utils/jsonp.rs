/// Words that may not be used as a JSONP callback name.
const RESERVED_WORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "debugger", "default", "delete", "do", "double", "else", "enum", "export",
    "extends", "false", "final", "finally", "float", "for", "function", "goto", "if",
    "implements", "import", "in", "instanceof", "int", "interface", "long", "native", "new",
    "null", "package", "private", "protected", "public", "return", "short", "static", "super",
    "switch", "synchronized", "this", "throw", "throws", "transient", "true", "try", "typeof",
    "var", "volatile", "void", "while", "with", "NaN", "Infinity", "undefined",
];

/// Accept a callback name only if it is a plain identifier.
///
/// Returns `None` for anything containing characters outside
/// `[0-9A-Za-z$_]`, for the empty string and for reserved words.
pub fn jsonp_callback_filter(callback: &str) -> Option<&str> {
    let well_formed = !callback.is_empty()
        && callback
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '$' || c == '_');

    if !well_formed || RESERVED_WORDS.contains(&callback) {
        tracing::warn!("Rejected JSONP callback: {:?}", callback);
        return None;
    }

    Some(callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accepts_identifiers() {
        assert_eq!(jsonp_callback_filter("myCallback123"), Some("myCallback123"));
        assert_eq!(jsonp_callback_filter("$"), Some("$"));
        assert_eq!(jsonp_callback_filter("jQuery_1_8"), Some("jQuery_1_8"));
    }

    #[test]
    fn test_rejects_reserved_words() {
        for word in ["class", "return", "NaN", "undefined", "function", "Infinity"] {
            assert_eq!(jsonp_callback_filter(word), None, "{} should be rejected", word);
        }
        // 比對大小寫敏感
        assert_eq!(jsonp_callback_filter("Class"), Some("Class"));
    }

    #[test]
    fn test_rejects_script_injection() {
        assert_eq!(jsonp_callback_filter("alert(1);foo"), None);
        assert_eq!(jsonp_callback_filter("a.b"), None);
        assert_eq!(jsonp_callback_filter("cb</script>"), None);
        assert_eq!(jsonp_callback_filter(""), None);
    }

    proptest! {
        #[test]
        fn prop_rejects_any_foreign_character(
            prefix in "[A-Za-z_]{0,8}",
            bad in "[^0-9A-Za-z$_]",
            suffix in "[A-Za-z_]{0,8}",
        ) {
            let candidate = format!("{}{}{}", prefix, bad, suffix);
            prop_assert_eq!(jsonp_callback_filter(&candidate), None);
        }
    }
}
