//! Signature names end up as `META-INF/<NAME>.SF`, so they are limited to
//! ASCII letters, digits, `-` and `_`.

const REPLACEMENT: char = '_';

pub fn is_signature_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Strict check: non-empty and every character allowed.
pub fn is_valid_signature_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_signature_name_char)
}

/// Replaces every disallowed character with `_`, keeping the character
/// count. Used to pre-fill a default name, never to repair user input.
pub fn sanitize_signature_name(name: &str) -> String {
    name.chars()
        .map(|c| if is_signature_name_char(c) { c } else { REPLACEMENT })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sanitize_replaces_space_and_punctuation() {
        assert_eq!(sanitize_signature_name("My Sig!"), "My_Sig_");
    }

    #[test]
    fn raw_name_with_space_is_rejected() {
        assert!(!is_valid_signature_name("My Sig!"));
        assert!(is_valid_signature_name(&sanitize_signature_name("My Sig!")));
    }

    #[test]
    fn empty_name_is_invalid() {
        assert!(!is_valid_signature_name(""));
        assert_eq!(sanitize_signature_name(""), "");
    }

    #[test]
    fn non_ascii_letters_are_replaced() {
        assert_eq!(sanitize_signature_name("clé-ß_1"), "cl_-__1");
        assert!(!is_valid_signature_name("clé"));
    }

    #[test]
    fn allowed_characters() {
        assert!(is_valid_signature_name("Release_2024-rc1"));
        assert!(!is_valid_signature_name("a.b"));
        assert!(!is_valid_signature_name("a/b"));
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(s in ".*") {
            let once = sanitize_signature_name(&s);
            prop_assert_eq!(sanitize_signature_name(&once), once);
        }

        #[test]
        fn sanitize_preserves_length_and_valid_chars(s in ".*") {
            let out = sanitize_signature_name(&s);
            prop_assert_eq!(out.chars().count(), s.chars().count());
            for (before, after) in s.chars().zip(out.chars()) {
                if is_signature_name_char(before) {
                    prop_assert_eq!(before, after);
                } else {
                    prop_assert_eq!(after, '_');
                }
            }
        }

        #[test]
        fn validity_matches_character_rule(s in "[A-Za-z0-9_ .!-]{0,12}") {
            let expected = !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            prop_assert_eq!(is_valid_signature_name(&s), expected);
        }

        #[test]
        fn sanitized_non_empty_names_are_valid(s in ".+") {
            prop_assert!(is_valid_signature_name(&sanitize_signature_name(&s)));
        }
    }
}
