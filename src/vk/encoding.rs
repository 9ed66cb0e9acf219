//! Percent-encoding for VK query values.
//!
//! VK accepts most characters literally, so only a fixed set of reserved
//! characters is escaped. A general URL encoder would also escape
//! characters VK expects verbatim.

/// Characters escaped in query values, with their replacements.
const REPLACEMENTS: [(char, &str); 12] = [
    ('#', "%23"),
    ('$', "%24"),
    ('&', "%26"),
    ('+', "%2B"),
    (',', "%2C"),
    ('/', "%2F"),
    (':', "%3A"),
    (';', "%3B"),
    ('=', "%3D"),
    ('?', "%3F"),
    ('@', "%40"),
    (' ', "%20"),
];

/// Look up the escape sequence for a character, if it has one.
fn replacement(ch: char) -> Option<&'static str> {
    REPLACEMENTS
        .iter()
        .find(|(c, _)| *c == ch)
        .map(|(_, escaped)| *escaped)
}

/// Escape the reserved characters of `input`; everything else is copied as-is.
pub fn url_encode(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        match replacement(ch) {
            Some(escaped) => result.push_str(escaped),
            None => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ampersand_and_space() {
        assert_eq!(url_encode("a&b c"), "a%26b%20c");
    }

    #[test]
    fn test_encode_all_reserved() {
        assert_eq!(
            url_encode("#$&+,/:;=?@ "),
            "%23%24%26%2B%2C%2F%3A%3B%3D%3F%40%20"
        );
    }

    #[test]
    fn test_alphanumerics_untouched() {
        assert_eq!(url_encode("Hello123"), "Hello123");
    }

    #[test]
    fn test_other_characters_untouched() {
        // '%' is not in the table, so existing escapes are not double-encoded.
        assert_eq!(url_encode("100%"), "100%");
        assert_eq!(url_encode("Привет!"), "Привет!");
        assert_eq!(url_encode("a-b_c.d~e"), "a-b_c.d~e");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(url_encode(""), "");
    }

    #[test]
    fn test_encode_url_like_message() {
        assert_eq!(
            url_encode("see https://x.io/?a=1"),
            "see%20https%3A%2F%2Fx.io%2F%3Fa%3D1"
        );
    }
}
