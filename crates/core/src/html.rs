use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new("<[^<]+?>").expect("tag pattern is valid"));

/// Strip HTML tags from an inbound message body and trim the remainder.
///
/// Conversation sources deliver bodies as HTML fragments (`<p>hi</p>`).
/// The question handed to the assistant must be plain text, and a body that
/// is nothing but markup counts as an empty question.
pub fn strip_tags(input: &str) -> String {
    TAG.replace_all(input, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use crate::html::strip_tags;

    #[test]
    fn strips_simple_markup() {
        assert_eq!(strip_tags("<p>How do I create a token?</p>"), "How do I create a token?");
    }

    #[test]
    fn markup_only_body_becomes_empty() {
        assert_eq!(strip_tags("<p></p>"), "");
        assert_eq!(strip_tags("<p> <br> </p>"), "");
    }

    #[test]
    fn nested_tags_are_removed() {
        assert_eq!(strip_tags("<div><b>bold</b> and <i>italic</i></div>"), "bold and italic");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip_tags("no markup here"), "no markup here");
    }

    #[test]
    fn dangling_angle_bracket_is_preserved() {
        assert_eq!(strip_tags("a < b"), "a < b");
    }
}
