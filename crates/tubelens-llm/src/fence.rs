//! Extraction of fenced code blocks from model output.

/// Return the trimmed body of the first ```` ```lang ```` fenced block in `text`.
///
/// When no such fence is present the whole response is returned unchanged,
/// since models sometimes answer with the bare document. An opening fence
/// without a closing one yields everything after it.
pub fn extract_fenced_block<'a>(text: &'a str, lang: &str) -> &'a str {
    let opener = format!("```{lang}");
    let Some(start) = text.find(&opener) else {
        return text;
    };

    let body = &text[start + opener.len()..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_yaml_block() {
        let response = "Here you go:\n```yaml\ntopics:\n  - title: Rust\n```\nThanks!";
        assert_eq!(
            extract_fenced_block(response, "yaml"),
            "topics:\n  - title: Rust"
        );
    }

    #[test]
    fn test_no_fence_returns_verbatim() {
        let response = "topics:\n  - title: Rust\n";
        assert_eq!(extract_fenced_block(response, "yaml"), response);
    }

    #[test]
    fn test_other_language_fence_ignored() {
        let response = "```json\n{}\n```";
        assert_eq!(extract_fenced_block(response, "yaml"), response);
    }

    #[test]
    fn test_first_block_wins() {
        let response = "```yaml\na: 1\n```\n```yaml\nb: 2\n```";
        assert_eq!(extract_fenced_block(response, "yaml"), "a: 1");
    }

    #[test]
    fn test_unterminated_fence() {
        let response = "```yaml\na: 1\nb: 2";
        assert_eq!(extract_fenced_block(response, "yaml"), "a: 1\nb: 2");
    }

    #[test]
    fn test_single_line_fence() {
        assert_eq!(extract_fenced_block("```yaml a: 1```", "yaml"), "a: 1");
    }

    #[test]
    fn test_crlf_line_endings() {
        let response = "```yaml\r\na: 1\r\n```";
        assert_eq!(extract_fenced_block(response, "yaml"), "a: 1");
    }
}
