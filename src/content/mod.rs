//! Generated lesson and quiz content.

pub mod quiz_bank;
pub mod slides;

/// Replaces every occurrence of `from`; `None` when there is nothing to change.
pub fn replace_literal(text: &str, from: &str, to: &str) -> Option<String> {
    if from.is_empty() || !text.contains(from) {
        return None;
    }
    Some(text.replace(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_host_prefix() {
        let html = r#"<img src="http://127.0.0.1:8000/uploads/a.jpeg"><img src="http://127.0.0.1:8000/uploads/b.jpeg">"#;
        let out = replace_literal(html, "http://127.0.0.1:8000", "https://lms.example.com").unwrap();
        assert!(!out.contains("127.0.0.1"));
        assert_eq!(out.matches("https://lms.example.com/uploads/").count(), 2);
    }

    #[test]
    fn untouched_text_is_none() {
        assert_eq!(replace_literal("<p>plain</p>", "http://localhost", "x"), None);
        assert_eq!(replace_literal("<p>plain</p>", "", "x"), None);
    }
}
