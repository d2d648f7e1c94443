use async_trait::async_trait;
use conductor_a2a::TaskContext;

use super::DomainFunction;
use crate::error::{DomainError, DomainResult};

/// Truncating summarizer.
///
/// Text longer than `fallback_length` characters is cut to that many
/// characters followed by `...`; shorter text is returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summarizer {
    fallback_length: usize,
}

impl Summarizer {
    pub fn new(fallback_length: usize) -> Self {
        Self { fallback_length }
    }

    pub fn summarize(&self, text: &str) -> String {
        match text.char_indices().nth(self.fallback_length) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl DomainFunction for Summarizer {
    async fn process(&self, text: &str, _context: &mut TaskContext) -> DomainResult<String> {
        if text.trim().is_empty() {
            return Err(DomainError::InvalidInput("nothing to summarize".to_string()));
        }
        Ok(self.summarize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_text_unchanged() {
        let text = "I need to file a claim for my heart condition";
        assert_eq!(Summarizer::default().summarize(text), text);
    }

    #[test]
    fn test_exact_length_unchanged() {
        let text = "a".repeat(100);
        assert_eq!(Summarizer::default().summarize(&text), text);
    }

    #[test]
    fn test_long_text_truncated() {
        let text = "b".repeat(101);
        let summary = Summarizer::default().summarize(&text);
        assert_eq!(summary, format!("{}...", "b".repeat(100)));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let summary = Summarizer::new(3).summarize("héllo");
        assert_eq!(summary, "hél...");
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let mut context = TaskContext::new();
        let err = Summarizer::default()
            .process("   ", &mut context)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    proptest! {
        #[test]
        fn summary_never_exceeds_limit(text in ".{0,300}", limit in 0usize..150) {
            let summary = Summarizer::new(limit).summarize(&text);
            let chars = text.chars().count();
            if chars > limit {
                prop_assert_eq!(summary.chars().count(), limit + 3);
                prop_assert!(summary.ends_with("..."));
            } else {
                prop_assert_eq!(summary, text);
            }
        }

        #[test]
        fn summary_is_prefix_of_input(text in ".{0,300}") {
            let summary = Summarizer::default().summarize(&text);
            let body = summary.strip_suffix("...").unwrap_or(&summary);
            prop_assert!(text.starts_with(body));
        }
    }
}
