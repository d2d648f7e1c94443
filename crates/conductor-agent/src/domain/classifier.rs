use async_trait::async_trait;
use conductor_a2a::TaskContext;

use super::DomainFunction;
use crate::error::DomainResult;
use crate::registry::KeywordRule;

const DEFAULT_CATEGORY: &str = "general";

/// Keyword classifier.
///
/// Rules are tried in declaration order against the lowercased text and the
/// first rule with a matching keyword wins. Without a match the last
/// configured category is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    categories: Vec<String>,
    rules: Vec<KeywordRule>,
}

impl Classifier {
    pub fn new(categories: Vec<String>, rules: Vec<KeywordRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| KeywordRule {
                label: rule.label,
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Self { categories, rules }
    }

    pub fn classify(&self, text: &str) -> String {
        let text = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|rule| rule.label.clone())
            .or_else(|| self.categories.last().cloned())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    }
}

#[async_trait]
impl DomainFunction for Classifier {
    async fn process(&self, text: &str, _context: &mut TaskContext) -> DomainResult<String> {
        Ok(self.classify(text))
    }
}
