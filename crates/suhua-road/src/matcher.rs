//! Ordered keyword rules.
//!
//! Rules are tried in declaration order and, within a rule, keywords in
//! configured order. The first configured keyword contained in the text
//! wins, regardless of where it occurs in the text.

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRule<T> {
    pub outcome: T,
    pub keywords: Vec<String>,
}

impl<T> KeywordRule<T> {
    pub fn new(outcome: T, keywords: Vec<String>) -> Self {
        Self { outcome, keywords }
    }

    /// First configured keyword of this rule found in `text`
    pub fn first_match(&self, text: &str) -> Option<&str> {
        first_keyword(&self.keywords, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch<'a, T> {
    pub outcome: &'a T,
    pub keyword: &'a str,
}

pub fn evaluate<'a, T>(rules: &'a [KeywordRule<T>], text: &str) -> Option<RuleMatch<'a, T>> {
    rules.iter().find_map(|rule| {
        rule.first_match(text).map(|keyword| RuleMatch {
            outcome: &rule.outcome,
            keyword,
        })
    })
}

pub fn first_keyword<'a>(keywords: &'a [String], text: &str) -> Option<&'a str> {
    keywords
        .iter()
        .map(String::as_str)
        .find(|k| !k.is_empty() && text.contains(k))
}

pub fn contains_any(keywords: &[String], text: &str) -> bool {
    first_keyword(keywords, text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_configured_order_beats_text_order() {
        let rules = vec![KeywordRule::new("high", words(&["坍方", "封閉"]))];
        // 封閉 occurs first in the text, 坍方 is configured first
        let m = evaluate(&rules, "封閉雙向，原因為坍方").unwrap();
        assert_eq!(m.keyword, "坍方");
        assert_eq!(*m.outcome, "high");
    }

    #[test]
    fn test_rule_order() {
        let rules = vec![
            KeywordRule::new(1, words(&["南澳"])),
            KeywordRule::new(2, words(&["蘇澳"])),
        ];
        assert_eq!(*evaluate(&rules, "蘇澳往南澳").unwrap().outcome, 1);
        assert_eq!(*evaluate(&rules, "蘇澳港").unwrap().outcome, 2);
        assert!(evaluate(&rules, "花蓮").is_none());
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        assert!(!contains_any(&words(&[""]), "任何文字"));
        assert!(contains_any(&words(&["", "蘇花"]), "蘇花公路"));
    }
}
