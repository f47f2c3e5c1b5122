//! HS Code Classifier
//!
//! Scores product titles against category keyword lists and proposes a
//! harmonized code. Pure functions over the static dictionary.

use duty_core::ClassificationResult;
use rust_decimal::Decimal;

use crate::dictionary::{CategoryEntry, CodeInfo, HsEntry, CATEGORIES, HS_CODES};

/// True for 6 to 10 ASCII digits and nothing else.
pub fn validate_code(code: &str) -> bool {
    (6..=10).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

/// Strip the separators merchants commonly type ("8517.12.00", "8517 12 00").
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !matches!(c, '.' | ' ' | '-'))
        .collect()
}

/// Keyword classifier over a category table and a code table.
#[derive(Debug, Clone, Copy)]
pub struct HsClassifier {
    categories: &'static [CategoryEntry],
    codes: &'static [HsEntry],
}

impl Default for HsClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HsClassifier {
    pub fn new() -> Self {
        Self {
            categories: CATEGORIES,
            codes: HS_CODES,
        }
    }

    /// Classify a free-text title.
    ///
    /// Category confidence is the share of its keywords found in the
    /// lowercased title. The strictly highest score wins; ties keep the
    /// earlier category.
    pub fn classify(&self, title: &str) -> ClassificationResult {
        let text = title.to_lowercase();

        let mut best: Option<(&CategoryEntry, f64, Vec<String>)> = None;
        for category in self.categories {
            let matched: Vec<String> = category
                .keywords
                .iter()
                .filter(|kw| text.contains(*kw))
                .map(|kw| kw.to_string())
                .collect();

            if matched.is_empty() {
                continue;
            }

            let confidence = matched.len() as f64 / category.keywords.len() as f64;
            let better = match &best {
                Some((_, best_conf, _)) => confidence > *best_conf,
                None => true,
            };
            if better {
                best = Some((category, confidence, matched));
            }
        }

        match best {
            Some((category, confidence, matched_keywords)) => {
                let suggested_code = self
                    .codes
                    .iter()
                    .find(|e| e.category == category.name)
                    .map(|e| e.code.to_string());

                tracing::debug!(
                    "Classified '{}' as {} ({:.2}, code {:?})",
                    title,
                    category.name,
                    confidence,
                    suggested_code
                );

                ClassificationResult {
                    suggested_code,
                    category: Some(category.name.to_string()),
                    confidence,
                    matched_keywords,
                }
            }
            None => ClassificationResult::default(),
        }
    }

    /// Exact match first, then the first entry sharing the 4-digit heading.
    pub fn lookup(&self, code: &str) -> Option<CodeInfo> {
        if let Some(entry) = self.codes.iter().find(|e| e.code == code) {
            return Some(entry.to_info());
        }

        let heading = code.get(..4)?;
        if !heading.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        self.codes
            .iter()
            .find(|e| e.code.starts_with(heading))
            .map(|entry| {
                let mut info = entry.to_info();
                info.description = format!("{} (inferred)", entry.description);
                info.inferred = true;
                info.note = Some(format!(
                    "No exact entry for {}; inferred from heading {} ({})",
                    code, heading, entry.code
                ));
                info
            })
    }

    pub fn lookup_by_chapter(&self, chapter: &str) -> Vec<CodeInfo> {
        let chapter = format!("{:0>2}", chapter.trim());
        self.codes
            .iter()
            .filter(|e| e.chapter == chapter)
            .map(HsEntry::to_info)
            .collect()
    }

    /// Case-insensitive match on description or category name.
    pub fn search(&self, query: &str) -> Vec<CodeInfo> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        self.codes
            .iter()
            .filter(|e| {
                e.description.to_lowercase().contains(&query) || e.category.contains(&query)
            })
            .map(HsEntry::to_info)
            .collect()
    }

    pub fn category(&self, name: &str) -> Option<&'static CategoryEntry> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn category_default_duty_rate(&self, name: &str) -> Option<Decimal> {
        self.category(name).map(CategoryEntry::default_duty_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_classify_english_phone_title() {
        let classifier = HsClassifier::new();
        let result = classifier.classify("Apple iPhone 15 phone");

        assert_eq!(result.category.as_deref(), Some("electronics"));
        assert!(result.confidence > 0.0);
        let code = result.suggested_code.expect("code suggested");
        assert!(classifier.category("electronics").unwrap().covers(&code));
        assert!(result.matched_keywords.contains(&"iphone".to_string()));
    }

    #[test]
    fn test_classify_chinese_phone_title() {
        let classifier = HsClassifier::new();
        let result = classifier.classify("苹果iPhone 15 手机");

        assert_eq!(result.category.as_deref(), Some("electronics"));
        assert_eq!(result.suggested_code.as_deref(), Some("8517120000"));
        assert!(result.matched_keywords.contains(&"手机".to_string()));
        // "phone", "iphone", "手机" out of 14 keywords
        assert!((result.confidence - 3.0 / 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrecognized_title() {
        let result = HsClassifier::new().classify("Quantum flux capacitor");
        assert_eq!(result.confidence, 0.0);
        assert!(result.category.is_none());
        assert!(result.suggested_code.is_none());
        assert!(result.matched_keywords.is_empty());
    }

    #[test]
    fn test_highest_share_wins() {
        // footwear: "shoes", "sneakers" of 7 beats clothing: "shirt" of 12
        let result = HsClassifier::new().classify("Running sneakers shoes with shirt pocket");
        assert_eq!(result.category.as_deref(), Some("footwear"));
        assert_eq!(result.suggested_code.as_deref(), Some("6404110000"));
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("851712"));
        assert!(validate_code("8517120000"));
        assert!(!validate_code("85171"));
        assert!(!validate_code("85171200001"));
        assert!(!validate_code("8517.12.00"));
        assert!(!validate_code("８５１７１２"));
        assert!(validate_code(&normalize_code("8517.12.00")));
    }

    #[test]
    fn test_lookup_exact_and_inferred() {
        let classifier = HsClassifier::new();

        let exact = classifier.lookup("6109100000").unwrap();
        assert!(!exact.inferred);
        assert_eq!(exact.category, "clothing");
        assert_eq!(exact.default_duty_rate, dec!(0.12));

        let inferred = classifier.lookup("6109909000").unwrap();
        assert!(inferred.inferred);
        assert_eq!(inferred.code, "6109100000");
        assert!(inferred.description.ends_with("(inferred)"));
        assert!(inferred.note.is_some());

        assert!(classifier.lookup("0101210000").is_none());
        assert!(classifier.lookup("85").is_none());
    }

    #[test]
    fn test_lookup_by_chapter() {
        let classifier = HsClassifier::new();
        let chapter_42 = classifier.lookup_by_chapter("42");
        assert_eq!(chapter_42.len(), 3);
        assert!(chapter_42.iter().all(|c| c.category == "bags"));
        assert!(classifier.lookup_by_chapter("01").is_empty());
    }

    #[test]
    fn test_search() {
        let classifier = HsClassifier::new();
        let by_description = classifier.search("HEADPHONES");
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].code, "8518300000");

        let by_category = classifier.search("cosmetics");
        assert_eq!(by_category.len(), 4);

        assert!(classifier.search("   ").is_empty());
    }

    #[test]
    fn test_category_default_duty_rate() {
        let classifier = HsClassifier::new();
        assert_eq!(classifier.category_default_duty_rate("electronics"), Some(dec!(0.05)));
        assert_eq!(classifier.category_default_duty_rate("Books"), Some(dec!(0)));
        assert_eq!(classifier.category_default_duty_rate("weapons"), None);
    }
}
