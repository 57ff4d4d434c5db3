use ragdb_core::traits::EntityExtractor;
use ragdb_core::Result;

/// Rule-based extractor: every title-case word (`Alice`, `Paris`) is an
/// entity. Surrounding punctuation is trimmed; all-caps and lowercase words
/// are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleCaseExtractor;

fn is_title(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => chars.all(|c| !c.is_alphabetic() || c.is_lowercase()),
        _ => false,
    }
}

impl EntityExtractor for TitleCaseExtractor {
    fn extract(&self, text: &str) -> Result<Vec<String>> {
        let mut entities: Vec<String> = Vec::new();
        for word in text.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if is_title(word) && !entities.iter().any(|e| e == word) {
                entities.push(word.to_string());
            }
        }
        Ok(entities)
    }
}
