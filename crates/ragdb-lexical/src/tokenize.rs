/// Whitespace tokenizer shared by corpus and queries. Case-sensitive, no
/// stemming or stop words.
pub fn tokenize(text: &str) -> Vec<&str> { text.split_whitespace().collect() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_any_whitespace_run() {
        assert_eq!(tokenize("  Alpha\tbeta\n\ngamma "), vec!["Alpha", "beta", "gamma"]);
        assert!(tokenize("").is_empty());
    }
}
